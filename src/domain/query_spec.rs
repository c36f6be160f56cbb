/// クエリ記述の組み立て
///
/// テーブル名・インデックス名・キー条件をまとめた`QuerySpec`を生成する。
/// 各ビルダーはプレースホルダー名を固定の役割で割り当てる:
/// パーティションキーは`#pk`/`:pkValue`、ソートキーは`#sk`/`:skValue`、
/// `data`属性は`#data`で、値は`:dataValue`または`:dateStartValue`/`:dateEndValue`。
use thiserror::Error;

use super::date_range::DateRange;
use super::key_condition::{
    KeyCondition, KeyConditionError, KeyTerm, NameBinding, SortCondition, ValueBinding,
};

/// インデックスクエリで範囲・前方一致の対象となる固定属性名
pub const DATA_ATTRIBUTE: &str = "data";

/// クエリ記述の構築エラー
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryBuildError {
    /// テーブル名が空
    #[error("Table name must not be empty")]
    EmptyTableName,

    /// インデックス名が空
    #[error("Index name must not be empty")]
    EmptyIndexName,

    /// キー条件が不正
    #[error("Invalid key condition: {0}")]
    InvalidCondition(#[from] KeyConditionError),
}

/// ストアに渡す完全なクエリ記述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    table_name: String,
    index_name: Option<String>,
    condition: KeyCondition,
}

impl QuerySpec {
    /// 任意のキー条件からクエリ記述を作成
    ///
    /// 検証は名前が空でないことのみ。
    pub fn new(
        table_name: impl Into<String>,
        index_name: Option<String>,
        condition: KeyCondition,
    ) -> Result<Self, QueryBuildError> {
        let table_name = table_name.into();
        if table_name.is_empty() {
            return Err(QueryBuildError::EmptyTableName);
        }
        if index_name.as_deref().is_some_and(str::is_empty) {
            return Err(QueryBuildError::EmptyIndexName);
        }

        Ok(Self {
            table_name,
            index_name,
            condition,
        })
    }

    /// `#pk = :pkValue`
    pub fn by_partition_key(
        table_name: &str,
        pk_key: &str,
        pk: &str,
    ) -> Result<Self, QueryBuildError> {
        Self::new(table_name, None, partition_equals(pk_key, pk)?)
    }

    /// `#pk = :pkValue AND begins_with(#sk, :skValue)`
    pub fn by_partition_key_and_sort_prefix(
        table_name: &str,
        pk_key: &str,
        pk: &str,
        sk_key: &str,
        sk_prefix: &str,
    ) -> Result<Self, QueryBuildError> {
        let condition = partition_equals(pk_key, pk)?.and(SortCondition::BeginsWith(
            NameBinding::new("sk", sk_key),
            ValueBinding::new("skValue", sk_prefix),
        ))?;

        Self::new(table_name, None, condition)
    }

    /// `#sk = :skValue`（インデックス指定）
    pub fn by_index_sort_key(
        table_name: &str,
        index_name: &str,
        sk_key: &str,
        sk: &str,
    ) -> Result<Self, QueryBuildError> {
        Self::new(
            table_name,
            Some(index_name.to_string()),
            index_sort_equals(sk_key, sk)?,
        )
    }

    /// `#sk = :skValue AND begins_with(#data, :dataValue)`（インデックス指定）
    pub fn by_index_sort_key_and_data_prefix(
        table_name: &str,
        index_name: &str,
        sk_key: &str,
        sk: &str,
        data_prefix: &str,
    ) -> Result<Self, QueryBuildError> {
        let condition = index_sort_equals(sk_key, sk)?.and(SortCondition::BeginsWith(
            NameBinding::new("data", DATA_ATTRIBUTE),
            ValueBinding::new("dataValue", data_prefix),
        ))?;

        Self::new(table_name, Some(index_name.to_string()), condition)
    }

    /// `#sk = :skValue AND #data BETWEEN :dateStartValue AND :dateEndValue`（インデックス指定）
    ///
    /// 境界値は両端を含む。
    pub fn by_index_sort_key_and_date_range(
        table_name: &str,
        index_name: &str,
        sk_key: &str,
        sk: &str,
        range: &DateRange,
    ) -> Result<Self, QueryBuildError> {
        let condition = index_sort_equals(sk_key, sk)?.and(SortCondition::Between(
            NameBinding::new("data", DATA_ATTRIBUTE),
            ValueBinding::new("dateStartValue", range.start()),
            ValueBinding::new("dateEndValue", range.end()),
        ))?;

        Self::new(table_name, Some(index_name.to_string()), condition)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    pub fn condition(&self) -> &KeyCondition {
        &self.condition
    }

    /// ログ出力用のキー説明（`pk=CUST#42, sk^=ORDER#`形式）
    pub fn describe_keys(&self) -> String {
        self.condition
            .terms()
            .map(|term| match term {
                KeyTerm::Equals { name, value } => {
                    format!("{}={}", name.attribute(), value.value())
                }
                KeyTerm::BeginsWith { name, prefix } => {
                    format!("{}^={}", name.attribute(), prefix.value())
                }
                KeyTerm::Between { name, start, end } => {
                    format!("{} in [{}, {}]", name.attribute(), start.value(), end.value())
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn partition_equals(pk_key: &str, pk: &str) -> Result<KeyCondition, KeyConditionError> {
    KeyCondition::equals(NameBinding::new("pk", pk_key), ValueBinding::new("pkValue", pk))
}

fn index_sort_equals(sk_key: &str, sk: &str) -> Result<KeyCondition, KeyConditionError> {
    KeyCondition::equals(NameBinding::new("sk", sk_key), ValueBinding::new("skValue", sk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn strings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_by_partition_key_orders_scenario() {
        let spec = QuerySpec::by_partition_key("Orders", "pk", "CUST#42").unwrap();

        assert_eq!(spec.table_name(), "Orders");
        assert_eq!(spec.index_name(), None);
        assert_eq!(spec.condition().expression(), "#pk = :pkValue");
        assert_eq!(spec.condition().attribute_names(), strings(&[("#pk", "pk")]));
        assert_eq!(
            spec.condition().attribute_values(),
            strings(&[(":pkValue", "CUST#42")])
        );
    }

    #[test]
    fn test_by_partition_key_and_sort_prefix() {
        let spec = QuerySpec::by_partition_key_and_sort_prefix(
            "Orders", "PK", "CUST#42", "SK", "ORDER#",
        )
        .unwrap();

        assert_eq!(spec.index_name(), None);
        assert_eq!(
            spec.condition().expression(),
            "#pk = :pkValue AND begins_with(#sk, :skValue)"
        );
        assert_eq!(
            spec.condition().attribute_names(),
            strings(&[("#pk", "PK"), ("#sk", "SK")])
        );
        assert_eq!(
            spec.condition().attribute_values(),
            strings(&[(":pkValue", "CUST#42"), (":skValue", "ORDER#")])
        );
    }

    #[test]
    fn test_by_index_sort_key_sets_index() {
        let spec = QuerySpec::by_index_sort_key("Events", "gsi1", "sk", "2023").unwrap();

        assert_eq!(spec.index_name(), Some("gsi1"));
        assert_eq!(spec.condition().expression(), "#sk = :skValue");
        assert_eq!(spec.condition().attribute_names(), strings(&[("#sk", "sk")]));
    }

    #[test]
    fn test_by_index_sort_key_and_data_prefix_uses_fixed_attribute() {
        let spec = QuerySpec::by_index_sort_key_and_data_prefix(
            "Events", "gsi1", "sk", "2023", "USER#",
        )
        .unwrap();

        assert_eq!(spec.index_name(), Some("gsi1"));
        assert_eq!(
            spec.condition().expression(),
            "#sk = :skValue AND begins_with(#data, :dataValue)"
        );
        assert_eq!(
            spec.condition().attribute_names(),
            strings(&[("#sk", "sk"), ("#data", "data")])
        );
        assert_eq!(
            spec.condition().attribute_values(),
            strings(&[(":skValue", "2023"), (":dataValue", "USER#")])
        );
    }

    #[test]
    fn test_by_index_sort_key_and_date_range_events_scenario() {
        let range = DateRange::new("2023-01-01", "2023-12-31");
        let spec =
            QuerySpec::by_index_sort_key_and_date_range("Events", "gsi1", "sk", "2023", &range)
                .unwrap();

        assert_eq!(spec.table_name(), "Events");
        assert_eq!(spec.index_name(), Some("gsi1"));
        assert_eq!(
            spec.condition().expression(),
            "#sk = :skValue AND #data BETWEEN :dateStartValue AND :dateEndValue"
        );
        assert_eq!(
            spec.condition().attribute_names(),
            strings(&[("#sk", "sk"), ("#data", "data")])
        );
        assert_eq!(
            spec.condition().attribute_values(),
            strings(&[
                (":skValue", "2023"),
                (":dateStartValue", "2023-01-01"),
                (":dateEndValue", "2023-12-31"),
            ])
        );
    }

    #[test]
    fn test_empty_table_name_rejected() {
        let result = QuerySpec::by_partition_key("", "pk", "x");
        assert_eq!(result.unwrap_err(), QueryBuildError::EmptyTableName);
    }

    #[test]
    fn test_empty_index_name_rejected() {
        let result = QuerySpec::by_index_sort_key("Events", "", "sk", "x");
        assert_eq!(result.unwrap_err(), QueryBuildError::EmptyIndexName);
    }

    #[test]
    fn test_empty_key_name_rejected() {
        let result = QuerySpec::by_partition_key("Orders", "", "x");
        assert_eq!(
            result.unwrap_err(),
            QueryBuildError::InvalidCondition(KeyConditionError::EmptyAttributeName(
                "#pk".to_string()
            ))
        );
    }

    // 予約語と同名の属性もプレースホルダー経由で参照される
    #[test]
    fn test_reserved_word_attribute_stays_out_of_expression() {
        let spec = QuerySpec::by_partition_key("Orders", "status", "OPEN").unwrap();

        assert!(!spec.condition().expression().contains("status"));
        assert_eq!(spec.condition().attribute_names()["#pk"], "status");
    }

    #[test]
    fn test_describe_keys() {
        let range = DateRange::new("2023-01-01", "2023-12-31");
        let spec =
            QuerySpec::by_index_sort_key_and_date_range("Events", "gsi1", "sk", "2023", &range)
                .unwrap();

        assert_eq!(spec.describe_keys(), "sk=2023, data in [2023-01-01, 2023-12-31]");

        let spec = QuerySpec::by_partition_key_and_sort_prefix("T", "pk", "a", "sk", "b").unwrap();
        assert_eq!(spec.describe_keys(), "pk=a, sk^=b");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            QueryBuildError::EmptyTableName.to_string(),
            "Table name must not be empty"
        );
        assert_eq!(
            QueryBuildError::InvalidCondition(KeyConditionError::DuplicateNamePlaceholder(
                "#pk".to_string()
            ))
            .to_string(),
            "Invalid key condition: Name placeholder #pk is bound more than once"
        );
    }
}
