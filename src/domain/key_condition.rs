/// キー条件式のモデル
///
/// DynamoDBのKeyConditionExpressionを文字列連結ではなくデータとして表現する。
/// 属性名は必ず`#name`プレースホルダー、リテラル値は必ず`:value`プレースホルダー経由で
/// 参照するため、予約語と衝突する属性名もそのまま扱える。
use std::collections::HashMap;

use thiserror::Error;

/// キー条件の構築エラー
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyConditionError {
    /// 属性名が空
    #[error("Attribute name for placeholder {0} must not be empty")]
    EmptyAttributeName(String),

    /// 同じ名前プレースホルダーが複数回割り当てられた
    #[error("Name placeholder {0} is bound more than once")]
    DuplicateNamePlaceholder(String),

    /// 同じ値プレースホルダーが複数回割り当てられた
    #[error("Value placeholder {0} is bound more than once")]
    DuplicateValuePlaceholder(String),
}

/// 属性名プレースホルダー（`#pk` -> `pk`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameBinding {
    placeholder: String,
    attribute: String,
}

impl NameBinding {
    /// `token`から`#token`形式のプレースホルダーを作り、`attribute`を割り当てる
    pub fn new(token: &str, attribute: impl Into<String>) -> Self {
        Self {
            placeholder: format!("#{}", token),
            attribute: attribute.into(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

/// 値プレースホルダー（`:pkValue` -> `CUST#42`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBinding {
    placeholder: String,
    value: String,
}

impl ValueBinding {
    /// `token`から`:token`形式のプレースホルダーを作り、`value`を割り当てる
    pub fn new(token: &str, value: impl Into<String>) -> Self {
        Self {
            placeholder: format!(":{}", token),
            value: value.into(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// 条件式の1項
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTerm {
    /// 完全一致: `#name = :value`
    Equals { name: NameBinding, value: ValueBinding },
    /// 前方一致: `begins_with(#name, :prefix)`
    BeginsWith { name: NameBinding, prefix: ValueBinding },
    /// 範囲一致（両端を含む）: `#name BETWEEN :start AND :end`
    Between {
        name: NameBinding,
        start: ValueBinding,
        end: ValueBinding,
    },
}

impl KeyTerm {
    /// この項が参照する属性名プレースホルダー
    pub fn name(&self) -> &NameBinding {
        match self {
            KeyTerm::Equals { name, .. }
            | KeyTerm::BeginsWith { name, .. }
            | KeyTerm::Between { name, .. } => name,
        }
    }

    /// この項が参照する値プレースホルダー（宣言順）
    pub fn values(&self) -> Vec<&ValueBinding> {
        match self {
            KeyTerm::Equals { value, .. } => vec![value],
            KeyTerm::BeginsWith { prefix, .. } => vec![prefix],
            KeyTerm::Between { start, end, .. } => vec![start, end],
        }
    }

    /// 条件式の断片を生成
    pub fn render(&self) -> String {
        match self {
            KeyTerm::Equals { name, value } => {
                format!("{} = {}", name.placeholder(), value.placeholder())
            }
            KeyTerm::BeginsWith { name, prefix } => {
                format!("begins_with({}, {})", name.placeholder(), prefix.placeholder())
            }
            KeyTerm::Between { name, start, end } => format!(
                "{} BETWEEN {} AND {}",
                name.placeholder(),
                start.placeholder(),
                end.placeholder()
            ),
        }
    }
}

/// ソートキー側の条件
///
/// パーティション側は常に完全一致なので、ここでは前方一致と範囲のみを許す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortCondition {
    BeginsWith(NameBinding, ValueBinding),
    Between(NameBinding, ValueBinding, ValueBinding),
}

impl From<SortCondition> for KeyTerm {
    fn from(condition: SortCondition) -> Self {
        match condition {
            SortCondition::BeginsWith(name, prefix) => KeyTerm::BeginsWith { name, prefix },
            SortCondition::Between(name, start, end) => KeyTerm::Between { name, start, end },
        }
    }
}

/// キー条件: パーティション側の完全一致と、任意のソート側条件のAND
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCondition {
    partition: KeyTerm,
    sort: Option<KeyTerm>,
}

impl KeyCondition {
    /// 完全一致のみのキー条件を作成
    pub fn equals(name: NameBinding, value: ValueBinding) -> Result<Self, KeyConditionError> {
        let condition = Self {
            partition: KeyTerm::Equals { name, value },
            sort: None,
        };
        condition.validate()?;
        Ok(condition)
    }

    /// 完全一致にソート側の条件をAND結合する（既存のソート側条件は置き換える）
    pub fn and(self, sort: SortCondition) -> Result<Self, KeyConditionError> {
        let condition = Self {
            partition: self.partition,
            sort: Some(sort.into()),
        };
        condition.validate()?;
        Ok(condition)
    }

    pub fn partition(&self) -> &KeyTerm {
        &self.partition
    }

    pub fn sort(&self) -> Option<&KeyTerm> {
        self.sort.as_ref()
    }

    /// 条件式に含まれる項（パーティション、ソートの順）
    pub fn terms(&self) -> impl Iterator<Item = &KeyTerm> {
        std::iter::once(&self.partition).chain(self.sort.iter())
    }

    /// KeyConditionExpression文字列を生成
    pub fn expression(&self) -> String {
        self.terms()
            .map(KeyTerm::render)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// ExpressionAttributeNames（プレースホルダー -> 属性名）
    pub fn attribute_names(&self) -> HashMap<String, String> {
        self.terms()
            .map(|term| {
                let name = term.name();
                (name.placeholder().to_string(), name.attribute().to_string())
            })
            .collect()
    }

    /// ExpressionAttributeValues（プレースホルダー -> リテラル値）
    pub fn attribute_values(&self) -> HashMap<String, String> {
        self.terms()
            .flat_map(KeyTerm::values)
            .map(|value| (value.placeholder().to_string(), value.value().to_string()))
            .collect()
    }

    /// プレースホルダーごとに1つの束縛だけを持つことを検証
    fn validate(&self) -> Result<(), KeyConditionError> {
        let mut names: HashMap<&str, &str> = HashMap::new();
        let mut values: HashMap<&str, &str> = HashMap::new();

        for term in self.terms() {
            let name = term.name();
            if name.attribute().is_empty() {
                return Err(KeyConditionError::EmptyAttributeName(
                    name.placeholder().to_string(),
                ));
            }
            if names
                .insert(name.placeholder(), name.attribute())
                .is_some()
            {
                return Err(KeyConditionError::DuplicateNamePlaceholder(
                    name.placeholder().to_string(),
                ));
            }

            for value in term.values() {
                if values.insert(value.placeholder(), value.value()).is_some() {
                    return Err(KeyConditionError::DuplicateValuePlaceholder(
                        value.placeholder().to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
