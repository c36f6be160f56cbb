/// StoreClientのインメモリ実装
///
/// テストやローカル開発でDynamoDBの代わりに使う。
/// テーブルはキースキーマ付きで事前に宣言し、クエリはConditionEvaluatorで評価する。
/// セカンダリインデックスは宣言しない。インデックスへのクエリは、条件式のソート側の属性を
/// そのインデックスの範囲キーとみなす。
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use thiserror::Error;

use super::store_client::{Item, QueryPage, StoreClient, StoreError, StoreOperation};
use crate::domain::{ConditionEvaluator, QuerySpec};

/// インメモリストアが返すエラー（StoreErrorの原因として包まれる）
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InMemoryStoreError {
    /// 宣言されていないテーブル
    #[error("Requested resource not found: table {0}")]
    TableNotFound(String),

    /// キー属性が欠落または文字列以外
    #[error("Missing key attribute {attribute} for table {table}")]
    MissingKeyAttribute { table: String, attribute: String },

    /// 空のトランザクション
    #[error("Transaction request must contain at least one item")]
    EmptyTransaction,

    /// 1トランザクション内で同じアイテムを複数回操作
    #[error("Transaction request cannot include multiple operations on one item")]
    DuplicateItemInTransaction,
}

/// テーブルのキースキーマ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    partition_key: String,
    sort_key: Option<String>,
}

impl KeySchema {
    /// パーティションキーのみのスキーマ
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// パーティションキー + ソートキーのスキーマ
    pub fn composite(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: Some(sort_key.into()),
        }
    }

    /// アイテムの主キーを取り出す
    fn key_of(&self, table: &str, item: &Item) -> Result<(String, Option<String>), InMemoryStoreError> {
        let partition = string_attribute(item, &self.partition_key)
            .ok_or_else(|| InMemoryStoreError::MissingKeyAttribute {
                table: table.to_string(),
                attribute: self.partition_key.clone(),
            })?
            .to_string();

        let sort = match &self.sort_key {
            Some(sort_key) => Some(
                string_attribute(item, sort_key)
                    .ok_or_else(|| InMemoryStoreError::MissingKeyAttribute {
                        table: table.to_string(),
                        attribute: sort_key.clone(),
                    })?
                    .to_string(),
            ),
            None => None,
        };

        Ok((partition, sort))
    }
}

#[derive(Debug, Clone)]
struct Table {
    schema: KeySchema,
    /// 挿入順を保持するアイテム列
    items: Vec<Item>,
}

impl Table {
    /// 同じキーのアイテムを置き換え、なければ末尾に追加
    fn upsert(&mut self, key: &(String, Option<String>), table: &str, item: Item) {
        let position = self.items.iter().position(|existing| {
            self.schema
                .key_of(table, existing)
                .is_ok_and(|existing_key| &existing_key == key)
        });

        match position {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }
}

/// StoreClientのインメモリ実装
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoreClient {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl InMemoryStoreClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// テーブルを宣言
    pub fn with_table(self, table_name: impl Into<String>, schema: KeySchema) -> Self {
        self.lock().insert(
            table_name.into(),
            Table {
                schema,
                items: Vec::new(),
            },
        );
        self
    }

    /// テーブル内のアイテムを挿入順で取得（テスト用）
    pub fn items(&self, table_name: &str) -> Vec<Item> {
        self.lock()
            .get(table_name)
            .map(|table| table.items.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Table>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn string_attribute<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Some(value.as_str()),
        _ => None,
    }
}

#[async_trait]
impl StoreClient for InMemoryStoreClient {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryPage, StoreError> {
        let tables = self.lock();
        let table = tables.get(spec.table_name()).ok_or_else(|| {
            StoreError::new(
                StoreOperation::Query,
                InMemoryStoreError::TableNotFound(spec.table_name().to_string()),
            )
        })?;

        let mut items: Vec<Item> = table
            .items
            .iter()
            .filter(|item| {
                ConditionEvaluator::matches(spec.condition(), |name| string_attribute(item, name))
            })
            .cloned()
            .collect();

        // 範囲キーの昇順。範囲キーがなければ挿入順のまま
        let range_key = match spec.index_name() {
            None => table.schema.sort_key.as_deref(),
            Some(_) => spec.condition().sort().map(|term| term.name().attribute()),
        };
        if let Some(range_key) = range_key {
            items.sort_by(|a, b| string_attribute(a, range_key).cmp(&string_attribute(b, range_key)));
        }

        Ok(QueryPage {
            count: items.len() as i32,
            items,
            has_more: false,
        })
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let table = tables.get_mut(table_name).ok_or_else(|| {
            StoreError::new(
                StoreOperation::PutItem,
                InMemoryStoreError::TableNotFound(table_name.to_string()),
            )
        })?;

        let key = table
            .schema
            .key_of(table_name, &item)
            .map_err(|e| StoreError::new(StoreOperation::PutItem, e))?;
        table.upsert(&key, table_name, item);

        Ok(())
    }

    async fn transact_put_items(&self, puts: Vec<(String, Item)>) -> Result<(), StoreError> {
        let to_store_error = |e: InMemoryStoreError| StoreError::new(StoreOperation::TransactWriteItems, e);
        if puts.is_empty() {
            return Err(to_store_error(InMemoryStoreError::EmptyTransaction));
        }
        let mut tables = self.lock();

        // すべてのPutを検証してから適用する（全件か0件）
        let mut keys = Vec::with_capacity(puts.len());
        for (table_name, item) in &puts {
            let table = tables
                .get(table_name)
                .ok_or_else(|| InMemoryStoreError::TableNotFound(table_name.clone()))
                .map_err(to_store_error)?;
            let key = table
                .schema
                .key_of(table_name, item)
                .map_err(to_store_error)?;

            let entry = (table_name.clone(), key);
            if keys.contains(&entry) {
                return Err(to_store_error(
                    InMemoryStoreError::DuplicateItemInTransaction,
                ));
            }
            keys.push(entry);
        }

        for ((table_name, key), (_, item)) in keys.into_iter().zip(puts) {
            if let Some(table) = tables.get_mut(&table_name) {
                table.upsert(&key, &table_name, item);
            }
        }

        Ok(())
    }
}
