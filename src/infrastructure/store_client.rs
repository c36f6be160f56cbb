/// DynamoDBクライアントへの薄いラッパー
///
/// クエリ・単一Put・トランザクションPutの3種類の呼び出しだけを抽象化する。
/// 失敗はリトライも再分類もせず、SDKのエラーを原因として保持したまま返す。
use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem};
use thiserror::Error;

use crate::domain::QuerySpec;

/// ストアのネイティブ表現による1レコード（属性名 -> 型付き値）
pub type Item = HashMap<String, AttributeValue>;

/// 失敗したストア呼び出しの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Query,
    PutItem,
    TransactWriteItems,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOperation::Query => write!(f, "Query"),
            StoreOperation::PutItem => write!(f, "PutItem"),
            StoreOperation::TransactWriteItems => write!(f, "TransactWriteItems"),
        }
    }
}

/// ストア呼び出しの失敗
///
/// 元のエラーは`source()`/`cause()`からダウンキャストして参照できる。
#[derive(Debug, Error)]
#[error("{operation} failed: {message}")]
pub struct StoreError {
    operation: StoreOperation,
    message: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl StoreError {
    /// 任意のエラーを原因として包む
    pub fn new<E>(operation: StoreOperation, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            operation,
            message: source.to_string(),
            source: Box::new(source),
        }
    }

    /// AWS SDKのエラーを包む（原因チェーンをメッセージに展開）
    pub fn from_sdk<E>(operation: StoreOperation, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            operation,
            message: DisplayErrorContext(&source).to_string(),
            source: Box::new(source),
        }
    }

    pub fn operation(&self) -> StoreOperation {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 元のエラー
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// 元のエラーを具体型として取得
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }
}

/// クエリ結果の1ページ目
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    /// ストアが報告した一致件数
    pub count: i32,
    /// ストアが返した順序のままのアイテム
    pub items: Vec<Item>,
    /// 続きのページが存在するか（取得はしない）
    pub has_more: bool,
}

/// ストアクライアントのトレイト
///
/// 実際のDynamoDB実装とテスト用のスタブを差し替えられるようにする。
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// クエリを1回だけ発行し、最初のページを返す
    async fn query(&self, spec: &QuerySpec) -> Result<QueryPage, StoreError>;

    /// 無条件のPut（同じキーのアイテムは丸ごと置き換わる）
    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), StoreError>;

    /// 複数のPutを1つのトランザクションとして発行（全件コミットか全件なし）
    async fn transact_put_items(&self, puts: Vec<(String, Item)>) -> Result<(), StoreError>;
}

/// StoreClientのDynamoDB実装
///
/// `aws_sdk_dynamodb::Client`は内部で共有されるため、cloneして全呼び出し元で使い回せる。
#[derive(Debug, Clone)]
pub struct DynamoStoreClient {
    /// DynamoDBクライアント
    client: DynamoDbClient,
}

impl DynamoStoreClient {
    /// 新しいDynamoStoreClientを作成
    ///
    /// # 引数
    /// * `client` - DynamoDBクライアント
    pub fn new(client: DynamoDbClient) -> Self {
        Self { client }
    }

    /// ExpressionAttributeValuesを文字列型（S）の属性値に変換
    fn attribute_values(spec: &QuerySpec) -> HashMap<String, AttributeValue> {
        spec.condition()
            .attribute_values()
            .into_iter()
            .map(|(placeholder, value)| (placeholder, AttributeValue::S(value)))
            .collect()
    }

    /// TransactWriteItemのPutを組み立てる
    fn build_put(table_name: String, item: Item) -> Result<TransactWriteItem, StoreError> {
        let put = Put::builder()
            .table_name(table_name)
            .set_item(Some(item))
            .build()
            .map_err(|e| StoreError::from_sdk(StoreOperation::TransactWriteItems, e))?;

        Ok(TransactWriteItem::builder().put(put).build())
    }
}

#[async_trait]
impl StoreClient for DynamoStoreClient {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryPage, StoreError> {
        let output = self
            .client
            .query()
            .table_name(spec.table_name())
            .set_index_name(spec.index_name().map(str::to_string))
            .key_condition_expression(spec.condition().expression())
            .set_expression_attribute_names(Some(spec.condition().attribute_names()))
            .set_expression_attribute_values(Some(Self::attribute_values(spec)))
            .send()
            .await
            .map_err(|e| StoreError::from_sdk(StoreOperation::Query, e))?;

        Ok(QueryPage {
            count: output.count(),
            has_more: output.last_evaluated_key().is_some(),
            items: output.items.unwrap_or_default(),
        })
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::from_sdk(StoreOperation::PutItem, e))?;

        Ok(())
    }

    async fn transact_put_items(&self, puts: Vec<(String, Item)>) -> Result<(), StoreError> {
        let transact_items = puts
            .into_iter()
            .map(|(table_name, item)| Self::build_put(table_name, item))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .transact_write_items()
            .set_transact_items(Some(transact_items))
            .send()
            .await
            .map_err(|e| StoreError::from_sdk(StoreOperation::TransactWriteItems, e))?;

        Ok(())
    }
}
