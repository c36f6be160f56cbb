/// クエリ/書き込みファサード
///
/// 呼び出しパラメータからクエリ記述を組み立ててStoreClientに渡し、結果を正規化する。
/// 呼び出し間で保持する状態はクライアントだけ。
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{DateRange, QueryBuildError, QuerySpec};
use crate::infrastructure::{
    DynamoDbConfig, DynamoStoreClient, Item, ItemCodecError, StoreClient, StoreError, ToItem,
    from_items,
};

/// ファサードのエラー型
#[derive(Debug, Error)]
pub enum ItemStoreError {
    /// クエリ記述を組み立てられない（ストアには問い合わせない）
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryBuildError),

    /// 書き込み先のテーブル名が空（ストアには問い合わせない）
    #[error("Table name must not be empty")]
    EmptyTableName,

    /// ストア呼び出しの失敗（そのまま透過）
    #[error(transparent)]
    Store(#[from] StoreError),

    /// レコードのシリアライズ/デシリアライズ失敗（ストアには問い合わせない）
    #[error(transparent)]
    Serialization(#[from] ItemCodecError),

    /// トランザクション内の特定レコードのシリアライズ失敗
    #[error("Item {index} in transaction: {source}")]
    ItemSerialization {
        index: usize,
        #[source]
        source: ItemCodecError,
    },
}

impl ItemStoreError {
    /// ストア呼び出しの失敗であれば元のStoreErrorを返す
    pub fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            ItemStoreError::Store(err) => Some(err),
            _ => None,
        }
    }
}

/// クエリ結果: 一致0件は`None`、それ以外はストアが返した順のアイテム
pub type QueryResult = Result<Option<Vec<Item>>, ItemStoreError>;

/// クエリ/書き込みファサード
///
/// クライアントは構築時に注入する。DynamoDB実装もインメモリ実装も
/// cloneで共有できるため、ファサード自体もcloneして複数タスクから使える。
#[derive(Debug, Clone)]
pub struct ItemStore<C>
where
    C: StoreClient,
{
    client: C,
}

impl ItemStore<DynamoStoreClient> {
    /// 設定済みのDynamoDBクライアントからファサードを作成
    pub fn from_config(config: &DynamoDbConfig) -> Self {
        Self::new(DynamoStoreClient::new(config.client().clone()))
    }
}

impl<C> ItemStore<C>
where
    C: StoreClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// 組み立て済みのクエリ記述を実行
    ///
    /// # 戻り値
    /// * 一致が1件以上なら`Ok(Some(items))`（1ページ目のみ、無加工）
    /// * 一致0件なら`Ok(None)`
    /// * ストア呼び出し失敗は`Err(ItemStoreError::Store)`
    pub async fn query_by_params(&self, spec: &QuerySpec) -> QueryResult {
        info!(
            table = spec.table_name(),
            index = spec.index_name(),
            keys = %spec.describe_keys(),
            condition = %spec.condition().expression(),
            "クエリ実行"
        );

        let page = self.client.query(spec).await?;

        if page.has_more {
            warn!(
                table = spec.table_name(),
                returned = page.items.len(),
                "続きのページがありますが1ページ目のみ返します"
            );
        }

        if page.count <= 0 {
            return Ok(None);
        }

        Ok(Some(page.items))
    }

    /// クエリを実行し、結果を呼び出し元の型に変換
    pub async fn query_as<T>(&self, spec: &QuerySpec) -> Result<Option<Vec<T>>, ItemStoreError>
    where
        T: DeserializeOwned,
    {
        match self.query_by_params(spec).await? {
            Some(items) => Ok(Some(from_items(items)?)),
            None => Ok(None),
        }
    }

    /// パーティションキーの完全一致でクエリ
    pub async fn query_by_pk(&self, table_name: &str, pk_key: &str, pk: &str) -> QueryResult {
        let spec = QuerySpec::by_partition_key(table_name, pk_key, pk)?;
        self.query_by_params(&spec).await
    }

    /// パーティションキーの完全一致 + ソートキーの前方一致でクエリ
    pub async fn query_by_pk_sk(
        &self,
        table_name: &str,
        pk_key: &str,
        pk: &str,
        sk_key: &str,
        sk_prefix: &str,
    ) -> QueryResult {
        let spec =
            QuerySpec::by_partition_key_and_sort_prefix(table_name, pk_key, pk, sk_key, sk_prefix)?;
        self.query_by_params(&spec).await
    }

    /// セカンダリインデックスのソートキー完全一致でクエリ
    pub async fn query_by_gsi_sk(
        &self,
        table_name: &str,
        index_name: &str,
        sk_key: &str,
        sk: &str,
    ) -> QueryResult {
        let spec = QuerySpec::by_index_sort_key(table_name, index_name, sk_key, sk)?;
        self.query_by_params(&spec).await
    }

    /// インデックスのソートキー完全一致 + `data`属性の前方一致でクエリ
    pub async fn query_by_gsi_sk_data(
        &self,
        table_name: &str,
        index_name: &str,
        sk_key: &str,
        sk: &str,
        data_prefix: &str,
    ) -> QueryResult {
        let spec = QuerySpec::by_index_sort_key_and_data_prefix(
            table_name,
            index_name,
            sk_key,
            sk,
            data_prefix,
        )?;
        self.query_by_params(&spec).await
    }

    /// インデックスのソートキー完全一致 + `data`属性の範囲（両端を含む）でクエリ
    pub async fn query_by_gsi_sk_date_range(
        &self,
        table_name: &str,
        index_name: &str,
        sk_key: &str,
        sk: &str,
        range: &DateRange,
    ) -> QueryResult {
        let spec = QuerySpec::by_index_sort_key_and_date_range(
            table_name, index_name, sk_key, sk, range,
        )?;
        self.query_by_params(&spec).await
    }

    /// レコードを1件書き込む（同じキーのアイテムは丸ごと置き換え）
    ///
    /// テーブル名が空の場合やシリアライズに失敗した場合はストアに問い合わせずにエラーを返す。
    pub async fn put_item<R>(&self, table_name: &str, record: &R) -> Result<(), ItemStoreError>
    where
        R: ToItem + Debug + ?Sized,
    {
        if table_name.is_empty() {
            return Err(ItemStoreError::EmptyTableName);
        }

        let item = record.to_item().inspect_err(|err| {
            error!(
                table = table_name,
                record = ?record,
                error = %err,
                "レコードのシリアライズに失敗"
            );
        })?;

        self.client.put_item(table_name, item).await?;
        Ok(())
    }

    /// 複数レコードを1つのトランザクションで書き込む
    ///
    /// テーブル名が空の場合はストアに問い合わせずにエラーを返す。
    /// 1件でもシリアライズに失敗したら、ストアに何も送らずにそのレコードのエラーを返す。
    pub async fn transact_write_items<R>(
        &self,
        table_name: &str,
        records: &[R],
    ) -> Result<(), ItemStoreError>
    where
        R: ToItem + Debug,
    {
        if table_name.is_empty() {
            return Err(ItemStoreError::EmptyTableName);
        }

        let mut puts = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let item = record.to_item().map_err(|source| {
                error!(
                    table = table_name,
                    index = index,
                    record = ?record,
                    error = %source,
                    "トランザクション内のレコードのシリアライズに失敗"
                );
                ItemStoreError::ItemSerialization { index, source }
            })?;
            puts.push((table_name.to_string(), item));
        }

        self.client.transact_put_items(puts).await?;
        Ok(())
    }
}
