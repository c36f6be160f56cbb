/// 任意のレコードとDynamoDBアイテムの相互変換
///
/// `Serialize`を実装する型はすべて`ToItem`として扱える。
/// 構造体のフィールド名が属性名になり、入れ子の構造はMap/Listに再帰的に変換される。
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::store_client::Item;

/// アイテム変換のエラー型
#[derive(Debug, Error)]
pub enum ItemCodecError {
    /// レコードをアイテムに変換できない（マップ以外のトップレベル値、非対応の型など）
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_dynamo::Error),

    /// アイテムをレコードに変換できない
    #[error("Deserialization error: {0}")]
    Deserialize(#[source] serde_dynamo::Error),
}

/// ストアのアイテム表現を生成できるレコード
pub trait ToItem {
    fn to_item(&self) -> Result<Item, ItemCodecError>;
}

impl<T> ToItem for T
where
    T: Serialize + ?Sized,
{
    fn to_item(&self) -> Result<Item, ItemCodecError> {
        serde_dynamo::aws_sdk_dynamodb_1::to_item(self).map_err(ItemCodecError::Serialize)
    }
}

/// クエリ結果のアイテム列を呼び出し元の型に変換
pub fn from_items<T>(items: Vec<Item>) -> Result<Vec<T>, ItemCodecError>
where
    T: DeserializeOwned,
{
    serde_dynamo::aws_sdk_dynamodb_1::from_items(items).map_err(ItemCodecError::Deserialize)
}
