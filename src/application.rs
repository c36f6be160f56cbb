// アプリケーション層モジュール
pub mod item_store;

// 再エクスポート
pub use item_store::{ItemStore, ItemStoreError, QueryResult};
