//! DynamoDBへのクエリ/書き込みリクエストを組み立てて発行する薄いファサード

// Domain layer modules
pub mod domain;

// Infrastructure layer modules
pub mod infrastructure;

// Application layer modules
pub mod application;

pub use application::{ItemStore, ItemStoreError, QueryResult};
pub use domain::{DateRange, QuerySpec};
pub use infrastructure::{DynamoStoreClient, Item, StoreClient, StoreError, ToItem};
