// Infrastructure layer modules
pub mod config;
pub mod inmemory_store;
pub mod item_codec;
pub mod logging;
pub mod store_client;

// Re-exports
pub use config::{DynamoDbConfig, DynamoDbConfigError, DynamoDbSettings};
pub use inmemory_store::{InMemoryStoreClient, InMemoryStoreError, KeySchema};
pub use item_codec::{ItemCodecError, ToItem, from_items};
pub use logging::init_logging;
pub use store_client::{
    DynamoStoreClient, Item, QueryPage, StoreClient, StoreError, StoreOperation,
};
