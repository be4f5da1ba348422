pub mod catalog;
pub mod config;
pub mod upload;

pub use config::DatabaseConfig;
pub use upload::{connect, upload, upload_to_mongodb, CollectionName, DocumentSink, Upload};
