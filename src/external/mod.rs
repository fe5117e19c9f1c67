pub mod database_store;
pub mod document_store;
pub mod shipping_sink;

pub use database_store::*;
pub use document_store::*;
pub use shipping_sink::*;
