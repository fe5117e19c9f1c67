pub mod documents;
pub mod shipping_records;

pub use documents as document_entity;
pub use shipping_records as shipping_record_entity;
