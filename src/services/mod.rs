pub mod auth_service;
pub mod draw_engine;
pub mod draw_service;
pub mod inventory_ledger;
pub mod reveal_sequencer;
pub mod reveal_service;
pub mod shipping_service;

pub use auth_service::*;
pub use draw_engine::*;
pub use draw_service::*;
pub use inventory_ledger::*;
pub use reveal_sequencer::*;
pub use reveal_service::*;
pub use shipping_service::*;
