pub mod auth;
pub mod common;
pub mod draw;
pub mod prize;
pub mod reveal;
pub mod shipping;

pub use auth::*;
pub use common::*;
pub use draw::*;
pub use prize::*;
pub use reveal::*;
pub use shipping::*;
