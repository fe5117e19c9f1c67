pub mod jwt;
pub mod listeners;
pub mod password;
pub mod phone;

pub use jwt::*;
pub use listeners::*;
pub use password::*;
pub use phone::*;
