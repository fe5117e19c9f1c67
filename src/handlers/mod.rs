pub mod admin;
pub mod auth;
pub mod draw;
pub mod reveal;
pub mod shipping;

pub use admin::admin_config;
pub use auth::auth_config;
pub use draw::draw_config;
pub use reveal::reveal_config;
pub use shipping::shipping_config;
