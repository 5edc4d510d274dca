pub mod config;
pub mod identity;
pub mod lifecycle;
pub mod mdc;
pub mod user_logging;
