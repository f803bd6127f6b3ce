pub mod client;
pub mod constants;
pub mod conversation;
pub mod health;
pub mod logging;
pub mod main_helper;
pub mod proxy;
pub mod redaction;
pub mod server;
pub mod specs;
pub mod str_utils;
pub mod tui;
pub mod types;

pub use main_helper::*;
pub use types::*;
