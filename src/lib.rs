pub mod config;
pub mod controller;
pub mod listener;
pub mod logging;
pub mod mailbox;
pub mod pop3;
pub mod store;

pub use tracing;
