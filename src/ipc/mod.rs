//! IPC module for daemon-client communication

mod protocol;
mod server;

pub use protocol::{DaemonStatus, Notification};
pub use server::Server;
