pub mod config;
pub mod connection;
pub mod expiry;
pub mod handlers;
pub mod server;
mod server_state;
mod session;
mod topic;
