pub mod cli;
pub mod client;
pub mod config;
pub mod notify;
pub mod poller;
