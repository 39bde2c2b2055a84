pub mod client;
pub mod config;
pub mod message;
pub mod refresh;
pub mod session;
