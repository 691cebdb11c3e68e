pub mod client;
pub mod config;
pub mod processor;
pub mod protocol;
pub mod server;
pub mod systems;
