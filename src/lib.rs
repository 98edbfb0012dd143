pub mod common;
pub mod config;
pub mod media;
pub mod scene;
pub mod server;
pub mod transport;
pub mod ws;
