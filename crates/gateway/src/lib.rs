pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod quality;
pub mod render;
pub mod routes;
pub mod server;
pub mod state;
pub mod upload;
