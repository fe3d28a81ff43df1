// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod dependencies_api;
pub mod http_repository;
pub mod log_stream;
pub mod logging;
pub mod ws_channel;
