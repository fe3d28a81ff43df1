// Application layer - Use cases and the seams infrastructure implements
pub mod dashboard_channel;
pub mod dashboard_repository;
pub mod dashboard_session;
pub mod dashboard_store;
pub mod drag_controller;
pub mod geometry;
pub mod live_data_client;
