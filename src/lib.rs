// Interactive layer of a live dashboard builder: grid geometry, drag
// gestures, the per-dashboard data channel and the state store.
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
