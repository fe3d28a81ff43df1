// Domain layer - Plain data types and their invariants
pub mod dashboard;
pub mod error;
pub mod event;
pub mod layout;
pub mod view;
pub mod widget;
