// Presentation layer - View models consumed by widget renderers
pub mod canvas;
