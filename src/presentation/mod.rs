// Presentation layer - HTTP surface for the rendering frontend
pub mod app_state;
pub mod handlers;
