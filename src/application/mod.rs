// Application layer - services and repository trait seams
pub mod chart_data;
pub mod dashboard_service;
pub mod data_feed;
pub mod sample_store;
pub mod session;
pub mod tag_directory;
