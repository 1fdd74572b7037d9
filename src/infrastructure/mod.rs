// Infrastructure layer - external dependencies and adapters
pub mod config;
pub mod gateway_client;
pub mod persistence_client;
pub mod simulator;
