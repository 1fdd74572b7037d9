// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::chart_data::ChartDataBuilder;
use crate::application::dashboard_service::DashboardService;
use crate::application::data_feed::{
    DashboardStore, HistoricalDataFeed, LiveDataFeed, TagRegistry,
};
use crate::application::sample_store::SampleStore;
use crate::application::session::DashboardSession;
use crate::application::tag_directory::TagDirectoryService;
use crate::domain::layout::DashboardState;
use crate::infrastructure::config::{load_app_config, FeedMode};
use crate::infrastructure::gateway_client::GatewayClient;
use crate::infrastructure::persistence_client::DashboardClient;
use crate::infrastructure::simulator::SimulatorFeed;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear_widgets, create_widget, dashboard_data, delete_widget, get_dashboard, health_check,
    list_plcs, list_tags, refresh_history, update_layout,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_app_config()?;

    // Shared sample store
    let samples = Arc::new(SampleStore::new());

    // Select data sources per mode (infrastructure layer)
    let (registry, live, historical): (
        Arc<dyn TagRegistry>,
        Arc<dyn LiveDataFeed>,
        Arc<dyn HistoricalDataFeed>,
    ) = match config.data.mode {
        FeedMode::Demo => {
            let simulator = Arc::new(SimulatorFeed::new());
            (simulator.clone(), simulator.clone(), simulator)
        }
        FeedMode::Gateway => {
            let gateway = Arc::new(GatewayClient::new(config.gateway.host.clone()));
            (gateway.clone(), gateway.clone(), gateway)
        }
    };
    let store: Arc<dyn DashboardStore> =
        Arc::new(DashboardClient::new(config.persistence.host.clone()));

    // Create services (application layer)
    let dashboards = DashboardService::new(
        store,
        DashboardState::named(config.persistence.dashboard_name.clone()),
    );
    let session = DashboardSession::new(
        samples.clone(),
        dashboards.clone(),
        live,
        historical,
        Duration::from_secs(config.data.poll_interval_secs),
        chrono::Duration::hours(config.data.history_window_hours),
    );
    session.start();

    // Create application state
    let state = Arc::new(AppState {
        tag_directory: TagDirectoryService::new(registry),
        dashboards,
        charts: ChartDataBuilder::new(samples),
        session,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/tags", get(list_tags))
        .route("/plcs", get(list_plcs))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/data", get(dashboard_data))
        .route("/dashboard/layout", put(update_layout))
        .route("/widgets", post(create_widget).delete(clear_widgets))
        .route("/widgets/:id", delete(delete_widget))
        .route("/history/refresh", post(refresh_history))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("starting plant-dashboard on {addr}");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
