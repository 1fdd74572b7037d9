// Application state for HTTP handlers
use crate::application::chart_data::ChartDataBuilder;
use crate::application::dashboard_service::DashboardService;
use crate::application::session::DashboardSession;
use crate::application::tag_directory::TagDirectoryService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub tag_directory: TagDirectoryService,
    pub dashboards: Arc<DashboardService>,
    pub charts: ChartDataBuilder,
    pub session: Arc<DashboardSession>,
}
