// HTTP request handlers
use crate::application::chart_data::WidgetData;
use crate::domain::layout::{DashboardState, LayoutItem};
use crate::domain::tag::{Plc, Tag};
use crate::domain::widget::{Widget, WidgetDraft};
use crate::error::DashboardError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

/// One widget plus its chart-ready payload.
#[derive(Debug, Serialize)]
pub struct WidgetPayload {
    pub widget: Widget,
    pub data: WidgetData,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List configured tags for the selection UI
pub async fn list_tags(State(state): State<Arc<AppState>>) -> Json<Vec<Tag>> {
    match state.tag_directory.list_tags().await {
        Ok(tags) => Json(tags),
        Err(e) => {
            tracing::error!("listing tags failed: {e:#}");
            // Degrade to an empty list rather than erroring the UI.
            Json(Vec::new())
        }
    }
}

/// List configured PLCs
pub async fn list_plcs(State(state): State<Arc<AppState>>) -> Json<Vec<Plc>> {
    match state.tag_directory.list_plcs().await {
        Ok(plcs) => Json(plcs),
        Err(e) => {
            tracing::error!("listing PLCs failed: {e:#}");
            Json(Vec::new())
        }
    }
}

/// Current dashboard configuration (widgets + layout)
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardState> {
    Json(state.dashboards.snapshot().await)
}

/// Chart-ready data for every widget on the dashboard
pub async fn dashboard_data(State(state): State<Arc<AppState>>) -> Json<Vec<WidgetPayload>> {
    let display_names = match state.tag_directory.display_names().await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("tag names unavailable, labeling by id: {e:#}");
            Default::default()
        }
    };

    let snapshot = state.dashboards.snapshot().await;
    let mut payloads = Vec::with_capacity(snapshot.widgets.len());
    for widget in snapshot.widgets {
        let data = state.charts.build(&widget, &display_names).await;
        payloads.push(WidgetPayload { widget, data });
    }
    Json(payloads)
}

/// Create a widget from the builder dialog
pub async fn create_widget(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<WidgetDraft>,
) -> impl IntoResponse {
    match state.dashboards.create_widget(draft).await {
        Ok(widget) => {
            // Newly bound tags need history; the session's sequencing
            // discards this fetch if a later one supersedes it.
            let session = state.session.clone();
            tokio::spawn(async move {
                if let Err(e) = session.refresh_recent().await {
                    tracing::warn!("historical refresh failed: {e:#}");
                }
            });
            (StatusCode::CREATED, Json(widget)).into_response()
        }
        Err(e @ DashboardError::Validation(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Remove one widget and its layout item
pub async fn delete_widget(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.dashboards.remove_widget(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ DashboardError::UnknownWidget(_)) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Clear the whole dashboard
pub async fn clear_widgets(State(state): State<Arc<AppState>>) -> StatusCode {
    state.dashboards.clear().await;
    StatusCode::NO_CONTENT
}

/// Replace the layout after a grid drag/resize
pub async fn update_layout(
    State(state): State<Arc<AppState>>,
    Json(items): Json<Vec<LayoutItem>>,
) -> StatusCode {
    state.dashboards.update_layout(items).await;
    StatusCode::NO_CONTENT
}

/// Re-fetch historical data for the bound tag set
pub async fn refresh_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.session.refresh_recent().await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            let err = DashboardError::Feed(format!("{e:#}"));
            tracing::warn!("{err}");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}
