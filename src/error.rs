// Service error taxonomy. Nothing here is fatal: validation errors are
// rejected before state mutation, everything else degrades the display.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("invalid widget: {0}")]
    Validation(String),

    #[error("unknown widget id: {0}")]
    UnknownWidget(String),

    #[error("data feed failed: {0}")]
    Feed(String),

    #[error("dashboard save failed: {0}")]
    Persistence(String),
}
