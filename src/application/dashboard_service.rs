// Dashboard service - widget/layout configuration and debounced persistence
use crate::application::data_feed::DashboardStore;
use crate::domain::layout::{next_free_y, DashboardState, LayoutItem};
use crate::domain::tag::TagId;
use crate::domain::widget::{default_size, Widget, WidgetDraft};
use crate::error::DashboardError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Quiet period after the last mutation before a save goes out.
pub const SAVE_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Owns the dashboard's widget list and layout. Every mutation keeps the
/// Widget/LayoutItem pair consistent under one lock and schedules a
/// debounced save; a save failure leaves the in-memory state authoritative
/// until the next successful save.
pub struct DashboardService {
    state: Arc<RwLock<DashboardState>>,
    dirty_tx: mpsc::UnboundedSender<()>,
    save_task: Mutex<Option<JoinHandle<()>>>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn DashboardStore>, initial: DashboardState) -> Arc<Self> {
        let (dirty_tx, dirty_rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(initial));
        let save_task = tokio::spawn(run_save_loop(dirty_rx, state.clone(), store));
        Arc::new(Self {
            state,
            dirty_tx,
            save_task: Mutex::new(Some(save_task)),
        })
    }

    /// Validate and create a widget together with its layout item. The new
    /// item lands at x = 0 below every existing item, so widgets never
    /// overlap on creation.
    pub async fn create_widget(&self, draft: WidgetDraft) -> Result<Widget, DashboardError> {
        if draft.title.trim().is_empty() {
            return Err(DashboardError::Validation(
                "widget title must not be empty".to_string(),
            ));
        }
        if draft.tag_ids.is_empty() {
            return Err(DashboardError::Validation(
                "widget needs at least one tag".to_string(),
            ));
        }

        let widget = draft.into_widget();
        let footprint = default_size(widget.widget_type, widget.tag_ids.len());

        let mut state = self.state.write().await;
        let item = LayoutItem {
            widget_id: widget.id.clone(),
            x: 0,
            y: next_free_y(&state.layouts.lg),
            w: footprint.w,
            h: footprint.h,
            min_w: Some(footprint.min_w),
            min_h: Some(footprint.min_h),
            max_w: None,
            max_h: None,
        };
        state.widgets.push(widget.clone());
        state.layouts.lg.push(item);
        drop(state);

        self.mark_dirty();
        Ok(widget)
    }

    /// Remove a widget and its layout item together, or neither.
    pub async fn remove_widget(&self, id: &str) -> Result<(), DashboardError> {
        let mut state = self.state.write().await;
        if !state.widgets.iter().any(|widget| widget.id == id) {
            return Err(DashboardError::UnknownWidget(id.to_string()));
        }
        state.widgets.retain(|widget| widget.id != id);
        state.layouts.lg.retain(|item| item.widget_id != id);
        drop(state);

        self.mark_dirty();
        Ok(())
    }

    /// Remove every widget and layout item.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.widgets.clear();
        state.layouts.lg.clear();
        drop(state);

        self.mark_dirty();
    }

    /// Replace the layout after a grid drag/resize. Items pointing at
    /// unknown widgets are dropped to keep the pairing one-to-one.
    pub async fn update_layout(&self, items: Vec<LayoutItem>) {
        let mut state = self.state.write().await;
        let known: Vec<String> = state.widgets.iter().map(|w| w.id.clone()).collect();
        state.layouts.lg = items
            .into_iter()
            .filter(|item| known.contains(&item.widget_id))
            .collect();
        drop(state);

        self.mark_dirty();
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    /// Union of every widget's bound tags, first-seen order, deduplicated.
    pub async fn bound_tag_ids(&self) -> Vec<TagId> {
        let state = self.state.read().await;
        let mut tag_ids: Vec<TagId> = Vec::new();
        for widget in &state.widgets {
            for tag_id in &widget.tag_ids {
                if !tag_ids.contains(tag_id) {
                    tag_ids.push(tag_id.clone());
                }
            }
        }
        tag_ids
    }

    fn mark_dirty(&self) {
        let _ = self.dirty_tx.send(());
    }

    /// Cancel the pending debounce and the save task.
    pub fn close(&self) {
        if let Ok(mut guard) = self.save_task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
    }
}

/// Debounce loop: each mutation (re)starts a quiet window; the save fires
/// once no further mutation arrives within it.
async fn run_save_loop(
    mut dirty_rx: mpsc::UnboundedReceiver<()>,
    state: Arc<RwLock<DashboardState>>,
    store: Arc<dyn DashboardStore>,
) {
    'idle: while dirty_rx.recv().await.is_some() {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(SAVE_QUIET_PERIOD) => {
                    save_snapshot(&state, store.as_ref()).await;
                    continue 'idle;
                }
                more = dirty_rx.recv() => {
                    if more.is_none() {
                        // Channel closed mid-window; flush the last state.
                        save_snapshot(&state, store.as_ref()).await;
                        return;
                    }
                    // Another mutation restarts the quiet window.
                }
            }
        }
    }
}

async fn save_snapshot(state: &Arc<RwLock<DashboardState>>, store: &dyn DashboardStore) {
    let snapshot = state.read().await.clone();
    match store.save(&snapshot).await {
        Ok(id) => {
            tracing::debug!("dashboard saved as {id}");
            state.write().await.id = Some(id);
        }
        Err(e) => {
            // In-memory state stays authoritative; the next mutation
            // schedules another attempt.
            let err = DashboardError::Persistence(format!("{e:#}"));
            tracing::warn!("{err}");
        }
    }
}
