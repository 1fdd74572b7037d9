// Tag directory service - configured tags and PLCs for the selection UI
use crate::application::data_feed::TagRegistry;
use crate::domain::tag::{Plc, Tag, TagId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct TagDirectoryService {
    registry: Arc<dyn TagRegistry>,
}

impl TagDirectoryService {
    pub fn new(registry: Arc<dyn TagRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list_tags(&self) -> anyhow::Result<Vec<Tag>> {
        self.registry.list_tags().await
    }

    pub async fn list_plcs(&self) -> anyhow::Result<Vec<Plc>> {
        self.registry.list_plcs().await
    }

    /// Display names by tag id, for chart labels and formula substitution.
    pub async fn display_names(&self) -> anyhow::Result<HashMap<TagId, String>> {
        let tags = self.registry.list_tags().await?;
        Ok(tags.into_iter().map(|tag| (tag.id, tag.name)).collect())
    }
}
