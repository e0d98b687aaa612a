// HotspotQueryService — criteria-based reads over the hotspot store.
//
// Stateless apart from the shared store handle, so one instance can serve
// any number of concurrent requests.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::criteria::QueryCriteria;
use crate::db::models::Hotspot;
use crate::db::Database;

#[derive(Clone)]
pub struct HotspotQueryService {
    db: Arc<dyn Database>,
}

impl HotspotQueryService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Return every stored hotspot matching the criteria, in store order.
    ///
    /// An empty result is a successful empty Vec, never an error.
    pub async fn execute(&self, criteria: &QueryCriteria) -> Result<Vec<Hotspot>> {
        let hotspots = self.db.find_by_criteria(criteria).await?;
        debug!(
            predicates = criteria.predicates().len(),
            matched = hotspots.len(),
            "Hotspot query executed"
        );
        Ok(hotspots)
    }
}
