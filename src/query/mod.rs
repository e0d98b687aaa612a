// Hotspot queries — filter criteria and the read service built on them.

pub mod criteria;
pub mod service;

pub use criteria::{BoundingBox, QueryCriteria};
pub use service::HotspotQueryService;
