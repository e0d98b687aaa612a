// Route handlers, one module per resource.

pub mod hotspots;
pub mod root;
