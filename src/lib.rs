// GEIH: satellite fire-hotspot ingestion and query stack.
//
// This is the library root. Each module corresponds to a major subsystem:
// provider connectors feed the ingest step, the pipeline sequences ingest
// into the store, and the query service (CLI and web) reads it back.

pub mod config;
pub mod connectors;
pub mod db;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod query;
pub mod status;

#[cfg(feature = "web")]
pub mod web;
