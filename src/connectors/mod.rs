// Fire-data connectors — trait-based abstraction over satellite providers.
//
// The Connector trait defines the session lifecycle and fetch contract.
// FirmsConnector implements it for NASA FIRMS; other providers (INPE, ...)
// slot in behind the same trait.

pub mod firms;
pub mod traits;

pub use firms::{FirmsConnector, FirmsRequest};
pub use traits::{Connector, ConnectorState, DataFormat, FetchParameters, FetchResult};
