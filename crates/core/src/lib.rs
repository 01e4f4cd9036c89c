//! Shared core for the Criteo outbound connector — normalized event
//! model, configuration, and error types.

pub mod config;
pub mod error;
pub mod event;

pub use config::AppConfig;
pub use error::{ConnectorError, ConnectorResult};
pub use event::{EventType, NormalizedEvent, Product};
