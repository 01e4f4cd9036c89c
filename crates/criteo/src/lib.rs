//! Criteo outbound connector — maps normalized analytics events into
//! the Criteo S2S event schema and dispatches them to the regional
//! submission endpoint.
//!
//! # Modules
//!
//! - [`payload`] — Target wire-schema types
//! - [`mapper`] — Pure per-event-type mapping functions
//! - [`dates`] — Travel-date extraction for the date-range sub-event
//! - [`validate`] — Pre-mapping validation gate
//! - [`locale`] — Country-to-region routing resolver
//! - [`dispatch`] — Dispatcher and HTTP transport

pub mod dates;
pub mod dispatch;
pub mod locale;
pub mod mapper;
pub mod payload;
pub mod validate;

pub use dispatch::{Delivery, Dispatcher, HttpTransport, Transport};
pub use locale::{LocaleResolver, Region};
pub use payload::TargetPayload;
pub use validate::validate;
