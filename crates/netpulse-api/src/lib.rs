//! Transport layer for the netpulse probing engines.
//!
//! - [`Prober`] / [`NetProber`]: the probe primitive: one bounded-timeout
//!   HTTP or TCP operation folded into a [`ProbeOutcome`].
//! - [`TransferClient`]: streaming downloads, uploads and banner fetches.
//! - [`TransportConfig`]: shared `reqwest::Client` construction.

pub mod error;
pub mod http;
pub mod probe;
pub mod transport;

pub use error::Error;
pub use http::{DEFAULT_BANNER_LIMIT, Download, HttpBanner, TransferClient};
pub use probe::{NetProber, ProbeErrorKind, ProbeMethod, ProbeOutcome, ProbeTarget, Prober};
pub use transport::{TlsMode, TransportConfig};
