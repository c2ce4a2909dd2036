//! Network-facing pieces: the transport seam, retry policy, and flight IDs.

pub mod retry;
pub mod tracing;
pub mod transport;

pub use retry::{FailureKind, RetryPolicy};
pub use transport::{ReqwestTransport, Transport, TransportFuture, TransportRequest, TransportResponse};
