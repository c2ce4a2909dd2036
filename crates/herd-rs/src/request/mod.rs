//! Request descriptors and their identity.
//!
//! - [`descriptor`]: the immutable [`RequestDescriptor`] and its builder.
//! - [`fingerprint`]: URL normalization and the SHA-256 [`Fingerprint`]
//!   used as the coalescing key.

pub mod descriptor;
pub mod fingerprint;

pub use descriptor::{Coalescing, Method, RequestBuilder, RequestDescriptor, ValidatedRequest};
pub use fingerprint::{Fingerprint, NormalizedUrl};
