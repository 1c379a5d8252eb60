//! Kubernetes access for fixture loading.
//!
//! Objects are handled as untyped documents and addressed by coordinates
//! derived from the manifest itself; there is no API discovery.

pub mod api;
pub mod client;
pub mod coordinate;
pub mod object;
