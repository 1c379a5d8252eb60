//! Mock Kubernetes API server for testing.
//!
//! Provides an HTTP server that can be used with kubeconfig-based connections.
//! It understands just enough of the API to create, read and status-update
//! namespaced objects.

pub mod catalog;
pub mod http;

pub use catalog::{MockApiResource, ResourceCatalog};
pub use http::{HttpMockK8sServer, RecordedRequest, RunningHttpMockK8sServer};
