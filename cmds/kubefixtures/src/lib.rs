//! Load fixture manifests into a Kubernetes cluster, status included.
//!
//! A fixture is an ordinary manifest whose `status` is meant to be seen on
//! the live object. Loading creates the object and then writes that status
//! through the status subresource; transitioning only writes the status.

pub mod commands;
pub mod config;
pub mod k8s;
pub mod manifest;
pub mod reconcile;
pub mod telemetry;
