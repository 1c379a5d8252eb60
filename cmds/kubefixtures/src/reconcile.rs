//! Reconciling fixture status onto live objects.
//!
//! A fixture run is one pass through
//! `Start -> Created | CreateSkipped -> Fetched -> StatusMerged -> StatusWritten -> Done`.
//! Any step may fail, and a failed run is never retried or rolled back: an
//! object created before a failed status write stays in the cluster.

use std::fmt;

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::k8s::{
	api::{ApiError, ClusterApi},
	coordinate::ResourceCoordinate,
	object::{GenericObject, ManifestError, ObjectMap},
};

/// Errors from reconciling a fixture.
#[derive(Debug, Error)]
pub enum ReconcileError {
	#[error("invalid manifest")]
	InvalidManifest(#[from] ManifestError),

	#[error("object {object} has no status map")]
	MissingStatus { object: String },

	#[error("{coordinate} not found")]
	NotFound { coordinate: ResourceCoordinate },

	#[error("{coordinate} already exists")]
	AlreadyExists { coordinate: ResourceCoordinate },

	#[error("{operation} {coordinate}")]
	Remote {
		operation: &'static str,
		coordinate: ResourceCoordinate,
		#[source]
		source: ApiError,
	},
}

impl ReconcileError {
	fn from_api(operation: &'static str, coordinate: &ResourceCoordinate, err: ApiError) -> Self {
		let coordinate = coordinate.clone();
		match err {
			ApiError::NotFound => Self::NotFound { coordinate },
			ApiError::AlreadyExists => Self::AlreadyExists { coordinate },
			source => Self::Remote {
				operation,
				coordinate,
				source,
			},
		}
	}
}

/// Progress of a single fixture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Start,
	Created,
	CreateSkipped,
	Fetched,
	StatusMerged,
	StatusWritten,
	Done,
	Failed,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Phase::Start => write!(f, "start"),
			Phase::Created => write!(f, "created"),
			Phase::CreateSkipped => write!(f, "create-skipped"),
			Phase::Fetched => write!(f, "fetched"),
			Phase::StatusMerged => write!(f, "status-merged"),
			Phase::StatusWritten => write!(f, "status-written"),
			Phase::Done => write!(f, "done"),
			Phase::Failed => write!(f, "failed"),
		}
	}
}

fn enter(phase: Phase, coord: &ResourceCoordinate) {
	tracing::debug!(%phase, resource = %coord, "fixture phase");
}

/// Replace `dst`'s status with `src`'s.
///
/// The whole map is replaced: status fields present only on `dst` are
/// dropped. On error `dst` is left untouched.
pub fn copy_status(src: &GenericObject, dst: &mut GenericObject) -> Result<(), ReconcileError> {
	tracing::info!(
		from = %src.display_name(),
		to = %dst.display_name(),
		"copying status"
	);

	let status = require_status(src)?.clone();
	dst.set_status(status);
	Ok(())
}

/// The object's status map, which must be present.
pub fn require_status(object: &GenericObject) -> Result<&ObjectMap, ReconcileError> {
	object.status()?.ok_or_else(|| ReconcileError::MissingStatus {
		object: object.display_name(),
	})
}

/// Set a single top-level status field, which requires a status map to exist.
pub fn set_status_field(
	object: &mut GenericObject,
	field: &str,
	value: Value,
) -> Result<(), ReconcileError> {
	let display_name = object.display_name();
	let status = object
		.status_mut()?
		.ok_or(ReconcileError::MissingStatus {
			object: display_name,
		})?;
	status.insert(field.to_string(), value);
	Ok(())
}

/// Loads fixtures through a [`ClusterApi`].
pub struct FixtureReconciler<A> {
	api: A,
}

impl<A: ClusterApi> FixtureReconciler<A> {
	pub fn new(api: A) -> Self {
		Self { api }
	}

	/// Read the live object.
	#[instrument(skip_all, fields(kind = %coord.kind, namespace = %coord.namespace, name = %coord.name))]
	pub async fn fetch(&self, coord: &ResourceCoordinate) -> Result<GenericObject, ReconcileError> {
		tracing::info!(resource = %coord, "getting resource");

		match self.api.get(coord).await {
			Ok(live) => {
				tracing::info!(resource = %coord, "got resource");
				Ok(live)
			}
			Err(e) => {
				let err = ReconcileError::from_api("getting", coord, e);
				tracing::error!(error = %err, "failed to get resource");
				Err(err)
			}
		}
	}

	/// Create the object. An existing object is an error, not a no-op.
	#[instrument(skip_all, fields(kind = %coord.kind, namespace = %coord.namespace, name = %coord.name))]
	pub async fn create(
		&self,
		coord: &ResourceCoordinate,
		desired: &GenericObject,
	) -> Result<(), ReconcileError> {
		tracing::info!(resource = %coord, "creating resource");

		match self.api.create(coord, desired).await {
			Ok(_) => {
				tracing::info!(resource = %coord, "created resource");
				Ok(())
			}
			Err(e) => {
				let err = ReconcileError::from_api("creating", coord, e);
				tracing::error!(error = %err, "failed to create resource");
				Err(err)
			}
		}
	}

	/// Write `object`'s status through the status subresource.
	///
	/// Makes exactly one attempt; a conflict with a concurrent writer is
	/// returned to the caller.
	#[instrument(skip_all, fields(kind = %coord.kind, namespace = %coord.namespace, name = %coord.name))]
	pub async fn update_status(
		&self,
		coord: &ResourceCoordinate,
		object: &GenericObject,
	) -> Result<(), ReconcileError> {
		tracing::info!(resource = %coord, "updating status");

		match self.api.update_status(coord, object).await {
			Ok(_) => {
				tracing::info!(resource = %coord, "updated status");
				Ok(())
			}
			Err(e) => {
				let err = ReconcileError::from_api("updating status of", coord, e);
				tracing::error!(error = %err, "failed to update status");
				Err(err)
			}
		}
	}

	/// Fetch the live object, overlay `desired`'s status, and write it back.
	pub async fn status_load(
		&self,
		coord: &ResourceCoordinate,
		desired: &GenericObject,
	) -> Result<(), ReconcileError> {
		let mut live = self.fetch(coord).await?;
		enter(Phase::Fetched, coord);

		if let Err(err) = copy_status(desired, &mut live) {
			tracing::error!(resource = %coord, error = %err, "failed to copy status");
			return Err(err);
		}
		enter(Phase::StatusMerged, coord);

		self.update_status(coord, &live).await?;
		enter(Phase::StatusWritten, coord);
		Ok(())
	}

	/// Create the object, then load its status.
	pub async fn load(
		&self,
		coord: &ResourceCoordinate,
		desired: &GenericObject,
	) -> Result<(), ReconcileError> {
		enter(Phase::Start, coord);
		let result = async {
			self.create(coord, desired).await?;
			enter(Phase::Created, coord);
			self.status_load(coord, desired).await
		}
		.await;
		finish(coord, result)
	}

	/// Load the status of an object that already exists.
	pub async fn transition(
		&self,
		coord: &ResourceCoordinate,
		desired: &GenericObject,
	) -> Result<(), ReconcileError> {
		enter(Phase::Start, coord);
		enter(Phase::CreateSkipped, coord);
		let result = self.status_load(coord, desired).await;
		finish(coord, result)
	}
}

fn finish(
	coord: &ResourceCoordinate,
	result: Result<(), ReconcileError>,
) -> Result<(), ReconcileError> {
	enter(
		if result.is_ok() {
			Phase::Done
		} else {
			Phase::Failed
		},
		coord,
	);
	result
}
