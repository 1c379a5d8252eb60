//! The cluster operations fixture loading needs.

use async_trait::async_trait;
use kube::{
	api::{Api, DynamicObject, PostParams},
	Client, Resource,
};
use thiserror::Error;
use tracing::instrument;

use super::{coordinate::ResourceCoordinate, object::GenericObject};

/// Errors returned by a [`ClusterApi`].
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("object not found")]
	NotFound,

	#[error("object already exists")]
	AlreadyExists,

	#[error("object was modified concurrently")]
	Conflict,

	#[error("converting object")]
	Conversion(#[source] serde_json::Error),

	#[error("building request")]
	BuildRequest(#[source] http::Error),

	#[error(transparent)]
	Request(Box<kube::Error>),
}

impl ApiError {
	/// Classify a kube error. A 409 means "already exists" for creates and
	/// an optimistic-concurrency conflict for updates.
	fn from_kube(err: kube::Error, conflict_means_exists: bool) -> Self {
		match err {
			kube::Error::Api(ref resp) if resp.code == 404 => Self::NotFound,
			kube::Error::Api(ref resp) if resp.code == 409 => {
				if conflict_means_exists {
					Self::AlreadyExists
				} else {
					Self::Conflict
				}
			}
			other => Self::Request(Box::new(other)),
		}
	}
}

/// Dynamic access to namespaced objects addressed by coordinate.
///
/// Every call is a single request; implementations must not retry.
#[async_trait]
pub trait ClusterApi: Send + Sync {
	/// Read the live object.
	async fn get(&self, coord: &ResourceCoordinate) -> Result<GenericObject, ApiError>;

	/// Create a new object, failing if one with the same name exists.
	async fn create(
		&self,
		coord: &ResourceCoordinate,
		object: &GenericObject,
	) -> Result<GenericObject, ApiError>;

	/// Write the object through the status subresource. Fields outside
	/// `.status` are ignored by the server.
	async fn update_status(
		&self,
		coord: &ResourceCoordinate,
		object: &GenericObject,
	) -> Result<GenericObject, ApiError>;
}

/// [`ClusterApi`] backed by a kube client.
#[derive(Clone)]
pub struct KubeClusterApi {
	client: Client,
}

impl KubeClusterApi {
	pub fn new(client: Client) -> Self {
		Self { client }
	}

	fn dynamic_api(&self, coord: &ResourceCoordinate) -> Api<DynamicObject> {
		Api::namespaced_with(self.client.clone(), &coord.namespace, &coord.api_resource())
	}
}

fn to_dynamic(object: &GenericObject) -> Result<DynamicObject, ApiError> {
	serde_json::from_value(object.clone().into_value()).map_err(ApiError::Conversion)
}

fn from_dynamic(object: DynamicObject) -> Result<GenericObject, ApiError> {
	serde_json::to_value(object)
		.and_then(serde_json::from_value)
		.map_err(ApiError::Conversion)
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
	#[instrument(skip_all, fields(resource = %coord))]
	async fn get(&self, coord: &ResourceCoordinate) -> Result<GenericObject, ApiError> {
		let live = self
			.dynamic_api(coord)
			.get(&coord.name)
			.await
			.map_err(|e| ApiError::from_kube(e, false))?;
		from_dynamic(live)
	}

	#[instrument(skip_all, fields(resource = %coord))]
	async fn create(
		&self,
		coord: &ResourceCoordinate,
		object: &GenericObject,
	) -> Result<GenericObject, ApiError> {
		let created = self
			.dynamic_api(coord)
			.create(&PostParams::default(), &to_dynamic(object)?)
			.await
			.map_err(|e| ApiError::from_kube(e, true))?;
		from_dynamic(created)
	}

	#[instrument(skip_all, fields(resource = %coord))]
	async fn update_status(
		&self,
		coord: &ResourceCoordinate,
		object: &GenericObject,
	) -> Result<GenericObject, ApiError> {
		let url = format!(
			"{}/{}/status",
			DynamicObject::url_path(&coord.api_resource(), Some(coord.namespace.as_str())),
			coord.name
		);
		let body = serde_json::to_vec(object).map_err(ApiError::Conversion)?;
		let request = http::Request::put(url)
			.header(http::header::CONTENT_TYPE, "application/json")
			.body(body)
			.map_err(ApiError::BuildRequest)?;

		let updated: DynamicObject = self
			.client
			.request(request)
			.await
			.map_err(|e| ApiError::from_kube(e, false))?;
		from_dynamic(updated)
	}
}
