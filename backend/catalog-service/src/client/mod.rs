//! Client-side call wrappers.
//!
//! [`AuthClient`] performs the login RPC and feeds the client auth gate;
//! [`CatalogClient`] wraps the catalog RPCs over a token-attaching channel.

use crate::pb::auth::auth_service_client::AuthServiceClient;
use crate::pb::auth::LoginRequest;
use crate::pb::catalog::catalog_service_client::CatalogServiceClient;
use crate::pb::catalog::{
    upload_image_request, CreateLaptopRequest, Filter, ImageInfo, Laptop, RateLaptopRequest,
    RateLaptopResponse, SearchLaptopRequest, UploadImageRequest, UploadImageResponse,
};
use grpc_auth::{AuthTokenService, ClientAuthGate, LoginProvider};
use tonic::transport::Channel;
use tonic::Status;

const UPLOAD_CHUNK_SIZE: usize = 1024;

/// Calls the login RPC with fixed credentials.
pub struct AuthClient {
    inner: AuthServiceClient<Channel>,
    username: String,
    password: String,
}

impl AuthClient {
    pub fn new(channel: Channel, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            inner: AuthServiceClient::new(channel),
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait::async_trait]
impl LoginProvider for AuthClient {
    async fn login(&self) -> Result<String, Status> {
        let mut client = self.inner.clone();
        let response = client
            .login(LoginRequest {
                username: self.username.clone(),
                password: self.password.clone(),
            })
            .await?;
        Ok(response.into_inner().access_token)
    }
}

/// Catalog RPC wrapper over a channel that attaches the gate's token.
pub struct CatalogClient {
    inner: CatalogServiceClient<AuthTokenService<Channel>>,
}

impl CatalogClient {
    pub fn new(channel: Channel, gate: &ClientAuthGate) -> Self {
        Self {
            inner: CatalogServiceClient::new(gate.wrap(channel)),
        }
    }

    /// Create a laptop, returning its assigned id.
    pub async fn create_laptop(&mut self, laptop: Laptop) -> Result<String, Status> {
        let response = self
            .inner
            .create_laptop(CreateLaptopRequest {
                laptop: Some(laptop),
            })
            .await?;
        Ok(response.into_inner().id)
    }

    /// Collect every laptop the search stream emits.
    pub async fn search_laptop(&mut self, filter: Filter) -> Result<Vec<Laptop>, Status> {
        let mut stream = self
            .inner
            .search_laptop(SearchLaptopRequest {
                filter: Some(filter),
            })
            .await?
            .into_inner();

        let mut laptops = Vec::new();
        while let Some(response) = stream.message().await? {
            if let Some(laptop) = response.laptop {
                laptops.push(laptop);
            }
        }
        Ok(laptops)
    }

    /// Upload an image as an info message followed by fixed-size chunks.
    pub async fn upload_image(
        &mut self,
        laptop_id: &str,
        image_type: &str,
        data: &[u8],
    ) -> Result<UploadImageResponse, Status> {
        let mut requests = vec![UploadImageRequest {
            data: Some(upload_image_request::Data::Info(ImageInfo {
                laptop_id: laptop_id.to_owned(),
                image_type: image_type.to_owned(),
            })),
        }];
        requests.extend(data.chunks(UPLOAD_CHUNK_SIZE).map(|chunk| {
            UploadImageRequest {
                data: Some(upload_image_request::Data::ChunkData(chunk.to_vec())),
            }
        }));

        let response = self.inner.upload_image(tokio_stream::iter(requests)).await?;
        Ok(response.into_inner())
    }

    /// Rate laptops pairwise and collect the aggregate responses.
    pub async fn rate_laptop(
        &mut self,
        laptop_ids: &[String],
        scores: &[f64],
    ) -> Result<Vec<RateLaptopResponse>, Status> {
        let requests: Vec<_> = laptop_ids
            .iter()
            .zip(scores)
            .map(|(laptop_id, score)| RateLaptopRequest {
                laptop_id: laptop_id.clone(),
                score: *score,
            })
            .collect();

        let mut stream = self
            .inner
            .rate_laptop(tokio_stream::iter(requests))
            .await?
            .into_inner();

        let mut responses = Vec::new();
        while let Some(response) = stream.message().await? {
            responses.push(response);
        }
        Ok(responses)
    }
}
