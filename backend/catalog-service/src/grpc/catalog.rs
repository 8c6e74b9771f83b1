//! The four catalog RPC handlers.
//!
//! Each inbound call runs as its own task. Cancellation is observed
//! between messages: a server stream stops when its receiver is dropped,
//! and inbound streams surface transport errors from `message()`.

use crate::pb::catalog::catalog_service_server::CatalogService;
use crate::pb::catalog::{
    upload_image_request, CreateLaptopRequest, CreateLaptopResponse, RateLaptopRequest,
    RateLaptopResponse, SearchLaptopRequest, SearchLaptopResponse, UploadImageRequest,
    UploadImageResponse,
};
use crate::store::{ImageStore, LaptopStore, RatingStore};
use bytes::BytesMut;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// CatalogService gRPC implementation.
pub struct CatalogServiceImpl {
    laptops: Arc<dyn LaptopStore>,
    images: Arc<dyn ImageStore>,
    ratings: Arc<dyn RatingStore>,
    max_image_size: usize,
}

impl CatalogServiceImpl {
    pub fn new(
        laptops: Arc<dyn LaptopStore>,
        images: Arc<dyn ImageStore>,
        ratings: Arc<dyn RatingStore>,
        max_image_size: usize,
    ) -> Self {
        Self {
            laptops,
            images,
            ratings,
            max_image_size,
        }
    }
}

#[tonic::async_trait]
impl CatalogService for CatalogServiceImpl {
    async fn create_laptop(
        &self,
        request: Request<CreateLaptopRequest>,
    ) -> Result<Response<CreateLaptopResponse>, Status> {
        let mut laptop = request
            .into_inner()
            .laptop
            .ok_or_else(|| Status::invalid_argument("laptop payload is required"))?;

        if laptop.id.is_empty() {
            laptop.id = Uuid::new_v4().to_string();
        } else {
            Uuid::parse_str(&laptop.id).map_err(|err| {
                Status::invalid_argument(format!("laptop id is not a valid UUID: {err}"))
            })?;
        }

        let id = laptop.id.clone();
        self.laptops.save(laptop).map_err(|err| {
            warn!(%id, %err, "cannot save laptop");
            Status::from(err)
        })?;

        info!(%id, "laptop created");
        Ok(Response::new(CreateLaptopResponse { id }))
    }

    type SearchLaptopStream = ReceiverStream<Result<SearchLaptopResponse, Status>>;

    async fn search_laptop(
        &self,
        request: Request<SearchLaptopRequest>,
    ) -> Result<Response<Self::SearchLaptopStream>, Status> {
        let filter = request.into_inner().filter.unwrap_or_default();
        info!(?filter, "searching catalog");

        let laptops = Arc::clone(&self.laptops);
        let (tx, rx) = mpsc::channel(8);

        // The store scan is synchronous; run it off the async workers and
        // stream matches out as they are found. A closed receiver means
        // the client went away, which ends the scan without error.
        tokio::task::spawn_blocking(move || {
            laptops.search(&filter, &mut |laptop| {
                debug!(id = %laptop.id, "search match");
                match tx.blocking_send(Ok(SearchLaptopResponse {
                    laptop: Some(laptop),
                })) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                }
            });
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        let mut stream = request.into_inner();

        let first = stream
            .message()
            .await?
            .ok_or_else(|| Status::invalid_argument("missing image info"))?;
        let info = match first.data {
            Some(upload_image_request::Data::Info(info)) => info,
            _ => {
                return Err(Status::invalid_argument(
                    "first upload message must carry image info",
                ))
            }
        };
        info!(laptop_id = %info.laptop_id, image_type = %info.image_type, "receiving image");

        if self.laptops.find(&info.laptop_id).is_none() {
            return Err(Status::invalid_argument(format!(
                "laptop {} not found",
                info.laptop_id
            )));
        }

        let mut data = BytesMut::new();
        while let Some(req) = stream.message().await? {
            let chunk = match req.data {
                Some(upload_image_request::Data::ChunkData(chunk)) => chunk,
                _ => {
                    return Err(Status::invalid_argument(
                        "upload stream may carry only one info message",
                    ))
                }
            };

            if data.len() + chunk.len() > self.max_image_size {
                warn!(laptop_id = %info.laptop_id, "upload exceeds size limit");
                return Err(Status::invalid_argument(format!(
                    "image is too large: more than {} bytes",
                    self.max_image_size
                )));
            }
            data.extend_from_slice(&chunk);
        }

        let size = data.len() as u32;
        let id = self
            .images
            .save(&info.laptop_id, &info.image_type, data.freeze())
            .await
            .map_err(|err| {
                warn!(laptop_id = %info.laptop_id, %err, "cannot save image");
                Status::internal(format!("cannot save image: {err}"))
            })?;

        info!(%id, size, "image stored");
        Ok(Response::new(UploadImageResponse { id, size }))
    }

    type RateLaptopStream = ReceiverStream<Result<RateLaptopResponse, Status>>;

    async fn rate_laptop(
        &self,
        request: Request<Streaming<RateLaptopRequest>>,
    ) -> Result<Response<Self::RateLaptopStream>, Status> {
        let mut stream = request.into_inner();
        let laptops = Arc::clone(&self.laptops);
        let ratings = Arc::clone(&self.ratings);
        let (tx, rx) = mpsc::channel(4);

        // Strict request/response interleaving: each inbound rating is
        // answered before the next one is read. Any error terminates the
        // whole stream.
        tokio::spawn(async move {
            loop {
                let req = match stream.message().await {
                    Ok(Some(req)) => req,
                    Ok(None) => break,
                    Err(status) => {
                        warn!(%status, "rating stream failed");
                        let _ = tx.send(Err(status)).await;
                        break;
                    }
                };

                debug!(laptop_id = %req.laptop_id, score = req.score, "rating received");
                if laptops.find(&req.laptop_id).is_none() {
                    let _ = tx
                        .send(Err(Status::invalid_argument(format!(
                            "laptop {} not found",
                            req.laptop_id
                        ))))
                        .await;
                    break;
                }

                let rating = ratings.add(&req.laptop_id, req.score);
                let response = RateLaptopResponse {
                    laptop_id: req.laptop_id,
                    rated_count: rating.count,
                    average_score: rating.average(),
                };
                if tx.send(Ok(response)).await.is_err() {
                    // Client cancelled; nothing left to answer.
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
