//! Catalog service gRPC server.

use anyhow::Context;
use catalog_service::grpc::{default_role_table, AuthServiceImpl, CatalogServiceImpl};
use catalog_service::pb::auth::auth_service_server::AuthServiceServer;
use catalog_service::pb::catalog::catalog_service_server::CatalogServiceServer;
use catalog_service::store::{
    DiskImageStore, ImageStore, InMemoryLaptopStore, InMemoryRatingStore, InMemoryUserStore,
    LaptopStore, RatingStore, User, UserStore,
};
use catalog_service::Config;
use grpc_auth::{AuthGate, MethodPathLayer, TokenAuthority};
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();
    if config.jwt_secret == "insecure-dev-secret" {
        warn!("JWT_SECRET not set, signing tokens with the development secret");
    }
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;

    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    seed_users(users.as_ref())?;

    let authority = Arc::new(TokenAuthority::new(
        config.jwt_secret.as_bytes(),
        config.token_ttl(),
    ));
    let laptops: Arc<dyn LaptopStore> = Arc::new(InMemoryLaptopStore::new());
    let ratings: Arc<dyn RatingStore> = Arc::new(InMemoryRatingStore::new());
    tokio::fs::create_dir_all(&config.image_dir)
        .await
        .context("cannot create image directory")?;
    let images: Arc<dyn ImageStore> = Arc::new(DiskImageStore::new(&config.image_dir));

    let auth_service = AuthServiceServer::new(AuthServiceImpl::new(users, Arc::clone(&authority)));
    let gate = AuthGate::new(authority, Arc::new(default_role_table()));
    let catalog_service = CatalogServiceServer::with_interceptor(
        CatalogServiceImpl::new(laptops, images, ratings, config.max_image_size),
        gate,
    );

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<CatalogServiceServer<CatalogServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<AuthServiceServer<AuthServiceImpl>>()
        .await;

    info!(%addr, "catalog service listening");
    Server::builder()
        .layer(MethodPathLayer)
        .add_service(health_service)
        .add_service(auth_service)
        .add_service(catalog_service)
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("gRPC server failed")?;

    Ok(())
}

fn seed_users(users: &dyn UserStore) -> anyhow::Result<()> {
    for (username, role) in [("admin1", "admin"), ("user1", "user")] {
        let user = User::new(username, "secret", role).context("cannot hash seed password")?;
        users.save(user).context("cannot seed users")?;
        info!(username, role, "seeded user");
    }
    Ok(())
}
