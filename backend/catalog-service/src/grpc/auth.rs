//! Login RPC.

use crate::pb::auth::auth_service_server::AuthService;
use crate::pb::auth::{LoginRequest, LoginResponse};
use crate::store::UserStore;
use grpc_auth::TokenAuthority;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

/// AuthService gRPC implementation.
pub struct AuthServiceImpl {
    users: Arc<dyn UserStore>,
    authority: Arc<TokenAuthority>,
}

impl AuthServiceImpl {
    pub fn new(users: Arc<dyn UserStore>, authority: Arc<TokenAuthority>) -> Self {
        Self { users, authority }
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();

        let user = self
            .users
            .find(&req.username)
            .filter(|user| user.verify_password(&req.password));
        let Some(user) = user else {
            warn!(username = %req.username, "login rejected");
            return Err(Status::unauthenticated("incorrect username or password"));
        };

        let access_token = self
            .authority
            .issue(&user.username, &user.role)
            .map_err(Status::from)?;

        info!(username = %user.username, role = %user.role, "login succeeded");
        Ok(Response::new(LoginResponse { access_token }))
    }
}
