//! Server-side authentication gate.
//!
//! Tonic interceptors never see which method a request is for, so the gate
//! is split in two: [`MethodPathLayer`] runs before routing and records the
//! request URI path as a [`GrpcMethod`] extension, and [`AuthGate`] (a
//! `tonic` interceptor attached with `with_interceptor`) enforces the
//! [`RoleTable`] using that extension. The interceptor runs exactly once
//! per call, before the first message, for unary and streaming RPCs alike.

use crate::token::TokenAuthority;
use crate::AUTHORIZATION_KEY;
use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Full gRPC method path of the current call, e.g.
/// `/pcstore.catalog.v1.CatalogService/CreateLaptop`.
#[derive(Debug, Clone)]
pub struct GrpcMethod(pub String);

/// Static mapping from method path to the roles allowed to invoke it.
///
/// Methods absent from the table are open to any caller, authenticated or
/// not. Immutable after construction.
#[derive(Debug, Default, Clone)]
pub struct RoleTable {
    roles: HashMap<String, Vec<String>>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `method` to the given roles.
    pub fn allow(mut self, method: impl Into<String>, roles: &[&str]) -> Self {
        self.roles
            .insert(method.into(), roles.iter().map(|r| (*r).to_owned()).collect());
        self
    }

    /// Roles permitted for `method`, or `None` when the method is open.
    pub fn allowed_roles(&self, method: &str) -> Option<&[String]> {
        self.roles.get(method).map(Vec::as_slice)
    }
}

/// Tower layer recording the request URI path as a [`GrpcMethod`] extension.
///
/// Install on the server builder so the extension is present before routing:
/// `Server::builder().layer(MethodPathLayer)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodPathLayer;

impl<S> Layer<S> for MethodPathLayer {
    type Service = MethodPathService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MethodPathService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct MethodPathService<S> {
    inner: S,
}

impl<S, B> Service<http::Request<B>> for MethodPathService<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let path = req.uri().path().to_owned();
        req.extensions_mut().insert(GrpcMethod(path));
        self.inner.call(req)
    }
}

/// Per-call authentication and authorization interceptor.
///
/// For gated methods: extracts the raw token from the `authorization`
/// metadata entry (`Unauthenticated` if absent), verifies it
/// (`Unauthenticated` on invalid or expired), checks role membership
/// (`PermissionDenied` on mismatch), and stores the verified [`Claims`]
/// in request extensions for handler access.
///
/// [`Claims`]: crate::Claims
#[derive(Clone)]
pub struct AuthGate {
    authority: Arc<TokenAuthority>,
    roles: Arc<RoleTable>,
}

impl AuthGate {
    pub fn new(authority: Arc<TokenAuthority>, roles: Arc<RoleTable>) -> Self {
        Self { authority, roles }
    }

    fn authorize(&self, request: &Request<()>) -> Result<Option<crate::Claims>, Status> {
        let Some(GrpcMethod(method)) = request.extensions().get::<GrpcMethod>() else {
            // MethodPathLayer not installed; nothing to gate on.
            return Ok(None);
        };

        let Some(required) = self.roles.allowed_roles(method) else {
            debug!(%method, "open method, skipping auth");
            return Ok(None);
        };

        let token = request
            .metadata()
            .get(AUTHORIZATION_KEY)
            .ok_or_else(|| {
                warn!(%method, "request carries no access token");
                Status::unauthenticated("missing authorization token")
            })?
            .to_str()
            .map_err(|_| Status::unauthenticated("authorization token is not valid ASCII"))?
            .to_owned();

        let claims = self.authority.verify(&token).map_err(|err| {
            warn!(%method, %err, "access token rejected");
            Status::from(err)
        })?;

        if !required.iter().any(|role| role == &claims.role) {
            warn!(%method, role = %claims.role, "role not permitted for method");
            return Err(Status::permission_denied("no permission to access this RPC"));
        }

        Ok(Some(claims))
    }
}

impl Interceptor for AuthGate {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        if let Some(claims) = self.authorize(&request)? {
            request.extensions_mut().insert(claims);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Claims;
    use std::time::Duration;
    use tonic::Code;

    const METHOD: &str = "/pcstore.catalog.v1.CatalogService/CreateLaptop";

    fn authority() -> Arc<TokenAuthority> {
        Arc::new(TokenAuthority::new(b"gate-test-secret", Duration::from_secs(900)))
    }

    fn gate(authority: Arc<TokenAuthority>) -> AuthGate {
        let roles = RoleTable::new().allow(METHOD, &["admin"]);
        AuthGate::new(authority, Arc::new(roles))
    }

    fn request_for(method: &str, token: Option<&str>) -> Request<()> {
        let mut request = Request::new(());
        request
            .extensions_mut()
            .insert(GrpcMethod(method.to_owned()));
        if let Some(token) = token {
            request
                .metadata_mut()
                .insert(AUTHORIZATION_KEY, token.parse().unwrap());
        }
        request
    }

    #[test]
    fn open_method_passes_without_token() {
        let mut gate = gate(authority());
        let request = request_for("/pcstore.catalog.v1.CatalogService/SearchLaptop", None);

        assert!(gate.call(request).is_ok());
    }

    #[test]
    fn gated_method_without_token_is_unauthenticated() {
        let mut gate = gate(authority());
        let status = gate.call(request_for(METHOD, None)).unwrap_err();

        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[test]
    fn gated_method_with_invalid_token_is_unauthenticated() {
        let mut gate = gate(authority());
        let status = gate
            .call(request_for(METHOD, Some("bogus-token")))
            .unwrap_err();

        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[test]
    fn wrong_role_is_permission_denied() {
        let authority = authority();
        let token = authority.issue("user1", "user").unwrap();
        let mut gate = gate(authority);

        let status = gate.call(request_for(METHOD, Some(&token))).unwrap_err();
        assert_eq!(status.code(), Code::PermissionDenied);
    }

    #[test]
    fn valid_token_passes_and_stores_claims() {
        let authority = authority();
        let token = authority.issue("admin1", "admin").unwrap();
        let mut gate = gate(authority);

        let request = gate.call(request_for(METHOD, Some(&token))).unwrap();
        let claims = request.extensions().get::<Claims>().unwrap();
        assert_eq!(claims.sub, "admin1");
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn missing_method_extension_passes_through() {
        // Without MethodPathLayer there is no method to look up.
        let mut gate = gate(authority());
        assert!(gate.call(Request::new(())).is_ok());
    }
}
