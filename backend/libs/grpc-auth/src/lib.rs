//! Token authentication for gRPC services.
//!
//! Three pieces, composing transparently with unary and streaming calls:
//!
//! - [`TokenAuthority`]: issues and verifies signed, expiring access tokens.
//! - Server side: [`MethodPathLayer`] records the invoked method path in
//!   request extensions, and the [`AuthGate`] interceptor enforces the
//!   per-method [`RoleTable`] before any handler runs.
//! - Client side: [`ClientAuthGate`] logs in once at construction, attaches
//!   the current token to configured methods, and keeps the token fresh
//!   with a single background re-login task.

pub mod client;
pub mod server;
pub mod token;

mod error;

pub use client::{AuthTokenLayer, AuthTokenService, ClientAuthGate, LoginProvider};
pub use error::AuthError;
pub use server::{AuthGate, GrpcMethod, MethodPathLayer, RoleTable};
pub use token::{Claims, TokenAuthority};

/// Metadata entry carrying the raw access token, with no scheme prefix.
pub const AUTHORIZATION_KEY: &str = "authorization";
