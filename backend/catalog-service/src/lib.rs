//! Laptop catalog gRPC service.
//!
//! Four call patterns behind a token auth pipeline: unary create,
//! server-streaming search, client-streaming image upload and
//! bidirectional-streaming rating, over concurrent in-process stores.

pub mod client;
pub mod config;
pub mod error;
pub mod grpc;
pub mod pb;
pub mod store;

pub use config::Config;
