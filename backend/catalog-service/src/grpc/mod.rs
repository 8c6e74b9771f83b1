//! gRPC service implementations and the method/role wiring.

mod auth;
mod catalog;

pub use auth::AuthServiceImpl;
pub use catalog::CatalogServiceImpl;

use grpc_auth::RoleTable;
use std::collections::HashSet;

pub const CREATE_LAPTOP_METHOD: &str = "/pcstore.catalog.v1.CatalogService/CreateLaptop";
pub const SEARCH_LAPTOP_METHOD: &str = "/pcstore.catalog.v1.CatalogService/SearchLaptop";
pub const UPLOAD_IMAGE_METHOD: &str = "/pcstore.catalog.v1.CatalogService/UploadImage";
pub const RATE_LAPTOP_METHOD: &str = "/pcstore.catalog.v1.CatalogService/RateLaptop";

/// Reference authorization table. Methods absent from it, including
/// SearchLaptop and Login, are open to unauthenticated callers.
pub fn default_role_table() -> RoleTable {
    RoleTable::new()
        .allow(CREATE_LAPTOP_METHOD, &["admin"])
        .allow(UPLOAD_IMAGE_METHOD, &["admin"])
        .allow(RATE_LAPTOP_METHOD, &["admin", "user"])
}

/// Methods the client gate attaches a token to; mirrors the role table.
pub fn auth_methods() -> HashSet<String> {
    [
        CREATE_LAPTOP_METHOD,
        UPLOAD_IMAGE_METHOD,
        RATE_LAPTOP_METHOD,
    ]
    .iter()
    .map(|m| (*m).to_owned())
    .collect()
}
