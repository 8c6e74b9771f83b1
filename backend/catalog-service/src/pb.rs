//! Generated protobuf/gRPC code.

pub mod pcstore {
    pub mod catalog {
        pub mod v1 {
            tonic::include_proto!("pcstore.catalog.v1");
        }
    }

    pub mod auth {
        pub mod v1 {
            tonic::include_proto!("pcstore.auth.v1");
        }
    }
}

pub use pcstore::auth::v1 as auth;
pub use pcstore::catalog::v1 as catalog;
