//! Storage backends.
//!
//! Each store is a trait with one concrete implementation so the RPC
//! handlers stay decoupled from the storage choice and tests can
//! substitute fakes. Every store guards its map with a single internal
//! lock held only for the map operation itself, never across I/O.

pub mod image;
pub mod laptop;
pub mod rating;
pub mod user;

pub use image::{DiskImageStore, ImageStore};
pub use laptop::{InMemoryLaptopStore, LaptopStore};
pub use rating::{InMemoryRatingStore, Rating, RatingStore};
pub use user::{InMemoryUserStore, User, UserStore};
