//! The taproom drinks API
//!
//! A small catalog service: baristas and managers maintain a list of
//! drinks, each described by a title and a recipe of colored ingredient
//! parts. Every route except the public drink list requires a bearer token
//! verified by [`taproom::Authority`], and mutating routes additionally
//! require a matching permission grant.

#![warn(unused_import_braces, unused_imports, unused_qualifications)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod config;
pub mod drink;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use drink::{Drink, DrinkStore, Ingredient};
pub use error::ApiError;
pub use routes::{router, AppState};
