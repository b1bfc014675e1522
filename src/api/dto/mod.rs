//! Data Transfer Objects for REST request/response serialization.

pub mod coins_dto;

pub use coins_dto::*;
