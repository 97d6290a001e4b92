//! Use cases: resolution, conditional delivery and cache administration.

pub mod cache_admin;
pub mod delivery;
pub mod error;
pub mod repos;
pub mod resolver;
