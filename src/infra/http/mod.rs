//! HTTP surfaces: the public manifest listener and the administrative listener.

mod admin;
mod error;
mod manifests;
mod middleware;
mod shared;

pub use admin::{AdminState, build_admin_router};
pub use error::{ApiError, codes};
pub use manifests::{HttpState, build_router};
