//! HTTP surface and cache-aside pipeline.

pub mod controller;
mod error;
pub mod models;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;

pub use controller::Pipeline;
pub use error::ApiError;
pub use models::{HttpMap, Request, Response};
pub use server::{router, run};
pub use state::AppState;
