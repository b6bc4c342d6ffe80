mod routes;
mod server;
mod staging;

pub mod app;
pub mod config;
pub mod model_service;
pub mod ort_service;
pub mod prediction;
pub mod preprocessing;

pub use app::start_app;
