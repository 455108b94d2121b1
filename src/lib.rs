pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod render;
pub mod service;

pub use config::AppConfig;
pub use db::create_pool;
pub use error::{AppError, AppResult};
pub use service::InvoiceIssuer;
