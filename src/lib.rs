//! Turnero visitor turn server
//!
//! REST JSON API for registering visitors at a municipal reception desk,
//! routing them to floor terminals and tracking each turn through its
//! WAITING, AUTHORIZED, ATTENDED and REJECTED states.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod normalizer;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
