pub mod app;
pub mod auth;
pub mod cli;
pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod store;

pub use app::{build_router, AppState};
