pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use app::router;
pub use state::AppState;

#[cfg(test)]
pub mod testing;
