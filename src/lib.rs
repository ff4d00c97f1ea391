pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod employees;
pub mod error;
pub mod handlers;
pub mod state;
pub mod storage;

pub use app::app;
pub use state::AppState;
