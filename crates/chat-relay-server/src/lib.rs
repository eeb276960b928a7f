pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
mod test;

pub use router::build_router;
pub use state::AppState;
