//! # Dialogue Service
//!
//! Wires the pieces together: a Majordomo broker on the configured port and
//! a pool of workers that answer the configured service by running text
//! through the NLU pipeline.
//!
//! ```text
//! frame.json ──▶ create_app ──▶ App::run
//!                                 ├── Broker (bind_address:port)
//!                                 └── Worker × N ──▶ NluHandler ──▶ Pipeline
//! ```

pub mod app;
pub mod handler;
pub mod logging;

pub use app::{create_app, App};
pub use handler::NluHandler;
pub use logging::init_logging;
