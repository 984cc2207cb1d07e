pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use config::{Config, ConflictPolicy, TransferMode};
pub use error::{AppError, Result};
