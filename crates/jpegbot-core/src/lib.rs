pub mod config;
pub mod dedup;
pub mod error;
pub mod image_pipeline;
pub mod imgur;
pub mod io;
pub mod paths;
pub mod platform;
pub mod reddit;
pub mod reply;
pub mod retry;
pub mod scan;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use error::{BotError, Result, Severity};
