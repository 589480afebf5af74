pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod realtime;

pub use error::{CollabStreamError, Result};
