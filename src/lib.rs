pub mod bin_resolver;
pub mod cli;
pub mod credentials;
pub mod error;
pub mod key_file;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod plan;
pub mod runner;
pub mod shutdown;

pub use error::{Error, Result};
