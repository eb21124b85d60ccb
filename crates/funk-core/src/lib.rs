pub mod config;
pub mod error;
pub mod oar;
pub mod types;

pub use config::FunkConfig;
pub use error::{CoreError, CoreResult};
pub use types::*;
