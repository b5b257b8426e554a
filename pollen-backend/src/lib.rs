pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use error::{ClientError, ConfigError, EntitySkipped, FetchError, SkipReason};
pub use model::pollen::{PollenClient, PollenUpdater, RetryPolicy};
