pub mod types;
pub mod api_client;
pub mod normalizer;
pub mod store;
pub mod manager;
pub mod sensor;
pub mod updater;

pub use api_client::{HttpPollenSource, PollenSource};
pub use manager::{PollenClient, RetryPolicy, UpdateReport, UpdateStatus};
pub use sensor::SensorView;
pub use store::PollenStore;
pub use types::RawPayload;
pub use updater::PollenUpdater;
