pub mod catalog;
pub mod types;

pub use catalog::Catalog;
pub use types::{Level, PollenReading, PollenType, Prediction, Region, MAX_LEVEL};
