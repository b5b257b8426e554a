pub mod pollen;
