pub mod cycles;
pub mod dsm;
pub mod metrics;
