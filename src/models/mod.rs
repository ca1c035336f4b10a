pub mod sample;

pub use sample::{MeasurementSample, SampleRow, TIMESTAMP_FORMAT};
