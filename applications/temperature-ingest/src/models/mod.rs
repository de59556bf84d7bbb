pub mod reading;

pub use reading::{Reading, SubmitReading, SubmitResponse, TemperatureValue, PAGE_SIZE};
