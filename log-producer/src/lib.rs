pub mod config;
pub mod error;
pub mod producer;

pub use error::ProducerError;
pub use producer::{build_record, LogProducer};
