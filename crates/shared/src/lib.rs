pub mod domain;
pub mod envelope;
pub mod error;
pub mod protocol;
pub mod timestamp;
