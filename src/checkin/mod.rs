//! QR check-in processing: prayer tagging, duplicate detection, arrival
//! ranking and points.

pub mod clock;
pub mod error;
#[cfg(test)]
pub mod inmemory;
pub mod mysql;
pub mod repos;
pub mod schedule;
pub mod service;
pub mod tagger;

pub use error::CheckInError;
pub use service::CheckInService;
