pub mod attendance;
pub mod mosque;
pub mod participant;
pub mod prayer;
pub mod user;
