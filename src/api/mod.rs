pub mod attendance;
pub mod mosque;
pub mod participant;
