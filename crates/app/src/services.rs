//! Application services — use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod command_service;
pub mod device_service;
pub mod dispatcher;
pub mod host_tool;
pub mod hub;
pub mod pairing;
pub mod pairing_jobs;
pub mod registry;
pub mod session_manager;

#[cfg(test)]
pub(crate) mod fakes;
