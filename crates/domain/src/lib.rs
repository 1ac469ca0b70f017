//! # omnihub-domain
//!
//! Pure domain model for the omnihub device control hub.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy, timestamps
//! - Define **Devices** and the per-transport **bindings** they carry
//!   (attribute, serial-channel, and session-remote)
//! - Normalize raw command descriptions into typed [`CommandSpec`](command::CommandSpec)s
//! - Normalize hardware addresses into their canonical colon-separated form
//! - Parse service-discovery dumps into capability summaries and resolve
//!   serial channels from them
//! - Define the **pairing job** lifecycle and the session-remote wire frames
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod address;
pub mod binding;
pub mod capability;
pub mod command;
pub mod device;
pub mod pairing_job;
pub mod session;
