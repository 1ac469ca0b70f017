//! # omnihub-adapter-iplight
//!
//! IP light adapter — implements [`IpLights`](omnihub_app::ports::IpLights)
//! from a JSON catalog of lights and their LAN addresses.
//!
//! Reachability is a plain HTTP `GET /` answered with `200 OK`. Switching a
//! light needs the vendor's local protocol, which this adapter does not
//! speak; power requests are reported as unsupported.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `omnihub-app` and `omnihub-domain`.

mod catalog;
mod error;
mod lights;

pub use catalog::{CatalogEntry, LightCatalog};
pub use error::IpLightError;
pub use lights::{DEFAULT_PING_TIMEOUT, HttpIpLights};
