//! # omnihub-adapter-bluez
//!
//! Host Bluetooth adapter for Linux/BlueZ.
//!
//! ## Responsibilities
//! - [`BluezHost`] implements [`HostBluetooth`](omnihub_app::ports::HostBluetooth):
//!   runs `bluetoothctl` and `sdptool` as child processes with bounded
//!   runtimes, registers a default pairing agent over D-Bus via
//!   [bluer](https://docs.rs/bluer), and scripts `bluetoothctl` as the
//!   agent fallback and for AVRCP media controls
//! - [`RfcommSerial`] implements [`SerialChannel`](omnihub_app::ports::SerialChannel)
//!   over bluer RFCOMM streams, one connection per exchange
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `omnihub-app` and `omnihub-domain`.

mod agent;
mod error;
mod host;
mod media;
mod rfcomm;
mod tool;

pub use error::BluezError;
pub use host::BluezHost;
pub use rfcomm::{RfcommSerial, read_response};
