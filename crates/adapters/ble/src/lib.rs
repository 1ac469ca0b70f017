//! # omnihub-adapter-ble
//!
//! Short-range wireless adapter — implements
//! [`WirelessStack`](omnihub_app::ports::WirelessStack) on top of
//! [btleplug](https://docs.rs/btleplug).
//!
//! ## How it works
//!
//! Every operation is transient: the peripheral is looked up among the
//! peripherals the host adapter already knows (scanning briefly when it is
//! not), connected, used, and disconnected again, even on error. The host
//! adapter itself is opened lazily on first use so the hub starts on
//! machines without a Bluetooth radio.
//!
//! Characteristics may be given as 16-bit (`ff01`), 32-bit or full
//! 128-bit UUIDs; short forms expand against the Bluetooth base UUID.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `omnihub-app` and `omnihub-domain`.

mod config;
mod error;
pub mod gatt;
mod stack;

pub use config::BleConfig;
pub use error::BleError;
pub use stack::BleWirelessStack;
