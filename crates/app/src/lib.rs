//! # omnihub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceStore` — load and persist the device registry
//!   - `WirelessStack` — BLE scan, transient connect, attribute write
//!   - `HostBluetooth` — host Bluetooth tool, pairing agent, service browse,
//!     media controls
//!   - `SerialChannel` — RFCOMM byte exchange
//!   - `SessionConnector` / `RemoteSession` — session-remote websockets
//!   - `AccessoryBridge` — accessory-bridge device source
//!   - `IpLights` — IP light catalog, reachability and power
//! - Provide the use-case services:
//!   - `DeviceRegistry` — in-memory map with serialized persistence
//!   - `TransportDispatcher` — route a command to its transport
//!   - `SessionManager` — per-address session reuse and token lifecycle
//!   - `PairingOrchestrator` — pair/trust workflow with capability discovery
//!   - `PairingJobTracker` — non-blocking pollable pairing jobs
//!   - `DeviceService` / `CommandService` — registry operations and commands
//!   - `Hub` — facade wiring all of the above from one set of adapters
//!
//! ## Dependency rule
//! Depends on `omnihub-domain` only (plus `tokio` for locks, tasks and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;
