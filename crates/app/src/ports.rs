//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod accessory;
pub mod host_bluetooth;
pub mod ip_light;
pub mod serial;
pub mod session;
pub mod storage;
pub mod wireless;

pub use accessory::{AccessoryBridge, AccessoryInfo, NoAccessoryBridge};
pub use host_bluetooth::{HostBluetooth, ToolOutput};
pub use ip_light::{IpLightInfo, IpLights, NoIpLights};
pub use serial::SerialChannel;
pub use session::{RemoteSession, SessionConnector};
pub use storage::DeviceStore;
pub use wireless::{ScannedDevice, WirelessStack};
