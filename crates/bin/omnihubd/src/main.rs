//! # omnihubd — omnihub daemon
//!
//! Composition root that wires all adapters together and runs one hub
//! operation per invocation.
//!
//! ## Responsibilities
//! - Parse configuration (CLI args, env vars, config file)
//! - Initialize logging
//! - Construct the JSON stores, the BLE stack, the host Bluetooth tools, the
//!   session-remote connector and the IP light catalog (adapters)
//! - Construct the hub, injecting adapters via port traits
//! - Run the requested command and print its result as JSON
//! - Shut the hub down (pairing jobs, cached sessions) before exiting
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use omnihub_adapter_ble::BleWirelessStack;
use omnihub_adapter_bluez::{BluezHost, RfcommSerial};
use omnihub_adapter_iplight::{DEFAULT_PING_TIMEOUT, HttpIpLights};
use omnihub_adapter_smartview::SmartViewConnector;
use omnihub_adapter_storage_json::{
    JsonAccessoryCache, JsonDeviceStore, SettingsStore, StoragePaths, UpdateHistoryStore,
};
use omnihub_app::ports::{
    AccessoryBridge, DeviceStore, HostBluetooth, IpLights, SerialChannel, SessionConnector,
    WirelessStack,
};
use omnihub_app::services::command_service::CommandRef;
use omnihub_app::services::hub::{Hub, HubParts};
use omnihub_app::services::pairing::PairingRequest;
use omnihub_domain::address::BtAddress;
use omnihub_domain::capability::MediaAction;
use omnihub_domain::device::{Device, DeviceView};
use omnihub_domain::id::DeviceId;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[command(name = "omnihubd", version, about = "Home device control hub")]
struct Cli {
    /// Configuration file.
    #[arg(long, env = "OMNIHUB_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every known device.
    Devices,
    /// Scan for nearby devices and register new ones.
    Scan,
    /// Pair and trust a device, storing its command tables.
    Pair {
        /// Bluetooth address in any accepted form.
        address: String,
        #[arg(long)]
        device_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        room: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        /// JSON file holding an array of command descriptions.
        #[arg(long)]
        commands: Option<PathBuf>,
        /// Run as a background job and report its progress.
        #[arg(long = "async")]
        background: bool,
    },
    /// Send a stored command (or a mapped logical action).
    Command { device: String, command: String },
    /// Send a command described inline as JSON.
    CommandInline { device: String, json: String },
    /// Check whether a device answers.
    Ping { device: String },
    /// Flip a device's power state.
    Toggle { device: String },
    /// Send a media control (play, pause, next, previous).
    Media { device: String, action: MediaAction },
    /// Registry totals.
    Stats,
    /// Hub settings document.
    Settings,
    /// Release history.
    Updates,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_writer(std::io::stderr)
        .init();

    // Stores
    let paths = config.storage_paths();
    let store = JsonDeviceStore::new(&paths.devices).with_seed(config.display_seed()?);
    let bridge = JsonAccessoryCache::new(&paths.accessories);

    // Transports
    let wireless = BleWirelessStack::new(config.ble.clone());
    let host = BluezHost::new();
    let connector = SmartViewConnector::new()?;
    let lights = HttpIpLights::new(&paths.ip_lights, DEFAULT_PING_TIMEOUT)?;

    // Hub
    let hub = Hub::open(
        HubParts {
            store,
            wireless,
            host,
            serial: RfcommSerial,
            connector,
            bridge,
            lights,
        },
        config.hub_options(),
    )
    .await?;
    tracing::debug!(devices = %paths.devices.display(), "hub ready");

    let outcome = run(&hub, &paths, cli.command).await;
    hub.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&outcome?)?);
    Ok(())
}

async fn run<S, W, H, SC, C, B, L>(
    hub: &Hub<S, W, H, SC, C, B, L>,
    paths: &StoragePaths,
    command: Command,
) -> Result<Value, Box<dyn std::error::Error>>
where
    S: DeviceStore + 'static,
    W: WirelessStack + 'static,
    H: HostBluetooth + 'static,
    SC: SerialChannel,
    C: SessionConnector,
    B: AccessoryBridge,
    L: IpLights,
{
    let value = match command {
        Command::Devices => serde_json::to_value(hub.devices().list_devices().await?)?,
        Command::Scan => views(hub.devices().scan().await?)?,
        Command::Pair {
            address,
            device_id,
            name,
            room,
            kind,
            commands,
            background,
        } => {
            let mut request = PairingRequest::new(BtAddress::parse(&address)?);
            request.device_id = device_id.map(DeviceId::new);
            request.name = name;
            request.room = room;
            request.kind = kind;
            if let Some(path) = commands {
                request.commands = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            }
            if background {
                let job_id = hub.pair_async(request);
                println!("{}", serde_json::to_string(&hub.pairing_job(job_id)?)?);
                serde_json::to_value(hub.wait_for_job(job_id).await?)?
            } else {
                view(hub.pair(request).await?)?
            }
        }
        Command::Command { device, command } => view(
            hub.commands()
                .send_command(&device, CommandRef::Stored(command))
                .await?,
        )?,
        Command::CommandInline { device, json } => {
            let raw: Value = serde_json::from_str(&json)?;
            view(
                hub.commands()
                    .send_command(&device, CommandRef::Inline(raw))
                    .await?,
            )?
        }
        Command::Ping { device } => {
            let reachable = hub.devices().ping(&device).await?;
            json!({ "id": device, "reachable": reachable })
        }
        Command::Toggle { device } => view(hub.devices().toggle(&device).await?)?,
        Command::Media { device, action } => {
            view(hub.devices().media(&device, action).await?)?
        }
        Command::Stats => serde_json::to_value(hub.devices().stats().await?)?,
        Command::Settings => {
            serde_json::to_value(SettingsStore::new(&paths.settings).load().await?)?
        }
        Command::Updates => {
            serde_json::to_value(UpdateHistoryStore::new(&paths.update_history).load().await?)?
        }
    };
    Ok(value)
}

fn view(device: Device) -> Result<Value, serde_json::Error> {
    serde_json::to_value(DeviceView::from(device))
}

fn views(devices: Vec<Device>) -> Result<Value, serde_json::Error> {
    serde_json::to_value(devices.into_iter().map(DeviceView::from).collect::<Vec<_>>())
}
