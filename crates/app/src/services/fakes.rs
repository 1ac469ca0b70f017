//! In-memory port implementations shared by the service tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use omnihub_domain::binding::BridgeRef;
use omnihub_domain::capability::MediaAction;
use omnihub_domain::command::SerialOptions;
use omnihub_domain::device::{Device, Protocol};
use omnihub_domain::error::{OmniHubError, TransportError};
use omnihub_domain::session::SessionEndpoint;

use crate::ports::{
    AccessoryBridge, AccessoryInfo, DeviceStore, HostBluetooth, IpLightInfo, IpLights,
    RemoteSession, ScannedDevice, SerialChannel, SessionConnector, ToolOutput, WirelessStack,
};

pub fn device(id: &str) -> Device {
    Device::builder().id(id).name(id).build().unwrap()
}

pub fn ble_device(id: &str, address: &str) -> Device {
    Device::builder()
        .id(id)
        .name(id)
        .protocol(Protocol::Bluetooth)
        .address(address)
        .build()
        .unwrap()
}

// --- store -----------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    devices: Vec<Device>,
    persist_count: usize,
    fail: bool,
}

#[derive(Clone, Default)]
pub struct FakeStore(Arc<Mutex<StoreState>>);

impl FakeStore {
    pub fn with(devices: Vec<Device>) -> Self {
        Self(Arc::new(Mutex::new(StoreState {
            devices,
            ..StoreState::default()
        })))
    }

    pub fn saved(&self) -> Vec<Device> {
        self.0.lock().unwrap().devices.clone()
    }

    pub fn persist_count(&self) -> usize {
        self.0.lock().unwrap().persist_count
    }

    pub fn fail_persist(&self, fail: bool) {
        self.0.lock().unwrap().fail = fail;
    }
}

impl DeviceStore for FakeStore {
    fn load(&self) -> impl Future<Output = Result<Vec<Device>, OmniHubError>> + Send {
        let devices = self.0.lock().unwrap().devices.clone();
        async move { Ok(devices) }
    }

    fn persist(&self, devices: Vec<Device>) -> impl Future<Output = Result<(), OmniHubError>> + Send {
        let mut state = self.0.lock().unwrap();
        let result = if state.fail {
            Err(OmniHubError::storage(std::io::Error::other("disk full")))
        } else {
            state.devices = devices;
            state.persist_count += 1;
            Ok(())
        };
        async move { result }
    }
}

// --- wireless --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub address: String,
    pub attribute: String,
    pub payload: Vec<u8>,
    pub with_response: bool,
}

#[derive(Default)]
struct WirelessState {
    scan_results: Vec<ScannedDevice>,
    connect_ok: bool,
    connects: Vec<String>,
    writes: Vec<Write>,
    write_error: Option<TransportError>,
}

#[derive(Clone, Default)]
pub struct FakeWireless(Arc<Mutex<WirelessState>>);

impl FakeWireless {
    pub fn reachable() -> Self {
        let wireless = Self::default();
        wireless.set_connect_ok(true);
        wireless
    }

    pub fn set_connect_ok(&self, ok: bool) {
        self.0.lock().unwrap().connect_ok = ok;
    }

    pub fn set_scan_results(&self, results: Vec<ScannedDevice>) {
        self.0.lock().unwrap().scan_results = results;
    }

    pub fn fail_writes(&self, error: TransportError) {
        self.0.lock().unwrap().write_error = Some(error);
    }

    pub fn connects(&self) -> Vec<String> {
        self.0.lock().unwrap().connects.clone()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.0.lock().unwrap().writes.clone()
    }
}

impl WirelessStack for FakeWireless {
    fn scan(
        &self,
        _timeout: Duration,
    ) -> impl Future<Output = Result<Vec<ScannedDevice>, OmniHubError>> + Send {
        let results = self.0.lock().unwrap().scan_results.clone();
        async move { Ok(results) }
    }

    fn connect(
        &self,
        address: &str,
        _timeout: Duration,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        let mut state = self.0.lock().unwrap();
        state.connects.push(address.to_string());
        let ok = state.connect_ok;
        async move { Ok(ok) }
    }

    fn write_attribute(
        &self,
        address: &str,
        attribute: &str,
        payload: &[u8],
        with_response: bool,
    ) -> impl Future<Output = Result<(), OmniHubError>> + Send {
        let mut state = self.0.lock().unwrap();
        let result = match state.write_error.clone() {
            Some(error) => Err(error.into()),
            None => {
                state.writes.push(Write {
                    address: address.to_string(),
                    attribute: attribute.to_string(),
                    payload: payload.to_vec(),
                    with_response,
                });
                Ok(())
            }
        };
        async move { result }
    }
}

// --- host bluetooth --------------------------------------------------------

#[derive(Default)]
struct HostState {
    calls: Vec<Vec<String>>,
    responses: HashMap<String, ToolOutput>,
    bus_agent_fails: bool,
    bus_registrations: usize,
    script_runs: usize,
    sdp: Option<String>,
    media: Vec<(String, MediaAction)>,
}

#[derive(Clone, Default)]
pub struct FakeHost(Arc<Mutex<HostState>>);

pub fn ok_output(stdout: &str) -> ToolOutput {
    ToolOutput {
        success: true,
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failed_output(stderr: &str) -> ToolOutput {
    ToolOutput {
        success: false,
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

impl FakeHost {
    /// Respond to the tool action (`pair`, `trust`, `scan`, `devices`, ...).
    pub fn respond(&self, action: &str, output: ToolOutput) {
        self.0
            .lock()
            .unwrap()
            .responses
            .insert(action.to_string(), output);
    }

    pub fn fail_bus_agent(&self) {
        self.0.lock().unwrap().bus_agent_fails = true;
    }

    pub fn set_sdp(&self, text: &str) {
        self.0.lock().unwrap().sdp = Some(text.to_string());
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.0.lock().unwrap().calls.clone()
    }

    /// Tool actions invoked, with `--timeout N` stripped.
    pub fn actions(&self) -> Vec<String> {
        self.calls().iter().map(|args| action_of(args)).collect()
    }

    pub fn bus_registrations(&self) -> usize {
        self.0.lock().unwrap().bus_registrations
    }

    pub fn script_runs(&self) -> usize {
        self.0.lock().unwrap().script_runs
    }

    pub fn media_controls(&self) -> Vec<(String, MediaAction)> {
        self.0.lock().unwrap().media.clone()
    }
}

fn action_of(args: &[String]) -> String {
    let mut rest = args.iter();
    let mut words = Vec::new();
    while let Some(arg) = rest.next() {
        if arg == "--timeout" {
            rest.next();
        } else {
            words.push(arg.as_str());
        }
    }
    words.join(" ")
}

impl HostBluetooth for FakeHost {
    fn run_tool(
        &self,
        args: Vec<String>,
    ) -> impl Future<Output = Result<ToolOutput, OmniHubError>> + Send {
        let mut state = self.0.lock().unwrap();
        let action = action_of(&args);
        let verb = action.split_whitespace().next().unwrap_or_default().to_string();
        state.calls.push(args);
        let output = state
            .responses
            .get(&action)
            .or_else(|| state.responses.get(&verb))
            .cloned()
            .unwrap_or_else(|| ok_output(""));
        async move { Ok(output) }
    }

    fn run_agent_script(
        &self,
        _capability: &str,
    ) -> impl Future<Output = Result<ToolOutput, OmniHubError>> + Send {
        let mut state = self.0.lock().unwrap();
        state.script_runs += 1;
        let output = state
            .responses
            .get("agent")
            .cloned()
            .unwrap_or_else(|| ok_output("Agent registered\nDefault agent request successful"));
        async move { Ok(output) }
    }

    fn register_agent(
        &self,
        _capability: &str,
    ) -> impl Future<Output = Result<(), OmniHubError>> + Send {
        let mut state = self.0.lock().unwrap();
        let result = if state.bus_agent_fails {
            Err(TransportError::Failed {
                operation: "agent registration",
                detail: "no system bus".to_string(),
            }
            .into())
        } else {
            state.bus_registrations += 1;
            Ok(())
        };
        async move { result }
    }

    fn browse_services(
        &self,
        _address: &str,
    ) -> impl Future<Output = Result<String, OmniHubError>> + Send {
        let sdp = self.0.lock().unwrap().sdp.clone();
        async move {
            sdp.ok_or_else(|| TransportError::ToolMissing { tool: "sdptool" }.into())
        }
    }

    fn media_control(
        &self,
        address: &str,
        action: MediaAction,
    ) -> impl Future<Output = Result<ToolOutput, OmniHubError>> + Send {
        let mut state = self.0.lock().unwrap();
        state.media.push((address.to_string(), action));
        let output = state
            .responses
            .get("media")
            .cloned()
            .unwrap_or_else(|| ok_output(""));
        async move { Ok(output) }
    }
}

// --- serial ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub address: String,
    pub channel: u8,
    pub payload: Vec<u8>,
    pub options: SerialOptions,
}

#[derive(Default)]
struct SerialState {
    exchanges: Vec<Exchange>,
    response: Vec<u8>,
}

#[derive(Clone, Default)]
pub struct FakeSerial(Arc<Mutex<SerialState>>);

impl FakeSerial {
    pub fn respond_with(&self, bytes: &[u8]) {
        self.0.lock().unwrap().response = bytes.to_vec();
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.0.lock().unwrap().exchanges.clone()
    }
}

impl SerialChannel for FakeSerial {
    fn exchange(
        &self,
        address: &str,
        channel: u8,
        payload: &[u8],
        options: SerialOptions,
    ) -> impl Future<Output = Result<Vec<u8>, OmniHubError>> + Send {
        let mut state = self.0.lock().unwrap();
        state.exchanges.push(Exchange {
            address: address.to_string(),
            channel,
            payload: payload.to_vec(),
            options,
        });
        let response = state.response.clone();
        async move { Ok(response) }
    }
}

// --- session remote --------------------------------------------------------

#[derive(Default)]
struct RemoteState {
    connects: Vec<SessionEndpoint>,
    sent: Vec<String>,
    inbound: VecDeque<String>,
    handshake_replies: Vec<String>,
    key_replies: Vec<String>,
    fail_next_send: bool,
    closes: usize,
}

/// Scripted remote: frames queued per outbound frame kind.
#[derive(Clone, Default)]
pub struct FakeRemote(Arc<Mutex<RemoteState>>);

impl FakeRemote {
    pub fn on_handshake(&self, reply: &str) {
        self.0
            .lock()
            .unwrap()
            .handshake_replies
            .push(reply.to_string());
    }

    pub fn on_key(&self, reply: &str) {
        self.0.lock().unwrap().key_replies.push(reply.to_string());
    }

    pub fn fail_next_send(&self) {
        self.0.lock().unwrap().fail_next_send = true;
    }

    pub fn connects(&self) -> Vec<SessionEndpoint> {
        self.0.lock().unwrap().connects.clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.0.lock().unwrap().sent.clone()
    }

    pub fn sent_containing(&self, needle: &str) -> usize {
        self.sent().iter().filter(|frame| frame.contains(needle)).count()
    }

    pub fn closes(&self) -> usize {
        self.0.lock().unwrap().closes
    }
}

pub struct FakeRemoteSession {
    state: Arc<Mutex<RemoteState>>,
    alive: bool,
}

impl SessionConnector for FakeRemote {
    type Session = FakeRemoteSession;

    fn connect(
        &self,
        endpoint: &SessionEndpoint,
    ) -> impl Future<Output = Result<Self::Session, OmniHubError>> + Send {
        self.0.lock().unwrap().connects.push(endpoint.clone());
        let session = FakeRemoteSession {
            state: self.0.clone(),
            alive: true,
        };
        async move { Ok(session) }
    }
}

impl RemoteSession for FakeRemoteSession {
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), OmniHubError>> + Send {
        let mut state = self.state.lock().unwrap();
        let result = if state.fail_next_send {
            state.fail_next_send = false;
            self.alive = false;
            Err(TransportError::Closed {
                detail: "connection reset".to_string(),
            }
            .into())
        } else {
            let replies = if text.contains("ms.channel.connect") {
                state.handshake_replies.clone()
            } else if text.contains("ms.remote.control") {
                state.key_replies.clone()
            } else {
                Vec::new()
            };
            state.inbound.extend(replies);
            state.sent.push(text);
            Ok(())
        };
        async move { result }
    }

    fn recv_text(
        &mut self,
        _idle: Duration,
    ) -> impl Future<Output = Result<Option<String>, OmniHubError>> + Send {
        let next = self.state.lock().unwrap().inbound.pop_front();
        async move { Ok(next) }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn close(&mut self) -> impl Future<Output = ()> + Send {
        self.alive = false;
        self.state.lock().unwrap().closes += 1;
        async {}
    }
}

// --- accessory bridge ------------------------------------------------------

#[derive(Default)]
struct BridgeState {
    accessories: Vec<AccessoryInfo>,
    toggles: Vec<(BridgeRef, Option<bool>)>,
    toggle_result: bool,
    ping_result: bool,
    fail_list: bool,
}

#[derive(Clone, Default)]
pub struct FakeBridge(Arc<Mutex<BridgeState>>);

impl FakeBridge {
    pub fn with(accessories: Vec<AccessoryInfo>) -> Self {
        let bridge = Self::default();
        bridge.0.lock().unwrap().accessories = accessories;
        bridge
    }

    pub fn set_toggle_result(&self, on: bool) {
        self.0.lock().unwrap().toggle_result = on;
    }

    pub fn set_ping_result(&self, ok: bool) {
        self.0.lock().unwrap().ping_result = ok;
    }

    pub fn fail_list(&self) {
        self.0.lock().unwrap().fail_list = true;
    }

    pub fn toggles(&self) -> Vec<(BridgeRef, Option<bool>)> {
        self.0.lock().unwrap().toggles.clone()
    }
}

pub fn accessory(identifier: &str, name: &str) -> AccessoryInfo {
    AccessoryInfo {
        identifier: identifier.to_string(),
        name: name.to_string(),
        room: Some("Kitchen".to_string()),
        bridge: BridgeRef {
            pairing_id: "AA:11".to_string(),
            aid: 2,
            iid: 9,
        },
        is_on: Some(false),
    }
}

impl AccessoryBridge for FakeBridge {
    fn list_accessories(
        &self,
    ) -> impl Future<Output = Result<Vec<AccessoryInfo>, OmniHubError>> + Send {
        let state = self.0.lock().unwrap();
        let result = if state.fail_list {
            Err(TransportError::Failed {
                operation: "accessory listing",
                detail: "bridge offline".to_string(),
            }
            .into())
        } else {
            Ok(state.accessories.clone())
        };
        async move { result }
    }

    fn toggle(
        &self,
        bridge: &BridgeRef,
        desired: Option<bool>,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        let mut state = self.0.lock().unwrap();
        state.toggles.push((bridge.clone(), desired));
        let on = state.toggle_result;
        async move { Ok(on) }
    }

    fn ping(&self, _bridge: &BridgeRef) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        let ok = self.0.lock().unwrap().ping_result;
        async move { Ok(ok) }
    }
}

// --- ip lights -------------------------------------------------------------

#[derive(Default)]
struct LightState {
    lights: Vec<IpLightInfo>,
    reachable: bool,
    switches: Vec<(String, bool)>,
}

#[derive(Clone, Default)]
pub struct FakeLights(Arc<Mutex<LightState>>);

impl FakeLights {
    pub fn with(lights: Vec<IpLightInfo>) -> Self {
        let fake = Self::default();
        fake.0.lock().unwrap().lights = lights;
        fake
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.0.lock().unwrap().reachable = reachable;
    }

    pub fn switches(&self) -> Vec<(String, bool)> {
        self.0.lock().unwrap().switches.clone()
    }
}

pub fn light(identifier: &str, address: &str) -> IpLightInfo {
    IpLightInfo {
        identifier: identifier.to_string(),
        name: format!("{identifier} lamp"),
        kind: Some("Light".to_string()),
        address: address.to_string(),
    }
}

impl IpLights for FakeLights {
    fn list_lights(&self) -> impl Future<Output = Result<Vec<IpLightInfo>, OmniHubError>> + Send {
        let lights = self.0.lock().unwrap().lights.clone();
        async move { Ok(lights) }
    }

    fn ping(&self, _address: &str) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        let reachable = self.0.lock().unwrap().reachable;
        async move { Ok(reachable) }
    }

    fn set_power(
        &self,
        address: &str,
        on: bool,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        self.0
            .lock()
            .unwrap()
            .switches
            .push((address.to_string(), on));
        async move { Ok(on) }
    }
}
