//! Mock adapters and a scripted test rig.
//!
//! [`MockHw`] holds a level per GPIO that tests flip to press buttons and
//! records every relay and LED write. [`Rig`] wires an [`AppService`] to
//! the mocks and advances simulated time in 10 ms poll steps, the way the
//! firmware loop does.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use ampswitch::adapters::espnow::SimTransport;
use ampswitch::app::commands::{AppCommand, CommandOutcome};
use ampswitch::app::events::AppEvent;
use ampswitch::app::ports::{EventSink, InputPort, OutputPort, StorageError, StoragePort};
use ampswitch::app::service::AppService;
use ampswitch::config::DeviceConfig;
use ampswitch::drivers::button::Level;
use ampswitch::drivers::led_patterns::LedPattern;
use ampswitch::drivers::midi::ProgramChange;
use ampswitch::error::OutputError;
use ampswitch::events;
use ampswitch::protocol::{MacAddr, Message, MAX_FRAME_LEN};
use ampswitch::settings;

pub const SERVER_MAC: MacAddr = [0x02, 0x00, 0x00, 0x00, 0x00, 0xAA];
pub const CLIENT_MAC: MacAddr = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
pub const STRANGER_MAC: MacAddr = [0x02, 0x00, 0x00, 0x00, 0x00, 0x77];

/// Poll period of the simulated loop.
pub const STEP_MS: u32 = 10;

// The inbound frame queue is process-global; rigs take turns.
static SERIAL: Mutex<()> = Mutex::new(());

// ── MockHw ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockHw {
    levels: HashMap<i32, Level>,
    /// Every `set_channel` call, in order.
    pub channel_calls: Vec<u8>,
    pub last_duty: u16,
    pub duty_writes: usize,
}

#[allow(dead_code)]
impl MockHw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&mut self, gpio: i32, level: Level) {
        self.levels.insert(gpio, level);
    }

    /// Relay channel engaged by the most recent write (0 = all off).
    pub fn engaged(&self) -> u8 {
        self.channel_calls.last().copied().unwrap_or(0)
    }
}

impl InputPort for MockHw {
    fn read_pin(&mut self, gpio: i32) -> Level {
        self.levels.get(&gpio).copied().unwrap_or(Level::High)
    }
}

impl OutputPort for MockHw {
    fn set_channel(&mut self, channel: u8) -> Result<(), OutputError> {
        self.channel_calls.push(channel);
        Ok(())
    }

    fn set_led_duty(&mut self, duty: u16) {
        self.last_duty = duty;
        self.duty_writes += 1;
    }
}

// ── MemStore ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemStore {
    data: HashMap<(String, String), Vec<u8>>,
    /// Number of successful writes, per namespace.
    pub writes: HashMap<String, usize>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes_to(&self, namespace: &str) -> usize {
        self.writes.get(namespace).copied().unwrap_or(0)
    }
}

impl StoragePort for MemStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let value = self
            .data
            .get(&(namespace.to_owned(), key.to_owned()))
            .ok_or(StorageError::NotFound)?;
        let dst = buf.get_mut(..value.len()).ok_or(StorageError::TooLarge)?;
        dst.copy_from_slice(value);
        Ok(value.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert((namespace.to_owned(), key.to_owned()), data.to_vec());
        *self.writes.entry(namespace.to_owned()).or_default() += 1;
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&(namespace.to_owned(), key.to_owned()));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data.contains_key(&(namespace.to_owned(), key.to_owned()))
    }
}

// ── Event collector ───────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Events(pub Vec<AppEvent>);

#[allow(dead_code)]
impl Events {
    pub fn contains(&self, event: &AppEvent) -> bool {
        self.0.contains(event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.0.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for Events {
    fn emit(&mut self, event: &AppEvent) {
        self.0.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub struct Rig {
    pub app: AppService,
    pub hw: MockHw,
    pub radio: SimTransport,
    pub store: MemStore,
    pub sink: Events,
    pub now: u32,
    _serial: MutexGuard<'static, ()>,
}

#[allow(dead_code)]
impl Rig {
    /// Client with `channels` relays, already paired with [`SERVER_MAC`].
    pub fn paired_client(channels: u8) -> Self {
        let mut store = MemStore::new();
        settings::save_pairing(&mut store, &SERVER_MAC, 6).expect("seed pairing");
        Self::build(DeviceConfig::client(channels), CLIENT_MAC, store)
    }

    /// Client on first boot: nothing stored.
    pub fn fresh_client(channels: u8) -> Self {
        Self::build(DeviceConfig::client(channels), CLIENT_MAC, MemStore::new())
    }

    pub fn server(channels: u8) -> Self {
        Self::build(DeviceConfig::server(channels), SERVER_MAC, MemStore::new())
    }

    fn build(config: DeviceConfig, mac: MacAddr, mut store: MemStore) -> Self {
        let serial = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        events::drain_frames(|_| {});

        let mut app = AppService::new(config, "AmpSwitch-TEST01");
        let mut radio = SimTransport::new(mac);
        let mut sink = Events::default();
        app.start(0, &mut radio, &mut store, &mut sink);
        Self {
            app,
            hw: MockHw::new(),
            radio,
            store,
            sink,
            now: 0,
            _serial: serial,
        }
    }

    /// Poll every [`STEP_MS`] until `ms` have passed.
    pub fn advance(&mut self, ms: u32) {
        let end = self.now + ms;
        while self.now < end {
            self.now += STEP_MS;
            self.app
                .poll(self.now, &mut self.hw, &mut self.radio, &mut self.store, &mut self.sink);
        }
    }

    fn gpio(&self, button: usize) -> i32 {
        self.app.config().buttons[button].gpio
    }

    pub fn press(&mut self, button: usize) {
        let gpio = self.gpio(button);
        self.hw.set_level(gpio, Level::Low);
    }

    pub fn release(&mut self, button: usize) {
        let gpio = self.gpio(button);
        self.hw.set_level(gpio, Level::High);
    }

    /// Hold `button` for `ms`, release, and let the release settle.
    pub fn hold(&mut self, button: usize, ms: u32) {
        self.press(button);
        self.advance(ms);
        self.release(button);
        self.advance(300);
    }

    pub fn tap(&mut self, button: usize) {
        self.hold(button, 300);
    }

    pub fn midi(&mut self, channel: u8, program: u8) {
        self.app.on_program_change(
            ProgramChange { channel, program },
            self.now,
            &mut self.hw,
            &mut self.radio,
            &mut self.store,
            &mut self.sink,
        );
    }

    pub fn command(&mut self, cmd: AppCommand) -> CommandOutcome {
        self.app
            .handle_command(cmd, self.now, &mut self.hw, &mut self.store, &mut self.sink)
    }

    /// Queue a frame as the radio callback would, then run one poll.
    pub fn deliver(&mut self, src: MacAddr, message: &Message) {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let bytes = message.encode(&mut buf).expect("encode");
        assert!(events::push_frame(src, bytes), "frame queue full");
        self.advance(STEP_MS);
    }

    /// Messages sent since the last call.
    pub fn take_sent(&mut self) -> Vec<(MacAddr, Message)> {
        std::mem::take(&mut self.radio.sent)
    }

    pub fn led_pattern(&self) -> LedPattern {
        self.app.state().led.pattern()
    }
}
