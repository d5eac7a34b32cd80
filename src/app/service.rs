//! Application service: the poll-loop orchestrator.
//!
//! [`AppService`] owns the runtime state, the button debouncer and the
//! role-specific radio state. All I/O flows through port traits injected at
//! call sites, so the whole gesture and mode machinery runs against mocks
//! in tests.
//!
//! ```text
//!   InputPort ──▶ ┌──────────────────────────────┐ ──▶ OutputPort
//!                 │          AppService           │
//!   frames ─────▶ │ gestures · sub-modes · links  │ ──▶ TransportPort
//!   MIDI / cli ─▶ └──────────────────────────────┘ ──▶ EventSink
//! ```
//!
//! One [`poll`](AppService::poll) is one loop iteration:
//! buttons → LED → background timers → inbound frames. MIDI and console
//! input are fed in by the caller between polls.

use heapless::{String, Vec};
use log::{debug, info, warn};

use crate::config::{DeviceConfig, Role, ShortPressAction, MAX_BUTTONS};
use crate::console::HELP;
use crate::drivers::button::{Debouncer, Transition};
use crate::drivers::led_patterns::LedPattern;
use crate::drivers::midi::ProgramChange;
use crate::events::{self, Frame};
use crate::protocol::{MacAddr, MacDisplay, Message, NAME_LEN};
use crate::settings;

use super::commands::{AppCommand, CommandOutcome};
use super::dispatcher::{self, ProgramSource};
use super::events::AppEvent;
use super::gesture::{self, ReleaseDecision, ReleaseInput};
use super::midi_learn::{self, LearnOutcome};
use super::pairing::{ClientPairing, PairingStatus, ServerPairing, MAX_PEERS};
use super::ports::{EventSink, InputPort, OutputPort, StoragePort, TransportPort};
use super::state::SystemState;

/// Role-specific radio state.
#[derive(Debug)]
pub enum Link {
    Client(ClientPairing),
    Server(ServerPairing),
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    config: DeviceConfig,
    state: SystemState,
    buttons: Debouncer,
    link: Link,
    /// Sequence number of the last command sent.
    sequence: u32,
    device_name: String<NAME_LEN>,
}

impl AppService {
    /// Build the service. Persisted settings are applied by [`start`](Self::start).
    pub fn new(config: DeviceConfig, device_name: &str) -> Self {
        let pins: Vec<i32, MAX_BUTTONS> = config.buttons.iter().map(|b| b.gpio).collect();
        let buttons = Debouncer::new(&pins, config.timings.debounce_ms);
        let link = match config.role {
            Role::Client => Link::Client(ClientPairing::new()),
            Role::Server => Link::Server(ServerPairing::default()),
        };
        let mut name = String::new();
        for c in device_name.chars() {
            if name.push(c).is_err() {
                break;
            }
        }

        Self {
            state: SystemState::new(&config),
            config,
            buttons,
            link,
            sequence: 0,
            device_name: name,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load persisted settings and bring the radio link up.
    ///
    /// A client without a saved hub starts discovery straight away.
    pub fn start(
        &mut self,
        now_ms: u32,
        radio: &mut impl TransportPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        self.state.mapping = settings::load_mapping(store, self.config.channel_count);
        self.state.midi_channel = settings::load_midi_channel(store);

        match self.config.role {
            Role::Client => match settings::load_pairing(store) {
                Some((server, channel)) => {
                    info!("Restoring pairing: server {} on channel {}", MacDisplay(&server), channel);
                    let restored = radio
                        .set_radio_channel(channel)
                        .and_then(|()| radio.add_peer(&server, channel));
                    if let Err(e) = restored {
                        warn!("Failed to restore radio link: {}", e);
                    }
                    self.link = Link::Client(ClientPairing::restore(server, channel));
                }
                None => {
                    info!("No saved server, starting discovery");
                    let mut pairing = ClientPairing::new();
                    pairing.trigger();
                    self.link = Link::Client(pairing);
                    sink.emit(&AppEvent::PairingStarted);
                }
            },
            Role::Server => {
                let peers = settings::load_peers(store);
                let channel = self.config.radio_channel;
                if let Err(e) = radio.set_radio_channel(channel) {
                    warn!("Failed to set radio channel {}: {}", channel, e);
                }
                for mac in peers.macs() {
                    if let Err(e) = radio.add_peer(&mac, channel) {
                        warn!("Failed to register peer {}: {}", MacDisplay(&mac), e);
                    }
                }
                info!("Loaded {} peers", peers.len());
                self.link = Link::Server(ServerPairing::with_peers(peers));
            }
        }

        self.refresh_ambient(now_ms);
        sink.emit(&AppEvent::Started {
            role: self.config.role,
            channel_count: self.config.channel_count,
        });
        info!(
            "AppService started: {:?}, {} channels, MIDI channel {}",
            self.config.role, self.config.channel_count, self.state.midi_channel
        );
    }

    /// Switch into update mode (boot window trigger fired).
    pub fn enter_update_mode(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        self.state.update_mode = true;
        self.refresh_ambient(now_ms);
        sink.emit(&AppEvent::UpdateModeRequested);
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// Run one loop iteration.
    ///
    /// `hw` satisfies both [`InputPort`] and [`OutputPort`] so buttons and
    /// relays can share one adapter without a double mutable borrow.
    pub fn poll(
        &mut self,
        now_ms: u32,
        hw: &mut (impl InputPort + OutputPort),
        radio: &mut impl TransportPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        // 1. Buttons
        if self.state.buttons_enabled {
            for index in 0..self.buttons.len() {
                let Some(pin) = self.buttons.pin(index) else {
                    continue;
                };
                let level = hw.read_pin(pin);
                match self.buttons.poll(index, level, now_ms) {
                    Ok(Some(transition)) => self.on_transition(index, transition, now_ms, hw, radio, store, sink),
                    Ok(None) => {}
                    Err(e) => warn!("Button poll failed: {}", e),
                }
            }
        }

        // 2. LED
        self.refresh_led(now_ms, hw);

        // 3. Background timers
        self.background(now_ms, radio, store, sink);

        // 4. Inbound radio frames
        events::drain_frames(|frame| self.on_frame(frame, now_ms, hw, radio, store, sink));
    }

    /// Advance the LED engine and write the duty.
    pub fn refresh_led(&mut self, now_ms: u32, hw: &mut impl OutputPort) {
        let duty = self.state.led.tick(now_ms);
        hw.set_led_duty(duty);
    }

    // ── Buttons ───────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn on_transition(
        &mut self,
        index: usize,
        transition: Transition,
        now_ms: u32,
        hw: &mut impl OutputPort,
        radio: &mut impl TransportPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let primary = index == self.config.primary_button();
        match transition {
            Transition::Pressed => {
                if primary {
                    self.on_primary_pressed(index, now_ms, sink);
                }
            }
            Transition::HeldFor(held_ms) => {
                if primary {
                    self.track_milestones(held_ms, now_ms, sink);
                }
            }
            Transition::Released(held_ms) => {
                let binding = self.config.buttons.get(index).copied();
                let mode = &self.state.mode;
                let input = ReleaseInput {
                    primary,
                    held_ms,
                    guarded: self.buttons.take_guard(index),
                    select_active: mode.select.is_active(),
                    learn_armed: mode.learn.is_armed(),
                    learn_just_timed_out: mode.learn_just_timed_out,
                    in_cooldown: mode.learn.in_cooldown(now_ms, self.config.learn_cooldown_ms),
                    learn_target: binding.and_then(|b| b.learn_target),
                };
                let decision = gesture::decide_release(&input, &self.config.timings);
                debug!("Button {} released after {} ms: {:?}", index, held_ms, decision);

                self.apply_release(decision, index, now_ms, hw, radio, store, sink);

                self.state.mode.learn_just_timed_out = false;
                if primary {
                    self.state.mode.reset_milestones();
                }
            }
        }
    }

    fn on_primary_pressed(&mut self, index: usize, now_ms: u32, sink: &mut impl EventSink) {
        let single = self.state.is_single_channel();
        let channel_count = self.state.channel_count;
        let mode = &mut self.state.mode;
        mode.reset_milestones();
        mode.learn_just_timed_out = false;

        // While learn waits for a target, the primary button picks it.
        if mode.learn.is_armed() && !single {
            if let Some(target) = mode.learn.cycle_target(channel_count, now_ms) {
                info!("MIDI learn target: channel {}", target + 1);
                self.buttons.guard_release(index);
                self.state.led.set_pattern(LedPattern::SingleFlash, now_ms);
                sink.emit(&AppEvent::LearnTargetSelected(target));
            }
        }
    }

    fn track_milestones(&mut self, held_ms: u32, now_ms: u32, sink: &mut impl EventSink) {
        let fired = &mut self.state.mode.milestones_fired;
        if let Some(m) = gesture::next_milestone(&self.config.milestones, fired, held_ms) {
            debug!("Hold milestone {} ms reached", m.held_ms);
            self.state.led.set_pattern(m.pattern, now_ms);
            sink.emit(&AppEvent::MilestoneReached { held_ms: m.held_ms });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_release(
        &mut self,
        decision: ReleaseDecision,
        index: usize,
        now_ms: u32,
        hw: &mut impl OutputPort,
        radio: &mut impl TransportPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        match decision {
            ReleaseDecision::Suppressed | ReleaseDecision::FeedbackOnly => self.settle_led(now_ms),
            ReleaseDecision::ChannelSelectIncrement => {
                let channel = self.state.mode.select.increment(now_ms);
                info!("Channel select: {}", channel);
                self.state.led.set_pattern(LedPattern::SingleFlash, now_ms);
                sink.emit(&AppEvent::ChannelSelectAdvanced { channel });
            }
            ReleaseDecision::TriggerPairing => self.start_pairing(now_ms, store, sink),
            ReleaseDecision::EnterChannelSelect => {
                let select = &mut self.state.mode.select;
                select.enter(self.state.midi_channel, now_ms);
                let channel = select.temp_channel();
                info!("Channel select mode, starting at {}", channel);
                self.state.led.set_pattern(LedPattern::Fade, now_ms);
                sink.emit(&AppEvent::ChannelSelectEntered { channel });
            }
            ReleaseDecision::ArmLearn => {
                let target = self.state.mode.learn.arm(self.state.channel_count, now_ms);
                match target {
                    Some(t) => info!("MIDI learn armed for channel {}", t + 1),
                    None => info!("MIDI learn armed, press a button to pick the channel"),
                }
                self.state.led.set_pattern(LedPattern::FastBlink, now_ms);
                sink.emit(&AppEvent::LearnArmed { target });
            }
            ReleaseDecision::ShortPress => self.short_press(index, now_ms, hw, radio, sink),
            ReleaseDecision::LearnTargetSelect(slot) => {
                match self.state.mode.learn.select_target(slot, self.state.channel_count, now_ms) {
                    Ok(()) => {
                        info!("MIDI learn target: channel {}", slot + 1);
                        self.state.led.set_pattern(LedPattern::SingleFlash, now_ms);
                        sink.emit(&AppEvent::LearnTargetSelected(slot));
                    }
                    Err(e) => warn!("Learn target rejected: {}", e),
                }
            }
            ReleaseDecision::Blocked(reason) => {
                debug!("Button {} release ignored: {:?}", index, reason);
                self.settle_led(now_ms);
            }
        }
    }

    /// A hold's milestone pattern ends with the hold unless a sub-mode owns the LED.
    fn settle_led(&mut self, now_ms: u32) {
        let mode = &self.state.mode;
        if mode.select.is_active() || mode.learn.is_armed() {
            return;
        }
        let pattern = self.state.led.pattern();
        if pattern != LedPattern::Off && !pattern.is_finite() {
            self.state.led.set_pattern(LedPattern::Off, now_ms);
        }
    }

    fn short_press(
        &mut self,
        index: usize,
        now_ms: u32,
        hw: &mut impl OutputPort,
        radio: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) {
        let Some(binding) = self.config.buttons.get(index).copied() else {
            return;
        };
        let before = self.state.active_channel;
        match binding.short_press {
            ShortPressAction::SelectChannel(channel) => {
                match dispatcher::select_or_toggle(&mut self.state, hw, channel) {
                    Ok(engaged) => {
                        info!("Button {}: channel {}", index, engaged);
                        self.state.led.set_pattern(LedPattern::SingleFlash, now_ms);
                    }
                    Err(e) => warn!("Button {}: {}", index, e),
                }
            }
            ShortPressAction::SendProgram(program) => {
                self.send_program(program, now_ms, radio, sink);
                self.state.led.set_pattern(LedPattern::SingleFlash, now_ms);
            }
            ShortPressAction::AllOff => {
                if let Err(e) = dispatcher::set_channel(&mut self.state, hw, 0) {
                    warn!("Button {}: {}", index, e);
                }
                self.state.led.set_pattern(LedPattern::DoubleFlash, now_ms);
            }
            ShortPressAction::Feedback => self.state.led.set_pattern(LedPattern::SingleFlash, now_ms),
        }
        self.note_channel_change(before, sink);
    }

    // ── Background ────────────────────────────────────────────

    fn background(
        &mut self,
        now_ms: u32,
        radio: &mut impl TransportPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let mode = &mut self.state.mode;

        if mode.learn.tick(now_ms, self.config.learn_timeout_ms) {
            info!("MIDI learn timed out");
            mode.learn_just_timed_out = true;
            self.buttons.guard_all();
            self.state.led.set_pattern(LedPattern::Off, now_ms);
            sink.emit(&AppEvent::LearnTimedOut);
        }

        if let Some(channel) = mode.select.tick(now_ms, self.config.select_inactivity_ms) {
            self.state.midi_channel = channel;
            if let Err(e) = settings::save_midi_channel(store, channel) {
                warn!("Failed to save MIDI channel: {}", e);
            }
            info!("MIDI receive channel set to {}", channel);
            sink.emit(&AppEvent::MidiChannelSaved { channel });
        }
        if let Some(pattern) = self.state.mode.select.confirm_tick(now_ms, self.config.confirm_toggle_ms) {
            self.state.led.set_pattern(pattern, now_ms);
        }

        match &mut self.link {
            Link::Client(pairing) => {
                if let Err(e) = pairing.tick(now_ms, self.config.discovery_retry_ms, radio, &self.device_name) {
                    warn!("Pairing request failed: {}", e);
                }
            }
            Link::Server(server) => {
                if server.tick(now_ms, self.config.pairing_window_ms) {
                    sink.emit(&AppEvent::PairingWindowClosed);
                }
            }
        }

        self.refresh_ambient(now_ms);
    }

    fn refresh_ambient(&mut self, now_ms: u32) {
        let pairing = match &self.link {
            Link::Client(c) => c.is_pairing(),
            Link::Server(s) => s.is_window_open(),
        };
        self.state.led.set_ambient(pairing, self.state.update_mode, now_ms);
    }

    fn start_pairing(&mut self, now_ms: u32, store: &mut impl StoragePort, sink: &mut impl EventSink) {
        match &mut self.link {
            Link::Client(pairing) => {
                pairing.trigger();
                if let Err(e) = settings::clear_pairing(store) {
                    warn!("Failed to clear saved pairing: {}", e);
                }
            }
            Link::Server(server) => server.open_window(now_ms),
        }
        self.refresh_ambient(now_ms);
        sink.emit(&AppEvent::PairingStarted);
    }

    // ── Inbound radio ─────────────────────────────────────────

    fn on_frame(
        &mut self,
        frame: Frame,
        now_ms: u32,
        hw: &mut impl OutputPort,
        radio: &mut impl TransportPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let message = match Message::decode(frame.payload()) {
            Ok(m) => m,
            Err(e) => {
                warn!("Dropping frame from {}: {}", MacDisplay(&frame.src), e);
                return;
            }
        };

        match message {
            Message::Command { command_type, value, sequence, .. } => {
                let trusted = match &self.link {
                    Link::Client(c) => c.accepts_commands_from(&frame.src),
                    Link::Server(s) => s.peers.contains(&frame.src),
                };
                if !trusted {
                    warn!("Command from unknown peer {} rejected", MacDisplay(&frame.src));
                    return;
                }
                debug!("Command #{} type {} value {}", sequence, command_type, value);
                self.remote_command(command_type, value, now_ms, hw, sink);
            }
            Message::PairingResponse { mac, channel } => self.on_pairing_response(mac, channel, radio, store, sink),
            Message::PairingRequest { mac, name, .. } => self.on_pairing_request(mac, &name, radio, store, sink),
        }
    }

    fn remote_command(
        &mut self,
        command_type: u8,
        value: u8,
        now_ms: u32,
        hw: &mut impl OutputPort,
        sink: &mut impl EventSink,
    ) {
        if self.state.mode.learn.in_cooldown(now_ms, self.config.learn_cooldown_ms) {
            debug!("Remote command ignored inside learn cooldown");
            return;
        }
        let before = self.state.active_channel;
        if let Err(e) = dispatcher::dispatch_remote(&mut self.state, hw, command_type, value, now_ms) {
            warn!("Remote command rejected: {}", e);
        }
        self.note_channel_change(before, sink);
    }

    fn on_pairing_response(
        &mut self,
        server: MacAddr,
        channel: u8,
        radio: &mut impl TransportPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let Link::Client(pairing) = &mut self.link else {
            debug!("Pairing response ignored on the hub");
            return;
        };
        match pairing.on_response(server, channel, radio) {
            Ok(true) => {
                if let Err(e) = settings::save_pairing(store, &server, channel) {
                    warn!("Failed to save pairing: {}", e);
                }
                sink.emit(&AppEvent::Paired { server, radio_channel: channel });
            }
            Ok(false) => {}
            Err(e) => warn!("Pairing response could not be applied: {}", e),
        }
    }

    fn on_pairing_request(
        &mut self,
        mac: MacAddr,
        name: &str,
        radio: &mut impl TransportPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let Link::Server(server) = &mut self.link else {
            debug!("Pairing request ignored on a client");
            return;
        };
        if let Err(e) = server.on_request(mac, name) {
            debug!("Pairing request from {} not accepted: {}", MacDisplay(&mac), e);
            return;
        }

        let channel = self.config.radio_channel;
        if let Err(e) = radio.add_peer(&mac, channel) {
            warn!("Failed to register peer {}: {}", MacDisplay(&mac), e);
        }
        if let Err(e) = settings::save_peers(store, &server.peers) {
            warn!("Failed to save peers: {}", e);
        }
        let response = Message::PairingResponse {
            mac: radio.local_mac(),
            channel,
        };
        if let Err(e) = radio.send(&mac, &response) {
            warn!("Pairing response to {} failed: {}", MacDisplay(&mac), e);
        }
        sink.emit(&AppEvent::PeerAdded {
            mac,
            count: server.peers.len(),
        });
    }

    // ── MIDI ──────────────────────────────────────────────────

    /// Handle a Program Change from the DIN input.
    ///
    /// Learn gets the first look. Outside learn and its cooldown the hub
    /// forwards the program to every peer, then both roles map it onto
    /// their own relays.
    pub fn on_program_change(
        &mut self,
        pc: ProgramChange,
        now_ms: u32,
        hw: &mut impl OutputPort,
        radio: &mut impl TransportPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let pc = match midi_learn::validate(pc) {
            Ok(pc) => pc,
            Err(e) => {
                warn!("MIDI: {}", e);
                return;
            }
        };
        if !midi_learn::accepts(self.state.midi_channel, pc.channel) {
            debug!("MIDI: Program {} on channel {} filtered", pc.program, pc.channel);
            return;
        }

        match self.state.mode.learn.on_program_change(pc.program, now_ms) {
            LearnOutcome::Committed { slot, program } => {
                if let Some(entry) = self.state.mapping.get_mut(slot as usize) {
                    *entry = program;
                }
                if let Err(e) = settings::save_mapping(store, &self.state.mapping) {
                    warn!("Failed to save MIDI map: {}", e);
                }
                info!("MIDI learn: channel {} -> Program {}", slot + 1, program);
                self.state.led.set_pattern(LedPattern::SingleFlash, now_ms);
                sink.emit(&AppEvent::LearnCommitted { slot, program });
                return;
            }
            LearnOutcome::AwaitingTarget => {
                debug!("MIDI learn: no target yet, Program {} dropped", pc.program);
                return;
            }
            LearnOutcome::NotArmed => {}
        }

        if self.state.mode.learn.in_cooldown(now_ms, self.config.learn_cooldown_ms) {
            debug!("MIDI: Program {} ignored inside learn cooldown", pc.program);
            return;
        }

        if self.config.role == Role::Server {
            self.send_program(pc.program, now_ms, radio, sink);
        }

        let before = self.state.active_channel;
        if let Err(e) = dispatcher::dispatch_program(&mut self.state, hw, pc.program, ProgramSource::Midi, now_ms) {
            warn!("MIDI: {}", e);
        }
        self.note_channel_change(before, sink);
    }

    fn send_program(&mut self, program: u8, now_ms: u32, radio: &mut impl TransportPort, sink: &mut impl EventSink) {
        let peers: Vec<MacAddr, MAX_PEERS> = match &self.link {
            Link::Server(s) => s.peers.macs().collect(),
            Link::Client(_) => Vec::new(),
        };
        self.sequence = self.sequence.wrapping_add(1);
        let sent = dispatcher::broadcast_program(radio, &peers, program, self.sequence, now_ms);
        sink.emit(&AppEvent::ProgramForwarded { program, peers: sent });
    }

    // ── Command handling ──────────────────────────────────────

    /// Execute a console command.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u32,
        hw: &mut impl OutputPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        match cmd {
            AppCommand::Help => HELP.lines().for_each(|line| info!("{}", line)),
            AppCommand::Status => self.log_status(),
            AppCommand::Pair => self.start_pairing(now_ms, store, sink),
            AppCommand::AllOff => return self.handle_command(AppCommand::SelectChannel(0), now_ms, hw, store, sink),
            AppCommand::SelectChannel(channel) => {
                let before = self.state.active_channel;
                match dispatcher::set_channel(&mut self.state, hw, channel) {
                    Ok(()) => info!("Channel {}", channel),
                    Err(e) => warn!("{}", e),
                }
                self.note_channel_change(before, sink);
            }
            AppCommand::SetLogLevel(level) => {
                log::set_max_level(settings::level_filter(level));
                if let Err(e) = settings::save_log_level(store, level) {
                    warn!("Failed to save log level: {}", e);
                }
                info!("Log level {}", level);
            }
            AppCommand::SetMidiChannel(channel) => {
                self.state.midi_channel = channel;
                if let Err(e) = settings::save_midi_channel(store, channel) {
                    warn!("Failed to save MIDI channel: {}", e);
                }
                info!("MIDI receive channel {}", channel);
            }
            AppCommand::ShowMapping => {
                for (i, program) in self.state.mapping.iter().enumerate() {
                    info!("Channel {} <- Program {}", i + 1, program);
                }
            }
            AppCommand::SetMapping { channel, program } => {
                match self.state.mapping.get_mut(channel.wrapping_sub(1) as usize) {
                    Some(entry) => {
                        *entry = program;
                        if let Err(e) = settings::save_mapping(store, &self.state.mapping) {
                            warn!("Failed to save MIDI map: {}", e);
                        }
                    }
                    None => warn!("Channel {} out of range (max: {})", channel, self.state.channel_count),
                }
            }
            AppCommand::SetButtonsEnabled(enabled) => {
                self.state.buttons_enabled = enabled;
                info!("Button checking {}", if enabled { "enabled" } else { "disabled" });
            }
            AppCommand::ShowConfig => match serde_json::to_string(&self.config) {
                Ok(json) => info!("{}", json),
                Err(e) => warn!("Config serialization failed: {}", e),
            },
            AppCommand::ClearPairing => {
                let cleared = match &mut self.link {
                    Link::Client(pairing) => {
                        pairing.clear();
                        settings::clear_pairing(store)
                    }
                    Link::Server(server) => {
                        server.peers.clear();
                        settings::clear_peers(store)
                    }
                };
                if let Err(e) = cleared {
                    warn!("Failed to clear pairing: {}", e);
                }
                self.refresh_ambient(now_ms);
            }
            AppCommand::Restart => return CommandOutcome::Restart,
            AppCommand::EnterUpdateMode => warn!("'ota' is only accepted during the boot window"),
        }
        CommandOutcome::Done
    }

    fn log_status(&self) {
        info!("Role: {:?}, name: {}", self.config.role, self.device_name);
        info!("Active channel: {} of {}", self.state.active_channel, self.state.channel_count);
        info!("MIDI receive channel: {}", self.state.midi_channel);
        info!("Mapping: {:?}", self.state.mapping.as_slice());
        info!(
            "Learn: {:?}, channel select: {}",
            self.state.mode.learn.state(),
            self.state.mode.select.is_active()
        );
        match &self.link {
            Link::Client(c) => info!("Pairing: {:?}, server {} on channel {}", c.status(), MacDisplay(&c.server()), c.radio_channel()),
            Link::Server(s) => {
                info!("Pairing window open: {}, {} peers", s.is_window_open(), s.peers.len());
                for peer in s.peers.iter() {
                    info!("  {} {}", MacDisplay(&peer.mac), peer.name);
                }
            }
        }
        info!("Buttons enabled: {}, dropped frames: {}", self.state.buttons_enabled, events::dropped_frames());
    }

    fn note_channel_change(&self, before: u8, sink: &mut impl EventSink) {
        let to = self.state.active_channel;
        if to != before {
            sink.emit(&AppEvent::ChannelChanged { from: before, to });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Client discovery status; `None` on the hub.
    pub fn pairing_status(&self) -> Option<PairingStatus> {
        match &self.link {
            Link::Client(c) => Some(c.status()),
            Link::Server(_) => None,
        }
    }

    pub fn peer_count(&self) -> usize {
        match &self.link {
            Link::Server(s) => s.peers.len(),
            Link::Client(_) => 0,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}
