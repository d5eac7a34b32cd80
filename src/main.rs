//! AmpSwitch firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   EspNowTransport  NvsAdapter   LogEventSink  │
//! │  (Input+Output)    (Transport)      (Config+KV)  (EventSink)   │
//! │  MidiInput         SerialConsole    Clock        LoopWatchdog  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  gestures · channel select · learn · pairing · relays  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One cooperative loop: poll the service, feed it MIDI and console input,
//! record loop timing, yield one tick.

use anyhow::{anyhow, Result};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use heapless::Vec;
use log::{info, warn};

use ampswitch::adapters::device_id;
use ampswitch::adapters::espnow::EspNowTransport;
use ampswitch::adapters::hardware::HardwareAdapter;
use ampswitch::adapters::log_sink::LogEventSink;
use ampswitch::adapters::nvs::NvsAdapter;
use ampswitch::adapters::serial::SerialConsole;
use ampswitch::adapters::time::Clock;
use ampswitch::app::commands::{AppCommand, CommandOutcome};
use ampswitch::app::ports::{ConfigPort, InputPort};
use ampswitch::app::service::AppService;
use ampswitch::boot::{self, BootWindow};
use ampswitch::config::DeviceConfig;
use ampswitch::console;
use ampswitch::diagnostics::{HeapStats, LoopMetrics};
use ampswitch::drivers::button::Level;
use ampswitch::drivers::midi::{MidiInput, ProgramChange};
use ampswitch::drivers::watchdog::{LoopWatchdog, WATCHDOG_TIMEOUT_MS};
use ampswitch::drivers::hw_init;
use ampswitch::settings;

/// Pause between loop iterations. One FreeRTOS tick keeps the idle task fed.
const LOOP_DELAY_MS: u32 = 1;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AmpSwitch v{:<25}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Storage and configuration ──────────────────────────
    let mut nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {}", e))?;
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("No usable stored config ({}), using build profile", e);
            let cfg = DeviceConfig::build_profile();
            if let Err(e) = nvs.save(&cfg) {
                warn!("Failed to store config: {}", e);
            }
            cfg
        }
    };
    log::set_max_level(settings::level_filter(settings::load_log_level(&mut nvs)));

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals(&config).map_err(|e| anyhow!("HAL init failed: {}", e))?;
    let mut hw = HardwareAdapter::new(&config);
    let watchdog = LoopWatchdog::subscribe(WATCHDOG_TIMEOUT_MS);
    let clock = Clock::new();
    let mut console_in = SerialConsole::new();

    // ── 4. Boot update window ─────────────────────────────────
    let primary_gpio = config.buttons[config.primary_button()].gpio;
    let mut window = BootWindow::new(
        clock.now_ms(),
        config.boot_update_window_ms,
        config.boot_update_hold_ms,
    );
    let update_trigger = boot::run_window(
        &mut window,
        || clock.now_ms(),
        || {
            let button_down = hw.read_pin(primary_gpio) == Level::Low;
            let console_ota = matches!(
                console_in.poll_line().map(|line| console::parse(&line)),
                Some(Ok(AppCommand::EnterUpdateMode))
            );
            (button_down, console_ota)
        },
        |_| {
            watchdog.feed();
            FreeRtos::delay_ms(10);
        },
    );

    // ── 5. Radio and identity ─────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let mac = device_id::read_mac();
    let name = device_id::device_name(&mac);
    info!("Device: {} ({:?})", name, config.role);
    let mut radio = EspNowTransport::new(peripherals.modem, sysloop, mac)?;

    let mut sink = LogEventSink::new();
    let mut service = AppService::new(config, &name);

    if update_trigger.is_some() {
        run_update_mode(&mut service, &mut hw, &clock, &watchdog, &mut sink);
    }

    service.start(clock.now_ms(), &mut radio, &mut nvs, &mut sink);

    // ── 6. Poll loop ──────────────────────────────────────────
    let mut midi = MidiInput::new();
    let mut metrics = LoopMetrics::new();
    info!("System ready. Entering poll loop.");

    loop {
        let started_us = clock.uptime_us();
        let now = clock.now_ms();

        service.poll(now, &mut hw, &mut radio, &mut nvs, &mut sink);

        let mut pending: Vec<ProgramChange, 16> = Vec::new();
        midi.poll(|pc| {
            if pending.push(pc).is_err() {
                warn!("MIDI: backlog full, Program {} dropped", pc.program);
            }
        });
        for pc in pending {
            service.on_program_change(pc, now, &mut hw, &mut radio, &mut nvs, &mut sink);
        }

        if let Some(line) = console_in.poll_line() {
            match console::parse(&line) {
                Ok(cmd) => {
                    if cmd == AppCommand::Status {
                        metrics.take().log();
                        HeapStats::collect().log();
                    }
                    if service.handle_command(cmd, now, &mut hw, &mut nvs, &mut sink) == CommandOutcome::Restart {
                        info!("Restarting");
                        hw.all_off();
                        esp_idf_svc::hal::reset::restart();
                    }
                }
                Err(e) => warn!("'{}': {}", line.as_str(), e),
            }
        }

        watchdog.feed();
        metrics.record(clock.uptime_us().wrapping_sub(started_us) as u32);
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}

/// Show the update pattern until the update window lapses, then reboot.
///
/// Image transfer is handled by the bootloader tooling over the same
/// serial port; the firmware only holds the board idle with relays off.
fn run_update_mode(
    service: &mut AppService,
    hw: &mut HardwareAdapter,
    clock: &Clock,
    watchdog: &LoopWatchdog,
    sink: &mut LogEventSink,
) -> ! {
    hw.all_off();
    let entered = clock.now_ms();
    service.enter_update_mode(entered, sink);
    info!("Update mode for {} s", boot::UPDATE_MODE_TIMEOUT_MS / 1_000);
    while clock.now_ms().wrapping_sub(entered) < boot::UPDATE_MODE_TIMEOUT_MS {
        service.refresh_led(clock.now_ms(), hw);
        watchdog.feed();
        FreeRtos::delay_ms(10);
    }
    info!("Update mode timed out, restarting");
    esp_idf_svc::hal::reset::restart();
}
