//! One-shot hardware peripheral initialization.
//!
//! Configures button inputs, relay outputs, the status LED LEDC channel and
//! the MIDI UART from a [`DeviceConfig`] using raw ESP-IDF sys calls.
//! Called once from `main()` before the poll loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::config::DeviceConfig;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    UartInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc)   => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::UartInitFailed(rc)   => write!(f, "MIDI UART init failed (rc={})", rc),
        }
    }
}

/// LEDC channel driving the status LED.
pub const LEDC_CH_STATUS: u32 = 0;

#[cfg(target_os = "espidf")]
pub fn init_peripherals(config: &DeviceConfig) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the poll loop; single-threaded.
    unsafe {
        init_gpio_inputs(config)?;
        init_gpio_outputs(config)?;
        init_ledc(config)?;
        if let Some(rx) = config.midi_rx_gpio {
            init_midi_uart(rx)?;
        }
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(config: &DeviceConfig) -> Result<(), HwInitError> {
    log::info!(
        "hw_init(sim): peripheral init skipped ({} buttons, {} relays)",
        config.buttons.len(),
        config.relay_gpios.len()
    );
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs(config: &DeviceConfig) -> Result<(), HwInitError> {
    for button in &config.buttons {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << button.gpio,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    info!("hw_init: {} button inputs configured", config.buttons.len());
    Ok(())
}

/// Raw pin level, `true` = HIGH (released for active-low buttons).
#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs(config: &DeviceConfig) -> Result<(), HwInitError> {
    for &pin in &config.relay_gpios {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: {} relay outputs configured (all off)", config.relay_gpios.len());
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was configured during init_gpio_outputs(). Main-loop only.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc(config: &DeviceConfig) -> Result<(), HwInitError> {
    // Timer 0: status LED (5 kHz, 13-bit)
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_13_BIT,
        freq_hz: pins::STATUS_LED_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer0) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: LEDC_CH_STATUS,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        gpio_num: config.status_led_gpio,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    }) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    info!("hw_init: LEDC configured (status LED on GPIO{})", config.status_led_gpio);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u32) {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free since only the main loop calls this function.
    unsafe {
        esp_idf_svc::sys::ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
        esp_idf_svc::sys::ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u32) {}

// ── MIDI UART ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const MIDI_RX_BUFFER: i32 = 256;

#[cfg(target_os = "espidf")]
unsafe fn init_midi_uart(rx_gpio: i32) -> Result<(), HwInitError> {
    let cfg = uart_config_t {
        baud_rate: pins::MIDI_BAUD_RATE as i32,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };
    let ret = unsafe { uart_param_config(pins::MIDI_UART_PORT, &cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }

    let ret = unsafe { uart_set_pin(pins::MIDI_UART_PORT, -1, rx_gpio, -1, -1) };
    if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }

    let ret = unsafe {
        uart_driver_install(pins::MIDI_UART_PORT, MIDI_RX_BUFFER, 0, 0, core::ptr::null_mut(), 0)
    };
    if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }

    info!("hw_init: MIDI UART{} on GPIO{} @ {} baud", pins::MIDI_UART_PORT, rx_gpio, pins::MIDI_BAUD_RATE);
    Ok(())
}

/// Drain whatever MIDI bytes are buffered without blocking.
#[cfg(target_os = "espidf")]
pub fn midi_uart_read(buf: &mut [u8]) -> usize {
    // SAFETY: the UART driver was installed in init_midi_uart(); zero
    // ticks to wait makes this a non-blocking buffer copy.
    let n = unsafe {
        uart_read_bytes(pins::MIDI_UART_PORT, buf.as_mut_ptr().cast(), buf.len() as u32, 0)
    };
    n.max(0) as usize
}

#[cfg(not(target_os = "espidf"))]
pub fn midi_uart_read(_buf: &mut [u8]) -> usize {
    0
}
