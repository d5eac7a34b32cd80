//! Status LED pattern engine.
//!
//! Generates a time-varying PWM duty for the single status LED. The poll
//! loop calls `tick(now_ms)` every iteration and feeds the returned duty to
//! `StatusLed::set_duty()`. Every pattern is driven by `now - started_ms`
//! and a step counter, so the engine never sleeps.
//!
//! ## Ambient overrides (highest first)
//!
//! 1. **Pairing in progress**: continuous fade
//! 2. **Update mode armed**: fast blink
//!
//! While an override is active, `set_pattern()` requests are replaced by the
//! override pattern. When the override clears, the LED returns to `Off`.
//!
//! ## Pattern types
//!
//! | Pattern      | Shape                          | Ends    |
//! |--------------|--------------------------------|---------|
//! | SingleFlash  | 80 ms on, 120 ms off           | → Off   |
//! | DoubleFlash  | 4 × 60 ms steps                | → Off   |
//! | TripleFlash  | 6 × 50 ms steps                | → Off   |
//! | QuadFlash    | 8 × 50 ms steps                | → Off   |
//! | PentaFlash   | 10 × 50 ms steps               | → Off   |
//! | HexaFlash    | 12 × 50 ms steps               | → Off   |
//! | FastBlink    | 100 ms on / 100 ms off         | never   |
//! | Fade         | triangle ramp, ~2 s up + down  | never   |

use serde::{Deserialize, Serialize};

/// Full-scale duty for the 13-bit LEDC channel.
pub const MAX_DUTY: u16 = 8191;

const SINGLE_FLASH_ON_MS: u32 = 80;
const SINGLE_FLASH_OFF_MS: u32 = 120;
const FAST_BLINK_HALF_MS: u32 = 100;
const FADE_TICK_MS: u32 = 20;
const FADE_HALF_PERIOD_MS: u32 = 1000;
const FADE_STEP: u16 = MAX_DUTY / (FADE_HALF_PERIOD_MS / FADE_TICK_MS) as u16;

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedPattern {
    Off,
    SingleFlash,
    DoubleFlash,
    TripleFlash,
    QuadFlash,
    PentaFlash,
    HexaFlash,
    FastBlink,
    Fade,
}

impl LedPattern {
    /// Finite patterns return to `Off` on their own.
    pub fn is_finite(self) -> bool {
        !matches!(self, Self::Off | Self::FastBlink | Self::Fade)
    }

    /// `(step count, step duration)` for the counted on/off flash trains.
    fn flash_train(self) -> Option<(u8, u32)> {
        match self {
            Self::DoubleFlash => Some((4, 60)),
            Self::TripleFlash => Some((6, 50)),
            Self::QuadFlash => Some((8, 50)),
            Self::PentaFlash => Some((10, 50)),
            Self::HexaFlash => Some((12, 50)),
            _ => None,
        }
    }
}

/// LED pattern engine. Stack-allocated, no heap.
pub struct LedPatternEngine {
    pattern: LedPattern,
    started_ms: u32,
    step: u8,
    fade_duty: u16,
    fade_rising: bool,
    last_fade_ms: u32,
    pairing_active: bool,
    update_mode: bool,
    duty: u16,
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self {
            pattern: LedPattern::Off,
            started_ms: 0,
            step: 0,
            fade_duty: 0,
            fade_rising: true,
            last_fade_ms: 0,
            pairing_active: false,
            update_mode: false,
            duty: 0,
        }
    }

    /// Replace the active pattern, unless an ambient override owns the LED.
    pub fn set_pattern(&mut self, requested: LedPattern, now_ms: u32) {
        let pattern = match self.ambient_pattern() {
            Some(ambient) if self.pattern == ambient => return,
            Some(ambient) => ambient,
            None => requested,
        };
        self.start(pattern, now_ms);
    }

    /// Update the ambient conditions. Entering one switches the LED to its
    /// pattern immediately; leaving all of them turns the LED off.
    pub fn set_ambient(&mut self, pairing_active: bool, update_mode: bool, now_ms: u32) {
        let was_ambient = self.ambient_pattern().is_some();
        self.pairing_active = pairing_active;
        self.update_mode = update_mode;

        match self.ambient_pattern() {
            Some(ambient) if self.pattern != ambient => self.start(ambient, now_ms),
            Some(_) => {}
            None if was_ambient => self.start(LedPattern::Off, now_ms),
            None => {}
        }
    }

    /// Advance the active pattern by at most one step and return the duty.
    pub fn tick(&mut self, now_ms: u32) -> u16 {
        let elapsed = now_ms.wrapping_sub(self.started_ms);

        self.duty = match self.pattern {
            LedPattern::Off => 0,
            LedPattern::SingleFlash => {
                if self.step == 0 {
                    if elapsed > SINGLE_FLASH_ON_MS {
                        self.step = 1;
                        self.started_ms = now_ms;
                    }
                    MAX_DUTY
                } else {
                    if elapsed > SINGLE_FLASH_OFF_MS {
                        self.pattern = LedPattern::Off;
                    }
                    0
                }
            }
            LedPattern::FastBlink => {
                if (elapsed / FAST_BLINK_HALF_MS) % 2 == 0 {
                    MAX_DUTY
                } else {
                    0
                }
            }
            LedPattern::Fade => {
                if now_ms.wrapping_sub(self.last_fade_ms) >= FADE_TICK_MS {
                    self.advance_fade();
                    self.last_fade_ms = now_ms;
                }
                self.fade_duty
            }
            train => self.tick_flash_train(train, elapsed, now_ms),
        };

        self.duty
    }

    fn tick_flash_train(&mut self, train: LedPattern, elapsed: u32, now_ms: u32) -> u16 {
        let Some((steps, step_ms)) = train.flash_train() else {
            return 0;
        };
        if self.step >= steps {
            self.pattern = LedPattern::Off;
            return 0;
        }
        let duty = if self.step % 2 == 0 { MAX_DUTY } else { 0 };
        if elapsed > step_ms {
            self.step += 1;
            self.started_ms = now_ms;
        }
        duty
    }

    fn advance_fade(&mut self) {
        if self.fade_rising {
            self.fade_duty = self.fade_duty.saturating_add(FADE_STEP).min(MAX_DUTY);
            if self.fade_duty == MAX_DUTY {
                self.fade_rising = false;
            }
        } else {
            self.fade_duty = self.fade_duty.saturating_sub(FADE_STEP);
            if self.fade_duty == 0 {
                self.fade_rising = true;
            }
        }
    }

    fn start(&mut self, pattern: LedPattern, now_ms: u32) {
        self.pattern = pattern;
        self.started_ms = now_ms;
        self.step = 0;
        if pattern == LedPattern::Fade {
            self.fade_duty = 0;
            self.fade_rising = true;
            self.last_fade_ms = now_ms;
        }
    }

    fn ambient_pattern(&self) -> Option<LedPattern> {
        if self.pairing_active {
            Some(LedPattern::Fade)
        } else if self.update_mode {
            Some(LedPattern::FastBlink)
        } else {
            None
        }
    }

    pub fn pattern(&self) -> LedPattern {
        self.pattern
    }

    /// Duty returned by the last `tick()`.
    pub fn duty(&self) -> u16 {
        self.duty
    }
}
