//! Serial console line parser.
//!
//! Turns one line of text into an [`AppCommand`]. Parsing is pure; the
//! service executes the command. Arguments are range-checked here so the
//! service only ever sees values it can apply.

use crate::app::commands::AppCommand;
use crate::config::MAX_MIDI_CHANNEL;
use crate::settings::MAX_LOG_LEVEL;

/// Why a console line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownCommand,
    MissingArgument(&'static str),
    BadArgument(&'static str),
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::UnknownCommand => write!(f, "unknown command (try 'help')"),
            Self::MissingArgument(usage) => write!(f, "missing argument, usage: {}", usage),
            Self::BadArgument(usage) => write!(f, "bad argument, usage: {}", usage),
        }
    }
}

pub const HELP: &str = "\
help                 this text
status               channel, mapping, pairing, loop timing
pair                 start pairing
off                  all relays off
ch <n>               select relay channel (0 = off)
setlog <0-4>         log level (0 off .. 4 debug)
midich <0-16>        MIDI receive channel (0 = omni)
map                  show learned mapping
map <ch> <program>   set mapping for a channel
buttons on|off       enable/disable button polling
config               dump configuration as JSON
clearpairing         forget pairing
restart              reboot
ota                  enter update mode (boot window only)";

/// Parse one console line. Case-insensitive command word.
pub fn parse(line: &str) -> Result<AppCommand, ParseError> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Err(ParseError::Empty);
    };
    let cmd = cmd.to_ascii_lowercase();

    let parsed = match cmd.as_str() {
        "help" | "?" => AppCommand::Help,
        "status" => AppCommand::Status,
        "pair" => AppCommand::Pair,
        "off" => AppCommand::AllOff,
        "ch" => AppCommand::SelectChannel(number(words.next(), "ch <n>", u8::MAX)?),
        "setlog" => AppCommand::SetLogLevel(number(words.next(), "setlog <0-4>", MAX_LOG_LEVEL)?),
        "midich" => AppCommand::SetMidiChannel(number(words.next(), "midich <0-16>", MAX_MIDI_CHANNEL)?),
        "map" => match words.next() {
            None => AppCommand::ShowMapping,
            Some(ch) => {
                const USAGE: &str = "map <ch> <program>";
                let channel = number(Some(ch), USAGE, u8::MAX)?;
                if channel == 0 {
                    return Err(ParseError::BadArgument(USAGE));
                }
                let program = number(words.next(), USAGE, 127)?;
                AppCommand::SetMapping { channel, program }
            }
        },
        "buttons" => match words.next().map(str::to_ascii_lowercase).as_deref() {
            Some("on") => AppCommand::SetButtonsEnabled(true),
            Some("off") => AppCommand::SetButtonsEnabled(false),
            Some(_) => return Err(ParseError::BadArgument("buttons on|off")),
            None => return Err(ParseError::MissingArgument("buttons on|off")),
        },
        "config" => AppCommand::ShowConfig,
        "clearpairing" => AppCommand::ClearPairing,
        "restart" | "reboot" => AppCommand::Restart,
        "ota" => AppCommand::EnterUpdateMode,
        _ => return Err(ParseError::UnknownCommand),
    };
    Ok(parsed)
}

fn number(word: Option<&str>, usage: &'static str, max: u8) -> Result<u8, ParseError> {
    let word = word.ok_or(ParseError::MissingArgument(usage))?;
    match word.parse::<u8>() {
        Ok(n) if n <= max => Ok(n),
        _ => Err(ParseError::BadArgument(usage)),
    }
}
