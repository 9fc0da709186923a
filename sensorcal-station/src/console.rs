//! Line console
//!
//! One command per line, answered with one or more lines of text:
//!
//! | Command | Effect |
//! |---|---|
//! | `get <ch>` / `get wind` | latest published value |
//! | `status <ch>` | channel introspection |
//! | `wind` | pulse path counters |
//! | `calibrate <ch> <d0\|d1> <value>` | anchor from the live code |
//! | `set <ch> <d0\|d1> <code> <value>` | explicit anchor |
//! | `flash <ch>` | anchors as stored |
//! | `quit` | stop the station |

use std::fmt::Write as _;
use std::str::FromStr;

use sensorcal_core::{AdcReader, CalibrationStore, ChannelId, PointId, QuantityId};
use thiserror::Error;

use crate::station::Station;

/// Parsed console command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Latest value of a quantity
    Get(QuantityId),
    /// Channel status
    Status(ChannelId),
    /// Pulse path status
    Wind,
    /// Anchor from the live code
    Calibrate {
        /// Channel
        channel: ChannelId,
        /// Anchor
        point: PointId,
        /// Physical value at the current code
        value: f32,
    },
    /// Explicit anchor
    Set {
        /// Channel
        channel: ChannelId,
        /// Anchor
        point: PointId,
        /// Raw code
        code: u16,
        /// Physical value
        value: f32,
    },
    /// Stored anchors
    Flash(ChannelId),
    /// Stop
    Quit,
}

/// Unparseable console input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line
    #[error("empty command")]
    Empty,
    /// First word not a command
    #[error("unknown command `{0}`")]
    Unknown(String),
    /// Missing or malformed argument
    #[error("usage: {0}")]
    Usage(&'static str),
}

fn arg<T: FromStr>(word: Option<&str>, usage: &'static str) -> Result<T, CommandError> {
    word.and_then(|w| w.parse().ok()).ok_or(CommandError::Usage(usage))
}

fn point(word: Option<&str>, usage: &'static str) -> Result<PointId, CommandError> {
    word.and_then(PointId::parse).ok_or(CommandError::Usage(usage))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Empty);
        };

        let command = match verb {
            "get" => {
                const USAGE: &str = "get <channel>|wind";
                match words.next() {
                    Some("wind") => Command::Get(QuantityId::PulseRate),
                    other => Command::Get(QuantityId::Channel(arg(other, USAGE)?)),
                }
            }
            "status" => Command::Status(arg(words.next(), "status <channel>")?),
            "wind" => Command::Wind,
            "calibrate" => {
                const USAGE: &str = "calibrate <channel> <d0|d1> <value>";
                Command::Calibrate {
                    channel: arg(words.next(), USAGE)?,
                    point: point(words.next(), USAGE)?,
                    value: arg(words.next(), USAGE)?,
                }
            }
            "set" => {
                const USAGE: &str = "set <channel> <d0|d1> <code> <value>";
                Command::Set {
                    channel: arg(words.next(), USAGE)?,
                    point: point(words.next(), USAGE)?,
                    code: arg(words.next(), USAGE)?,
                    value: arg(words.next(), USAGE)?,
                }
            }
            "flash" => Command::Flash(arg(words.next(), "flash <channel>")?),
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_owned())),
        };
        Ok(command)
    }
}

/// Run `command` against `station` and render the answer
pub fn execute<A, S, const N: usize>(station: &Station<A, S, N>, command: Command) -> String
where
    A: AdcReader + Send + 'static,
    S: CalibrationStore + Send + 'static,
{
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = match command {
        Command::Get(id) => match station.read(id) {
            Ok(value) => write!(out, "{:.2}", value),
            Err(err) => write!(out, "error: {}", err),
        },
        Command::Status(channel) => match station.status(channel) {
            Ok(s) => write!(
                out,
                "ch{} {}\n  raw {:?} filtered {:?} value {:?}\n  ring {:?} @{}\n  band {:?} delta {}\n  points {:?} {:?} slope {}\n  errors {} contention {} suppressed {}",
                s.channel,
                s.state,
                s.last_raw,
                s.last_filtered,
                s.last_value,
                s.ring.slots(),
                s.ring.write_pos(),
                s.band,
                s.delta,
                s.working.point(PointId::D0),
                s.working.point(PointId::D1),
                s.active.map_or(0.0, |m| m.slope()),
                s.acquisition_errors,
                s.publish_contention,
                s.suppressed,
            ),
            Err(err) => write!(out, "error: {}", err),
        },
        Command::Wind => {
            let s = station.pulse_status();
            write!(
                out,
                "rate {:?} pulses {} pending {}\n  idle {} implausible {} contention {}",
                s.last_rate, s.last_pulses, s.pending, s.idle_intervals, s.implausible, s.contention
            )
        }
        Command::Calibrate { channel, point, value } => {
            match station.calibrate(channel, point, value) {
                Ok(r) => write!(out, "ch{} {}: {:?}", channel, r.state, r.recompute),
                Err(err) => write!(out, "error: {}", err),
            }
        }
        Command::Set { channel, point, code, value } => {
            match station.set_point(channel, point, code, value) {
                Ok(r) => write!(out, "ch{} {}: {:?}", channel, r.state, r.recompute),
                Err(err) => write!(out, "error: {}", err),
            }
        }
        Command::Flash(channel) => match station.stored_calibration(channel) {
            Ok(stored) => write!(out, "ch{} d0 {:?}\nch{} d1 {:?}", channel, stored.d0, channel, stored.d1),
            Err(err) => write!(out, "error: {}", err),
        },
        Command::Quit => write!(out, "bye"),
    };
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!("get 1".parse(), Ok(Command::Get(QuantityId::Channel(1))));
        assert_eq!("get wind".parse(), Ok(Command::Get(QuantityId::PulseRate)));
        assert_eq!("status 0".parse(), Ok(Command::Status(0)));
        assert_eq!("wind".parse(), Ok(Command::Wind));
        assert_eq!(
            "calibrate 0 d1 38.5".parse(),
            Ok(Command::Calibrate { channel: 0, point: PointId::D1, value: 38.5 })
        );
        assert_eq!(
            "set 1 D0 500 -10".parse(),
            Ok(Command::Set { channel: 1, point: PointId::D0, code: 500, value: -10.0 })
        );
        assert_eq!("flash 1".parse(), Ok(Command::Flash(1)));
        assert_eq!("  quit ".parse(), Ok(Command::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!(
            "reboot".parse::<Command>(),
            Err(CommandError::Unknown("reboot".into()))
        );
        assert!(matches!(
            "calibrate 0 d2 10".parse::<Command>(),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!("set 0 d0 abc 1".parse::<Command>(), Err(CommandError::Usage(_))));
        assert!(matches!("status".parse::<Command>(), Err(CommandError::Usage(_))));
    }
}
