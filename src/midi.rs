//! MIDI utilities: inbound event classification and the SysEx envelope
//!
//! Raw bytes arrive from the transport callback; only Control Change and
//! System Exclusive are meaningful to the controller core.

use anyhow::Result;
use std::fmt;

/// SysEx framing markers.
pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// Inbound MIDI events the core reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiEvent {
    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Complete System Exclusive frame, including start/end markers
    SysEx(Vec<u8>),
}

impl MidiEvent {
    /// Classify a raw MIDI message. Anything other than CC or a complete
    /// SysEx frame is not meaningful here and parses to `None`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;
        match status {
            SYSEX_START => {
                if data.last() == Some(&SYSEX_END) {
                    Some(MidiEvent::SysEx(data.to_vec()))
                } else {
                    None
                }
            }
            _ if status & 0xF0 == 0xB0 => {
                if data.len() < 3 {
                    return None;
                }
                Some(MidiEvent::ControlChange {
                    channel: status & 0x0F,
                    cc: data[1] & 0x7F,
                    value: data[2] & 0x7F,
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiEvent::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiEvent::SysEx(data) => write!(f, "SysEx {} bytes", data.len()),
        }
    }
}

/// Wrap a message body in the SysEx envelope.
pub fn wrap_sysex(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + 2);
    frame.push(SYSEX_START);
    frame.extend_from_slice(body);
    frame.push(SYSEX_END);
    frame
}

/// Outbound SysEx transport.
///
/// Takes the message body (device ID, response code, payload); the
/// implementation adds the envelope.
pub trait SysexSink {
    fn send(&mut self, body: &[u8]) -> Result<()>;
}

/// Format MIDI bytes for trace output.
pub fn format_hex(data: &[u8]) -> String {
    hex::encode_upper(data)
}
