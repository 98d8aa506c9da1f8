//! Inbound link framing and touch event decoding
//!
//! The display terminates every message with three 0xFF bytes. The
//! accumulator collects raw bytes until it sees that run, hands the frame
//! to the decoder, and resets unconditionally so a malformed or partial
//! frame can never wedge the link.

use tracing::debug;

/// Frame terminator byte.
pub const TERMINATOR: u8 = 0xFF;

/// Consecutive terminator bytes that end a frame.
pub const TERMINATOR_RUN: usize = 3;

/// Accumulator capacity. Inbound frames are tiny (touch events are 4 bytes
/// plus terminator); anything longer is garbage and gets resynced away.
const BUFFER_CAP: usize = 16;

/// Display return codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReturnCode {
    TouchEvent = 0x65,
}

/// Touchable controls on the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Edit,
    Copy,
    Paste,
    BankUp,
    BankDown,
    PageLeft,
    PageRight,
    Settings,
    Loop(u8),
    Preset(u8),
    Tap,
}

impl Button {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            3 => Some(Button::Edit),
            4 => Some(Button::Copy),
            5 => Some(Button::Paste),
            6 => Some(Button::BankUp),
            7 => Some(Button::BankDown),
            8 => Some(Button::PageLeft),
            9 => Some(Button::PageRight),
            10 => Some(Button::Settings),
            11..=15 => Some(Button::Loop(b - 11)),
            // Loop buttons skip code 16 on the panel layout.
            17..=20 => Some(Button::Loop(b - 12)),
            21..=28 => Some(Button::Preset(b - 21)),
            36 => Some(Button::Tap),
            _ => None,
        }
    }
}

/// Decoded inbound frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEvent {
    /// A touch on `button` while `page` was displayed. `toggled` reports
    /// the control's toggle state after the touch.
    Touch {
        page: u8,
        button: Button,
        toggled: bool,
    },
}

impl ScreenEvent {
    /// Decode one terminator-stripped frame. Unknown return codes and
    /// unknown buttons are dropped (logged at debug).
    fn decode(frame: &[u8]) -> Option<Self> {
        if frame.first() != Some(&(ReturnCode::TouchEvent as u8)) {
            debug!("screen: ignoring frame with return code {:?}", frame.first());
            return None;
        }
        if frame.len() < 4 {
            debug!("screen: short touch frame ({} bytes)", frame.len());
            return None;
        }
        let button = match Button::from_byte(frame[2]) {
            Some(button) => button,
            None => {
                debug!("screen: unknown button code {}", frame[2]);
                return None;
            }
        };
        Some(ScreenEvent::Touch {
            page: frame[1],
            button,
            toggled: frame[3] != 0,
        })
    }
}

/// Byte-at-a-time frame assembler for the inbound link.
#[derive(Debug, Default)]
pub struct LinkAccumulator {
    buf: Vec<u8>,
    run: usize,
}

impl LinkAccumulator {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(BUFFER_CAP),
            run: 0,
        }
    }

    /// Feed one byte; returns a decoded event when a frame completes.
    ///
    /// The buffer and terminator count reset after every completed frame,
    /// decodable or not, so forward progress is guaranteed.
    pub fn feed(&mut self, byte: u8) -> Option<ScreenEvent> {
        if self.buf.len() == BUFFER_CAP {
            // Oversized garbage; drop it and resync on the next terminator run.
            self.buf.clear();
        }
        self.buf.push(byte);
        if byte == TERMINATOR {
            self.run += 1;
        } else {
            self.run = 0;
        }

        if self.run == TERMINATOR_RUN {
            // A resync clear may have eaten part of the terminator run, so
            // the trim saturates rather than underflows.
            let frame_len = self.buf.len().saturating_sub(TERMINATOR_RUN);
            let event = ScreenEvent::decode(&self.buf[..frame_len]);
            self.buf.clear();
            self.run = 0;
            return event;
        }
        None
    }

    /// Feed a whole chunk of received bytes, collecting decoded events.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<ScreenEvent> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    #[cfg(test)]
    fn is_reset(&self) -> bool {
        self.buf.is_empty() && self.run == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn touch_frame(page: u8, button: u8, toggled: u8) -> Vec<u8> {
        vec![0x65, page, button, toggled, 0xFF, 0xFF, 0xFF]
    }

    #[test]
    fn test_decodes_touch_event() {
        let mut link = LinkAccumulator::new();
        let mut events = link.feed_slice(&touch_frame(0, 6, 0));
        assert_eq!(
            events.pop(),
            Some(ScreenEvent::Touch {
                page: 0,
                button: Button::BankUp,
                toggled: false,
            })
        );
        assert!(link.is_reset());
    }

    #[test]
    fn test_loop_button_gap_in_codes() {
        assert_eq!(Button::from_byte(15), Some(Button::Loop(4)));
        assert_eq!(Button::from_byte(16), None);
        assert_eq!(Button::from_byte(17), Some(Button::Loop(5)));
        assert_eq!(Button::from_byte(20), Some(Button::Loop(8)));
    }

    #[test]
    fn test_malformed_frame_resets_accumulator() {
        let mut link = LinkAccumulator::new();
        let events = link.feed_slice(&[0x01, 0x02, 0xFF, 0xFF, 0xFF]);
        assert!(events.is_empty());
        assert!(link.is_reset());

        // The link still decodes the next valid frame.
        let events = link.feed_slice(&touch_frame(0, 36, 0));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_interrupted_terminator_run_does_not_end_frame() {
        let mut link = LinkAccumulator::new();
        // Two terminators, a data byte, then a full run.
        let events = link.feed_slice(&[0x65, 0xFF, 0xFF, 0x24, 0x00, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            events,
            vec![ScreenEvent::Touch {
                page: 0xFF,
                button: Button::Tap,
                toggled: false,
            }]
        );
    }

    proptest! {
        /// Any garbage prefix followed by a terminator run, then a valid
        /// touch frame, yields exactly one event and a reset accumulator.
        #[test]
        fn test_garbage_prefix_then_valid_frame(
            // Garbage avoids the touch return code and the terminator so
            // the prefix can never itself decode as an event.
            garbage in proptest::collection::vec(0x00u8..=0x64, 0..64)
        ) {
            let mut link = LinkAccumulator::new();
            let mut stream = garbage.clone();
            stream.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
            stream.extend_from_slice(&touch_frame(0, 6, 0));

            let events = link.feed_slice(&stream);
            prop_assert_eq!(
                events,
                vec![ScreenEvent::Touch {
                    page: 0,
                    button: Button::BankUp,
                    toggled: false,
                }]
            );
            prop_assert!(link.is_reset());
        }
    }
}
