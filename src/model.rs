//! Record schemas for presets, banks, and loop names
//!
//! Every record has a fixed binary size; the SysEx payloads and the
//! non-volatile storage image both use these layouts byte for byte.

use std::fmt;

/// Bytes per name field: 8 usable characters plus a NUL terminator.
pub const NAME_LEN: usize = 9;

/// Number of effects loops (8 physical plus one reserved slot).
pub const LOOP_COUNT: usize = 9;

/// Switches (and therefore messages/presets) per bank.
pub const SWITCH_COUNT: usize = 8;

/// Presets per table (controller and rack each).
pub const PRESET_COUNT: usize = 128;

/// Banks per table.
pub const BANK_COUNT: usize = 16;

/// A value with a fixed-size binary representation.
///
/// `encode_into`/`decode_from` work on a slice of exactly `SIZE` bytes;
/// callers slice the storage image or SysEx payload accordingly. `decode`
/// is the checked entry point for wire payloads of untrusted length.
pub trait Record: Sized + Default {
    const SIZE: usize;

    /// Write the record into `buf`, which must be exactly `SIZE` bytes.
    fn encode_into(&self, buf: &mut [u8]);

    /// Read the record from `buf`, which must be exactly `SIZE` bytes.
    /// Out-of-range tag bytes decode to their default variant.
    fn decode_from(buf: &[u8]) -> Self;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Decode a wire payload, rejecting any length other than `SIZE`.
    fn decode(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == Self::SIZE).then(|| Self::decode_from(bytes))
    }
}

/// A record that carries a preset name at a fixed offset.
///
/// Directory listings read only the name field out of each stored record,
/// so the offset is part of the contract.
pub trait PresetRecord: Record + Clone {
    const NAME_OFFSET: usize;

    fn name(&self) -> &PresetName;
}

/// Fixed-length display name: up to 8 characters, always NUL-terminated
/// within its 9-byte buffer. Longer input is truncated silently.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct PresetName([u8; NAME_LEN]);

impl PresetName {
    pub fn new(s: &str) -> Self {
        let mut buf = [0u8; NAME_LEN];
        for (dst, src) in buf[..NAME_LEN - 1].iter_mut().zip(s.bytes()) {
            *dst = src;
        }
        Self(buf)
    }

    /// The name up to (excluding) the first NUL. Non-UTF8 content, which
    /// can only arrive over the wire, reads as empty.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN - 1);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PresetName({:?})", self.as_str())
    }
}

impl Record for PresetName {
    const SIZE: usize = NAME_LEN;

    fn encode_into(&self, buf: &mut [u8]) {
        buf.copy_from_slice(&self.0);
        // Terminator is guaranteed even if the stored bytes were full.
        buf[NAME_LEN - 1] = 0;
    }

    fn decode_from(buf: &[u8]) -> Self {
        let mut bytes = [0u8; NAME_LEN];
        bytes.copy_from_slice(buf);
        bytes[NAME_LEN - 1] = 0;
        Self(bytes)
    }
}

/// Desired state transition for one effects loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopAction {
    #[default]
    Unchanged,
    Set,
    Unset,
    Toggle,
}

impl LoopAction {
    pub fn from_byte(b: u8) -> Self {
        match b {
            1 => LoopAction::Set,
            2 => LoopAction::Unset,
            3 => LoopAction::Toggle,
            _ => LoopAction::Unchanged,
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            LoopAction::Unchanged => 0,
            LoopAction::Set => 1,
            LoopAction::Unset => 2,
            LoopAction::Toggle => 3,
        }
    }
}

/// Per-loop action table: one entry per physical loop plus the reserved slot.
///
/// Describes the transition to apply, not the loops' actual state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loops(pub [LoopAction; LOOP_COUNT]);

impl Loops {
    pub fn all(action: LoopAction) -> Self {
        Self([action; LOOP_COUNT])
    }
}

impl Record for Loops {
    const SIZE: usize = LOOP_COUNT;

    fn encode_into(&self, buf: &mut [u8]) {
        for (dst, action) in buf.iter_mut().zip(self.0.iter()) {
            *dst = action.byte();
        }
    }

    fn decode_from(buf: &[u8]) -> Self {
        let mut loops = [LoopAction::Unchanged; LOOP_COUNT];
        for (action, src) in loops.iter_mut().zip(buf.iter()) {
            *action = LoopAction::from_byte(*src);
        }
        Self(loops)
    }
}

/// What a switch message emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    None,
    Pc,
    Cc,
    TcCc,
    TcPc,
}

impl MessageKind {
    pub fn from_byte(b: u8) -> Self {
        match b {
            1 => MessageKind::Pc,
            2 => MessageKind::Cc,
            3 => MessageKind::TcCc,
            4 => MessageKind::TcPc,
            _ => MessageKind::None,
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            MessageKind::None => 0,
            MessageKind::Pc => 1,
            MessageKind::Cc => 2,
            MessageKind::TcCc => 3,
            MessageKind::TcPc => 4,
        }
    }
}

/// Which switch gesture triggers a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageAction {
    #[default]
    None,
    Press,
    Release,
    LongPress,
    LongPressRelease,
    Tap,
}

impl MessageAction {
    pub fn from_byte(b: u8) -> Self {
        match b {
            1 => MessageAction::Press,
            2 => MessageAction::Release,
            3 => MessageAction::LongPress,
            4 => MessageAction::LongPressRelease,
            5 => MessageAction::Tap,
            _ => MessageAction::None,
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            MessageAction::None => 0,
            MessageAction::Press => 1,
            MessageAction::Release => 2,
            MessageAction::LongPress => 3,
            MessageAction::LongPressRelease => 4,
            MessageAction::Tap => 5,
        }
    }
}

/// One switch action binding within a controller preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Message {
    pub kind: MessageKind,
    pub action: MessageAction,
    pub cc_number: u8,
    pub pc_number: u8,
    pub cc_value: u8,
    pub midi_channel: u8,
    pub omni: u8,
    pub rack_preset: u8,
    pub loops: Loops,
}

impl Record for Message {
    const SIZE: usize = 8 + Loops::SIZE;

    fn encode_into(&self, buf: &mut [u8]) {
        buf[0] = self.kind.byte();
        buf[1] = self.action.byte();
        buf[2] = self.cc_number;
        buf[3] = self.pc_number;
        buf[4] = self.cc_value;
        buf[5] = self.midi_channel;
        buf[6] = self.omni;
        buf[7] = self.rack_preset;
        self.loops.encode_into(&mut buf[8..]);
    }

    fn decode_from(buf: &[u8]) -> Self {
        Self {
            kind: MessageKind::from_byte(buf[0]),
            action: MessageAction::from_byte(buf[1]),
            cc_number: buf[2],
            pc_number: buf[3],
            cc_value: buf[4],
            midi_channel: buf[5],
            omni: buf[6],
            rack_preset: buf[7],
            loops: Loops::decode_from(&buf[8..]),
        }
    }
}

/// A controller preset: a name, the alternate label shown while the preset's
/// toggle state is active, and one message per physical switch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerPreset {
    pub name: PresetName,
    pub toggle_name: PresetName,
    pub messages: [Message; SWITCH_COUNT],
}

impl Record for ControllerPreset {
    const SIZE: usize = 2 * NAME_LEN + SWITCH_COUNT * Message::SIZE;

    fn encode_into(&self, buf: &mut [u8]) {
        self.name.encode_into(&mut buf[..NAME_LEN]);
        self.toggle_name.encode_into(&mut buf[NAME_LEN..2 * NAME_LEN]);
        for (i, message) in self.messages.iter().enumerate() {
            let at = 2 * NAME_LEN + i * Message::SIZE;
            message.encode_into(&mut buf[at..at + Message::SIZE]);
        }
    }

    fn decode_from(buf: &[u8]) -> Self {
        let mut messages = [Message::default(); SWITCH_COUNT];
        for (i, message) in messages.iter_mut().enumerate() {
            let at = 2 * NAME_LEN + i * Message::SIZE;
            *message = Message::decode_from(&buf[at..at + Message::SIZE]);
        }
        Self {
            name: PresetName::decode_from(&buf[..NAME_LEN]),
            toggle_name: PresetName::decode_from(&buf[NAME_LEN..2 * NAME_LEN]),
            messages,
        }
    }
}

impl PresetRecord for ControllerPreset {
    const NAME_OFFSET: usize = 0;

    fn name(&self) -> &PresetName {
        &self.name
    }
}

/// A rack preset: a name and the loop state it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RackPreset {
    pub name: PresetName,
    pub loops: Loops,
}

impl Default for RackPreset {
    fn default() -> Self {
        Self {
            name: PresetName::default(),
            loops: Loops::all(LoopAction::Unset),
        }
    }
}

impl Record for RackPreset {
    const SIZE: usize = NAME_LEN + Loops::SIZE;

    fn encode_into(&self, buf: &mut [u8]) {
        self.name.encode_into(&mut buf[..NAME_LEN]);
        self.loops.encode_into(&mut buf[NAME_LEN..]);
    }

    fn decode_from(buf: &[u8]) -> Self {
        Self {
            name: PresetName::decode_from(&buf[..NAME_LEN]),
            loops: Loops::decode_from(&buf[NAME_LEN..]),
        }
    }
}

impl PresetRecord for RackPreset {
    const NAME_OFFSET: usize = 0;

    fn name(&self) -> &PresetName {
        &self.name
    }
}

/// Directory entry: an index plus the preset and owning bank names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresetId {
    pub index: u8,
    pub preset_name: PresetName,
    pub bank_name: PresetName,
}

impl Record for PresetId {
    const SIZE: usize = 1 + 2 * NAME_LEN;

    fn encode_into(&self, buf: &mut [u8]) {
        buf[0] = self.index;
        self.preset_name.encode_into(&mut buf[1..1 + NAME_LEN]);
        self.bank_name.encode_into(&mut buf[1 + NAME_LEN..]);
    }

    fn decode_from(buf: &[u8]) -> Self {
        Self {
            index: buf[0],
            preset_name: PresetName::decode_from(&buf[1..1 + NAME_LEN]),
            bank_name: PresetName::decode_from(&buf[1 + NAME_LEN..]),
        }
    }
}

/// Wire/storage transfer shape shared by controller and rack presets: the
/// preset index, the owning bank's name, and the preset record itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresetState<P> {
    pub index: u8,
    pub bank_name: PresetName,
    pub preset: P,
}

pub type ControllerState = PresetState<ControllerPreset>;
pub type RackState = PresetState<RackPreset>;

impl<P: Record> Record for PresetState<P> {
    const SIZE: usize = 1 + NAME_LEN + P::SIZE;

    fn encode_into(&self, buf: &mut [u8]) {
        buf[0] = self.index;
        self.bank_name.encode_into(&mut buf[1..1 + NAME_LEN]);
        self.preset.encode_into(&mut buf[1 + NAME_LEN..]);
    }

    fn decode_from(buf: &[u8]) -> Self {
        Self {
            index: buf[0],
            bank_name: PresetName::decode_from(&buf[1..1 + NAME_LEN]),
            preset: P::decode_from(&buf[1 + NAME_LEN..]),
        }
    }
}

/// The currently displayed bank: a cache of storage content owned by the
/// screen view, mutated only by bank selection, never persisted.
#[derive(Debug, Clone, Default)]
pub struct Bank {
    pub presets: [ControllerPreset; SWITCH_COUNT],
    pub name: PresetName,
    pub index: u8,
}
