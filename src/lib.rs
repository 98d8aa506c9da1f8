//! Footctl - MIDI foot controller core
//!
//! Device-side core of a MIDI foot controller: a persistent bank/preset
//! library in non-volatile memory, a SysEx command/response protocol for a
//! host editor, and a serial touchscreen link that mirrors the current bank.

pub mod app;
pub mod config;
pub mod midi;
pub mod model;
pub mod protocol;
pub mod screen;
pub mod storage;
pub mod tap;

pub use app::App;
pub use model::{Bank, ControllerPreset, ControllerState, PresetName, RackPreset, RackState};
pub use protocol::DEVICE_ID;
pub use storage::PresetStore;
