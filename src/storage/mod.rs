//! Non-volatile preset storage
//!
//! Maps logical records (presets, bank names, loop names) to fixed byte
//! offsets in a flat address space and performs typed reads and writes
//! against a byte-addressable storage device (FRAM on the hardware).

mod file;
mod mem;

pub use file::FileStorage;
pub use mem::MemStorage;

use crate::model::{
    Bank, ControllerPreset, PresetId, PresetName, PresetRecord, RackPreset, Record, BANK_COUNT,
    LOOP_COUNT, PRESET_COUNT, SWITCH_COUNT,
};
use thiserror::Error;
use tracing::{debug, info};

/// Base offsets of the five record tables.
pub const CONTROLLER_PRESETS_ADDR: u32 = 1000;
pub const RACK_PRESETS_ADDR: u32 = 50_000;
pub const CONTROLLER_BANK_NAMES_ADDR: u32 = 60_000;
pub const RACK_BANK_NAMES_ADDR: u32 = 62_000;
pub const RACK_LOOP_NAMES_ADDR: u32 = 64_000;

/// Total address space the device must cover.
pub const ADDRESS_SPACE: u32 = 65_536;

const fn region_end(base: u32, record_size: usize, count: usize) -> u32 {
    base + (record_size * count) as u32
}

// The five regions must stay non-overlapping even if record sizes change.
const _: () = {
    assert!(
        region_end(CONTROLLER_PRESETS_ADDR, ControllerPreset::SIZE, PRESET_COUNT)
            <= RACK_PRESETS_ADDR
    );
    assert!(
        region_end(RACK_PRESETS_ADDR, RackPreset::SIZE, PRESET_COUNT)
            <= CONTROLLER_BANK_NAMES_ADDR
    );
    assert!(
        region_end(CONTROLLER_BANK_NAMES_ADDR, PresetName::SIZE, BANK_COUNT)
            <= RACK_BANK_NAMES_ADDR
    );
    assert!(
        region_end(RACK_BANK_NAMES_ADDR, PresetName::SIZE, BANK_COUNT) <= RACK_LOOP_NAMES_ADDR
    );
    assert!(region_end(RACK_LOOP_NAMES_ADDR, PresetName::SIZE, LOOP_COUNT) <= ADDRESS_SPACE);
};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("access at {addr}+{len} is outside the device address space")]
    OutOfBounds { addr: u32, len: usize },

    #[error("write attempted while write-enable is off")]
    WriteDisabled,

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A byte-addressable non-volatile storage device.
///
/// Writes only succeed while write-enable is on. `PresetStore` brackets
/// every write with an enable/disable pair itself, so this never falls to
/// caller discipline.
pub trait StorageDevice {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), StorageError>;

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), StorageError>;

    fn write_enable(&mut self, enabled: bool);
}

impl<T: StorageDevice + ?Sized> StorageDevice for Box<T> {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        (**self).read(addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(addr, data)
    }

    fn write_enable(&mut self, enabled: bool) {
        (**self).write_enable(enabled)
    }
}

/// A preset record with a home region in the address map.
pub trait StoredPreset: PresetRecord {
    const PRESETS_ADDR: u32;
    const BANK_NAMES_ADDR: u32;
}

impl StoredPreset for ControllerPreset {
    const PRESETS_ADDR: u32 = CONTROLLER_PRESETS_ADDR;
    const BANK_NAMES_ADDR: u32 = CONTROLLER_BANK_NAMES_ADDR;
}

impl StoredPreset for RackPreset {
    const PRESETS_ADDR: u32 = RACK_PRESETS_ADDR;
    const BANK_NAMES_ADDR: u32 = RACK_BANK_NAMES_ADDR;
}

/// Typed access to the preset library on a storage device.
pub struct PresetStore<D> {
    device: D,
}

impl<D: StorageDevice> PresetStore<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    fn read_record<R: Record>(&mut self, addr: u32) -> Result<R, StorageError> {
        let mut buf = vec![0u8; R::SIZE];
        self.device.read(addr, &mut buf)?;
        Ok(R::decode_from(&buf))
    }

    fn write_record<R: Record>(&mut self, addr: u32, record: &R) -> Result<(), StorageError> {
        let bytes = record.to_bytes();
        self.device.write_enable(true);
        let result = self.device.write(addr, &bytes);
        self.device.write_enable(false);
        result
    }

    /// Read one preset record by its full (preset-granularity) index.
    pub fn read_preset<P: StoredPreset>(&mut self, index: u8) -> Result<P, StorageError> {
        self.read_record(P::PRESETS_ADDR + index as u32 * P::SIZE as u32)
    }

    pub fn write_preset<P: StoredPreset>(
        &mut self,
        index: u8,
        preset: &P,
    ) -> Result<(), StorageError> {
        debug!(index, name = %preset.name(), "writing preset");
        self.write_record(P::PRESETS_ADDR + index as u32 * P::SIZE as u32, preset)
    }

    /// Read a bank name by bank (not preset) index.
    pub fn read_bank_name<P: StoredPreset>(&mut self, bank: u8) -> Result<PresetName, StorageError> {
        self.read_record(P::BANK_NAMES_ADDR + bank as u32 * PresetName::SIZE as u32)
    }

    pub fn write_bank_name<P: StoredPreset>(
        &mut self,
        bank: u8,
        name: &PresetName,
    ) -> Result<(), StorageError> {
        self.write_record(P::BANK_NAMES_ADDR + bank as u32 * PresetName::SIZE as u32, name)
    }

    /// Read a preset together with its owning bank's name.
    pub fn read_state<P: StoredPreset>(
        &mut self,
        index: u8,
    ) -> Result<(PresetName, P), StorageError> {
        let preset = self.read_preset::<P>(index)?;
        let bank_name = self.read_bank_name::<P>(index / SWITCH_COUNT as u8)?;
        Ok((bank_name, preset))
    }

    /// Write a preset and its owning bank's name in one go.
    pub fn write_state<P: StoredPreset>(
        &mut self,
        index: u8,
        bank_name: &PresetName,
        preset: &P,
    ) -> Result<(), StorageError> {
        self.write_bank_name::<P>(index / SWITCH_COUNT as u8, bank_name)?;
        self.write_preset(index, preset)
    }

    /// List all presets of one kind: index, preset name, owning bank name.
    ///
    /// Reads only the name field out of each stored record rather than the
    /// whole preset (128 presets x 2 small reads).
    pub fn directory<P: StoredPreset>(&mut self) -> Result<Vec<PresetId>, StorageError> {
        let mut ids = Vec::with_capacity(PRESET_COUNT);
        for i in 0..PRESET_COUNT as u8 {
            let name_addr = P::PRESETS_ADDR + i as u32 * P::SIZE as u32 + P::NAME_OFFSET as u32;
            ids.push(PresetId {
                index: i,
                preset_name: self.read_record(name_addr)?,
                bank_name: self.read_bank_name::<P>(i / SWITCH_COUNT as u8)?,
            });
        }
        Ok(ids)
    }

    /// Read a full bank of controller presets plus the bank name.
    pub fn read_bank(&mut self, bank: u8) -> Result<Bank, StorageError> {
        let mut presets: [ControllerPreset; SWITCH_COUNT] = Default::default();
        for (i, preset) in presets.iter_mut().enumerate() {
            *preset = self.read_preset((bank as usize * SWITCH_COUNT + i) as u8)?;
        }
        let name = self.read_bank_name::<ControllerPreset>(bank)?;
        Ok(Bank {
            presets,
            name,
            index: bank,
        })
    }

    pub fn read_loop_names(&mut self) -> Result<[PresetName; LOOP_COUNT], StorageError> {
        let mut names = [PresetName::default(); LOOP_COUNT];
        for (i, name) in names.iter_mut().enumerate() {
            *name = self.read_record(RACK_LOOP_NAMES_ADDR + (i * PresetName::SIZE) as u32)?;
        }
        Ok(names)
    }

    pub fn write_loop_names(
        &mut self,
        names: &[PresetName; LOOP_COUNT],
    ) -> Result<(), StorageError> {
        for (i, name) in names.iter().enumerate() {
            self.write_record(RACK_LOOP_NAMES_ADDR + (i * PresetName::SIZE) as u32, name)?;
        }
        Ok(())
    }

    /// Rewrite the whole address map with default-named placeholder records:
    /// `P{n}`/`T{n}` controller presets, `RP{n}` rack presets, and
    /// `B{n}`/`RB{n}` bank names for 16 banks of 8.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        info!("resetting preset library to factory defaults");
        for i in 0..PRESET_COUNT as u8 {
            let program = i % SWITCH_COUNT as u8;

            let mut controller = ControllerPreset::default();
            controller.name = PresetName::new(&format!("P{program}"));
            controller.toggle_name = PresetName::new(&format!("T{program}"));
            self.write_preset(i, &controller)?;

            let mut rack = RackPreset::default();
            rack.name = PresetName::new(&format!("RP{program}"));
            self.write_preset(i, &rack)?;

            if program == 0 {
                let bank = i / SWITCH_COUNT as u8;
                self.write_bank_name::<ControllerPreset>(bank, &PresetName::new(&format!("B{bank}")))?;
                self.write_bank_name::<RackPreset>(bank, &PresetName::new(&format!("RB{bank}")))?;
            }
        }
        Ok(())
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}
