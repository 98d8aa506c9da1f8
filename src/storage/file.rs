//! File-backed storage device
//!
//! Persists the device image as one flat file, so the preset library
//! survives restarts the way the FRAM contents do on hardware.

use super::{StorageDevice, StorageError, ADDRESS_SPACE};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::info;

pub struct FileStorage {
    file: File,
    write_enabled: bool,
}

impl FileStorage {
    /// Open (or create and zero-fill) the image file at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let len = file.metadata()?.len();
        if len < ADDRESS_SPACE as u64 {
            file.set_len(ADDRESS_SPACE as u64)?;
            info!(path = %path.display(), "initialized storage image");
        }

        file.seek(SeekFrom::Start(0))?;
        Ok(Self {
            file,
            write_enabled: false,
        })
    }
}

impl StorageDevice for FileStorage {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        if addr as usize + buf.len() > ADDRESS_SPACE as usize {
            return Err(StorageError::OutOfBounds {
                addr,
                len: buf.len(),
            });
        }
        self.file.seek(SeekFrom::Start(addr as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), StorageError> {
        if !self.write_enabled {
            return Err(StorageError::WriteDisabled);
        }
        if addr as usize + data.len() > ADDRESS_SPACE as usize {
            return Err(StorageError::OutOfBounds {
                addr,
                len: data.len(),
            });
        }
        self.file.seek(SeekFrom::Start(addr as u64))?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn write_enable(&mut self, enabled: bool) {
        self.write_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ControllerPreset, PresetName, PresetRecord};
    use crate::storage::PresetStore;

    #[test]
    fn test_image_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fram.bin");

        {
            let mut store = PresetStore::new(FileStorage::open(&path).unwrap());
            let mut preset = ControllerPreset::default();
            preset.name = PresetName::new("Keeper");
            store.write_preset(3, &preset).unwrap();
        }

        let mut store = PresetStore::new(FileStorage::open(&path).unwrap());
        let preset: ControllerPreset = store.read_preset(3).unwrap();
        assert_eq!(preset.name().as_str(), "Keeper");
    }

    #[test]
    fn test_write_requires_enable() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = FileStorage::open(&dir.path().join("fram.bin")).unwrap();

        assert!(matches!(
            device.write(0, &[1]),
            Err(StorageError::WriteDisabled)
        ));
    }
}
