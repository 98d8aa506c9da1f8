//! In-memory storage device for tests and demo mode

use super::{StorageDevice, StorageError, ADDRESS_SPACE};

/// A RAM-backed stand-in for the FRAM chip. Enforces the same
/// write-enable discipline as the real device.
pub struct MemStorage {
    image: Vec<u8>,
    write_enabled: bool,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            image: vec![0u8; ADDRESS_SPACE as usize],
            write_enabled: false,
        }
    }

    /// The raw device image, for content comparisons in tests.
    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageDevice for MemStorage {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        let start = addr as usize;
        let end = start + buf.len();
        if end > self.image.len() {
            return Err(StorageError::OutOfBounds {
                addr,
                len: buf.len(),
            });
        }
        buf.copy_from_slice(&self.image[start..end]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), StorageError> {
        if !self.write_enabled {
            return Err(StorageError::WriteDisabled);
        }
        let start = addr as usize;
        let end = start + data.len();
        if end > self.image.len() {
            return Err(StorageError::OutOfBounds {
                addr,
                len: data.len(),
            });
        }
        self.image[start..end].copy_from_slice(data);
        Ok(())
    }

    fn write_enable(&mut self, enabled: bool) {
        self.write_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_requires_enable() {
        let mut device = MemStorage::new();
        let result = device.write(0, &[1, 2, 3]);
        assert!(matches!(result, Err(StorageError::WriteDisabled)));

        device.write_enable(true);
        device.write(0, &[1, 2, 3]).unwrap();
        device.write_enable(false);

        let mut buf = [0u8; 3];
        device.read(0, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut device = MemStorage::new();
        let mut buf = [0u8; 8];
        let result = device.read(ADDRESS_SPACE - 4, &mut buf);
        assert!(matches!(result, Err(StorageError::OutOfBounds { .. })));
    }
}
