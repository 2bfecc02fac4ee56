//! Common utilities for tests
#![allow(unused)]

use std::sync::{Arc, Mutex};

use sectorfs::*;

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
}

#[derive(Debug)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
    num_sectors: usize,
}

impl RamDisk {
    /// Creates a new RamDisk with the specified number of sectors.
    /// Each sector is SECTOR_SIZE bytes.
    pub fn new(num_sectors: usize) -> Self {
        let size = num_sectors * SECTOR_SIZE;
        let inner = Arc::new(Mutex::new(vec![0u8; size]));
        RamDisk { inner, num_sectors }
    }

    /// Raw copy of the whole disk, for image comparisons.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }
}

impl BlockDevice for RamDisk {
    fn num_sectors(&self) -> usize {
        self.num_sectors
    }

    fn read_sector(&self, sector: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        if sector as usize >= self.num_sectors {
            return Err(Error::InvalidSector);
        }
        let start = sector as usize * SECTOR_SIZE;
        let end = start + SECTOR_SIZE;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write_sector(&self, sector: u32, buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        if sector as usize >= self.num_sectors {
            return Err(Error::InvalidSector);
        }
        let start = sector as usize * SECTOR_SIZE;
        let end = start + SECTOR_SIZE;
        let mut data = self.inner.lock().unwrap();
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // In a RAM disk, flushing is a no-op since data is already in memory.
        Ok(())
    }
}

/// A freshly formatted volume plus a handle on its device.
pub fn fresh_volume(num_sectors: usize) -> (Arc<RamDisk>, FileSystem<RamDisk>) {
    let device = Arc::new(RamDisk::new(num_sectors));
    let fs = FileSystem::open_volume(Arc::clone(&device), true).unwrap();
    (device, fs)
}

/// The free map as persisted on disk right now.
pub fn persisted_freemap(device: &Arc<RamDisk>) -> FreeMap {
    let file = OpenFile::new(Arc::clone(device), FREEMAP_SECTOR).unwrap();
    FreeMap::fetch_from(&file, device.num_sectors()).unwrap()
}

/// The root directory table bytes as persisted on disk right now.
pub fn root_dir_image(device: &Arc<RamDisk>) -> Vec<u8> {
    let file = OpenFile::new(Arc::clone(device), ROOT_DIR_SECTOR).unwrap();
    let mut buf = vec![0u8; DIR_FILE_SIZE];
    assert_eq!(file.read_at(&mut buf, 0).unwrap(), DIR_FILE_SIZE);
    buf
}
