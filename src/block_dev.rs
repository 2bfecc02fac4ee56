use crate::config::SECTOR_SIZE;
use crate::error::FsError;

pub trait BlockDevice: Send + Sync {
    /// Returns the number of sectors on the device.
    fn num_sectors(&self) -> usize;

    /// Reads one sector of data from the device.
    /// buf.len() must be equal to SECTOR_SIZE.
    fn read_sector(&self, sector: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), FsError>;

    /// Writes one sector of data to the device.
    /// buf.len() must be equal to SECTOR_SIZE.
    fn write_sector(&self, sector: u32, buf: &[u8; SECTOR_SIZE]) -> Result<(), FsError>;

    /// Flushes any buffered writes to stable storage.
    fn flush(&self) -> Result<(), FsError>;
}
