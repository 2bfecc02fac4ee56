//! Open-file handles.
//!
//! A handle binds a fetched header to its device and turns positioned
//! reads and writes into whole-sector transfers. File sizes are fixed at
//! creation, so both directions clamp at the end of the file; writes that
//! touch a partial sector read-modify-write it.

use alloc::sync::Arc;

use crate::config::SECTOR_SIZE;
use crate::error::Result;
use crate::header::FileHeader;
use crate::BlockDevice;

#[derive(Debug)]
pub struct OpenFile<D: BlockDevice> {
    device: Arc<D>,
    header: FileHeader,
    sector: u32,
    pos: usize,
}

impl<D: BlockDevice> OpenFile<D> {
    /// Opens the file whose header lives at `sector`.
    pub fn new(device: Arc<D>, sector: u32) -> Result<Self> {
        let header = FileHeader::fetch_from(&*device, sector)?;
        Ok(OpenFile {
            device,
            header,
            sector,
            pos: 0,
        })
    }

    /// Logical file length in bytes.
    pub fn length(&self) -> usize {
        self.header.file_length() as usize
    }

    /// The sector holding this file's header.
    pub fn header_sector(&self) -> u32 {
        self.sector
    }

    /// Reads up to `buf.len()` bytes starting at `offset`, clamped to the
    /// end of the file. Returns the number of bytes read.
    pub fn read_at(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        let length = self.length();
        if offset >= length || buf.is_empty() {
            return Ok(0);
        }
        let count = buf.len().min(length - offset);

        let mut done = 0;
        let mut current = offset;
        let mut sector_buf = [0u8; SECTOR_SIZE];
        while done < count {
            let sector = self.header.byte_to_sector(current as u32);
            let start = current % SECTOR_SIZE;
            let take = (SECTOR_SIZE - start).min(count - done);
            self.device.read_sector(sector, &mut sector_buf)?;
            buf[done..done + take].copy_from_slice(&sector_buf[start..start + take]);
            done += take;
            current += take;
        }
        Ok(count)
    }

    /// Writes up to `buf.len()` bytes starting at `offset`, clamped to the
    /// end of the file (files never grow). Returns the number of bytes
    /// written.
    pub fn write_at(&self, buf: &[u8], offset: usize) -> Result<usize> {
        let length = self.length();
        if offset >= length || buf.is_empty() {
            return Ok(0);
        }
        let count = buf.len().min(length - offset);

        let mut done = 0;
        let mut current = offset;
        let mut sector_buf = [0u8; SECTOR_SIZE];
        while done < count {
            let sector = self.header.byte_to_sector(current as u32);
            let start = current % SECTOR_SIZE;
            let take = (SECTOR_SIZE - start).min(count - done);
            if take < SECTOR_SIZE {
                // Partial sector, keep the bytes around the write.
                self.device.read_sector(sector, &mut sector_buf)?;
            }
            sector_buf[start..start + take].copy_from_slice(&buf[done..done + take]);
            self.device.write_sector(sector, &sector_buf)?;
            done += take;
            current += take;
        }
        Ok(count)
    }

    /// Reads from the current seek position, advancing it.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.read_at(buf, self.pos)?;
        self.pos += n;
        Ok(n)
    }

    /// Writes at the current seek position, advancing it.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.write_at(buf, self.pos)?;
        self.pos += n;
        Ok(n)
    }

    /// Moves the seek position.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }
}
