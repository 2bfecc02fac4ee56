//! Management of per-file index blocks ("file headers").
//!
//! A header is exactly one sector: a file length, a sector count, and a
//! fixed table of pointer slots. The first `NUM_DIRECT` slots point
//! straight at data sectors; the rest point at second-level headers that
//! reuse the same record layout but whose slots are all direct. One level
//! of indirection only.

use alloc::vec::Vec;

use log::trace;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::freemap::FreeMap;
use crate::BlockDevice;

/// Raw one-sector image shared by top-level and indirect headers.
/// Unused pointer slots hold -1. All fields are i32, so the record has no
/// padding and fills the sector exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct RawHeader {
    num_bytes: i32,
    num_sectors: i32,
    data_sectors: [i32; NUM_SLOTS],
}

impl RawHeader {
    fn empty() -> Self {
        RawHeader {
            num_bytes: 0,
            num_sectors: 0,
            data_sectors: [-1; NUM_SLOTS],
        }
    }

    fn read<D: BlockDevice>(device: &D, sector: u32) -> Result<Self> {
        let mut buf = [0u8; SECTOR_SIZE];
        device.read_sector(sector, &mut buf)?;
        let raw = unsafe { core::ptr::read_unaligned(buf.as_ptr() as *const RawHeader) };
        Ok(raw)
    }

    fn write<D: BlockDevice>(&self, device: &D, sector: u32) -> Result<()> {
        let mut buf = [0u8; SECTOR_SIZE];
        unsafe {
            core::ptr::write_unaligned(buf.as_mut_ptr() as *mut RawHeader, *self);
        }
        device.write_sector(sector, &buf)
    }
}

/// A second-level header: one sector of direct pointers owned by a slot of
/// a top-level header.
#[derive(Debug, Clone)]
struct IndirectHeader {
    /// Where this header itself lives on disk.
    sector: u32,
    /// Its data sectors, in file order.
    direct: Vec<u32>,
}

impl IndirectHeader {
    fn allocate(free_map: &mut FreeMap, sector: u32, count: usize) -> Result<Self> {
        if free_map.num_clear() < count {
            return Err(FsError::NoSpaceOnDisk);
        }
        let mut direct = Vec::with_capacity(count);
        for _ in 0..count {
            direct.push(free_map.find_and_set().ok_or(FsError::NoSpaceOnDisk)?);
        }
        Ok(IndirectHeader { sector, direct })
    }
}

/// In-memory view of one file's index block, including its fetched
/// second-level headers. Instances live for a single operation; nothing is
/// cached across operations.
#[derive(Debug, Clone)]
pub struct FileHeader {
    num_bytes: u32,
    num_sectors: u32,
    direct: [Option<u32>; NUM_DIRECT],
    indirect: Vec<IndirectHeader>,
}

impl FileHeader {
    /// A fresh header addressing nothing. Fill it with `allocate` or
    /// replace it with `fetch_from`.
    pub fn new() -> Self {
        FileHeader {
            num_bytes: 0,
            num_sectors: 0,
            direct: [None; NUM_DIRECT],
            indirect: Vec::new(),
        }
    }

    /// Logical file length in bytes.
    pub fn file_length(&self) -> u32 {
        self.num_bytes
    }

    /// Number of data sectors the file occupies.
    pub fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    /// Reserves data sectors for a fresh file of `file_size` bytes, direct
    /// slots first, then indirect slots in order. Each indirect slot costs
    /// one extra sector for the second-level header.
    ///
    /// On failure nothing is rolled back; the caller discards the map
    /// without writing it back.
    pub fn allocate(&mut self, free_map: &mut FreeMap, file_size: u32) -> Result<()> {
        if file_size as usize > MAX_FILE_SIZE {
            return Err(FsError::FileTooLarge);
        }

        self.num_bytes = file_size;
        self.num_sectors = ((file_size as usize + SECTOR_SIZE - 1) / SECTOR_SIZE) as u32;

        let want = self.num_sectors as usize;
        if free_map.num_clear() < want {
            return Err(FsError::NoSpaceOnDisk);
        }
        trace!("allocating {} sectors for a {} byte file", want, file_size);

        let direct_take = want.min(NUM_DIRECT);
        for slot in 0..direct_take {
            self.direct[slot] = Some(free_map.find_and_set().ok_or(FsError::NoSpaceOnDisk)?);
        }

        let mut remaining = want - direct_take;
        while remaining > 0 {
            let own = free_map.find_and_set().ok_or(FsError::NoSpaceOnDisk)?;
            let count = remaining.min(NUM_MAX_SECT);
            let child = IndirectHeader::allocate(free_map, own, count)?;
            self.indirect.push(child);
            remaining -= count;
        }
        Ok(())
    }

    /// Releases every sector this header references: direct data sectors,
    /// each indirect header's data sectors, and the indirect header
    /// sectors themselves. Every released bit must currently be set.
    pub fn deallocate(&mut self, free_map: &mut FreeMap) {
        for slot in self.direct.iter_mut() {
            if let Some(sector) = slot.take() {
                free_map.clear(sector);
            }
        }
        for child in self.indirect.drain(..) {
            for sector in child.direct {
                free_map.clear(sector);
            }
            free_map.clear(child.sector);
        }
        self.num_bytes = 0;
        self.num_sectors = 0;
    }

    /// Reads the header at `sector`, following each live indirect slot to
    /// its second-level header (one level only).
    pub fn fetch_from<D: BlockDevice>(device: &D, sector: u32) -> Result<Self> {
        let raw = RawHeader::read(device, sector)?;
        let mut header = FileHeader {
            num_bytes: raw.num_bytes.max(0) as u32,
            num_sectors: raw.num_sectors.max(0) as u32,
            direct: [None; NUM_DIRECT],
            indirect: Vec::new(),
        };
        for i in 0..NUM_DIRECT {
            if raw.data_sectors[i] >= 0 {
                header.direct[i] = Some(raw.data_sectors[i] as u32);
            }
        }
        for i in NUM_DIRECT..NUM_SLOTS {
            if raw.data_sectors[i] < 0 {
                break;
            }
            let child_sector = raw.data_sectors[i] as u32;
            let child_raw = RawHeader::read(device, child_sector)?;
            let count = (child_raw.num_sectors.max(0) as usize).min(NUM_MAX_SECT);
            let direct = child_raw.data_sectors[..count]
                .iter()
                .map(|&s| s as u32)
                .collect();
            header.indirect.push(IndirectHeader {
                sector: child_sector,
                direct,
            });
        }
        Ok(header)
    }

    /// Writes the header image to `sector`, then each live indirect header
    /// back to its own sector.
    pub fn write_back<D: BlockDevice>(&self, device: &D, sector: u32) -> Result<()> {
        let mut raw = RawHeader::empty();
        raw.num_bytes = self.num_bytes as i32;
        raw.num_sectors = self.num_sectors as i32;
        for (i, slot) in self.direct.iter().enumerate() {
            if let Some(s) = slot {
                raw.data_sectors[i] = *s as i32;
            }
        }
        for (i, child) in self.indirect.iter().enumerate() {
            raw.data_sectors[NUM_DIRECT + i] = child.sector as i32;
        }
        raw.write(device, sector)?;

        for child in self.indirect.iter() {
            let mut child_raw = RawHeader::empty();
            child_raw.num_bytes = (child.direct.len() * SECTOR_SIZE) as i32;
            child_raw.num_sectors = child.direct.len() as i32;
            for (j, &s) in child.direct.iter().enumerate() {
                child_raw.data_sectors[j] = s as i32;
            }
            child_raw.write(device, child.sector)?;
        }
        Ok(())
    }

    /// Translates a byte offset within the file to the sector holding it.
    /// The offset must lie below `file_length()`; anything else is a
    /// caller bug and asserts.
    pub fn byte_to_sector(&self, offset: u32) -> u32 {
        assert!(
            offset < self.num_bytes,
            "offset {} beyond file length {}",
            offset,
            self.num_bytes
        );
        let position = offset as usize / SECTOR_SIZE;
        if position < NUM_DIRECT {
            return self.direct[position].expect("unallocated direct slot");
        }
        let position = position - NUM_DIRECT;
        let child = &self.indirect[position / NUM_MAX_SECT];
        child.direct[position % NUM_MAX_SECT]
    }
}
