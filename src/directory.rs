//! Management of directory blocks.
//!
//! A directory is a file whose single data sector holds a fixed table of
//! name-to-header-sector entries, so a directory's capacity never grows.
//! Subdirectories are ordinary entries flagged as directories, giving a
//! strict tree: every header is owned by exactly one parent entry.

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::file::OpenFile;
use crate::freemap::FreeMap;
use crate::header::FileHeader;
use crate::BlockDevice;

// Field offsets of one raw table slot, natural alignment.
const OFF_IN_USE: usize = 0;
const OFF_NAME: usize = 1;
const OFF_SECTOR: usize = 12;
const OFF_IS_DIR: usize = 16;

/// What a directory entry points at: the header sector of a plain file or
/// of a subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirTarget {
    File(u32),
    Dir(u32),
}

impl DirTarget {
    pub fn sector(&self) -> u32 {
        match *self {
            DirTarget::File(sector) | DirTarget::Dir(sector) => sector,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, DirTarget::Dir(_))
    }
}

/// One in-use slot of a directory table.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// NUL-padded name, at most `NAME_MAX_LEN` bytes long.
    name: [u8; NAME_MAX_LEN + 1],
    target: DirTarget,
}

impl DirEntry {
    fn new(name: &str, target: DirTarget) -> Result<Self> {
        if name.is_empty() {
            return Err(FsError::InvalidPath);
        }
        if name.len() > NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }
        let mut bytes = [0u8; NAME_MAX_LEN + 1];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(DirEntry {
            name: bytes,
            target,
        })
    }

    pub fn name(&self) -> &str {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_MAX_LEN + 1);
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub fn target(&self) -> DirTarget {
        self.target
    }

    /// Bounded comparison: only the first `NAME_MAX_LEN` bytes of the
    /// query participate.
    fn matches(&self, name: &str) -> bool {
        let name = name.as_bytes();
        let name = &name[..name.len().min(NAME_MAX_LEN)];
        self.name().as_bytes() == name
    }
}

/// In-memory image of one directory table, backed by the single data
/// sector of a directory file. Fetched, edited, and written back within a
/// single operation.
#[derive(Debug, Clone)]
pub struct Directory {
    table: [Option<DirEntry>; NUM_DIR_ENTRIES],
}

impl Directory {
    /// A completely empty directory, as written at format time and into
    /// fresh subdirectories.
    pub fn new() -> Self {
        Directory {
            table: core::array::from_fn(|_| None),
        }
    }

    /// Reads the table from the directory's backing file.
    pub fn fetch_from<D: BlockDevice>(file: &OpenFile<D>) -> Result<Self> {
        let mut buf = [0u8; DIR_FILE_SIZE];
        let n = file.read_at(&mut buf, 0)?;
        if n != DIR_FILE_SIZE {
            return Err(FsError::DeviceError);
        }
        let mut dir = Directory::new();
        for (i, slot) in dir.table.iter_mut().enumerate() {
            let base = i * DIR_ENTRY_SIZE;
            if buf[base + OFF_IN_USE] == 0 {
                continue;
            }
            let mut name = [0u8; NAME_MAX_LEN + 1];
            name.copy_from_slice(&buf[base + OFF_NAME..base + OFF_NAME + NAME_MAX_LEN + 1]);
            let sector = i32::from_ne_bytes(
                buf[base + OFF_SECTOR..base + OFF_SECTOR + 4]
                    .try_into()
                    .unwrap(),
            );
            if sector < 0 {
                return Err(FsError::DeviceError);
            }
            let target = if buf[base + OFF_IS_DIR] != 0 {
                DirTarget::Dir(sector as u32)
            } else {
                DirTarget::File(sector as u32)
            };
            *slot = Some(DirEntry { name, target });
        }
        Ok(dir)
    }

    /// Writes the table to the directory's backing file. Free slots are
    /// written as zero bytes, so images stay byte-for-byte reproducible.
    pub fn write_back<D: BlockDevice>(&self, file: &OpenFile<D>) -> Result<()> {
        let mut buf = [0u8; DIR_FILE_SIZE];
        for (i, slot) in self.table.iter().enumerate() {
            let entry = match slot {
                Some(entry) => entry,
                None => continue,
            };
            let base = i * DIR_ENTRY_SIZE;
            buf[base + OFF_IN_USE] = 1;
            buf[base + OFF_NAME..base + OFF_NAME + NAME_MAX_LEN + 1].copy_from_slice(&entry.name);
            buf[base + OFF_SECTOR..base + OFF_SECTOR + 4]
                .copy_from_slice(&(entry.target.sector() as i32).to_ne_bytes());
            buf[base + OFF_IS_DIR] = entry.target.is_dir() as u8;
        }
        let n = file.write_at(&buf, 0)?;
        if n != DIR_FILE_SIZE {
            return Err(FsError::DeviceError);
        }
        Ok(())
    }

    /// Index of the first in-use slot matching `name`.
    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.table
            .iter()
            .position(|slot| matches!(slot, Some(entry) if entry.matches(name)))
    }

    /// The target of the first in-use slot matching `name`.
    pub fn find(&self, name: &str) -> Option<DirTarget> {
        self.table
            .iter()
            .flatten()
            .find(|entry| entry.matches(name))
            .map(|entry| entry.target)
    }

    /// Fills the first free slot with a new entry. Fails on a duplicate
    /// name or a full table.
    pub fn add(&mut self, name: &str, target: DirTarget) -> Result<()> {
        if self.find_index(name).is_some() {
            return Err(FsError::NameExists);
        }
        let entry = DirEntry::new(name, target)?;
        match self.table.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(entry);
                Ok(())
            }
            None => Err(FsError::DirectoryFull),
        }
    }

    /// Clears the matching slot. No compaction. Returns whether a slot
    /// was cleared.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.find_index(name) {
            Some(i) => {
                self.table[i] = None;
                true
            }
            None => false,
        }
    }

    /// The in-use entries, in physical slot order.
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.table.iter().flatten()
    }

    /// Resolves an absolute path to the entry it names, walking down from
    /// this directory. `offset` indexes the `/` introducing the first
    /// component still to resolve; the public entry points pass 0.
    fn search_target<D: BlockDevice>(
        &self,
        device: &Arc<D>,
        path: &str,
        offset: usize,
    ) -> Result<DirTarget> {
        if path.is_empty() || path == "/" {
            return Ok(DirTarget::Dir(ROOT_DIR_SECTOR));
        }
        if !path.starts_with('/') {
            return Err(FsError::InvalidPath);
        }

        let rest = &path[offset + 1..];
        match rest.find('/') {
            None => {
                // Deepest level; the remainder is the leaf name.
                self.find(rest).ok_or(FsError::NotFound)
            }
            Some(end) => {
                let component = &rest[..end];
                match self.find(component) {
                    Some(DirTarget::Dir(sector)) => {
                        let file = OpenFile::new(Arc::clone(device), sector)?;
                        let child = Directory::fetch_from(&file)?;
                        child.search_target(device, path, offset + 1 + end)
                    }
                    // An intermediate component has to be a directory.
                    Some(DirTarget::File(_)) => Err(FsError::NotFound),
                    None => Err(FsError::NotFound),
                }
            }
        }
    }

    /// Resolves an absolute path to a header sector, file or directory
    /// alike.
    pub fn search_path<D: BlockDevice>(
        &self,
        device: &Arc<D>,
        path: &str,
        offset: usize,
    ) -> Result<u32> {
        self.search_target(device, path, offset)
            .map(|target| target.sector())
    }

    /// Resolves an absolute path that must name a directory. A path whose
    /// leaf is a plain file does not resolve; its data is never
    /// reinterpreted as a directory table.
    pub fn search_dir_path<D: BlockDevice>(
        &self,
        device: &Arc<D>,
        path: &str,
        offset: usize,
    ) -> Result<u32> {
        match self.search_target(device, path, offset)? {
            DirTarget::Dir(sector) => Ok(sector),
            DirTarget::File(_) => Err(FsError::NotFound),
        }
    }

    /// Appends one `{prefix}{name} {F|D}` line per in-use entry, in slot
    /// order. Recursion descends into subdirectories with the entry name
    /// appended to the prefix.
    pub fn list<D: BlockDevice>(
        &self,
        device: &Arc<D>,
        prefix: &str,
        recursive: bool,
        out: &mut Vec<String>,
    ) -> Result<()> {
        for entry in self.entries() {
            let kind = if entry.target.is_dir() { 'D' } else { 'F' };
            out.push(format!("{}{} {}", prefix, entry.name(), kind));
            if recursive {
                if let DirTarget::Dir(sector) = entry.target {
                    let file = OpenFile::new(Arc::clone(device), sector)?;
                    let child = Directory::fetch_from(&file)?;
                    let sub_prefix = format!("{}{}", prefix, entry.name());
                    child.list(device, &sub_prefix, recursive, out)?;
                }
            }
        }
        Ok(())
    }

    /// Releases every entry in this directory: subdirectory contents
    /// first, then each entry's data sectors, header sector, and table
    /// slot. The emptied table is written back to `file`; clearing the
    /// directory's own header sector is the caller's job.
    pub fn destroy<D: BlockDevice>(
        &mut self,
        device: &Arc<D>,
        free_map: &mut FreeMap,
        file: &OpenFile<D>,
    ) -> Result<()> {
        for i in 0..NUM_DIR_ENTRIES {
            let target = match &self.table[i] {
                Some(entry) => entry.target,
                None => continue,
            };
            if let DirTarget::Dir(sector) = target {
                let child_file = OpenFile::new(Arc::clone(device), sector)?;
                let mut child = Directory::fetch_from(&child_file)?;
                child.destroy(device, free_map, &child_file)?;
            }
            let mut header = FileHeader::fetch_from(&**device, target.sector())?;
            header.deallocate(free_map);
            free_map.clear(target.sector());
            self.table[i] = None;
        }
        self.write_back(file)
    }
}
