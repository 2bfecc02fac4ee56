//! The file-system facade: path-level operations over the lower layers.
//!
//! Two files stay open for the volume's whole lifetime, the free-map file
//! and the root-directory file. Every other header, directory, and handle
//! is fetched by one operation and dropped before it returns.
//!
//! Mutating operations are all-or-nothing as far as the disk is
//! concerned: write-backs happen only once every step has succeeded, in
//! header, directory, free-map order, so an interruption leaves at worst
//! an orphaned header rather than a dangling directory entry. A failed
//! operation simply drops its in-memory state.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::debug;

use crate::config::*;
use crate::directory::{DirTarget, Directory};
use crate::error::{FsError, Result};
use crate::file::OpenFile;
use crate::freemap::FreeMap;
use crate::header::FileHeader;
use crate::registry::{FileId, OpenFileRegistry};
use crate::BlockDevice;

#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    freemap_file: OpenFile<D>,
    root_dir_file: OpenFile<D>,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Lays down a fresh volume: a free map with the two well-known
    /// header sectors and both files' data sectors marked, and an empty
    /// root directory.
    pub fn format(device: Arc<D>) -> Result<Self> {
        let total = device.num_sectors();
        debug!("formatting volume, {} sectors", total);

        let mut free_map = FreeMap::new(total);
        free_map.mark(FREEMAP_SECTOR);
        free_map.mark(ROOT_DIR_SECTOR);

        let mut map_header = FileHeader::new();
        map_header.allocate(&mut free_map, FreeMap::num_bytes(total) as u32)?;
        let mut dir_header = FileHeader::new();
        dir_header.allocate(&mut free_map, DIR_FILE_SIZE as u32)?;

        // The headers must hit the disk before the two files can be
        // opened; opening reads the header back.
        map_header.write_back(&*device, FREEMAP_SECTOR)?;
        dir_header.write_back(&*device, ROOT_DIR_SECTOR)?;

        let freemap_file = OpenFile::new(Arc::clone(&device), FREEMAP_SECTOR)?;
        let root_dir_file = OpenFile::new(Arc::clone(&device), ROOT_DIR_SECTOR)?;

        free_map.write_back(&freemap_file)?;
        Directory::new().write_back(&root_dir_file)?;
        device.flush()?;

        Ok(FileSystem {
            device,
            freemap_file,
            root_dir_file,
        })
    }

    /// Opens an existing volume, or formats a fresh one first.
    pub fn open_volume(device: Arc<D>, format: bool) -> Result<Self> {
        if format {
            return Self::format(device);
        }
        let freemap_file = OpenFile::new(Arc::clone(&device), FREEMAP_SECTOR)?;
        let root_dir_file = OpenFile::new(Arc::clone(&device), ROOT_DIR_SECTOR)?;
        Ok(FileSystem {
            device,
            freemap_file,
            root_dir_file,
        })
    }

    /// Creates a file (of `initial_size` bytes, fixed for its lifetime)
    /// or an empty subdirectory at `path`.
    pub fn create(&mut self, path: &str, initial_size: u32, is_dir: bool) -> Result<()> {
        debug!("create {} size {} dir {}", path, initial_size, is_dir);
        let (base, leaf) = split_path(path)?;

        let root = Directory::fetch_from(&self.root_dir_file)?;
        let dir_sector = root.search_dir_path(&self.device, base, 0)?;
        let target_file = OpenFile::new(Arc::clone(&self.device), dir_sector)?;
        let mut target_dir = Directory::fetch_from(&target_file)?;
        if target_dir.find(leaf).is_some() {
            return Err(FsError::NameExists);
        }

        let mut free_map = FreeMap::fetch_from(&self.freemap_file, self.device.num_sectors())?;
        let header_sector = free_map.find_and_set().ok_or(FsError::NoSpaceOnDisk)?;
        let target = if is_dir {
            DirTarget::Dir(header_sector)
        } else {
            DirTarget::File(header_sector)
        };
        target_dir.add(leaf, target)?;

        let size = if is_dir { DIR_FILE_SIZE as u32 } else { initial_size };
        let mut header = FileHeader::new();
        header.allocate(&mut free_map, size)?;

        // Everything worked; flush all changes back to disk. Any failure
        // above dropped the in-memory map, leaving the volume untouched.
        header.write_back(&*self.device, header_sector)?;
        target_dir.write_back(&target_file)?;
        free_map.write_back(&self.freemap_file)?;

        if is_dir {
            // A fresh subdirectory also needs its empty table on disk.
            let sub_file = OpenFile::new(Arc::clone(&self.device), header_sector)?;
            Directory::new().write_back(&sub_file)?;
        }
        self.device.flush()?;
        Ok(())
    }

    /// Opens the file at `path`.
    pub fn open(&self, path: &str) -> Result<OpenFile<D>> {
        let root = Directory::fetch_from(&self.root_dir_file)?;
        let sector = root.search_path(&self.device, path, 0)?;
        OpenFile::new(Arc::clone(&self.device), sector)
    }

    /// Removes the file or subdirectory at `path`. With `recursive`, a
    /// subdirectory's contents are destroyed first. The root itself
    /// cannot be removed.
    pub fn remove(&mut self, path: &str, recursive: bool) -> Result<()> {
        debug!("remove {} recursive {}", path, recursive);
        let (base, leaf) = split_path(path)?;

        let root = Directory::fetch_from(&self.root_dir_file)?;
        let dir_sector = root.search_dir_path(&self.device, base, 0)?;
        let base_file = OpenFile::new(Arc::clone(&self.device), dir_sector)?;
        let mut base_dir = Directory::fetch_from(&base_file)?;

        let target = base_dir.find(leaf).ok_or(FsError::NotFound)?;
        if target.sector() == ROOT_DIR_SECTOR {
            return Err(FsError::InvalidTarget);
        }

        let mut free_map = FreeMap::fetch_from(&self.freemap_file, self.device.num_sectors())?;

        if recursive {
            if let DirTarget::Dir(sector) = target {
                let subtree_file = OpenFile::new(Arc::clone(&self.device), sector)?;
                let mut subtree = Directory::fetch_from(&subtree_file)?;
                subtree.destroy(&self.device, &mut free_map, &subtree_file)?;
            }
        }

        let mut header = FileHeader::fetch_from(&*self.device, target.sector())?;
        header.deallocate(&mut free_map);
        free_map.clear(target.sector());
        base_dir.remove(leaf);

        base_dir.write_back(&base_file)?;
        free_map.write_back(&self.freemap_file)?;
        self.device.flush()?;
        Ok(())
    }

    /// Lists the directory at `path`, one `{prefix}{name} {F|D}` line per
    /// entry. The prefix is empty for the root and `path` itself for any
    /// other directory.
    pub fn list(&self, path: &str, recursive: bool) -> Result<Vec<String>> {
        let root = Directory::fetch_from(&self.root_dir_file)?;
        let sector = root.search_dir_path(&self.device, path, 0)?;
        let mut out = Vec::new();
        if sector == ROOT_DIR_SECTOR {
            root.list(&self.device, "", recursive, &mut out)?;
        } else {
            let file = OpenFile::new(Arc::clone(&self.device), sector)?;
            let dir = Directory::fetch_from(&file)?;
            dir.list(&self.device, path, recursive, &mut out)?;
        }
        Ok(out)
    }

    /// Opens `path` and parks the handle in the registry, returning its
    /// id.
    pub fn open_for_id(&self, registry: &mut OpenFileRegistry<D>, path: &str) -> Result<FileId> {
        let file = self.open(path)?;
        registry.insert(file).ok_or(FsError::OutOfHandles)
    }

    /// Reads from a registered handle's seek position, advancing it.
    pub fn read_by_id(
        &self,
        registry: &mut OpenFileRegistry<D>,
        id: FileId,
        buf: &mut [u8],
    ) -> Result<usize> {
        let file = registry.get_mut(id).ok_or(FsError::NotFound)?;
        file.read(buf)
    }

    /// Writes at a registered handle's seek position, advancing it.
    pub fn write_by_id(
        &self,
        registry: &mut OpenFileRegistry<D>,
        id: FileId,
        buf: &[u8],
    ) -> Result<usize> {
        let file = registry.get_mut(id).ok_or(FsError::NotFound)?;
        file.write(buf)
    }

    /// Closes a registered handle. Unknown or already-closed ids return
    /// false.
    pub fn close_by_id(&self, registry: &mut OpenFileRegistry<D>, id: FileId) -> bool {
        registry.remove(id).is_some()
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }
}

/// Splits an absolute path at its last `/` into the parent path and the
/// leaf name (without the slash). Paths containing no `/` at all are
/// invalid.
/// eg. "/home/user/file.txt" -> ("/home/user", "file.txt")
///     "/file.txt" -> ("", "file.txt")
fn split_path(path: &str) -> Result<(&str, &str)> {
    let mark = path.rfind('/').ok_or(FsError::InvalidPath)?;
    let base = &path[..mark];
    let leaf = &path[mark + 1..];
    if leaf.is_empty() {
        return Err(FsError::InvalidPath);
    }
    if leaf.len() > NAME_MAX_LEN {
        return Err(FsError::NameTooLong);
    }
    Ok((base, leaf))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/a").unwrap(), ("", "a"));
        assert_eq!(split_path("/d/x").unwrap(), ("/d", "x"));
        assert_eq!(split_path("/a/b/c").unwrap(), ("/a/b", "c"));
    }

    #[test]
    fn test_split_path_invalid() {
        assert_eq!(split_path("no_slash"), Err(FsError::InvalidPath));
        assert_eq!(split_path("/"), Err(FsError::InvalidPath));
        assert_eq!(split_path("/trailing/"), Err(FsError::InvalidPath));
        assert_eq!(split_path("/a_far_too_long_name"), Err(FsError::NameTooLong));
    }
}
