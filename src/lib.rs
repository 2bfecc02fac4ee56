//! Sectorfs is a tiny hierarchical file system for fixed-geometry block
//! devices, built for teaching. No permissions, timestamps, journaling,
//! or concurrency control; file sizes are fixed at creation.
//!
//! On-disk layout:
//! - Sector 0: header of the free-map file
//! - Sector 1: header of the root-directory file
//! - Everywhere else: file headers, indirect headers, directory tables,
//!   and raw data, wherever the free map places them
//!
//! Sectorfs's layers (from bottom to top):
//! 1. Block Device: abstraction for low level devices.  Sector IO sync   | User implemented (hardware-specific)
//! 2. Free Map: persistent bitmap of allocated sectors.                  | Fs implemented
//! 3. File Header: per-file index block, direct plus one indirect level. | Fs implemented
//! 4. Open File: offset-to-sector translation, length-clamped IO.        | Fs implemented
//! 5. Directory: fixed name tables, path walking, subtree teardown.      | Fs implemented
//! 6. FileSystem: the facade callers drive (create/open/remove/list).    | User facing (kernel shim, process tables, etc.)

#![allow(unused)]

extern crate alloc;

mod block_dev;
mod config;
mod directory;
mod error;
mod file;
mod freemap;
mod fs;
mod header;
mod registry;

pub use block_dev::BlockDevice;
pub use config::*;
pub use directory::{DirEntry, DirTarget, Directory};
pub use error::FsError as Error;
pub use error::{FsError, Result};
pub use file::OpenFile;
pub use freemap::FreeMap;
pub use fs::FileSystem;
pub use header::FileHeader;
pub use registry::{FileId, OpenFileRegistry};
