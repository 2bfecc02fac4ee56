//! Fixed-capacity table of open files backing the id-based kernel
//! surface. The table is an explicit value handed to the facade, never
//! process-wide state, so harnesses can hold as many as they like.

use alloc::vec::Vec;

use crate::config::MAX_OPEN_FILES;
use crate::file::OpenFile;
use crate::BlockDevice;

pub type FileId = usize;

/// Slots indexed 1..=MAX_OPEN_FILES; id 0 is never handed out.
#[derive(Debug)]
pub struct OpenFileRegistry<D: BlockDevice> {
    slots: Vec<Option<OpenFile<D>>>,
}

impl<D: BlockDevice> OpenFileRegistry<D> {
    pub fn new() -> Self {
        let mut slots = Vec::new();
        slots.resize_with(MAX_OPEN_FILES + 1, || None);
        OpenFileRegistry { slots }
    }

    /// Parks a handle in the lowest free slot, or `None` if the table is
    /// full.
    pub fn insert(&mut self, file: OpenFile<D>) -> Option<FileId> {
        let id = (1..=MAX_OPEN_FILES).find(|&id| self.slots[id].is_none())?;
        self.slots[id] = Some(file);
        Some(id)
    }

    pub fn get_mut(&mut self, id: FileId) -> Option<&mut OpenFile<D>> {
        self.slots.get_mut(id)?.as_mut()
    }

    /// Vacates a slot, returning the handle if one was present.
    pub fn remove(&mut self, id: FileId) -> Option<OpenFile<D>> {
        self.slots.get_mut(id)?.take()
    }
}

impl<D: BlockDevice> Default for OpenFileRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}
