pub const SECTOR_SIZE: usize = 128;

pub const FREEMAP_SECTOR: u32 = 0; // Sector of the free-map file's header
pub const ROOT_DIR_SECTOR: u32 = 1; // Sector of the root directory's header

pub const NUM_DIRECT: usize = 4; // Direct pointer slots in a header
pub const NUM_INDIRECT: usize = 26; // Indirect pointer slots in a header
pub const NUM_SLOTS: usize = NUM_DIRECT + NUM_INDIRECT; // Pointer slots per header sector
pub const NUM_MAX_SECT: usize = NUM_SLOTS; // Data sectors addressable by one indirect header

pub const MAX_FILE_SIZE: usize =
    NUM_DIRECT * SECTOR_SIZE + NUM_INDIRECT * NUM_MAX_SECT * SECTOR_SIZE;

pub const NAME_MAX_LEN: usize = 9; // Entry name length, excluding the NUL pad
pub const DIR_ENTRY_SIZE: usize = 20; // Raw directory entry, naturally aligned
pub const NUM_DIR_ENTRIES: usize = SECTOR_SIZE / DIR_ENTRY_SIZE; // Entries per directory table
pub const DIR_FILE_SIZE: usize = NUM_DIR_ENTRIES * DIR_ENTRY_SIZE; // Body of a directory file

pub const MAX_OPEN_FILES: usize = 20; // Capacity of the open-file registry
