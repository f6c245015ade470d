pub(crate) const BLOCK_SIZE: usize = 1024;
pub(crate) const BLOCK_TOTAL: u32 = 65536;

// Blocks 0-7 hold the block store's allocation bitmap.
pub(crate) const FREE_MAP_BLOCKS: u32 = 8;

// Blocks 8-39 hold the inode table, 8 records per block.
pub(crate) const INODE_BLOCK_OFFSET: u32 = 8;
pub(crate) const INODE_BLOCK_TOTAL: u32 = 32;
pub(crate) const INODE_SIZE: usize = 128;
pub(crate) const INODE_TOTAL: usize = 256;

// Blocks 40+ are the data pool.
pub(crate) const DATA_BLOCK_OFFSET: u32 = INODE_BLOCK_OFFSET + INODE_BLOCK_TOTAL;

pub(crate) const FNAME_MAX: usize = 47;
pub(crate) const FNAME_SIZE: usize = FNAME_MAX + 1;
pub(crate) const DIR_ENTRY_MAX: usize = 20;

pub(crate) const BLOCK_PTR_TOTAL: usize = 8;
pub(crate) const DIRECT_TOTAL: usize = 6;
pub(crate) const INDIRECT_SLOT: usize = 6;
pub(crate) const DBL_INDIRECT_SLOT: usize = 7;
pub(crate) const INDIRECT_TOTAL: usize = BLOCK_SIZE / 4;
pub(crate) const DBL_INDIRECT_TOTAL: usize = INDIRECT_TOTAL * INDIRECT_TOTAL;
pub(crate) const FILE_BLOCK_MAX: usize = DIRECT_TOTAL + INDIRECT_TOTAL + DBL_INDIRECT_TOTAL;
pub(crate) const FILE_SIZE_MAX: u64 = (FILE_BLOCK_MAX * BLOCK_SIZE) as u64;

// 255 components of 47 bytes plus separators is ~12.2k; over-allocate a little.
pub(crate) const FS_PATH_MAX: usize = 13000;

pub type BlockPointer = u32;
pub type InodePointer = u8;
pub type FileName = [u8; FNAME_SIZE];
pub type DirectPointers = [BlockPointer; BLOCK_PTR_TOTAL];
