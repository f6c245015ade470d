use crate::consts::{
    BlockPointer, FileName, InodePointer, BLOCK_SIZE, DATA_BLOCK_OFFSET, DIR_ENTRY_MAX, FNAME_MAX,
    FNAME_SIZE,
};
use crate::driver::DeviceDriver;
use crate::error::{FsError, Result};
use crate::store::BlockStore;
use crate::structure::inode::{pack_name, unpack_name, Inode};
use crate::util::serializable::{ByteSerializable, KnownSize};

const ENTRY_SIZE: usize = FNAME_SIZE + 1;
const ENTRIES_OFFSET: usize = 44;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DirEntry {
    pub name: FileName,
    pub inode: InodePointer,
}

impl DirEntry {
    fn empty() -> DirEntry {
        DirEntry { name: [0u8; FNAME_SIZE], inode: 0 }
    }

    fn is_free(&self) -> bool {
        self.name[0] == 0
    }
}

/// A directory's single data block: a size counter and 20 slots. Slots are
/// NOT kept contiguous; a slot is free when its name is empty. Invariant:
/// `size` equals the number of occupied slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DirectoryBlock {
    pub size: u32,
    entries: [DirEntry; DIR_ENTRY_MAX],
}

impl DirectoryBlock {
    pub fn empty() -> DirectoryBlock {
        DirectoryBlock { size: 0, entries: [DirEntry::empty(); DIR_ENTRY_MAX] }
    }

    pub fn find(&self, name: &str) -> Option<InodePointer> {
        let packed = pack_name(name);
        self.entries
            .iter()
            .find(|entry| !entry.is_free() && entry.name == packed)
            .map(|entry| entry.inode)
    }

    /// Takes the first free slot; the caller has already checked the name is
    /// absent.
    pub fn insert(&mut self, name: &str, inode: InodePointer) -> Result<()> {
        if self.size as usize >= DIR_ENTRY_MAX {
            return Err(FsError::DirectoryFull);
        }
        let slot = self
            .entries
            .iter_mut()
            .find(|entry| entry.is_free())
            .ok_or(FsError::DirectoryFull)?;
        slot.name = pack_name(name);
        slot.inode = inode;
        self.size += 1;
        Ok(())
    }

    /// Clears the matching slot and drops the count. Gaps are left in place;
    /// the layout never required contiguity and insertion fills gaps first.
    pub fn remove(&mut self, name: &str) -> Option<InodePointer> {
        let packed = pack_name(name);
        for entry in self.entries.iter_mut() {
            if !entry.is_free() && entry.name == packed {
                let inode = entry.inode;
                *entry = DirEntry::empty();
                self.size -= 1;
                return Some(inode);
            }
        }
        None
    }

    pub fn entries(&self) -> impl Iterator<Item = (String, InodePointer)> + '_ {
        self.entries
            .iter()
            .filter(|entry| !entry.is_free())
            .map(|entry| (unpack_name(&entry.name), entry.inode))
    }
}

impl KnownSize for DirectoryBlock {
    fn size_on_disk() -> usize {
        BLOCK_SIZE
    }
}

impl ByteSerializable for DirectoryBlock {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(BLOCK_SIZE);
        bytes.extend_from_slice(&self.size.to_le_bytes());
        bytes.extend_from_slice(&[0u8; ENTRIES_OFFSET - 4]);
        for entry in &self.entries {
            bytes.extend_from_slice(&entry.name);
            bytes.push(entry.inode);
        }
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let size = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let mut entries = [DirEntry::empty(); DIR_ENTRY_MAX];
        for (i, entry) in entries.iter_mut().enumerate() {
            let at = ENTRIES_OFFSET + i * ENTRY_SIZE;
            entry.name.copy_from_slice(&bytes[at..at + FNAME_SIZE]);
            entry.inode = bytes[at + FNAME_SIZE];
        }
        DirectoryBlock { size, entries }
    }
}

/// One directory lookup: the loaded inode, its block, and the match if any.
pub(crate) struct DirScan {
    pub dir: Inode,
    pub block: DirectoryBlock,
    pub entry: Option<InodePointer>,
}

pub(crate) fn load_dir_block<D: DeviceDriver>(
    store: &BlockStore<D>,
    dir: &Inode,
) -> Result<DirectoryBlock> {
    let block = dir.pointers[0];
    if block < DATA_BLOCK_OFFSET {
        return Err(FsError::BadBlock(block));
    }
    Ok(DirectoryBlock::from_bytes(&store.read_block(block)?))
}

pub(crate) fn write_dir_block<D: DeviceDriver>(
    store: &mut BlockStore<D>,
    dir: &Inode,
    block: &DirectoryBlock,
) -> Result<()> {
    let pointer: BlockPointer = dir.pointers[0];
    if pointer < DATA_BLOCK_OFFSET {
        return Err(FsError::BadBlock(pointer));
    }
    store.write_block(pointer, &block.to_bytes())
}

/// Loads `dir_id`, verifies it is a directory, and looks `name` up in its
/// block with a case-sensitive linear match.
pub(crate) fn scan<D: DeviceDriver>(
    store: &BlockStore<D>,
    dir_id: InodePointer,
    name: &str,
) -> Result<DirScan> {
    if name.len() > FNAME_MAX {
        return Err(FsError::NameTooLong);
    }
    let dir = crate::structure::inode_table::load_inode(store, dir_id)?;
    if !dir.is_directory() {
        return Err(FsError::NotADirectory);
    }
    let block = load_dir_block(store, &dir)?;
    let entry = block.find(name);
    Ok(DirScan { dir, block, entry })
}
