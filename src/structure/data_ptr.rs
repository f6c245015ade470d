use log::warn;

use crate::consts::{
    BlockPointer, InodePointer, BLOCK_SIZE, DATA_BLOCK_OFFSET, DBL_INDIRECT_SLOT, DIRECT_TOTAL,
    FILE_BLOCK_MAX, INDIRECT_SLOT, INDIRECT_TOTAL,
};
use crate::driver::DeviceDriver;
use crate::error::{FsError, Result};
use crate::store::BlockStore;
use crate::structure::inode::Inode;
use crate::structure::inode_table::write_inode;

type PointerBlock = [BlockPointer; INDIRECT_TOTAL];

/// Which pointer tier a byte offset lands in, and the index path through it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockPath {
    Direct { slot: usize },
    Indirect { index: usize },
    DoubleIndirect { outer: usize, inner: usize },
}

impl BlockPath {
    pub fn classify(offset: u64) -> Result<BlockPath> {
        let block_index = (offset / BLOCK_SIZE as u64) as usize;
        if block_index < DIRECT_TOTAL {
            Ok(BlockPath::Direct { slot: block_index })
        } else if block_index < DIRECT_TOTAL + INDIRECT_TOTAL {
            Ok(BlockPath::Indirect { index: block_index - DIRECT_TOTAL })
        } else if block_index < FILE_BLOCK_MAX {
            let relative = block_index - DIRECT_TOTAL - INDIRECT_TOTAL;
            Ok(BlockPath::DoubleIndirect { outer: relative >> 8, inner: relative & 0xff })
        } else {
            Err(FsError::FileTooLarge)
        }
    }
}

fn check_data_block(block: BlockPointer) -> Result<BlockPointer> {
    if block < DATA_BLOCK_OFFSET {
        return Err(FsError::BadBlock(block));
    }
    Ok(block)
}

fn read_pointer_block<D: DeviceDriver>(
    store: &BlockStore<D>,
    block: BlockPointer,
) -> Result<PointerBlock> {
    check_data_block(block)?;
    let bytes = store.read_block(block)?;
    let mut pointers = [0 as BlockPointer; INDIRECT_TOTAL];
    for (i, pointer) in pointers.iter_mut().enumerate() {
        *pointer = u32::from_le_bytes([
            bytes[i * 4],
            bytes[i * 4 + 1],
            bytes[i * 4 + 2],
            bytes[i * 4 + 3],
        ]);
    }
    Ok(pointers)
}

fn write_pointer_block<D: DeviceDriver>(
    store: &mut BlockStore<D>,
    block: BlockPointer,
    pointers: &PointerBlock,
) -> Result<()> {
    check_data_block(block)?;
    let mut bytes = Vec::with_capacity(BLOCK_SIZE);
    for pointer in pointers {
        bytes.extend_from_slice(&pointer.to_le_bytes());
    }
    store.write_block(block, &bytes)
}

/// Resolves without allocating. Readers only ask for offsets below the
/// inode's recorded size, so a zero pointer here means the volume lies about
/// its own contents.
pub(crate) fn resolve_for_read<D: DeviceDriver>(
    store: &BlockStore<D>,
    inode: &Inode,
    path: BlockPath,
) -> Result<BlockPointer> {
    let present = |block: BlockPointer| {
        if block == 0 {
            Err(FsError::MissingBlock)
        } else {
            check_data_block(block)
        }
    };

    match path {
        BlockPath::Direct { slot } => present(inode.pointers[slot]),
        BlockPath::Indirect { index } => {
            let root = present(inode.pointers[INDIRECT_SLOT])?;
            present(read_pointer_block(store, root)?[index])
        }
        BlockPath::DoubleIndirect { outer, inner } => {
            let root = present(inode.pointers[DBL_INDIRECT_SLOT])?;
            let indirect = present(read_pointer_block(store, root)?[outer])?;
            present(read_pointer_block(store, indirect)?[inner])
        }
    }
}

/// Resolves the backing block for a write, allocating whatever part of the
/// chain is missing. New pointer blocks are zero-filled and written before
/// anything links to them, and the inode record is persisted last, so a
/// failure partway through never leaves the inode pointing at an unlinked
/// block. Blocks allocated by a failed call are returned to the store.
pub(crate) fn resolve_for_write<D: DeviceDriver>(
    store: &mut BlockStore<D>,
    id: InodePointer,
    inode: &mut Inode,
    path: BlockPath,
) -> Result<BlockPointer> {
    let mut fresh: Vec<BlockPointer> = Vec::new();
    match resolve_or_allocate(store, id, inode, path, &mut fresh) {
        Ok(block) => Ok(block),
        Err(err) => {
            for block in fresh {
                if store.release(block).is_err() {
                    warn!("could not return block {} to the store during rollback", block);
                }
            }
            Err(err)
        }
    }
}

/// `store.allocate` that records the grant in `fresh` for rollback.
fn allocate<D: DeviceDriver>(
    store: &mut BlockStore<D>,
    fresh: &mut Vec<BlockPointer>,
) -> Result<BlockPointer> {
    let block = store.allocate()?;
    fresh.push(block);
    Ok(block)
}

fn resolve_or_allocate<D: DeviceDriver>(
    store: &mut BlockStore<D>,
    id: InodePointer,
    inode: &mut Inode,
    path: BlockPath,
    fresh: &mut Vec<BlockPointer>,
) -> Result<BlockPointer> {
    match path {
        BlockPath::Direct { slot } => {
            if inode.pointers[slot] != 0 {
                return check_data_block(inode.pointers[slot]);
            }
            let data = allocate(store, fresh)?;
            let mut updated = *inode;
            updated.pointers[slot] = data;
            write_inode(store, id, &updated)?;
            *inode = updated;
            Ok(data)
        }
        BlockPath::Indirect { index } => {
            let root = inode.pointers[INDIRECT_SLOT];
            if root == 0 {
                // Fresh tier: pointer block plus the data block it carries.
                let indirect = allocate(store, fresh)?;
                let data = allocate(store, fresh)?;
                let mut pointers = [0 as BlockPointer; INDIRECT_TOTAL];
                pointers[index] = data;
                write_pointer_block(store, indirect, &pointers)?;
                let mut updated = *inode;
                updated.pointers[INDIRECT_SLOT] = indirect;
                write_inode(store, id, &updated)?;
                *inode = updated;
                Ok(data)
            } else {
                let mut pointers = read_pointer_block(store, root)?;
                if pointers[index] != 0 {
                    return check_data_block(pointers[index]);
                }
                let data = allocate(store, fresh)?;
                pointers[index] = data;
                write_pointer_block(store, root, &pointers)?;
                Ok(data)
            }
        }
        BlockPath::DoubleIndirect { outer, inner } => {
            let root = inode.pointers[DBL_INDIRECT_SLOT];
            if root == 0 {
                // Whole chain from scratch: outer block, inner block, data.
                let dbl = allocate(store, fresh)?;
                let indirect = allocate(store, fresh)?;
                let data = allocate(store, fresh)?;
                let mut inner_pointers = [0 as BlockPointer; INDIRECT_TOTAL];
                inner_pointers[inner] = data;
                write_pointer_block(store, indirect, &inner_pointers)?;
                let mut outer_pointers = [0 as BlockPointer; INDIRECT_TOTAL];
                outer_pointers[outer] = indirect;
                write_pointer_block(store, dbl, &outer_pointers)?;
                let mut updated = *inode;
                updated.pointers[DBL_INDIRECT_SLOT] = dbl;
                write_inode(store, id, &updated)?;
                *inode = updated;
                Ok(data)
            } else {
                let mut outer_pointers = read_pointer_block(store, root)?;
                if outer_pointers[outer] == 0 {
                    let indirect = allocate(store, fresh)?;
                    let data = allocate(store, fresh)?;
                    let mut inner_pointers = [0 as BlockPointer; INDIRECT_TOTAL];
                    inner_pointers[inner] = data;
                    write_pointer_block(store, indirect, &inner_pointers)?;
                    outer_pointers[outer] = indirect;
                    write_pointer_block(store, root, &outer_pointers)?;
                    Ok(data)
                } else {
                    let indirect = check_data_block(outer_pointers[outer])?;
                    let mut inner_pointers = read_pointer_block(store, indirect)?;
                    if inner_pointers[inner] != 0 {
                        return check_data_block(inner_pointers[inner]);
                    }
                    let data = allocate(store, fresh)?;
                    inner_pointers[inner] = data;
                    write_pointer_block(store, indirect, &inner_pointers)?;
                    Ok(data)
                }
            }
        }
    }
}

/// Returns every block a file references to the store: data blocks, both
/// pointer-block tiers included.
pub(crate) fn release_chain<D: DeviceDriver>(
    store: &mut BlockStore<D>,
    inode: &Inode,
) -> Result<()> {
    for slot in 0..DIRECT_TOTAL {
        if inode.pointers[slot] != 0 {
            store.release(inode.pointers[slot])?;
        }
    }
    if inode.pointers[INDIRECT_SLOT] != 0 {
        release_pointer_block(store, inode.pointers[INDIRECT_SLOT])?;
    }
    let dbl = inode.pointers[DBL_INDIRECT_SLOT];
    if dbl != 0 {
        let outer = read_pointer_block(store, dbl)?;
        for indirect in outer {
            if indirect != 0 {
                release_pointer_block(store, indirect)?;
            }
        }
        store.release(dbl)?;
    }
    Ok(())
}

fn release_pointer_block<D: DeviceDriver>(
    store: &mut BlockStore<D>,
    block: BlockPointer,
) -> Result<()> {
    let pointers = read_pointer_block(store, block)?;
    for pointer in pointers {
        if pointer != 0 {
            store.release(pointer)?;
        }
    }
    store.release(block)
}
