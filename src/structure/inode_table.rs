use crate::consts::{BlockPointer, InodePointer, INODE_BLOCK_OFFSET, INODE_SIZE, INODE_TOTAL};
use crate::driver::DeviceDriver;
use crate::error::{FsError, Result};
use crate::store::BlockStore;
use crate::structure::inode::Inode;
use crate::util::serializable::{ByteSerializable, KnownSize};

#[inline]
fn inode_block(inode: InodePointer) -> BlockPointer {
    INODE_BLOCK_OFFSET + (inode >> 3) as BlockPointer
}

#[inline]
fn inode_offset(inode: InodePointer) -> usize {
    (inode & 0x07) as usize * INODE_SIZE
}

pub(crate) fn load_inode<D: DeviceDriver>(
    store: &BlockStore<D>,
    inode: InodePointer,
) -> Result<Inode> {
    let mut buffer = vec![0u8; Inode::size_on_disk()];
    store.read_at(inode_block(inode), &mut buffer, inode_offset(inode))?;
    Ok(Inode::from_bytes(&buffer))
}

pub(crate) fn write_inode<D: DeviceDriver>(
    store: &mut BlockStore<D>,
    inode: InodePointer,
    record: &Inode,
) -> Result<()> {
    store.write_at(inode_block(inode), &record.to_bytes(), inode_offset(inode))
}

/// First free slot of the table, by the empty-name invariant. Root (id 0) is
/// never a candidate. Linear, rescanned on every create; fine at 256 records.
pub(crate) fn find_free_inode<D: DeviceDriver>(store: &BlockStore<D>) -> Result<InodePointer> {
    for id in 1..INODE_TOTAL {
        let inode = load_inode(store, id as InodePointer)?;
        if inode.is_free() {
            return Ok(id as InodePointer);
        }
    }
    Err(FsError::InodesExhausted)
}

#[cfg(test)]
mod tests {
    use crate::structure::inode::Inode;
    use crate::testutil::{format_store, fresh_image};

    #[test]
    fn block_and_offset_arithmetic() {
        assert_eq!(super::inode_block(0), 8);
        assert_eq!(super::inode_block(7), 8);
        assert_eq!(super::inode_block(8), 9);
        assert_eq!(super::inode_block(255), 39);
        assert_eq!(super::inode_offset(0), 0);
        assert_eq!(super::inode_offset(7), 896);
        assert_eq!(super::inode_offset(8), 0);
    }

    #[test]
    fn records_round_trip_across_table_blocks() {
        let path = fresh_image("inode_table_round_trip.img");
        let mut store = format_store(&path);

        for id in [1u8, 7, 8, 255] {
            let record = Inode::new_regular(&format!("file{}", id), 0);
            super::write_inode(&mut store, id, &record).unwrap();
            assert_eq!(super::load_inode(&store, id).unwrap(), record);
        }
        // Neighbors are untouched by the partial writes.
        assert!(super::load_inode(&store, 9).unwrap().is_free());
    }

    #[test]
    fn free_scan_skips_root_and_allocated_slots() {
        let path = fresh_image("inode_table_free_scan.img");
        let mut store = format_store(&path);

        assert_eq!(super::find_free_inode(&store).unwrap(), 1);
        super::write_inode(&mut store, 1, &Inode::new_regular("a", 0)).unwrap();
        assert_eq!(super::find_free_inode(&store).unwrap(), 2);

        // Clearing the record frees the slot again.
        super::write_inode(&mut store, 1, &Inode::blank()).unwrap();
        assert_eq!(super::find_free_inode(&store).unwrap(), 1);
    }

    #[test]
    fn exhausted_table_reports_as_such() {
        let path = fresh_image("inode_table_exhausted.img");
        let mut store = format_store(&path);

        for id in 1..=255u8 {
            super::write_inode(&mut store, id, &Inode::new_regular("x", 0)).unwrap();
        }
        assert!(matches!(
            super::find_free_inode(&store),
            Err(crate::error::FsError::InodesExhausted)
        ));
    }
}
