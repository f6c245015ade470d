use std::io;
use std::path::Path;

use log::debug;

use crate::consts::{
    BlockPointer, BLOCK_SIZE, BLOCK_TOTAL, DATA_BLOCK_OFFSET, FREE_MAP_BLOCKS,
};
use crate::driver::file_drive::FileDrive;
use crate::driver::DeviceDriver;
use crate::error::{FsError, Result};
use raw::{raw_read_block, raw_write_block};

mod raw;

const SECTOR_SIZE: usize = 512;
const VOLUME_BYTES: u64 = BLOCK_TOTAL as u64 * BLOCK_SIZE as u64;
const MAP_BYTES: usize = (BLOCK_TOTAL / 8) as usize;

/// Fixed-geometry block store: 65536 blocks of 1024 bytes, with the
/// allocation bitmap persisted in blocks 0-7. Blocks below the data pool
/// offset are metadata territory and are never handed out by `allocate`.
pub struct BlockStore<D: DeviceDriver> {
    device: D,
    map: Vec<u8>,
}

impl BlockStore<FileDrive> {
    pub fn create(path: &Path) -> Result<BlockStore<FileDrive>> {
        let device = FileDrive::create(path, VOLUME_BYTES, SECTOR_SIZE)?;
        BlockStore::create_on(device)
    }

    pub fn import(path: &Path) -> Result<BlockStore<FileDrive>> {
        let device = FileDrive::open(path, SECTOR_SIZE)?;
        BlockStore::import_on(device)
    }
}

impl<D: DeviceDriver> BlockStore<D> {
    /// Initializes a store on a fresh device; the bitmap blocks reserve
    /// themselves.
    pub fn create_on(device: D) -> Result<BlockStore<D>> {
        Self::check_geometry(&device)?;
        let mut store = BlockStore { device, map: vec![0u8; MAP_BYTES] };
        for block in 0..FREE_MAP_BLOCKS {
            store.mark_used_mem(block);
        }
        store.write_map_part(0)?;
        Ok(store)
    }

    /// Attaches to an existing volume and reads the persisted bitmap back.
    pub fn import_on(device: D) -> Result<BlockStore<D>> {
        Self::check_geometry(&device)?;
        let mut map = vec![0u8; MAP_BYTES];
        for i in 0..FREE_MAP_BLOCKS {
            let block = raw_read_block(&device, i)?;
            map[i as usize * BLOCK_SIZE..(i as usize + 1) * BLOCK_SIZE].copy_from_slice(&block);
        }
        let store = BlockStore { device, map };
        for block in 0..FREE_MAP_BLOCKS {
            if store.is_free(block) {
                return Err(FsError::BadVolume("allocation bitmap is not initialized"));
            }
        }
        Ok(store)
    }

    fn check_geometry(device: &D) -> Result<()> {
        if device.sector_size() == 0 || BLOCK_SIZE % device.sector_size() != 0 {
            return Err(FsError::BadVolume("sector size does not divide the block size"));
        }
        if device.sector_count() * device.sector_size() as u64 != VOLUME_BYTES {
            return Err(FsError::BadVolume("device does not hold exactly 65536 blocks"));
        }
        Ok(())
    }

    /// Reserves a specific block. Only meaningful for the metadata range a
    /// formatter lays out by hand.
    pub fn request(&mut self, block: BlockPointer) -> Result<()> {
        self.check_range(block)?;
        if self.is_used(block) {
            return Err(FsError::InvalidArgument("requested block is already in use"));
        }
        self.mark_used(block)
    }

    /// Reserves the first free block of the data pool.
    pub fn allocate(&mut self) -> Result<BlockPointer> {
        for block in DATA_BLOCK_OFFSET..BLOCK_TOTAL {
            if self.is_free(block) {
                self.mark_used(block)?;
                return Ok(block);
            }
        }
        Err(FsError::BlocksExhausted)
    }

    pub fn release(&mut self, block: BlockPointer) -> Result<()> {
        if block < DATA_BLOCK_OFFSET || block >= BLOCK_TOTAL {
            return Err(FsError::BadBlock(block));
        }
        self.mark_free(block)
    }

    pub fn read_block(&self, block: BlockPointer) -> Result<Vec<u8>> {
        self.check_range(block)?;
        let buffer = raw_read_block(&self.device, block)?;
        if buffer.len() != BLOCK_SIZE {
            return Err(FsError::Device(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "short block read",
            )));
        }
        Ok(buffer)
    }

    pub fn write_block(&mut self, block: BlockPointer, data: &[u8]) -> Result<()> {
        self.check_range(block)?;
        if data.len() != BLOCK_SIZE {
            return Err(FsError::InvalidArgument("block write must cover a full block"));
        }
        raw_write_block(&mut self.device, block, data)?;
        Ok(())
    }

    /// Reads `buffer.len()` bytes starting at `offset` within one block.
    pub fn read_at(&self, block: BlockPointer, buffer: &mut [u8], offset: usize) -> Result<()> {
        if offset + buffer.len() > BLOCK_SIZE {
            return Err(FsError::InvalidArgument("partial read crosses the block end"));
        }
        let full = self.read_block(block)?;
        buffer.copy_from_slice(&full[offset..offset + buffer.len()]);
        Ok(())
    }

    /// Writes `data` at `offset` within one block, read-modify-write.
    pub fn write_at(&mut self, block: BlockPointer, data: &[u8], offset: usize) -> Result<()> {
        if offset + data.len() > BLOCK_SIZE {
            return Err(FsError::InvalidArgument("partial write crosses the block end"));
        }
        let mut full = self.read_block(block)?;
        full[offset..offset + data.len()].copy_from_slice(data);
        self.write_block(block, &full)
    }

    /// Pushes everything down to the device. The only durability point.
    pub fn flush(&mut self) -> Result<()> {
        self.device.sync()?;
        Ok(())
    }

    fn check_range(&self, block: BlockPointer) -> Result<()> {
        // The bitmap's own blocks are not addressable from outside.
        if block < FREE_MAP_BLOCKS || block >= BLOCK_TOTAL {
            return Err(FsError::BadBlock(block));
        }
        Ok(())
    }

    fn is_free(&self, block: BlockPointer) -> bool {
        self.map[(block / 8) as usize] & (1 << (block % 8)) == 0
    }

    fn is_used(&self, block: BlockPointer) -> bool {
        !self.is_free(block)
    }

    fn mark_used_mem(&mut self, block: BlockPointer) {
        self.map[(block / 8) as usize] |= 1 << (block % 8);
    }

    fn mark_free_mem(&mut self, block: BlockPointer) {
        self.map[(block / 8) as usize] &= !(1 << (block % 8));
    }

    fn mark_used(&mut self, block: BlockPointer) -> Result<()> {
        self.mark_used_mem(block);
        self.write_map_part(block)
    }

    fn mark_free(&mut self, block: BlockPointer) -> Result<()> {
        self.mark_free_mem(block);
        self.write_map_part(block)
    }

    /// Persists the bitmap block covering `block`.
    fn write_map_part(&mut self, block: BlockPointer) -> Result<()> {
        let map_block = (block / 8) as usize / BLOCK_SIZE;
        let data =
            self.map[map_block * BLOCK_SIZE..(map_block + 1) * BLOCK_SIZE].to_vec();
        raw_write_block(&mut self.device, map_block as BlockPointer, &data)?;
        debug!("bitmap block {} rewritten", map_block);
        Ok(())
    }
}
