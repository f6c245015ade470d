use std::io;

use crate::consts::{BlockPointer, BLOCK_SIZE};
use crate::driver::DeviceDriver;

pub(crate) fn raw_read_block<D: DeviceDriver>(
    drive: &D,
    index: BlockPointer,
) -> io::Result<Vec<u8>> {
    let sector_size = drive.sector_size();
    if sector_size == BLOCK_SIZE {
        return drive.read_sector(index as u64);
    }

    let ratio = (BLOCK_SIZE / sector_size) as u64;
    let start = index as u64 * ratio;
    let mut buffer = Vec::with_capacity(BLOCK_SIZE);
    for i in start..start + ratio {
        buffer.append(&mut drive.read_sector(i)?);
    }
    Ok(buffer)
}

pub(crate) fn raw_write_block<D: DeviceDriver>(
    drive: &mut D,
    index: BlockPointer,
    data: &[u8],
) -> io::Result<()> {
    let sector_size = drive.sector_size();
    if sector_size == BLOCK_SIZE {
        return drive.write_sector(index as u64, data);
    }

    let ratio = (BLOCK_SIZE / sector_size) as u64;
    let start = index as u64 * ratio;
    for i in start..start + ratio {
        let offset = (i - start) as usize * sector_size;
        drive.write_sector(i, &data[offset..offset + sector_size])?;
    }
    Ok(())
}
