use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::driver::DeviceDriver;

/// File-backed device. `create` produces a zeroed image of the requested
/// size, `open` attaches to an existing one.
pub struct FileDrive {
    file: File,
    bytes: u64,
    sector_size: usize,
}

impl FileDrive {
    pub fn create(path: &Path, bytes: u64, sector_size: usize) -> io::Result<FileDrive> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(bytes)?;
        Ok(FileDrive { file, bytes, sector_size })
    }

    pub fn open(path: &Path, sector_size: usize) -> io::Result<FileDrive> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let bytes = file.metadata()?.len();
        Ok(FileDrive { file, bytes, sector_size })
    }
}

impl DeviceDriver for FileDrive {
    fn sector_count(&self) -> u64 {
        self.bytes / self.sector_size as u64
    }

    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn read_sector(&self, index: u64) -> io::Result<Vec<u8>> {
        if index >= self.sector_count() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "sector out of range"));
        }
        let mut buffer = vec![0; self.sector_size];
        self.file
            .read_exact_at(&mut buffer, index * self.sector_size as u64)?;
        Ok(buffer)
    }

    fn write_sector(&mut self, index: u64, data: &[u8]) -> io::Result<()> {
        if data.len() != self.sector_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sector size mismatch - expected {}, got {}", self.sector_size, data.len()),
            ));
        }
        if index >= self.sector_count() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "sector out of range"));
        }
        self.file.write_all_at(data, index * self.sector_size as u64)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::DeviceDriver;
    use crate::testutil::fresh_image;

    #[test]
    fn read_write_sectors() {
        let path = fresh_image("file_drive_read_write.img");
        let mut drive = super::FileDrive::create(&path, 1024 * 512, 512).unwrap();

        let sector0 = vec![0x42; 512];
        let sector1 = vec![0x1; 512];
        let sector1023 = vec![0x52; 512];

        drive.write_sector(0, &sector0).unwrap();
        drive.write_sector(1, &sector1).unwrap();
        drive.write_sector(1023, &sector1023).unwrap();

        assert_eq!(drive.read_sector(0).unwrap(), sector0);
        assert_eq!(drive.read_sector(1).unwrap(), sector1);
        assert_eq!(drive.read_sector(1023).unwrap(), sector1023);
        assert_eq!(drive.read_sector(2).unwrap(), vec![0; 512]);
    }

    #[test]
    fn rejects_out_of_range_and_short_sectors() {
        let path = fresh_image("file_drive_bounds.img");
        let mut drive = super::FileDrive::create(&path, 1024 * 512, 512).unwrap();

        assert!(drive.read_sector(1024).is_err());
        assert!(drive.write_sector(0, &[0u8; 100]).is_err());
    }

    #[test]
    fn reopen_sees_previous_writes() {
        let path = fresh_image("file_drive_reopen.img");
        {
            let mut drive = super::FileDrive::create(&path, 1024 * 512, 512).unwrap();
            drive.write_sector(7, &vec![0x7; 512]).unwrap();
            drive.sync().unwrap();
        }
        let drive = super::FileDrive::open(&path, 512).unwrap();
        assert_eq!(drive.sector_count(), 1024);
        assert_eq!(drive.read_sector(7).unwrap(), vec![0x7; 512]);
    }
}
