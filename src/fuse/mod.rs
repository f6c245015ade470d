use std::path::Path;

use fuser::MountOption;

use crate::driver::file_drive::FileDrive;
use crate::error::Result;
use crate::fs::F15FS;
use filesystem::F15Fuse;

mod filesystem;

/// Hands a mounted volume to the kernel. Blocks until the mountpoint is
/// unmounted; the volume is flushed by the session teardown.
pub fn mount(volume: F15FS<FileDrive>, mountpoint: &Path) -> Result<()> {
    let options = [MountOption::FSName("f15fs".to_string()), MountOption::DefaultPermissions];
    fuser::mount2(F15Fuse::new(volume), mountpoint, &options)?;
    Ok(())
}
