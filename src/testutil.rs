use std::path::{Path, PathBuf};

use crate::consts::{DATA_BLOCK_OFFSET, INODE_BLOCK_OFFSET};
use crate::driver::file_drive::FileDrive;
use crate::store::BlockStore;

/// Path for a scratch volume image, cleared of any previous run's leftovers.
pub(crate) fn fresh_image(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("f15fs-{}", name));
    let _ = std::fs::remove_file(&path);
    path
}

/// A store with the inode table range reserved, as a formatter would leave it.
pub(crate) fn format_store(path: &Path) -> BlockStore<FileDrive> {
    let mut store = BlockStore::create(path).unwrap();
    for block in INODE_BLOCK_OFFSET..DATA_BLOCK_OFFSET {
        store.request(block).unwrap();
    }
    store
}
