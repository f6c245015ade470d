use crate::consts::{InodePointer, FNAME_MAX, FS_PATH_MAX};
use crate::driver::DeviceDriver;
use crate::error::{FsError, Result};
use crate::store::BlockStore;
use crate::structure::directory;

pub(crate) const ROOT_INODE: InodePointer = 0;

pub(crate) fn check_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(FsError::InvalidArgument("path is empty"));
    }
    if !path.starts_with('/') {
        return Err(FsError::InvalidArgument("path is not absolute"));
    }
    if path.len() >= FS_PATH_MAX {
        return Err(FsError::PathTooLong);
    }
    Ok(())
}

/// Walks the path from the root inode, one directory lookup per component.
/// Leading, trailing and doubled separators are ignored; a path with no
/// components resolves to the root itself. On a miss the error carries the
/// byte offset of the failing component within `path`.
pub(crate) fn locate<D: DeviceDriver>(store: &BlockStore<D>, path: &str) -> Result<InodePointer> {
    check_path(path)?;

    let mut current = ROOT_INODE;
    let mut at = 0;
    for token in path.split('/') {
        if !token.is_empty() {
            if token.len() > FNAME_MAX {
                return Err(FsError::NameTooLong);
            }
            let scan = directory::scan(store, current, token)?;
            match scan.entry {
                Some(child) => current = child,
                None => return Err(FsError::NotFound { at }),
            }
        }
        at += token.len() + 1;
    }
    Ok(current)
}

/// Splits off the final component: `/a/b/c.txt` becomes `("/a/b", "c.txt")`.
/// The parent part keeps its leading slash and may be just `/`.
pub(crate) fn split_parent(path: &str) -> Result<(&str, &str)> {
    check_path(path)?;

    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(FsError::InvalidArgument("path has no final component"));
    }
    let cut = match trimmed.rfind('/') {
        Some(cut) => cut,
        None => return Err(FsError::InvalidArgument("path is not absolute")),
    };
    let name = &trimmed[cut + 1..];
    if name.len() > FNAME_MAX {
        return Err(FsError::NameTooLong);
    }
    let parent = if cut == 0 { "/" } else { &trimmed[..cut] };
    Ok((parent, name))
}
