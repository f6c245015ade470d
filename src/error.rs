use std::io;
use std::os::raw::c_int;

use thiserror::Error;

use crate::consts::BlockPointer;

pub type Result<T> = std::result::Result<T, FsError>;

/// Everything a volume operation can fail with.
///
/// Parameter and resolution errors are raised before any state is touched.
/// Capacity and store errors during a multi-block operation may leave earlier
/// sub-steps applied; `Inconsistent` marks the cases where the volume itself
/// is suspect and the caller should re-mount and verify.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("name exceeds the 47-byte limit")]
    NameTooLong,
    #[error("path exceeds the maximum length")]
    PathTooLong,

    #[error("no such file or directory (failed at byte {at} of the path)")]
    NotFound { at: usize },
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("not a regular file")]
    NotARegularFile,

    #[error("file already exists")]
    AlreadyExists,
    #[error("directory is full")]
    DirectoryFull,
    #[error("directory is not empty")]
    DirectoryNotEmpty,
    #[error("inode table is full")]
    InodesExhausted,
    #[error("block store is out of free blocks")]
    BlocksExhausted,
    #[error("maximum file size reached")]
    FileTooLarge,
    #[error("offset is past the end of the file")]
    OffsetBeyondEof,

    #[error("device I/O failed: {0}")]
    Device(#[from] io::Error),
    #[error("block {0} is outside the addressable range")]
    BadBlock(BlockPointer),
    #[error("not an F15FS volume: {0}")]
    BadVolume(&'static str),

    #[error("unallocated block inside file bounds")]
    MissingBlock,
    #[error("volume left in a suspect state: {0}")]
    Inconsistent(&'static str),
}

impl FsError {
    /// Errno for the FUSE boundary.
    pub fn errno(&self) -> c_int {
        match self {
            FsError::InvalidArgument(_) => libc::EINVAL,
            FsError::NameTooLong | FsError::PathTooLong => libc::ENAMETOOLONG,
            FsError::NotFound { .. } => libc::ENOENT,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::NotARegularFile => libc::EPERM,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::DirectoryFull | FsError::InodesExhausted | FsError::BlocksExhausted => {
                libc::ENOSPC
            }
            FsError::DirectoryNotEmpty => libc::ENOTEMPTY,
            FsError::FileTooLarge => libc::EFBIG,
            FsError::OffsetBeyondEof => libc::EINVAL,
            FsError::Device(_) | FsError::BadBlock(_) | FsError::BadVolume(_) => libc::EIO,
            FsError::MissingBlock | FsError::Inconsistent(_) => libc::EIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FsError;

    #[test]
    fn errno_mapping() {
        assert_eq!(FsError::NotFound { at: 0 }.errno(), libc::ENOENT);
        assert_eq!(FsError::DirectoryFull.errno(), libc::ENOSPC);
        assert_eq!(FsError::NameTooLong.errno(), libc::ENAMETOOLONG);
        assert_eq!(FsError::DirectoryNotEmpty.errno(), libc::ENOTEMPTY);
    }
}
