use std::ffi::OsStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyWrite, Request,
};
use libc::{c_int, EINVAL};
use log::debug;

use crate::consts::{InodePointer, BLOCK_SIZE, INODE_TOTAL};
use crate::driver::file_drive::FileDrive;
use crate::error::FsError;
use crate::fs::F15FS;
use crate::structure::inode::{FileKind, Inode};

const TTL: Duration = Duration::from_secs(1);

/// The kernel numbers inodes from 1; the volume numbers them from 0.
fn ino_to_id(ino: u64) -> Option<InodePointer> {
    if (1..=INODE_TOTAL as u64).contains(&ino) {
        Some((ino - 1) as InodePointer)
    } else {
        None
    }
}

fn id_to_ino(id: InodePointer) -> u64 {
    id as u64 + 1
}

fn timestamp(seconds: u32) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(seconds as u64)
}

pub(crate) struct F15Fuse {
    fs: F15FS<FileDrive>,
    uid: u32,
    gid: u32,
}

impl F15Fuse {
    pub fn new(fs: F15FS<FileDrive>) -> F15Fuse {
        F15Fuse { fs, uid: 0, gid: 0 }
    }

    fn attr(&self, id: InodePointer, inode: &Inode) -> FileAttr {
        let directory = inode.is_directory();
        let size = inode.meta.size as u64;
        FileAttr {
            ino: id_to_ino(id),
            size,
            blocks: size.div_ceil(BLOCK_SIZE as u64),
            atime: timestamp(inode.meta.accessed),
            mtime: timestamp(inode.meta.modified),
            ctime: timestamp(inode.meta.modified),
            crtime: timestamp(inode.meta.created),
            kind: if directory { FileType::Directory } else { FileType::RegularFile },
            perm: if directory { 0o755 } else { 0o644 },
            nlink: if directory { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            flags: 0,
            blksize: BLOCK_SIZE as u32,
        }
    }
}

impl Filesystem for F15Fuse {
    fn init(&mut self, req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        self.uid = req.uid();
        self.gid = req.gid();
        Ok(())
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let (Some(parent), Some(name)) = (ino_to_id(parent), name.to_str()) else {
            reply.error(EINVAL);
            return;
        };
        match self.fs.lookup_in(parent, name) {
            Ok((id, inode)) => reply.entry(&TTL, &self.attr(id, &inode), 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let Some(id) = ino_to_id(ino) else {
            reply.error(EINVAL);
            return;
        };
        match self.fs.stat(id) {
            Ok(inode) => reply.attr(&TTL, &self.attr(id, &inode)),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let (Some(parent), Some(name)) = (ino_to_id(parent), name.to_str()) else {
            reply.error(EINVAL);
            return;
        };
        match self
            .fs
            .create_in(parent, name, FileKind::Directory)
            .and_then(|id| Ok((id, self.fs.stat(id)?)))
        {
            Ok((id, inode)) => reply.entry(&TTL, &self.attr(id, &inode), 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let (Some(parent), Some(name)) = (ino_to_id(parent), name.to_str()) else {
            reply.error(EINVAL);
            return;
        };
        let result = self.fs.lookup_in(parent, name).and_then(|(id, inode)| {
            if inode.is_directory() {
                return Err(FsError::IsADirectory);
            }
            self.fs.remove_inode(id)
        });
        match result {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let (Some(parent), Some(name)) = (ino_to_id(parent), name.to_str()) else {
            reply.error(EINVAL);
            return;
        };
        let result = self.fs.lookup_in(parent, name).and_then(|(id, inode)| {
            if !inode.is_directory() {
                return Err(FsError::NotADirectory);
            }
            self.fs.remove_inode(id)
        });
        match result {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (Some(parent), Some(newparent)) = (ino_to_id(parent), ino_to_id(newparent)) else {
            reply.error(EINVAL);
            return;
        };
        let (Some(name), Some(newname)) = (name.to_str(), newname.to_str()) else {
            reply.error(EINVAL);
            return;
        };
        match self.fs.rename_in(parent, name, newparent, newname) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let (Some(parent), Some(name)) = (ino_to_id(parent), name.to_str()) else {
            reply.error(EINVAL);
            return;
        };
        match self
            .fs
            .create_in(parent, name, FileKind::Regular)
            .and_then(|id| Ok((id, self.fs.stat(id)?)))
        {
            Ok((id, inode)) => reply.created(&TTL, &self.attr(id, &inode), 0, 0, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let (Some(id), Ok(offset)) = (ino_to_id(ino), u64::try_from(offset)) else {
            reply.error(EINVAL);
            return;
        };
        match self.fs.read_inode_data(id, offset, size as usize) {
            Ok(data) => reply.data(&data),
            // The kernel expects a short read at the end, not a failure.
            Err(FsError::OffsetBeyondEof) => reply.data(&[]),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let (Some(id), Ok(offset)) = (ino_to_id(ino), u64::try_from(offset)) else {
            reply.error(EINVAL);
            return;
        };
        match self.fs.write_inode_data(id, offset, data) {
            Ok(written) => reply.written(written as u32),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        match self.fs.sync() {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(id) = ino_to_id(ino) else {
            reply.error(EINVAL);
            return;
        };
        // Directories hold at most 20 entries; everything fits one batch.
        if offset > 0 {
            reply.ok();
            return;
        }
        let parent = match self.fs.stat(id) {
            Ok(inode) => inode.meta.parent,
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };
        match self.fs.entries_in(id) {
            Ok(entries) => {
                debug!("readdir of ino {}: {} entries", ino, entries.len());
                let _ = reply.add(id_to_ino(id), 1, FileType::Directory, ".");
                let _ = reply.add(id_to_ino(parent), 2, FileType::Directory, "..");
                for (i, (child, name, kind)) in entries.iter().enumerate() {
                    let kind = match kind {
                        FileKind::Directory => FileType::Directory,
                        FileKind::Regular => FileType::RegularFile,
                    };
                    if reply.add(id_to_ino(*child), (i + 3) as i64, kind, name) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(err) => reply.error(err.errno()),
        }
    }
}
