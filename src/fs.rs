use std::path::Path;

use log::{info, warn};

use crate::consts::{
    InodePointer, BLOCK_SIZE, DATA_BLOCK_OFFSET, DIR_ENTRY_MAX, FILE_SIZE_MAX, FNAME_MAX,
    INODE_BLOCK_OFFSET,
};
use crate::driver::file_drive::FileDrive;
use crate::driver::DeviceDriver;
use crate::error::{FsError, Result};
use crate::path::{self, ROOT_INODE};
use crate::store::BlockStore;
use crate::structure::data_ptr::{self, BlockPath};
use crate::structure::directory::{self, DirectoryBlock};
use crate::structure::inode::{unix_now, FileKind, Inode};
use crate::structure::inode_table;
use crate::util::serializable::ByteSerializable;

/// One directory listing entry, as reported to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirRecord {
    pub name: String,
    pub kind: FileKind,
}

/// A mounted volume. Owns the block store for its whole mounted lifetime;
/// `unmount` consumes the handle, so a volume cannot be unmounted twice.
pub struct F15FS<D: DeviceDriver> {
    store: BlockStore<D>,
}

impl F15FS<FileDrive> {
    /// Creates and initializes a fresh volume at `path`, then closes it.
    /// Nothing is flushed if initialization fails partway, so a failed format
    /// never leaves behind a volume that would pass `mount`.
    pub fn format(path: &Path) -> Result<()> {
        let mut store = BlockStore::create(path)?;
        Self::initialize(&mut store)?;
        store.flush()?;
        info!("formatted fresh volume at {}", path.display());
        Ok(())
    }

    pub fn mount(path: &Path) -> Result<F15FS<FileDrive>> {
        let store = BlockStore::import(path)?;
        let fs = F15FS { store };
        fs.check_root()?;
        info!("mounted volume at {}", path.display());
        Ok(fs)
    }
}

impl<D: DeviceDriver> F15FS<D> {
    fn initialize(store: &mut BlockStore<D>) -> Result<()> {
        for block in INODE_BLOCK_OFFSET..DATA_BLOCK_OFFSET {
            store.request(block)?;
        }
        let root_block = store.allocate()?;
        store.write_block(root_block, &DirectoryBlock::empty().to_bytes())?;
        inode_table::write_inode(store, ROOT_INODE, &Inode::root(root_block))?;
        Ok(())
    }

    fn check_root(&self) -> Result<()> {
        let root = inode_table::load_inode(&self.store, ROOT_INODE)?;
        if !root.is_directory() || root.pointers[0] < DATA_BLOCK_OFFSET {
            return Err(FsError::BadVolume("no root directory"));
        }
        Ok(())
    }

    /// Flushes and releases the volume.
    pub fn unmount(mut self) -> Result<()> {
        self.store.flush()?;
        info!("volume unmounted");
        Ok(())
    }

    /// Forces pending state down to the device without giving up the handle.
    pub fn sync(&mut self) -> Result<()> {
        self.store.flush()
    }

    // --- path-based surface ---------------------------------------------

    pub fn create(&mut self, path: &str, kind: FileKind) -> Result<()> {
        let (parent_path, name) = path::split_parent(path)?;
        let parent = path::locate(&self.store, parent_path)?;
        self.create_in(parent, name, kind)?;
        Ok(())
    }

    pub fn list_directory(&mut self, path: &str) -> Result<Vec<DirRecord>> {
        let id = path::locate(&self.store, path)?;
        let entries = self.entries_in(id)?;
        Ok(entries
            .into_iter()
            .map(|(_, name, kind)| DirRecord { name, kind })
            .collect())
    }

    pub fn read(&mut self, path: &str, offset: u64, length: usize) -> Result<Vec<u8>> {
        let id = path::locate(&self.store, path)?;
        self.read_inode_data(id, offset, length)
    }

    pub fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<usize> {
        let id = path::locate(&self.store, path)?;
        self.write_inode_data(id, offset, data)
    }

    pub fn remove(&mut self, path: &str) -> Result<()> {
        let id = path::locate(&self.store, path)?;
        self.remove_inode(id)
    }

    pub fn move_file(&mut self, src: &str, dst: &str) -> Result<()> {
        let (src_parent_path, src_name) = path::split_parent(src)?;
        let (dst_parent_path, dst_name) = path::split_parent(dst)?;
        let src_parent = path::locate(&self.store, src_parent_path)?;
        let dst_parent = path::locate(&self.store, dst_parent_path)?;
        self.rename_in(src_parent, src_name, dst_parent, dst_name)
    }

    // --- inode-level operations ------------------------------------------

    pub(crate) fn stat(&self, id: InodePointer) -> Result<Inode> {
        let inode = inode_table::load_inode(&self.store, id)?;
        if inode.is_free() {
            return Err(FsError::NotFound { at: 0 });
        }
        Ok(inode)
    }

    pub(crate) fn lookup_in(
        &self,
        parent: InodePointer,
        name: &str,
    ) -> Result<(InodePointer, Inode)> {
        let scan = directory::scan(&self.store, parent, name)?;
        let id = scan.entry.ok_or(FsError::NotFound { at: 0 })?;
        Ok((id, self.stat(id)?))
    }

    /// Creates `name` under the directory `parent`. For directories the
    /// child's block is allocated and zero-written before anything points at
    /// it; the referencing records (child inode, parent entry, parent m_time)
    /// follow, and the store is flushed last.
    pub(crate) fn create_in(
        &mut self,
        parent_id: InodePointer,
        name: &str,
        kind: FileKind,
    ) -> Result<InodePointer> {
        if name.is_empty() || name.contains('/') {
            return Err(FsError::InvalidArgument("bad file name"));
        }
        if name.len() > FNAME_MAX {
            return Err(FsError::NameTooLong);
        }

        let scan = directory::scan(&self.store, parent_id, name)?;
        if scan.entry.is_some() {
            return Err(FsError::AlreadyExists);
        }
        if scan.block.size as usize >= DIR_ENTRY_MAX {
            return Err(FsError::DirectoryFull);
        }

        let child_id = inode_table::find_free_inode(&self.store)?;
        let mut child_block = None;
        let child = match kind {
            FileKind::Regular => Inode::new_regular(name, parent_id),
            FileKind::Directory => {
                let block = self.store.allocate()?;
                if let Err(err) =
                    self.store.write_block(block, &DirectoryBlock::empty().to_bytes())
                {
                    let _ = self.store.release(block);
                    return Err(err);
                }
                child_block = Some(block);
                Inode::new_directory(name, parent_id, block)
            }
        };

        let mut parent_block = scan.block;
        let mut parent = scan.dir;
        let linked: Result<()> = (|| {
            inode_table::write_inode(&mut self.store, child_id, &child)?;
            parent_block.insert(name, child_id)?;
            directory::write_dir_block(&mut self.store, &parent, &parent_block)?;
            parent.meta.modified = unix_now();
            inode_table::write_inode(&mut self.store, parent_id, &parent)?;
            self.store.flush()
        })();

        if let Err(err) = linked {
            warn!("create of {:?} failed, rolling back: {}", name, err);
            if let Some(block) = child_block {
                let _ = self.store.release(block);
            }
            let _ = inode_table::write_inode(&mut self.store, child_id, &Inode::blank());
            return Err(err);
        }
        Ok(child_id)
    }

    /// Entries of the directory `id`, with each child's type tag. Counts as
    /// an explicit access: the directory's a_time is persisted (not flushed).
    pub(crate) fn entries_in(
        &mut self,
        id: InodePointer,
    ) -> Result<Vec<(InodePointer, String, FileKind)>> {
        let mut dir = self.stat(id)?;
        if !dir.is_directory() {
            return Err(FsError::NotADirectory);
        }
        let block = directory::load_dir_block(&self.store, &dir)?;

        let mut records = Vec::with_capacity(block.size as usize);
        for (name, child_id) in block.entries() {
            let child = inode_table::load_inode(&self.store, child_id)?;
            let kind = child
                .kind()
                .ok_or(FsError::Inconsistent("directory entry references a free inode"))?;
            records.push((child_id, name, kind));
        }

        dir.meta.accessed = unix_now();
        inode_table::write_inode(&mut self.store, id, &dir)?;
        Ok(records)
    }

    /// Reads up to `length` bytes at `offset`, clamped to the file size.
    /// An offset at or past the end is a failure, not an empty read.
    pub(crate) fn read_inode_data(
        &mut self,
        id: InodePointer,
        offset: u64,
        length: usize,
    ) -> Result<Vec<u8>> {
        let mut inode = self.stat(id)?;
        if !inode.is_regular() {
            return Err(FsError::IsADirectory);
        }
        let size = inode.meta.size as u64;
        if offset >= size {
            return Err(FsError::OffsetBeyondEof);
        }
        let to_read = length.min((size - offset) as usize);
        if to_read == 0 {
            return Ok(Vec::new());
        }

        let mut data = vec![0u8; to_read];
        let mut done = 0;
        let mut pos = offset;
        while done < to_read {
            let inner = (pos % BLOCK_SIZE as u64) as usize;
            let chunk = (to_read - done).min(BLOCK_SIZE - inner);
            let block = data_ptr::resolve_for_read(&self.store, &inode, BlockPath::classify(pos)?)?;
            self.store.read_at(block, &mut data[done..done + chunk], inner)?;
            done += chunk;
            pos += chunk as u64;
        }

        inode.meta.accessed = unix_now();
        inode_table::write_inode(&mut self.store, id, &inode)?;
        self.store.flush()?;
        Ok(data)
    }

    /// Writes `data` at `offset`. The offset may be anywhere up to the
    /// current size (appends included, holes not); the length is clamped at
    /// the file-size ceiling. A mid-loop failure returns the bytes that made
    /// it if any did, the error otherwise.
    pub(crate) fn write_inode_data(
        &mut self,
        id: InodePointer,
        offset: u64,
        data: &[u8],
    ) -> Result<usize> {
        let mut inode = self.stat(id)?;
        if !inode.is_regular() {
            return Err(FsError::IsADirectory);
        }
        if offset > inode.meta.size as u64 {
            return Err(FsError::OffsetBeyondEof);
        }
        let to_write = data.len().min((FILE_SIZE_MAX - offset) as usize);
        if to_write == 0 {
            return Ok(0);
        }

        let mut written = 0;
        let mut pos = offset;
        let mut failure = None;
        while written < to_write {
            let inner = (pos % BLOCK_SIZE as u64) as usize;
            let chunk = (to_write - written).min(BLOCK_SIZE - inner);
            let step: Result<()> = (|| {
                let path = BlockPath::classify(pos)?;
                let block = data_ptr::resolve_for_write(&mut self.store, id, &mut inode, path)?;
                self.store.write_at(block, &data[written..written + chunk], inner)
            })();
            if let Err(err) = step {
                failure = Some(err);
                break;
            }
            written += chunk;
            pos += chunk as u64;
        }

        if written == 0 {
            // The loop ran at least once, so a failure is what stopped it.
            return Err(failure.unwrap_or(FsError::Inconsistent("write made no progress")));
        }
        if let Some(err) = failure {
            warn!("write stopped after {} of {} bytes: {}", written, to_write, err);
        }

        let end = offset + written as u64;
        if end > inode.meta.size as u64 {
            inode.meta.size = end as u32;
        }
        inode.meta.modified = unix_now();
        inode_table::write_inode(&mut self.store, id, &inode)
            .map_err(|_| FsError::Inconsistent("data blocks written but the inode update failed"))?;
        self.store
            .flush()
            .map_err(|_| FsError::Inconsistent("inode updated but the flush failed"))?;
        Ok(written)
    }

    /// Removes a file or an empty directory and reclaims everything it
    /// referenced, pointer-block chains included.
    pub(crate) fn remove_inode(&mut self, id: InodePointer) -> Result<()> {
        if id == ROOT_INODE {
            return Err(FsError::InvalidArgument("the root directory cannot be removed"));
        }
        let inode = self.stat(id)?;
        match inode.kind() {
            Some(FileKind::Regular) => {
                data_ptr::release_chain(&mut self.store, &inode)?;
            }
            Some(FileKind::Directory) => {
                let block = directory::load_dir_block(&self.store, &inode)?;
                if block.size > 0 {
                    return Err(FsError::DirectoryNotEmpty);
                }
                self.store.release(inode.pointers[0])?;
            }
            None => return Err(FsError::Inconsistent("inode has no type tag")),
        }

        let parent_id = inode.meta.parent;
        let parent = inode_table::load_inode(&self.store, parent_id)?;
        if !parent.is_directory() {
            return Err(FsError::Inconsistent("parent inode is not a directory"));
        }
        let mut parent_block = directory::load_dir_block(&self.store, &parent)?;
        if parent_block.remove(&inode.name()).is_none() {
            return Err(FsError::Inconsistent("file is missing from its parent directory"));
        }
        directory::write_dir_block(&mut self.store, &parent, &parent_block)?;
        inode_table::write_inode(&mut self.store, id, &Inode::blank())?;
        self.store.flush()?;
        Ok(())
    }

    /// Moves a regular file between directories (or renames it in place).
    /// The destination entry is written before the source entry is cleared;
    /// a same-directory rename mutates its one block in memory and writes it
    /// once, so no intermediate state can land on disk.
    pub(crate) fn rename_in(
        &mut self,
        src_parent: InodePointer,
        name: &str,
        dst_parent: InodePointer,
        new_name: &str,
    ) -> Result<()> {
        if new_name.is_empty() || new_name.contains('/') {
            return Err(FsError::InvalidArgument("bad file name"));
        }
        if new_name.len() > FNAME_MAX {
            return Err(FsError::NameTooLong);
        }

        let src_scan = directory::scan(&self.store, src_parent, name)?;
        let id = src_scan.entry.ok_or(FsError::NotFound { at: 0 })?;
        let mut inode = inode_table::load_inode(&self.store, id)?;
        if !inode.is_regular() {
            return Err(FsError::NotARegularFile);
        }

        let now = unix_now();
        if src_parent == dst_parent {
            if name == new_name {
                return Ok(());
            }
            let mut block = src_scan.block;
            if block.find(new_name).is_some() {
                return Err(FsError::AlreadyExists);
            }
            block.remove(name);
            block.insert(new_name, id)?;
            directory::write_dir_block(&mut self.store, &src_scan.dir, &block)?;
            let mut dir = src_scan.dir;
            dir.meta.modified = now;
            inode_table::write_inode(&mut self.store, src_parent, &dir)?;
        } else {
            let dst_scan = directory::scan(&self.store, dst_parent, new_name)?;
            if dst_scan.entry.is_some() {
                return Err(FsError::AlreadyExists);
            }
            let mut dst_block = dst_scan.block;
            dst_block.insert(new_name, id)?;
            directory::write_dir_block(&mut self.store, &dst_scan.dir, &dst_block)?;

            let mut src_block = src_scan.block;
            src_block.remove(name);
            directory::write_dir_block(&mut self.store, &src_scan.dir, &src_block)?;

            let mut dst_dir = dst_scan.dir;
            dst_dir.meta.modified = now;
            inode_table::write_inode(&mut self.store, dst_parent, &dst_dir)?;
            let mut src_dir = src_scan.dir;
            src_dir.meta.modified = now;
            inode_table::write_inode(&mut self.store, src_parent, &src_dir)?;
        }

        inode.set_name(new_name);
        inode.meta.parent = dst_parent;
        inode_table::write_inode(&mut self.store, id, &inode)?;
        self.store.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::{BLOCK_SIZE, DIRECT_TOTAL, INDIRECT_TOTAL};
    use crate::error::FsError;
    use crate::structure::inode::FileKind;
    use crate::testutil::fresh_image;

    use super::{DirRecord, F15FS};

    fn fresh_fs(name: &str) -> F15FS<crate::driver::file_drive::FileDrive> {
        let path = fresh_image(name);
        F15FS::format(&path).unwrap();
        F15FS::mount(&path).unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn format_create_write_read_list() {
        let mut fs = fresh_fs("fs_scenario.img");

        fs.create("/a", FileKind::Directory).unwrap();
        fs.create("/a/b.txt", FileKind::Regular).unwrap();

        let data = pattern(2048);
        assert_eq!(fs.write("/a/b.txt", 0, &data).unwrap(), 2048);
        assert_eq!(fs.read("/a/b.txt", 0, 2048).unwrap(), data);

        let listing = fs.list_directory("/a").unwrap();
        assert_eq!(listing, vec![DirRecord { name: "b.txt".into(), kind: FileKind::Regular }]);
    }

    #[test]
    fn create_shows_up_in_the_parent_listing() {
        let mut fs = fresh_fs("fs_create_list.img");

        fs.create("/docs", FileKind::Directory).unwrap();
        fs.create("/notes.txt", FileKind::Regular).unwrap();

        let mut root = fs.list_directory("/").unwrap();
        root.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            root,
            vec![
                DirRecord { name: "docs".into(), kind: FileKind::Directory },
                DirRecord { name: "notes.txt".into(), kind: FileKind::Regular },
            ]
        );
        assert!(fs.list_directory("/docs").unwrap().is_empty());
    }

    #[test]
    fn create_rejects_duplicates_and_missing_parents() {
        let mut fs = fresh_fs("fs_create_errors.img");

        fs.create("/a", FileKind::Directory).unwrap();
        assert!(matches!(fs.create("/a", FileKind::Regular), Err(FsError::AlreadyExists)));
        assert!(matches!(
            fs.create("/nowhere/file", FileKind::Regular),
            Err(FsError::NotFound { .. })
        ));
        // A file is not a directory to create under.
        fs.create("/a/f", FileKind::Regular).unwrap();
        assert!(matches!(fs.create("/a/f/x", FileKind::Regular), Err(FsError::NotADirectory)));
    }

    #[test]
    fn directory_capacity_is_twenty() {
        let mut fs = fresh_fs("fs_dir_capacity.img");

        fs.create("/d", FileKind::Directory).unwrap();
        for i in 0..20 {
            fs.create(&format!("/d/f{}", i), FileKind::Regular).unwrap();
        }
        assert!(matches!(
            fs.create("/d/one-more", FileKind::Regular),
            Err(FsError::DirectoryFull)
        ));
        assert_eq!(fs.list_directory("/d").unwrap().len(), 20);
    }

    #[test]
    fn write_past_eof_fails_and_size_is_unchanged() {
        let mut fs = fresh_fs("fs_write_gap.img");

        fs.create("/f", FileKind::Regular).unwrap();
        fs.write("/f", 0, &pattern(100)).unwrap();

        assert!(matches!(fs.write("/f", 101, b"x"), Err(FsError::OffsetBeyondEof)));
        // The refused write left the size alone.
        assert_eq!(fs.read("/f", 0, 1000).unwrap().len(), 100);
        assert!(matches!(fs.read("/f", 100, 1), Err(FsError::OffsetBeyondEof)));
    }

    #[test]
    fn writes_split_across_block_boundaries() {
        let mut fs = fresh_fs("fs_boundary.img");

        fs.create("/f", FileKind::Regular).unwrap();
        fs.write("/f", 0, &vec![0u8; 1023]).unwrap();
        assert_eq!(fs.write("/f", 1023, b"AB").unwrap(), 2);

        assert_eq!(fs.read("/f", 1022, 3).unwrap(), vec![0, b'A', b'B']);
        assert_eq!(fs.read("/f", 1023, 1).unwrap(), b"A");
        assert_eq!(fs.read("/f", 1024, 1).unwrap(), b"B");
    }

    #[test]
    fn overwrites_do_not_grow_the_file() {
        let mut fs = fresh_fs("fs_overwrite.img");

        fs.create("/f", FileKind::Regular).unwrap();
        fs.write("/f", 0, &pattern(500)).unwrap();
        fs.write("/f", 100, &vec![0xffu8; 50]).unwrap();

        let data = fs.read("/f", 0, 500).unwrap();
        assert_eq!(data.len(), 500);
        assert_eq!(&data[100..150], &[0xffu8; 50]);
        assert_eq!(&data[..100], &pattern(500)[..100]);
        assert_eq!(&data[150..], &pattern(500)[150..]);
        assert!(matches!(fs.read("/f", 500, 1), Err(FsError::OffsetBeyondEof)));
    }

    #[test]
    fn files_grow_through_the_indirect_tier() {
        let mut fs = fresh_fs("fs_indirect.img");

        fs.create("/big", FileKind::Regular).unwrap();
        let len = (DIRECT_TOTAL + 3) * BLOCK_SIZE;
        let data = pattern(len);
        assert_eq!(fs.write("/big", 0, &data).unwrap(), len);

        // A slice that lives entirely past the direct pointers.
        let offset = (DIRECT_TOTAL * BLOCK_SIZE) as u64;
        assert_eq!(
            fs.read("/big", offset, 2048).unwrap(),
            &data[offset as usize..offset as usize + 2048]
        );
        // And one spanning the direct/indirect seam.
        assert_eq!(
            fs.read("/big", offset - 100, 200).unwrap(),
            &data[offset as usize - 100..offset as usize + 100]
        );
    }

    #[test]
    fn files_grow_through_the_double_indirect_tier() {
        let mut fs = fresh_fs("fs_double_indirect.img");

        fs.create("/huge", FileKind::Regular).unwrap();
        let seam = (DIRECT_TOTAL + INDIRECT_TOTAL) * BLOCK_SIZE;
        let len = seam + 2 * BLOCK_SIZE;
        let data = pattern(len);
        assert_eq!(fs.write("/huge", 0, &data).unwrap(), len);

        assert_eq!(
            fs.read("/huge", seam as u64 - 512, 1024).unwrap(),
            &data[seam - 512..seam + 512]
        );
        assert_eq!(fs.read("/huge", len as u64 - 1024, 4096).unwrap(), &data[len - 1024..]);
    }

    #[test]
    fn append_extends_incrementally() {
        let mut fs = fresh_fs("fs_append.img");

        fs.create("/log", FileKind::Regular).unwrap();
        let mut expected = Vec::new();
        for round in 0..10u8 {
            let chunk = vec![round; 700];
            fs.write("/log", expected.len() as u64, &chunk).unwrap();
            expected.extend_from_slice(&chunk);
        }
        assert_eq!(fs.read("/log", 0, expected.len()).unwrap(), expected);
    }

    #[test]
    fn removing_directories_requires_them_empty() {
        let mut fs = fresh_fs("fs_rmdir.img");

        fs.create("/d", FileKind::Directory).unwrap();
        fs.create("/d/f", FileKind::Regular).unwrap();

        assert!(matches!(fs.remove("/d"), Err(FsError::DirectoryNotEmpty)));
        // The refused removal changed nothing.
        assert_eq!(fs.list_directory("/d").unwrap().len(), 1);

        fs.remove("/d/f").unwrap();
        fs.remove("/d").unwrap();
        assert!(fs.list_directory("/").unwrap().is_empty());
        assert!(matches!(fs.list_directory("/d"), Err(FsError::NotFound { .. })));
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut fs = fresh_fs("fs_remove_root.img");
        assert!(matches!(fs.remove("/"), Err(FsError::InvalidArgument(_))));
    }

    #[test]
    fn removal_recycles_inodes_and_blocks() {
        let mut fs = fresh_fs("fs_recycle.img");

        fs.create("/f", FileKind::Regular).unwrap();
        let len = (DIRECT_TOTAL + 2) * BLOCK_SIZE;
        fs.write("/f", 0, &pattern(len)).unwrap();
        fs.remove("/f").unwrap();

        // Everything the file held, pointer blocks included, is reusable:
        // a fresh file can take the same shape again.
        fs.create("/g", FileKind::Regular).unwrap();
        let data = pattern(len);
        assert_eq!(fs.write("/g", 0, &data).unwrap(), len);
        assert_eq!(fs.read("/g", 0, len).unwrap(), data);
    }

    #[test]
    fn move_between_directories() {
        let mut fs = fresh_fs("fs_move.img");

        fs.create("/src", FileKind::Directory).unwrap();
        fs.create("/dst", FileKind::Directory).unwrap();
        fs.create("/src/file", FileKind::Regular).unwrap();
        fs.write("/src/file", 0, b"payload").unwrap();

        fs.move_file("/src/file", "/dst/moved").unwrap();

        assert!(fs.list_directory("/src").unwrap().is_empty());
        assert_eq!(
            fs.list_directory("/dst").unwrap(),
            vec![DirRecord { name: "moved".into(), kind: FileKind::Regular }]
        );
        assert_eq!(fs.read("/dst/moved", 0, 7).unwrap(), b"payload");
        assert!(matches!(fs.read("/src/file", 0, 7), Err(FsError::NotFound { .. })));
    }

    #[test]
    fn rename_in_place() {
        let mut fs = fresh_fs("fs_rename.img");

        fs.create("/old", FileKind::Regular).unwrap();
        fs.write("/old", 0, b"same bytes").unwrap();
        fs.move_file("/old", "/new").unwrap();

        assert_eq!(fs.read("/new", 0, 10).unwrap(), b"same bytes");
        assert!(matches!(fs.read("/old", 0, 1), Err(FsError::NotFound { .. })));
    }

    #[test]
    fn move_refuses_directories_and_collisions() {
        let mut fs = fresh_fs("fs_move_errors.img");

        fs.create("/d", FileKind::Directory).unwrap();
        fs.create("/f", FileKind::Regular).unwrap();
        fs.create("/g", FileKind::Regular).unwrap();

        assert!(matches!(fs.move_file("/d", "/e"), Err(FsError::NotARegularFile)));
        assert!(matches!(fs.move_file("/f", "/g"), Err(FsError::AlreadyExists)));
        assert!(matches!(fs.move_file("/gone", "/x"), Err(FsError::NotFound { .. })));
        // Failed moves leave the source in place.
        assert_eq!(fs.list_directory("/").unwrap().len(), 3);
    }

    #[test]
    fn contents_survive_remount() {
        let path = fresh_image("fs_remount.img");
        F15FS::format(&path).unwrap();

        let data = pattern(3000);
        {
            let mut fs = F15FS::mount(&path).unwrap();
            fs.create("/a", FileKind::Directory).unwrap();
            fs.create("/a/keep", FileKind::Regular).unwrap();
            fs.write("/a/keep", 0, &data).unwrap();
            fs.unmount().unwrap();
        }

        let mut fs = F15FS::mount(&path).unwrap();
        assert_eq!(fs.read("/a/keep", 0, 3000).unwrap(), data);
        assert_eq!(fs.list_directory("/a").unwrap().len(), 1);
    }

    #[test]
    fn mount_rejects_garbage() {
        let path = fresh_image("fs_mount_garbage.img");
        assert!(F15FS::mount(&path).is_err());
        std::fs::write(&path, vec![0u8; 1024]).unwrap();
        assert!(F15FS::mount(&path).is_err());
    }
}
