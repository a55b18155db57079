/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Low-level file and directory objects. Provided for the [`crate::api`]
//! session layer.
//!
//! - File: open, read, eof, close
//! - Directory: open, read entries, close
//!
//! Both wrap an engine handle core; the cursor (`posn` for files, the entry
//! cursor for directories) is owned by the object, so reads through one
//! handle are strictly sequential while different handles stay independent.

use alloc::sync::Arc;

use dcerrno::dc_err;
use dcfs_vfs::VfsResult;

use crate::node::{DirHandle, FileHandle};

/// Alias of [`dcfs_vfs::VfsNodeType`].
pub type FileType = dcfs_vfs::VfsNodeType;
/// Alias of [`dcfs_vfs::VfsDirEntry`].
pub type DirEntry = dcfs_vfs::VfsDirEntry;
/// Alias of [`dcfs_vfs::VfsNodeAttr`].
pub type FileAttr = dcfs_vfs::VfsNodeAttr;

/// Options and flags which can be used to configure how a file is opened.
#[derive(Clone)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
}

impl OpenOptions {
    /// Creates a blank new set of options ready for configuration.
    pub const fn new() -> Self {
        Self {
            read: false,
            write: false,
        }
    }

    /// Sets the option for read access.
    pub fn read(&mut self, read: bool) {
        self.read = read;
    }

    /// Sets the option for write access. Every built-in node kind refuses
    /// it at open time.
    pub fn write(&mut self, write: bool) {
        self.write = write;
    }

    pub const fn is_valid(&self) -> bool {
        self.read || self.write
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// An opened file object, with a read cursor.
#[derive(Debug)]
pub struct File {
    handle: Arc<FileHandle>,
    posn: u64,
    size: u64,
}

impl File {
    pub(crate) fn new(handle: Arc<FileHandle>, size: u64) -> Self {
        Self {
            handle,
            posn: 0,
            size,
        }
    }

    /// Gets the file attributes.
    pub fn get_attr(&self) -> VfsResult<FileAttr> {
        self.handle.get_attr()
    }

    /// Reads at the current position. Returns the number of bytes read.
    ///
    /// After the read, the cursor is advanced by the number of bytes read.
    pub fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        self.read_elems(buf, 1, buf.len())
    }

    /// Reads up to `elem_count` elements of `elem_size` bytes each at the
    /// current position. Returns the number of whole elements read.
    ///
    /// The count is clamped so that no element straddles end-of-file; the
    /// cursor advances by the number of bytes actually read.
    pub fn read_elems(
        &mut self,
        buf: &mut [u8],
        elem_size: usize,
        elem_count: usize,
    ) -> VfsResult<usize> {
        if elem_size == 0 {
            return dc_err!(InvalidInput);
        }
        let avail = (self.size.saturating_sub(self.posn) as usize) / elem_size;
        let cnt = avail.min(elem_count).min(buf.len() / elem_size);
        let bytes = cnt * elem_size;
        let n = self.handle.read_at(self.posn, &mut buf[..bytes])?;
        self.posn += n as u64;
        Ok(n / elem_size)
    }

    /// Writing is not supported by any built-in node kind.
    pub fn write(&mut self, _buf: &[u8]) -> VfsResult<usize> {
        dc_err!(Unsupported)
    }

    /// The current read position.
    pub fn position(&self) -> u64 {
        self.posn
    }

    /// Whether the cursor has reached the end of the file.
    pub fn eof(&self) -> bool {
        self.posn >= self.size
    }

    /// Closes the file. Succeeds even when the node was destroyed while the
    /// handle was open.
    pub fn close(self) -> VfsResult {
        self.handle.detach();
        Ok(())
    }
}

impl Drop for File {
    fn drop(&mut self) {
        self.handle.detach();
    }
}

/// An opened directory object, with a cursor for entry reading.
#[derive(Debug)]
pub struct Directory {
    handle: Arc<DirHandle>,
}

impl Directory {
    pub(crate) fn new(handle: Arc<DirHandle>) -> Self {
        Self { handle }
    }

    /// Reads the next directory entry, or `None` at the end of the list.
    pub fn read_entry(&mut self) -> VfsResult<Option<DirEntry>> {
        self.handle.next_entry()
    }

    /// Closes the directory. Succeeds even when the node was destroyed
    /// while the handle was open.
    pub fn close(self) -> VfsResult {
        self.handle.detach();
        Ok(())
    }
}

impl Drop for Directory {
    fn drop(&mut self) {
        self.handle.detach();
    }
}
