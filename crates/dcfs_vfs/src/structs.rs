/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

use alloc::string::String;

/// Node (file/directory) type.
///
/// The discriminants follow the `DT_*` directory entry codes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsNodeType {
    /// Directory
    Dir = 0o4,
    /// Regular file
    File = 0o10,
}

impl VfsNodeType {
    /// Whether the node is a directory.
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Dir)
    }

    /// Whether the node is a regular file.
    pub const fn is_file(self) -> bool {
        matches!(self, Self::File)
    }
}

/// Node (file/directory) attributes, as reported by `stat`.
#[derive(Debug, Clone, Copy)]
pub struct VfsNodeAttr {
    /// Node type.
    ty: VfsNodeType,
    /// Total size, in bytes.
    size: u64,
    /// Modification time, in seconds since the epoch. Read-only media carry
    /// no timestamps, so this is zero for every built-in node kind.
    mtime: u64,
}

impl VfsNodeAttr {
    /// Creates a new `VfsNodeAttr` with the given type, size and
    /// modification time.
    pub const fn new(ty: VfsNodeType, size: u64, mtime: u64) -> Self {
        Self { ty, size, mtime }
    }

    /// Creates attributes for a regular file of `size` bytes.
    pub const fn new_file(size: u64) -> Self {
        Self::new(VfsNodeType::File, size, 0)
    }

    /// Creates attributes for a directory.
    pub const fn new_dir() -> Self {
        Self::new(VfsNodeType::Dir, 0, 0)
    }

    /// Returns the node type.
    pub const fn file_type(&self) -> VfsNodeType {
        self.ty
    }

    /// Whether the node is a directory.
    pub const fn is_dir(&self) -> bool {
        self.ty.is_dir()
    }

    /// Whether the node is a regular file.
    pub const fn is_file(&self) -> bool {
        self.ty.is_file()
    }

    /// Returns the size of the node in bytes.
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the modification time of the node.
    pub const fn mtime(&self) -> u64 {
        self.mtime
    }
}

/// Directory entry, as emitted by `readdir`.
#[derive(Debug, Clone)]
pub struct VfsDirEntry {
    ty: VfsNodeType,
    name: String,
}

impl VfsDirEntry {
    /// Creates a directory entry of the given type and name.
    pub fn new(ty: VfsNodeType, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
        }
    }

    /// Returns the type of the entry.
    pub const fn entry_type(&self) -> VfsNodeType {
        self.ty
    }

    /// Returns the name of the entry.
    pub fn name(&self) -> &str {
        &self.name
    }
}
