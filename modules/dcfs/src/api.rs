/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! The POSIX-shaped session layer.
//!
//! A [`Session`] pairs the shared tree with a private working directory.
//! User paths are normalized against the cwd first ([`canonicalize`]), then
//! resolved segment by segment. Everything is read-only: the mutating calls
//! exist but always report `Unsupported`, and opening for write reports
//! `ReadOnly`.

use alloc::sync::Arc;

use dcerrno::dc_err;
use dcfs_vfs::{canonicalize, AbsPath, VfsResult};
use spin::Mutex;

use crate::fops::{Directory, File, FileAttr, OpenOptions};
use crate::node::{self, VfsNode};
use crate::root::Vfs;

/// One filesystem session: the shared tree plus a per-session working
/// directory.
///
/// Dropping the session closes it; files and directories opened through it
/// stay usable until they are closed themselves.
pub struct Session {
    vfs: Arc<Vfs>,
    cwd: Mutex<AbsPath<'static>>,
}

impl Vfs {
    /// Opens a session with the working directory at `/`.
    pub fn open_session(self: &Arc<Self>) -> Session {
        Session {
            vfs: self.clone(),
            cwd: Mutex::new(AbsPath::root()),
        }
    }
}

impl Session {
    fn abs_path(&self, path: &str) -> AbsPath<'static> {
        canonicalize(Some(&*self.cwd.lock()), path)
    }

    fn resolve_locked<'p>(&self, abs: &'p AbsPath<'static>) -> (Arc<VfsNode>, &'p str) {
        let (node, offs) = self.vfs.resolve(abs);
        (node, &abs[offs..])
    }

    /// Gets the attributes of the node at `path`.
    pub fn stat(&self, path: &str) -> VfsResult<FileAttr> {
        let abs = self.abs_path(path);
        debug!("stat <= {:?}", abs);
        let _guard = self.vfs.lock();
        let (node, tail) = self.resolve_locked(&abs);
        if !tail.is_empty() {
            return dc_err!(NotFound);
        }
        node.get_attr()
    }

    /// Opens the directory at `path`.
    pub fn opendir(&self, path: &str) -> VfsResult<Directory> {
        let abs = self.abs_path(path);
        debug!("opendir <= {:?}", abs);
        let _guard = self.vfs.lock();
        let (node, tail) = self.resolve_locked(&abs);
        Ok(Directory::new(node::opendir(&node, tail)?))
    }

    /// Opens the file at `path`.
    pub fn open(&self, path: &str, opts: &OpenOptions) -> VfsResult<File> {
        if !opts.is_valid() {
            return dc_err!(InvalidInput);
        }
        let abs = self.abs_path(path);
        debug!("open <= {:?} write={}", abs, opts.write);
        let _guard = self.vfs.lock();
        let (node, tail) = self.resolve_locked(&abs);
        if node.is_dir() && !tail.is_empty() {
            return dc_err!(NotFound);
        }
        let (handle, size) = node::open(&node, tail, opts.write)?;
        Ok(File::new(handle, size))
    }

    /// Changes the session's working directory to `path`.
    pub fn chdir(&self, path: &str) -> VfsResult {
        let abs = self.abs_path(path);
        debug!("chdir <= {:?}", abs);
        {
            let _guard = self.vfs.lock();
            let (node, tail) = self.resolve_locked(&abs);
            if !tail.is_empty() {
                return dc_err!(NotFound);
            }
            if !node.is_dir() {
                return dc_err!(NotADirectory);
            }
        }
        *self.cwd.lock() = abs;
        Ok(())
    }

    /// Returns the session's working directory.
    pub fn current_dir(&self) -> AbsPath<'static> {
        self.cwd.lock().clone()
    }

    /// Directory creation is not supported on read-only media.
    pub fn create_dir(&self, _path: &str) -> VfsResult {
        dc_err!(Unsupported)
    }

    /// Directory removal is not supported on read-only media.
    pub fn remove_dir(&self, _path: &str) -> VfsResult {
        dc_err!(Unsupported)
    }

    /// File removal is not supported on read-only media.
    pub fn remove_file(&self, _path: &str) -> VfsResult {
        dc_err!(Unsupported)
    }

    /// Renaming is not supported on read-only media.
    pub fn rename(&self, _old: &str, _new: &str) -> VfsResult {
        dc_err!(Unsupported)
    }
}
