/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! The node engine: tree structure, per-kind dispatch, handle tracking and
//! safe teardown.
//!
//! Nodes are owned by their parent (the root by the [`Vfs`](crate::Vfs)
//! engine). Handles are owned by the caller; a node keeps only weak
//! back-references to the handles opened against it, so destroying a subtree
//! while handles are open *orphans* them: the handle's node slot is cleared
//! and every later operation on it reports `StaleHandle`, while `close`
//! still succeeds.

use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use dcerrno::dc_err;
use dcfs_vfs::{VfsDirEntry, VfsNodeAttr, VfsError, VfsResult};
use spin::{Mutex, RwLock};

use crate::flash::FlashPart;
use crate::gdrom::GdTrack;
use crate::rom::RomFile;

/// One element of the filesystem tree: a virtual directory or a
/// device-backed leaf.
#[derive(Debug)]
pub struct VfsNode {
    /// Non-empty except for the root.
    name: String,
    /// Empty only at the root (and on destroyed nodes).
    parent: RwLock<Weak<VfsNode>>,
    kind: NodeKind,
    /// Directory handles opened against this node.
    dirs: Mutex<Vec<Weak<DirHandle>>>,
    /// File handles opened against this node.
    files: Mutex<Vec<Weak<FileHandle>>>,
    dead: AtomicBool,
}

/// The closed set of node kinds. Operations dispatch over this; a kind
/// without a capability reports a static error.
#[derive(Debug)]
pub(crate) enum NodeKind {
    Virt(VirtDir),
    Rom(RomFile),
    Flash(FlashPart),
    Track(GdTrack),
}

/// Private state of a virtual directory: the insertion-ordered child list.
#[derive(Debug)]
pub(crate) struct VirtDir {
    children: RwLock<Vec<Arc<VfsNode>>>,
}

impl VirtDir {
    pub(crate) fn new() -> Self {
        Self {
            children: RwLock::new(Vec::new()),
        }
    }

    /// Appends in O(1); children keep insertion order.
    fn add_child(&self, child: Arc<VfsNode>) {
        self.children.write().push(child);
    }

    /// Unlinks by identity with a linear scan.
    fn remove_child(&self, child: &Arc<VfsNode>) {
        let mut children = self.children.write();
        if let Some(pos) = children.iter().position(|c| Arc::ptr_eq(c, child)) {
            children.remove(pos);
        }
    }
}

impl VfsNode {
    fn alloc(name: &str, kind: NodeKind) -> Arc<Self> {
        Arc::new(Self {
            name: String::from(name),
            parent: RwLock::new(Weak::new()),
            kind,
            dirs: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
            dead: AtomicBool::new(false),
        })
    }

    pub(crate) fn new_root() -> Arc<Self> {
        Self::alloc("", NodeKind::Virt(VirtDir::new()))
    }

    /// The node's name; empty only at the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a virtual directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Virt(_))
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    pub(crate) fn parent(&self) -> Option<Arc<VfsNode>> {
        self.parent.read().upgrade()
    }

    pub(crate) fn node_type(&self) -> dcfs_vfs::VfsNodeType {
        if self.is_dir() {
            dcfs_vfs::VfsNodeType::Dir
        } else {
            dcfs_vfs::VfsNodeType::File
        }
    }

    /// Gets the attributes of the node. Directories report zero size,
    /// leaves report their backing length.
    pub fn get_attr(&self) -> VfsResult<VfsNodeAttr> {
        match &self.kind {
            NodeKind::Virt(_) => Ok(VfsNodeAttr::new_dir()),
            NodeKind::Rom(rom) => Ok(VfsNodeAttr::new_file(rom.len() as u64)),
            NodeKind::Flash(part) => Ok(VfsNodeAttr::new_file(part.len() as u64)),
            NodeKind::Track(track) => Ok(VfsNodeAttr::new_file(track.size())),
        }
    }

    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        match &self.kind {
            NodeKind::Virt(_) => dc_err!(Unsupported),
            NodeKind::Rom(rom) => rom.read_at(offset, buf),
            NodeKind::Flash(part) => part.read_at(offset, buf),
            NodeKind::Track(track) => track.read_at(offset, buf),
        }
    }

    /// One traversal step.
    ///
    /// Consumes leading `/` runs, then matches the next name segment against
    /// the children (a match is a prefix equal to the child's name followed
    /// by end-of-path or `/`), then collapses any run of consecutive `/`s by
    /// one byte per pair so the next step still sees a separator. An
    /// exhausted path returns the node itself. Leaves take no steps.
    pub(crate) fn find_step(self: &Arc<Self>, path: &str) -> (Option<Arc<VfsNode>>, usize) {
        let NodeKind::Virt(dir) = &self.kind else {
            return (None, 0);
        };
        let bytes = path.as_bytes();
        let mut offs = 0;
        while offs < bytes.len() && bytes[offs] == b'/' {
            offs += 1;
        }
        if offs == bytes.len() {
            return (Some(self.clone()), offs);
        }
        let rest = &bytes[offs..];
        let found = dir
            .children
            .read()
            .iter()
            .find(|c| {
                let name = c.name.as_bytes();
                !name.is_empty()
                    && rest.len() >= name.len()
                    && &rest[..name.len()] == name
                    && (rest.len() == name.len() || rest[name.len()] == b'/')
            })
            .cloned();
        match found {
            Some(child) => {
                offs += child.name.len();
                while offs + 1 < bytes.len() && bytes[offs] == b'/' && bytes[offs + 1] == b'/' {
                    offs += 1;
                }
                (Some(child), offs)
            }
            None => (None, offs),
        }
    }
}

/// Creates a node of the given kind and attaches it to `parent` via the
/// parent's child list. Only virtual directories can take children.
pub(crate) fn mknode(parent: &Arc<VfsNode>, name: &str, kind: NodeKind) -> VfsResult<Arc<VfsNode>> {
    let NodeKind::Virt(dir) = &parent.kind else {
        return dc_err!(NotADirectory);
    };
    let node = VfsNode::alloc(name, kind);
    *node.parent.write() = Arc::downgrade(parent);
    dir.add_child(node.clone());
    Ok(node)
}

/// Tears a subtree down: detaches `node` from its parent, destroys all
/// descendants post-order, and orphans every handle still open on them.
/// Callers mutate the tree under the engine lock.
pub(crate) fn destroy(node: &Arc<VfsNode>) {
    if let Some(parent) = node.parent() {
        if let NodeKind::Virt(dir) = &parent.kind {
            dir.remove_child(node);
        }
    }
    destroy_subtree(node);
}

fn destroy_subtree(node: &Arc<VfsNode>) {
    if let NodeKind::Virt(dir) = &node.kind {
        let children = core::mem::take(&mut *dir.children.write());
        for child in &children {
            *child.parent.write() = Weak::new();
            destroy_subtree(child);
        }
    }
    node.dead.store(true, Ordering::Release);
    *node.parent.write() = Weak::new();
    // Collect first so no handle lock is taken while the list lock is held.
    let dirs: Vec<_> = node.dirs.lock().drain(..).filter_map(|w| w.upgrade()).collect();
    for handle in dirs {
        *handle.node.write() = None;
    }
    let files: Vec<_> = node.files.lock().drain(..).filter_map(|w| w.upgrade()).collect();
    for handle in files {
        *handle.node.write() = None;
    }
}

/// An open directory cursor.
///
/// The cursor is a snapshot of the child list taken at open time: children
/// inserted later are not seen, children removed later may still be yielded
/// by name, and the snapshot's `Arc`s guarantee no freed node is ever
/// dereferenced.
#[derive(Debug)]
pub(crate) struct DirHandle {
    /// Cleared when the node is destroyed (orphaned).
    node: RwLock<Option<Arc<VfsNode>>>,
    cursor: Mutex<DirCursor>,
}

#[derive(Debug)]
struct DirCursor {
    entries: Vec<Arc<VfsNode>>,
    next: usize,
}

/// Opens a directory handle on `node`. A non-empty path remainder means the
/// caller tried to open something under a name that did not resolve to a
/// directory.
pub(crate) fn opendir(node: &Arc<VfsNode>, tail: &str) -> VfsResult<Arc<DirHandle>> {
    let NodeKind::Virt(dir) = &node.kind else {
        return dc_err!(NotADirectory);
    };
    if !tail.is_empty() {
        return dc_err!(NotADirectory);
    }
    let handle = Arc::new(DirHandle {
        node: RwLock::new(Some(node.clone())),
        cursor: Mutex::new(DirCursor {
            entries: dir.children.read().clone(),
            next: 0,
        }),
    });
    node.dirs.lock().push(Arc::downgrade(&handle));
    Ok(handle)
}

impl DirHandle {
    /// Yields the next entry, or `None` at the end of the list.
    pub(crate) fn next_entry(&self) -> VfsResult<Option<VfsDirEntry>> {
        if self.node.read().is_none() {
            return dc_err!(StaleHandle);
        }
        let mut cursor = self.cursor.lock();
        let entry = cursor
            .entries
            .get(cursor.next)
            .map(|c| VfsDirEntry::new(c.node_type(), c.name()));
        if entry.is_some() {
            cursor.next += 1;
        }
        Ok(entry)
    }

    /// Unlinks the handle from its node, if the link is still live.
    pub(crate) fn detach(&self) {
        let node = self.node.write().take();
        if let Some(node) = node {
            let this = self as *const DirHandle;
            node.dirs
                .lock()
                .retain(|w| w.upgrade().is_some_and(|h| !core::ptr::eq(Arc::as_ptr(&h), this)));
        }
    }
}

/// An open file handle. The read position lives in the caller-facing
/// [`File`](crate::fops::File) object; this core tracks only the node link.
#[derive(Debug)]
pub(crate) struct FileHandle {
    node: RwLock<Option<Arc<VfsNode>>>,
}

/// Opens a file handle on a leaf node. Returns the handle and the leaf
/// length (fixed for every built-in kind). Write mode is always refused.
pub(crate) fn open(node: &Arc<VfsNode>, tail: &str, write: bool) -> VfsResult<(Arc<FileHandle>, u64)> {
    if matches!(node.kind, NodeKind::Virt(_)) {
        return dc_err!(Unsupported);
    }
    if !tail.is_empty() {
        return dc_err!(NotFound);
    }
    if write {
        return dc_err!(ReadOnly);
    }
    let size = node.get_attr()?.size();
    let handle = Arc::new(FileHandle {
        node: RwLock::new(Some(node.clone())),
    });
    node.files.lock().push(Arc::downgrade(&handle));
    Ok((handle, size))
}

impl FileHandle {
    /// Pins the node and reads from it.
    ///
    /// The pin is the `Arc` cloned out of the node slot: the blocking device
    /// read below runs without any engine lock held, and a concurrent
    /// teardown cannot free the node underneath it. Orphaned handles fail
    /// here without touching the device.
    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        let node = self.node.read().clone();
        match node {
            Some(node) if !node.is_dead() => node.read_at(offset, buf),
            _ => dc_err!(StaleHandle),
        }
    }

    pub(crate) fn get_attr(&self) -> VfsResult<VfsNodeAttr> {
        match &*self.node.read() {
            Some(node) => node.get_attr(),
            None => Err(VfsError::StaleHandle),
        }
    }

    /// Unlinks the handle from its node, if the link is still live.
    pub(crate) fn detach(&self) {
        let node = self.node.write().take();
        if let Some(node) = node {
            let this = self as *const FileHandle;
            node.files
                .lock()
                .retain(|w| w.upgrade().is_some_and(|h| !core::ptr::eq(Arc::as_ptr(&h), this)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::borrow::Cow;
    use alloc::vec;

    fn virt(parent: &Arc<VfsNode>, name: &str) -> Arc<VfsNode> {
        mknode(parent, name, NodeKind::Virt(VirtDir::new())).unwrap()
    }

    fn rom(parent: &Arc<VfsNode>, name: &str, data: &'static [u8]) -> Arc<VfsNode> {
        mknode(parent, name, NodeKind::Rom(RomFile::new(Cow::Borrowed(data)))).unwrap()
    }

    #[test]
    fn children_keep_insertion_order() {
        let root = VfsNode::new_root();
        virt(&root, "bbb");
        virt(&root, "aaa");
        rom(&root, "ccc", b"x");
        let handle = opendir(&root, "").unwrap();
        let names: Vec<String> = core::iter::from_fn(|| handle.next_entry().unwrap())
            .map(|e| String::from(e.name()))
            .collect();
        assert_eq!(names, vec!["bbb", "aaa", "ccc"]);
    }

    #[test]
    fn leaf_parents_take_no_children() {
        let root = VfsNode::new_root();
        let leaf = rom(&root, "leaf", b"x");
        let err = mknode(&leaf, "child", NodeKind::Virt(VirtDir::new())).unwrap_err();
        assert_eq!(err, VfsError::NotADirectory);
    }

    #[test]
    fn find_step_matches_whole_names_only() {
        let root = VfsNode::new_root();
        let sub = virt(&root, "sub");
        virt(&root, "subdir");
        let (node, offs) = root.find_step("/sub/x");
        assert!(Arc::ptr_eq(node.as_ref().unwrap(), &sub));
        assert_eq!(offs, 4);
        let (node, _) = root.find_step("/su");
        assert!(node.is_none());
    }

    #[test]
    fn find_step_collapses_separator_runs() {
        let root = VfsNode::new_root();
        let sub = virt(&root, "sub");
        let inner = virt(&sub, "inner");
        // Two extra separators collapse so the next step sees exactly one.
        let (node, offs) = root.find_step("/sub///inner");
        assert!(Arc::ptr_eq(node.as_ref().unwrap(), &sub));
        let (node, offs2) = node.unwrap().find_step(&"/sub///inner"[offs..]);
        assert!(Arc::ptr_eq(node.as_ref().unwrap(), &inner));
        assert_eq!(offs + offs2, "/sub///inner".len());
    }

    #[test]
    fn find_step_returns_self_on_exhausted_path() {
        let root = VfsNode::new_root();
        let (node, offs) = root.find_step("///");
        assert!(Arc::ptr_eq(node.as_ref().unwrap(), &root));
        assert_eq!(offs, 3);
        let (node, offs) = root.find_step("");
        assert!(Arc::ptr_eq(node.as_ref().unwrap(), &root));
        assert_eq!(offs, 0);
    }

    #[test]
    fn destroy_detaches_and_orphans() {
        let root = VfsNode::new_root();
        let sub = virt(&root, "sub");
        let leaf = rom(&sub, "leaf", b"hello");
        let dir_handle = opendir(&sub, "").unwrap();
        let (file_handle, size) = open(&leaf, "", false).unwrap();
        assert_eq!(size, 5);

        destroy(&sub);
        assert!(sub.is_dead());
        assert!(leaf.is_dead());
        assert!(sub.parent().is_none());
        // The parent's child list no longer contains the subtree.
        let root_handle = opendir(&root, "").unwrap();
        assert!(root_handle.next_entry().unwrap().is_none());
        // Orphaned handles: reads fail, close still works.
        assert_eq!(dir_handle.next_entry().unwrap_err(), VfsError::StaleHandle);
        let mut buf = [0; 4];
        assert_eq!(file_handle.read_at(0, &mut buf).unwrap_err(), VfsError::StaleHandle);
        file_handle.detach();
        dir_handle.detach();
    }

    #[test]
    fn closing_a_handle_unlinks_it_from_the_node() {
        let root = VfsNode::new_root();
        let leaf = rom(&root, "leaf", b"data");
        let (handle, _) = open(&leaf, "", false).unwrap();
        assert_eq!(leaf.files.lock().len(), 1);
        handle.detach();
        assert!(leaf.files.lock().is_empty());
        // Detaching twice is a no-op.
        handle.detach();
    }

    #[test]
    fn open_rejects_tails_and_write_mode() {
        let root = VfsNode::new_root();
        let leaf = rom(&root, "leaf", b"data");
        assert_eq!(open(&leaf, "x", false).unwrap_err(), VfsError::NotFound);
        assert_eq!(open(&leaf, "", true).unwrap_err(), VfsError::ReadOnly);
        assert_eq!(open(&root, "", false).unwrap_err(), VfsError::Unsupported);
    }
}
