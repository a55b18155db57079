/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! The engine object: root node, tree lock and mount entry points.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::sync::Arc;

use dcfs_vfs::VfsResult;
use driver_flash::FlashDriverOps;
use spin::{Mutex, MutexGuard};

use crate::flash::{self, FlashDevice};
use crate::node::{self, NodeKind, VfsNode, VirtDir};
use crate::rom::RomFile;

/// The filesystem engine: owns the root node and the global tree lock.
///
/// Exactly one mutator works on the tree at a time; every mount and
/// teardown (and every pathname lookup) runs under [`Vfs::lock`]. The lock
/// is never held across blocking device I/O; leaf reads pin their node
/// instead.
pub struct Vfs {
    root: Arc<VfsNode>,
    lock: Mutex<()>,
}

impl Vfs {
    /// Creates an engine with an empty root directory.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            root: VfsNode::new_root(),
            lock: Mutex::new(()),
        })
    }

    /// The root node. Its name is empty and it lives as long as the engine.
    pub fn root_dir(&self) -> &Arc<VfsNode> {
        &self.root
    }

    /// Acquires the global tree lock.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// Creates a virtual directory under `parent` (the root if `None`).
    pub fn mkvirt(&self, parent: Option<&Arc<VfsNode>>, name: &str) -> VfsResult<Arc<VfsNode>> {
        self.mknode(parent, name, NodeKind::Virt(VirtDir::new()))
    }

    /// Creates a ROM leaf over `data` under `parent` (the root if `None`).
    pub fn mkrom(
        &self,
        parent: Option<&Arc<VfsNode>>,
        name: &str,
        data: Cow<'static, [u8]>,
    ) -> VfsResult<Arc<VfsNode>> {
        self.mknode(parent, name, NodeKind::Rom(RomFile::new(data)))
    }

    pub(crate) fn mknode(
        &self,
        parent: Option<&Arc<VfsNode>>,
        name: &str,
        kind: NodeKind,
    ) -> VfsResult<Arc<VfsNode>> {
        node::mknode(parent.unwrap_or(&self.root), name, kind)
    }

    /// Tears the subtree rooted at `node` down, orphaning open handles.
    pub fn destroy(&self, node: &Arc<VfsNode>) {
        debug!("destroying subtree {:?}", node.name());
        node::destroy(node);
    }

    /// Walks the tree from the root and returns the deepest matched node
    /// together with the byte offset where the unconsumed remainder of
    /// `path` begins.
    ///
    /// Each step continues from the node the previous step returned; the
    /// walk stops at a leaf, at a name with no match, or once the path is
    /// exhausted.
    pub fn resolve(&self, path: &str) -> (Arc<VfsNode>, usize) {
        let mut node = self.root.clone();
        let mut offs = 0;
        loop {
            let (next, step) = node.find_step(&path[offs..]);
            let Some(next) = next else {
                break;
            };
            if step == 0 {
                break;
            }
            offs += step;
            node = next;
        }
        (node, offs)
    }
}

impl Drop for Vfs {
    fn drop(&mut self) {
        node::destroy(&self.root);
    }
}

/// Builds the boot-time mount layout: the ROM window as `/rom` and one leaf
/// per populated flash partition under `/flash`. The optical subtree comes
/// and goes with the media, driven by the disc monitor.
pub fn init_rootfs(
    rom_data: Cow<'static, [u8]>,
    flash_dev: Box<dyn FlashDriverOps>,
) -> VfsResult<Arc<Vfs>> {
    let vfs = Vfs::new();
    {
        let _guard = vfs.lock();
        vfs.mkrom(None, "rom", rom_data)?;
        flash::mount(&vfs, FlashDevice::new(flash_dev))?;
    }
    info!("rootfs initialized");
    Ok(vfs)
}
