/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Flash backend: one leaf per populated partition of the on-board flash,
//! mounted under `/flash`.

use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;

use dcerrno::dc_err_type;
use dcfs_vfs::VfsResult;
use driver_flash::{DevResult, FlashDriverOps, PartitionInfo, MAX_PARTITIONS};
use spin::Mutex;

use crate::node::{NodeKind, VfsNode};
use crate::root::Vfs;

/// Shared handle to the flash device driver.
pub struct FlashDevice {
    inner: Mutex<Box<dyn FlashDriverOps>>,
}

impl core::fmt::Debug for FlashDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashDevice").finish_non_exhaustive()
    }
}

impl FlashDevice {
    pub fn new(dev: Box<dyn FlashDriverOps>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(dev),
        })
    }

    fn partition_info(&self, index: usize) -> DevResult<Option<PartitionInfo>> {
        self.inner.lock().partition_info(index)
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> DevResult {
        self.inner.lock().read_flash(offset, buf)
    }
}

/// Private state of a flash-partition leaf: the device region it covers.
#[derive(Debug)]
pub(crate) struct FlashPart {
    offset: usize,
    len: usize,
    dev: Arc<FlashDevice>,
}

impl FlashPart {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        let start = match usize::try_from(offset) {
            Ok(start) if start < self.len => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(self.len - start);
        if n == 0 {
            return Ok(0);
        }
        self.dev
            .read(self.offset + start, &mut buf[..n])
            .map_err(|e| dc_err_type!(Io, format!("flash read failed: {e:?}")))?;
        Ok(n)
    }
}

/// Probes the partition table and mounts every populated slot as
/// `/flash/partition<N>`, in index order.
pub fn mount(vfs: &Vfs, dev: Arc<FlashDevice>) -> VfsResult<Arc<VfsNode>> {
    let dir = vfs.mkvirt(None, "flash")?;
    let mut found = 0;
    for index in 0..MAX_PARTITIONS {
        match dev.partition_info(index) {
            Ok(Some(info)) => {
                let name = format!("partition{index}");
                debug!(
                    "flash: {} at {:#x}, {} bytes",
                    name, info.offset, info.size
                );
                vfs.mknode(
                    Some(&dir),
                    &name,
                    NodeKind::Flash(FlashPart {
                        offset: info.offset,
                        len: info.size,
                        dev: dev.clone(),
                    }),
                )?;
                found += 1;
            }
            Ok(None) => {}
            Err(e) => warn!("flash: probe of partition {} failed: {:?}", index, e),
        }
    }
    info!("flash: mounted {} partitions", found);
    Ok(dir)
}
