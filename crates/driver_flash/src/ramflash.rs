/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Mock flash device backed by a memory buffer, for testing.

use alloc::vec::Vec;

use crate::{
    BaseDriverOps, DevError, DevResult, DeviceType, FlashDriverOps, PartitionInfo, MAX_PARTITIONS,
};

/// A flash device backed by RAM, with a configurable partition table.
pub struct RamFlash {
    data: Vec<u8>,
    parts: [Option<PartitionInfo>; MAX_PARTITIONS],
}

impl RamFlash {
    /// Creates a device over the given image with an empty partition table.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            parts: [None; MAX_PARTITIONS],
        }
    }

    /// Populates the partition slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` or the partition range is out of bounds.
    pub fn add_partition(&mut self, index: usize, offset: usize, size: usize) {
        assert!(index < MAX_PARTITIONS);
        assert!(offset + size <= self.data.len());
        self.parts[index] = Some(PartitionInfo { offset, size });
    }

    /// Total size of the backing image in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl BaseDriverOps for RamFlash {
    fn device_name(&self) -> &str {
        "ramflash"
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Flash
    }
}

impl FlashDriverOps for RamFlash {
    fn partition_info(&mut self, index: usize) -> DevResult<Option<PartitionInfo>> {
        if index >= MAX_PARTITIONS {
            return Err(DevError::InvalidParam);
        }
        Ok(self.parts[index])
    }

    fn read_flash(&mut self, offset: usize, buf: &mut [u8]) -> DevResult {
        let end = offset.checked_add(buf.len()).ok_or(DevError::InvalidParam)?;
        if end > self.data.len() {
            return Err(DevError::Io);
        }
        buf.copy_from_slice(&self.data[offset..end]);
        Ok(())
    }
}
