/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Common traits and types for on-board flash storage drivers.
//!
//! The flash device is a read-only byte-addressed region divided into up to
//! [`MAX_PARTITIONS`] partitions. The host firmware exposes two primitives:
//! a partition probe and a ranged read. Writes go through a separate,
//! unrelated channel and are not modeled here.

#![no_std]

#[cfg(feature = "ramflash")]
extern crate alloc;

#[cfg(feature = "ramflash")]
pub mod ramflash;

#[doc(no_inline)]
pub use driver_common::{BaseDriverOps, DevError, DevResult, DeviceType};

/// The number of partition slots the probe enumerates.
pub const MAX_PARTITIONS: usize = 16;

/// Location of one flash partition inside the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionInfo {
    /// Byte offset of the partition from the start of the device.
    pub offset: usize,
    /// Partition size in bytes.
    pub size: usize,
}

/// Operations that require a flash storage driver to implement.
pub trait FlashDriverOps: BaseDriverOps {
    /// Probes the partition slot `index`.
    ///
    /// Returns `Ok(None)` if the slot is not populated. `index` ranges over
    /// `0..MAX_PARTITIONS`.
    fn partition_info(&mut self, index: usize) -> DevResult<Option<PartitionInfo>>;

    /// Reads `buf.len()` bytes starting at the absolute device `offset`.
    fn read_flash(&mut self, offset: usize, buf: &mut [u8]) -> DevResult;
}
