/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! ROM leaves: files backed by an in-memory byte range.
//!
//! The boot ROM window the platform maps at a fixed address mounts as
//! `/rom` (a borrowed slice); synthesized content such as the raw TOC uses
//! the owned variant.

use alloc::borrow::Cow;

use dcfs_vfs::VfsResult;

/// Size of the on-board boot ROM window.
pub const BOOTROM_SIZE: usize = 2 * 1024 * 1024;

/// Private state of a ROM leaf.
#[derive(Debug)]
pub(crate) struct RomFile {
    data: Cow<'static, [u8]>,
}

impl RomFile {
    pub(crate) fn new(data: Cow<'static, [u8]>) -> Self {
        Self { data }
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        let start = match usize::try_from(offset) {
            Ok(start) if start < self.data.len() => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_clamp_to_the_region() {
        let rom = RomFile::new(Cow::Borrowed(b"0123456789"));
        let mut buf = [0; 4];
        assert_eq!(rom.read_at(0, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(rom.read_at(8, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(rom.read_at(10, &mut buf).unwrap(), 0);
        assert_eq!(rom.read_at(u64::MAX, &mut buf).unwrap(), 0);
    }
}
