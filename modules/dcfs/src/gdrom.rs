/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! GD-ROM backend: the `/gdrom` subtree and the drive it reads from.
//!
//! Each mounted session directory holds the raw `toc` plus one leaf per
//! track, `track<NN>.iso` for data tracks and `track<NN>.cdda` for audio.
//! Track reads are sector-aligned on the device and converted here into
//! arbitrary byte ranges. The drive's transfer mode is stateful, so the
//! backend keeps a one-entry memo of the last-programmed
//! `(sector_size, sector_mode)` pair and reprograms only on change; the memo
//! is dropped to its sentinel on every rebuild so the first read after a
//! remount always reprograms the drive.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;

use dcerrno::dc_err;
use dcfs_vfs::{VfsError, VfsResult};
use driver_common::{DevError, DevResult};
use driver_gdrom::{
    datatype, disc, toc_adr, toc_ctrl, toc_lba, DriveStat, GdromDriverOps, Toc, CTRL_DATA,
    SECTOR_SIZE_DATA, SECTOR_SIZE_RAW,
};
use spin::Mutex;

use crate::node::{NodeKind, VfsNode};
use crate::root::Vfs;

/// How many times the spin-up command is retried before a mount is
/// abandoned.
const SPINUP_ATTEMPTS: usize = 8;

/// Number of sessions probed on a disc.
const SESSIONS: usize = 2;

fn drive_err(e: DevError) -> VfsError {
    match e {
        DevError::NoMedium => VfsError::NoMedium,
        DevError::Stale => VfsError::DriveStale,
        DevError::NoMemory => VfsError::NoMemory,
        DevError::Unsupported => VfsError::Unsupported,
        _ => VfsError::Io,
    }
}

/// The GD-ROM backend: the drive, the sector-mode memo, and the mounted
/// subtree (if any).
///
/// Track nodes hold the backend strongly, so the engine reference must stay
/// weak or a mounted tree would keep the whole engine alive forever.
pub struct GdromBackend {
    vfs: Weak<Vfs>,
    dev: Mutex<Box<dyn GdromDriverOps>>,
    /// Last `(sector_size, sector_mode)` programmed into the drive; `None`
    /// until the first read after a rebuild.
    mode_cache: Mutex<Option<(u32, u32)>>,
    tree: Mutex<Option<Arc<VfsNode>>>,
}

impl core::fmt::Debug for GdromBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GdromBackend").finish_non_exhaustive()
    }
}

impl GdromBackend {
    pub fn new(vfs: Arc<Vfs>, dev: Box<dyn GdromDriverOps>) -> Arc<Self> {
        Arc::new(Self {
            vfs: Arc::downgrade(&vfs),
            dev: Mutex::new(dev),
            mode_cache: Mutex::new(None),
            tree: Mutex::new(None),
        })
    }

    /// Whether the `/gdrom` subtree currently exists.
    pub fn is_mounted(&self) -> bool {
        self.tree.lock().is_some()
    }

    /// Queries the drive state.
    pub fn drive_stat(&self) -> DevResult<DriveStat> {
        self.dev.lock().drive_stat()
    }

    /// Reads whole sectors, programming the transfer mode first if the memo
    /// says the drive is set up differently.
    fn read_sectors(
        &self,
        start: u32,
        sector_size: u32,
        sector_mode: u32,
        buf: &mut [u8],
    ) -> VfsResult {
        let mut dev = self.dev.lock();
        {
            let mut cache = self.mode_cache.lock();
            if *cache != Some((sector_size, sector_mode)) {
                *cache = None;
                dev.set_data_type(sector_size, sector_mode)
                    .map_err(drive_err)?;
                *cache = Some((sector_size, sector_mode));
            }
        }
        dev.read_sectors(start, buf).map_err(drive_err)
    }

    /// Spins the disc up and builds `/gdrom` from its session TOCs.
    ///
    /// A no-op while a tree exists. Abandons the mount (leaving no tree, so
    /// the next state change retries) if the drive never comes ready or
    /// neither session has a readable TOC.
    pub fn mount(self: &Arc<Self>) -> VfsResult {
        if self.is_mounted() {
            return Ok(());
        }
        let Some(vfs) = self.vfs.upgrade() else {
            return dc_err!(Io, "filesystem engine is gone");
        };
        let (tocs, disc_type) = {
            let mut dev = self.dev.lock();
            let mut ready = Err(DevError::NoMedium);
            for _ in 0..SPINUP_ATTEMPTS {
                ready = dev.init_drive();
                if ready.is_ok() {
                    break;
                }
            }
            if let Err(e) = ready {
                warn!("gdrom: drive did not come ready: {:?}", e);
                return Err(drive_err(e));
            }
            *self.mode_cache.lock() = None;
            let tocs: [DevResult<Toc>; SESSIONS] =
                core::array::from_fn(|i| dev.read_toc(i as u8));
            let disc_type = dev.drive_stat().map(|s| s.disc_type).unwrap_or(0);
            (tocs, disc_type)
        };
        if tocs.iter().all(|t| t.is_err()) {
            warn!("gdrom: no readable session TOC, mount abandoned");
            return dc_err!(Io);
        }
        let cdxa = disc_type == disc::CDXA;
        let _guard = vfs.lock();
        let gd = vfs.mkvirt(None, "gdrom")?;
        for (i, toc) in tocs.iter().enumerate() {
            if let Ok(toc) = toc {
                let session = vfs.mkvirt(Some(&gd), &format!("session{}", i + 1))?;
                self.build_session(&vfs, &session, toc, cdxa)?;
            }
        }
        *self.tree.lock() = Some(gd);
        info!("gdrom: media mounted");
        Ok(())
    }

    /// One leaf per TOC track, bounded by the next track (the lead-out for
    /// the last one). Track numbers outside 1..=99 and tracks whose end
    /// precedes their start are skipped.
    fn build_session(
        self: &Arc<Self>,
        vfs: &Arc<Vfs>,
        dir: &Arc<VfsNode>,
        toc: &Toc,
        cdxa: bool,
    ) -> VfsResult {
        vfs.mkrom(Some(dir), "toc", Cow::Owned(Vec::from(toc.as_bytes())))?;
        let (first, last) = (toc.first_track(), toc.last_track());
        for number in first..=last {
            if !(1..=99).contains(&number) {
                continue;
            }
            let entry = toc.entries[number as usize - 1];
            // The slot after the last valid one is the lead-out.
            let next = if number == last {
                toc.leadout
            } else {
                *toc.entries.get(number as usize).unwrap_or(&toc.leadout)
            };
            let is_data = toc_ctrl(entry) & CTRL_DATA != 0;
            let (start, end) = (toc_lba(entry), toc_lba(next));
            if end < start {
                continue;
            }
            let (sector_size, sector_mode) = if is_data {
                let mode = if cdxa { datatype::MODE2_FORM1 } else { datatype::MODE1 };
                (SECTOR_SIZE_DATA as u32, mode)
            } else {
                (SECTOR_SIZE_RAW as u32, datatype::CDDA)
            };
            let name = format!("track{:02}.{}", number, if is_data { "iso" } else { "cdda" });
            let track = GdTrack {
                start,
                end,
                sector_size,
                sector_mode,
                ctrl: toc_ctrl(entry),
                adr: toc_adr(entry),
                backend: self.clone(),
            };
            debug!(
                "gdrom: {} sectors {}..{} ctrl={} adr={}",
                name, track.start, track.end, track.ctrl, track.adr
            );
            vfs.mknode(Some(dir), &name, NodeKind::Track(track))?;
        }
        Ok(())
    }

    /// Destroys the `/gdrom` subtree, orphaning any handles open on it.
    pub fn unmount(&self) {
        let Some(vfs) = self.vfs.upgrade() else {
            *self.tree.lock() = None;
            return;
        };
        let _guard = vfs.lock();
        let tree = self.tree.lock().take();
        if let Some(root) = tree {
            vfs.destroy(&root);
            info!("gdrom: media unmounted");
        }
    }
}

/// Private state of an optical-track leaf.
#[derive(Debug)]
pub(crate) struct GdTrack {
    start: u32,
    end: u32,
    sector_size: u32,
    sector_mode: u32,
    ctrl: u8,
    adr: u8,
    backend: Arc<GdromBackend>,
}

impl GdTrack {
    pub(crate) fn size(&self) -> u64 {
        self.sector_size as u64 * (self.end - self.start) as u64
    }

    /// Converts a byte-range request into sector-aligned device reads: an
    /// unaligned head (or a request shorter than one sector) goes through
    /// the scratch buffer, whole sectors go straight into the caller's
    /// buffer, a partial tail goes through the scratch buffer again.
    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        let size = self.size();
        if offset >= size {
            return Ok(0);
        }
        let total = buf.len().min((size - offset) as usize);
        if total == 0 {
            return Ok(0);
        }
        let buf = &mut buf[..total];
        let sector_size = self.sector_size as usize;
        let mut sector = (offset / self.sector_size as u64) as u32 + self.start;
        let head_offs = (offset % self.sector_size as u64) as usize;
        // Holds one raw sector; data sectors use a prefix of it.
        let mut scratch = [0u8; SECTOR_SIZE_RAW];
        let mut done = 0;
        if head_offs != 0 || total < sector_size {
            self.read_drive(sector, &mut scratch[..sector_size])?;
            sector += 1;
            let n = (sector_size - head_offs).min(total);
            buf[..n].copy_from_slice(&scratch[head_offs..head_offs + n]);
            done = n;
        }
        let whole = (total - done) / sector_size;
        if whole > 0 {
            let bytes = whole * sector_size;
            self.read_drive(sector, &mut buf[done..done + bytes])?;
            sector += whole as u32;
            done += bytes;
        }
        if done < total {
            self.read_drive(sector, &mut scratch[..sector_size])?;
            buf[done..].copy_from_slice(&scratch[..total - done]);
            done = total;
        }
        Ok(done)
    }

    fn read_drive(&self, sector: u32, buf: &mut [u8]) -> VfsResult {
        self.backend
            .read_sectors(sector, self.sector_size, self.sector_mode, buf)
    }
}
