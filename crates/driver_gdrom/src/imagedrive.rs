/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Mock GD-ROM drive backed by in-memory track images, for testing.
//!
//! The drive state lives behind a shared handle so a test can keep a clone
//! and flip the status (insert/eject) after handing the device over.

use alloc::{sync::Arc, vec::Vec};

use spin::Mutex;

use crate::{
    BaseDriverOps, DevError, DevResult, DeviceType, DriveStat, GdromDriverOps, Toc, CTRL_DATA,
    SECTOR_SIZE_DATA, SECTOR_SIZE_RAW,
};

struct TrackImage {
    number: u8,
    start: u32,
    sector_size: usize,
    audio: bool,
    data: Vec<u8>,
}

impl TrackImage {
    fn sectors(&self) -> u32 {
        (self.data.len() / self.sector_size) as u32
    }

    fn end(&self) -> u32 {
        self.start + self.sectors()
    }
}

#[derive(Default)]
struct DriveState {
    status: u32,
    disc_type: u32,
    sessions: [Vec<TrackImage>; 2],
    cur_type: Option<(u32, u32)>,
    init_count: usize,
    set_type_count: usize,
    read_log: Vec<(u32, u32)>,
}

impl DriveState {
    fn disc_ready(&self) -> bool {
        (crate::status::PAUSED..=crate::status::SCANNING).contains(&self.status)
    }
}

/// A GD-ROM drive fed from memory. Clones share the same drive state.
#[derive(Clone)]
pub struct ImageDrive {
    state: Arc<Mutex<DriveState>>,
}

impl ImageDrive {
    /// Creates an empty drive with an open tray.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DriveState {
                status: crate::status::OPEN,
                ..Default::default()
            })),
        }
    }

    /// Sets the reported drive status.
    pub fn set_status(&self, status: u32) {
        self.state.lock().status = status;
    }

    /// Sets the reported disc type.
    pub fn set_disc_type(&self, disc_type: u32) {
        self.state.lock().disc_type = disc_type;
    }

    /// Adds a 2048-byte-sector data track. `data` is padded to a whole
    /// number of sectors.
    pub fn add_data_track(&self, session: usize, number: u8, start: u32, mut data: Vec<u8>) {
        let rem = data.len() % SECTOR_SIZE_DATA;
        if rem != 0 {
            data.resize(data.len() + SECTOR_SIZE_DATA - rem, 0);
        }
        self.add_track(session, number, start, SECTOR_SIZE_DATA, false, data);
    }

    /// Adds a 2352-byte-sector audio track. `data` is padded to a whole
    /// number of raw sectors.
    pub fn add_audio_track(&self, session: usize, number: u8, start: u32, mut data: Vec<u8>) {
        let rem = data.len() % SECTOR_SIZE_RAW;
        if rem != 0 {
            data.resize(data.len() + SECTOR_SIZE_RAW - rem, 0);
        }
        self.add_track(session, number, start, SECTOR_SIZE_RAW, true, data);
    }

    fn add_track(
        &self,
        session: usize,
        number: u8,
        start: u32,
        sector_size: usize,
        audio: bool,
        data: Vec<u8>,
    ) {
        assert!((1..=99).contains(&number));
        let mut st = self.state.lock();
        let tracks = &mut st.sessions[session];
        tracks.push(TrackImage {
            number,
            start,
            sector_size,
            audio,
            data,
        });
        tracks.sort_by_key(|t| t.number);
    }

    /// Removes all tracks, as if the disc was swapped.
    pub fn clear_tracks(&self) {
        let mut st = self.state.lock();
        st.sessions = [Vec::new(), Vec::new()];
    }

    /// Number of "change data type" commands issued so far.
    pub fn set_type_count(&self) -> usize {
        self.state.lock().set_type_count
    }

    /// Number of spin-up commands issued so far.
    pub fn init_count(&self) -> usize {
        self.state.lock().init_count
    }

    /// The `(start, sectors)` pairs of every sector read issued so far.
    pub fn read_log(&self) -> Vec<(u32, u32)> {
        self.state.lock().read_log.clone()
    }

    /// Forgets the recorded command history.
    pub fn clear_log(&self) {
        let mut st = self.state.lock();
        st.read_log.clear();
        st.set_type_count = 0;
        st.init_count = 0;
    }
}

impl Default for ImageDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseDriverOps for ImageDrive {
    fn device_name(&self) -> &str {
        "imagedrive"
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Optical
    }
}

impl GdromDriverOps for ImageDrive {
    fn drive_stat(&mut self) -> DevResult<DriveStat> {
        let st = self.state.lock();
        Ok(DriveStat {
            status: st.status,
            disc_type: st.disc_type,
        })
    }

    fn init_drive(&mut self) -> DevResult {
        let mut st = self.state.lock();
        st.init_count += 1;
        if st.disc_ready() {
            Ok(())
        } else {
            Err(DevError::NoMedium)
        }
    }

    fn read_toc(&mut self, session: u8) -> DevResult<Toc> {
        let st = self.state.lock();
        if !st.disc_ready() {
            return Err(DevError::NoMedium);
        }
        let tracks = st
            .sessions
            .get(session as usize)
            .ok_or(DevError::InvalidParam)?;
        if tracks.is_empty() {
            return Err(DevError::Io);
        }
        let mut toc = Toc::empty();
        for t in tracks {
            let ctrl = if t.audio { 0 } else { CTRL_DATA as u32 };
            toc.entries[t.number as usize - 1] = (ctrl << 28) | (1 << 24) | t.start;
        }
        toc.first = (tracks.first().unwrap().number as u32) << 16;
        toc.last = (tracks.last().unwrap().number as u32) << 16;
        toc.leadout = (1 << 24) | tracks.last().unwrap().end();
        Ok(toc)
    }

    fn set_data_type(&mut self, sector_size: u32, sector_mode: u32) -> DevResult {
        let mut st = self.state.lock();
        st.set_type_count += 1;
        st.cur_type = Some((sector_size, sector_mode));
        Ok(())
    }

    fn read_sectors(&mut self, start: u32, buf: &mut [u8]) -> DevResult {
        let mut st = self.state.lock();
        if !st.disc_ready() {
            return Err(DevError::NoMedium);
        }
        let (sector_size, _) = st.cur_type.ok_or(DevError::BadState)?;
        let sector_size = sector_size as usize;
        if sector_size == 0 || buf.len() % sector_size != 0 {
            return Err(DevError::InvalidParam);
        }
        let count = (buf.len() / sector_size) as u32;
        let track = st
            .sessions
            .iter()
            .flatten()
            .find(|t| start >= t.start && start + count <= t.end())
            .ok_or(DevError::Io)?;
        if track.sector_size != sector_size {
            return Err(DevError::Io);
        }
        let offset = (start - track.start) as usize * sector_size;
        buf.copy_from_slice(&track.data[offset..offset + buf.len()]);
        st.read_log.push((start, count));
        Ok(())
    }
}
