/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Background watcher that mounts and unmounts the optical subtree as
//! media comes and goes.
//!
//! Two small threads: a ticker polls the drive state twice per second and
//! posts every change into a bounded mailbox; a worker blocks on the
//! mailbox and reacts. Only the worker mutates the tree, always under the
//! engine lock (inside [`GdromBackend::mount`]/[`GdromBackend::unmount`]).
//! The monitor itself owns nothing but the last observed state.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use driver_gdrom::status;
use spin::Mutex;

use crate::gdrom::GdromBackend;

/// Drive poll period: twice per second.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Depth of the state-change mailbox.
const MAILBOX_DEPTH: usize = 8;

/// Watches one drive and keeps `/gdrom` in sync with it.
pub struct DiscMonitor {
    backend: Arc<GdromBackend>,
    oldstate: Mutex<Option<u32>>,
}

impl DiscMonitor {
    pub fn new(backend: Arc<GdromBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            oldstate: Mutex::new(None),
        })
    }

    /// Timer body: queries the drive and reports the new state if it
    /// differs from the last observed one. A failed query counts as an
    /// empty drive.
    pub fn poll(&self) -> Option<u32> {
        let state = self
            .backend
            .drive_stat()
            .map(|s| s.status)
            .unwrap_or(status::NODISC);
        let mut old = self.oldstate.lock();
        if *old == Some(state) {
            None
        } else {
            *old = Some(state);
            Some(state)
        }
    }

    /// Mailbox body: a ready state mounts the subtree if none exists, any
    /// other state tears it down.
    pub fn handle_state(&self, state: u32) {
        debug!("gdrom: drive state {}", state);
        if (status::PAUSED..=status::SCANNING).contains(&state) {
            if !self.backend.is_mounted() {
                if let Err(e) = self.backend.mount() {
                    debug!("gdrom: mount attempt failed: {:?}", e);
                }
            }
        } else if self.backend.is_mounted() {
            self.backend.unmount();
        }
    }

    /// Spawns the ticker and worker threads. Dropping (or stopping) the
    /// returned handle ends both.
    pub fn spawn(self: &Arc<Self>) -> MonitorHandle {
        let (mbox_tx, mbox_rx) = bounded::<u32>(MAILBOX_DEPTH);
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let ticker = {
            let monitor = self.clone();
            let stop = stop_rx.clone();
            let ticks = tick(POLL_INTERVAL);
            std::thread::spawn(move || loop {
                select! {
                    recv(ticks) -> _ => {
                        if let Some(state) = monitor.poll() {
                            let _ = mbox_tx.send(state);
                        }
                    }
                    recv(stop) -> _ => break,
                }
            })
        };
        let worker = {
            let monitor = self.clone();
            std::thread::spawn(move || loop {
                select! {
                    recv(mbox_rx) -> msg => match msg {
                        Ok(state) => monitor.handle_state(state),
                        Err(_) => break,
                    },
                    recv(stop_rx) -> _ => break,
                }
            })
        };
        MonitorHandle {
            _stop: stop_tx,
            threads: alloc::vec![ticker, worker],
        }
    }
}

/// Owner of the monitor threads. Dropping it signals both to exit; `stop`
/// additionally joins them.
pub struct MonitorHandle {
    _stop: Sender<()>,
    threads: Vec<std::thread::JoinHandle<()>>,
}

impl MonitorHandle {
    /// Stops the monitor and waits for its threads to exit.
    pub fn stop(self) {
        let MonitorHandle { _stop, threads } = self;
        drop(_stop);
        for t in threads {
            let _ = t.join();
        }
    }
}
