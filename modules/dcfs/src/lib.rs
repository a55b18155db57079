/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Read-only virtual filesystem for Dreamcast-class media.
//!
//! The engine unifies three device-backed sources under one pathname space:
//!
//! ```text
//! /
//! ├── rom/                    boot ROM window
//! ├── flash/
//! │   ├── partition0
//! │   └── …                   every index the flash probe reports
//! └── gdrom/                  present only while media is mounted
//!     ├── session1/
//!     │   ├── toc
//!     │   └── trackNN.(iso|cdda)
//!     └── session2/
//! ```
//!
//! The tree is a graph of typed nodes; user-facing calls go through a
//! [`Session`] ([`api`]) and handle objects ([`fops`]). The `/gdrom`
//! subtree is built and torn down by the disc monitor (`monitor` module,
//! `std` feature) as media is inserted or removed; handles left open on a
//! removed subtree are orphaned: `close` still succeeds, anything else
//! reports `StaleHandle`.
//!
//! Everything is read-only: `write`, `mkdir`, `rmdir`, `rename` and
//! `remove` report `Unsupported`, write-mode opens report `ReadOnly`.
//!
//! # Cargo Features
//!
//! - `std`: enable the threaded disc monitor (`monitor::DiscMonitor::spawn`).
//!   Without it the crate is `no_std` + `alloc` and the monitor bodies can
//!   be driven from a host-provided timer and mailbox.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
extern crate log;

extern crate alloc;

pub mod api;
pub mod flash;
pub mod fops;
pub mod gdrom;
pub mod rom;

mod node;
mod root;

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        pub mod monitor;
    }
}

#[cfg(test)]
mod tests;

pub use self::api::Session;
pub use self::node::VfsNode;
pub use self::root::{init_rootfs, Vfs};

pub use dcfs_vfs::{AbsPath, VfsDirEntry, VfsError, VfsNodeAttr, VfsNodeType, VfsResult};
