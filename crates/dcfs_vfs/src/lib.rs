/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Virtual filesystem interfaces used by the Dcfs engine.
//!
//! The filesystem is a tree of **nodes**, virtual directories and
//! device-backed leaves. This crate carries the types shared between the
//! engine and its callers:
//!
//! - [`VfsNodeAttr`], [`VfsNodeType`]: what `stat` reports.
//! - [`VfsDirEntry`]: one `readdir` result.
//! - [`AbsPath`] and [`canonicalize`]: user path normalization. Lookups are
//!   case-sensitive and byte-exact; `.` and `..` are resolved during
//!   normalization, never by the tree walk.

#![no_std]

extern crate alloc;

mod path;
mod structs;

pub use self::path::{canonicalize, AbsPath};
pub use self::structs::{VfsDirEntry, VfsNodeAttr, VfsNodeType};

/// Alias of [`DcError`](dcerrno::DcError).
pub type VfsError = dcerrno::DcError;

/// Alias of [`DcResult`](dcerrno::DcResult).
pub type VfsResult<T = ()> = dcerrno::DcResult<T>;
