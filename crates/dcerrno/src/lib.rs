/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Error codes shared by the Dcfs crates.
//!
//! Every fallible operation in the filesystem stack reports a [`DcError`].
//! Each variant maps to a fixed POSIX errno value through [`DcError::code`];
//! a C-facing layer returns the negated code. Errors are plain values, never
//! panics, and a failed operation does not poison the object it was called
//! on.

#![no_std]

/// The error type used throughout the Dcfs crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcError {
    /// Operation on a closed or otherwise invalid handle.
    BadHandle,
    /// The drive reports that the disc has changed since the last command.
    DriveStale,
    /// Invalid parameter, such as a zero element size.
    InvalidInput,
    /// A device-level failure.
    Io,
    /// The operation needs a regular file but found a directory.
    IsADirectory,
    /// No disc in the drive.
    NoMedium,
    /// An allocation was refused by the device or host.
    NoMemory,
    /// The operation needs a directory but found something else.
    NotADirectory,
    /// The path does not resolve to a node, or a leaf was asked about a
    /// non-empty path remainder.
    NotFound,
    /// Write access on a read-only filesystem.
    ReadOnly,
    /// The handle's node was destroyed underneath it.
    StaleHandle,
    /// The node kind does not implement this operation.
    Unsupported,
}

/// A [`Result`] with [`DcError`] as the error variant.
pub type DcResult<T = ()> = Result<T, DcError>;

impl DcError {
    /// Returns the error description.
    pub const fn as_str(&self) -> &'static str {
        use DcError::*;
        match self {
            BadHandle => "Bad handle",
            DriveStale => "Drive reports stale media",
            InvalidInput => "Invalid input parameter",
            Io => "I/O error",
            IsADirectory => "Is a directory",
            NoMedium => "No medium found",
            NoMemory => "Out of memory",
            NotADirectory => "Not a directory",
            NotFound => "Entity not found",
            ReadOnly => "Read-only filesystem",
            StaleHandle => "Stale handle",
            Unsupported => "Operation not supported",
        }
    }

    /// Returns the POSIX errno value for the error.
    ///
    /// The mapping is fixed; callers that speak errno negate it.
    pub const fn code(self) -> i32 {
        use DcError::*;
        match self {
            NotFound => 2,      // ENOENT
            Io => 5,            // EIO
            BadHandle => 9,     // EBADF
            NoMemory => 12,     // ENOMEM
            NotADirectory => 20, // ENOTDIR
            IsADirectory => 21, // EISDIR
            InvalidInput => 22, // EINVAL
            ReadOnly => 30,     // EROFS
            Unsupported => 38,  // ENOSYS
            StaleHandle => 116, // ESTALE
            DriveStale => 116,  // ESTALE
            NoMedium => 123,    // ENOMEDIUM
        }
    }
}

impl core::fmt::Display for DcError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Convenience method to construct a [`DcError`] type while printing a
/// warning message.
///
/// # Examples
///
/// ```
/// # use dcerrno::{dc_err_type, DcError};
/// #
/// // Also print "[DcError::NotFound]" if the `log` crate is enabled.
/// assert_eq!(dc_err_type!(NotFound), DcError::NotFound);
///
/// // Also print "[DcError::BadHandle] the handle was closed" if the `log`
/// // crate is enabled.
/// assert_eq!(
///     dc_err_type!(BadHandle, "the handle was closed"),
///     DcError::BadHandle,
/// );
/// ```
#[macro_export]
macro_rules! dc_err_type {
    ($err: ident) => {{
        use $crate::DcError::*;
        $crate::__priv::warn!("[DcError::{:?}]", $err);
        $err
    }};
    ($err: ident, $msg: expr) => {{
        use $crate::DcError::*;
        $crate::__priv::warn!("[DcError::{:?}] {}", $err, $msg);
        $err
    }};
}

/// Convenience method to construct an `Err(DcError)` type while printing a
/// warning message.
///
/// # Examples
///
/// ```
/// # use dcerrno::{dc_err, DcError, DcResult};
/// #
/// // Also print "[DcError::Unsupported]" if the `log` crate is enabled.
/// fn test() -> DcResult {
///     dc_err!(Unsupported)
/// }
/// assert_eq!(test().unwrap_err(), DcError::Unsupported);
/// ```
#[macro_export]
macro_rules! dc_err {
    ($err: ident) => {
        Err($crate::dc_err_type!($err))
    };
    ($err: ident, $msg: expr) => {
        Err($crate::dc_err_type!($err, $msg))
    };
}

#[doc(hidden)]
pub mod __priv {
    pub use log::warn;
}

#[cfg(test)]
mod tests {
    use crate::DcError;

    #[test]
    fn errno_codes_are_fixed() {
        assert_eq!(DcError::NotFound.code(), 2);
        assert_eq!(DcError::Io.code(), 5);
        assert_eq!(DcError::BadHandle.code(), 9);
        assert_eq!(DcError::NotADirectory.code(), 20);
        assert_eq!(DcError::ReadOnly.code(), 30);
        assert_eq!(DcError::Unsupported.code(), 38);
        assert_eq!(DcError::StaleHandle.code(), 116);
        assert_eq!(DcError::DriveStale.code(), 116);
        assert_eq!(DcError::NoMedium.code(), 123);
    }
}
