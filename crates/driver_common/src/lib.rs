/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Common traits and types for the device drivers consumed by the Dcfs
//! backends (on-board flash, GD-ROM drive).

#![no_std]

/// All supported device types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// On-board flash storage.
    Flash,
    /// Optical disc drive.
    Optical,
}

/// The error type for device operation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevError {
    /// The device is busy, try again later.
    Again,
    /// The device is in a bad state for the operation.
    BadState,
    /// Invalid parameter/argument.
    InvalidParam,
    /// Input/output error.
    Io,
    /// No medium in the drive.
    NoMedium,
    /// Not enough space/memory.
    NoMemory,
    /// The medium changed since the last command.
    Stale,
    /// This operation is unsupported by the device.
    Unsupported,
}

/// A specialized `Result` type for device operations.
pub type DevResult<T = ()> = Result<T, DevError>;

/// Common operations that require all device drivers to implement.
pub trait BaseDriverOps: Send + Sync {
    /// The name of the device.
    fn device_name(&self) -> &str;

    /// The type of the device.
    fn device_type(&self) -> DeviceType;
}
