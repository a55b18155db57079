/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

//! Absolute path construction.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

/// An absolute, canonical path.
///
/// Starts with `/`, contains no `.` or `..` components and no repeated
/// separators. A single trailing `/` is preserved when the input carried
/// one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsPath<'a>(Cow<'a, str>);

impl<'a> AbsPath<'a> {
    /// Wraps an already-canonical path string.
    pub fn new(path: &'a str) -> Self {
        debug_assert!(path.starts_with('/'));
        Self(Cow::Borrowed(path))
    }

    /// The filesystem root, `/`.
    pub const fn root() -> AbsPath<'static> {
        AbsPath(Cow::Borrowed("/"))
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Clones the path with `'static` lifetime.
    pub fn to_owned(&self) -> AbsPath<'static> {
        AbsPath(Cow::Owned(String::from(self.as_str())))
    }
}

impl core::ops::Deref for AbsPath<'_> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AbsPath<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds the canonical absolute form of a user path.
///
/// If `path` starts with `/` or no `base` is given, construction starts at
/// the root, otherwise at `base`. Components are joined with exactly one
/// `/`; `.` is elided and `..` pops one component, never past the root. A
/// trailing empty segment (input ending in `/`) keeps a trailing `/` in the
/// result. The function is idempotent over its own output.
pub fn canonicalize(base: Option<&AbsPath>, path: &str) -> AbsPath<'static> {
    if path.is_empty() {
        return match base {
            Some(base) => base.to_owned(),
            None => AbsPath::root(),
        };
    }
    let mut comps: Vec<&str> = Vec::new();
    if !path.starts_with('/') {
        if let Some(base) = base {
            comps.extend(base.split('/').filter(|c| !c.is_empty()));
        }
    }
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                comps.pop();
            }
            name => comps.push(name),
        }
    }
    let mut out = String::with_capacity(path.len() + 1);
    for c in &comps {
        out.push('/');
        out.push_str(c);
    }
    if comps.is_empty() {
        out.push('/');
    } else if path.ends_with('/') {
        out.push('/');
    }
    AbsPath(Cow::Owned(out))
}
