//! Windows backend using Win32 APIs
//!
//! - GetFullPathNameW for app-base normalization
//! - IsDebuggerPresent for the debugger wait
//! - LoadLibraryExW restricted to LOAD_LIBRARY_SEARCH_DEFAULT_DIRS so a
//!   planted DLL on PATH or in the working directory is never picked up

use std::ffi::{OsStr, OsString};
use std::iter;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use libloading::os::windows::{Library, LOAD_LIBRARY_SEARCH_DEFAULT_DIRS};
use windows::core::PCWSTR;
use windows::Win32::Foundation::MAX_PATH;
use windows::Win32::Storage::FileSystem::GetFullPathNameW;
use windows::Win32::System::Diagnostics::Debug::IsDebuggerPresent;

use crate::PalError;

pub(crate) const PATH_CAPACITY: usize = MAX_PATH as usize;

// Lengths are in UTF-16 units, the same units Win32 buffers are sized in
pub(crate) fn native_len(value: &OsStr) -> usize {
    value.encode_wide().count()
}

pub(crate) fn is_debugger_present() -> bool {
    unsafe { IsDebuggerPresent() }.as_bool()
}

pub(crate) fn full_path_name(path: &Path) -> Result<PathBuf, PalError> {
    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(iter::once(0))
        .collect();
    let mut buffer = [0u16; PATH_CAPACITY];

    // Returns the length without the terminator on success, or the required
    // size including the terminator when the buffer is too small
    let length =
        unsafe { GetFullPathNameW(PCWSTR(wide.as_ptr()), Some(&mut buffer[..]), None) } as usize;

    if length == 0 {
        return Err(PalError::FullPath {
            path: path.display().to_string(),
        });
    }
    if length >= PATH_CAPACITY {
        return Err(PalError::PathTooLong {
            length,
            capacity: PATH_CAPACITY,
        });
    }

    Ok(PathBuf::from(OsString::from_wide(&buffer[..length])))
}

pub(crate) unsafe fn open_module(module: &OsStr) -> Result<libloading::Library, libloading::Error> {
    Library::load_with_flags(module, LOAD_LIBRARY_SEARCH_DEFAULT_DIRS).map(Into::into)
}
