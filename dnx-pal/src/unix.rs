// Pieces shared by the Linux and macOS backends

use std::ffi::OsStr;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{self, Component, Path, PathBuf};

use libloading::os::unix::{Library, RTLD_LOCAL, RTLD_NOW};

use crate::PalError;

pub(crate) const PATH_CAPACITY: usize = libc::PATH_MAX as usize;

pub(crate) fn native_len(value: &OsStr) -> usize {
    value.as_bytes().len()
}

pub(crate) fn full_path_name(path: &Path) -> Result<PathBuf, PalError> {
    let full = absolutize(path).map_err(|_| PalError::FullPath {
        path: path.display().to_string(),
    })?;

    let length = native_len(full.as_os_str());
    if length >= PATH_CAPACITY {
        return Err(PalError::PathTooLong {
            length,
            capacity: PATH_CAPACITY,
        });
    }

    Ok(full)
}

// Lexical normalization matching GetFullPathName: relative paths are anchored
// at the current directory and `.`/`..` are folded without touching the disk
fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let absolute = path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

// The driver passes full paths, so no search path is consulted
pub(crate) unsafe fn open_module(module: &OsStr) -> Result<libloading::Library, libloading::Error> {
    Library::open(Some(module), RTLD_NOW | RTLD_LOCAL).map(Into::into)
}
