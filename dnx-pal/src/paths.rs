//! Bootstrapper directory and app-base path normalization

use std::path::{self, Path, PathBuf};

use crate::{platform, PalError};

/// Capacity of a platform path buffer, in native units
///
/// `MAX_PATH` UTF-16 units on Windows, `PATH_MAX` bytes elsewhere. Values of
/// this length or longer are rejected.
pub const PATH_CAPACITY: usize = platform::PATH_CAPACITY;

/// Directory holding the running bootstrapper, with a trailing separator
///
/// The result can be joined with a bare file name by plain concatenation.
pub fn native_bootstrapper_directory() -> Result<String, PalError> {
    let executable = std::env::current_exe().map_err(PalError::ExecutablePath)?;
    let executable = executable
        .into_os_string()
        .into_string()
        .map_err(|path| PalError::NonUnicodePath(path.into()))?;

    match directory_of(&executable) {
        Some(directory) => Ok(directory.to_string()),
        None => Err(PalError::NoDirectorySeparator(executable)),
    }
}

/// Everything up to and including the last path separator of `path`
pub fn directory_of(path: &str) -> Option<&str> {
    path.rfind(path::is_separator).map(|end| &path[..=end])
}

/// Canonical absolute form of a possibly relative path
///
/// On failure the reason is printed to standard output and `None` is
/// returned; the caller is expected to abort startup.
pub fn full_path(path: &Path) -> Option<PathBuf> {
    match platform::full_path_name(path) {
        Ok(full) => {
            log::debug!("Application base {} resolved to {}", path.display(), full.display());
            Some(full)
        }
        Err(err) => {
            println!("{err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_keeps_trailing_separator() {
        assert_eq!(directory_of("/usr/local/bin/dnx"), Some("/usr/local/bin/"));
        assert_eq!(directory_of("/dnx"), Some("/"));
        assert_eq!(directory_of("bin/"), Some("bin/"));
    }

    #[test]
    fn directory_without_separator_is_none() {
        assert_eq!(directory_of("dnx"), None);
        assert_eq!(directory_of(""), None);
    }

    #[cfg(windows)]
    #[test]
    fn directory_of_windows_path() {
        assert_eq!(
            directory_of(r"C:\Program Files\dnx\bin\dnx.exe"),
            Some(r"C:\Program Files\dnx\bin\")
        );
    }

    #[test]
    fn own_directory_contains_test_binary() {
        let directory = native_bootstrapper_directory().expect("own directory");
        assert!(directory.ends_with(path::MAIN_SEPARATOR));

        let executable = std::env::current_exe().expect("current exe");
        assert_eq!(
            Path::new(&directory),
            executable.parent().expect("executable has a parent")
        );
    }

    #[cfg(unix)]
    #[test]
    fn full_path_folds_dot_components() {
        assert_eq!(
            full_path(Path::new("/srv/apps/../sites/./hello")),
            Some(PathBuf::from("/srv/sites/hello"))
        );
        assert_eq!(full_path(Path::new("/..")), Some(PathBuf::from("/")));
    }

    #[cfg(unix)]
    #[test]
    fn full_path_anchors_relative_paths() {
        let cwd = std::env::current_dir().expect("current dir");
        assert_eq!(full_path(Path::new("apps/hello")), Some(cwd.join("apps/hello")));
    }

    #[test]
    fn full_path_rejects_empty_path() {
        assert_eq!(full_path(Path::new("")), None);

        match platform::full_path_name(Path::new("")) {
            Err(err @ PalError::FullPath { .. }) => assert_eq!(
                err.to_string(),
                "Failed to get full path of application base: "
            ),
            other => panic!("expected FullPath, got {other:?}"),
        }
    }

    #[test]
    fn normalization_diagnostics_keep_their_text() {
        let err = PalError::FullPath {
            path: "apps/hello".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to get full path of application base: apps/hello"
        );

        let err = PalError::PathTooLong {
            length: PATH_CAPACITY + 1,
            capacity: PATH_CAPACITY,
        };
        assert_eq!(err.to_string(), "Full path of application base is too long");
    }

    #[cfg(unix)]
    #[test]
    fn full_path_rejects_paths_over_capacity() {
        let long = format!("/{}", "a".repeat(PATH_CAPACITY));
        assert_eq!(full_path(Path::new(&long)), None);

        match platform::full_path_name(Path::new(&long)) {
            Err(PalError::PathTooLong { length, capacity }) => {
                assert_eq!(length, PATH_CAPACITY + 1);
                assert_eq!(capacity, PATH_CAPACITY);
            }
            other => panic!("expected PathTooLong, got {other:?}"),
        }
    }
}
