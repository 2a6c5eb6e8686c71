//! The `DNX_*` environment contract
//!
//! The process environment is shared with the rest of the bootstrap and is
//! inherited by anything the host starts, so every read and write goes
//! through [`Environment`]. Tests swap in [`MemoryEnvironment`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};

use crate::paths::PATH_CAPACITY;
use crate::platform;

/// `"1"` turns bootstrap tracing on
pub const DNX_TRACE: &str = "DNX_TRACE";

/// Host type marker, defaulted to `"1"` for console launches
pub const DNX_CONSOLE_HOST: &str = "DNX_CONSOLE_HOST";

/// Application base directory
pub const DNX_APPBASE: &str = "DNX_APPBASE";

/// Read/write access to environment variables
pub trait Environment {
    /// Value of `name`, or `None` when it is not set
    fn var(&self, name: &str) -> Option<OsString>;

    /// Set `name` for this process and the processes it starts
    fn set_var(&self, name: &str, value: &str);
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<OsString> {
        std::env::var_os(name)
    }

    fn set_var(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }
}

/// In-memory environment
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    vars: RefCell<HashMap<String, OsString>>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OsString>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            vars: RefCell::new(vars),
        }
    }
}

impl Environment for MemoryEnvironment {
    fn var(&self, name: &str) -> Option<OsString> {
        self.vars.borrow().get(name).cloned()
    }

    fn set_var(&self, name: &str, value: &str) {
        self.vars
            .borrow_mut()
            .insert(name.to_string(), OsString::from(value));
    }
}

/// True only when `DNX_TRACE` is exactly `"1"`
pub fn is_tracing_enabled(env: &impl Environment) -> bool {
    env.var(DNX_TRACE)
        .is_some_and(|value| value.as_os_str() == OsStr::new("1"))
}

/// Default `DNX_CONSOLE_HOST` to `"1"` when it is not set at all
///
/// A value that is present, even an empty one, is left alone.
pub fn set_console_host(env: &impl Environment) {
    if env.var(DNX_CONSOLE_HOST).is_none() {
        env.set_var(DNX_CONSOLE_HOST, "1");
    }
}

/// Application base from `DNX_APPBASE`
///
/// Fails when the variable is unset or empty, or when the value would not
/// fit a platform path buffer (length at or above [`PATH_CAPACITY`]).
pub fn app_base_from_environment(env: &impl Environment) -> Option<OsString> {
    let value = env.var(DNX_APPBASE)?;
    if fits_path_buffer(&value) {
        Some(value)
    } else {
        None
    }
}

fn fits_path_buffer(value: &OsStr) -> bool {
    let length = platform::native_len(value);
    length != 0 && length < PATH_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_only_for_exactly_one() {
        assert!(is_tracing_enabled(&MemoryEnvironment::with([(DNX_TRACE, "1")])));

        for value in ["0", "true", "11", "10", "", " 1", "yes"] {
            let env = MemoryEnvironment::with([(DNX_TRACE, value)]);
            assert!(!is_tracing_enabled(&env), "DNX_TRACE={value:?} should not enable tracing");
        }

        assert!(!is_tracing_enabled(&MemoryEnvironment::new()));
    }

    #[test]
    fn console_host_defaults_once() {
        let env = MemoryEnvironment::new();

        set_console_host(&env);
        assert_eq!(env.var(DNX_CONSOLE_HOST), Some(OsString::from("1")));

        set_console_host(&env);
        assert_eq!(env.var(DNX_CONSOLE_HOST), Some(OsString::from("1")));
    }

    #[test]
    fn console_host_keeps_existing_value() {
        let env = MemoryEnvironment::with([(DNX_CONSOLE_HOST, "0")]);
        set_console_host(&env);
        assert_eq!(env.var(DNX_CONSOLE_HOST), Some(OsString::from("0")));

        let env = MemoryEnvironment::with([(DNX_CONSOLE_HOST, "")]);
        set_console_host(&env);
        assert_eq!(env.var(DNX_CONSOLE_HOST), Some(OsString::new()));
    }

    #[test]
    fn app_base_requires_a_value() {
        assert_eq!(app_base_from_environment(&MemoryEnvironment::new()), None);

        let env = MemoryEnvironment::with([(DNX_APPBASE, "")]);
        assert_eq!(app_base_from_environment(&env), None);
    }

    #[test]
    fn app_base_bounded_by_path_capacity() {
        let fits = "a".repeat(PATH_CAPACITY - 1);
        let env = MemoryEnvironment::with([(DNX_APPBASE, fits.as_str())]);
        assert_eq!(app_base_from_environment(&env), Some(OsString::from(&fits)));

        let at_capacity = "a".repeat(PATH_CAPACITY);
        let env = MemoryEnvironment::with([(DNX_APPBASE, at_capacity.as_str())]);
        assert_eq!(app_base_from_environment(&env), None);

        let over = "a".repeat(PATH_CAPACITY + 10);
        let env = MemoryEnvironment::with([(DNX_APPBASE, over.as_str())]);
        assert_eq!(app_base_from_environment(&env), None);
    }

    #[test]
    fn app_base_copies_value() {
        let env = MemoryEnvironment::with([(DNX_APPBASE, "../apps/hello")]);
        assert_eq!(
            app_base_from_environment(&env),
            Some(OsString::from("../apps/hello"))
        );
    }
}
