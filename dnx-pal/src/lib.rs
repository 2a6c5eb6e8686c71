//! Platform abstraction layer for the dnx native bootstrapper.
//!
//! Everything the bootstrapper needs from the operating system before the
//! runtime host is running lives here: locating the bootstrapper's own
//! directory, the `DNX_*` environment contract, app-base path normalization,
//! the developer-only debugger wait, and loading the host module to invoke
//! its `CallApplicationMain` export.

// Linux reads /proc, macOS asks sysctl, Windows uses Win32
#[cfg(target_os = "linux")]
#[path = "linux.rs"]
mod platform;

#[cfg(target_os = "macos")]
#[path = "macos.rs"]
mod platform;

#[cfg(target_os = "windows")]
#[path = "windows.rs"]
mod platform;

#[cfg(unix)]
mod unix;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
compile_error!("dnx-pal supports Linux, macOS and Windows");

mod debugger;
mod env;
mod error;
mod module;
mod paths;
mod trace;

pub use debugger::{wait_for_debugger_to_attach, wait_for_debugger_with, POLL_INTERVAL};
pub use env::{
    app_base_from_environment, is_tracing_enabled, set_console_host, Environment,
    MemoryEnvironment, ProcessEnvironment, DNX_APPBASE, DNX_CONSOLE_HOST, DNX_TRACE,
};
pub use error::PalError;
pub use module::{
    call_application_main, host_module_file_name, succeeded, ApplicationArguments,
    ApplicationMainFn, CallApplicationMainData, LoadedModule, ModuleLoader, SystemModule,
    SystemModuleLoader, CALL_APPLICATION_MAIN,
};
pub use paths::{directory_of, full_path, native_bootstrapper_directory, PATH_CAPACITY};
pub use trace::{LogTraceWriter, TraceWriter};
