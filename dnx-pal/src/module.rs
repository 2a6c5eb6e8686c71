//! Loading the host module and calling its entry point
//!
//! The bootstrapper supports exactly one call pattern: load one module,
//! resolve [`CALL_APPLICATION_MAIN`] (or another export with the same
//! signature), call it once with a [`CallApplicationMainData`], and unload.
//! The module is released when its handle is dropped, so it goes away on
//! every exit path, including a fault unwinding out of the entry point.

use std::ffi::{c_char, c_int, CString, OsStr, OsString};
use std::marker::PhantomData;
use std::ptr;

use crate::{platform, PalError, TraceWriter};

/// Export the bootstrapper calls in the host module
pub const CALL_APPLICATION_MAIN: &str = "CallApplicationMain";

const HOST_LIBRARY: &str = "dnx_host";

/// Entry point signature: takes the call payload, returns a status code
///
/// Non-negative statuses mean success. Under the `C-unwind` ABI a fault
/// raised by the host unwinds back into the bootstrapper. A host built as its
/// own cdylib carries its own Rust runtime, so its panic arrives as a foreign
/// exception and the process aborts once it reaches Rust frames in `dnx`.
/// The module is never asked to report a fault as a status.
pub type ApplicationMainFn =
    for<'a> unsafe extern "C-unwind" fn(*mut CallApplicationMainData<'a>) -> i32;

/// Payload handed to the host's entry point
///
/// Strings are NUL-terminated UTF-8. `argv` holds `argc` entries followed by
/// a null pointer. The host reports its exit code through `exitcode`.
#[repr(C)]
#[derive(Debug)]
pub struct CallApplicationMainData<'a> {
    pub application_base: *const c_char,
    pub runtime_directory: *const c_char,
    pub argc: c_int,
    pub argv: *const *const c_char,
    pub exitcode: c_int,
    _arguments: PhantomData<&'a ApplicationArguments>,
}

/// Owns the strings a [`CallApplicationMainData`] points into
#[derive(Debug)]
pub struct ApplicationArguments {
    application_base: CString,
    runtime_directory: CString,
    args: Vec<CString>,
    argv: Vec<*const c_char>,
}

impl ApplicationArguments {
    pub fn new<I, S>(application_base: &str, runtime_directory: &str, args: I) -> Result<Self, PalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args
            .into_iter()
            .map(|arg| to_c_string(arg.into()))
            .collect::<Result<Vec<_>, _>>()?;

        // CString data lives on the heap, so these stay valid when `args` moves
        let argv = args
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();

        Ok(Self {
            application_base: to_c_string(application_base.to_string())?,
            runtime_directory: to_c_string(runtime_directory.to_string())?,
            args,
            argv,
        })
    }

    /// Fresh payload with `exitcode` zeroed
    pub fn data(&self) -> CallApplicationMainData<'_> {
        CallApplicationMainData {
            application_base: self.application_base.as_ptr(),
            runtime_directory: self.runtime_directory.as_ptr(),
            argc: self.args.len() as c_int,
            argv: self.argv.as_ptr(),
            exitcode: 0,
            _arguments: PhantomData,
        }
    }
}

fn to_c_string(value: String) -> Result<CString, PalError> {
    CString::new(value).map_err(|err| {
        let bytes = err.into_vec();
        PalError::InteriorNul(String::from_utf8_lossy(&bytes).into_owned())
    })
}

/// A loaded module; dropping it releases the module
pub trait LoadedModule {
    /// Address of the export named `symbol`
    ///
    /// # Safety
    ///
    /// If the export exists it must have the [`ApplicationMainFn`] signature,
    /// and the returned pointer must not be called after `self` is dropped.
    unsafe fn application_main(&self, symbol: &str) -> Option<ApplicationMainFn>;
}

/// Opens modules for [`call_application_main`]
pub trait ModuleLoader {
    type Module: LoadedModule;

    /// Load `module`; the error is a human-readable reason
    ///
    /// # Safety
    ///
    /// Loading runs the module's initializers.
    unsafe fn load(&self, module: &OsStr) -> Result<Self::Module, String>;
}

/// Loads modules from disk with the platform's restricted search policy
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemModuleLoader;

/// A module opened by [`SystemModuleLoader`]
#[derive(Debug)]
pub struct SystemModule(libloading::Library);

impl ModuleLoader for SystemModuleLoader {
    type Module = SystemModule;

    unsafe fn load(&self, module: &OsStr) -> Result<SystemModule, String> {
        platform::open_module(module)
            .map(SystemModule)
            .map_err(|err| err.to_string())
    }
}

impl LoadedModule for SystemModule {
    unsafe fn application_main(&self, symbol: &str) -> Option<ApplicationMainFn> {
        self.0
            .get::<ApplicationMainFn>(symbol.as_bytes())
            .ok()
            .map(|export| *export)
    }
}

/// Platform file name of the default host module (`libdnx_host.so`,
/// `libdnx_host.dylib`, `dnx_host.dll`)
pub fn host_module_file_name() -> OsString {
    libloading::library_filename(HOST_LIBRARY)
}

/// Whether an entry point status means success
pub fn succeeded(status: i32) -> bool {
    status >= 0
}

/// Load `module`, call its `function` export with `data`, and unload it
///
/// Returns `data.exitcode` when the entry point reports success, otherwise
/// the raw status it returned. Two verbose trace events are written on the
/// way in ("Loaded module", "Found export") and none on failure paths. A
/// fault raised by the entry point propagates unchanged after the module
/// has been released.
///
/// # Safety
///
/// `function` must have the [`ApplicationMainFn`] signature in `module`, and
/// loading and running the module's code must be sound.
pub unsafe fn call_application_main<L: ModuleLoader>(
    loader: &L,
    module: &OsStr,
    function: &str,
    data: &mut CallApplicationMainData<'_>,
    trace: &dyn TraceWriter,
) -> Result<i32, PalError> {
    let module_name = module.to_string_lossy();

    let host = loader
        .load(module)
        .map_err(|reason| PalError::ModuleLoad {
            module: module_name.to_string(),
            reason,
        })?;

    trace.write(&format!("Loaded module: {module_name}"), true);

    let entry = host
        .application_main(function)
        .ok_or_else(|| PalError::SymbolNotFound {
            module: module_name.to_string(),
            symbol: function.to_string(),
        })?;

    trace.write(&format!("Found export: {function}"), true);

    let status = entry(data);
    drop(host);

    Ok(if succeeded(status) { data.exitcode } else { status })
}
