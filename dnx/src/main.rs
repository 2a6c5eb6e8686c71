//! dnx native bootstrapper
//!
//! Runs before any managed runtime exists: works out where it lives and what
//! the application base is, optionally waits for a debugger, then loads the
//! host module and hands control to its `CallApplicationMain` export. The
//! host's result becomes this process's exit code.
//!
//! Usage:
//!   dnx [--bootstrapper-debug] [--appbase <DIR>] [--host <PATH>] \
//!       [--entry-point <NAME>] [-- <application args>...]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dnx_pal::{
    app_base_from_environment, call_application_main, full_path, host_module_file_name,
    is_tracing_enabled, native_bootstrapper_directory, set_console_host,
    wait_for_debugger_to_attach, ApplicationArguments, Environment, LogTraceWriter,
    ProcessEnvironment, SystemModuleLoader, CALL_APPLICATION_MAIN,
};

#[derive(Parser, Debug)]
#[command(name = "dnx")]
#[command(about = "Bootstrap the application host and run an application")]
struct Args {
    /// Wait for a debugger to attach before loading the host
    #[arg(long)]
    bootstrapper_debug: bool,

    /// Application base directory (default: DNX_APPBASE, then the current directory)
    #[arg(long, value_name = "DIR")]
    appbase: Option<PathBuf>,

    /// Host module to load (default: the dnx_host library next to this executable)
    #[arg(long, value_name = "PATH")]
    host: Option<PathBuf>,

    /// Export to call in the host module
    #[arg(long, value_name = "NAME", default_value = CALL_APPLICATION_MAIN)]
    entry_point: String,

    /// Arguments passed through to the application
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let args = Args::parse();
    let env = ProcessEnvironment;

    let tracing = is_tracing_enabled(&env);
    init_logging(tracing);

    match run(args, &env, tracing) {
        Ok(code) => process::exit(exit_status(code)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

fn init_logging(tracing: bool) {
    let default_filter = if tracing { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run(args: Args, env: &impl Environment, tracing: bool) -> Result<i32> {
    set_console_host(env);

    if args.bootstrapper_debug {
        wait_for_debugger_to_attach();
    }

    let runtime_directory =
        native_bootstrapper_directory().context("Failed to locate the bootstrapper directory")?;
    log::debug!("Runtime directory: {runtime_directory}");

    let requested_base = application_base(args.appbase, env)?;
    let Some(app_base) = full_path(Path::new(&requested_base)) else {
        bail!(
            "Invalid application base: {}",
            Path::new(&requested_base).display()
        );
    };
    let app_base = app_base
        .to_str()
        .context("Application base is not valid Unicode")?
        .to_string();
    log::debug!("Application base: {app_base}");

    let host = host_module_path(args.host, &runtime_directory);
    let arguments = ApplicationArguments::new(&app_base, &runtime_directory, args.args)?;
    let mut data = arguments.data();
    let trace = LogTraceWriter::new(tracing);

    let code = unsafe {
        call_application_main(
            &SystemModuleLoader,
            &host,
            &args.entry_point,
            &mut data,
            &trace,
        )
    }?;

    log::debug!("Application exited with code {code}");
    Ok(code)
}

/// Process exit status for the host's result
///
/// Unix keeps only the low 8 bits of an exit code, which would turn a failure
/// status such as `0x80070100` into a clean exit. A non-zero result whose low
/// byte is zero exits with 1 instead.
fn exit_status(code: i32) -> i32 {
    if cfg!(unix) && code != 0 && (code & 0xff) == 0 {
        1
    } else {
        code
    }
}

/// `--appbase`, then `DNX_APPBASE`, then the current directory
fn application_base(explicit: Option<PathBuf>, env: &impl Environment) -> Result<OsString> {
    if let Some(path) = explicit {
        return Ok(path.into_os_string());
    }

    if let Some(path) = app_base_from_environment(env) {
        return Ok(path);
    }

    log::debug!("DNX_APPBASE not usable, falling back to the current directory");
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.into_os_string())
}

/// `--host`, or the platform host library in the bootstrapper's directory
fn host_module_path(explicit: Option<PathBuf>, runtime_directory: &str) -> OsString {
    match explicit {
        Some(path) => path.into_os_string(),
        None => {
            let mut path = OsString::from(runtime_directory);
            path.push(host_module_file_name());
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use dnx_pal::{MemoryEnvironment, DNX_APPBASE, PATH_CAPACITY};

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn application_args_follow_separator() {
        let args = Args::try_parse_from(["dnx", "--appbase", "apps/hello", "--", "--exit", "7"])
            .expect("arguments parse");

        assert_eq!(args.appbase, Some(PathBuf::from("apps/hello")));
        assert_eq!(args.entry_point, CALL_APPLICATION_MAIN);
        assert!(!args.bootstrapper_debug);
        assert_eq!(args.args, ["--exit", "7"]);
    }

    #[test]
    fn explicit_app_base_wins() {
        let env = MemoryEnvironment::with([(DNX_APPBASE, "/from/env")]);
        let base = application_base(Some(PathBuf::from("/from/cli")), &env).expect("app base");
        assert_eq!(base, OsString::from("/from/cli"));
    }

    #[test]
    fn app_base_from_environment_next() {
        let env = MemoryEnvironment::with([(DNX_APPBASE, "/from/env")]);
        let base = application_base(None, &env).expect("app base");
        assert_eq!(base, OsString::from("/from/env"));
    }

    #[test]
    fn unusable_app_base_falls_back_to_cwd() {
        let cwd = std::env::current_dir().expect("current dir").into_os_string();

        let base = application_base(None, &MemoryEnvironment::new()).expect("app base");
        assert_eq!(base, cwd);

        let too_long = "a".repeat(PATH_CAPACITY);
        let env = MemoryEnvironment::with([(DNX_APPBASE, too_long.as_str())]);
        let base = application_base(None, &env).expect("app base");
        assert_eq!(base, cwd);
    }

    #[test]
    fn exit_status_passes_ordinary_codes_through() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(7), 7);
        assert_eq!(exit_status(0x8000_4005_u32 as i32), 0x8000_4005_u32 as i32);
    }

    #[cfg(unix)]
    #[test]
    fn failure_status_never_exits_cleanly() {
        assert_eq!(exit_status(0x8007_0100_u32 as i32), 1);
        assert_eq!(exit_status(-256), 1);
        assert_eq!(exit_status(256), 1);
    }

    #[cfg(windows)]
    #[test]
    fn windows_keeps_full_status() {
        assert_eq!(exit_status(0x8007_0100_u32 as i32), 0x8007_0100_u32 as i32);
    }

    #[test]
    fn default_host_sits_next_to_bootstrapper() {
        let host = host_module_path(None, "/opt/dnx/");
        let mut expected = OsString::from("/opt/dnx/");
        expected.push(host_module_file_name());
        assert_eq!(host, expected);

        let host = host_module_path(Some(PathBuf::from("/custom/host.so")), "/opt/dnx/");
        assert_eq!(host, OsString::from("/custom/host.so"));
    }
}
