//! Test runner for the dnx bootstrapper
//!
//! This test runner validates the bootstrapper end to end by:
//! 1. Launching the built `dnx` binary against the `dnx_host` demo module
//! 2. Driving the host through its command line (`--exit`, `--fail`, `--panic`)
//! 3. Checking exit codes, trace output, and the host's REPORT line
//!
//! Usage: test-runner --dnx <path> --host <path> [--work-dir <dir>]
//!
//! Build first with `cargo build`; both artifacts land in the target directory.

use std::env;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::process::{Command, ExitCode};

use serde_json::Value;

/// Variables the runner controls for every launch
const DNX_VARS: [&str; 4] = ["DNX_TRACE", "DNX_APPBASE", "DNX_CONSOLE_HOST", "RUST_LOG"];

/// E_FAIL
const FAILURE_STATUS: &str = "0x80004005";

/// Test configuration
struct TestConfig {
    /// Path to the dnx bootstrapper binary
    dnx_path: PathBuf,
    /// Path to the dnx_host demo module
    host_path: PathBuf,
    /// Working directory for test artifacts
    work_dir: PathBuf,
}

/// Output of one dnx run
struct Run {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

impl TestConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = env::args().collect();

        let mut dnx_path = None;
        let mut host_path = None;
        let mut work_dir = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--dnx" | "--host" | "--work-dir" if i + 1 >= args.len() => {
                    return Err(format!("{} requires a value", args[i]));
                }
                "--dnx" => {
                    i += 1;
                    dnx_path = Some(PathBuf::from(&args[i]));
                }
                "--host" => {
                    i += 1;
                    host_path = Some(PathBuf::from(&args[i]));
                }
                "--work-dir" => {
                    i += 1;
                    work_dir = Some(PathBuf::from(&args[i]));
                }
                "--help" | "-h" => {
                    println!("Usage: test-runner --dnx <path> --host <path> [--work-dir <dir>]");
                    println!();
                    println!("Options:");
                    println!("  --dnx       Path to the dnx bootstrapper binary");
                    println!("  --host      Path to the dnx_host demo module");
                    println!("  --work-dir  Working directory for test artifacts (default: temp dir)");
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("Unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        let dnx_path = dnx_path.ok_or("--dnx is required")?;
        let host_path = host_path.ok_or("--host is required")?;
        let work_dir = work_dir.unwrap_or_else(|| env::temp_dir().join("dnx-tests"));
        let work_dir = std::path::absolute(&work_dir)
            .map_err(|e| format!("Failed to resolve work dir: {}", e))?;

        if !dnx_path.exists() {
            return Err(format!("dnx not found: {}", dnx_path.display()));
        }
        if !host_path.exists() {
            return Err(format!("Host module not found: {}", host_path.display()));
        }

        // Some runs set their own working directory, so both paths must be
        // absolute
        let dnx_path = fs::canonicalize(&dnx_path)
            .map_err(|e| format!("Failed to resolve dnx path: {}", e))?;
        let host_path = fs::canonicalize(&host_path)
            .map_err(|e| format!("Failed to resolve host path: {}", e))?;

        Ok(Self {
            dnx_path,
            host_path,
            work_dir,
        })
    }
}

/// Run dnx with a clean DNX_* environment plus `vars`
fn run_dnx(
    config: &TestConfig,
    args: &[&str],
    vars: &[(&str, &str)],
    cwd: Option<&Path>,
) -> Result<Run, String> {
    let mut cmd = Command::new(&config.dnx_path);

    for var in DNX_VARS {
        cmd.env_remove(var);
    }
    for (key, value) in vars {
        cmd.env(key, value);
    }
    if let Some(dir) = cwd {
        if !config.dnx_path.is_absolute() {
            return Err(format!("dnx path must be absolute: {}", config.dnx_path.display()));
        }
        cmd.current_dir(dir);
    }

    cmd.args(args);

    let output = cmd.output().map_err(|e| format!("Failed to run dnx: {}", e))?;

    Ok(Run {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// The host's REPORT line as JSON
fn report(run: &Run) -> Result<Value, String> {
    let line = run
        .stdout
        .lines()
        .find_map(|line| line.strip_prefix("REPORT:"))
        .ok_or_else(|| format!("No REPORT line in output: {}", run.stdout))?;

    serde_json::from_str(line).map_err(|e| format!("Bad REPORT line '{}': {}", line, e))
}

fn host_arg(config: &TestConfig) -> String {
    config.host_path.display().to_string()
}

fn make_dir(config: &TestConfig, name: &str) -> Result<PathBuf, String> {
    let dir = config.work_dir.join(name);
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
    Ok(dir)
}

/// The child resolves its own working directory, which may differ from ours
/// by symlinks, so directories are compared in canonical form
fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Exit status the OS reports for a process exit code
fn observed_exit_code(code: i32) -> i32 {
    if cfg!(windows) {
        code
    } else {
        code & 0xff
    }
}

/// Test: exit code written by the host becomes dnx's exit code
fn test_exit_code_forwarding(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: exit_code_forwarding");

    let app = make_dir(config, "exit_code_app")?;
    let app_arg = app.display().to_string();
    let host = host_arg(config);

    let run = run_dnx(
        config,
        &["--host", &host, "--appbase", &app_arg, "--", "--exit", "7", "extra"],
        &[],
        None,
    )?;

    if run.exit_code != 7 {
        return Err(format!("Expected exit code 7, got {}: {}", run.exit_code, run.stderr));
    }

    let report = report(&run)?;

    if report["application_base"].as_str() != Some(app_arg.as_str()) {
        return Err(format!("Unexpected application_base: {}", report["application_base"]));
    }

    let args: Vec<&str> = report["args"]
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if args != ["--exit", "7", "extra"] {
        return Err(format!("Unexpected args: {:?}", args));
    }

    let runtime_dir = report["runtime_directory"]
        .as_str()
        .ok_or("runtime_directory missing from report")?;
    if !runtime_dir.ends_with(MAIN_SEPARATOR) {
        return Err(format!("runtime_directory lacks trailing separator: {}", runtime_dir));
    }
    let dnx_name = config.dnx_path.file_name().ok_or("dnx path has no file name")?;
    if !Path::new(runtime_dir).join(dnx_name).exists() {
        return Err(format!("runtime_directory does not contain dnx: {}", runtime_dir));
    }

    println!("    PASS");

    Ok(())
}

/// Test: a failing status is returned raw instead of the exit code field
fn test_failure_status(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: failure_status");

    let host = host_arg(config);
    let run = run_dnx(config, &["--host", &host, "--", "--fail", FAILURE_STATUS], &[], None)?;

    let expected = observed_exit_code(0x8000_4005_u32 as i32);
    if run.exit_code != expected {
        return Err(format!("Expected exit code {}, got {}", expected, run.exit_code));
    }

    println!("    PASS");

    Ok(())
}

/// Test: a failing status whose low byte is zero still exits non-zero
fn test_failure_status_low_byte(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: failure_status_low_byte");

    let host = host_arg(config);

    for status in ["0x80070100", "-256"] {
        let run = run_dnx(config, &["--host", &host, "--", "--fail", status], &[], None)?;
        if run.exit_code == 0 {
            return Err(format!("Failure status {} exited cleanly", status));
        }
    }

    println!("    PASS");

    Ok(())
}

/// Test: a host module that does not exist
fn test_missing_host(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: missing_host");

    let missing = config.work_dir.join("missing").join("dnx_nothing_here");
    let missing_arg = missing.display().to_string();

    let run = run_dnx(config, &["--host", &missing_arg], &[("DNX_TRACE", "1")], None)?;

    if run.exit_code != 1 {
        return Err(format!("Expected exit code 1, got {}", run.exit_code));
    }
    if !run.stderr.contains(&format!("Failed to load: {}", missing_arg)) {
        return Err(format!("Missing load error in stderr: {}", run.stderr));
    }
    if run.stderr.contains("Loaded module:") {
        return Err(format!("Trace emitted on load failure: {}", run.stderr));
    }

    println!("    PASS");

    Ok(())
}

/// Test: a host module without the requested export
fn test_missing_export(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: missing_export");

    let host = host_arg(config);
    let run = run_dnx(config, &["--host", &host, "--entry-point", "DnxNoSuchExport"], &[], None)?;

    if run.exit_code != 1 {
        return Err(format!("Expected exit code 1, got {}", run.exit_code));
    }
    let expected = format!("Failed to find export 'DnxNoSuchExport' in {}", host);
    if !run.stderr.contains(&expected) {
        return Err(format!("Missing export error in stderr: {}", run.stderr));
    }

    println!("    PASS");

    Ok(())
}

/// Test: DNX_TRACE=1 shows the load and export trace events, other values do not
fn test_trace_events(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: trace_events");

    let host = host_arg(config);
    let args = ["--host", host.as_str(), "--", "--exit", "0"];

    let traced = run_dnx(config, &args, &[("DNX_TRACE", "1")], None)?;
    if traced.exit_code != 0 {
        return Err(format!("Traced run failed with {}: {}", traced.exit_code, traced.stderr));
    }
    if !traced.stderr.contains(&format!("Loaded module: {}", host)) {
        return Err(format!("Missing module trace: {}", traced.stderr));
    }
    if !traced.stderr.contains("Found export: CallApplicationMain") {
        return Err(format!("Missing export trace: {}", traced.stderr));
    }

    println!("    PASS (DNX_TRACE=1)");

    for value in ["0", "true", "11"] {
        let quiet = run_dnx(config, &args, &[("DNX_TRACE", value)], None)?;
        if quiet.stderr.contains("Loaded module:") || quiet.stderr.contains("Found export:") {
            return Err(format!("DNX_TRACE={} should not trace: {}", value, quiet.stderr));
        }
    }

    println!("    PASS (other values)");

    Ok(())
}

/// Test: DNX_CONSOLE_HOST defaults to 1 and an existing value is kept
fn test_console_host_default(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: console_host_default");

    let host = host_arg(config);

    let run = run_dnx(config, &["--host", &host], &[], None)?;
    let report_value = report(&run)?;
    if report_value["console_host"].as_str() != Some("1") {
        return Err(format!("Expected DNX_CONSOLE_HOST=1, got {}", report_value["console_host"]));
    }

    println!("    PASS (unset)");

    let run = run_dnx(config, &["--host", &host], &[("DNX_CONSOLE_HOST", "0")], None)?;
    let report_value = report(&run)?;
    if report_value["console_host"].as_str() != Some("0") {
        return Err(format!("Expected DNX_CONSOLE_HOST=0, got {}", report_value["console_host"]));
    }

    println!("    PASS (preset)");

    Ok(())
}

/// Test: DNX_APPBASE is normalized against the working directory
fn test_appbase_from_environment(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: appbase_from_environment");

    let cwd = make_dir(config, "appbase_env")?;
    make_dir(config, "appbase_env/site")?;
    let host = host_arg(config);

    let relative = format!("other{sep}..{sep}site", sep = MAIN_SEPARATOR);
    let run = run_dnx(config, &["--host", &host], &[("DNX_APPBASE", &relative)], Some(&cwd))?;

    let expected = cwd.join("site");
    let report_value = report(&run)?;
    let reported = report_value["application_base"]
        .as_str()
        .ok_or("application_base missing from report")?;

    if reported.contains("..") {
        return Err(format!("application_base was not normalized: {}", reported));
    }
    if !same_directory(Path::new(reported), &expected) {
        return Err(format!(
            "Expected application_base {}, got {}",
            expected.display(),
            reported
        ));
    }

    println!("    PASS");

    Ok(())
}

/// Test: without --appbase or DNX_APPBASE the working directory is used
fn test_appbase_falls_back_to_cwd(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: appbase_falls_back_to_cwd");

    let cwd = make_dir(config, "appbase_cwd")?;
    let host = host_arg(config);

    let run = run_dnx(config, &["--host", &host], &[], Some(&cwd))?;

    let report_value = report(&run)?;
    let reported = report_value["application_base"]
        .as_str()
        .ok_or("application_base missing from report")?;

    if !same_directory(Path::new(reported), &cwd) {
        return Err(format!("Expected application_base {}, got {}", cwd.display(), reported));
    }

    println!("    PASS");

    Ok(())
}

/// Test: a fault raised by the host is not turned into a normal exit
fn test_host_fault(config: &TestConfig) -> Result<(), String> {
    println!("  Running test: host_fault");

    let host = host_arg(config);
    let run = run_dnx(config, &["--host", &host, "--", "--panic"], &[], None)?;

    if run.exit_code == 0 {
        return Err("Host fault should not exit cleanly".to_string());
    }
    report(&run)?;
    if !run.stderr.contains("Application requested a fault") {
        return Err(format!("Missing fault message in stderr: {}", run.stderr));
    }

    println!("    PASS");

    Ok(())
}

fn main() -> ExitCode {
    println!("=== dnx Bootstrapper Test Suite ===");
    println!();

    let config = match TestConfig::from_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            return ExitCode::from(1);
        }
    };

    // Clean and recreate work directory
    if config.work_dir.exists() {
        if let Err(e) = fs::remove_dir_all(&config.work_dir) {
            eprintln!("Warning: Failed to clean work dir: {}", e);
        }
    }
    if let Err(e) = fs::create_dir_all(&config.work_dir) {
        eprintln!("Error: Failed to create work dir: {}", e);
        return ExitCode::from(1);
    }

    println!("Configuration:");
    println!("  dnx:      {}", config.dnx_path.display());
    println!("  Host:     {}", config.host_path.display());
    println!("  Work dir: {}", config.work_dir.display());
    println!();

    let tests: Vec<(&str, fn(&TestConfig) -> Result<(), String>)> = vec![
        ("exit_code_forwarding", test_exit_code_forwarding),
        ("failure_status", test_failure_status),
        ("failure_status_low_byte", test_failure_status_low_byte),
        ("missing_host", test_missing_host),
        ("missing_export", test_missing_export),
        ("trace_events", test_trace_events),
        ("console_host_default", test_console_host_default),
        ("appbase_from_environment", test_appbase_from_environment),
        ("appbase_falls_back_to_cwd", test_appbase_falls_back_to_cwd),
        ("host_fault", test_host_fault),
    ];

    let mut passed = 0;
    let mut failed = 0;

    println!("Running {} tests...", tests.len());
    println!();

    for (name, test_fn) in &tests {
        match test_fn(&config) {
            Ok(()) => {
                passed += 1;
            }
            Err(e) => {
                println!("  FAILED ({}): {}", name, e);
                failed += 1;
            }
        }
    }

    println!();
    println!("=== Results ===");
    println!("Passed: {}", passed);
    println!("Failed: {}", failed);
    println!();

    if failed > 0 {
        ExitCode::from(1)
    } else {
        println!("All tests passed!");
        ExitCode::SUCCESS
    }
}
