//! Developer aid: hold startup until a debugger attaches

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use crate::platform;

/// How often the attach state is polled
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Block until a debugger is attached to this process
///
/// Returns at once, silently, if one already is. There is no timeout.
pub fn wait_for_debugger_to_attach() {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    wait_for_debugger_with(platform::is_debugger_present, POLL_INTERVAL, &mut out);
}

/// [`wait_for_debugger_to_attach`] with the attach probe, poll interval and
/// prompt output supplied by the caller
pub fn wait_for_debugger_with<F, W>(mut is_attached: F, interval: Duration, out: &mut W)
where
    F: FnMut() -> bool,
    W: Write,
{
    if is_attached() {
        return;
    }

    say(out, &format!("Process Id: {}", std::process::id()));
    say(out, "Waiting for the debugger to attach...");

    // Polled rather than read from stdin, which is unreliable in remote sessions
    while !is_attached() {
        thread::sleep(interval);
    }

    say(out, "Debugger attached.");
    log::debug!("Debugger attached to process {}", std::process::id());
}

fn say<W: Write>(out: &mut W, line: &str) {
    if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        log::warn!("Failed to write debugger prompt: {err}");
    }
}
