// Linux backend: /proc for debugger detection, shared unix code for the rest

use std::fs;

pub(crate) use crate::unix::{full_path_name, native_len, open_module, PATH_CAPACITY};

// A non-zero TracerPid means something is ptrace-attached to us
pub(crate) fn is_debugger_present() -> bool {
    fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| tracer_pid(&status))
        .is_some_and(|pid| pid != 0)
}

fn tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_tracer_pid() {
        let status = "Name:\tdnx\nState:\tR (running)\nTracerPid:\t4242\nUid:\t1000\n";
        assert_eq!(tracer_pid(status), Some(4242));

        let status = "Name:\tdnx\nTracerPid:\t0\n";
        assert_eq!(tracer_pid(status), Some(0));

        assert_eq!(tracer_pid("Name:\tdnx\n"), None);
    }
}
