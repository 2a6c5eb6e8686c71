//! Demo host module: exports `CallApplicationMain` for dnx to call
//!
//! Prints one line describing what it was handed:
//!   REPORT:{"application_base":..,"runtime_directory":..,"args":[..],"console_host":..}
//!
//! Then acts on its arguments:
//!   --exit <N>    set the exit code to N and return success
//!   --fail <S>    return status S without touching the exit code
//!   --panic       raise a fault through the entry point

use std::ffi::{c_char, CStr};

use dnx_pal::{CallApplicationMainData, DNX_CONSOLE_HOST};
use serde_json::json;

const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;

/// # Safety
///
/// `data` must point to a payload built by `ApplicationArguments::data`.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C-unwind" fn CallApplicationMain(data: *mut CallApplicationMainData<'_>) -> i32 {
    let data = &mut *data;
    let args = arguments(data);

    let report = json!({
        "application_base": text(data.application_base),
        "runtime_directory": text(data.runtime_directory),
        "args": args,
        "console_host": std::env::var(DNX_CONSOLE_HOST).ok(),
    });
    println!("REPORT:{report}");

    let mut pos = 0;
    while pos < args.len() {
        match args[pos].as_str() {
            "--exit" => match args.get(pos + 1).and_then(|v| v.parse::<i32>().ok()) {
                Some(code) => {
                    data.exitcode = code;
                    pos += 2;
                }
                None => {
                    eprintln!("Error: --exit requires a number");
                    return E_INVALIDARG;
                }
            },
            "--fail" => {
                return match args.get(pos + 1).and_then(|v| parse_status(v)) {
                    Some(status) => status,
                    None => {
                        eprintln!("Error: --fail requires a status");
                        E_INVALIDARG
                    }
                };
            }
            "--panic" => panic!("Application requested a fault"),
            _ => pos += 1,
        }
    }

    0
}

unsafe fn text(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

unsafe fn arguments(data: &CallApplicationMainData<'_>) -> Vec<String> {
    (0..data.argc.max(0) as usize)
        .filter_map(|i| text(*data.argv.add(i)))
        .collect()
}

// Decimal, or 0x-prefixed hex for HRESULT-style values
fn parse_status(value: &str) -> Option<i32> {
    match value.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok().map(|v| v as i32),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnx_pal::ApplicationArguments;

    #[test]
    fn parses_hex_and_decimal_statuses() {
        assert_eq!(parse_status("0x80004005"), Some(0x8000_4005_u32 as i32));
        assert_eq!(parse_status("-3"), Some(-3));
        assert_eq!(parse_status("nope"), None);
    }

    #[test]
    fn exit_sets_exit_code() {
        let arguments = ApplicationArguments::new("/srv/app", "/opt/dnx/", ["--exit", "7"])
            .expect("arguments");
        let mut data = arguments.data();

        let status = unsafe { CallApplicationMain(&mut data) };

        assert_eq!(status, 0);
        assert_eq!(data.exitcode, 7);
    }

    #[test]
    fn fail_returns_status_untouched() {
        let arguments = ApplicationArguments::new("/srv/app", "/opt/dnx/", ["--fail", "0x80004005"])
            .expect("arguments");
        let mut data = arguments.data();

        let status = unsafe { CallApplicationMain(&mut data) };

        assert_eq!(status, 0x8000_4005_u32 as i32);
        assert_eq!(data.exitcode, 0);
    }

    #[test]
    fn missing_exit_value_is_invalid() {
        let arguments = ApplicationArguments::new("/srv/app", "/opt/dnx/", ["--exit"])
            .expect("arguments");
        let mut data = arguments.data();

        assert_eq!(unsafe { CallApplicationMain(&mut data) }, E_INVALIDARG);
    }
}
