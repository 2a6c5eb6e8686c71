// macOS backend: sysctl for debugger detection, shared unix code for the rest

use std::mem;
use std::ptr;

pub(crate) use crate::unix::{full_path_name, native_len, open_module, PATH_CAPACITY};

// <sys/proc.h>
const P_TRACED: libc::c_int = 0x0000_0800;

pub(crate) fn is_debugger_present() -> bool {
    let mut mib = [
        libc::CTL_KERN,
        libc::KERN_PROC,
        libc::KERN_PROC_PID,
        unsafe { libc::getpid() },
    ];
    let mut info: libc::kinfo_proc = unsafe { mem::zeroed() };
    let mut size = mem::size_of::<libc::kinfo_proc>();

    let result = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            mib.len() as libc::c_uint,
            ptr::addr_of_mut!(info).cast(),
            &mut size,
            ptr::null_mut(),
            0,
        )
    };

    result == 0 && (info.kp_proc.p_flag & P_TRACED) != 0
}
