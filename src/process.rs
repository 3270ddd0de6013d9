//! Process identity and keyboard layout lookups.
//!
//! Both are pass-through stamps on emitted records; nothing in the engine
//! branches on their values.

use crate::events::ProcessIdentity;

/// Resolves a process id to a name and executable path.
pub trait ProcessLookup {
    fn lookup(&self, pid: i32) -> ProcessIdentity;
}

/// Reports the currently active keyboard layout identifier.
pub trait KeyboardLayoutSource {
    fn current_layout(&self) -> Option<String>;
}

/// Process lookup backed by the operating system.
///
/// Uses `/proc` on Linux and `proc_name`/`proc_pidpath` on macOS. Other
/// platforms only report the pid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessLookup;

impl ProcessLookup for SystemProcessLookup {
    fn lookup(&self, pid: i32) -> ProcessIdentity {
        let (name, path) = if pid > 0 {
            platform::name_and_path(pid)
        } else {
            (None, None)
        };
        ProcessIdentity {
            pid: Some(pid),
            name,
            path,
        }
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::fs;

    pub fn name_and_path(pid: i32) -> (Option<String>, Option<String>) {
        let name = fs::read_to_string(format!("/proc/{}/comm", pid))
            .ok()
            .map(|s| s.trim_end().to_string())
            .filter(|s| !s.is_empty());
        let path = fs::read_link(format!("/proc/{}/exe", pid))
            .ok()
            .map(|p| p.to_string_lossy().into_owned());
        (name, path)
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use std::ffi::CStr;
    use std::os::raw::{c_char, c_void};

    const NAME_MAXSIZE: usize = 256;

    pub fn name_and_path(pid: i32) -> (Option<String>, Option<String>) {
        let mut name_buf = [0 as c_char; NAME_MAXSIZE];
        let mut path_buf = [0 as c_char; libc::PROC_PIDPATHINFO_MAXSIZE as usize];

        // SAFETY: both buffers are valid for the sizes passed and are
        // NUL-initialised, so they stay NUL-terminated on failure.
        let name_len = unsafe {
            libc::proc_name(
                pid,
                name_buf.as_mut_ptr() as *mut c_void,
                NAME_MAXSIZE as u32,
            )
        };
        let path_len = unsafe {
            libc::proc_pidpath(
                pid,
                path_buf.as_mut_ptr() as *mut c_void,
                path_buf.len() as u32,
            )
        };

        (
            (name_len > 0).then(|| c_buf_to_string(&name_buf)),
            (path_len > 0).then(|| c_buf_to_string(&path_buf)),
        )
    }

    fn c_buf_to_string(buf: &[c_char]) -> String {
        // SAFETY: the buffer is NUL-terminated (see above).
        unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod platform {
    pub fn name_and_path(_pid: i32) -> (Option<String>, Option<String>) {
        (None, None)
    }
}

/// A keyboard layout identifier fixed at start-up.
#[derive(Debug, Clone, Default)]
pub struct FixedLayout(Option<String>);

impl FixedLayout {
    pub fn new(layout: Option<String>) -> Self {
        FixedLayout(layout)
    }
}

impl KeyboardLayoutSource for FixedLayout {
    fn current_layout(&self) -> Option<String> {
        self.0.clone()
    }
}
