//! Process-id → display name.

/// Resolves a process id to a display name, or `""` if the process is gone.
pub trait ProcessNames: Send + Sync {
    fn name_of(&self, pid: u32) -> String;
}

/// Asks the operating system on every call; pids are reused, so nothing is
/// cached.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessNames;

impl ProcessNames for SystemProcessNames {
    fn name_of(&self, pid: u32) -> String {
        os::name_of(pid).unwrap_or_default()
    }
}

#[cfg(target_os = "linux")]
mod os {
    pub fn name_of(pid: u32) -> Option<String> {
        let comm = std::fs::read_to_string(format!("/proc/{pid}/comm")).ok()?;
        Some(comm.trim_end().to_owned())
    }
}

#[cfg(windows)]
mod os {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use std::path::Path;

    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{
        OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION, QueryFullProcessImageNameW,
    };

    pub fn name_of(pid: u32) -> Option<String> {
        // OpenProcess returns a HANDLE we must close later
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid) };
        if handle.is_null() {
            return None;
        }

        let mut buf = [0u16; 1024];
        let mut len = buf.len() as u32;
        let ok = unsafe { QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, buf.as_mut_ptr(), &mut len) };
        unsafe { CloseHandle(handle) };
        if ok == 0 {
            return None;
        }

        let path = OsString::from_wide(&buf[..len as usize]);
        Path::new(&path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
    }
}

#[cfg(not(any(target_os = "linux", windows)))]
mod os {
    pub fn name_of(_pid: u32) -> Option<String> {
        None
    }
}
