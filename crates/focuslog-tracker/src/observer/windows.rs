use focuslog_core::Observation;
use std::path::Path;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, HWND};
use windows_sys::Win32::System::SystemInformation::GetTickCount;
use windows_sys::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
};

use super::ObservationSource;

/// Foreground window through user32; the app is the owning process' executable name.
pub struct WindowsSource;

impl WindowsSource {
    pub fn new() -> Self {
        Self
    }
}

impl ObservationSource for WindowsSource {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn observe(&mut self) -> Observation {
        let idle_seconds = seconds_since_last_input().unwrap_or(0.0);
        let Some(window) = ForegroundWindow::current() else {
            return Observation {
                idle_seconds,
                ..Observation::unknown()
            };
        };

        let app_name = window
            .owner_exe_name()
            .unwrap_or_else(|| Observation::UNKNOWN.to_owned());
        Observation::new(app_name, window.title(), idle_seconds)
    }
}

fn seconds_since_last_input() -> Option<f64> {
    let mut info = LASTINPUTINFO {
        cbSize: std::mem::size_of::<LASTINPUTINFO>() as u32,
        dwTime: 0,
    };
    if unsafe { GetLastInputInfo(&mut info) } == 0 {
        return None;
    }
    // Both counters wrap after ~49 days; the wrapping difference stays correct.
    let elapsed_ms = unsafe { GetTickCount() }.wrapping_sub(info.dwTime);
    Some(f64::from(elapsed_ms) / 1000.0)
}

struct ForegroundWindow(HWND);

impl ForegroundWindow {
    fn current() -> Option<Self> {
        let hwnd = unsafe { GetForegroundWindow() };
        (!hwnd.is_null()).then_some(Self(hwnd))
    }

    fn title(&self) -> String {
        let len = unsafe { GetWindowTextLengthW(self.0) };
        if len <= 0 {
            return String::new();
        }
        let mut buf = vec![0u16; len as usize + 1];
        let copied = unsafe { GetWindowTextW(self.0, buf.as_mut_ptr(), buf.len() as i32) };
        utf16_prefix(&buf, copied.max(0) as usize).trim().to_owned()
    }

    fn owner_exe_name(&self) -> Option<String> {
        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(self.0, &mut pid) };
        if pid == 0 {
            return None;
        }
        let image = with_process_handle(pid, |handle| {
            let mut buf = vec![0u16; 4096];
            let mut len = buf.len() as u32;
            let ok = unsafe { QueryFullProcessImageNameW(handle, 0, buf.as_mut_ptr(), &mut len) };
            (ok != 0).then(|| utf16_prefix(&buf, len as usize))
        })??;
        Path::new(&image)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Runs `f` with a query-only handle to `pid`, closing the handle afterwards.
fn with_process_handle<T>(pid: u32, f: impl FnOnce(HANDLE) -> T) -> Option<T> {
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid) };
    if handle.is_null() {
        return None;
    }
    let out = f(handle);
    unsafe { CloseHandle(handle) };
    Some(out)
}

fn utf16_prefix(buf: &[u16], len: usize) -> String {
    String::from_utf16_lossy(&buf[..len.min(buf.len())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_prefix_clamps_to_buffer() {
        let buf: Vec<u16> = "code.exe\0".encode_utf16().collect();
        assert_eq!(utf16_prefix(&buf, 8), "code.exe");
        assert_eq!(utf16_prefix(&buf, 100), "code.exe\0");
        assert_eq!(utf16_prefix(&buf, 0), "");
    }
}
