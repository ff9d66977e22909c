//! Win32 implementations of the OS boundary: window operations, shell
//! notification icons, the single-instance mutex and hotkey registration.

use crate::services::hotkey::HotkeySpec;
use crate::services::platform::{IconDescriptor, ShellIcons, WindowOps, WindowRef};

use windows::core::{HSTRING, PCWSTR};
use windows::Win32::Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE, HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::CreateMutexW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
    MOD_SHIFT, MOD_WIN,
};
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetClassLongPtrW, GetClassNameW, GetWindowTextW, IsWindow, LoadIconW, MessageBoxW,
    SendMessageW, SetForegroundWindow, ShowWindow, GCLP_HICONSM, HICON, ICON_SMALL,
    IDI_APPLICATION, MB_ICONERROR, MB_ICONINFORMATION, MB_ICONWARNING, MB_OK, SW_HIDE, SW_SHOW,
    WM_GETICON,
};

/// uID of the application's own tray icon. Hidden-window icon ids are
/// allocated from 1000 upward and never collide with it.
pub const OWN_ICON_UID: u32 = 1;

pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(Some(0)).collect()
}

fn hwnd_of(window: WindowRef) -> HWND {
    HWND(window.as_raw() as *mut core::ffi::c_void)
}

pub fn window_ref_of(hwnd: HWND) -> WindowRef {
    WindowRef::from_raw(hwnd.0 as isize)
}

/// Live Win32 window operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32WindowOps;

impl WindowOps for Win32WindowOps {
    fn is_live(&self, window: WindowRef) -> bool {
        unsafe { IsWindow(hwnd_of(window)).as_bool() }
    }

    fn hide(&self, window: WindowRef) {
        unsafe {
            let _ = ShowWindow(hwnd_of(window), SW_HIDE);
        }
    }

    fn show(&self, window: WindowRef) {
        unsafe {
            let _ = ShowWindow(hwnd_of(window), SW_SHOW);
        }
    }

    fn bring_to_foreground(&self, window: WindowRef) {
        unsafe {
            let _ = SetForegroundWindow(hwnd_of(window));
        }
    }

    fn title(&self, window: WindowRef) -> String {
        let mut buf = [0u16; 512];
        let len = unsafe { GetWindowTextW(hwnd_of(window), &mut buf) };
        String::from_utf16_lossy(&buf[..len.max(0) as usize])
    }

    fn class_name(&self, window: WindowRef) -> String {
        let mut buf = [0u16; 256];
        let len = unsafe { GetClassNameW(hwnd_of(window), &mut buf) };
        String::from_utf16_lossy(&buf[..len.max(0) as usize])
    }
}

/// Shell notification icons for hidden windows, all registered against
/// the host window with a shared callback message; the uID carries the
/// correlation id back.
#[derive(Debug, Clone, Copy)]
pub struct Win32ShellIcons {
    host: isize,
    callback_message: u32,
}

impl Win32ShellIcons {
    pub fn new(host: HWND, callback_message: u32) -> Self {
        Self {
            host: host.0 as isize,
            callback_message,
        }
    }

    fn host(&self) -> HWND {
        HWND(self.host as *mut core::ffi::c_void)
    }
}

impl ShellIcons for Win32ShellIcons {
    fn register(&self, icon: &IconDescriptor) -> bool {
        let mut nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: self.host(),
            uID: icon.id.as_u32(),
            uFlags: NIF_MESSAGE | NIF_ICON | NIF_TIP,
            uCallbackMessage: self.callback_message,
            hIcon: resolve_window_icon(icon.source_window),
            ..Default::default()
        };
        copy_tooltip(&mut nid.szTip, &icon.tooltip);
        unsafe { Shell_NotifyIconW(NIM_ADD, &nid).as_bool() }
    }

    fn unregister(&self, icon: &IconDescriptor) {
        let nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: self.host(),
            uID: icon.id.as_u32(),
            ..Default::default()
        };
        unsafe {
            // Best-effort: the shell may already have dropped the icon.
            let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
        }
    }
}

/// Small icon of the window being hidden, falling back to the generic
/// application icon when the window has none.
fn resolve_window_icon(window: WindowRef) -> HICON {
    unsafe {
        let hwnd = hwnd_of(window);
        let class_icon = GetClassLongPtrW(hwnd, GCLP_HICONSM);
        if class_icon != 0 {
            return HICON(class_icon as *mut core::ffi::c_void);
        }
        let sent = SendMessageW(hwnd, WM_GETICON, WPARAM(ICON_SMALL as usize), LPARAM(0));
        if sent.0 != 0 {
            return HICON(sent.0 as *mut core::ffi::c_void);
        }
        LoadIconW(None, IDI_APPLICATION).unwrap_or_default()
    }
}

fn copy_tooltip(dest: &mut [u16; 128], tooltip: &str) {
    let wide: Vec<u16> = tooltip.encode_utf16().take(dest.len() - 1).collect();
    dest[..wide.len()].copy_from_slice(&wide);
}

/// Installs the application's own tray icon with its dedicated callback
/// message.
pub fn add_own_tray_icon(host: HWND, callback_message: u32) -> bool {
    let mut nid = NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: host,
        uID: OWN_ICON_UID,
        uFlags: NIF_MESSAGE | NIF_ICON | NIF_TIP,
        uCallbackMessage: callback_message,
        hIcon: unsafe { LoadIconW(None, IDI_APPLICATION).unwrap_or_default() },
        ..Default::default()
    };
    copy_tooltip(&mut nid.szTip, "TrayNest");
    unsafe { Shell_NotifyIconW(NIM_ADD, &nid).as_bool() }
}

pub fn remove_own_tray_icon(host: HWND) {
    let nid = NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: host,
        uID: OWN_ICON_UID,
        ..Default::default()
    };
    unsafe {
        let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
    }
}

/// Holds the named mutex that enforces one process per session. Released
/// on drop.
pub struct SingleInstance {
    handle: HANDLE,
}

impl Drop for SingleInstance {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

/// Returns `None` when another instance already owns the mutex.
pub fn acquire_single_instance() -> Option<SingleInstance> {
    let name = to_wide("TrayNest_SingleInstance");
    unsafe {
        let handle = CreateMutexW(None, true, PCWSTR(name.as_ptr())).ok()?;
        if GetLastError() == ERROR_ALREADY_EXISTS {
            let _ = CloseHandle(handle);
            return None;
        }
        Some(SingleInstance { handle })
    }
}

fn native_modifiers(spec: &HotkeySpec) -> HOT_KEY_MODIFIERS {
    let mut modifiers = MOD_NOREPEAT;
    if spec.modifiers.win {
        modifiers |= MOD_WIN;
    }
    if spec.modifiers.shift {
        modifiers |= MOD_SHIFT;
    }
    if spec.modifiers.ctrl {
        modifiers |= MOD_CONTROL;
    }
    if spec.modifiers.alt {
        modifiers |= MOD_ALT;
    }
    modifiers
}

/// Registers the global hotkey against the host window. `false` usually
/// means another application owns the combination.
pub fn register_hotkey(host: HWND, id: i32, spec: &HotkeySpec) -> bool {
    unsafe { RegisterHotKey(host, id, native_modifiers(spec), spec.key).is_ok() }
}

pub fn unregister_hotkey(host: HWND, id: i32) {
    unsafe {
        let _ = UnregisterHotKey(host, id);
    }
}

pub fn message_box_info(title: &str, text: &str) {
    unsafe {
        MessageBoxW(
            HWND::default(),
            &HSTRING::from(text),
            &HSTRING::from(title),
            MB_OK | MB_ICONINFORMATION,
        );
    }
}

pub fn message_box_warning(title: &str, text: &str) {
    unsafe {
        MessageBoxW(
            HWND::default(),
            &HSTRING::from(text),
            &HSTRING::from(title),
            MB_OK | MB_ICONWARNING,
        );
    }
}

pub fn message_box_error(title: &str, text: &str) {
    unsafe {
        MessageBoxW(
            HWND::default(),
            &HSTRING::from(text),
            &HSTRING::from(title),
            MB_OK | MB_ICONERROR,
        );
    }
}
