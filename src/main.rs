#![windows_subsystem = "windows"]

use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("traynest=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    init_logging();
    app::run()
}

#[cfg(not(windows))]
fn main() {
    init_logging();
    eprintln!("traynest manages Windows tray icons and only runs on Windows");
    std::process::exit(1);
}

#[cfg(windows)]
mod app {
    use traynest::services::hotkey;
    use traynest::services::persistence::{default_state_path, PersistenceStore};
    use traynest::services::platform::IconId;
    use traynest::services::reconcile;
    use traynest::services::registry::RegistryService;
    use traynest::services::settings::{AppSettings, SettingsService};
    use traynest::services::win32::{self, Win32ShellIcons, Win32WindowOps};

    use anyhow::{anyhow, Context, Result};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, POINT, WPARAM};
    use windows::Win32::Graphics::Gdi::HBRUSH;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        AppendMenuW, CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu,
        DispatchMessageW, GetCursorPos, GetForegroundWindow, GetMessageW, GetWindowLongPtrW,
        LoadCursorW, PostMessageW, PostQuitMessage, RegisterClassW, RegisterWindowMessageW,
        SetForegroundWindow, SetWindowLongPtrW, ShowWindow, TrackPopupMenu, TranslateMessage,
        BS_PUSHBUTTON, COLOR_WINDOW, CW_USEDEFAULT, GWLP_USERDATA, HMENU, IDC_ARROW, MF_STRING,
        MSG, SW_HIDE, SW_SHOW, TPM_RIGHTBUTTON, WINDOW_EX_STYLE, WINDOW_STYLE, WM_APP, WM_CLOSE,
        WM_COMMAND, WM_CREATE, WM_DESTROY, WM_HOTKEY, WM_LBUTTONDBLCLK, WM_NULL, WM_RBUTTONUP,
        WNDCLASSW, WS_CAPTION, WS_CHILD, WS_MINIMIZEBOX, WS_OVERLAPPED, WS_SYSMENU, WS_VISIBLE,
    };

    /// Callback message for the hidden-window icons; wParam carries the
    /// icon id back from the shell.
    const WM_HIDDEN_ICON: u32 = WM_APP + 1;
    /// Callback message for the application's own tray icon.
    const WM_OWN_ICON: u32 = WM_APP + 2;

    const HOTKEY_ID: i32 = 1;

    const ID_BTN_RESTORE_ALL: usize = 0x200;
    const ID_BTN_EXIT: usize = 0x201;
    const ID_MENU_RESTORE_ALL: usize = 0x98;
    const ID_MENU_EXIT: usize = 0x99;

    struct App {
        registry: RegistryService<Win32WindowOps, Win32ShellIcons>,
        tray_menu: HMENU,
        /// Broadcast message the shell sends after Explorer restarts.
        taskbar_restart: u32,
    }

    pub fn run() -> Result<()> {
        let Some(single_instance) = win32::acquire_single_instance() else {
            win32::message_box_error("TrayNest", "TrayNest is already running.");
            std::process::exit(1);
        };

        // 1. Settings, and keep the startup shortcut in sync with them.
        let settings_service = SettingsService::new();
        let settings = settings_service.load();
        sync_run_on_startup(&settings);

        // 2. Host window.
        let instance = unsafe { GetModuleHandleW(None)? };
        let class_name = win32::to_wide("TrayNest");
        let wc = WNDCLASSW {
            lpfnWndProc: Some(wnd_proc),
            hInstance: HINSTANCE(instance.0),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            hbrBackground: HBRUSH((COLOR_WINDOW.0 + 1) as usize as *mut core::ffi::c_void),
            hCursor: unsafe { LoadCursorW(None, IDC_ARROW)? },
            ..Default::default()
        };
        if unsafe { RegisterClassW(&wc) } == 0 {
            return Err(anyhow!("RegisterClassW failed"));
        }

        let title = win32::to_wide("TrayNest");
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                PCWSTR(class_name.as_ptr()),
                PCWSTR(title.as_ptr()),
                WS_OVERLAPPED | WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                220,
                140,
                None,
                None,
                Some(HINSTANCE(instance.0)),
                None,
            )
            .context("CreateWindowExW failed")?
        };

        // 3. Tray menu, own icon, hotkey.
        let tray_menu = build_tray_menu()?;
        if !win32::add_own_tray_icon(hwnd, WM_OWN_ICON) {
            tracing::warn!(event = "app.own_icon_refused");
        }
        register_hotkey_from_settings(hwnd, &settings);

        let taskbar_restart =
            unsafe { RegisterWindowMessageW(PCWSTR(win32::to_wide("TaskbarCreated").as_ptr())) };

        // 4. Registry plus replay of whatever a previous run left hidden.
        let shell = Win32ShellIcons::new(hwnd, WM_HIDDEN_ICON);
        let store = PersistenceStore::new(default_state_path());
        let own_window = win32::window_ref_of(hwnd);
        let mut app = Box::new(App {
            registry: RegistryService::new(Win32WindowOps, shell, store, own_window),
            tray_menu,
            taskbar_restart,
        });
        let recovered = reconcile::replay_startup(&mut app.registry);

        let app_ptr = Box::into_raw(app);
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, app_ptr as isize);
            let _ = ShowWindow(hwnd, SW_SHOW);
        }

        if recovered > 0 {
            win32::message_box_info(
                "TrayNest",
                &format!("Restored {recovered} hidden window(s) from the previous session."),
            );
        }

        // 5. Message loop.
        let mut msg = MSG::default();
        unsafe {
            while GetMessageW(&mut msg, None, 0, 0).into() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        // 6. Cleanup: bring every window back before going away.
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
        }
        let mut app = unsafe { Box::from_raw(app_ptr) };
        app.registry.restore_all();
        win32::remove_own_tray_icon(hwnd);
        win32::unregister_hotkey(hwnd, HOTKEY_ID);
        unsafe {
            let _ = DestroyMenu(app.tray_menu);
        }
        drop(app);
        drop(single_instance);
        Ok(())
    }

    fn sync_run_on_startup(settings: &AppSettings) {
        if let Ok(auto) = auto_launch::AutoLaunchBuilder::new()
            .set_app_name("TrayNest")
            .set_app_path(&std::env::current_exe().unwrap_or_default().to_string_lossy())
            .build()
        {
            let result = if settings.run_on_startup {
                auto.enable()
            } else {
                auto.disable()
            };
            if let Err(e) = result {
                tracing::warn!(event = "app.autolaunch_failed", error = %e);
            }
        }
    }

    fn register_hotkey_from_settings(hwnd: HWND, settings: &AppSettings) {
        match hotkey::parse(&settings.hotkey) {
            Ok(spec) => {
                if !win32::register_hotkey(hwnd, HOTKEY_ID, &spec) {
                    win32::message_box_warning(
                        "TrayNest",
                        &format!(
                            "Could not register hotkey '{}'. Another application may be using it.",
                            settings.hotkey
                        ),
                    );
                }
            }
            Err(e) => {
                win32::message_box_warning(
                    "TrayNest",
                    &format!("Hotkey '{}' is invalid: {e}.", settings.hotkey),
                );
            }
        }
    }

    fn build_tray_menu() -> Result<HMENU> {
        unsafe {
            let menu = CreatePopupMenu()?;
            let restore_all = win32::to_wide("Restore all windows");
            AppendMenuW(
                menu,
                MF_STRING,
                ID_MENU_RESTORE_ALL,
                PCWSTR(restore_all.as_ptr()),
            )?;
            let exit = win32::to_wide("Exit");
            AppendMenuW(menu, MF_STRING, ID_MENU_EXIT, PCWSTR(exit.as_ptr()))?;
            Ok(menu)
        }
    }

    fn create_buttons(hwnd: HWND) {
        let instance = unsafe { GetModuleHandleW(None) }.unwrap_or_default();
        let style = WINDOW_STYLE(WS_CHILD.0 | WS_VISIBLE.0 | BS_PUSHBUTTON as u32);
        let class = win32::to_wide("BUTTON");
        for (label, id, y) in [
            ("Restore all", ID_BTN_RESTORE_ALL, 10),
            ("Exit", ID_BTN_EXIT, 48),
        ] {
            let text = win32::to_wide(label);
            unsafe {
                let _ = CreateWindowExW(
                    WINDOW_EX_STYLE::default(),
                    PCWSTR(class.as_ptr()),
                    PCWSTR(text.as_ptr()),
                    style,
                    10,
                    y,
                    140,
                    28,
                    Some(hwnd),
                    Some(HMENU(id as *mut core::ffi::c_void)),
                    Some(HINSTANCE(instance.0)),
                    None,
                );
            }
        }
    }

    fn show_tray_menu(hwnd: HWND, app: &App) {
        unsafe {
            let mut pt = POINT::default();
            if GetCursorPos(&mut pt).is_err() {
                return;
            }
            // Foreground + WM_NULL make the menu dismiss when focus moves.
            let _ = SetForegroundWindow(hwnd);
            let _ = TrackPopupMenu(app.tray_menu, TPM_RIGHTBUTTON, pt.x, pt.y, None, hwnd, None);
            let _ = PostMessageW(hwnd, WM_NULL, WPARAM(0), LPARAM(0));
        }
    }

    fn hide_foreground_window(app: &mut App) {
        let target = unsafe { GetForegroundWindow() };
        if target.0.is_null() {
            return;
        }
        if let Err(e) = app.registry.hide(win32::window_ref_of(target)) {
            tracing::debug!(event = "app.hide_skipped", error = %e);
        }
    }

    unsafe extern "system" fn wnd_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let app_ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut App;

        match msg {
            WM_CREATE => {
                create_buttons(hwnd);
                return LRESULT(0);
            }
            WM_CLOSE => {
                // Hide to the tray instead of closing.
                let _ = ShowWindow(hwnd, SW_HIDE);
                return LRESULT(0);
            }
            WM_DESTROY => {
                PostQuitMessage(0);
                return LRESULT(0);
            }
            _ => {}
        }

        let Some(app) = app_ptr.as_mut() else {
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        };

        match msg {
            WM_HIDDEN_ICON => {
                if lparam.0 as u32 == WM_LBUTTONDBLCLK {
                    app.registry.restore(IconId::from_raw(wparam.0 as u32));
                }
                LRESULT(0)
            }
            WM_OWN_ICON => {
                match lparam.0 as u32 {
                    WM_LBUTTONDBLCLK => {
                        let _ = ShowWindow(hwnd, SW_SHOW);
                        let _ = SetForegroundWindow(hwnd);
                    }
                    WM_RBUTTONUP => show_tray_menu(hwnd, app),
                    _ => {}
                }
                LRESULT(0)
            }
            WM_COMMAND => {
                match wparam.0 & 0xFFFF {
                    ID_BTN_RESTORE_ALL | ID_MENU_RESTORE_ALL => app.registry.restore_all(),
                    ID_BTN_EXIT | ID_MENU_EXIT => PostQuitMessage(0),
                    _ => {}
                }
                LRESULT(0)
            }
            WM_HOTKEY => {
                hide_foreground_window(app);
                LRESULT(0)
            }
            m if m == app.taskbar_restart => {
                // Explorer came back; every icon it knew about is gone.
                if !win32::add_own_tray_icon(hwnd, WM_OWN_ICON) {
                    tracing::warn!(event = "app.own_icon_refused");
                }
                let reinstalled = reconcile::handle_shell_restart(&mut app.registry);
                tracing::info!(event = "app.shell_restart_handled", reinstalled);
                LRESULT(0)
            }
            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }
}
