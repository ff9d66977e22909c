use std::fmt;

/// Opaque reference to a top-level window owned by the OS.
///
/// Valid only while the window exists; every use must be preceded by a
/// fresh [`WindowOps::is_live`] check. The wrapped value round-trips
/// through the persisted file as plain decimal, which is only meaningful
/// within the boot session that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowRef(isize);

impl WindowRef {
    pub fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> isize {
        self.0
    }
}

impl fmt::Display for WindowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation key for one notification icon.
///
/// Allocated by the registry, never derived from the window handle, so it
/// stays a small dense integer regardless of pointer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconId(u32);

impl IconId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for IconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the shell needs to show one icon for one hidden window.
/// Owned by the registry record and unregistered exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconDescriptor {
    pub id: IconId,
    pub tooltip: String,
    pub source_window: WindowRef,
}

/// Window operations consumed from the OS. All calls are re-evaluated
/// against live OS state; window lifetimes are externally controlled.
pub trait WindowOps {
    fn is_live(&self, window: WindowRef) -> bool;
    fn hide(&self, window: WindowRef);
    fn show(&self, window: WindowRef);
    fn bring_to_foreground(&self, window: WindowRef);
    fn title(&self, window: WindowRef) -> String;
    fn class_name(&self, window: WindowRef) -> String;
}

/// Notification-area operations consumed from the shell.
///
/// `register` reports refusal (shell resource exhaustion) via `false`;
/// `unregister` is best-effort because the shell may have already dropped
/// the icon, e.g. across an Explorer restart.
pub trait ShellIcons {
    fn register(&self, icon: &IconDescriptor) -> bool;
    fn unregister(&self, icon: &IconDescriptor);
}
