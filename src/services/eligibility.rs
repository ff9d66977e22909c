use crate::services::platform::{WindowOps, WindowRef};

/// Shell-owned window classes that must never be hidden: the desktop
/// background host, the wallpaper worker and the taskbar itself.
static DENIED_CLASSES: &[&str] = &["Progman", "WorkerW", "Shell_TrayWnd"];

/// Why a window may not be hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("not a live window")]
    Invalid,
    #[error("refusing to hide own window")]
    SelfReference,
    #[error("shell-owned system window")]
    SystemWindow,
}

/// Decides whether a window may be hidden. Pure predicate over current OS
/// state; re-evaluated fresh on every call.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter {
    own_window: WindowRef,
}

impl EligibilityFilter {
    pub fn new(own_window: WindowRef) -> Self {
        Self { own_window }
    }

    pub fn check(&self, ops: &impl WindowOps, target: WindowRef) -> Result<(), RejectReason> {
        if !ops.is_live(target) {
            return Err(RejectReason::Invalid);
        }
        if target == self.own_window {
            return Err(RejectReason::SelfReference);
        }
        let class = ops.class_name(target);
        if DENIED_CLASSES.iter().any(|denied| *denied == class) {
            return Err(RejectReason::SystemWindow);
        }
        Ok(())
    }
}
