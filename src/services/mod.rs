pub mod eligibility;
pub mod hotkey;
pub mod persistence;
pub mod platform;
pub mod reconcile;
pub mod registry;
pub mod settings;

#[cfg(windows)]
pub mod win32;
