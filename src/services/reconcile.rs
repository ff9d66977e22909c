//! Re-aligns the registry with the live OS and the shell's notification
//! area after a process restart or an Explorer restart.

use crate::services::platform::{ShellIcons, WindowOps};
use crate::services::registry::RegistryService;

/// Replays the persisted snapshot through the normal hide path, skipping
/// handles whose windows did not survive (closed while the process was
/// down, or from an earlier boot). The persistence write is suppressed:
/// the state being replayed is already on disk. Returns how many windows
/// were recovered; the caller decides whether to tell the user.
pub fn replay_startup<W: WindowOps, S: ShellIcons>(registry: &mut RegistryService<W, S>) -> usize {
    let persisted = registry.store().load();
    if persisted.is_empty() {
        return 0;
    }

    let mut recovered = 0;
    for window in persisted {
        if !registry.windows().is_live(window) {
            tracing::debug!(event = "reconcile.stale_handle", window = %window);
            continue;
        }
        match registry.hide_replayed(window) {
            Ok(icon_id) => {
                tracing::info!(event = "reconcile.recovered", window = %window, icon_id = %icon_id);
                recovered += 1;
            }
            Err(e) => {
                tracing::warn!(
                    event = "reconcile.replay_failed",
                    window = %window,
                    error = %e,
                    "Could not re-hide persisted window"
                );
            }
        }
    }
    recovered
}

/// Responds to the shell's notification area being recreated (Explorer
/// restart): every previously registered icon has silently vanished even
/// though the registry still holds its record. Prunes windows that died
/// in the meantime, then re-registers an icon for each survivor. The
/// persisted state is untouched; the hidden set has not logically
/// changed, only the shell's bookkeeping. Returns the number of icons
/// re-registered.
pub fn handle_shell_restart<W: WindowOps, S: ShellIcons>(
    registry: &mut RegistryService<W, S>,
) -> usize {
    let pruned = registry.prune();
    if pruned > 0 {
        tracing::info!(event = "reconcile.shell_restart_pruned", pruned);
    }

    let mut reinstalled = 0;
    for record in registry.records() {
        if registry.shell().register(&record.icon) {
            reinstalled += 1;
        } else {
            tracing::warn!(
                event = "reconcile.reinstall_refused",
                icon_id = %record.icon_id,
                "Shell refused to re-register an icon after restart"
            );
        }
    }
    reinstalled
}
