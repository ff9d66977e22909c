use crate::services::eligibility::{EligibilityFilter, RejectReason};
use crate::services::persistence::PersistenceStore;
use crate::services::platform::{IconDescriptor, IconId, ShellIcons, WindowOps, WindowRef};

/// First id handed out for hidden-window icons. The application's own
/// tray icon reserves uID 1, so ids start well clear of it.
const ICON_ID_BASE: u32 = 1000;

/// Issues icon correlation ids, strictly increasing for the lifetime of
/// the process. Freed ids are never reused, so a late shell notification
/// for a deleted icon can never be mistaken for a newer one.
#[derive(Debug)]
pub struct IconIdAllocator {
    next: u32,
}

impl IconIdAllocator {
    pub fn new() -> Self {
        Self { next: ICON_ID_BASE }
    }

    pub fn allocate(&mut self) -> IconId {
        let id = IconId::from_raw(self.next);
        self.next += 1;
        id
    }
}

impl Default for IconIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One currently-hidden window. The window itself stays owned by the OS;
/// `window` is a back-reference that must pass a liveness check before
/// every use. The icon descriptor is owned here and unregistered exactly
/// once, on restore, prune or process exit.
#[derive(Debug, Clone)]
pub struct HiddenWindowRecord {
    pub window: WindowRef,
    pub icon_id: IconId,
    pub title: String,
    pub icon: IconDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HideError {
    #[error("window is not eligible: {0}")]
    Ineligible(#[from] RejectReason),
    #[error("shell refused the notification icon")]
    IconRegistration,
}

/// In-memory table of hidden windows and the single owner of their tray
/// icons and persisted snapshot. All mutations run on the event-loop
/// thread, one at a time.
pub struct RegistryService<W: WindowOps, S: ShellIcons> {
    windows: W,
    shell: S,
    store: PersistenceStore,
    filter: EligibilityFilter,
    allocator: IconIdAllocator,
    records: Vec<HiddenWindowRecord>,
}

impl<W: WindowOps, S: ShellIcons> RegistryService<W, S> {
    pub fn new(windows: W, shell: S, store: PersistenceStore, own_window: WindowRef) -> Self {
        Self {
            windows,
            shell,
            store,
            filter: EligibilityFilter::new(own_window),
            allocator: IconIdAllocator::new(),
            records: Vec::new(),
        }
    }

    /// Hides `target` behind a fresh tray icon and returns its id.
    ///
    /// The icon is registered before the window is hidden: if the shell
    /// refuses the icon there is no way to bring the window back, so the
    /// hide must not have happened yet.
    pub fn hide(&mut self, target: WindowRef) -> Result<IconId, HideError> {
        self.hide_inner(target, true)
    }

    /// Same path as [`hide`](Self::hide) minus the persistence write,
    /// for replaying a snapshot that is already on disk.
    pub(crate) fn hide_replayed(&mut self, target: WindowRef) -> Result<IconId, HideError> {
        self.hide_inner(target, false)
    }

    fn hide_inner(&mut self, target: WindowRef, persist: bool) -> Result<IconId, HideError> {
        self.filter.check(&self.windows, target)?;

        let title = self.windows.title(target);
        let icon_id = self.allocator.allocate();
        let icon = IconDescriptor {
            id: icon_id,
            tooltip: title.clone(),
            source_window: target,
        };

        if !self.shell.register(&icon) {
            tracing::warn!(
                event = "registry.icon_refused",
                window = %target,
                "Shell refused a notification icon; leaving window visible"
            );
            return Err(HideError::IconRegistration);
        }

        self.windows.hide(target);
        self.records.push(HiddenWindowRecord {
            window: target,
            icon_id,
            title,
            icon,
        });
        tracing::debug!(
            event = "registry.hidden",
            window = %target,
            icon_id = %icon_id,
            hidden = self.records.len(),
        );

        if persist {
            self.persist();
        }
        Ok(icon_id)
    }

    /// Restores the window behind `id`. An unknown id is a tolerated
    /// no-op so a double restore cannot fail.
    pub fn restore(&mut self, id: IconId) {
        let Some(index) = self.records.iter().position(|r| r.icon_id == id) else {
            tracing::debug!(event = "registry.restore_unknown_id", icon_id = %id);
            return;
        };
        let record = self.records.remove(index);
        self.restore_record(&record);
        self.persist();
    }

    /// Restores every hidden window in order and deletes the snapshot.
    pub fn restore_all(&mut self) {
        for record in std::mem::take(&mut self.records) {
            self.restore_record(&record);
        }
        self.persist();
    }

    fn restore_record(&self, record: &HiddenWindowRecord) {
        if self.windows.is_live(record.window) {
            self.windows.show(record.window);
            self.windows.bring_to_foreground(record.window);
        }
        self.shell.unregister(&record.icon);
        tracing::debug!(
            event = "registry.restored",
            window = %record.window,
            icon_id = %record.icon_id,
        );
    }

    pub fn query(&self, id: IconId) -> Option<&HiddenWindowRecord> {
        self.records.iter().find(|r| r.icon_id == id)
    }

    pub fn records(&self) -> &[HiddenWindowRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record whose window no longer exists, unregistering
    /// its icon best-effort. Returns how many records were dropped.
    pub fn prune(&mut self) -> usize {
        let mut pruned = 0;
        let mut index = 0;
        while index < self.records.len() {
            if self.windows.is_live(self.records[index].window) {
                index += 1;
                continue;
            }
            let record = self.records.remove(index);
            self.shell.unregister(&record.icon);
            tracing::debug!(
                event = "registry.pruned",
                window = %record.window,
                icon_id = %record.icon_id,
            );
            pruned += 1;
        }
        pruned
    }

    pub(crate) fn windows(&self) -> &W {
        &self.windows
    }

    pub(crate) fn shell(&self) -> &S {
        &self.shell
    }

    pub(crate) fn store(&self) -> &PersistenceStore {
        &self.store
    }

    fn persist(&self) {
        let handles: Vec<WindowRef> = self.records.iter().map(|r| r.window).collect();
        if let Err(e) = self.store.save(&handles) {
            tracing::warn!(
                event = "registry.persist_failed",
                error = %e,
                "Failed to write hidden-window snapshot"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::platform::fakes::{FakeShell, FakeWindows};

    fn service(
        dir: &tempfile::TempDir,
    ) -> (
        RegistryService<FakeWindows, FakeShell>,
        FakeWindows,
        FakeShell,
    ) {
        let windows = FakeWindows::default();
        let shell = FakeShell::default();
        let own = windows.add_window(1, "TrayNest");
        let store = PersistenceStore::new(dir.path().join("hidden_windows.dat"));
        let service = RegistryService::new(windows.clone(), shell.clone(), store, own);
        (service, windows, shell)
    }

    #[test]
    fn allocator_ids_are_unique_and_increasing() {
        let mut allocator = IconIdAllocator::new();
        let mut previous = allocator.allocate();
        assert_eq!(previous.as_u32(), 1000);
        for _ in 0..100 {
            let next = allocator.allocate();
            assert!(next.as_u32() > previous.as_u32());
            previous = next;
        }
    }

    #[test]
    fn ids_stay_unique_across_hide_restore_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, windows, _) = service(&dir);
        let target = windows.add_window(2, "Notepad");
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10 {
            let id = service.hide(target).unwrap();
            assert!(seen.insert(id.as_u32()));
            service.restore(id);
        }
    }

    #[test]
    fn hide_registers_icon_then_hides_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, windows, shell) = service(&dir);
        let target = windows.add_window(2, "Notepad");

        let id = service.hide(target).unwrap();

        assert!(windows.is_hidden(target));
        assert!(shell.is_registered(id));
        assert_eq!(service.len(), 1);
        assert_eq!(service.query(id).unwrap().title, "Notepad");
        assert_eq!(service.store().load(), vec![target]);
    }

    #[test]
    fn hide_and_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, windows, shell) = service(&dir);
        let target = windows.add_window(2, "Notepad");

        let id = service.hide(target).unwrap();
        service.restore(id);

        assert!(service.is_empty());
        assert!(!windows.is_hidden(target));
        assert_eq!(windows.0.borrow().foregrounded, vec![2]);
        assert_eq!(shell.0.borrow().unregistered, vec![id.as_u32()]);
        assert_eq!(shell.registered_count(), 0);
        assert!(!service.store().file_exists());
    }

    #[test]
    fn restore_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, windows, _) = service(&dir);
        let a = windows.add_window(2, "Notepad");
        let b = windows.add_window(3, "Calculator");
        let id_a = service.hide(a).unwrap();
        service.hide(b).unwrap();

        service.restore(id_a);
        let snapshot = service.store().load();
        service.restore(id_a);

        assert_eq!(service.len(), 1);
        assert_eq!(service.store().load(), snapshot);
    }

    #[test]
    fn restore_all_empties_registry_and_deletes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, windows, shell) = service(&dir);
        for raw in 2..6 {
            let target = windows.add_window(raw, "App");
            service.hide(target).unwrap();
        }

        service.restore_all();

        assert!(service.is_empty());
        assert_eq!(shell.registered_count(), 0);
        assert!(!service.store().file_exists());
    }

    #[test]
    fn hiding_own_window_fails_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, _, shell) = service(&dir);
        let own = WindowRef::from_raw(1);

        let result = service.hide(own);

        assert_eq!(
            result,
            Err(HideError::Ineligible(RejectReason::SelfReference))
        );
        assert!(service.is_empty());
        assert_eq!(shell.registered_count(), 0);
        assert!(!service.store().file_exists());
    }

    #[test]
    fn refused_icon_leaves_window_visible_and_registry_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, windows, shell) = service(&dir);
        let target = windows.add_window(2, "Notepad");
        shell.refuse_registration(true);

        let result = service.hide(target);

        assert_eq!(result, Err(HideError::IconRegistration));
        assert!(!windows.is_hidden(target));
        assert!(service.is_empty());
        assert!(!service.store().file_exists());
    }

    #[test]
    fn prune_keeps_live_records_and_unregisters_dead_icons() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, windows, shell) = service(&dir);
        let dead = windows.add_window(2, "Crashed");
        let live = windows.add_window(3, "Notepad");
        let dead_id = service.hide(dead).unwrap();
        let live_id = service.hide(live).unwrap();
        windows.destroy_window(dead);

        let pruned = service.prune();

        assert_eq!(pruned, 1);
        assert_eq!(service.len(), 1);
        assert!(service.query(live_id).is_some());
        assert!(service.query(dead_id).is_none());
        assert!(!shell.is_registered(dead_id));
        assert!(shell.is_registered(live_id));
    }

    #[test]
    fn restore_of_closed_window_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, windows, shell) = service(&dir);
        let target = windows.add_window(2, "Notepad");
        let id = service.hide(target).unwrap();
        windows.destroy_window(target);

        service.restore(id);

        assert!(service.is_empty());
        assert_eq!(shell.registered_count(), 0);
        // The dead window is never shown or foregrounded, but its icon
        // still goes away.
        assert!(windows.0.borrow().foregrounded.is_empty());
        assert_eq!(shell.0.borrow().unregistered, vec![id.as_u32()]);
        assert!(!service.store().file_exists());
    }

    #[test]
    fn two_windows_scenario_tracks_snapshot_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, windows, _) = service(&dir);
        let a = windows.add_window(2, "Notepad");
        let b = windows.add_window(3, "Calculator");

        let id_a = service.hide(a).unwrap();
        assert_eq!(service.len(), 1);
        assert_eq!(service.store().load(), vec![a]);

        service.hide(b).unwrap();
        assert_eq!(service.len(), 2);
        assert_eq!(service.store().load(), vec![a, b]);

        service.restore(id_a);
        assert_eq!(service.len(), 1);
        assert_eq!(service.records()[0].window, b);
        assert_eq!(service.store().load(), vec![b]);

        service.restore_all();
        assert!(service.is_empty());
        assert!(!service.store().file_exists());
    }
}
