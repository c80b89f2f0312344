//! Owns the OS-wide set of currently registered hotkeys.
//!
//! The global-hotkey table is shared external state; this module is the only
//! place allowed to call the underlying register/unregister primitives.
//! `refresh` reconciles desired vs actual with a full teardown, never a
//! partial diff, so no registration can outlive the profile/page it belonged
//! to.

use std::collections::BTreeMap;

use global_hotkey::hotkey::HotKey;
use global_hotkey::{Error as HotkeyError, GlobalHotKeyManager};
use tracing::{debug, info, warn};

use crate::accelerator::{
    canonical_form, is_reserved, parse_accelerator, CYCLE_PROFILE, FOCUS_GROUP_FILTER, PAGE_NEXT,
    PAGE_PREV,
};
use crate::bindings::Binding;
use crate::error::{PrompterError, ResultExt};

/// Seam over the OS hotkey facility so reconciliation logic is testable
/// without touching real OS-wide state.
pub trait HotkeyBackend {
    fn register(&self, hotkey: HotKey) -> Result<(), HotkeyError>;
    fn unregister(&self, hotkey: HotKey) -> Result<(), HotkeyError>;
}

impl HotkeyBackend for GlobalHotKeyManager {
    fn register(&self, hotkey: HotKey) -> Result<(), HotkeyError> {
        GlobalHotKeyManager::register(self, hotkey)
    }

    fn unregister(&self, hotkey: HotKey) -> Result<(), HotkeyError> {
        GlobalHotKeyManager::unregister(self, hotkey)
    }
}

/// The fixed navigation actions, distinct from dynamic paste bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    CycleProfile,
    PagePrev,
    PageNext,
    FocusGroupFilter,
}

#[derive(Debug)]
struct RegisteredBinding {
    accelerator: String,
    hotkey: HotKey,
    text: String,
}

pub struct ShortcutRegistrar<B: HotkeyBackend> {
    backend: B,
    fixed: Vec<(NavAction, HotKey)>,
    dynamic: Vec<RegisteredBinding>,
}

impl<B: HotkeyBackend> ShortcutRegistrar<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            fixed: Vec::new(),
            dynamic: Vec::new(),
        }
    }

    /// Register the four fixed navigation hotkeys. A conflict on one of them
    /// is logged and skipped; the rest still register.
    pub fn register_fixed(&mut self) {
        let nav = [
            (NavAction::CycleProfile, CYCLE_PROFILE),
            (NavAction::PagePrev, PAGE_PREV),
            (NavAction::PageNext, PAGE_NEXT),
            (NavAction::FocusGroupFilter, FOCUS_GROUP_FILTER),
        ];
        for (action, accelerator) in nav {
            let hotkey = match parse_accelerator(accelerator) {
                Ok(hk) => hk,
                Err(e) => {
                    warn!(accelerator, error = %e, "Failed to parse fixed accelerator");
                    continue;
                }
            };
            match self.backend.register(hotkey) {
                Ok(()) => {
                    debug!(accelerator, id = hotkey.id(), "Registered fixed hotkey");
                    self.fixed.push((action, hotkey));
                }
                Err(e) => {
                    warn!(
                        error = %registration_conflict(&e, accelerator),
                        "Fixed hotkey registration failed"
                    );
                }
            }
        }
    }

    /// Reconcile OS registrations against the desired mapping.
    ///
    /// 1. Unconditionally unregister every currently owned dynamic accelerator.
    /// 2. Register each desired entry with non-empty text that is not reserved,
    ///    translating bare digits to their numpad form.
    ///
    /// Registration failure is logged and skipped; it never aborts the rest.
    /// Idempotent: refreshing twice with the same mapping yields the same
    /// registered set with no doubled callbacks.
    pub fn refresh(&mut self, desired: &BTreeMap<String, Binding>) {
        for registered in self.dynamic.drain(..) {
            if let Err(e) = self.backend.unregister(registered.hotkey) {
                // Internal tracking is already cleared; the OS entry is gone
                // or was never ours.
                warn!(
                    accelerator = %registered.accelerator,
                    error = %e,
                    "Failed to unregister dynamic hotkey"
                );
            }
        }

        for (accelerator, binding) in desired {
            if binding.text.is_empty() {
                continue;
            }
            if is_reserved(accelerator) {
                continue;
            }
            let registration_form = canonical_form(accelerator);
            let hotkey = match parse_accelerator(&registration_form) {
                Ok(hk) => hk,
                Err(e) => {
                    warn!(accelerator = %registration_form, error = %e, "Skipping unparsable accelerator");
                    continue;
                }
            };
            match self.backend.register(hotkey) {
                Ok(()) => {
                    self.dynamic.push(RegisteredBinding {
                        accelerator: registration_form,
                        hotkey,
                        text: binding.text.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        error = %registration_conflict(&e, &registration_form),
                        "Dynamic hotkey registration failed, skipping"
                    );
                }
            }
        }

        info!(count = self.dynamic.len(), "Reconciled dynamic hotkeys");
    }

    /// The navigation action bound to a fired hotkey id, if any.
    pub fn nav_action(&self, hotkey_id: u32) -> Option<NavAction> {
        self.fixed
            .iter()
            .find(|(_, hk)| hk.id() == hotkey_id)
            .map(|(action, _)| *action)
    }

    /// The paste text bound to a fired dynamic hotkey id, if any.
    pub fn text_for(&self, hotkey_id: u32) -> Option<&str> {
        self.dynamic
            .iter()
            .find(|r| r.hotkey.id() == hotkey_id)
            .map(|r| r.text.as_str())
    }

    /// Currently registered dynamic accelerators, for assertions and logs.
    pub fn registered_accelerators(&self) -> Vec<&str> {
        self.dynamic.iter().map(|r| r.accelerator.as_str()).collect()
    }

    /// Unregister everything, fixed and dynamic. Invoked on every exit path.
    pub fn teardown_all(&mut self) {
        for (_, hotkey) in self.fixed.drain(..) {
            self.backend.unregister(hotkey).warn_on_err();
        }
        for registered in self.dynamic.drain(..) {
            self.backend.unregister(registered.hotkey).warn_on_err();
        }
    }
}

impl<B: HotkeyBackend> Drop for ShortcutRegistrar<B> {
    fn drop(&mut self) {
        self.teardown_all();
    }
}

fn registration_conflict(e: &HotkeyError, accelerator: &str) -> PrompterError {
    let reason = match e {
        HotkeyError::AlreadyRegistered(hk) => format!(
            "already registered by this or another application (id: {})",
            hk.id()
        ),
        HotkeyError::FailedToRegister(msg) => format!("system rejected it: {}", msg),
        HotkeyError::OsError(os_err) => format!("OS error: {}", os_err),
        other => other.to_string(),
    };
    PrompterError::RegistrationConflict {
        accelerator: accelerator.to_string(),
        reason,
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    /// Recording fake backend: tracks the live OS-registered set and can
    /// simulate per-hotkey conflicts.
    #[derive(Clone, Default)]
    pub struct FakeBackend {
        inner: Arc<Mutex<FakeState>>,
    }

    #[derive(Default)]
    struct FakeState {
        live: BTreeSet<u32>,
        conflicts: BTreeSet<u32>,
        register_calls: usize,
        unregister_calls: usize,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make registration of this hotkey fail as already-claimed.
        pub fn claim(&self, hotkey: HotKey) {
            self.inner.lock().conflicts.insert(hotkey.id());
        }

        pub fn live_ids(&self) -> BTreeSet<u32> {
            self.inner.lock().live.clone()
        }

        pub fn register_calls(&self) -> usize {
            self.inner.lock().register_calls
        }

        pub fn unregister_calls(&self) -> usize {
            self.inner.lock().unregister_calls
        }
    }

    impl HotkeyBackend for FakeBackend {
        fn register(&self, hotkey: HotKey) -> Result<(), HotkeyError> {
            let mut state = self.inner.lock();
            state.register_calls += 1;
            if state.conflicts.contains(&hotkey.id()) || !state.live.insert(hotkey.id()) {
                return Err(HotkeyError::AlreadyRegistered(hotkey));
            }
            Ok(())
        }

        fn unregister(&self, hotkey: HotKey) -> Result<(), HotkeyError> {
            let mut state = self.inner.lock();
            state.unregister_calls += 1;
            if !state.live.remove(&hotkey.id()) {
                return Err(HotkeyError::FailedToRegister(
                    "hotkey was not registered".to_string(),
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeBackend;
    use super::*;

    fn binding(text: &str) -> Binding {
        Binding {
            text: text.to_string(),
            tags: Vec::new(),
            is_global: false,
        }
    }

    fn desired(entries: &[(&str, &str)]) -> BTreeMap<String, Binding> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), binding(v)))
            .collect()
    }

    #[test]
    fn refresh_registers_exactly_the_desired_set() {
        let backend = FakeBackend::new();
        let mut registrar = ShortcutRegistrar::new(backend.clone());

        registrar.refresh(&desired(&[("Num1", "one"), ("A", "letter")]));

        let mut accelerators = registrar.registered_accelerators();
        accelerators.sort();
        assert_eq!(accelerators, vec!["A", "Num1"]);
        assert_eq!(backend.live_ids().len(), 2);
    }

    #[test]
    fn refresh_leaves_no_stale_registrations_across_switches() {
        let backend = FakeBackend::new();
        let mut registrar = ShortcutRegistrar::new(backend.clone());

        registrar.refresh(&desired(&[("Num1", "page one"), ("Num2", "page one")]));
        registrar.refresh(&desired(&[("Num3", "page two")]));

        assert_eq!(registrar.registered_accelerators(), vec!["Num3"]);
        // The OS-level set matches exactly: nothing from page one survives.
        let expected = parse_accelerator("Num3").unwrap().id();
        assert_eq!(backend.live_ids(), std::iter::once(expected).collect());
    }

    #[test]
    fn refresh_is_idempotent() {
        let backend = FakeBackend::new();
        let mut registrar = ShortcutRegistrar::new(backend.clone());
        let mapping = desired(&[("Num5", "five"), ("B", "bee")]);

        registrar.refresh(&mapping);
        let first = backend.live_ids();
        registrar.refresh(&mapping);

        assert_eq!(backend.live_ids(), first);
        assert_eq!(registrar.registered_accelerators().len(), 2);
    }

    #[test]
    fn empty_text_and_reserved_entries_are_skipped() {
        let backend = FakeBackend::new();
        let mut registrar = ShortcutRegistrar::new(backend.clone());

        let mut mapping = desired(&[("Num1", "")]);
        mapping.insert(CYCLE_PROFILE.to_string(), binding("hijack"));
        registrar.refresh(&mapping);

        assert!(registrar.registered_accelerators().is_empty());
        assert!(backend.live_ids().is_empty());
    }

    #[test]
    fn bare_digits_register_under_numpad_form() {
        let backend = FakeBackend::new();
        let mut registrar = ShortcutRegistrar::new(backend.clone());

        registrar.refresh(&desired(&[("7", "seven")]));

        assert_eq!(registrar.registered_accelerators(), vec!["Num7"]);
        let numpad_id = parse_accelerator("Num7").unwrap().id();
        assert!(backend.live_ids().contains(&numpad_id));
        assert_eq!(registrar.text_for(numpad_id), Some("seven"));
    }

    #[test]
    fn conflict_on_one_binding_does_not_abort_the_rest() {
        let backend = FakeBackend::new();
        backend.claim(parse_accelerator("Num1").unwrap());
        let mut registrar = ShortcutRegistrar::new(backend.clone());

        registrar.refresh(&desired(&[("Num1", "blocked"), ("Num2", "fine")]));

        assert_eq!(registrar.registered_accelerators(), vec!["Num2"]);
    }

    #[test]
    fn teardown_all_clears_fixed_and_dynamic() {
        let backend = FakeBackend::new();
        let mut registrar = ShortcutRegistrar::new(backend.clone());
        registrar.register_fixed();
        registrar.refresh(&desired(&[("Num1", "one")]));
        assert!(!backend.live_ids().is_empty());

        registrar.teardown_all();
        assert!(backend.live_ids().is_empty());
        assert!(registrar.registered_accelerators().is_empty());
    }

    #[test]
    fn drop_unregisters_everything() {
        let backend = FakeBackend::new();
        {
            let mut registrar = ShortcutRegistrar::new(backend.clone());
            registrar.register_fixed();
            registrar.refresh(&desired(&[("Num1", "one")]));
            assert_eq!(backend.live_ids().len(), 5);
        }
        assert!(backend.live_ids().is_empty());
    }

    #[test]
    fn nav_action_resolves_fixed_ids_only() {
        let backend = FakeBackend::new();
        let mut registrar = ShortcutRegistrar::new(backend);
        registrar.register_fixed();
        registrar.refresh(&desired(&[("Num1", "one")]));

        let cycle_id = parse_accelerator(CYCLE_PROFILE).unwrap().id();
        assert_eq!(registrar.nav_action(cycle_id), Some(NavAction::CycleProfile));

        let dynamic_id = parse_accelerator("Num1").unwrap().id();
        assert_eq!(registrar.nav_action(dynamic_id), None);
        assert_eq!(registrar.text_for(dynamic_id), Some("one"));
    }
}
