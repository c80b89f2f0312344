//! Debounced state machine for the fixed navigation hotkeys.
//!
//! Each fixed hotkey carries a last-fired timestamp checked and written
//! atomically within the single-threaded handler; the timestamps are the
//! sole defense against re-entrant rapid-fire invocation. Every transition
//! that changes the active profile or page runs, in order:
//! persist -> recompute bindings -> reconcile registrations -> broadcast.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::bindings;
use crate::broadcast::{UiPush, UiSink};
use crate::error::ResultExt;
use crate::registrar::{HotkeyBackend, ShortcutRegistrar};
use crate::store::ConfigStore;

pub const PROFILE_SWITCH_DEBOUNCE: Duration = Duration::from_millis(500);
pub const PAGE_SWITCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Persist the store, recompute the active mapping, reconcile OS
/// registrations, and broadcast a full snapshot. The shared tail of every
/// mutation that can change the effective bindings.
pub fn sync_after_mutation<B: HotkeyBackend>(
    store: &ConfigStore,
    registrar: &mut ShortcutRegistrar<B>,
    sink: &dyn UiSink,
) {
    store.save().log_err();
    refresh_and_broadcast(store, registrar, sink);
}

/// The post-persist half of the tail. Transitions that emit transient
/// notifications persist first, notify, then finish with this.
pub fn refresh_and_broadcast<B: HotkeyBackend>(
    store: &ConfigStore,
    registrar: &mut ShortcutRegistrar<B>,
    sink: &dyn UiSink,
) {
    let desired = bindings::resolve(store.active_profile(), store.active_page_index());
    registrar.refresh(&desired);
    sink.push(UiPush::DataUpdate(store.snapshot()));
}

pub struct SwitchController {
    last_profile_switch: Option<Instant>,
    // page-prev and page-next share one timestamp
    last_page_switch: Option<Instant>,
}

impl SwitchController {
    pub fn new() -> Self {
        Self {
            last_profile_switch: None,
            last_page_switch: None,
        }
    }

    /// Advance to the next profile in list order, wrapping after the last.
    /// Debounced at 500ms. Returns whether a transition happened.
    pub fn cycle_profile<B: HotkeyBackend>(
        &mut self,
        now: Instant,
        store: &mut ConfigStore,
        registrar: &mut ShortcutRegistrar<B>,
        sink: &dyn UiSink,
    ) -> bool {
        if within(self.last_profile_switch, now, PROFILE_SWITCH_DEBOUNCE) {
            debug!("Profile cycle debounced");
            return false;
        }
        self.last_profile_switch = Some(now);

        let profiles = store.profiles();
        let current = profiles
            .iter()
            .position(|p| p.id == store.active_profile_id())
            .unwrap_or(0);
        let next = &profiles[(current + 1) % profiles.len()];
        let (next_id, next_name, next_color) =
            (next.id.clone(), next.name.clone(), next.color.clone());

        info!(profile = %next_name, "Cycling to next profile");
        store.set_active_profile_id(next_id.clone());
        store.save().log_err();

        sink.push(UiPush::ShowOverlay {
            message: next_name,
            color: next_color,
            sub_message: Some("Profile Switched".to_string()),
        });
        sink.push(UiPush::ProfileChanged { id: next_id });
        refresh_and_broadcast(store, registrar, sink);
        true
    }

    /// Move to the previous page. Debounced at 250ms. At page index 0 this
    /// is a no-op with no notification and no broadcast.
    pub fn page_prev<B: HotkeyBackend>(
        &mut self,
        now: Instant,
        store: &mut ConfigStore,
        registrar: &mut ShortcutRegistrar<B>,
        sink: &dyn UiSink,
    ) -> bool {
        if within(self.last_page_switch, now, PAGE_SWITCH_DEBOUNCE) {
            debug!("Page switch debounced");
            return false;
        }
        self.last_page_switch = Some(now);

        let index = store.active_page_index();
        if index == 0 {
            return false;
        }
        self.switch_page(store, registrar, sink, index - 1, "Previous Page");
        true
    }

    /// Move to the next page. Debounced at 250ms. At the last page index
    /// this is a no-op: page creation on overflow is only reachable through
    /// the UI's explicit add-page action, not through this hotkey.
    pub fn page_next<B: HotkeyBackend>(
        &mut self,
        now: Instant,
        store: &mut ConfigStore,
        registrar: &mut ShortcutRegistrar<B>,
        sink: &dyn UiSink,
    ) -> bool {
        if within(self.last_page_switch, now, PAGE_SWITCH_DEBOUNCE) {
            debug!("Page switch debounced");
            return false;
        }
        self.last_page_switch = Some(now);

        let index = store.active_page_index();
        let last = store.active_profile().pages.len().saturating_sub(1);
        if index >= last {
            return false;
        }
        self.switch_page(store, registrar, sink, index + 1, "Next Page");
        true
    }

    /// Raise-and-focus signal for the group filter. Always fires: no
    /// debounce, no state mutation, no persistence.
    pub fn focus_group_filter(&self, sink: &dyn UiSink) {
        sink.push(UiPush::FocusGroupFilter);
    }

    fn switch_page<B: HotkeyBackend>(
        &self,
        store: &mut ConfigStore,
        registrar: &mut ShortcutRegistrar<B>,
        sink: &dyn UiSink,
        new_index: usize,
        label: &str,
    ) {
        let (profile_id, color) = {
            let profile = store.active_profile();
            (profile.id.clone(), profile.color.clone())
        };
        info!(index = new_index, "Switching page");
        store.set_active_page_index(&profile_id, new_index);
        store.save().log_err();

        sink.push(UiPush::ShowOverlay {
            message: format!("Page {}", new_index + 1),
            color,
            sub_message: Some(label.to_string()),
        });
        sink.push(UiPush::PageChanged { index: new_index });
        refresh_and_broadcast(store, registrar, sink);
    }
}

impl Default for SwitchController {
    fn default() -> Self {
        Self::new()
    }
}

fn within(last: Option<Instant>, now: Instant, debounce: Duration) -> bool {
    match last {
        Some(last) => now.saturating_duration_since(last) < debounce,
        None => false,
    }
}
