//! Top-level coordinator: owns the store, the registrar, the switch
//! controller, the paste service, and the UI sink.
//!
//! Single logical thread: forwarding threads feed one channel, and every
//! event is handled as one atomic step (read store, mutate, persist,
//! reconcile, broadcast) before the next is taken, so concurrent hotkey
//! firings never interleave a half-updated state. The only blocking I/O,
//! the AI collaborator round trip, runs on a worker thread and re-enters
//! the loop as an [`Event::Ai`] outcome.

use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Instant;

use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use tracing::{debug, info, warn};

use crate::accelerator::canonical_form;
use crate::ai::GeminiClient;
use crate::bindings;
use crate::broadcast::{UiPush, UiSink, WindowAction};
use crate::error::ResultExt;
use crate::ipc::Request;
use crate::paste::{Clipboard, PasteService};
use crate::registrar::{HotkeyBackend, NavAction, ShortcutRegistrar};
use crate::store::ConfigStore;
use crate::switcher::{refresh_and_broadcast, sync_after_mutation, SwitchController};

/// One unit of work for the event loop.
#[derive(Debug)]
pub enum Event {
    /// An OS hotkey fired (press only).
    Hotkey { id: u32 },
    /// A request arrived from the UI process.
    Request(Request),
    /// A background AI call completed.
    Ai(AiOutcome),
    /// Stop the loop and tear down.
    Shutdown,
}

/// Outcome of an AI collaborator call, computed off-loop and applied on the
/// loop thread so store mutation stays single-threaded.
#[derive(Debug)]
pub enum AiOutcome {
    PageGenerated(crate::error::Result<BTreeMap<String, String>>),
    KeyRefined {
        accelerator: String,
        outcome: crate::error::Result<String>,
    },
}

pub struct App<B: HotkeyBackend, C: Clipboard, S: UiSink> {
    store: ConfigStore,
    registrar: ShortcutRegistrar<B>,
    switcher: SwitchController,
    paste: PasteService<C>,
    sink: S,
    // Handed to AI worker threads so outcomes re-enter the loop.
    events: Sender<Event>,
}

impl<B: HotkeyBackend, C: Clipboard, S: UiSink> App<B, C, S> {
    pub fn new(
        store: ConfigStore,
        backend: B,
        clipboard: C,
        sink: S,
        events: Sender<Event>,
    ) -> Self {
        Self {
            store,
            registrar: ShortcutRegistrar::new(backend),
            switcher: SwitchController::new(),
            paste: PasteService::new(clipboard),
            sink,
            events,
        }
    }

    /// Initial registration pass: fixed navigation hotkeys plus the dynamic
    /// bindings of the persisted active profile/page.
    pub fn bootstrap(&mut self) {
        self.registrar.register_fixed();
        let desired = bindings::resolve(self.store.active_profile(), self.store.active_page_index());
        self.registrar.refresh(&desired);
        self.store.save().log_err();
        info!("Bootstrap complete");
    }

    /// Drain events until shutdown, then tear down all registrations.
    pub fn run(&mut self, events: Receiver<Event>) {
        for event in events {
            if !self.handle_event(event) {
                break;
            }
        }
        self.shutdown();
    }

    /// Handle one event atomically. Returns false when the loop should stop.
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Hotkey { id } => {
                self.handle_hotkey(id);
                true
            }
            Event::Request(request) => self.handle_request(request),
            Event::Ai(outcome) => {
                self.apply_ai_outcome(outcome);
                true
            }
            Event::Shutdown => false,
        }
    }

    /// Unconditional teardown: every registered hotkey, fixed and dynamic,
    /// is unregistered on every exit path.
    pub fn shutdown(&mut self) {
        info!("Shutting down, unregistering all hotkeys");
        self.registrar.teardown_all();
        self.store.save().log_err();
    }

    fn handle_hotkey(&mut self, id: u32) {
        if let Some(action) = self.registrar.nav_action(id) {
            let now = Instant::now();
            match action {
                NavAction::CycleProfile => {
                    self.switcher.cycle_profile(
                        now,
                        &mut self.store,
                        &mut self.registrar,
                        &self.sink,
                    );
                }
                NavAction::PagePrev => {
                    self.switcher
                        .page_prev(now, &mut self.store, &mut self.registrar, &self.sink);
                }
                NavAction::PageNext => {
                    self.switcher
                        .page_next(now, &mut self.store, &mut self.registrar, &self.sink);
                }
                NavAction::FocusGroupFilter => {
                    self.switcher.focus_group_filter(&self.sink);
                }
            }
            return;
        }

        // Dynamic binding: paste directly, bypassing the switch controller.
        if let Some(text) = self.registrar.text_for(id).map(str::to_string) {
            let os = self.store.settings().os;
            self.paste.paste(&text, self.store.variables(), os);
        } else {
            debug!(id, "Hotkey event for unknown id, ignoring");
        }
    }

    fn handle_request(&mut self, request: Request) -> bool {
        match request {
            Request::GetData => {
                self.sink.push(UiPush::DataUpdate(self.store.snapshot()));
            }
            Request::SaveProfiles { profiles } => match self.store.set_profiles(profiles) {
                Ok(()) => {
                    // A prompt edit on the active profile/page must re-register.
                    sync_after_mutation(&self.store, &mut self.registrar, &self.sink);
                }
                Err(e) => {
                    warn!(error = %e, "Rejected profile save");
                    // Resync the UI to the unchanged truth.
                    self.sink.push(UiPush::DataUpdate(self.store.snapshot()));
                }
            },
            Request::SetActiveProfile { id } => {
                self.store.set_active_profile_id(id);
                self.store.save().log_err();
                let profile = self.store.active_profile();
                self.sink.push(UiPush::ShowOverlay {
                    message: profile.name.clone(),
                    color: profile.color.clone(),
                    sub_message: Some("Profile Selected".to_string()),
                });
                refresh_and_broadcast(&self.store, &mut self.registrar, &self.sink);
            }
            Request::SetActivePage { profile_id, index } => {
                self.store.set_active_page_index(&profile_id, index);
                if profile_id == self.store.active_profile_id() {
                    sync_after_mutation(&self.store, &mut self.registrar, &self.sink);
                } else {
                    self.store.save().log_err();
                    self.sink.push(UiPush::DataUpdate(self.store.snapshot()));
                }
            }
            Request::SaveSettings { settings } => {
                self.store.set_settings(settings);
                self.store.save().log_err();
                self.sink.push(UiPush::DataUpdate(self.store.snapshot()));
            }
            Request::SaveVariables { variables } => {
                self.store.set_variables(variables);
                self.store.save().log_err();
                self.sink.push(UiPush::DataUpdate(self.store.snapshot()));
            }
            Request::ExportProfiles { path } => {
                let success = self.store.export_to_file(&path).log_err().is_some();
                self.sink.push(UiPush::ExportComplete { success });
            }
            Request::ImportProfiles { path } => match self.store.import_from_file(&path) {
                Ok(()) => {
                    sync_after_mutation(&self.store, &mut self.registrar, &self.sink);
                    self.sink.push(UiPush::ImportComplete { success: true });
                }
                Err(e) => {
                    // Rejected in full: zero mutation, no success signal.
                    warn!(error = %e, "Import rejected");
                }
            },
            Request::WindowMinimize => {
                self.sink.push(UiPush::WindowCommand {
                    action: WindowAction::Minimize,
                });
            }
            Request::WindowMaximize => {
                self.sink.push(UiPush::WindowCommand {
                    action: WindowAction::Maximize,
                });
            }
            Request::WindowClose => {
                self.sink.push(UiPush::WindowCommand {
                    action: WindowAction::Close,
                });
                return false;
            }
            Request::CreateDesktopShortcut => {
                // The one automation failure surfaced to the user.
                let result = crate::platform::create_desktop_shortcut();
                self.sink.push(UiPush::DesktopShortcutResult {
                    success: result.is_ok(),
                    message: result.err().map(|e| e.to_string()),
                });
            }
            Request::GeneratePage {
                description,
                context,
            } => {
                self.spawn_generate_page(description, context);
            }
            Request::RefineKey {
                accelerator,
                instruction,
                context,
            } => {
                self.spawn_refine_key(accelerator, instruction, context);
            }
        }
        true
    }

    /// Kick off the page-generation round trip on a worker thread. The loop
    /// stays responsive; the outcome re-enters as [`Event::Ai`].
    fn spawn_generate_page(&self, description: String, context: Option<String>) {
        let api_key = self.store.settings().gemini_api_key.clone();
        let tx = self.events.clone();
        std::thread::spawn(move || {
            let outcome = GeminiClient::new(&api_key)
                .and_then(|client| client.generate_page(&description, context.as_deref()));
            let _ = tx.send(Event::Ai(AiOutcome::PageGenerated(outcome)));
        });
    }

    /// Kick off the key-refinement round trip. The current text and neighbor
    /// context are captured from the store before the worker starts.
    fn spawn_refine_key(
        &self,
        accelerator: String,
        instruction: Option<String>,
        context: Option<String>,
    ) {
        let effective = bindings::resolve(self.store.active_profile(), self.store.active_page_index());
        let canonical = canonical_form(&accelerator);
        let current = effective
            .get(&canonical)
            .map(|b| b.text.clone())
            .unwrap_or_default();
        let neighbors: BTreeMap<String, String> = effective
            .iter()
            .filter(|(key, _)| **key != canonical)
            .map(|(key, binding)| (key.clone(), binding.text.clone()))
            .collect();

        let api_key = self.store.settings().gemini_api_key.clone();
        let tx = self.events.clone();
        std::thread::spawn(move || {
            let outcome = GeminiClient::new(&api_key).and_then(|client| {
                client.refine_key(&current, &neighbors, instruction.as_deref(), context.as_deref())
            });
            let _ = tx.send(Event::Ai(AiOutcome::KeyRefined {
                accelerator,
                outcome,
            }));
        });
    }

    /// Apply a completed AI call: store mutation and the persist/refresh/
    /// broadcast tail run here, on the loop thread. Applies to whatever
    /// profile/page is active at completion time.
    fn apply_ai_outcome(&mut self, outcome: AiOutcome) {
        match outcome {
            AiOutcome::PageGenerated(Ok(mapping)) => {
                let profile_id = self.store.active_profile().id.clone();
                let index = self.store.active_page_index();
                self.store.modify_profile(&profile_id, |profile| {
                    if let Some(page) = profile.pages.get_mut(index) {
                        for (digit, text) in mapping {
                            bindings::write_prompt(page, &digit, text);
                        }
                    }
                });
                sync_after_mutation(&self.store, &mut self.registrar, &self.sink);
                self.sink.push(UiPush::GeneratePageComplete {
                    success: true,
                    error: None,
                });
            }
            AiOutcome::PageGenerated(Err(e)) => {
                warn!(error = %e, "Page generation failed");
                self.sink.push(UiPush::GeneratePageComplete {
                    success: false,
                    error: Some(e.to_string()),
                });
            }
            AiOutcome::KeyRefined {
                accelerator,
                outcome: Ok(text),
            } => {
                let profile_id = self.store.active_profile().id.clone();
                let index = self.store.active_page_index();
                self.store.modify_profile(&profile_id, |profile| {
                    if let Some(page) = profile.pages.get_mut(index) {
                        bindings::write_prompt(page, &accelerator, text.clone());
                    }
                });
                sync_after_mutation(&self.store, &mut self.registrar, &self.sink);
                self.sink.push(UiPush::RefineKeyComplete {
                    text: Some(text),
                    error: None,
                });
            }
            AiOutcome::KeyRefined {
                outcome: Err(e), ..
            } => {
                warn!(error = %e, "Key refinement failed");
                self.sink.push(UiPush::RefineKeyComplete {
                    text: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn parts(
        &mut self,
    ) -> (&mut ConfigStore, &mut ShortcutRegistrar<B>, &S) {
        (&mut self.store, &mut self.registrar, &self.sink)
    }
}

/// Forward OS hotkey press events into the app channel. Runs until the
/// channel closes.
pub fn forward_hotkey_events(tx: Sender<Event>) {
    std::thread::spawn(move || {
        let receiver = GlobalHotKeyEvent::receiver();
        while let Ok(event) = receiver.recv() {
            // Only respond to key PRESS, not release.
            if event.state != HotKeyState::Pressed {
                continue;
            }
            if tx.send(Event::Hotkey { id: event.id }).is_err() {
                return;
            }
        }
    });
}

/// Forward parsed stdin requests into the app channel. Sends Shutdown when
/// the UI process closes the pipe.
pub fn forward_stdin_requests(tx: Sender<Event>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        crate::ipc::read_requests(stdin.lock(), |request| {
            let _ = tx.send(Event::Request(request));
        });
        let _ = tx.send(Event::Shutdown);
    });
}
