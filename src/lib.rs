//! Numpad Prompter - a dynamic key-binding engine
//!
//! Binds short text snippets to physical keys, organized into profiles and
//! pages, and auto-pastes the bound text system-wide via OS-level global
//! hotkeys. The library covers the binding resolver, the OS hotkey
//! reconciliation loop, the debounced navigation state machine, and the
//! clipboard/paste pipeline.

pub mod accelerator;
pub mod ai;
pub mod app;
pub mod bindings;
pub mod broadcast;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod paste;
pub mod platform;
pub mod registrar;
pub mod store;
pub mod switcher;
