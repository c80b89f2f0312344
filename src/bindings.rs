//! Resolves the active profile/page into the effective accelerator->binding
//! mapping that drives OS registration.
//!
//! Merge order: global bindings first, then page bindings override on
//! canonical-key collision. All keys in the output are canonical (numpad form
//! for the digit aliases), and the fixed navigation accelerators are filtered
//! out even if present in stored data.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::accelerator::{alias_of, canonical_form, is_reserved};
use crate::store::{Page, Profile};

/// One effective dynamic binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    pub text: String,
    pub tags: Vec<String>,
    pub is_global: bool,
}

/// Canonical effective mapping for (profile, page index).
pub fn resolve(profile: &Profile, page_index: usize) -> BTreeMap<String, Binding> {
    let mut effective = BTreeMap::new();

    for (accelerator, text) in &profile.global_prompts {
        if is_reserved(accelerator) {
            continue;
        }
        effective.insert(
            canonical_form(accelerator),
            Binding {
                text: text.clone(),
                tags: read_aliased(&profile.global_tags, accelerator)
                    .cloned()
                    .unwrap_or_default(),
                is_global: true,
            },
        );
    }

    let page = profile
        .pages
        .get(page_index)
        .or_else(|| profile.pages.first());
    if let Some(page) = page {
        for (accelerator, text) in &page.prompts {
            if is_reserved(accelerator) {
                continue;
            }
            effective.insert(
                canonical_form(accelerator),
                Binding {
                    text: text.clone(),
                    tags: read_aliased(&page.tags, accelerator)
                        .cloned()
                        .unwrap_or_default(),
                    is_global: false,
                },
            );
        }
    }

    effective
}

/// Look up a stored map entry by logical key: checks the accelerator as
/// written, then its digit/numpad alias.
pub fn read_aliased<'m, V>(map: &'m BTreeMap<String, V>, accelerator: &str) -> Option<&'m V> {
    if let Some(value) = map.get(accelerator) {
        return Some(value);
    }
    alias_of(accelerator).and_then(|alias| map.get(&alias))
}

/// Write a stored map entry by logical key. Reuses whichever form already
/// exists in the map for that key; new entries are created in the canonical
/// (numpad-prefixed) form. Never produces duplicate entries for one logical
/// key.
pub fn write_aliased<V>(map: &mut BTreeMap<String, V>, accelerator: &str, value: V) {
    if map.contains_key(accelerator) {
        map.insert(accelerator.to_string(), value);
        return;
    }
    if let Some(alias) = alias_of(accelerator) {
        if map.contains_key(&alias) {
            map.insert(alias, value);
            return;
        }
    }
    map.insert(canonical_form(accelerator), value);
}

/// Convenience for prompt edits on a page honoring the aliasing rule.
pub fn write_prompt(page: &mut Page, accelerator: &str, text: String) {
    write_aliased(&mut page.prompts, accelerator, text);
}
