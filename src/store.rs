//! Persisted process-wide state: profiles, active profile id, per-profile
//! active page index, variables, settings.
//!
//! The store exposes whole-value get/set per top-level field; callers perform
//! read-modify-write on the full structure. After any write the store is
//! self-consistent: at least one profile exists, `activeProfileId` resolves,
//! and every active page index is in range.
//!
//! The on-disk document is JSON with camelCase field names, wire-compatible
//! with the export format consumed by the UI collaborator.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PrompterError, Result};

/// A single page of key bindings inside a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// accelerator -> text to paste
    #[serde(default)]
    pub prompts: BTreeMap<String, String>,
    /// accelerator -> ordered tags
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub global_prompts: BTreeMap<String, String>,
    #[serde(default)]
    pub global_tags: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsPlatform {
    Windows,
    Mac,
    Linux,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub os: OsPlatform,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default)]
    pub context_aware: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            os: OsPlatform::Windows,
            gemini_api_key: String::new(),
            context_aware: false,
            data_path: None,
        }
    }
}

/// The full persisted document. Also the snapshot shape pushed to the UI
/// collaborator after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub profiles: Vec<Profile>,
    pub active_profile_id: String,
    #[serde(default)]
    pub active_page_indices: BTreeMap<String, usize>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub settings: Settings,
}

impl Default for Schema {
    fn default() -> Self {
        let default_profile = Profile {
            id: "default".to_string(),
            name: "Default".to_string(),
            color: "#3b82f6".to_string(),
            global_prompts: BTreeMap::new(),
            global_tags: BTreeMap::new(),
            group: None,
            pages: vec![Page::default()],
        };
        Schema {
            profiles: vec![default_profile],
            active_profile_id: "default".to_string(),
            active_page_indices: BTreeMap::from([("default".to_string(), 0)]),
            variables: BTreeMap::new(),
            settings: Settings::default(),
        }
    }
}

/// Export file format: `{version: 1, profiles, variables}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: u32,
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

pub struct ConfigStore {
    schema: Schema,
    path: PathBuf,
}

/// Default persisted-document location (~/.numpad-prompter/config.json).
pub fn default_data_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".numpad-prompter").join("config.json"))
        .unwrap_or_else(|| std::env::temp_dir().join("numpad-prompter-config.json"))
}

impl ConfigStore {
    /// Load the document at `path`, falling back to schema defaults on any
    /// read or parse failure.
    pub fn load(path: PathBuf) -> Self {
        let schema = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Schema>(&raw) {
                Ok(schema) => {
                    info!(path = %path.display(), "Loaded persisted state");
                    schema
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed persisted document, using defaults");
                    Schema::default()
                }
            },
            Err(e) => {
                info!(path = %path.display(), error = %e, "No persisted document, using defaults");
                Schema::default()
            }
        };

        let mut store = ConfigStore { schema, path };
        store.normalize();
        store
    }

    /// Load from the default location, honoring overrides: a CLI-supplied
    /// path wins, otherwise `settings.dataPath` from the default document.
    pub fn open(cli_path: Option<PathBuf>) -> Self {
        if let Some(path) = cli_path {
            return Self::load(path);
        }
        let store = Self::load(default_data_path());
        match store.schema.settings.data_path.clone() {
            Some(override_path) if override_path != store.path => {
                info!(path = %override_path.display(), "Using dataPath override");
                Self::load(override_path)
            }
            _ => store,
        }
    }

    /// Write the full document to disk as pretty-printed JSON.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PrompterError::Configuration(format!("create {:?}: {}", parent, e)))?;
        }
        let json = serde_json::to_string_pretty(&self.schema)
            .map_err(|e| PrompterError::Configuration(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| PrompterError::Configuration(format!("write {:?}: {}", self.path, e)))?;
        Ok(())
    }

    // --- whole-value getters ---

    pub fn profiles(&self) -> &[Profile] {
        &self.schema.profiles
    }

    pub fn active_profile_id(&self) -> &str {
        &self.schema.active_profile_id
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.schema.variables
    }

    pub fn settings(&self) -> &Settings {
        &self.schema.settings
    }

    /// The active profile. Always resolves: normalization falls back to the
    /// first profile when the stored id is dangling.
    pub fn active_profile(&self) -> &Profile {
        self.schema
            .profiles
            .iter()
            .find(|p| p.id == self.schema.active_profile_id)
            .unwrap_or(&self.schema.profiles[0])
    }

    /// Active page index for the active profile, clamped. Missing entries
    /// default to 0.
    pub fn active_page_index(&self) -> usize {
        let profile = self.active_profile();
        self.page_index_for(&profile.id)
    }

    pub fn page_index_for(&self, profile_id: &str) -> usize {
        let index = self
            .schema
            .active_page_indices
            .get(profile_id)
            .copied()
            .unwrap_or(0);
        let len = self
            .schema
            .profiles
            .iter()
            .find(|p| p.id == profile_id)
            .map(|p| p.pages.len())
            .unwrap_or(1);
        index.min(len.saturating_sub(1))
    }

    /// Full state snapshot for the UI collaborator.
    pub fn snapshot(&self) -> Schema {
        self.schema.clone()
    }

    // --- whole-value setters ---

    /// Replace the profile list. A list that would leave the store with zero
    /// profiles is rejected with no mutation; the list length invariant is
    /// always >= 1.
    pub fn set_profiles(&mut self, profiles: Vec<Profile>) -> Result<()> {
        if profiles.is_empty() {
            return Err(PrompterError::Configuration(
                "profile list cannot be emptied".to_string(),
            ));
        }
        self.schema.profiles = profiles;
        self.normalize();
        Ok(())
    }

    pub fn set_active_profile_id(&mut self, id: String) {
        self.schema.active_profile_id = id;
        self.normalize();
    }

    /// Entries are created lazily and clamped into `[0, len(pages))`.
    pub fn set_active_page_index(&mut self, profile_id: &str, index: usize) {
        self.schema
            .active_page_indices
            .insert(profile_id.to_string(), index);
        self.normalize();
    }

    pub fn set_variables(&mut self, variables: BTreeMap<String, String>) {
        self.schema.variables = variables;
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.schema.settings = settings;
    }

    /// Read-modify-write access to a single profile, for prompt edits applied
    /// by the page-generation and key-refinement paths.
    pub fn modify_profile(&mut self, profile_id: &str, f: impl FnOnce(&mut Profile)) -> bool {
        let found = self
            .schema
            .profiles
            .iter_mut()
            .find(|p| p.id == profile_id);
        match found {
            Some(profile) => {
                f(profile);
                self.normalize();
                true
            }
            None => false,
        }
    }

    // --- export / import ---

    pub fn export_document(&self) -> ExportDocument {
        ExportDocument {
            version: 1,
            profiles: self.schema.profiles.clone(),
            variables: self.schema.variables.clone(),
        }
    }

    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.export_document())
            .map_err(|e| PrompterError::Configuration(e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| PrompterError::Configuration(format!("write {:?}: {}", path, e)))?;
        info!(path = %path.display(), "Exported profiles");
        Ok(())
    }

    /// Import either a bare array of profile-shaped objects or the export
    /// document shape. Rejected in full (zero mutation) if sanitization
    /// yields zero valid profiles.
    pub fn import_value(&mut self, raw: serde_json::Value) -> Result<()> {
        let (raw_profiles, raw_variables) = match raw {
            serde_json::Value::Array(items) => (items, None),
            serde_json::Value::Object(mut obj) => {
                let profiles = match obj.remove("profiles") {
                    Some(serde_json::Value::Array(items)) => items,
                    _ => {
                        return Err(PrompterError::ImportValidation(
                            "document has no profiles array".to_string(),
                        ))
                    }
                };
                let variables = obj.remove("variables").and_then(|v| {
                    serde_json::from_value::<BTreeMap<String, String>>(v).ok()
                });
                (profiles, variables)
            }
            _ => {
                return Err(PrompterError::ImportValidation(
                    "document is neither an array nor an object".to_string(),
                ))
            }
        };

        let profiles: Vec<Profile> = raw_profiles.into_iter().filter_map(sanitize_profile).collect();
        if profiles.is_empty() {
            return Err(PrompterError::ImportValidation(
                "no valid profiles after sanitization".to_string(),
            ));
        }

        info!(count = profiles.len(), "Importing profiles");
        self.schema.profiles = profiles;
        if let Some(variables) = raw_variables {
            self.schema.variables = variables;
        }
        self.normalize();
        Ok(())
    }

    pub fn import_from_file(&mut self, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path)
            .map_err(|e| PrompterError::ImportValidation(format!("read {:?}: {}", path, e)))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| PrompterError::ImportValidation(format!("parse {:?}: {}", path, e)))?;
        self.import_value(value)
    }

    /// Restore self-consistency after a write: non-empty profile list,
    /// resolvable active id, per-profile page existence, clamped indices.
    fn normalize(&mut self) {
        if self.schema.profiles.is_empty() {
            warn!("Profile list empty after mutation, restoring defaults");
            self.schema.profiles = Schema::default().profiles;
        }
        for profile in &mut self.schema.profiles {
            if profile.pages.is_empty() {
                profile.pages.push(Page::default());
            }
        }
        let active_resolves = self
            .schema
            .profiles
            .iter()
            .any(|p| p.id == self.schema.active_profile_id);
        if !active_resolves {
            self.schema.active_profile_id = self.schema.profiles[0].id.clone();
        }
        // Clamp stored indices in place so persisted state matches reads.
        let page_counts: Vec<(String, usize)> = self
            .schema
            .profiles
            .iter()
            .map(|p| (p.id.clone(), p.pages.len()))
            .collect();
        for (id, len) in page_counts {
            if let Some(index) = self.schema.active_page_indices.get_mut(&id) {
                *index = (*index).min(len.saturating_sub(1));
            }
        }
    }
}

/// Sanitize one imported profile-shaped value. Returns None only when the
/// value is not an object at all.
fn sanitize_profile(raw: serde_json::Value) -> Option<Profile> {
    let obj = raw.as_object()?;

    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| "Imported Profile".to_string());
    let color = obj
        .get("color")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| "#3b82f6".to_string());
    let group = obj
        .get("group")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let global_prompts = obj
        .get("globalPrompts")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    let global_tags = obj
        .get("globalTags")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let pages = match obj.get("pages").and_then(|v| v.as_array()) {
        Some(raw_pages) if !raw_pages.is_empty() => raw_pages
            .iter()
            .map(|raw_page| Page {
                prompts: raw_page
                    .get("prompts")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
                tags: raw_page
                    .get("tags")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
            })
            .collect(),
        _ => vec![Page::default()],
    };

    Some(Profile {
        id,
        name,
        color,
        global_prompts,
        global_tags,
        group,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::load(dir.path().join("config.json"))
    }

    fn profile(id: &str, pages: usize) -> Profile {
        Profile {
            id: id.to_string(),
            name: id.to_uppercase(),
            color: "#ff0000".to_string(),
            global_prompts: BTreeMap::new(),
            global_tags: BTreeMap::new(),
            group: None,
            pages: (0..pages).map(|_| Page::default()).collect(),
        }
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.profiles().len(), 1);
        assert_eq!(store.active_profile_id(), "default");
        assert_eq!(store.active_page_index(), 0);
    }

    #[test]
    fn load_malformed_document_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let store = ConfigStore::load(path);
        assert_eq!(store.active_profile_id(), "default");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut store = ConfigStore::load(path.clone());
        store
            .set_profiles(vec![profile("work", 2), profile("play", 1)])
            .unwrap();
        store.set_active_profile_id("play".to_string());
        store.set_variables(BTreeMap::from([("name".to_string(), "World".to_string())]));
        store.save().unwrap();

        let reloaded = ConfigStore::load(path);
        assert_eq!(reloaded.profiles().len(), 2);
        assert_eq!(reloaded.active_profile_id(), "play");
        assert_eq!(reloaded.variables().get("name").unwrap(), "World");
    }

    #[test]
    fn emptying_profile_list_is_rejected_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let before = store.snapshot();
        assert!(store.set_profiles(Vec::new()).is_err());
        assert_eq!(store.snapshot(), before);
        assert!(!store.profiles().is_empty());
    }

    #[test]
    fn repeated_delete_attempts_never_empty_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store
            .set_profiles(vec![profile("a", 1), profile("b", 1)])
            .unwrap();
        // Deleting down to one profile is allowed.
        store.set_profiles(vec![profile("a", 1)]).unwrap();
        // Deleting the sole remaining profile is rejected, repeatedly.
        for _ in 0..3 {
            assert!(store.set_profiles(Vec::new()).is_err());
            assert!(store.profiles().len() >= 1);
        }
    }

    #[test]
    fn dangling_active_id_falls_back_to_first_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store
            .set_profiles(vec![profile("a", 1), profile("b", 1)])
            .unwrap();
        store.set_active_profile_id("b".to_string());
        store.set_profiles(vec![profile("a", 1)]).unwrap();
        assert_eq!(store.active_profile_id(), "a");
    }

    #[test]
    fn page_index_is_clamped_to_page_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set_profiles(vec![profile("a", 3)]).unwrap();
        store.set_active_page_index("a", 99);
        assert_eq!(store.page_index_for("a"), 2);

        // Shrinking the page list re-clamps the stored index.
        store.set_profiles(vec![profile("a", 1)]).unwrap();
        assert_eq!(store.page_index_for("a"), 0);
    }

    #[test]
    fn missing_page_index_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set_profiles(vec![profile("fresh", 2)]).unwrap();
        assert_eq!(store.page_index_for("fresh"), 0);
    }

    #[test]
    fn profile_with_no_pages_gains_an_empty_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set_profiles(vec![profile("bare", 0)]).unwrap();
        assert_eq!(store.profiles()[0].pages.len(), 1);
    }

    #[test]
    fn export_import_round_trip_preserves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let mut p = profile("work", 2);
        p.global_prompts
            .insert("Num1".to_string(), "hello".to_string());
        p.pages[1]
            .prompts
            .insert("Num2".to_string(), "world".to_string());
        p.pages[1]
            .tags
            .insert("Num2".to_string(), vec!["greeting".to_string()]);
        store.set_profiles(vec![p.clone()]).unwrap();
        store.set_variables(BTreeMap::from([("k".to_string(), "v".to_string())]));

        let export_path = dir.path().join("export.json");
        store.export_to_file(&export_path).unwrap();

        let dir2 = tempfile::tempdir().unwrap();
        let mut fresh = store_in(&dir2);
        fresh.import_from_file(&export_path).unwrap();

        assert_eq!(fresh.profiles(), &[p]);
        assert_eq!(fresh.variables().get("k").unwrap(), "v");
    }

    #[test]
    fn import_empty_object_is_rejected_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let before = store.snapshot();
        assert!(store.import_value(serde_json::json!({})).is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn import_empty_array_is_rejected_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let before = store.snapshot();
        assert!(store.import_value(serde_json::json!([])).is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn import_sanitizes_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store
            .import_value(serde_json::json!([{"color": "#fff"}]))
            .unwrap();
        let p = &store.profiles()[0];
        assert!(!p.id.is_empty());
        assert_eq!(p.name, "Imported Profile");
        assert_eq!(p.pages.len(), 1);
        assert!(p.global_prompts.is_empty());
        assert!(p.global_tags.is_empty());
    }

    #[test]
    fn import_skips_non_object_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store
            .import_value(serde_json::json!([42, "nope", {"name": "Kept"}]))
            .unwrap();
        assert_eq!(store.profiles().len(), 1);
        assert_eq!(store.profiles()[0].name, "Kept");
    }

    #[test]
    fn import_resets_dangling_active_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set_profiles(vec![profile("old", 1)]).unwrap();
        store.set_active_profile_id("old".to_string());
        store
            .import_value(serde_json::json!([{"id": "new", "name": "New"}]))
            .unwrap();
        assert_eq!(store.active_profile_id(), "new");
    }

    #[test]
    fn import_replaces_variables_only_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set_variables(BTreeMap::from([("keep".to_string(), "me".to_string())]));
        store
            .import_value(serde_json::json!([{"id": "p"}]))
            .unwrap();
        assert_eq!(store.variables().get("keep").unwrap(), "me");

        store
            .import_value(serde_json::json!({
                "version": 1,
                "profiles": [{"id": "q"}],
                "variables": {"fresh": "one"}
            }))
            .unwrap();
        assert!(store.variables().get("keep").is_none());
        assert_eq!(store.variables().get("fresh").unwrap(), "one");
    }

    #[test]
    fn schema_wire_format_is_camel_case() {
        let json = serde_json::to_value(Schema::default()).unwrap();
        assert!(json.get("activeProfileId").is_some());
        assert!(json.get("activePageIndices").is_some());
        let profile = &json["profiles"][0];
        assert!(profile.get("globalPrompts").is_some());
        let settings = &json["settings"];
        assert_eq!(settings["os"], "windows");
        assert!(settings.get("geminiApiKey").is_some());
    }
}
