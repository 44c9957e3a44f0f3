//! User preferences and the store they live in.
//!
//! Preferences are read once when the engine starts. Any later change to a
//! relevant key invalidates every derived structure (aliases, pattern,
//! formatter), so the host is asked to restart rather than patch state.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};
use tracing::warn;

use crate::error::{EngineError, Result};

// =============================================================================
// Display style
// =============================================================================

/// Suffix template chosen in the settings popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DisplayStyle {
    Brackets,
    Visual,
    Minimalist,
    Full,
    #[default]
    Concise,
}

impl DisplayStyle {
    pub const ALL: [DisplayStyle; 5] = [
        DisplayStyle::Brackets,
        DisplayStyle::Visual,
        DisplayStyle::Minimalist,
        DisplayStyle::Full,
        DisplayStyle::Concise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStyle::Brackets => "brackets",
            DisplayStyle::Visual => "visual",
            DisplayStyle::Minimalist => "minimalist",
            DisplayStyle::Full => "full",
            DisplayStyle::Concise => "concise",
        }
    }

    /// Unknown keys fall back to the default template
    pub fn from_key(key: &str) -> Self {
        match key {
            "brackets" => DisplayStyle::Brackets,
            "visual" => DisplayStyle::Visual,
            "minimalist" => DisplayStyle::Minimalist,
            "full" => DisplayStyle::Full,
            _ => DisplayStyle::Concise,
        }
    }
}

impl From<String> for DisplayStyle {
    fn from(key: String) -> Self {
        Self::from_key(&key)
    }
}

impl From<DisplayStyle> for String {
    fn from(style: DisplayStyle) -> Self {
        style.as_str().to_string()
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// Snapshot of the user's settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub display_style: DisplayStyle,
    /// Also recognize fully upper-cased names
    #[serde(alias = "matchUppercase")]
    pub match_accent_insensitive: bool,
    /// Also recognize "du"/"au" forms of names starting with "Le"
    #[serde(alias = "matchDu")]
    pub match_article_variant: bool,
    pub show_per_month: bool,
    pub show_per_person: bool,
}

impl Preferences {
    /// Storage keys read at startup
    pub const KEYS: [&'static str; 5] = [
        "displayStyle",
        "matchAccentInsensitive",
        "matchArticleVariant",
        "showPerMonth",
        "showPerPerson",
    ];

    /// Keys written by earlier versions of the settings popup
    pub const LEGACY_KEYS: [&'static str; 2] = ["matchUppercase", "matchDu"];

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Preferences(e.to_string()))
    }

    /// True if any changed key affects annotation output
    pub fn is_relevant_change<S: AsRef<str>>(keys: &[S]) -> bool {
        keys.iter().any(|k| {
            let k = k.as_ref();
            Self::KEYS.contains(&k) || Self::LEGACY_KEYS.contains(&k)
        })
    }
}

/// Partial update, as written by the settings popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_style: Option<DisplayStyle>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "matchUppercase")]
    pub match_accent_insensitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "matchDu")]
    pub match_article_variant: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_per_month: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_per_person: Option<bool>,
}

impl PreferencesPatch {
    /// Apply onto `prefs`, returning the keys whose value actually changed
    pub fn apply(&self, prefs: &mut Preferences) -> Vec<&'static str> {
        let mut changed = Vec::new();

        fn set<T: PartialEq + Copy>(
            slot: &mut T,
            value: Option<T>,
            key: &'static str,
            changed: &mut Vec<&'static str>,
        ) {
            if let Some(value) = value {
                if *slot != value {
                    *slot = value;
                    changed.push(key);
                }
            }
        }

        set(&mut prefs.display_style, self.display_style, "displayStyle", &mut changed);
        set(
            &mut prefs.match_accent_insensitive,
            self.match_accent_insensitive,
            "matchAccentInsensitive",
            &mut changed,
        );
        set(
            &mut prefs.match_article_variant,
            self.match_article_variant,
            "matchArticleVariant",
            &mut changed,
        );
        set(&mut prefs.show_per_month, self.show_per_month, "showPerMonth", &mut changed);
        set(&mut prefs.show_per_person, self.show_per_person, "showPerPerson", &mut changed);

        changed
    }
}

// =============================================================================
// Preference store
// =============================================================================

/// Persisted preference storage with change notifications
pub trait PreferenceStore {
    fn load(&self) -> Result<Preferences>;

    /// Persist a partial update and notify subscribers of the changed keys
    fn save(&mut self, patch: &PreferencesPatch) -> Result<Vec<&'static str>>;

    /// Stream of changed key names, one message per effective save
    fn subscribe(&mut self) -> Receiver<Vec<String>>;
}

/// Read preferences, falling back to defaults when the store fails
pub fn load_or_default<S: PreferenceStore + ?Sized>(store: &S) -> Preferences {
    match store.load() {
        Ok(prefs) => prefs,
        Err(e) => {
            warn!(error = %e, "preference store unavailable, using defaults");
            Preferences::default()
        }
    }
}

/// In-process store for native hosts and tests
#[derive(Debug)]
pub struct MemoryPreferenceStore {
    current: Option<Preferences>,
    subscribers: Vec<Sender<Vec<String>>>,
    available: bool,
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPreferenceStore {
    /// An empty store: loads yield defaults until something is saved
    pub fn new() -> Self {
        Self {
            current: None,
            subscribers: Vec::new(),
            available: true,
        }
    }

    pub fn with_preferences(prefs: Preferences) -> Self {
        Self {
            current: Some(prefs),
            ..Self::new()
        }
    }

    /// A store whose reads and writes fail
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Preferences> {
        if !self.available {
            return Err(EngineError::StoreUnavailable("memory store disabled".to_string()));
        }
        Ok(self.current.unwrap_or_default())
    }

    fn save(&mut self, patch: &PreferencesPatch) -> Result<Vec<&'static str>> {
        if !self.available {
            return Err(EngineError::StoreUnavailable("memory store disabled".to_string()));
        }
        let mut prefs = self.current.unwrap_or_default();
        let changed = patch.apply(&mut prefs);
        self.current = Some(prefs);

        if !changed.is_empty() {
            let keys: Vec<String> = changed.iter().map(|k| k.to_string()).collect();
            // Drop subscribers whose receiver is gone
            self.subscribers.retain(|tx| tx.send(keys.clone()).is_ok());
        }
        Ok(changed)
    }

    fn subscribe(&mut self) -> Receiver<Vec<String>> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }
}

// =============================================================================
// Tests
// =============================================================================
