//! FundCore: public-funding annotations for live web pages
//!
//! A Rust/WASM engine that finds mentions of publicly funded media outlets in
//! page text and appends the outlet's public funding, formatted per user
//! preference. Annotation is idempotent and keeps up with dynamic pages.
//!
//! # Architecture
//!
//! ## Engine
//! - `funding.rs` - FundingTable: canonical name → raw amount, ordered
//! - `preferences.rs` - Preferences, PreferenceStore: user settings and change notifications
//! - `config.rs` - EngineConfig: population, guards, excluded tags, markup classes
//! - `format/` - Amount parsing, French formatting, suffix templates
//! - `scanner/` - Alias expansion, pattern compilation, guards, the annotator
//! - `watcher.rs` - MutationWatcher: bounded queue of inserted subtrees
//! - `engine.rs` - FundingEngine: AwaitingPreferences → Running → Invalidated
//!
//! ## Hosts
//! - `dom/memory.rs` - In-memory document (native hosts, tests)
//! - `dom/browser.rs` - Live DOM via web-sys (wasm32)
//! - `wasm.rs` - chrome.storage + MutationObserver bindings (wasm32)
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { start, formatSuffix } from 'fundcore';
//!
//! await init();
//!
//! // Built-in table, default config
//! await start();
//!
//! // Settings popup preview
//! formatSuffix("8,3M€", { displayStyle: "brackets" }); // " [8,3M€ public]"
//! ```

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod format;
pub mod funding;
pub mod preferences;
pub mod scanner;
pub mod watcher;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub use config::EngineConfig;
pub use dom::{Document, DocumentTree, NodeId};
pub use engine::{FundingEngine, HostEvent, Reaction};
pub use error::{EngineError, Result};
pub use format::{format_value, formatted_suffix, parse_amount, SuffixFormatter};
pub use funding::{Entity, FundingTable};
pub use preferences::{
    load_or_default, DisplayStyle, MemoryPreferenceStore, PreferenceStore, Preferences, PreferencesPatch,
};
pub use scanner::{AnnotationSpan, AnnotationStats, Annotator};
pub use watcher::MutationWatcher;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("fundcore v{}", env!("CARGO_PKG_VERSION"))
}
