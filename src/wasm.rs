//! Browser entry points.
//!
//! `start` wires the engine to the page: preferences come from
//! `chrome.storage.sync`, inserted subtrees from a `MutationObserver` on
//! `document.body`, and relevant storage changes reload the page.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{MutationObserver, MutationObserverInit, MutationRecord, Node};

use crate::config::{EngineConfig, DEFAULT_POPULATION};
use crate::dom::browser::BrowserTree;
use crate::engine::{FundingEngine, HostEvent, Reaction};
use crate::format::SuffixFormatter;
use crate::funding::FundingTable;
use crate::preferences::{Preferences, PreferencesPatch};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = get, catch)]
    fn storage_get(keys: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = set, catch)]
    fn storage_set(items: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "onChanged"], js_name = addListener)]
    fn on_storage_changed(listener: &Closure<dyn FnMut(JsValue, JsValue)>);
}

/// Legacy key and the key that supersedes it
const LEGACY_RENAMES: [(&str, &str); 2] = [
    ("matchUppercase", "matchAccentInsensitive"),
    ("matchDu", "matchArticleVariant"),
];

struct Host {
    engine: FundingEngine<Node>,
    tree: BrowserTree,
}

type SharedHost = Rc<RefCell<Host>>;

fn log(msg: &str) {
    web_sys::console::log_1(&format!("[FundCore] {}", msg).into());
}

fn log_warn(msg: &str) {
    web_sys::console::warn_1(&format!("[FundCore] {}", msg).into());
}

fn js_err(msg: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&msg.to_string())
}

fn parse_or_default<T>(value: JsValue) -> Result<T, JsValue>
where
    T: Default + serde::de::DeserializeOwned,
{
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(js_err)
}

/// Start annotating the current page.
///
/// `funding` is an optional `{ name: rawAmount }` object (built-in table when
/// omitted), `config` an optional partial `EngineConfig`.
#[wasm_bindgen]
pub async fn start(funding: JsValue, config: JsValue) -> Result<(), JsValue> {
    let table = if funding.is_undefined() || funding.is_null() {
        FundingTable::builtin()
    } else {
        serde_wasm_bindgen::from_value(funding).map_err(js_err)?
    };
    let config: EngineConfig = parse_or_default(config)?;

    let window = web_sys::window().ok_or_else(|| js_err("no window"))?;
    let document = window.document().ok_or_else(|| js_err("no document"))?;
    let body: Node = document.body().ok_or_else(|| js_err("no document body"))?.into();

    let mut engine = FundingEngine::new(table, config, body.clone()).map_err(js_err)?;
    let mut tree = BrowserTree::new(document);

    let event = match load_preferences().await {
        Ok(prefs) => HostEvent::PreferencesLoaded(prefs),
        Err(reason) => {
            log_warn(&format!("preferences unavailable, using defaults: {}", reason));
            HostEvent::PreferencesUnavailable(reason)
        }
    };
    if let Reaction::Annotated(stats) = engine.handle(event, &mut tree) {
        log(&format!(
            "initial pass: {} annotations in {} text nodes",
            stats.annotations, stats.text_nodes_scanned
        ));
    }
    if !engine.is_running() {
        let reason = engine.build_error().unwrap_or("unknown error");
        log_warn(&format!("engine did not start, page left untouched: {}", reason));
        return Ok(());
    }

    let host: SharedHost = Rc::new(RefCell::new(Host { engine, tree }));
    observe_insertions(&host, &body)?;
    listen_for_changes(&host);
    Ok(())
}

async fn load_preferences() -> Result<Preferences, String> {
    let keys: Array = Preferences::KEYS
        .iter()
        .chain(Preferences::LEGACY_KEYS.iter())
        .map(|k| JsValue::from_str(k))
        .collect();
    let promise = storage_get(&keys).map_err(|e| format!("{:?}", e))?;
    let stored = JsFuture::from(promise).await.map_err(|e| format!("{:?}", e))?;

    drop_shadowed_legacy_keys(&stored);
    serde_wasm_bindgen::from_value(stored).map_err(|e| e.to_string())
}

/// Remove legacy keys whose current key is also stored; serde rejects both at once.
/// Returns how many were removed.
fn drop_shadowed_legacy_keys(stored: &JsValue) -> usize {
    let Some(obj) = stored.dyn_ref::<Object>() else {
        return 0;
    };
    let mut dropped = 0;
    for (legacy, current) in LEGACY_RENAMES {
        let legacy_key = JsValue::from_str(legacy);
        let shadowed = Reflect::has(obj, &JsValue::from_str(current)).unwrap_or(false)
            && Reflect::has(obj, &legacy_key).unwrap_or(false);
        if !shadowed {
            continue;
        }
        match Reflect::delete_property(obj, &legacy_key) {
            Ok(true) => dropped += 1,
            Ok(false) => log_warn(&format!("could not drop legacy key {}", legacy)),
            Err(e) => log_warn(&format!("could not drop legacy key {}: {:?}", legacy, e)),
        }
    }
    dropped
}

fn observe_insertions(host: &SharedHost, body: &Node) -> Result<(), JsValue> {
    let shared = host.clone();
    let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(move |records: Array, _: MutationObserver| {
        let mut inserted = Vec::new();
        for record in records.iter() {
            let Ok(record) = record.dyn_into::<MutationRecord>() else {
                continue;
            };
            let added = record.added_nodes();
            inserted.extend((0..added.length()).filter_map(|i| added.item(i)));
        }
        if inserted.is_empty() {
            return;
        }

        let Ok(mut host) = shared.try_borrow_mut() else {
            return;
        };
        let Host { engine, tree } = &mut *host;
        engine.handle(HostEvent::NodesInserted(inserted), tree);
    });

    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    observer.observe_with_options(body, &init)?;

    // Lives as long as the page
    callback.forget();
    Ok(())
}

fn listen_for_changes(host: &SharedHost) {
    let shared = host.clone();
    let listener = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |changes: JsValue, _area: JsValue| {
        let Some(changes) = changes.dyn_ref::<Object>() else {
            return;
        };
        let keys: Vec<String> = Object::keys(changes).iter().filter_map(|k| k.as_string()).collect();

        let reaction = match shared.try_borrow_mut() {
            Ok(mut host) => {
                let Host { engine, tree } = &mut *host;
                engine.handle(HostEvent::PreferencesChanged(keys), tree)
            }
            Err(_) => return,
        };
        if reaction == Reaction::ReloadRequired {
            log("preferences changed, reloading");
            if let Some(window) = web_sys::window() {
                if let Err(e) = window.location().reload() {
                    log_warn(&format!("reload failed: {:?}", e));
                }
            }
        }
    });
    on_storage_changed(&listener);
    listener.forget();
}

/// Store a partial preference record (settings popup)
#[wasm_bindgen(js_name = savePreferences)]
pub async fn save_preferences(patch: JsValue) -> Result<(), JsValue> {
    let patch: PreferencesPatch = parse_or_default(patch)?;
    let items = serde_wasm_bindgen::to_value(&patch).map_err(js_err)?;
    JsFuture::from(storage_set(&items)?).await?;
    Ok(())
}

/// Suffix a raw amount would get under `prefs` (settings popup preview)
#[wasm_bindgen(js_name = formatSuffix)]
pub fn format_suffix(raw: &str, prefs: JsValue) -> Result<String, JsValue> {
    let prefs: Preferences = parse_or_default(prefs)?;
    Ok(SuffixFormatter::new(&prefs, DEFAULT_POPULATION).suffix(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn stored(pairs: &[(&str, bool)]) -> JsValue {
        let obj = Object::new();
        for (key, value) in pairs {
            Reflect::set(&obj, &JsValue::from_str(key), &JsValue::from_bool(*value)).unwrap();
        }
        obj.into()
    }

    #[wasm_bindgen_test]
    fn current_key_wins_over_legacy() {
        let value = stored(&[("matchUppercase", false), ("matchAccentInsensitive", true)]);
        assert_eq!(drop_shadowed_legacy_keys(&value), 1);
        let prefs: Preferences = serde_wasm_bindgen::from_value(value).unwrap();
        assert!(prefs.match_accent_insensitive);
    }

    #[wasm_bindgen_test]
    fn lone_legacy_key_is_kept() {
        let value = stored(&[("matchDu", true)]);
        assert_eq!(drop_shadowed_legacy_keys(&value), 0);
        let prefs: Preferences = serde_wasm_bindgen::from_value(value).unwrap();
        assert!(prefs.match_article_variant);
    }

    #[wasm_bindgen_test]
    fn preview_suffix() {
        let prefs = serde_wasm_bindgen::to_value(&Preferences {
            display_style: crate::preferences::DisplayStyle::Brackets,
            ..Preferences::default()
        })
        .unwrap();
        assert_eq!(format_suffix("8,3M€", prefs).unwrap(), " [8,3M€ public]");
    }
}
