//! FundingEngine: lifecycle around the annotator and the mutation watcher
//!
//! # Lifecycle
//! 1. State machine: AwaitingPreferences → Running → Invalidated
//! 2. Preferences gate everything: nothing is annotated before they arrive
//! 3. A relevant preference change never patches derived state; the engine
//!    goes inert and asks the host to rebuild the world
//!
//! # Usage
//! ```rust
//! use fundcore::{Document, EngineConfig, FundingEngine, FundingTable, HostEvent, Preferences};
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! doc.append_text(root, "Le Monde");
//!
//! let mut engine = FundingEngine::new(FundingTable::builtin(), EngineConfig::default(), root).unwrap();
//! engine.handle(HostEvent::PreferencesLoaded(Preferences::default()), &mut doc);
//! assert_eq!(doc.text_content(root), "Le Monde (8,3M€ public '23)");
//! ```

use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::dom::DocumentTree;
use crate::error::Result;
use crate::funding::FundingTable;
use crate::preferences::{PreferenceStore, Preferences};
use crate::scanner::{AnnotationStats, Annotator};
use crate::watcher::MutationWatcher;

// =============================================================================
// Events
// =============================================================================

/// Everything the host can tell the engine
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent<N> {
    /// One-time preference read completed
    PreferencesLoaded(Preferences),
    /// Preference read failed; defaults apply
    PreferencesUnavailable(String),
    /// A batch of nodes was inserted under the watched root
    NodesInserted(Vec<N>),
    /// Stored preferences changed (key names)
    PreferencesChanged(Vec<String>),
}

/// What the host should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Idle,
    Annotated(AnnotationStats),
    /// Derived state is stale; tear down and start over (page reload)
    ReloadRequired,
}

// =============================================================================
// State Machine
// =============================================================================

#[derive(Debug)]
enum State<N> {
    AwaitingPreferences,
    Running {
        preferences: Preferences,
        annotator: Annotator,
        watcher: MutationWatcher<N>,
    },
    Invalidated,
}

// =============================================================================
// FundingEngine
// =============================================================================

#[derive(Debug)]
pub struct FundingEngine<N> {
    table: FundingTable,
    config: EngineConfig,
    root: N,
    state: State<N>,
    build_error: Option<String>,
}

impl<N: Clone> FundingEngine<N> {
    pub fn new(table: FundingTable, config: EngineConfig, root: N) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            table,
            config,
            root,
            state: State::AwaitingPreferences,
            build_error: None,
        })
    }

    /// Build an engine and feed it the store's preferences in one go
    pub fn start_with_store<S, T>(
        table: FundingTable,
        config: EngineConfig,
        root: N,
        store: &S,
        tree: &mut T,
    ) -> Result<(Self, Reaction)>
    where
        S: PreferenceStore + ?Sized,
        T: DocumentTree<Node = N>,
    {
        let mut engine = Self::new(table, config, root)?;
        let event = match store.load() {
            Ok(prefs) => HostEvent::PreferencesLoaded(prefs),
            Err(e) => HostEvent::PreferencesUnavailable(e.to_string()),
        };
        let reaction = engine.handle(event, tree);
        Ok((engine, reaction))
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    pub fn is_invalidated(&self) -> bool {
        matches!(self.state, State::Invalidated)
    }

    /// Current state name (for debugging)
    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::AwaitingPreferences => "awaiting-preferences",
            State::Running { .. } => "running",
            State::Invalidated => "invalidated",
        }
    }

    /// Active preference snapshot, once running
    pub fn preferences(&self) -> Option<&Preferences> {
        match &self.state {
            State::Running { preferences, .. } => Some(preferences),
            _ => None,
        }
    }

    pub fn annotator(&self) -> Option<&Annotator> {
        match &self.state {
            State::Running { annotator, .. } => Some(annotator),
            _ => None,
        }
    }

    pub fn root(&self) -> &N {
        &self.root
    }

    /// Why the annotator could not be built, if it could not
    pub fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref()
    }

    /// React to one host event. Runs to completion.
    pub fn handle<T>(&mut self, event: HostEvent<N>, tree: &mut T) -> Reaction
    where
        T: DocumentTree<Node = N>,
    {
        match event {
            HostEvent::PreferencesLoaded(prefs) => self.start(prefs, tree),
            HostEvent::PreferencesUnavailable(reason) => {
                warn!(%reason, "preferences unavailable, using defaults");
                self.start(Preferences::default(), tree)
            }
            HostEvent::NodesInserted(nodes) => self.on_inserted(nodes, tree),
            HostEvent::PreferencesChanged(keys) => self.on_changed(&keys),
        }
    }

    fn start<T>(&mut self, prefs: Preferences, tree: &mut T) -> Reaction
    where
        T: DocumentTree<Node = N>,
    {
        if !matches!(self.state, State::AwaitingPreferences) {
            debug!(state = self.state_name(), "ignoring late preference snapshot");
            return Reaction::Idle;
        }

        let annotator = match Annotator::new(self.table.clone(), &prefs, self.config.clone()) {
            Ok(annotator) => annotator,
            Err(e) => {
                // Nothing gets annotated; the page itself is left alone
                warn!(error = %e, "failed to build annotator");
                self.build_error = Some(e.to_string());
                self.state = State::Invalidated;
                return Reaction::Idle;
            }
        };

        let stats = annotator.annotate(tree, &self.root);
        debug!(annotations = stats.annotations, "initial pass complete");

        let watcher = MutationWatcher::new(self.config.batch_size);
        self.state = State::Running {
            preferences: prefs,
            annotator,
            watcher,
        };
        Reaction::Annotated(stats)
    }

    fn on_inserted<T>(&mut self, nodes: Vec<N>, tree: &mut T) -> Reaction
    where
        T: DocumentTree<Node = N>,
    {
        match &mut self.state {
            State::Running {
                annotator, watcher, ..
            } => {
                watcher.notify(nodes);
                Reaction::Annotated(watcher.drain(annotator, tree))
            }
            // The initial pass covers anything inserted before preferences
            State::AwaitingPreferences => {
                trace!(count = nodes.len(), "dropping insertions before start");
                Reaction::Idle
            }
            State::Invalidated => Reaction::Idle,
        }
    }

    fn on_changed(&mut self, keys: &[String]) -> Reaction {
        if self.is_invalidated() || !Preferences::is_relevant_change(keys) {
            return Reaction::Idle;
        }
        debug!(?keys, "preferences changed, reload required");
        self.state = State::Invalidated;
        Reaction::ReloadRequired
    }
}

// =============================================================================
// Tests
// =============================================================================
