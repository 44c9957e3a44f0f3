//! Mutation watcher: incremental passes over newly inserted subtrees.
//!
//! The host delivers batches of inserted nodes (a `MutationObserver`
//! callback in the browser, [`Document::take_mutations`] natively). Batches
//! queue here and a drain runs the annotator on each inserted node, never on
//! the whole document. Large bursts are worked through in chunks of
//! `batch_size` nodes so each chunk is logged on its own.
//!
//! [`Document::take_mutations`]: crate::dom::Document::take_mutations

use std::collections::VecDeque;
use tracing::debug;

use crate::dom::{DocumentTree, MutationRecord, NodeId};
use crate::scanner::{AnnotationStats, Annotator};

#[derive(Debug)]
pub struct MutationWatcher<N> {
    queue: VecDeque<N>,
    batch_size: usize,
}

impl<N: Clone> MutationWatcher<N> {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            queue: VecDeque::with_capacity(batch_size.min(1024)),
            batch_size,
        }
    }

    /// Queue a batch of inserted nodes
    pub fn notify<I: IntoIterator<Item = N>>(&mut self, inserted: I) {
        self.queue.extend(inserted);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Annotate everything queued, in arrival order, one chunk at a time
    pub fn drain<T>(&mut self, annotator: &Annotator, tree: &mut T) -> AnnotationStats
    where
        T: DocumentTree<Node = N>,
    {
        let mut stats = AnnotationStats::default();
        while !self.queue.is_empty() {
            let take = self.batch_size.min(self.queue.len());
            let mut chunk = AnnotationStats::default();
            for node in self.queue.drain(..take) {
                chunk.merge(&annotator.annotate(tree, &node));
            }
            debug!(
                nodes = take,
                remaining = self.queue.len(),
                annotations = chunk.annotations,
                "incremental pass"
            );
            stats.merge(&chunk);
        }
        stats
    }
}

/// Inserted nodes from in-memory mutation records, in record order
pub fn inserted_nodes(records: &[MutationRecord]) -> Vec<NodeId> {
    records.iter().flat_map(|r| r.added.iter().copied()).collect()
}
