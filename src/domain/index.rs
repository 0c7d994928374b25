//! Precomputed tree index over parent-referencing records.

use std::collections::HashMap;
use std::fmt;
use std::iter::FusedIterator;

use generational_arena::{Arena, Index};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;
use termtree::Tree;
use tracing::instrument;

use crate::domain::builder::IndexBuilder;
use crate::domain::error::{IndexError, IndexResult};
use crate::domain::record::{NodeId, NodeKey, NodeRef, Record, ROOT_SENTINEL};

/// Read-only tree index.
///
/// Records are stored once in an arena. `by_id`, `children_of` and
/// `ancestors_of` hold arena indices and are built exactly once by
/// [`IndexBuilder`]; nothing mutates them afterwards, so a built index can be
/// shared across threads by reference.
#[derive(Debug)]
pub struct TreeIndex {
    pub(crate) arena: Arena<Record>,
    /// Input order, verbatim
    pub(crate) items: Vec<Index>,
    pub(crate) by_id: HashMap<NodeId, Index>,
    /// Direct children in order of first appearance
    pub(crate) children_of: HashMap<NodeId, Vec<Index>>,
    /// Ancestor chain, nearest parent first, ending at a child of root
    pub(crate) ancestors_of: HashMap<NodeId, Vec<Index>>,
}

impl TreeIndex {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
            items: Vec::with_capacity(capacity),
            by_id: HashMap::with_capacity(capacity),
            children_of: HashMap::with_capacity(capacity),
            ancestors_of: HashMap::with_capacity(capacity),
        }
    }

    /// Build an index with default options (single pass, input order).
    ///
    /// Parents must appear before their children; see [`IndexBuilder`] for
    /// the two-pass variant that accepts any order.
    ///
    /// # Example
    /// ```
    /// use serde_json::json;
    /// use treeindex::domain::{NodeId, TreeIndex};
    ///
    /// let index = TreeIndex::build(vec![
    ///     json!({"id": 1, "parent": "root"}),
    ///     json!({"id": 2, "parent": 1, "type": "test"}),
    /// ])
    /// .unwrap();
    /// assert_eq!(index.get_all_parents(2).unwrap().ids(), vec![NodeId(1)]);
    /// ```
    pub fn build<I: IntoIterator<Item = Value>>(items: I) -> IndexResult<Self> {
        IndexBuilder::default().build(items)
    }

    /// All records in the order they were supplied.
    #[instrument(level = "trace", skip(self))]
    pub fn get_all(&self) -> RecordSlice<'_> {
        RecordSlice::new(&self.arena, &self.items)
    }

    #[instrument(level = "trace", skip(self, key))]
    pub fn get_item<K: NodeKey>(&self, key: K) -> IndexResult<&Record> {
        let id = self.resolve(&key, |id| self.by_id.contains_key(id))?;
        self.node(id).ok_or(IndexError::NotFound(NodeRef::Id(id)))
    }

    /// Direct children; empty for leaves.
    #[instrument(level = "trace", skip(self, key))]
    pub fn get_children<K: NodeKey>(&self, key: K) -> IndexResult<RecordSlice<'_>> {
        let id = self.resolve(&key, |id| self.children_of.contains_key(id))?;
        let children = self
            .children_of
            .get(&id)
            .ok_or(IndexError::NotFound(NodeRef::Id(id)))?;
        Ok(RecordSlice::new(&self.arena, children))
    }

    /// Ancestor chain, nearest parent first; empty for children of root.
    #[instrument(level = "trace", skip(self, key))]
    pub fn get_all_parents<K: NodeKey>(&self, key: K) -> IndexResult<RecordSlice<'_>> {
        let id = self.resolve(&key, |id| self.ancestors_of.contains_key(id))?;
        let chain = self
            .ancestors_of
            .get(&id)
            .ok_or(IndexError::NotFound(NodeRef::Id(id)))?;
        Ok(RecordSlice::new(&self.arena, chain))
    }

    /// Number of ancestors above the node.
    pub fn depth<K: NodeKey>(&self, key: K) -> IndexResult<usize> {
        self.get_all_parents(key).map(|chain| chain.len())
    }

    pub fn contains<K: NodeKey>(&self, key: K) -> bool {
        self.get_item(key).is_ok()
    }

    /// Number of supplied records (duplicates included).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Records whose parent is the root sentinel, in input order.
    pub fn roots(&self) -> Vec<&Record> {
        self.get_all()
            .iter()
            .filter(|record| record.is_root_child())
            .collect()
    }

    /// Registered records without children, in input order.
    pub fn leaves(&self) -> Vec<&Record> {
        self.by_id_in_input_order()
            .filter(|record| {
                self.children_of
                    .get(&record.id())
                    .is_some_and(|children| children.is_empty())
            })
            .collect()
    }

    /// Render the hierarchy below the root sentinel.
    pub fn to_tree_string(&self) -> Tree<String> {
        let leaves = self
            .roots()
            .into_iter()
            .map(|record| self.subtree(record))
            .collect::<Vec<_>>();
        Tree::new(ROOT_SENTINEL.to_string()).with_leaves(leaves)
    }

    fn subtree(&self, record: &Record) -> Tree<String> {
        let children = self
            .children_of
            .get(&record.id())
            .map(|children| RecordSlice::new(&self.arena, children))
            .into_iter()
            .flat_map(|slice| slice.iter())
            .map(|child| self.subtree(child))
            .collect::<Vec<_>>();
        Tree::new(record.to_string()).with_leaves(children)
    }

    /// Records currently registered under their id (last write wins), in input order.
    fn by_id_in_input_order(&self) -> impl Iterator<Item = &Record> + '_ {
        self.items.iter().filter_map(move |idx| {
            let record = self.arena.get(*idx)?;
            (self.by_id.get(&record.id()) == Some(idx)).then_some(record)
        })
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Record> {
        self.by_id.get(&id).and_then(|idx| self.arena.get(*idx))
    }

    /// Validate the key type, then check membership.
    fn resolve<K: NodeKey>(&self, key: &K, known: impl Fn(&NodeId) -> bool) -> IndexResult<NodeId> {
        match key.to_node_ref()? {
            NodeRef::Id(id) if known(&id) => Ok(id),
            other => Err(IndexError::NotFound(other)),
        }
    }
}

/// Borrowed, ordered view over records in a [`TreeIndex`].
#[derive(Clone, Copy)]
pub struct RecordSlice<'a> {
    arena: &'a Arena<Record>,
    indices: &'a [Index],
}

impl<'a> RecordSlice<'a> {
    fn new(arena: &'a Arena<Record>, indices: &'a [Index]) -> Self {
        Self { arena, indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&'a Record> {
        self.indices
            .get(position)
            .and_then(|idx| self.arena.get(*idx))
    }

    pub fn first(&self) -> Option<&'a Record> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&'a Record> {
        self.len().checked_sub(1).and_then(|pos| self.get(pos))
    }

    pub fn iter(&self) -> Records<'a> {
        Records {
            arena: self.arena,
            indices: self.indices.iter(),
        }
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.iter().map(Record::id).collect()
    }

    /// Owned JSON copies of the underlying objects.
    pub fn to_values(&self) -> Vec<Value> {
        self.iter().map(Record::to_value).collect()
    }
}

impl PartialEq for RecordSlice<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl fmt::Debug for RecordSlice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Serialize for RecordSlice<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for record in self.iter() {
            seq.serialize_element(record)?;
        }
        seq.end()
    }
}

impl<'a> IntoIterator for RecordSlice<'a> {
    type Item = &'a Record;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &RecordSlice<'a> {
    type Item = &'a Record;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`RecordSlice`].
pub struct Records<'a> {
    arena: &'a Arena<Record>,
    indices: std::slice::Iter<'a, Index>,
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let arena = self.arena;
        self.indices.find_map(|idx| arena.get(*idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl DoubleEndedIterator for Records<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let arena = self.arena;
        self.indices.by_ref().rev().find_map(|idx| arena.get(*idx))
    }
}

impl ExactSizeIterator for Records<'_> {}

impl FusedIterator for Records<'_> {}
