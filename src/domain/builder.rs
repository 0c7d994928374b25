//! Index construction from a flat list of parent-referencing records.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::domain::error::{IndexError, IndexResult};
use crate::domain::index::TreeIndex;
use crate::domain::record::{NodeId, NodeRef, Record};

/// Order in which records are linked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildOrder {
    /// Single pass; every parent must precede its children.
    #[default]
    InputOrder,
    /// Register everything first, then link; any order, cycles rejected.
    TwoPass,
}

impl fmt::Display for BuildOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOrder::InputOrder => f.write_str("input-order"),
            BuildOrder::TwoPass => f.write_str("two-pass"),
        }
    }
}

/// Handling of a record whose id was already registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The later record replaces the earlier one under that id.
    #[default]
    LastWriteWins,
    Reject,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::LastWriteWins => f.write_str("last-write-wins"),
            DuplicatePolicy::Reject => f.write_str("reject"),
        }
    }
}

/// Constructs a [`TreeIndex`] from records.
///
/// All derived structures are computed here, so queries on the result never
/// walk the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexBuilder {
    order: BuildOrder,
    duplicates: DuplicatePolicy,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: BuildOrder) -> Self {
        self.order = order;
        self
    }

    pub fn duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Validate and index raw JSON records.
    #[instrument(level = "debug", skip(self, items), fields(order = %self.order, duplicates = %self.duplicates))]
    pub fn build<I: IntoIterator<Item = Value>>(&self, items: I) -> IndexResult<TreeIndex> {
        let records = items
            .into_iter()
            .enumerate()
            .map(|(position, value)| Record::from_value(value, position));
        self.link(records)
    }

    /// Index records that were already validated.
    #[instrument(level = "debug", skip(self, records), fields(order = %self.order, duplicates = %self.duplicates))]
    pub fn build_records<I: IntoIterator<Item = Record>>(&self, records: I) -> IndexResult<TreeIndex> {
        self.link(records.into_iter().map(Ok))
    }

    fn link<I>(&self, records: I) -> IndexResult<TreeIndex>
    where
        I: Iterator<Item = IndexResult<Record>>,
    {
        let index = match self.order {
            BuildOrder::InputOrder => self.link_in_input_order(records)?,
            BuildOrder::TwoPass => self.link_in_two_passes(records)?,
        };
        debug!(
            records = index.items.len(),
            nodes = index.by_id.len(),
            max_depth = index.ancestors_of.values().map(Vec::len).max().unwrap_or(0),
            "index built"
        );
        Ok(index)
    }

    /// Process records strictly in input order.
    ///
    /// A parent's children list and ancestor chain exist only once the parent
    /// itself was processed, so a forward reference is a dangling parent.
    fn link_in_input_order<I>(&self, records: I) -> IndexResult<TreeIndex>
    where
        I: Iterator<Item = IndexResult<Record>>,
    {
        let mut index = TreeIndex::with_capacity(records.size_hint().0);

        for record in records {
            let record = record?;
            let id = record.id();
            let parent = record.parent();
            self.check_duplicate(&index, id)?;

            let idx = index.arena.insert(record);
            index.items.push(idx);
            index.by_id.insert(id, idx);
            index.children_of.insert(id, Vec::new());

            let chain = match parent {
                NodeRef::Root => Vec::new(),
                NodeRef::Id(parent_id) => {
                    let dangling = IndexError::DanglingParent {
                        id,
                        parent: parent_id,
                    };
                    index
                        .children_of
                        .get_mut(&parent_id)
                        .ok_or_else(|| dangling.clone())?
                        .push(idx);

                    let parent_idx = *index.by_id.get(&parent_id).ok_or_else(|| dangling.clone())?;
                    let parent_chain = index.ancestors_of.get(&parent_id).ok_or(dangling)?;
                    let mut chain = Vec::with_capacity(parent_chain.len() + 1);
                    chain.push(parent_idx);
                    chain.extend_from_slice(parent_chain);
                    chain
                }
            };
            trace!(%id, %parent, depth = chain.len(), "linked");
            index.ancestors_of.insert(id, chain);
        }

        Ok(index)
    }

    /// Register every record, link children in input order, then resolve
    /// ancestor chains bottom-up with memoisation.
    fn link_in_two_passes<I>(&self, records: I) -> IndexResult<TreeIndex>
    where
        I: Iterator<Item = IndexResult<Record>>,
    {
        let mut index = TreeIndex::with_capacity(records.size_hint().0);

        for record in records {
            let record = record?;
            let id = record.id();
            if index.by_id.contains_key(&id) {
                return Err(IndexError::DuplicateId(id));
            }
            let idx = index.arena.insert(record);
            index.items.push(idx);
            index.by_id.insert(id, idx);
            index.children_of.insert(id, Vec::new());
        }

        for &idx in &index.items {
            let Some(record) = index.arena.get(idx) else {
                continue;
            };
            if let NodeRef::Id(parent_id) = record.parent() {
                index
                    .children_of
                    .get_mut(&parent_id)
                    .ok_or(IndexError::DanglingParent {
                        id: record.id(),
                        parent: parent_id,
                    })?
                    .push(idx);
            }
        }

        let ids: Vec<NodeId> = index
            .items
            .iter()
            .filter_map(|idx| index.arena.get(*idx).map(Record::id))
            .collect();
        for id in ids {
            resolve_ancestors(&mut index, id)?;
        }

        Ok(index)
    }

    fn check_duplicate(&self, index: &TreeIndex, id: NodeId) -> IndexResult<()> {
        if !index.by_id.contains_key(&id) {
            return Ok(());
        }
        match self.duplicates {
            DuplicatePolicy::Reject => Err(IndexError::DuplicateId(id)),
            DuplicatePolicy::LastWriteWins => {
                warn!(%id, "duplicate record id, later record replaces earlier");
                Ok(())
            }
        }
    }
}

/// Climb from `start` to the first node with a known chain, then unwind.
fn resolve_ancestors(index: &mut TreeIndex, start: NodeId) -> IndexResult<()> {
    let mut path = Vec::new();
    let mut on_path = HashSet::new();
    let mut current = start;

    while !index.ancestors_of.contains_key(&current) {
        if !on_path.insert(current) {
            return Err(IndexError::CycleDetected(current));
        }
        path.push(current);
        match parent_of(index, current)? {
            NodeRef::Root => break,
            NodeRef::Id(parent_id) => current = parent_id,
        }
    }

    while let Some(id) = path.pop() {
        let chain = match parent_of(index, id)? {
            NodeRef::Root => Vec::new(),
            NodeRef::Id(parent_id) => {
                let dangling = IndexError::DanglingParent {
                    id,
                    parent: parent_id,
                };
                let parent_idx = *index.by_id.get(&parent_id).ok_or_else(|| dangling.clone())?;
                let parent_chain = index.ancestors_of.get(&parent_id).ok_or(dangling)?;
                std::iter::once(parent_idx)
                    .chain(parent_chain.iter().copied())
                    .collect()
            }
        };
        index.ancestors_of.insert(id, chain);
    }
    Ok(())
}

fn parent_of(index: &TreeIndex, id: NodeId) -> IndexResult<NodeRef> {
    index
        .node(id)
        .map(Record::parent)
        .ok_or(IndexError::NotFound(NodeRef::Id(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing;
    use rstest::rstest;
    use serde_json::json;

    #[ctor::ctor]
    fn init() {
        testing::init_test_setup();
    }

    fn ids(values: &[i64]) -> Vec<NodeId> {
        values.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn given_child_before_parent_when_input_order_then_dangling_parent() {
        let items = vec![
            json!({"id": 2, "parent": 1}),
            json!({"id": 1, "parent": "root"}),
        ];

        let err = IndexBuilder::new().build(items).unwrap_err();

        assert_eq!(
            err,
            IndexError::DanglingParent {
                id: NodeId(2),
                parent: NodeId(1)
            }
        );
    }

    #[test]
    fn given_child_before_parent_when_two_pass_then_links() {
        let items = vec![
            json!({"id": 7, "parent": 4}),
            json!({"id": 4, "parent": 2}),
            json!({"id": 3, "parent": 1}),
            json!({"id": 2, "parent": 1}),
            json!({"id": 1, "parent": "root"}),
        ];

        let index = IndexBuilder::new()
            .order(BuildOrder::TwoPass)
            .build(items)
            .unwrap();

        assert_eq!(index.get_all_parents(7).unwrap().ids(), ids(&[4, 2, 1]));
        assert_eq!(index.get_children(1).unwrap().ids(), ids(&[3, 2]));
        assert_eq!(index.get_all().ids(), ids(&[7, 4, 3, 2, 1]));
    }

    #[test]
    fn given_missing_parent_when_two_pass_then_dangling_parent() {
        let items = vec![
            json!({"id": 1, "parent": "root"}),
            json!({"id": 2, "parent": 3}),
        ];

        let err = IndexBuilder::new()
            .order(BuildOrder::TwoPass)
            .build(items)
            .unwrap_err();

        assert_eq!(err.kind(), "DanglingParentError");
    }

    #[rstest]
    #[case(vec![json!({"id": 1, "parent": 1})])]
    #[case(vec![json!({"id": 1, "parent": 2}), json!({"id": 2, "parent": 1})])]
    #[case(vec![
        json!({"id": 9, "parent": "root"}),
        json!({"id": 1, "parent": 3}),
        json!({"id": 2, "parent": 1}),
        json!({"id": 3, "parent": 2}),
    ])]
    fn given_cycle_when_two_pass_then_cycle_detected(#[case] items: Vec<Value>) {
        let err = IndexBuilder::new()
            .order(BuildOrder::TwoPass)
            .build(items)
            .unwrap_err();

        assert_eq!(err.kind(), "CycleDetectedError");
    }

    #[test]
    fn given_self_parent_when_input_order_then_dangling_parent() {
        let err = IndexBuilder::new()
            .build(vec![json!({"id": 1, "parent": 1})])
            .unwrap_err();

        assert_eq!(err.kind(), "DanglingParentError");
    }

    #[test]
    fn given_duplicate_id_when_last_write_wins_then_later_record_replaces() {
        let items = vec![
            json!({"id": 1, "parent": "root"}),
            json!({"id": 2, "parent": 1, "v": "old"}),
            json!({"id": 3, "parent": 2}),
            json!({"id": 2, "parent": 1, "v": "new"}),
        ];

        let index = IndexBuilder::new().build(items).unwrap();

        assert_eq!(index.get_item(2).unwrap().get("v"), Some(&json!("new")));
        assert!(index.get_children(2).unwrap().is_empty());
        assert_eq!(index.get_children(1).unwrap().ids(), ids(&[2, 2]));
        assert_eq!(index.get_all_parents(3).unwrap().ids(), ids(&[2, 1]));
        assert_eq!(
            index.get_all_parents(3).unwrap().first().unwrap().get("v"),
            Some(&json!("old"))
        );
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn given_duplicate_id_when_reject_then_duplicate_id() {
        let items = vec![
            json!({"id": 1, "parent": "root"}),
            json!({"id": 1, "parent": "root"}),
        ];

        let err = IndexBuilder::new()
            .duplicates(DuplicatePolicy::Reject)
            .build(items)
            .unwrap_err();

        assert_eq!(err, IndexError::DuplicateId(NodeId(1)));
    }

    #[test]
    fn given_duplicate_id_when_two_pass_then_always_rejected() {
        let items = vec![
            json!({"id": 1, "parent": "root"}),
            json!({"id": 1, "parent": "root"}),
        ];

        let err = IndexBuilder::new()
            .order(BuildOrder::TwoPass)
            .duplicates(DuplicatePolicy::LastWriteWins)
            .build(items)
            .unwrap_err();

        assert_eq!(err.kind(), "DuplicateIdError");
    }

    #[test]
    fn given_invalid_record_after_valid_ones_when_building_then_whole_build_fails() {
        let items = vec![
            json!({"id": 1, "parent": "root"}),
            json!({"id": 2, "parent": 1}),
            json!({"parent": 1}),
        ];

        let err = IndexBuilder::new().build(items).unwrap_err();

        assert_eq!(
            err,
            IndexError::MissingField {
                field: "id",
                position: 2
            }
        );
    }

    #[test]
    fn given_validated_records_when_building_then_indexes() {
        let records = vec![
            Record::from_value(json!({"id": 10, "parent": "root"}), 0).unwrap(),
            Record::from_value(json!({"id": 11, "parent": 10}), 1).unwrap(),
        ];

        let index = IndexBuilder::new().build_records(records).unwrap();

        assert_eq!(index.get_children(10).unwrap().ids(), ids(&[11]));
    }

    #[test]
    fn given_empty_input_when_building_then_empty_index() {
        let index = IndexBuilder::new().build(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.get_all().is_empty());
    }

    #[test]
    fn given_policies_when_serializing_then_kebab_case() {
        assert_eq!(serde_json::to_value(BuildOrder::TwoPass).unwrap(), json!("two-pass"));
        assert_eq!(
            serde_json::to_value(DuplicatePolicy::LastWriteWins).unwrap(),
            json!("last-write-wins")
        );
    }
}
