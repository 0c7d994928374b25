//! Record types: identifiers, parent references and the opaque record payload.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::domain::error::{IndexError, IndexResult};

/// Sentinel spelling of the `parent` field for top-level records.
pub const ROOT_SENTINEL: &str = "root";

/// Field holding the record identifier.
pub const ID_FIELD: &str = "id";

/// Field holding the parent reference.
pub const PARENT_FIELD: &str = "parent";

/// Integer identifier of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for NodeId {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(NodeId)
            .map_err(|_| IndexError::invalid_id_type(s))
    }
}

/// Either the root sentinel or a reference to a record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Root,
    Id(NodeId),
}

impl NodeRef {
    /// Parse a JSON value under the record wire contract.
    ///
    /// Only JSON integers that fit `i64` and the string `"root"` are accepted.
    /// Numeric strings, floats and booleans are rejected.
    pub fn from_value(value: &Value) -> IndexResult<Self> {
        match value {
            Value::String(s) if s == ROOT_SENTINEL => Ok(NodeRef::Root),
            Value::Number(n) => n
                .as_i64()
                .map(|id| NodeRef::Id(NodeId(id)))
                .ok_or_else(|| IndexError::invalid_id_type(value)),
            other => Err(IndexError::invalid_id_type(other)),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, NodeRef::Root)
    }

    pub fn id(&self) -> Option<NodeId> {
        match self {
            NodeRef::Root => None,
            NodeRef::Id(id) => Some(*id),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Root => f.write_str(ROOT_SENTINEL),
            NodeRef::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Anything a query can be keyed by.
///
/// Resolution validates the identifier type first: a value that is neither
/// an integer nor the root sentinel yields `InvalidIdType`.
pub trait NodeKey {
    fn to_node_ref(&self) -> IndexResult<NodeRef>;
}

impl NodeKey for NodeId {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        Ok(NodeRef::Id(*self))
    }
}

impl NodeKey for NodeRef {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        Ok(*self)
    }
}

impl NodeKey for i64 {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        Ok(NodeRef::Id(NodeId(*self)))
    }
}

impl NodeKey for i32 {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        Ok(NodeRef::Id(NodeId(i64::from(*self))))
    }
}

impl NodeKey for u32 {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        Ok(NodeRef::Id(NodeId(i64::from(*self))))
    }
}

impl NodeKey for u64 {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        i64::try_from(*self)
            .map(|id| NodeRef::Id(NodeId(id)))
            .map_err(|_| IndexError::invalid_id_type(self))
    }
}

impl NodeKey for str {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        if self.trim() == ROOT_SENTINEL {
            return Ok(NodeRef::Root);
        }
        self.parse::<NodeId>().map(NodeRef::Id)
    }
}

impl NodeKey for String {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        self.as_str().to_node_ref()
    }
}

impl NodeKey for Value {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        NodeRef::from_value(self)
    }
}

impl<T: NodeKey + ?Sized> NodeKey for &T {
    fn to_node_ref(&self) -> IndexResult<NodeRef> {
        (**self).to_node_ref()
    }
}

/// A validated input record.
///
/// Keeps the complete source object verbatim; `id` and `parent` are parsed
/// once at validation time so lookups never re-read the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: NodeId,
    parent: NodeRef,
    fields: Map<String, Value>,
}

impl Record {
    /// Validate a raw JSON value at input `position`.
    ///
    /// Checks run in order: object shape, `id` present, `parent` present,
    /// `id` type, `parent` type.
    pub fn from_value(value: Value, position: usize) -> IndexResult<Self> {
        let Value::Object(fields) = value else {
            return Err(IndexError::NotAnObject { position });
        };

        let raw_id = fields.get(ID_FIELD).ok_or(IndexError::MissingField {
            field: ID_FIELD,
            position,
        })?;
        let raw_parent = fields.get(PARENT_FIELD).ok_or(IndexError::MissingField {
            field: PARENT_FIELD,
            position,
        })?;

        let id = match NodeRef::from_value(raw_id)? {
            NodeRef::Id(id) => id,
            NodeRef::Root => return Err(IndexError::invalid_id_type(raw_id)),
        };
        let parent = NodeRef::from_value(raw_parent)?;

        Ok(Self { id, parent, fields })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> NodeRef {
        self.parent
    }

    pub fn is_root_child(&self) -> bool {
        self.parent.is_root()
    }

    /// Opaque payload lookup, including `id` and `parent`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.fields) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{{\"id\": {}, \"parent\": {}}}", self.id, self.parent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn given_valid_object_when_parsing_then_keeps_payload() {
        let record = Record::from_value(json!({"id": 2, "parent": 1, "type": "test"}), 0).unwrap();

        assert_eq!(record.id(), NodeId(2));
        assert_eq!(record.parent(), NodeRef::Id(NodeId(1)));
        assert_eq!(record.get("type"), Some(&json!("test")));
        assert_eq!(
            record.to_value(),
            json!({"id": 2, "parent": 1, "type": "test"})
        );
    }

    #[test]
    fn given_missing_id_when_parsing_then_missing_field() {
        let err = Record::from_value(json!({"it": 1, "parent": "root"}), 3).unwrap_err();
        assert!(matches!(
            err,
            IndexError::MissingField { field: "id", position: 3 }
        ));
    }

    #[test]
    fn given_missing_id_and_bad_parent_when_parsing_then_presence_checked_first() {
        let err = Record::from_value(json!({"parent": 1.5}), 0).unwrap_err();
        assert_eq!(err.kind(), "MissingFieldError");
    }

    #[rstest]
    #[case(json!({"id": "1", "parent": "root"}))]
    #[case(json!({"id": 1.5, "parent": "root"}))]
    #[case(json!({"id": true, "parent": "root"}))]
    #[case(json!({"id": "root", "parent": "root"}))]
    #[case(json!({"id": 1, "parent": "1"}))]
    #[case(json!({"id": 1, "parent": null}))]
    #[case(json!({"id": 1, "parent": [1]}))]
    fn given_non_integer_ids_when_parsing_then_invalid_id_type(#[case] value: Value) {
        let err = Record::from_value(value, 0).unwrap_err();
        assert_eq!(err.kind(), "InvalidIdTypeError");
    }

    #[test]
    fn given_array_when_parsing_then_not_an_object() {
        let err = Record::from_value(json!([1, "root"]), 4).unwrap_err();
        assert!(matches!(err, IndexError::NotAnObject { position: 4 }));
    }

    #[rstest]
    #[case("7", NodeRef::Id(NodeId(7)))]
    #[case(" -3 ", NodeRef::Id(NodeId(-3)))]
    #[case("root", NodeRef::Root)]
    fn given_string_keys_when_resolving_then_parses(#[case] key: &str, #[case] expected: NodeRef) {
        assert_eq!(key.to_node_ref().unwrap(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("1.0")]
    #[case("")]
    fn given_bad_string_keys_when_resolving_then_invalid_id_type(#[case] key: &str) {
        assert_eq!(key.to_node_ref().unwrap_err().kind(), "InvalidIdTypeError");
    }

    #[test]
    fn given_u64_beyond_i64_when_resolving_then_invalid_id_type() {
        assert!(u64::MAX.to_node_ref().is_err());
        assert_eq!(42u64.to_node_ref().unwrap(), NodeRef::Id(NodeId(42)));
    }

    #[test]
    fn given_record_when_serializing_then_reproduces_input() {
        let input = json!({"id": 7, "parent": 4, "type": null});
        let record = Record::from_value(input.clone(), 0).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), input);
    }
}
