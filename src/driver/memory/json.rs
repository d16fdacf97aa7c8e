//! Reference JSON document: an owned tree rebuilt into the caller's arena

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use parking_lot::Mutex;

use crate::constants::{NativeType, OracleType};
use crate::driver::{DriverResult, JsonBackend};
use crate::types::{IntervalDS, IntervalYM, JsonArray, JsonNode, JsonNodeValue, JsonObject, Timestamp};

#[derive(Debug, Clone, PartialEq)]
enum Tree {
    Null,
    Boolean(bool),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Bytes(OracleType, Vec<u8>),
    Timestamp(Timestamp),
    IntervalDs(IntervalDS),
    IntervalYm(IntervalYM),
    Object(Vec<(String, Tree)>),
    Array(Vec<Tree>),
}

impl Tree {
    fn from_node(node: &JsonNode<'_>) -> Self {
        match node.value {
            JsonNodeValue::Null => Tree::Null,
            JsonNodeValue::Boolean(b) => Tree::Boolean(b),
            JsonNodeValue::Int64(v) => Tree::Int64(v),
            JsonNodeValue::UInt64(v) => Tree::UInt64(v),
            JsonNodeValue::Float(v) => Tree::Float(v),
            JsonNodeValue::Double(v) => Tree::Double(v),
            JsonNodeValue::Bytes(b) => Tree::Bytes(node.oracle_type, b.to_vec()),
            JsonNodeValue::Timestamp(ts) => Tree::Timestamp(ts),
            JsonNodeValue::IntervalDs(iv) => Tree::IntervalDs(iv),
            JsonNodeValue::IntervalYm(iv) => Tree::IntervalYm(iv),
            JsonNodeValue::Object(obj) => Tree::Object(
                obj.field_names
                    .iter()
                    .zip(obj.fields)
                    .map(|(name, field)| ((*name).to_string(), Tree::from_node(field)))
                    .collect(),
            ),
            JsonNodeValue::Array(arr) => Tree::Array(arr.elements.iter().map(Tree::from_node).collect()),
        }
    }

    fn to_node<'a>(&self, number_as_string: bool, arena: &'a Bump) -> JsonNode<'a> {
        match self {
            Tree::Null => JsonNode::null(),
            Tree::Boolean(b) => JsonNode::new(OracleType::Boolean, NativeType::Boolean, JsonNodeValue::Boolean(*b)),
            Tree::Int64(v) if number_as_string => number_text(&v.to_string(), arena),
            Tree::UInt64(v) if number_as_string => number_text(&v.to_string(), arena),
            Tree::Int64(v) => JsonNode::new(OracleType::Number, NativeType::Int64, JsonNodeValue::Int64(*v)),
            Tree::UInt64(v) => JsonNode::new(OracleType::Number, NativeType::UInt64, JsonNodeValue::UInt64(*v)),
            Tree::Float(v) => JsonNode::new(OracleType::BinaryFloat, NativeType::Float, JsonNodeValue::Float(*v)),
            Tree::Double(v) => JsonNode::new(OracleType::Number, NativeType::Double, JsonNodeValue::Double(*v)),
            Tree::Bytes(oracle_type, b) => JsonNode::new(
                *oracle_type,
                NativeType::Bytes,
                JsonNodeValue::Bytes(arena.alloc_slice_copy(b)),
            ),
            Tree::Timestamp(ts) => {
                JsonNode::new(OracleType::Timestamp, NativeType::Timestamp, JsonNodeValue::Timestamp(*ts))
            }
            Tree::IntervalDs(iv) => {
                JsonNode::new(OracleType::IntervalDs, NativeType::IntervalDs, JsonNodeValue::IntervalDs(*iv))
            }
            Tree::IntervalYm(iv) => {
                JsonNode::new(OracleType::IntervalYm, NativeType::IntervalYm, JsonNodeValue::IntervalYm(*iv))
            }
            Tree::Object(fields) => {
                let mut names = BumpVec::with_capacity_in(fields.len(), arena);
                let mut nodes = BumpVec::with_capacity_in(fields.len(), arena);
                for (name, field) in fields {
                    let name: &'a str = arena.alloc_str(name);
                    names.push(name);
                    nodes.push(field.to_node(number_as_string, arena));
                }
                JsonNode::new(
                    OracleType::JsonObject,
                    NativeType::JsonObject,
                    JsonNodeValue::Object(JsonObject {
                        field_names: names.into_bump_slice(),
                        fields: nodes.into_bump_slice(),
                    }),
                )
            }
            Tree::Array(items) => {
                let mut elements = BumpVec::with_capacity_in(items.len(), arena);
                for item in items {
                    elements.push(item.to_node(number_as_string, arena));
                }
                JsonNode::new(
                    OracleType::JsonArray,
                    NativeType::JsonArray,
                    JsonNodeValue::Array(JsonArray {
                        elements: elements.into_bump_slice(),
                    }),
                )
            }
        }
    }
}

fn number_text<'a>(text: &str, arena: &'a Bump) -> JsonNode<'a> {
    JsonNode::new(
        OracleType::Number,
        NativeType::Bytes,
        JsonNodeValue::Bytes(arena.alloc_slice_copy(text.as_bytes())),
    )
}

/// Reference JSON document, initially JSON null
#[derive(Debug)]
pub struct MemoryJson {
    tree: Mutex<Tree>,
}

impl MemoryJson {
    /// Empty document
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(Tree::Null),
        }
    }
}

impl Default for MemoryJson {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonBackend for MemoryJson {
    fn value<'a>(&self, number_as_string: bool, arena: &'a Bump) -> DriverResult<JsonNode<'a>> {
        Ok(self.tree.lock().to_node(number_as_string, arena))
    }

    fn set_value(&self, node: &JsonNode<'_>) -> DriverResult<()> {
        *self.tree.lock() = Tree::from_node(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_as_text() {
        let json = MemoryJson::new();
        json.set_value(&JsonNode::new(OracleType::Number, NativeType::Int64, JsonNodeValue::Int64(42)))
            .unwrap();
        let arena = Bump::new();
        let node = json.value(true, &arena).unwrap();
        assert_eq!(node.native_type, NativeType::Bytes);
        assert_eq!(node.value, JsonNodeValue::Bytes(&b"42"[..]));
        let node = json.value(false, &arena).unwrap();
        assert_eq!(node.value, JsonNodeValue::Int64(42));
    }

    #[test]
    fn test_tree_outlives_source_arena() {
        let json = MemoryJson::new();
        {
            let arena = Bump::new();
            let names: &[&str] = arena.alloc_slice_copy(&["a"]);
            let fields = arena.alloc_slice_copy(&[JsonNode::new(
                OracleType::Varchar,
                NativeType::Bytes,
                JsonNodeValue::Bytes(arena.alloc_slice_copy(b"x")),
            )]);
            let node = JsonNode::new(
                OracleType::JsonObject,
                NativeType::JsonObject,
                JsonNodeValue::Object(JsonObject {
                    field_names: names,
                    fields,
                }),
            );
            json.set_value(&node).unwrap();
        }
        let arena = Bump::new();
        match json.value(false, &arena).unwrap().value {
            JsonNodeValue::Object(obj) => {
                assert_eq!(obj.field_names, &["a"]);
                assert_eq!(obj.fields[0].value, JsonNodeValue::Bytes(&b"x"[..]));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }
}
