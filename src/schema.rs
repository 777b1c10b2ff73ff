//! Schema AST.
//!
//! Nodes live in an arena (`SchemaGraph`) and reference each other through
//! `SchemaId` handles, so self- and mutually-referential schemas are plain
//! data: a `$ref` back to the root is just the root's id stored in a child.
//! Identity is the handle, never structural equality.
use std::ops::{BitOr, BitOrAssign, Index};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// ------------------------------- Handles ---------------------------------- //

/// Handle to a node inside a [`SchemaGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u32);

impl SchemaId {
    pub fn index(self) -> usize { self.0 as usize }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ------------------------------- Type set --------------------------------- //

/// Bitset over the seven JSON Schema primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SchemaType(u8);

impl SchemaType {
    pub const NONE: SchemaType = SchemaType(0);
    pub const STRING: SchemaType = SchemaType(1);
    pub const NUMBER: SchemaType = SchemaType(1 << 1);
    pub const INTEGER: SchemaType = SchemaType(1 << 2);
    pub const BOOLEAN: SchemaType = SchemaType(1 << 3);
    pub const OBJECT: SchemaType = SchemaType(1 << 4);
    pub const ARRAY: SchemaType = SchemaType(1 << 5);
    pub const NULL: SchemaType = SchemaType(1 << 6);
    /// draft-3 `"any"`
    pub const ANY: SchemaType = SchemaType(0b111_1111);

    pub fn contains(self, other: SchemaType) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn intersects(self, other: SchemaType) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool { self.0 == 0 }

    /// Parses a single `type` keyword entry.
    pub fn from_name(name: &str) -> Option<SchemaType> {
        match name {
            "string" => Some(Self::STRING),
            "number" => Some(Self::NUMBER),
            "integer" => Some(Self::INTEGER),
            "boolean" => Some(Self::BOOLEAN),
            "object" => Some(Self::OBJECT),
            "array" => Some(Self::ARRAY),
            "null" => Some(Self::NULL),
            "any" => Some(Self::ANY),
            "none" => Some(Self::NONE),
            _ => None,
        }
    }

    /// The bit that describes a value's kind. Numbers only ever map to
    /// `NUMBER` here; whether a number also counts as `integer` depends on the
    /// draft and is decided by the compiler.
    pub fn of_value(value: &Value) -> SchemaType {
        match value {
            Value::Null => Self::NULL,
            Value::Bool(_) => Self::BOOLEAN,
            Value::Number(_) => Self::NUMBER,
            Value::String(_) => Self::STRING,
            Value::Array(_) => Self::ARRAY,
            Value::Object(_) => Self::OBJECT,
        }
    }
}

impl BitOr for SchemaType {
    type Output = SchemaType;
    fn bitor(self, rhs: SchemaType) -> SchemaType { SchemaType(self.0 | rhs.0) }
}

impl BitOrAssign for SchemaType {
    fn bitor_assign(&mut self, rhs: SchemaType) { self.0 |= rhs.0; }
}

// ------------------------------- Drafts ----------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Draft {
    Draft3,
    Draft4,
    Draft6,
    Draft7,
}

static DRAFT_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://json-schema\.org/draft-0?(\d+)/schema/?#?$").expect("static regex")
});

impl Draft {
    /// Recognises the canonical `$schema` URIs; anything else is `None`.
    pub fn from_uri(uri: &str) -> Option<Draft> {
        let caps = DRAFT_URI.captures(uri.trim())?;
        match &caps[1] {
            "3" => Some(Draft::Draft3),
            "4" => Some(Draft::Draft4),
            "6" => Some(Draft::Draft6),
            "7" => Some(Draft::Draft7),
            _ => None,
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Draft::Draft3 => "http://json-schema.org/draft-03/schema#",
            Draft::Draft4 => "http://json-schema.org/draft-04/schema#",
            Draft::Draft6 => "http://json-schema.org/draft-06/schema#",
            Draft::Draft7 => "http://json-schema.org/draft-07/schema#",
        }
    }

    /// drafts 3 and 4 treat `1.0` as a number but not an integer.
    pub fn strict_integers(self) -> bool {
        matches!(self, Draft::Draft3 | Draft::Draft4)
    }
}

// ------------------------------- Keywords --------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    /// one schema applied to every element
    Single(SchemaId),
    /// schemas applied positionally
    Tuple(Vec<SchemaId>),
}

/// `additionalItems` / `additionalProperties`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Additional {
    #[default]
    Allowed,
    Forbidden,
    Schema(SchemaId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dependency {
    Properties(Vec<String>),
    Schema(SchemaId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Base64,
}

impl ContentEncoding {
    pub fn from_name(name: &str) -> Option<ContentEncoding> {
        match name {
            "base64" => Some(ContentEncoding::Base64),
            _ => None,
        }
    }
}

// -------------------------------- Node ------------------------------------ //

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaNode {
    /// boolean-schema form; nothing else is consulted when set
    pub valid: Option<bool>,

    pub all_of: Option<Vec<SchemaId>>,
    pub any_of: Option<Vec<SchemaId>>,
    pub one_of: Option<Vec<SchemaId>>,
    pub not: Option<SchemaId>,
    pub if_: Option<SchemaId>,
    pub then: Option<SchemaId>,
    pub else_: Option<SchemaId>,

    pub const_value: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    pub type_: Option<SchemaType>,

    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<f64>,

    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub content_encoding: Option<ContentEncoding>,
    pub content_media_type: Option<String>,

    pub items: Option<Items>,
    pub additional_items: Additional,
    pub contains: Option<SchemaId>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,

    pub properties: IndexMap<String, SchemaId>,
    pub pattern_properties: IndexMap<String, SchemaId>,
    pub additional_properties: Additional,
    pub property_names: Option<SchemaId>,
    pub required: IndexSet<String>,
    pub dependencies: IndexMap<String, Dependency>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,

    // metadata, carried but never validated
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub default: Option<Value>,
    pub read_only: Option<bool>,
    pub write_only: Option<bool>,
    pub extensions: IndexMap<String, Value>,

    pub schema_version: Option<String>,
    pub id: Option<String>,
}

impl SchemaNode {
    pub fn boolean(valid: bool) -> Self {
        SchemaNode { valid: Some(valid), ..SchemaNode::default() }
    }

    pub fn draft(&self) -> Option<Draft> {
        self.schema_version.as_deref().and_then(Draft::from_uri)
    }

    /// Every node this one links to directly, in keyword order.
    pub fn children(&self) -> Vec<SchemaId> {
        let mut out = Vec::new();
        for list in [&self.all_of, &self.any_of, &self.one_of].into_iter().flatten() {
            out.extend(list.iter().copied());
        }
        out.extend([self.not, self.if_, self.then, self.else_, self.contains, self.property_names].into_iter().flatten());
        match &self.items {
            Some(Items::Single(id)) => out.push(*id),
            Some(Items::Tuple(ids)) => out.extend(ids.iter().copied()),
            None => {}
        }
        for additional in [self.additional_items, self.additional_properties] {
            if let Additional::Schema(id) = additional { out.push(id); }
        }
        out.extend(self.properties.values().copied());
        out.extend(self.pattern_properties.values().copied());
        for dep in self.dependencies.values() {
            if let Dependency::Schema(id) = dep { out.push(*id); }
        }
        out
    }
}

// -------------------------------- Graph ----------------------------------- //

/// Arena of schema nodes.
///
/// Built by the reader (or by hand), then frozen behind an `Arc` and handed
/// to the compiler. `reserve` + `set` lets a node be referenced before its
/// body exists, which is how cycles are wired.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
}

impl SchemaGraph {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, node: SchemaNode) -> SchemaId {
        let id = SchemaId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Allocates an empty (always-valid) node to be filled in later.
    pub fn reserve(&mut self) -> SchemaId {
        self.add(SchemaNode::default())
    }

    pub fn set(&mut self, id: SchemaId, node: SchemaNode) {
        self.nodes[id.index()] = node;
    }

    pub fn get(&self, id: SchemaId) -> Option<&SchemaNode> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: SchemaId) -> Option<&mut SchemaNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn ids(&self) -> impl Iterator<Item = SchemaId> + '_ {
        (0..self.nodes.len()).map(|i| SchemaId(i as u32))
    }
}

impl Index<SchemaId> for SchemaGraph {
    type Output = SchemaNode;
    fn index(&self, id: SchemaId) -> &SchemaNode { &self.nodes[id.index()] }
}

/// A finished graph together with the node validation starts from.
#[derive(Debug, Clone)]
pub struct Schema {
    pub graph: Arc<SchemaGraph>,
    pub root: SchemaId,
}

impl Schema {
    pub fn new(graph: SchemaGraph, root: SchemaId) -> Self {
        Schema { graph: Arc::new(graph), root }
    }

    pub fn root_node(&self) -> &SchemaNode { &self.graph[self.root] }
}

// ------------------------------- Tests ------------------------------------ //
