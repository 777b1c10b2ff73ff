//! Schema documents → [`SchemaGraph`].
//!
//! Every schema location (document + JSON Pointer) maps to exactly one
//! [`SchemaId`]. A location is registered before its children are read, so a
//! `$ref` that leads back to an ancestor just picks up the ancestor's id and
//! the cycle ends up as plain data in the graph.
//!
//! `$ref` replaces the node it appears in; sibling keywords are ignored.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::ReaderOptions;
use crate::error::ReadError;
use crate::resolver::{normalize_uri, Resolver};
use crate::schema::{
    Additional, ContentEncoding, Dependency, Draft, Items, Schema, SchemaGraph, SchemaId, SchemaNode,
    SchemaType,
};

type Result<T> = std::result::Result<T, ReadError>;

/// Reads schema documents into linked graphs. Cheap to clone and reuse.
#[derive(Clone, Default)]
pub struct SchemaReader {
    options: ReaderOptions,
    resolver: Option<Arc<dyn Resolver>>,
}

impl SchemaReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options, resolver: None }
    }

    /// Source for `$ref`s that leave the document being read.
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn read(&self, document: &Value) -> Result<Schema> {
        let mut linker = Linker {
            resolver: self.resolver.as_deref(),
            documents: Vec::new(),
            by_uri: HashMap::new(),
            graph: SchemaGraph::new(),
            located: HashMap::new(),
            following: HashSet::new(),
        };
        let doc = linker.add_document(None, document.clone());
        let version = linker.documents[doc].version.clone().or_else(|| self.options.default_schema_version.clone());
        if let Some(uri) = &version {
            if Draft::from_uri(uri).is_none() {
                warn!(schema = %uri, "unrecognised $schema, reading with draft-7 rules");
            }
        }
        let root = linker.node(Location { doc, pointer: String::new() }, version)?;
        debug!(
            nodes = linker.graph.len(),
            documents = linker.documents.len(),
            "read schema document"
        );
        Ok(Schema::new(linker.graph, root))
    }
}

impl std::fmt::Debug for SchemaReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaReader")
            .field("options", &self.options)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Reads with default options and no resolver.
pub fn read(document: &Value) -> Result<Schema> {
    SchemaReader::default().read(document)
}

// ------------------------------- Linking ---------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Location {
    doc: usize,
    /// escaped JSON Pointer, `""` for the document root
    pointer: String,
}

struct Document {
    base: Option<Url>,
    /// root `$schema`
    version: Option<String>,
    root: Arc<Value>,
}

struct Linker<'r> {
    resolver: Option<&'r dyn Resolver>,
    documents: Vec<Document>,
    by_uri: HashMap<String, usize>,
    graph: SchemaGraph,
    located: HashMap<Location, SchemaId>,
    /// `$ref` nodes currently being followed
    following: HashSet<Location>,
}

impl Linker<'_> {
    /// Registers a document under its retrieval URI and its root `$id`.
    fn add_document(&mut self, retrieved_from: Option<&str>, root: Value) -> usize {
        let retrieval = retrieved_from.and_then(|uri| Url::parse(uri).ok());
        let declared = root_id(&root);
        let base = match (declared, &retrieval) {
            (Some(id), Some(from)) => from.join(id).ok().or_else(|| retrieval.clone()),
            (Some(id), None) => {
                let parsed = Url::parse(id).ok();
                if parsed.is_none() {
                    warn!(id, "root id is not an absolute URI, relative references stay local");
                }
                parsed
            }
            (None, _) => retrieval.clone(),
        };
        let version = root.get("$schema").and_then(Value::as_str).map(str::to_string);

        let index = self.documents.len();
        for uri in [retrieved_from.map(normalize_uri), base.as_ref().map(|b| normalize_uri(b.as_str()))]
            .into_iter()
            .flatten()
        {
            self.by_uri.entry(uri).or_insert(index);
        }
        self.documents.push(Document { base, version, root: Arc::new(root) });
        index
    }

    /// Id for the schema at `at`, reading it on first visit.
    fn node(&mut self, at: Location, inherited: Option<String>) -> Result<SchemaId> {
        if let Some(id) = self.located.get(&at) {
            return Ok(*id);
        }
        let root = Arc::clone(&self.documents[at.doc].root);
        let value = root
            .pointer(&at.pointer)
            .ok_or_else(|| ReadError::InvalidPointer(at.pointer.clone()))?;

        let map = match value {
            Value::Bool(valid) => {
                let id = self.graph.add(SchemaNode::boolean(*valid));
                self.located.insert(at, id);
                return Ok(id);
            }
            Value::Object(map) => map,
            other => {
                return Err(ReadError::NotASchema { pointer: at.pointer, found: kind_name(other) });
            }
        };

        if let Some(reference) = map.get("$ref") {
            let Value::String(reference) = reference else {
                return Err(invalid("$ref", &at.pointer, "a string"));
            };
            return self.follow(at, reference, inherited);
        }

        let id = self.graph.reserve();
        self.located.insert(at.clone(), id);
        let node = self.parse(&at, map, inherited)?;
        self.graph.set(id, node);
        Ok(id)
    }

    fn follow(&mut self, at: Location, reference: &str, inherited: Option<String>) -> Result<SchemaId> {
        let target = self.locate(at.doc, reference, &at.pointer)?;
        if let Some(&id) = self.located.get(&target) {
            self.located.insert(at, id);
            return Ok(id);
        }
        // nothing on a pure `$ref` chain is ever located, so meeting the
        // same reference twice means the chain never reaches a schema
        if !self.following.insert(at.clone()) {
            return Err(ReadError::CircularReference { reference: reference.to_string(), pointer: at.pointer });
        }
        let version = if target.doc == at.doc {
            inherited
        } else {
            self.documents[target.doc].version.clone().or(inherited)
        };
        let id = self.node(target, version)?;
        self.following.remove(&at);
        self.located.insert(at, id);
        Ok(id)
    }

    /// Turns a `$ref` value into the location it names.
    fn locate(&mut self, from: usize, reference: &str, pointer: &str) -> Result<Location> {
        let unresolved = || ReadError::UnresolvedReference {
            reference: reference.to_string(),
            pointer: pointer.to_string(),
        };
        let (target, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let doc = if target.is_empty() { from } else { self.document(from, target).ok_or_else(unresolved)? };

        let fragment = percent_decode_str(fragment).decode_utf8_lossy().into_owned();
        if !fragment.is_empty() && !fragment.starts_with('/') {
            // plain-name fragments (`#foo`) are not supported
            return Err(ReadError::InvalidPointer(fragment));
        }
        if self.documents[doc].root.pointer(&fragment).is_none() {
            return Err(unresolved());
        }
        Ok(Location { doc, pointer: fragment })
    }

    /// Index of the document `target` names relative to document `from`,
    /// asking the resolver for documents not seen yet.
    fn document(&mut self, from: usize, target: &str) -> Option<usize> {
        let absolute = match &self.documents[from].base {
            Some(base) => base.join(target).map(|u| normalize_uri(u.as_str())).unwrap_or_else(|_| target.to_string()),
            None => normalize_uri(target),
        };
        if let Some(&index) = self.by_uri.get(&absolute) {
            return Some(index);
        }
        let document = self.resolver?.resolve(&absolute)?;
        debug!(uri = %absolute, "loaded referenced document");
        Some(self.add_document(Some(&absolute), document))
    }

    fn child(&mut self, at: &Location, path: &[&str], version: &Option<String>) -> Result<SchemaId> {
        let mut pointer = at.pointer.clone();
        for segment in path {
            push_segment(&mut pointer, segment);
        }
        self.node(Location { doc: at.doc, pointer }, version.clone())
    }

    fn child_list(
        &mut self,
        keyword: &'static str,
        at: &Location,
        value: &Value,
        version: &Option<String>,
    ) -> Result<Vec<SchemaId>> {
        let Value::Array(items) = value else {
            return Err(invalid(keyword, &at.pointer, "an array of schemas"));
        };
        (0..items.len()).map(|i| self.child(at, &[keyword, &i.to_string()], version)).collect()
    }

    fn child_map(
        &mut self,
        keyword: &'static str,
        at: &Location,
        value: &Value,
        version: &Option<String>,
    ) -> Result<indexmap::IndexMap<String, SchemaId>> {
        let Value::Object(map) = value else {
            return Err(invalid(keyword, &at.pointer, "an object of schemas"));
        };
        map.keys()
            .map(|name| -> Result<(String, SchemaId)> { Ok((name.clone(), self.child(at, &[keyword, name], version)?)) })
            .collect()
    }

    fn additional(
        &mut self,
        keyword: &'static str,
        at: &Location,
        value: &Value,
        version: &Option<String>,
    ) -> Result<Additional> {
        match value {
            Value::Bool(true) => Ok(Additional::Allowed),
            Value::Bool(false) => Ok(Additional::Forbidden),
            Value::Object(_) => Ok(Additional::Schema(self.child(at, &[keyword], version)?)),
            _ => Err(invalid(keyword, &at.pointer, "a boolean or a schema")),
        }
    }

    fn parse(&mut self, at: &Location, map: &Map<String, Value>, inherited: Option<String>) -> Result<SchemaNode> {
        let ptr = at.pointer.as_str();
        let version = match map.get("$schema") {
            Some(Value::String(uri)) => Some(uri.clone()),
            Some(_) => return Err(invalid("$schema", ptr, "a URI string")),
            None => inherited,
        };
        let draft = version.as_deref().and_then(Draft::from_uri);
        let legacy_ids = matches!(draft, None | Some(Draft::Draft3 | Draft::Draft4));

        let mut node = SchemaNode { schema_version: version.clone(), ..SchemaNode::default() };
        let mut exclusive_min = None;
        let mut exclusive_max = None;

        for (key, value) in map {
            match key.as_str() {
                "$schema" => {}
                "$id" => node.id = Some(string("$id", value, ptr)?),
                "id" if legacy_ids && value.is_string() => node.id = Some(string("id", value, ptr)?),

                "title" => node.title = Some(string("title", value, ptr)?),
                "description" => node.description = Some(string("description", value, ptr)?),
                "format" => node.format = Some(string("format", value, ptr)?),
                "default" => node.default = Some(value.clone()),
                "readOnly" => node.read_only = Some(boolean("readOnly", value, ptr)?),
                "writeOnly" => node.write_only = Some(boolean("writeOnly", value, ptr)?),

                "allOf" => node.all_of = Some(self.child_list("allOf", at, value, &version)?),
                "anyOf" => node.any_of = Some(self.child_list("anyOf", at, value, &version)?),
                "oneOf" => node.one_of = Some(self.child_list("oneOf", at, value, &version)?),
                "extends" => {
                    let parents = match value {
                        Value::Array(_) => self.child_list("extends", at, value, &version)?,
                        _ => vec![self.child(at, &["extends"], &version)?],
                    };
                    node.all_of.get_or_insert_with(Vec::new).extend(parents);
                }
                "not" => node.not = Some(self.child(at, &["not"], &version)?),
                "if" => node.if_ = Some(self.child(at, &["if"], &version)?),
                "then" => node.then = Some(self.child(at, &["then"], &version)?),
                "else" => node.else_ = Some(self.child(at, &["else"], &version)?),

                "const" => node.const_value = Some(value.clone()),
                "enum" => match value {
                    Value::Array(members) => node.enum_values = Some(members.clone()),
                    _ => return Err(invalid("enum", ptr, "an array")),
                },
                "type" => node.type_ = Some(type_set(value, ptr)?),
                "disallow" => return Err(ReadError::UnsupportedKeyword { keyword: "disallow", pointer: ptr.to_string() }),

                "minimum" => node.minimum = Some(number("minimum", value, ptr)?),
                "maximum" => node.maximum = Some(number("maximum", value, ptr)?),
                "exclusiveMinimum" => match value {
                    Value::Bool(b) => node.exclusive_minimum = *b,
                    _ => exclusive_min = Some(number("exclusiveMinimum", value, ptr)?),
                },
                "exclusiveMaximum" => match value {
                    Value::Bool(b) => node.exclusive_maximum = *b,
                    _ => exclusive_max = Some(number("exclusiveMaximum", value, ptr)?),
                },
                "multipleOf" => node.multiple_of = Some(divisor("multipleOf", value, ptr)?),
                "divisibleBy" => node.multiple_of = Some(divisor("divisibleBy", value, ptr)?),

                "minLength" => node.min_length = Some(count("minLength", value, ptr)?),
                "maxLength" => node.max_length = Some(count("maxLength", value, ptr)?),
                "pattern" => node.pattern = Some(string("pattern", value, ptr)?),
                "contentEncoding" => {
                    let name = string("contentEncoding", value, ptr)?;
                    node.content_encoding = Some(ContentEncoding::from_name(&name).ok_or_else(|| {
                        ReadError::UnknownContentEncoding { encoding: name.clone(), pointer: ptr.to_string() }
                    })?);
                }
                "contentMediaType" => node.content_media_type = Some(string("contentMediaType", value, ptr)?),

                "items" => {
                    node.items = Some(match value {
                        Value::Array(_) => Items::Tuple(self.child_list("items", at, value, &version)?),
                        _ => Items::Single(self.child(at, &["items"], &version)?),
                    })
                }
                "additionalItems" => node.additional_items = self.additional("additionalItems", at, value, &version)?,
                "contains" => node.contains = Some(self.child(at, &["contains"], &version)?),
                "minItems" => node.min_items = Some(count("minItems", value, ptr)?),
                "maxItems" => node.max_items = Some(count("maxItems", value, ptr)?),
                "uniqueItems" => node.unique_items = boolean("uniqueItems", value, ptr)?,

                "properties" => {
                    node.properties = self.child_map("properties", at, value, &version)?;
                    // draft-3 marks required-ness on the property itself
                    if draft == Some(Draft::Draft3) {
                        for (name, sub) in value.as_object().into_iter().flatten() {
                            if sub.get("required") == Some(&Value::Bool(true)) {
                                node.required.insert(name.clone());
                            }
                        }
                    }
                }
                "patternProperties" => {
                    node.pattern_properties = self.child_map("patternProperties", at, value, &version)?
                }
                "additionalProperties" => {
                    node.additional_properties = self.additional("additionalProperties", at, value, &version)?
                }
                "propertyNames" => node.property_names = Some(self.child(at, &["propertyNames"], &version)?),
                "required" => match value {
                    Value::Array(names) => {
                        for name in names {
                            let Value::String(name) = name else {
                                return Err(invalid("required", ptr, "an array of strings"));
                            };
                            node.required.insert(name.clone());
                        }
                    }
                    Value::Bool(_) if draft == Some(Draft::Draft3) => {} // handled by the parent
                    _ => return Err(invalid("required", ptr, "an array of strings")),
                },
                "dependencies" => {
                    let Value::Object(deps) = value else {
                        return Err(invalid("dependencies", ptr, "an object"));
                    };
                    for (trigger, dep) in deps {
                        let dep = match dep {
                            Value::String(name) => Dependency::Properties(vec![name.clone()]),
                            Value::Array(names) => Dependency::Properties(
                                names
                                    .iter()
                                    .map(|n| n.as_str().map(str::to_string))
                                    .collect::<Option<Vec<_>>>()
                                    .ok_or_else(|| invalid("dependencies", ptr, "arrays of property names"))?,
                            ),
                            Value::Object(_) | Value::Bool(_) => {
                                Dependency::Schema(self.child(at, &["dependencies", trigger], &version)?)
                            }
                            _ => return Err(invalid("dependencies", ptr, "property names or schemas")),
                        };
                        node.dependencies.insert(trigger.clone(), dep);
                    }
                }
                "minProperties" => node.min_properties = Some(count("minProperties", value, ptr)?),
                "maxProperties" => node.max_properties = Some(count("maxProperties", value, ptr)?),

                _ => {
                    node.extensions.insert(key.clone(), value.clone());
                }
            }
        }

        // numeric exclusive bounds (draft 6+); with both forms present the
        // stricter one wins
        if let Some(bound) = exclusive_min {
            if node.minimum.is_none_or(|m| bound >= m) {
                node.minimum = Some(bound);
                node.exclusive_minimum = true;
            }
        }
        if let Some(bound) = exclusive_max {
            if node.maximum.is_none_or(|m| bound <= m) {
                node.maximum = Some(bound);
                node.exclusive_maximum = true;
            }
        }
        Ok(node)
    }
}

// ------------------------------- Helpers ---------------------------------- //

fn root_id(root: &Value) -> Option<&str> {
    let map = root.as_object()?;
    map.get("$id").or_else(|| map.get("id")).and_then(Value::as_str)
}

fn invalid(keyword: &'static str, pointer: &str, expected: &'static str) -> ReadError {
    ReadError::InvalidKeyword { keyword, pointer: pointer.to_string(), expected }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn string(keyword: &'static str, value: &Value, pointer: &str) -> Result<String> {
    value.as_str().map(str::to_string).ok_or_else(|| invalid(keyword, pointer, "a string"))
}

fn boolean(keyword: &'static str, value: &Value, pointer: &str) -> Result<bool> {
    value.as_bool().ok_or_else(|| invalid(keyword, pointer, "a boolean"))
}

fn number(keyword: &'static str, value: &Value, pointer: &str) -> Result<f64> {
    value.as_f64().ok_or_else(|| invalid(keyword, pointer, "a number"))
}

fn divisor(keyword: &'static str, value: &Value, pointer: &str) -> Result<f64> {
    let n = number(keyword, value, pointer)?;
    if n > 0.0 && n.is_finite() {
        Ok(n)
    } else {
        Err(invalid(keyword, pointer, "a number greater than 0"))
    }
}

/// Non-negative integer; `2.0` is accepted as `2`.
fn count(keyword: &'static str, value: &Value, pointer: &str) -> Result<u64> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Ok(f as u64),
        _ => Err(invalid(keyword, pointer, "a non-negative integer")),
    }
}

fn type_set(value: &Value, pointer: &str) -> Result<SchemaType> {
    let by_name = |name: &str| {
        SchemaType::from_name(name)
            .ok_or_else(|| ReadError::UnknownType { name: name.to_string(), pointer: pointer.to_string() })
    };
    match value {
        Value::String(name) => by_name(name),
        Value::Array(names) => names.iter().try_fold(SchemaType::NONE, |set, name| match name {
            Value::String(name) => Ok(set | by_name(name)?),
            _ => Err(invalid("type", pointer, "type names")),
        }),
        _ => Err(invalid("type", pointer, "a type name or an array of them")),
    }
}

fn push_segment(pointer: &mut String, segment: &str) {
    pointer.push('/');
    pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::resolver::PreloadedResolver;
    use serde_json::json;

    fn validator(schema: Value) -> crate::Validator {
        compile(&read(&schema).unwrap()).unwrap()
    }

    #[test]
    fn boolean_and_non_schema_roots() {
        assert_eq!(read(&json!(false)).unwrap().root_node().valid, Some(false));
        let err = read(&json!(3)).unwrap_err();
        assert!(matches!(err, ReadError::NotASchema { found: "a number", .. }), "{err}");
        let err = read(&json!({"not": "x"})).unwrap_err();
        assert!(matches!(err, ReadError::NotASchema { ref pointer, .. } if pointer == "/not"), "{err}");
    }

    #[test]
    fn recursive_root_reference() {
        let schema = read(&json!({
            "properties": {
                "Prop1": {"$ref": "#"},
                "Prop2": {"const": "value"}
            }
        }))
        .unwrap();
        let root = schema.root_node();
        assert_eq!(root.properties["Prop1"], schema.root);
        assert_eq!(schema.graph.len(), 2);

        let v = compile(&schema).unwrap();
        assert_eq!(v.forward_slots(), 1);
        assert!(v.is_valid(&json!({"Prop1": {"Prop1": null}})));
        assert!(v.is_valid(&json!({"Prop1": {"Prop1": {"Prop1": {"Prop2": "value"}}}})));
        assert!(!v.is_valid(&json!({"Prop1": {"Prop1": {"Prop2": "other"}}})));
    }

    #[test]
    fn integer_typing_follows_declared_draft() {
        let d4 = validator(json!({"$schema": "http://json-schema.org/draft-04/schema#", "type": "integer"}));
        let d7 = validator(json!({"$schema": "http://json-schema.org/draft-07/schema#", "type": "integer"}));
        let bare = validator(json!({"type": "integer"}));
        assert!(!d4.is_valid(&json!(2.0)));
        assert!(d7.is_valid(&json!(2.0)));
        assert!(bare.is_valid(&json!(2.0)));
        assert!(d4.is_valid(&json!(2)));
    }

    #[test]
    fn default_schema_version_applies_to_undeclared_documents() {
        let reader = SchemaReader::new(ReaderOptions {
            default_schema_version: Some(Draft::Draft4.uri().to_string()),
        });
        let schema = reader.read(&json!({"items": {"type": "integer"}})).unwrap();
        let v = compile(&schema).unwrap();
        assert!(!v.is_valid(&json!([1.0])));
    }

    #[test]
    fn pointers_are_unescaped_and_percent_decoded() {
        let v = validator(json!({
            "definitions": {
                "a/b": {"type": "string"},
                "c%d": {"type": "number"},
                "t~n": {"type": "null"},
                "é": {"type": "boolean"}
            },
            "properties": {
                "x": {"$ref": "#/definitions/a~1b"},
                "y": {"$ref": "#/definitions/c%25d"},
                "z": {"$ref": "#/definitions/t~0n"},
                "w": {"$ref": "#/definitions/%C3%A9"}
            }
        }));
        assert!(v.is_valid(&json!({"x": "s", "y": 1, "z": null})));
        assert!(!v.is_valid(&json!({"x": 1})));
        assert!(!v.is_valid(&json!({"y": "1"})));
        assert!(!v.is_valid(&json!({"z": 0})));
        assert!(v.is_valid(&json!({"w": true})));
        assert!(!v.is_valid(&json!({"w": "true"})));
    }

    #[test]
    fn same_location_same_node() {
        let schema = read(&json!({
            "definitions": {"n": {"type": "number"}},
            "items": [{"$ref": "#/definitions/n"}, {"$ref": "#/definitions/n"}]
        }))
        .unwrap();
        let Some(Items::Tuple(ids)) = &schema.root_node().items else { panic!("tuple expected") };
        assert_eq!(ids[0], ids[1]);
    }

    #[test]
    fn mutual_references_through_definitions() {
        let v = validator(json!({
            "$ref": "#/definitions/tree",
            "definitions": {
                "tree": {"type": "object", "properties": {"children": {"items": {"$ref": "#/definitions/node"}}}},
                "node": {"anyOf": [{"type": "null"}, {"$ref": "#/definitions/tree"}]}
            }
        }));
        assert!(v.is_valid(&json!({"children": [null, {"children": [null]}]})));
        assert!(!v.is_valid(&json!({"children": [null, {"children": [1]}]})));
        assert!(!v.is_valid(&json!([])));

        let v = validator(json!({
            "$ref": "#/definitions/list",
            "definitions": {"list": {"type": "array", "items": {"$ref": "#"}}}
        }));
        assert!(v.is_valid(&json!([[], [[]]])));
        assert!(!v.is_valid(&json!([[], [1]])));
    }

    #[test]
    fn pure_reference_loops_are_rejected() {
        let err = read(&json!({
            "definitions": {"a": {"$ref": "#/definitions/b"}, "b": {"$ref": "#/definitions/a"}},
            "$ref": "#/definitions/a"
        }))
        .unwrap_err();
        assert!(matches!(err, ReadError::CircularReference { .. }), "{err}");
        let err = read(&json!({"$ref": "#"})).unwrap_err();
        assert!(matches!(err, ReadError::CircularReference { .. }), "{err}");
    }

    #[test]
    fn unresolvable_references() {
        let err = read(&json!({"$ref": "#/definitions/missing"})).unwrap_err();
        assert!(matches!(err, ReadError::UnresolvedReference { .. }), "{err}");
        let err = read(&json!({"$ref": "http://example.com/other.json"})).unwrap_err();
        assert!(matches!(err, ReadError::UnresolvedReference { .. }), "{err}");
        let err = read(&json!({"$ref": "#anchor"})).unwrap_err();
        assert!(matches!(err, ReadError::InvalidPointer(_)), "{err}");
    }

    #[test]
    fn remote_documents_come_from_the_resolver() {
        let resolver = PreloadedResolver::new().with(
            "http://example.com/defs.json",
            json!({"definitions": {"positive": {"type": "integer", "minimum": 1}}}),
        );
        let reader = SchemaReader::default().with_resolver(resolver);
        let schema = reader
            .read(&json!({
                "$id": "http://example.com/root.json",
                "items": {"$ref": "defs.json#/definitions/positive"},
                "properties": {"self": {"$ref": "http://example.com/root.json#"}}
            }))
            .unwrap();
        assert_eq!(schema.root_node().properties["self"], schema.root);
        let v = compile(&schema).unwrap();
        assert!(v.is_valid(&json!([1, 2])));
        assert!(!v.is_valid(&json!([0])));
    }

    #[test]
    fn draft3_keywords() {
        let v = validator(json!({
            "$schema": "http://json-schema.org/draft-03/schema#",
            "extends": {"type": "object"},
            "properties": {
                "n": {"divisibleBy": 3, "required": true},
                "m": {"type": "any"}
            }
        }));
        assert!(v.is_valid(&json!({"n": 9})));
        assert!(v.is_valid(&json!({"n": 3, "m": [1]})));
        assert!(!v.is_valid(&json!({"n": 10})));
        assert!(!v.is_valid(&json!({"m": 1})));
        assert!(!v.is_valid(&json!([])));

        let err = read(&json!({"disallow": "string"})).unwrap_err();
        assert!(matches!(err, ReadError::UnsupportedKeyword { keyword: "disallow", .. }), "{err}");
    }

    #[test]
    fn boolean_required_is_draft3_only() {
        let err = read(&json!({"properties": {"n": {"required": true}}})).unwrap_err();
        assert!(matches!(err, ReadError::InvalidKeyword { keyword: "required", .. }), "{err}");

        let err = read(&json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "required": false
        }))
        .unwrap_err();
        assert!(matches!(err, ReadError::InvalidKeyword { keyword: "required", .. }), "{err}");

        let v = validator(json!({
            "$schema": "http://json-schema.org/draft-03/schema#",
            "properties": {"n": {"required": false}}
        }));
        assert!(v.is_valid(&json!({})));
    }

    #[test]
    fn numeric_exclusive_bounds() {
        let node = read(&json!({"minimum": 1, "exclusiveMinimum": 5, "exclusiveMaximum": 10}))
            .unwrap()
            .root_node()
            .clone();
        assert_eq!((node.minimum, node.exclusive_minimum), (Some(5.0), true));
        assert_eq!((node.maximum, node.exclusive_maximum), (Some(10.0), true));

        let node = read(&json!({"minimum": 7, "exclusiveMinimum": 5})).unwrap().root_node().clone();
        assert_eq!((node.minimum, node.exclusive_minimum), (Some(7.0), false));

        let node = read(&json!({"minimum": 5, "exclusiveMinimum": true})).unwrap().root_node().clone();
        assert_eq!((node.minimum, node.exclusive_minimum), (Some(5.0), true));
    }

    #[test]
    fn dependency_forms() {
        let schema = read(&json!({"dependencies": {"a": "b", "c": ["d", "e"], "f": {"required": ["g"]}}})).unwrap();
        let deps = &schema.root_node().dependencies;
        assert_eq!(deps["a"], Dependency::Properties(vec!["b".into()]));
        assert_eq!(deps["c"], Dependency::Properties(vec!["d".into(), "e".into()]));
        assert!(matches!(deps["f"], Dependency::Schema(_)));
    }

    #[test]
    fn keyword_shape_errors() {
        let err = read(&json!({"type": "strng"})).unwrap_err();
        assert!(matches!(err, ReadError::UnknownType { ref name, .. } if name == "strng"), "{err}");
        let err = read(&json!({"minLength": -1})).unwrap_err();
        assert!(matches!(err, ReadError::InvalidKeyword { keyword: "minLength", .. }), "{err}");
        let err = read(&json!({"multipleOf": 0})).unwrap_err();
        assert!(matches!(err, ReadError::InvalidKeyword { keyword: "multipleOf", .. }), "{err}");
        let err = read(&json!({"properties": {"a": {"contentEncoding": "base32"}}})).unwrap_err();
        assert!(
            matches!(err, ReadError::UnknownContentEncoding { ref pointer, .. } if pointer == "/properties/a"),
            "{err}"
        );
    }

    #[test]
    fn metadata_and_extensions_are_carried() {
        let schema = read(&json!({
            "title": "T",
            "default": [1],
            "readOnly": true,
            "x-vendor": {"k": 1},
            "type": ["string", "null"]
        }))
        .unwrap();
        let node = schema.root_node();
        assert_eq!(node.title.as_deref(), Some("T"));
        assert_eq!(node.default, Some(json!([1])));
        assert_eq!(node.read_only, Some(true));
        assert_eq!(node.extensions["x-vendor"], json!({"k": 1}));
        assert_eq!(node.type_, Some(SchemaType::STRING | SchemaType::NULL));
    }
}
