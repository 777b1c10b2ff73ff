//! Schema graph → predicate compiler.
//!
//! Each node becomes one closure: the conjunction of the closures its
//! keywords contribute. Sub-schemas are compiled through [`Session::eval`],
//! which is where cycles are broken:
//!
//! - first visit: the node is marked in progress and its body compiled;
//! - a visit while still in progress: a forward-reference slot is allocated
//!   (once) and the caller gets a closure that calls through the slot;
//! - body done: if a slot was allocated the body is stored into it, so every
//!   forward reference now resolves. Either way the body is memoised and
//!   later uses in the same build call it directly.
//!
//! Slots are owned by the [`Validator`] and handed to every closure as an
//! argument, so recursive schemas never form `Arc` cycles.
pub mod arr;
pub mod logic;
pub mod num;
pub mod obj;
pub mod str;

use std::collections::HashMap;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::CompileOptions;
use crate::error::CompileError;
use crate::schema::{Schema, SchemaGraph, SchemaId};

// ------------------------------- Closures --------------------------------- //

/// A compiled constraint. Takes the instance and the validator's slot table.
pub type Predicate = Arc<dyn Fn(&Value, &Slots) -> bool + Send + Sync>;

/// Contributes the predicate for one keyword family of a node, or `None`
/// when the node doesn't use it.
pub type KeywordBuilder = fn(&mut Session<'_>, SchemaId) -> Result<Option<Predicate>, CompileError>;

pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&Value, &Slots) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn constant(result: bool) -> Predicate {
    predicate(move |_, _| result)
}

/// Conjunction; short-circuits left to right.
pub fn all(mut preds: Vec<Predicate>) -> Predicate {
    match preds.len() {
        0 => constant(true),
        1 => preds.remove(0),
        _ => predicate(move |v, s| preds.iter().all(|p| p(v, s))),
    }
}

/// Forward-reference table of a compiled validator.
pub struct Slots {
    table: Box<[Predicate]>,
}

impl Slots {
    #[inline]
    pub fn call(&self, slot: usize, value: &Value) -> bool {
        (self.table[slot])(value, self)
    }

    pub fn len(&self) -> usize { self.table.len() }

    pub fn is_empty(&self) -> bool { self.table.is_empty() }
}

// ------------------------------ Validator --------------------------------- //

/// The compiled form of a schema: call [`Validator::is_valid`] as often as
/// needed, from as many threads as needed.
#[derive(Clone)]
pub struct Validator {
    schema: Schema,
    root: Predicate,
    slots: Arc<Slots>,
}

impl Validator {
    pub fn is_valid(&self, value: &Value) -> bool {
        (self.root)(value, &self.slots)
    }

    /// Borrowing closure view, handy for iterator adaptors.
    pub fn as_fn(&self) -> impl Fn(&Value) -> bool + '_ {
        move |v| self.is_valid(v)
    }

    pub fn schema(&self) -> &Schema { &self.schema }

    /// Number of nodes that turned out to be part of a cycle.
    pub fn forward_slots(&self) -> usize { self.slots.len() }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("root", &self.schema.root)
            .field("nodes", &self.schema.graph.len())
            .field("forward_slots", &self.slots.len())
            .finish()
    }
}

// ------------------------------- Compiler --------------------------------- //

/// Owns the options and the ordered keyword builder list; reusable across
/// any number of builds.
#[derive(Clone)]
pub struct Compiler {
    options: CompileOptions,
    keywords: Vec<KeywordBuilder>,
}

impl Default for Compiler {
    fn default() -> Self { Self::new(CompileOptions::default()) }
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self::with_keywords(options, builtin_keywords())
    }

    /// Custom builder list, evaluated in order for every node. Start from
    /// [`builtin_keywords`] to extend rather than replace.
    pub fn with_keywords(options: CompileOptions, keywords: Vec<KeywordBuilder>) -> Self {
        Self { options, keywords }
    }

    pub fn options(&self) -> &CompileOptions { &self.options }

    pub fn compile(&self, schema: &Schema) -> Result<Validator, CompileError> {
        let mut session = Session {
            graph: Arc::clone(&schema.graph),
            options: &self.options,
            keywords: &self.keywords,
            entries: HashMap::new(),
            slots: Vec::new(),
            regexes: HashMap::new(),
        };
        let root = session.eval(schema.root)?;
        let slots = session.finish()?;
        debug!(
            root = %schema.root,
            nodes = schema.graph.len(),
            forward_slots = slots.len(),
            "compiled schema graph"
        );
        Ok(Validator { schema: schema.clone(), root, slots: Arc::new(slots) })
    }
}

/// Compiles with default options and the built-in keywords.
pub fn compile(schema: &Schema) -> Result<Validator, CompileError> {
    Compiler::default().compile(schema)
}

/// The built-in keyword builders, in evaluation order.
pub fn builtin_keywords() -> Vec<KeywordBuilder> {
    vec![
        logic::all_of as KeywordBuilder,
        logic::any_of,
        logic::one_of,
        logic::not,
        logic::if_then_else,
        logic::const_,
        logic::enum_,
        logic::type_,
        num::minimum,
        num::maximum,
        num::multiple_of,
        str::length,
        str::pattern,
        str::content,
        arr::items,
        arr::contains,
        arr::item_count,
        arr::unique_items,
        obj::properties,
        obj::pattern_properties,
        obj::additional_properties,
        obj::property_names,
        obj::required,
        obj::dependencies,
        obj::property_count,
    ]
}

// -------------------------------- Session --------------------------------- //

enum Entry {
    /// body being compiled; `slot` is set once a cycle back to it is seen
    InProgress { slot: Option<usize> },
    Done(Predicate),
}

/// Per-build bookkeeping. Lives only for one `Compiler::compile` call.
pub struct Session<'a> {
    graph: Arc<SchemaGraph>,
    options: &'a CompileOptions,
    keywords: &'a [KeywordBuilder],
    entries: HashMap<SchemaId, Entry>,
    slots: Vec<(SchemaId, Option<Predicate>)>,
    regexes: HashMap<String, Option<Regex>>,
}

impl<'a> Session<'a> {
    /// Shared handle to the graph; clone it before borrowing a node so that
    /// `eval` can still be called.
    pub fn graph(&self) -> Arc<SchemaGraph> { Arc::clone(&self.graph) }

    pub fn options(&self) -> &CompileOptions { self.options }

    /// Predicate for `id`, compiling it if needed.
    pub fn eval(&mut self, id: SchemaId) -> Result<Predicate, CompileError> {
        match self.entries.get_mut(&id) {
            Some(Entry::Done(p)) => return Ok(Arc::clone(p)),
            Some(Entry::InProgress { slot }) => {
                let index = match *slot {
                    Some(index) => index,
                    None => {
                        let index = self.slots.len();
                        self.slots.push((id, None));
                        *slot = Some(index);
                        trace!(node = %id, slot = index, "cycle detected, allocated forward slot");
                        index
                    }
                };
                return Ok(predicate(move |v, s| s.call(index, v)));
            }
            None => {}
        }
        if self.graph.get(id).is_none() {
            return Err(CompileError::MissingNode(id));
        }

        self.entries.insert(id, Entry::InProgress { slot: None });
        let body = self.body(id)?;
        if let Some(Entry::InProgress { slot: Some(index) }) = self.entries.get(&id) {
            self.slots[*index].1 = Some(Arc::clone(&body));
        }
        self.entries.insert(id, Entry::Done(Arc::clone(&body)));
        Ok(body)
    }

    /// Optional sub-schema helper for keyword builders.
    pub fn eval_opt(&mut self, id: Option<SchemaId>) -> Result<Option<Predicate>, CompileError> {
        id.map(|id| self.eval(id)).transpose()
    }

    pub fn eval_all(&mut self, ids: &[SchemaId]) -> Result<Vec<Predicate>, CompileError> {
        ids.iter().map(|id| self.eval(*id)).collect()
    }

    /// Compiled regex for a schema pattern, or `None` when the pattern is
    /// invalid (callers treat that as "never matches").
    ///
    /// The engine has no lookaround or backreferences, so ECMA-262 patterns
    /// such as `^(?!foo)` land here too.
    pub fn regex(&mut self, pattern: &str) -> Option<Regex> {
        if let Some(cached) = self.regexes.get(pattern) {
            return cached.clone();
        }
        let compiled = RegexBuilder::new(pattern)
            .size_limit(self.options.regex_size_limit)
            .dfa_size_limit(self.options.regex_dfa_size_limit)
            .build();
        let compiled = match compiled {
            Ok(re) => Some(re),
            Err(error) => {
                warn!(pattern, %error, "invalid pattern, constraint will never match");
                None
            }
        };
        self.regexes.insert(pattern.to_string(), compiled.clone());
        compiled
    }

    fn body(&mut self, id: SchemaId) -> Result<Predicate, CompileError> {
        if let Some(valid) = self.graph[id].valid {
            return Ok(constant(valid));
        }
        let keywords = self.keywords;
        let mut preds = Vec::new();
        for build in keywords {
            if let Some(p) = build(self, id)? {
                preds.push(p);
            }
        }
        Ok(all(preds))
    }

    fn finish(self) -> Result<Slots, CompileError> {
        let table = self
            .slots
            .into_iter()
            .map(|(id, p)| p.ok_or(CompileError::UnfilledSlot(id)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Slots { table: table.into_boxed_slice() })
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Additional, Items, SchemaNode};
    use serde_json::json;

    fn linked(f: impl FnOnce(&mut SchemaGraph) -> SchemaId) -> Schema {
        let mut g = SchemaGraph::new();
        let root = f(&mut g);
        Schema::new(g, root)
    }

    #[test]
    fn empty_node_accepts_everything() {
        let v = compile(&linked(|g| g.add(SchemaNode::default()))).unwrap();
        for x in [json!(null), json!(1), json!("s"), json!([1]), json!({"a": {}})] {
            assert!(v.is_valid(&x));
        }
        assert_eq!(v.forward_slots(), 0);
    }

    #[test]
    fn boolean_node_ignores_other_keywords() {
        let v = compile(&linked(|g| {
            let mut n = SchemaNode::boolean(true);
            n.const_value = Some(json!(1));
            g.add(n)
        })).unwrap();
        assert!(v.is_valid(&json!(2)));
        let v = compile(&linked(|g| g.add(SchemaNode::boolean(false)))).unwrap();
        assert!(!v.is_valid(&json!(null)));
    }

    #[test]
    fn self_reference_gets_one_forward_slot() {
        // { properties: { next: <self> }, required: [value] }
        let schema = linked(|g| {
            let root = g.reserve();
            let mut n = SchemaNode::default();
            n.properties.insert("next".into(), root);
            n.required.insert("value".into());
            g.set(root, n);
            root
        });
        let v = compile(&schema).unwrap();
        assert_eq!(v.forward_slots(), 1);
        assert!(v.is_valid(&json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}})));
        assert!(!v.is_valid(&json!({"value": 1, "next": {"value": 2, "next": {}}})));
    }

    #[test]
    fn mutual_recursion_resolves_both_directions() {
        // even := array of odd, odd := array of even, arrays nest alternately
        // and leaves must be numbers at even depth, strings at odd depth
        let schema = linked(|g| {
            let even = g.reserve();
            let odd = g.reserve();
            let num = g.add(SchemaNode { type_: Some(crate::schema::SchemaType::NUMBER), ..Default::default() });
            let s = g.add(SchemaNode { type_: Some(crate::schema::SchemaType::STRING), ..Default::default() });
            let even_arr = g.add(SchemaNode { items: Some(Items::Single(odd)), type_: Some(crate::schema::SchemaType::ARRAY), ..Default::default() });
            let odd_arr = g.add(SchemaNode { items: Some(Items::Single(even)), type_: Some(crate::schema::SchemaType::ARRAY), ..Default::default() });
            g.set(even, SchemaNode { any_of: Some(vec![num, even_arr]), ..Default::default() });
            g.set(odd, SchemaNode { any_of: Some(vec![s, odd_arr]), ..Default::default() });
            even
        });
        let v = compile(&schema).unwrap();
        assert!(v.is_valid(&json!(1)));
        assert!(v.is_valid(&json!(["a", [2, 3], [["b"]]])));
        assert!(!v.is_valid(&json!([1])));
        assert!(!v.is_valid(&json!([[[1]]])));
    }

    #[test]
    fn shared_acyclic_node_compiles_once_without_slots() {
        let schema = linked(|g| {
            let leaf = g.add(SchemaNode { const_value: Some(json!(7)), ..Default::default() });
            let mut root = SchemaNode::default();
            root.properties.insert("a".into(), leaf);
            root.properties.insert("b".into(), leaf);
            root.additional_properties = Additional::Schema(leaf);
            g.add(root)
        });
        let v = compile(&schema).unwrap();
        assert_eq!(v.forward_slots(), 0);
        assert!(v.is_valid(&json!({"a": 7, "b": 7.0, "c": 7})));
        assert!(!v.is_valid(&json!({"a": 7, "c": 8})));
    }

    #[test]
    fn dangling_handle_is_an_error() {
        let mut g = SchemaGraph::new();
        let root = g.reserve();
        let mut other = SchemaGraph::new();
        other.reserve();
        let ghost = other.reserve();
        g.set(root, SchemaNode { not: Some(ghost), ..Default::default() });
        let err = compile(&Schema::new(g, root)).unwrap_err();
        assert!(matches!(err, CompileError::MissingNode(id) if id == ghost));
    }

    #[test]
    fn validator_is_send_sync_and_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Validator>();

        let schema = linked(|g| g.add(SchemaNode { minimum: Some(0.0), ..Default::default() }));
        let v = compile(&schema).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let v = v.clone();
                std::thread::spawn(move || v.is_valid(&json!(i)) && !v.is_valid(&json!(-1 - i)))
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }

    #[test]
    fn custom_keyword_list_extends_builtins() {
        fn no_strings(_: &mut Session<'_>, _: SchemaId) -> Result<Option<Predicate>, CompileError> {
            Ok(Some(predicate(|v, _| !v.is_string())))
        }
        let mut keywords = builtin_keywords();
        keywords.push(no_strings);
        let compiler = Compiler::with_keywords(CompileOptions::default(), keywords);
        let v = compiler
            .compile(&linked(|g| g.add(SchemaNode { maximum: Some(3.0), ..Default::default() })))
            .unwrap();
        assert!(v.is_valid(&json!(2)));
        assert!(!v.is_valid(&json!(4)));
        assert!(!v.is_valid(&json!("x")));
    }
}

/// Hand-built graphs for the keyword module tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::schema::SchemaNode;

    pub fn build(f: impl FnOnce(&mut SchemaGraph) -> SchemaNode) -> Validator {
        let mut g = SchemaGraph::new();
        let root = g.reserve();
        let node = f(&mut g);
        g.set(root, node);
        compile(&Schema::new(g, root)).unwrap()
    }

    pub fn single(node: SchemaNode) -> Validator {
        build(|_| node)
    }
}
