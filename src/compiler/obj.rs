//! Object keywords. Non-objects always pass.
use regex::Regex;
use serde_json::{Map, Value};

use super::{predicate, Predicate, Session, Slots};
use crate::error::CompileError;
use crate::schema::{Additional, Dependency, SchemaId};

type Built = Result<Option<Predicate>, CompileError>;

fn on_objects(check: impl Fn(&Map<String, Value>, &Slots) -> bool + Send + Sync + 'static) -> Predicate {
    predicate(move |v, s| match v {
        Value::Object(map) => check(map, s),
        _ => true,
    })
}

/// Patterns compiled for `patternProperties`; an invalid one is `None` and
/// matches no name.
fn compile_patterns(cx: &mut Session<'_>, patterns: &[&String]) -> Vec<Option<Regex>> {
    patterns.iter().map(|p| cx.regex(p)).collect()
}

/// Declared properties are checked only when present.
pub fn properties(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    if node.properties.is_empty() {
        return Ok(None);
    }
    let checks = node
        .properties
        .iter()
        .map(|(name, sub)| Ok((name.clone(), cx.eval(*sub)?)))
        .collect::<Result<Vec<_>, CompileError>>()?;
    Ok(Some(on_objects(move |map, s| {
        checks.iter().all(|(name, p)| map.get(name).is_none_or(|x| p(x, s)))
    })))
}

/// Every property whose name the pattern finds (unanchored) must match.
pub fn pattern_properties(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    if node.pattern_properties.is_empty() {
        return Ok(None);
    }
    let patterns: Vec<&String> = node.pattern_properties.keys().collect();
    let regexes = compile_patterns(cx, &patterns);
    let mut checks = Vec::with_capacity(regexes.len());
    for (re, sub) in regexes.into_iter().zip(node.pattern_properties.values()) {
        let p = cx.eval(*sub)?;
        if let Some(re) = re {
            checks.push((re, p));
        }
    }
    Ok(Some(on_objects(move |map, s| {
        map.iter().all(|(name, x)| {
            checks.iter().all(|(re, p)| !re.is_match(name) || p(x, s))
        })
    })))
}

/// Properties covered by neither `properties` nor any `patternProperties`
/// pattern.
pub fn additional_properties(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    let rest = match node.additional_properties {
        Additional::Allowed => return Ok(None),
        Additional::Forbidden => None,
        Additional::Schema(sub) => Some(cx.eval(sub)?),
    };
    let declared: Vec<String> = node.properties.keys().cloned().collect();
    let patterns: Vec<&String> = node.pattern_properties.keys().collect();
    let regexes: Vec<Regex> = compile_patterns(cx, &patterns).into_iter().flatten().collect();
    Ok(Some(on_objects(move |map, s| {
        map.iter()
            .filter(|(name, _)| {
                !declared.iter().any(|d| d == *name) && !regexes.iter().any(|re| re.is_match(name))
            })
            .all(|(_, x)| rest.as_ref().is_some_and(|p| p(x, s)))
    })))
}

/// Each property name, as a JSON string, must match.
pub fn property_names(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(inner) = cx.eval_opt(graph[id].property_names)? else { return Ok(None) };
    Ok(Some(on_objects(move |map, s| {
        map.keys().all(|name| inner(&Value::String(name.clone()), s))
    })))
}

pub fn required(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    if node.required.is_empty() {
        return Ok(None);
    }
    let names: Vec<String> = node.required.iter().cloned().collect();
    Ok(Some(on_objects(move |map, _| names.iter().all(|n| map.contains_key(n)))))
}

enum DependencyCheck {
    Properties(Vec<String>),
    Schema(Predicate),
}

/// Triggered by the presence of the keyed property.
pub fn dependencies(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    if node.dependencies.is_empty() {
        return Ok(None);
    }
    let mut checks = Vec::with_capacity(node.dependencies.len());
    for (trigger, dep) in &node.dependencies {
        let check = match dep {
            Dependency::Properties(names) => DependencyCheck::Properties(names.clone()),
            Dependency::Schema(sub) => DependencyCheck::Schema(cx.eval(*sub)?),
        };
        checks.push((trigger.clone(), check));
    }
    Ok(Some(predicate(move |v, s| {
        let Value::Object(map) = v else { return true };
        checks.iter().filter(|(trigger, _)| map.contains_key(trigger)).all(|(_, check)| match check {
            DependencyCheck::Properties(names) => names.iter().all(|n| map.contains_key(n)),
            DependencyCheck::Schema(p) => p(v, s),
        })
    })))
}

pub fn property_count(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    let (min, max) = (node.min_properties, node.max_properties);
    if min.is_none() && max.is_none() {
        return Ok(None);
    }
    Ok(Some(on_objects(move |map, _| {
        let len = map.len() as u64;
        min.is_none_or(|m| len >= m) && max.is_none_or(|m| len <= m)
    })))
}
