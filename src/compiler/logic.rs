//! Combinators plus the kind-agnostic keywords (`const`, `enum`, `type`).
use serde_json::Value;

use super::{all, predicate, Predicate, Session};
use crate::equality::deep_equals;
use crate::error::CompileError;
use crate::number::Num;
use crate::schema::{Draft, SchemaId, SchemaType};

type Built = Result<Option<Predicate>, CompileError>;

pub fn all_of(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(ids) = &graph[id].all_of else { return Ok(None) };
    Ok(Some(all(cx.eval_all(ids)?)))
}

/// An empty `anyOf` admits nothing.
pub fn any_of(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(ids) = &graph[id].any_of else { return Ok(None) };
    let preds = cx.eval_all(ids)?;
    Ok(Some(predicate(move |v, s| preds.iter().any(|p| p(v, s)))))
}

/// Exactly one branch; keeps scanning after the first hit and bails on the
/// second.
pub fn one_of(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(ids) = &graph[id].one_of else { return Ok(None) };
    let preds = cx.eval_all(ids)?;
    Ok(Some(predicate(move |v, s| {
        let mut matched = false;
        for p in &preds {
            if p(v, s) {
                if matched {
                    return false;
                }
                matched = true;
            }
        }
        matched
    })))
}

pub fn not(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(inner) = cx.eval_opt(graph[id].not)? else { return Ok(None) };
    Ok(Some(predicate(move |v, s| !inner(v, s))))
}

/// `then`/`else` without an `if` contribute nothing.
pub fn if_then_else(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    let Some(cond) = cx.eval_opt(node.if_)? else { return Ok(None) };
    let then = cx.eval_opt(node.then)?;
    let else_ = cx.eval_opt(node.else_)?;
    Ok(Some(predicate(move |v, s| {
        let branch = if cond(v, s) { &then } else { &else_ };
        branch.as_ref().is_none_or(|p| p(v, s))
    })))
}

pub fn const_(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(expected) = graph[id].const_value.clone() else { return Ok(None) };
    Ok(Some(predicate(move |v, _| deep_equals(&expected, v))))
}

pub fn enum_(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(members) = graph[id].enum_values.clone() else { return Ok(None) };
    Ok(Some(predicate(move |v, _| members.iter().any(|m| deep_equals(m, v)))))
}

pub fn type_(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    let Some(allowed) = node.type_ else { return Ok(None) };
    let strict = node.draft().is_some_and(Draft::strict_integers);
    Ok(Some(predicate(move |v, _| type_matches(allowed, v, strict))))
}

/// `type` check.
///
/// `number` takes every number. `integer` takes integer literals, and also
/// whole-valued floats like `2.0` unless `strict_integers` (drafts 3 and 4).
pub fn type_matches(allowed: SchemaType, value: &Value, strict_integers: bool) -> bool {
    let Value::Number(n) = value else {
        return allowed.intersects(SchemaType::of_value(value));
    };
    if allowed.contains(SchemaType::NUMBER) {
        return true;
    }
    if !allowed.contains(SchemaType::INTEGER) {
        return false;
    }
    match Num::of(n) {
        Num::Int(_) => true,
        float => !strict_integers && float.is_whole(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::testing::{build, single};
    use crate::schema::SchemaNode;
    use serde_json::json;

    #[test]
    fn integer_matching_by_draft() {
        let int = SchemaType::INTEGER;
        assert!(type_matches(int, &json!(2), true));
        assert!(type_matches(int, &json!(2), false));
        assert!(!type_matches(int, &json!(2.0), true));
        assert!(type_matches(int, &json!(2.0), false));
        assert!(!type_matches(int, &json!(2.5), false));
        assert!(type_matches(SchemaType::NUMBER, &json!(2.5), true));
        assert!(!type_matches(int | SchemaType::STRING, &json!(null), false));
        assert!(type_matches(int | SchemaType::STRING, &json!("x"), false));
        assert!(!type_matches(SchemaType::NONE, &json!(1), false));
    }

    #[test]
    fn empty_combinator_lists() {
        let all = single(SchemaNode { all_of: Some(vec![]), ..Default::default() });
        let any = single(SchemaNode { any_of: Some(vec![]), ..Default::default() });
        let one = single(SchemaNode { one_of: Some(vec![]), ..Default::default() });
        let none = single(SchemaNode { enum_values: Some(vec![]), ..Default::default() });
        assert!(all.is_valid(&json!(1)));
        assert!(!any.is_valid(&json!(1)));
        assert!(!one.is_valid(&json!(1)));
        assert!(!none.is_valid(&json!(null)));
    }

    #[test]
    fn one_of_rejects_double_matches() {
        let v = build(|g| {
            let int = g.add(SchemaNode { type_: Some(SchemaType::INTEGER), ..Default::default() });
            let min = g.add(SchemaNode { minimum: Some(2.0), ..Default::default() });
            SchemaNode { one_of: Some(vec![int, min]), ..Default::default() }
        });
        assert!(v.is_valid(&json!(1)));
        assert!(v.is_valid(&json!(2.5)));
        assert!(!v.is_valid(&json!(3)));
        assert!(!v.is_valid(&json!(1.5)));
    }

    #[test]
    fn conditional_branches() {
        let v = build(|g| {
            let is_str = g.add(SchemaNode { type_: Some(SchemaType::STRING), ..Default::default() });
            let short = g.add(SchemaNode { max_length: Some(2), ..Default::default() });
            let positive = g.add(SchemaNode { minimum: Some(0.0), ..Default::default() });
            SchemaNode { if_: Some(is_str), then: Some(short), else_: Some(positive), ..Default::default() }
        });
        assert!(v.is_valid(&json!("ab")));
        assert!(!v.is_valid(&json!("abc")));
        assert!(v.is_valid(&json!(4)));
        assert!(!v.is_valid(&json!(-4)));

        let orphan_then = build(|g| {
            let never = g.add(SchemaNode::boolean(false));
            SchemaNode { then: Some(never), ..Default::default() }
        });
        assert!(orphan_then.is_valid(&json!(1)));
    }

    #[test]
    fn const_and_enum_compare_numbers_by_value() {
        let c = single(SchemaNode { const_value: Some(json!({"a": [1]})), ..Default::default() });
        assert!(c.is_valid(&json!({"a": [1.0]})));
        assert!(!c.is_valid(&json!({"a": [true]})));
        let e = single(SchemaNode { enum_values: Some(vec![json!(false), json!(0)]), ..Default::default() });
        assert!(e.is_valid(&json!(0.0)));
        assert!(!e.is_valid(&json!(null)));
    }

    #[test]
    fn draft4_integers_are_literal() {
        let node = |version: &str| SchemaNode {
            type_: Some(SchemaType::INTEGER),
            schema_version: Some(version.to_string()),
            ..Default::default()
        };
        let d4 = single(node("http://json-schema.org/draft-04/schema#"));
        let d7 = single(node("http://json-schema.org/draft-07/schema#"));
        assert!(!d4.is_valid(&json!(2.0)));
        assert!(d7.is_valid(&json!(2.0)));
    }
}
