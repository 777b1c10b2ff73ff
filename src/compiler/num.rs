//! Numeric keywords. Non-numbers always pass.
use serde_json::Value;

use super::{predicate, Predicate, Session};
use crate::error::CompileError;
use crate::number::{above_minimum, below_maximum, is_multiple_of, Num};
use crate::schema::SchemaId;

type Built = Result<Option<Predicate>, CompileError>;

fn on_numbers(check: impl Fn(Num) -> bool + Send + Sync + 'static) -> Predicate {
    predicate(move |v, _| match v {
        Value::Number(n) => check(Num::of(n)),
        _ => true,
    })
}

pub fn minimum(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    let Some(bound) = node.minimum else { return Ok(None) };
    let exclusive = node.exclusive_minimum;
    Ok(Some(on_numbers(move |n| above_minimum(n, bound, exclusive))))
}

pub fn maximum(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    let Some(bound) = node.maximum else { return Ok(None) };
    let exclusive = node.exclusive_maximum;
    Ok(Some(on_numbers(move |n| below_maximum(n, bound, exclusive))))
}

pub fn multiple_of(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(divisor) = graph[id].multiple_of else { return Ok(None) };
    Ok(Some(on_numbers(move |n| is_multiple_of(n, divisor))))
}
