//! Array keywords. Non-arrays always pass.
use serde_json::Value;

use super::{predicate, Predicate, Session, Slots};
use crate::equality::all_unique;
use crate::error::CompileError;
use crate::schema::{Additional, Items, SchemaId};

type Built = Result<Option<Predicate>, CompileError>;

fn on_arrays(check: impl Fn(&[Value], &Slots) -> bool + Send + Sync + 'static) -> Predicate {
    predicate(move |v, s| match v {
        Value::Array(items) => check(items, s),
        _ => true,
    })
}

/// `items` plus `additionalItems`, which only means something after a tuple.
pub fn items(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    match &node.items {
        None => Ok(None),
        Some(Items::Single(each)) => {
            let each = cx.eval(*each)?;
            Ok(Some(on_arrays(move |items, s| items.iter().all(|x| each(x, s)))))
        }
        Some(Items::Tuple(ids)) => {
            let positional = cx.eval_all(ids)?;
            let width = positional.len();
            let rest = match node.additional_items {
                Additional::Allowed => None,
                Additional::Forbidden => Some(None),
                Additional::Schema(rest) => Some(Some(cx.eval(rest)?)),
            };
            Ok(Some(on_arrays(move |items, s| {
                // shorter arrays are fine, only present positions are checked
                if !items.iter().zip(&positional).all(|(x, p)| p(x, s)) {
                    return false;
                }
                match &rest {
                    None => true,
                    Some(None) => items.len() <= width,
                    Some(Some(p)) => items.iter().skip(width).all(|x| p(x, s)),
                }
            })))
        }
    }
}

/// At least one element matches; an empty array never does.
pub fn contains(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(inner) = cx.eval_opt(graph[id].contains)? else { return Ok(None) };
    Ok(Some(on_arrays(move |items, s| items.iter().any(|x| inner(x, s)))))
}

pub fn item_count(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    let (min, max) = (node.min_items, node.max_items);
    if min.is_none() && max.is_none() {
        return Ok(None);
    }
    Ok(Some(on_arrays(move |items, _| {
        let len = items.len() as u64;
        min.is_none_or(|m| len >= m) && max.is_none_or(|m| len <= m)
    })))
}

pub fn unique_items(cx: &mut Session<'_>, id: SchemaId) -> Built {
    if !cx.graph()[id].unique_items {
        return Ok(None);
    }
    Ok(Some(on_arrays(|items, _| all_unique(items))))
}
