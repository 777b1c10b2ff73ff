//! String keywords. Non-strings always pass.
use std::borrow::Cow;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use super::{predicate, Predicate, Session};
use crate::error::CompileError;
use crate::schema::{ContentEncoding, SchemaId};

type Built = Result<Option<Predicate>, CompileError>;

fn on_strings(check: impl Fn(&str) -> bool + Send + Sync + 'static) -> Predicate {
    predicate(move |v, _| match v {
        Value::String(s) => check(s),
        _ => true,
    })
}

/// Length in user-perceived characters (extended grapheme clusters).
pub fn grapheme_len(s: &str) -> u64 {
    s.graphemes(true).count() as u64
}

/// `minLength` and `maxLength` together, so the string is only walked once.
pub fn length(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    let (min, max) = (node.min_length, node.max_length);
    if min.is_none() && max.is_none() {
        return Ok(None);
    }
    Ok(Some(on_strings(move |s| {
        let len = grapheme_len(s);
        min.is_none_or(|m| len >= m) && max.is_none_or(|m| len <= m)
    })))
}

/// Unanchored search, as ECMA 262 `test` does.
pub fn pattern(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let Some(source) = &graph[id].pattern else { return Ok(None) };
    Ok(Some(match cx.regex(source) {
        Some(re) => on_strings(move |s| re.is_match(s)),
        None => on_strings(|_| false),
    }))
}

#[derive(Debug, Clone, Copy)]
enum MediaType {
    Json,
}

impl MediaType {
    fn from_name(name: &str) -> Option<MediaType> {
        // parameters such as `; charset=utf-8` don't change the check
        let essence = name.split(';').next().unwrap_or(name).trim();
        essence.eq_ignore_ascii_case("application/json").then_some(MediaType::Json)
    }

    fn accepts(self, bytes: &[u8]) -> bool {
        match self {
            MediaType::Json => serde_json::from_slice::<serde::de::IgnoredAny>(bytes).is_ok(),
        }
    }
}

/// `contentEncoding` then `contentMediaType`: decode first, and check the
/// decoded bytes against the media type.
pub fn content(cx: &mut Session<'_>, id: SchemaId) -> Built {
    let graph = cx.graph();
    let node = &graph[id];
    let media = match &node.content_media_type {
        Some(name) => Some(MediaType::from_name(name).ok_or_else(|| {
            CompileError::UnsupportedMediaType { media_type: name.clone(), node: id }
        })?),
        None => None,
    };
    let encoding = node.content_encoding;
    if media.is_none() && encoding.is_none() {
        return Ok(None);
    }
    Ok(Some(on_strings(move |s| {
        let bytes: Cow<'_, [u8]> = match encoding {
            Some(ContentEncoding::Base64) => {
                // MIME-style line breaks are allowed between groups
                let compact: Vec<u8> = s.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
                match BASE64.decode(&compact) {
                    Ok(decoded) => Cow::Owned(decoded),
                    Err(_) => return false,
                }
            }
            None => Cow::Borrowed(s.as_bytes()),
        };
        media.is_none_or(|m| m.accepts(&bytes))
    })))
}
