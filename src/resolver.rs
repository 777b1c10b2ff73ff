//! Where `$ref`s to other documents come from.
use std::collections::HashMap;

use serde_json::Value;
use url::Url;

/// Supplies schema documents by absolute URI (no fragment).
pub trait Resolver: Send + Sync {
    fn resolve(&self, uri: &str) -> Option<Value>;
}

/// In-memory documents registered up front.
#[derive(Debug, Clone, Default)]
pub struct PreloadedResolver {
    documents: HashMap<String, Value>,
}

impl PreloadedResolver {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, uri: &str, document: Value) -> &mut Self {
        self.documents.insert(normalize_uri(uri), document);
        self
    }

    pub fn with(mut self, uri: &str, document: Value) -> Self {
        self.add(uri, document);
        self
    }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

impl Resolver for PreloadedResolver {
    fn resolve(&self, uri: &str) -> Option<Value> {
        self.documents.get(&normalize_uri(uri)).cloned()
    }
}

/// Document key for `uri`: fragment dropped, absolute URIs in canonical form.
pub(crate) fn normalize_uri(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.into()
        }
        Err(_) => uri.split_once('#').map_or(uri, |(doc, _)| doc).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fragments_do_not_matter() {
        let r = PreloadedResolver::new().with("http://example.com/a.json#", json!({"type": "string"}));
        assert_eq!(r.resolve("http://example.com/a.json"), Some(json!({"type": "string"})));
        assert_eq!(r.resolve("http://example.com/a.json#/type"), Some(json!({"type": "string"})));
        assert_eq!(r.resolve("http://example.com/b.json"), None);
        assert!(r.resolve("HTTP://EXAMPLE.COM/a.json").is_some());
    }
}
