use serde_json::Value;

use super::Document;
use super::node::ToJson;

/// A property value that may be sent either bare or as a JSON array.
///
/// The wire form is remembered so a one element array stays an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(one) => std::slice::from_ref(one).iter(),
            OneOrMany::Many(many) => many.iter(),
        }
    }
    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }
    pub fn len(&self) -> usize {
        self.iter().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Append, turning a single value into a list.
    pub fn push(&mut self, value: T) {
        let taken = std::mem::replace(self, OneOrMany::Many(Vec::new()));
        let mut items = taken.into_vec();
        items.push(value);
        *self = OneOrMany::Many(items);
    }
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(one) => vec![one],
            OneOrMany::Many(many) => many,
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

impl<'a, T> IntoIterator for &'a OneOrMany<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: ToJson> ToJson for OneOrMany<T> {
    fn to_json(&self) -> Value {
        match self {
            OneOrMany::One(one) => one.to_json(),
            OneOrMany::Many(many) => Value::Array(many.iter().map(ToJson::to_json).collect()),
        }
    }
}

/// Either a bare URI naming a node, or the node embedded in place.
///
/// URIs are not dereferenced; they stay as received.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference<T = Document> {
    Uri(String),
    Inline(Box<T>),
}

impl<T> Reference<T> {
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Reference::Uri(uri) => Some(uri),
            Reference::Inline(_) => None,
        }
    }
    pub fn as_inline(&self) -> Option<&T> {
        match self {
            Reference::Uri(_) => None,
            Reference::Inline(node) => Some(node),
        }
    }
}

impl Reference<Document> {
    /// The URI, or the id of the embedded document.
    pub fn id(&self) -> Option<&str> {
        match self {
            Reference::Uri(uri) => Some(uri),
            Reference::Inline(document) => document.id(),
        }
    }
}

impl<T> From<&str> for Reference<T> {
    fn from(uri: &str) -> Self {
        Reference::Uri(uri.to_string())
    }
}

impl<T> From<String> for Reference<T> {
    fn from(uri: String) -> Self {
        Reference::Uri(uri)
    }
}

impl From<Document> for Reference<Document> {
    fn from(document: Document) -> Self {
        Reference::Inline(Box::new(document))
    }
}

impl<T: ToJson> ToJson for Reference<T> {
    fn to_json(&self) -> Value {
        match self {
            Reference::Uri(uri) => Value::String(uri.clone()),
            Reference::Inline(node) => node.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OneOrMany, Reference};

    #[test]
    fn one_and_many_iterate_alike() {
        let one: OneOrMany<Reference> = OneOrMany::One("https://a.example/1".into());
        let many: OneOrMany<Reference> = OneOrMany::Many(vec!["https://a.example/1".into()]);
        assert_ne!(one, many);
        assert!(one.iter().eq(many.iter()));
        assert_eq!(one.first().and_then(Reference::id), Some("https://a.example/1"));
    }

    #[test]
    fn push_promotes_to_many() {
        let mut list = OneOrMany::One(1);
        list.push(2);
        assert_eq!(list, OneOrMany::Many(vec![1, 2]));
        assert_eq!(list.len(), 2);
    }
}
