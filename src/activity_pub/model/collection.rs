use serde_json::{Map, Value};
use tracing::debug;

use super::context::Envelope;
use super::node::{Expect, Fields};
use super::object::ObjectProperties;
use super::reference::{OneOrMany, Reference};

kinds! {
    pub enum CollectionKind {
        Collection,
        OrderedCollection,
        CollectionPage,
        OrderedCollectionPage,
    }
}

impl CollectionKind {
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            CollectionKind::OrderedCollection | CollectionKind::OrderedCollectionPage
        )
    }
    pub fn is_page(&self) -> bool {
        matches!(
            self,
            CollectionKind::CollectionPage | CollectionKind::OrderedCollectionPage
        )
    }
    /// The member that carries items for this kind.
    pub fn items_key(&self) -> &'static str {
        if self.is_ordered() { "orderedItems" } else { "items" }
    }
    fn other_items_key(&self) -> &'static str {
        if self.is_ordered() { "items" } else { "orderedItems" }
    }
}

/// Paging members.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub part_of: Option<Reference>,
    pub next: Option<Reference>,
    pub prev: Option<Reference>,
    /// `OrderedCollectionPage` only.
    pub start_index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub envelope: Envelope,
    pub kind: CollectionKind,
    pub properties: ObjectProperties,
    pub total_items: Option<u64>,
    pub current: Option<Reference>,
    pub first: Option<Reference>,
    pub last: Option<Reference>,
    /// Read from `items` or `orderedItems`; written under [`CollectionKind::items_key`].
    pub items: Option<OneOrMany<Reference>>,
    pub page: Option<Page>,
    pub rest: Map<String, Value>,
}

impl Collection {
    pub fn new(kind: CollectionKind) -> Collection {
        Collection {
            envelope: Envelope::new(None),
            kind,
            properties: ObjectProperties::default(),
            total_items: None,
            current: None,
            first: None,
            last: None,
            items: None,
            page: kind.is_page().then(Page::default),
            rest: Map::new(),
        }
    }

    pub(crate) fn parse(kind: CollectionKind, envelope: Envelope, mut fields: Fields<'_>) -> Option<Collection> {
        let properties = ObjectProperties::parse(&mut fields);
        let total_items = fields.count("totalItems");
        let current = fields.reference("current", Expect::COLLECTION_OR_LINK);
        let first = fields.reference("first", Expect::COLLECTION_OR_LINK);
        let last = fields.reference("last", Expect::COLLECTION_OR_LINK);

        let canonical = kind.items_key();
        let other = kind.other_items_key();
        let items = if fields.has(canonical) {
            if fields.take(other).is_some() {
                debug!(target: "apub", %kind, "ignoring {other} next to {canonical}");
            }
            fields.references(canonical, Expect::ANY)
        } else {
            fields.references(other, Expect::ANY)
        };

        let page = kind.is_page().then(|| Page {
            part_of: fields.reference("partOf", Expect::COLLECTION_OR_LINK),
            next: fields.reference("next", Expect::COLLECTION_OR_LINK),
            prev: fields.reference("prev", Expect::COLLECTION_OR_LINK),
            start_index: if kind == CollectionKind::OrderedCollectionPage {
                fields.count("startIndex")
            } else {
                None
            },
        });
        Some(Collection {
            envelope,
            kind,
            properties,
            total_items,
            current,
            first,
            last,
            items,
            page,
            rest: fields.finish(),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut out = self.envelope.emit(Some(Value::String(self.kind.to_string())));
        self.properties.emit(&mut out);
        out.opt("totalItems", &self.total_items);
        out.opt("current", &self.current);
        out.opt("first", &self.first);
        out.opt("last", &self.last);
        out.opt(self.kind.items_key(), &self.items);
        if let Some(page) = &self.page {
            out.opt("partOf", &page.part_of);
            out.opt("next", &page.next);
            out.opt("prev", &page.prev);
            out.opt("startIndex", &page.start_index);
        }
        out.finish(&self.rest)
    }

    /// Items in order, whichever key they arrived under.
    pub fn iter_items(&self) -> impl Iterator<Item = &Reference> {
        self.items.iter().flat_map(OneOrMany::iter)
    }
}
