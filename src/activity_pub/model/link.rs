use serde_json::{Map, Value};

use super::context::Envelope;
use super::node::{Expect, Fields, LanguageMap};
use super::reference::{OneOrMany, Reference};
use crate::activity_pub::validate::{self, MediaType};

kinds! {
    pub enum LinkKind {
        Link,
        Mention,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub envelope: Envelope,
    pub kind: LinkKind,
    pub href: String,
    pub rel: Option<OneOrMany<String>>,
    pub media_type: Option<MediaType>,
    pub name: Option<String>,
    pub name_map: Option<LanguageMap>,
    pub hreflang: Option<String>,
    pub height: Option<u64>,
    pub width: Option<u64>,
    pub preview: Option<OneOrMany<Reference>>,
    pub rest: Map<String, Value>,
}

impl Link {
    pub fn new(kind: LinkKind, href: impl Into<String>) -> Link {
        Link {
            envelope: Envelope::new(None),
            kind,
            href: href.into(),
            rel: None,
            media_type: None,
            name: None,
            name_map: None,
            hreflang: None,
            height: None,
            width: None,
            preview: None,
            rest: Map::new(),
        }
    }

    pub(crate) fn parse(kind: LinkKind, envelope: Envelope, mut fields: Fields<'_>) -> Option<Link> {
        fields.require("href");
        let href = fields.uri("href");
        let rel = fields.strings("rel");
        if let Some(rel) = &rel {
            let bad: Vec<_> = rel
                .iter()
                .filter_map(|token| validate::rel_token(token).err())
                .collect();
            if !bad.is_empty() {
                fields.violation("rel", bad.join("; "));
            }
        }
        Some(Link {
            envelope,
            kind,
            rel,
            media_type: fields.media_type("mediaType"),
            name: fields.string("name"),
            name_map: fields.language_map("nameMap"),
            hreflang: fields.language_tag("hreflang"),
            height: fields.count("height"),
            width: fields.count("width"),
            preview: fields.references("preview", Expect::ANY),
            rest: fields.finish(),
            href: href?,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut out = self.envelope.emit(Some(Value::String(self.kind.to_string())));
        out.put("href", Value::String(self.href.clone()));
        out.opt("rel", &self.rel);
        out.opt("mediaType", &self.media_type);
        out.opt("name", &self.name);
        out.opt("nameMap", &self.name_map);
        out.opt("hreflang", &self.hreflang);
        out.opt("height", &self.height);
        out.opt("width", &self.width);
        out.opt("preview", &self.preview);
        out.finish(&self.rest)
    }
}
