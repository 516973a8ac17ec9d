/// Captured message domain models
use crate::models::TenantId;
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Ordered header multi-map.
///
/// Names keep the case they were first seen with; lookups ignore case. Values
/// for a name keep their arrival order, and a name keeps the position of its
/// first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, merging into an existing name regardless of case
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Every (name, value) pair in stored order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name, v.as_str())))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes one `Name: value` line per value, CRLF terminated
    pub fn write_block(&self, out: &mut String) {
        for (name, value) in self.pairs() {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, values) in &self.entries {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of header names to value lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    for value in values {
                        headers.append(name.clone(), value);
                    }
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

/// Header block and body of a message or MIME part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Content {
    pub headers: Headers,
    pub body: String,
    pub size: usize,
}

impl Content {
    pub fn new(headers: Headers, body: String) -> Self {
        let size = body.len();
        Self {
            headers,
            body,
            size,
        }
    }

    /// Transfer encoding declared for this body, if any
    pub fn transfer_encoding(&self) -> Option<&str> {
        self.headers.first("Content-Transfer-Encoding").map(str::trim)
    }
}

/// Parsed MIME structure: the direct children of a multipart message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MimeBody {
    pub parts: Vec<Content>,
}

/// Immutable snapshot of a captured message once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(rename = "ID")]
    pub id: String,
    pub tenant: TenantId,
    pub from: String,
    pub to: Vec<String>,
    pub content: Content,
    #[serde(rename = "MIME", skip_serializing_if = "Option::is_none", default)]
    pub mime: Option<MimeBody>,
    pub created: DateTime<Utc>,
}

impl Message {
    /// Builds a message with a fresh identifier; sender and recipients are
    /// taken from the `From` and `To` headers.
    pub fn new(tenant: TenantId, headers: Headers, body: String, mime: Option<MimeBody>) -> Self {
        let from = headers.first("From").unwrap_or_default().trim().to_string();
        let to = headers
            .get("To")
            .map(|values| {
                values
                    .iter()
                    .flat_map(|v| v.split(','))
                    .map(|addr| addr.trim().to_string())
                    .filter(|addr| !addr.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant,
            from,
            to,
            content: Content::new(headers, body),
            mime,
            created: Utc::now(),
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.content.headers
    }

    /// Raw RFC 5322 reconstruction: header block, blank line, body
    pub fn to_raw(&self) -> String {
        let mut raw = String::with_capacity(self.content.size + 64 * self.content.headers.len());
        self.content.headers.write_block(&mut raw);
        raw.push_str("\r\n");
        raw.push_str(&self.content.body);
        raw
    }

    pub fn part(&self, index: usize) -> Option<&Content> {
        self.mime.as_ref().and_then(|mime| mime.parts.get(index))
    }
}
