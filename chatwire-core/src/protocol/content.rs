//! Message content: plain text or an ordered list of typed parts
//!
//! Content parts are tagged by their `type` field. The two tags this crate
//! understands (`text` and `image_url`) get typed variants; every other tag is
//! kept as an opaque JSON object so that newer part kinds survive a
//! parse/serialize cycle untouched.

use serde::de::{self, DeserializeOwned, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

const TEXT_TYPE: &str = "text";
const IMAGE_URL_TYPE: &str = "image_url";

/// Content of a chat message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Structured content parts (for multimodal support)
    Parts(Vec<ContentPart>),
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ContentVisitor;

        impl<'de> Visitor<'de> for ContentVisitor {
            type Value = MessageContent;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or an array of content parts")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(MessageContent::Text(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
                Ok(MessageContent::Text(value))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut parts = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                loop {
                    let index = parts.len();
                    match seq.next_element::<ContentPart>() {
                        Ok(Some(part)) => parts.push(part),
                        Ok(None) => break,
                        Err(e) => {
                            return Err(de::Error::custom(format!("content part {}: {}", index, e)))
                        }
                    }
                }
                Ok(MessageContent::Parts(parts))
            }
        }

        deserializer.deserialize_any(ContentVisitor)
    }
}

/// Image reference carried by an `image_url` part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// HTTP(S) or `data:` URL of the image
    pub url: String,

    /// Optional fidelity hint (`low`, `high`, `auto`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Individual content part of a multimodal message.
///
/// Keys a known part does not model (e.g. `cache_control`) are kept in
/// `extra` and written back after the modeled ones.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    /// `{"type": "text", "text": ...}`
    Text {
        text: String,
        extra: Map<String, Value>,
    },
    /// `{"type": "image_url", "image_url": {"url": ...}}`
    ImageUrl {
        image_url: ImageUrl,
        extra: Map<String, Value>,
    },
    /// Any other part kind. `fields` holds every key except `type`.
    ///
    /// `kind` must not be `text` or `image_url`; such a value would not parse
    /// back into this variant. Use [`ContentPart::from_fields`] to build parts
    /// from untrusted tags.
    Other {
        kind: String,
        fields: Map<String, Value>,
    },
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text {
            text: text.into(),
            extra: Map::new(),
        }
    }

    /// Create an image part pointing at `url`
    pub fn image_url(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
            extra: Map::new(),
        }
    }

    /// Build a part from a tag and its remaining keys.
    ///
    /// Known tags are parsed into their typed variant and fail the same way
    /// a malformed part on the wire does.
    pub fn from_fields(
        kind: impl Into<String>,
        mut fields: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        fields.insert("type".to_string(), Value::String(kind.into()));
        serde_json::from_value(Value::Object(fields))
    }

    /// The wire `type` tag of this part
    pub fn kind(&self) -> &str {
        match self {
            ContentPart::Text { .. } => TEXT_TYPE,
            ContentPart::ImageUrl { .. } => IMAGE_URL_TYPE,
            ContentPart::Other { kind, .. } => kind,
        }
    }

    /// Text carried by this part, if it is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Write unmodeled keys, skipping the tag and the variant's own field
fn write_extra<M: SerializeMap>(
    map: &mut M,
    extra: &Map<String, Value>,
    modeled: &str,
) -> Result<(), M::Error> {
    for (key, value) in extra {
        if key != "type" && key != modeled {
            map.serialize_entry(key, value)?;
        }
    }
    Ok(())
}

impl Serialize for ContentPart {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ContentPart::Text { text, extra } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", TEXT_TYPE)?;
                map.serialize_entry("text", text)?;
                write_extra(&mut map, extra, "text")?;
                map.end()
            }
            ContentPart::ImageUrl { image_url, extra } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", IMAGE_URL_TYPE)?;
                map.serialize_entry("image_url", image_url)?;
                write_extra(&mut map, extra, "image_url")?;
                map.end()
            }
            ContentPart::Other { kind, fields } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", kind)?;
                write_extra(&mut map, fields, "type")?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ContentPart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(other) => {
                return Err(de::Error::custom(format!(
                    "content part `type` must be a string, got {}",
                    other
                )))
            }
            None => return Err(de::Error::missing_field("type")),
        };

        match kind.as_str() {
            TEXT_TYPE => {
                let text = take_field::<String, D::Error>(&mut fields, "text", TEXT_TYPE)?;
                Ok(ContentPart::Text { text, extra: fields })
            }
            IMAGE_URL_TYPE => {
                let image_url =
                    take_field::<ImageUrl, D::Error>(&mut fields, "image_url", IMAGE_URL_TYPE)?;
                Ok(ContentPart::ImageUrl { image_url, extra: fields })
            }
            _ => Ok(ContentPart::Other { kind, fields }),
        }
    }
}

/// Remove and parse the modeled field of a known part
fn take_field<T, E>(fields: &mut Map<String, Value>, name: &'static str, kind: &str) -> Result<T, E>
where
    T: DeserializeOwned,
    E: de::Error,
{
    let value = fields.remove(name).ok_or_else(|| E::missing_field(name))?;
    serde_json::from_value(value).map_err(|e| E::custom(format!("invalid `{}` part: {}", kind, e)))
}

impl MessageContent {
    /// Check if content is empty
    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(s) => s.is_empty(),
            MessageContent::Parts(parts) => parts.is_empty(),
        }
    }

    /// Get the plain text, if this is plain-text content
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(s) => Some(s.as_str()),
            MessageContent::Parts(_) => None,
        }
    }

    /// Text of the message with non-text parts dropped.
    ///
    /// Text parts are joined with a newline.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(ContentPart::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Borrow the parts, if this is structured content
    pub fn parts(&self) -> Option<&[ContentPart]> {
        match self {
            MessageContent::Text(_) => None,
            MessageContent::Parts(parts) => Some(parts),
        }
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        MessageContent::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        MessageContent::Text(value.to_string())
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(parts: Vec<ContentPart>) -> Self {
        MessageContent::Parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_parts_parse() {
        let parts: Vec<ContentPart> = serde_json::from_value(json!([
            {"type": "text", "text": "What is this?"},
            {"type": "image_url", "image_url": {"url": "https://example.com/cat.png"}}
        ]))
        .unwrap();

        assert_eq!(parts[0], ContentPart::text("What is this?"));
        assert_eq!(parts[1], ContentPart::image_url("https://example.com/cat.png"));
    }

    #[test]
    fn test_unknown_part_keeps_fields() {
        let raw = json!({
            "type": "input_audio",
            "input_audio": {"data": "UklGRg==", "format": "wav"},
            "cache_control": {"type": "ephemeral"}
        });
        let part: ContentPart = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(part.kind(), "input_audio");
        match &part {
            ContentPart::Other { fields, .. } => {
                assert_eq!(fields.len(), 2);
                assert!(!fields.contains_key("type"));
            }
            other => panic!("expected opaque part, got {:?}", other),
        }
        assert_eq!(serde_json::to_value(&part).unwrap(), raw);
    }

    #[test]
    fn test_malformed_known_part_is_rejected() {
        let result = serde_json::from_value::<ContentPart>(json!({"type": "text"}));
        assert!(result.is_err());

        let result = serde_json::from_value::<ContentPart>(json!({"type": "image_url", "image_url": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_or_non_string_type() {
        assert!(serde_json::from_value::<ContentPart>(json!({"text": "hi"})).is_err());
        assert!(serde_json::from_value::<ContentPart>(json!({"type": 3})).is_err());
    }

    #[test]
    fn test_text_joins_text_parts() {
        let content = MessageContent::Parts(vec![
            ContentPart::text("first"),
            ContentPart::image_url("https://example.com/a.png"),
            ContentPart::text("second"),
        ]);
        assert_eq!(content.text(), "first\nsecond");
        assert_eq!(content.as_text(), None);
    }
}
