use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// A bbcode tag together with its optional attribute.
///
/// Identity is the name alone: two tags with the same name are equal no
/// matter what their attributes hold, and the comparison ignores ascii case
/// so `[B]` and `[b]` are the same tag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name, kept as written in the source.
    name: String,

    /// Attribute carried by `[name=value]` style tags.
    attribute: Option<String>,
}

impl Tag {
    /// Build a tag without an attribute.
    pub fn new(name: impl Into<String>) -> Tag {
        Tag {
            name: name.into(),
            attribute: None,
        }
    }

    /// The name as written in the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attribute value, if the tag carried one.
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Attach an attribute value.
    pub fn set_attribute(&mut self, value: impl Into<String>) {
        self.attribute = Some(value.into());
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.name.as_bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

/// A run of content from the source together with every tag active over it.
///
/// `start_index` and `length` are character offsets into the source, and
/// `content` is the verbatim extraction of that span. `tags` holds at most
/// one tag per name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Content copied verbatim from the source.
    pub content: String,

    /// Tags in effect over this content.
    pub tags: HashSet<Tag>,

    /// Position in the source where the content starts.
    pub start_index: usize,

    /// Character count of the content.
    pub length: usize,
}

impl Segment {
    /// Start an empty segment at `start_index`, with `length` characters
    /// already measured if the span is known.
    pub fn new(start_index: usize, length: usize) -> Segment {
        Segment {
            content: String::new(),
            tags: HashSet::new(),
            start_index,
            length,
        }
    }
}
