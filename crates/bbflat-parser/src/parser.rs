use crate::cursor::Cursor;
use crate::{CLOSE, EQUAL, OPEN, SLASH};
use bbflat_types::{Segment, Tag};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Parse stages.
#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    /// Consuming a span of plain text.
    Text,

    /// Consuming an opening tag.
    OpeningTag,

    /// Consuming a closing tag.
    ClosingTag,
}

/// Parses text that may or may not contain bbcode into a flat list of
/// [Segment], each carrying the tags active over it.
///
/// Only holds the allow-list of recognized tag names, every [Parser::parse]
/// call runs on its own state, so a single instance can serve calls from
/// multiple threads.
#[derive(Clone, Debug)]
pub struct Parser {
    /// Recognized tag names, folded to lowercase.
    allowed: HashSet<String>,
}

impl Parser {
    /// Build a parser recognizing `allowed_tags`, matched without regard to
    /// ascii case from here on.
    pub fn new<I, S>(allowed_tags: I) -> Parser
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Parser {
            allowed: allowed_tags
                .into_iter()
                .map(|name| name.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Parse `text` into ordered segments.
    ///
    /// Total over any input: the empty string gives an empty list, and
    /// bracketed runs that are not recognized tags come back verbatim as
    /// content.
    pub fn parse(&self, text: impl AsRef<str>) -> Vec<Segment> {
        let cursor = Cursor::new(text.as_ref());
        debug!("parsing {} characters", cursor.len());

        Machine {
            allowed: &self.allowed,
            cursor,
            state: State::Text,
            active: Vec::new(),
            pending: Segment::new(0, 0),
            output: Vec::new(),
        }
        .run()
    }
}

/// State of a single parse run.
///
/// The stages communicate through `pending`: the text stage measures content
/// into it, while the tag stages re-aim its `start_index`/`length` so that
/// recognized markup is skipped and unrecognized markup is folded back into
/// content.
struct Machine<'a> {
    /// Recognized tag names, lowercased.
    allowed: &'a HashSet<String>,

    cursor: Cursor,

    state: State,

    /// Tags opened and not yet closed, oldest first. Duplicate names allowed,
    /// an author may well nest `[b][b]..[/b][/b]`.
    active: Vec<Tag>,

    /// Segment currently being measured.
    pending: Segment,

    /// Finished segments.
    output: Vec<Segment>,
}

impl Machine<'_> {
    fn run(mut self) -> Vec<Segment> {
        while self.cursor.read() {
            match self.state {
                State::Text => self.text(),
                State::OpeningTag => self.opening_tag(),
                State::ClosingTag => self.closing_tag(),
            }
        }
        self.output
    }

    fn recognized(&self, name: &str) -> bool {
        self.allowed.contains(&name.to_ascii_lowercase())
    }

    /// Extract the pending span from the source, move the finished segment to
    /// the output and start a fresh one at the cursor.
    ///
    /// Used both when a text run ends and for the closing-tag edge case at
    /// the end of the buffer.
    fn flush(&mut self) {
        let next = Segment::new(self.cursor.index(), 0);
        let mut segment = std::mem::replace(&mut self.pending, next);
        segment.content = self.cursor.slice(segment.start_index, segment.length);
        self.output.push(segment);
    }

    /// Consume plain text up to the next `[` or the end of the buffer.
    fn text(&mut self) {
        // A `[` right away, nothing measured yet.
        if self.cursor.current() == Some(OPEN) {
            self.state = State::OpeningTag;
            return;
        }

        while self.cursor.current() != Some(OPEN) {
            self.pending.length += 1;
            if !self.cursor.read() {
                break;
            }
        }

        // Innermost first; the set keeps the first entry per name, so of
        // duplicated names only the most recently opened instance sticks.
        for tag in self.active.iter().rev() {
            self.pending.tags.insert(tag.clone());
        }

        self.flush();
        self.state = State::OpeningTag;
    }

    /// Read a tag name up to `]` or `=`, gate it against the allow-list and
    /// capture an attribute when one is present.
    fn opening_tag(&mut self) {
        // What looked like an opening tag is actually a closing one.
        if self.cursor.current() == Some(SLASH) {
            self.state = State::ClosingTag;
            return;
        }

        let name_start = self.cursor.index();
        let mut name_len = 0;
        while !matches!(self.cursor.current(), Some(CLOSE) | Some(EQUAL)) {
            name_len += 1;
            if !self.cursor.read() {
                break;
            }
        }

        let name = self.cursor.slice(name_start, name_len);
        if self.recognized(&name) {
            let mut tag = Tag::new(name);

            // `[name=value]`: step past the `=`, guarding against it being
            // the last character in the buffer, and measure the value.
            if self.cursor.current() == Some(EQUAL) && self.cursor.read() {
                let attr_start = self.cursor.index();
                let mut attr_len = 0;
                while self.cursor.current() != Some(CLOSE) {
                    attr_len += 1;
                    if !self.cursor.read() {
                        break;
                    }
                }
                tag.set_attribute(self.cursor.slice(attr_start, attr_len));
            }

            trace!("tag {} opened at {}", tag.name(), name_start);
            self.active.push(tag);

            // The tag is markup, not content. Restart measuring just past
            // the `]`.
            self.pending.start_index = self.cursor.index() + 1;
            self.pending.length = 0;
        } else {
            // Unknown name: fold the whole bracketed run, `[` and `]`
            // included, back into the pending content.
            self.pending.start_index = self.cursor.index() - name_len - 1;
            self.pending.length = name_len + 2;
        }

        self.state = State::Text;
    }

    /// Read a closing tag name up to `]` and retire the matching active tag.
    fn closing_tag(&mut self) {
        let name_start = self.cursor.index();
        let mut name_len = 0;
        while self.cursor.current() != Some(CLOSE) {
            name_len += 1;
            if !self.cursor.read() {
                break;
            }
        }

        let name = self.cursor.slice(name_start, name_len);
        if self.recognized(&name) {
            self.pending.start_index = self.cursor.index() + 1;
            self.pending.length = 0;

            // Retire the oldest open occurrence of this name, not the
            // innermost. Closing a tag that was never opened is ignored.
            let open = self
                .active
                .iter()
                .position(|tag| tag.name().eq_ignore_ascii_case(&name));
            if let Some(open) = open {
                trace!("tag {} closed at {}", name, name_start);
                self.active.remove(open);
            }
        } else {
            // Unknown name: fold `[/`, the name and `]` back into content.
            self.pending.start_index = self.cursor.index() - name_len - 2;
            self.pending.length = name_len + 3;

            // An unknown closing tag that also ends the buffer never reaches
            // the text stage again, so it has to be flushed here. The
            // measured length overruns when the `]` is missing, clamp it to
            // the end of the buffer.
            if self.cursor.peek().is_none() {
                self.pending.length = self.cursor.len() - self.pending.start_index;
                self.flush();
                return;
            }
        }

        // Closing tags contribute no content of their own; only the span
        // bookkeeping carries over into the next segment.
        self.pending = Segment::new(self.pending.start_index, self.pending.length);
        self.state = State::Text;
    }
}
