//! The on-disk article format.
//!
//! ```text
//! Title = "Getting Started"
//! LastEditedAt = 1557593441
//!
//!
//! +++
//! # Markdown body, stored verbatim
//! ```
//!
//! Everything before the first [`DELIMITER`] is a TOML document carrying at
//! least `Title` and `LastEditedAt`; everything after it is the raw body.

use std::collections::VecDeque;

use alexandria_types::Timestamp;
use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream};
use serde::{Deserialize, Serialize};

/// Separates the metadata block from the body.
pub const DELIMITER: &[u8] = b"\n+++\n";

/// File extension of article files.
pub const ARTICLE_EXTENSION: &str = "md";

/// Errors from decoding or encoding an article.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("metadata delimiter not found")]
    MissingDelimiter,

    #[error("metadata block is not valid UTF-8: {0}")]
    NonUtf8Metadata(#[from] std::str::Utf8Error),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(#[from] toml::de::Error),
}

/// Article metadata stored in the TOML block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "LastEditedAt")]
    pub last_edited_at: Timestamp,
}

/// Split raw file bytes into metadata and body.
pub fn parse(bytes: &[u8]) -> Result<(Metadata, Vec<u8>), CodecError> {
    let idx = find_delimiter(bytes).ok_or(CodecError::MissingDelimiter)?;
    let block = std::str::from_utf8(&bytes[..idx])?;
    let metadata: Metadata = toml::from_str(block)?;
    let body = bytes[idx + DELIMITER.len()..].to_vec();
    Ok((metadata, body))
}

/// Encode metadata, then the delimiter, then the body verbatim.
///
/// Left inverse of [`parse`]: `parse(&serialize(m, b))? == (m, b)`.
///
/// The title is always written as a single-line basic string, so no title
/// can put a delimiter inside the metadata block.
pub fn serialize(metadata: &Metadata, body: &[u8]) -> Vec<u8> {
    let block = format!(
        "Title = {}\nLastEditedAt = {}\n",
        basic_string(&metadata.title),
        metadata.last_edited_at.as_secs()
    );

    let mut out = Vec::with_capacity(block.len() + 1 + DELIMITER.len() + body.len());
    out.extend_from_slice(block.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(DELIMITER);
    out.extend_from_slice(body);
    out
}

/// Quote `value` as a TOML basic string, escaping every control character.
fn basic_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn find_delimiter(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}

/// Render a Markdown body to HTML.
///
/// Extensions: tables, strikethrough, bare `http(s)://` autolinks, and hard
/// line breaks (every newline inside a paragraph becomes `<br />`). Invalid
/// UTF-8 is replaced, never rejected.
pub fn to_html(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = TextMergeStream::new(Parser::new_ext(&text, options)).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, Autolinker::new(events));
    out
}

/// Wraps bare URLs in text events with link events.
///
/// Text inside links, images and code blocks is left alone.
struct Autolinker<'a, I> {
    inner: I,
    pending: VecDeque<Event<'a>>,
    depth: usize,
}

impl<'a, I: Iterator<Item = Event<'a>>> Autolinker<'a, I> {
    fn new(inner: I) -> Self {
        Self {
            inner,
            pending: VecDeque::new(),
            depth: 0,
        }
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for Autolinker<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        let event = self.inner.next()?;
        match &event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                self.depth += 1;
            }
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                self.depth = self.depth.saturating_sub(1);
            }
            Event::Text(text) if self.depth == 0 => {
                let pieces = split_urls(text);
                if pieces.iter().any(|p| matches!(p, Piece::Url(_))) {
                    for piece in pieces {
                        match piece {
                            Piece::Text(t) => self.pending.push_back(Event::Text(CowStr::from(t))),
                            Piece::Url(url) => {
                                self.pending.push_back(Event::Start(Tag::Link {
                                    link_type: LinkType::Autolink,
                                    dest_url: CowStr::from(url.clone()),
                                    title: CowStr::Borrowed(""),
                                    id: CowStr::Borrowed(""),
                                }));
                                self.pending.push_back(Event::Text(CowStr::from(url)));
                                self.pending.push_back(Event::End(TagEnd::Link));
                            }
                        }
                    }
                    return self.pending.pop_front();
                }
            }
            _ => {}
        }
        Some(event)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Piece {
    Text(String),
    Url(String),
}

const SCHEMES: [&str; 2] = ["https://", "http://"];

fn split_urls(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    // Start of text not yet pushed as a piece.
    let mut emitted = 0;
    let mut cursor = 0;

    while let Some(start) = next_url_start(text, cursor) {
        let tail = &text[start..];
        let end = tail
            .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '`'))
            .unwrap_or(tail.len());
        let url = tail[..end].trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'']);
        let scheme_len = SCHEMES
            .iter()
            .find(|s| url.starts_with(*s))
            .map_or(0, |s| s.len());

        if url.len() <= scheme_len {
            // A scheme with nothing after it stays plain text.
            cursor = start + 1;
            continue;
        }

        if start > emitted {
            pieces.push(Piece::Text(text[emitted..start].to_string()));
        }
        pieces.push(Piece::Url(url.to_string()));
        emitted = start + url.len();
        cursor = emitted;
    }

    if emitted < text.len() {
        pieces.push(Piece::Text(text[emitted..].to_string()));
    }
    pieces
}

/// Byte offset of the next URL scheme at or after `from` that starts a word.
fn next_url_start(text: &str, from: usize) -> Option<usize> {
    let mut search = from;
    loop {
        let haystack = text.get(search..)?;
        let offset = SCHEMES.iter().filter_map(|s| haystack.find(s)).min()?;
        let start = search + offset;
        let at_boundary = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        if at_boundary {
            return Some(start);
        }
        search = start + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STORED: &[u8] = b"Title = \"Test\"\nLastEditedAt = 1557593441\n\n\n+++\n\n# Test Heading\nThis is just some test text\n";

    fn test_metadata() -> Metadata {
        Metadata {
            title: "Test".into(),
            last_edited_at: Timestamp::from_secs(1_557_593_441),
        }
    }

    #[test]
    fn parse_stored_article() {
        let (metadata, body) = parse(STORED).unwrap();
        assert_eq!(metadata, test_metadata());
        assert_eq!(body, b"\n# Test Heading\nThis is just some test text\n");
    }

    #[test]
    fn serialize_matches_stored_bytes() {
        let bytes = serialize(&test_metadata(), b"\n# Test Heading\nThis is just some test text\n");
        assert_eq!(bytes, STORED);
    }

    #[test]
    fn missing_delimiter_is_malformed() {
        let err = parse(b"Title = \"Test\"\nLastEditedAt = 1\n# body").unwrap_err();
        assert!(matches!(err, CodecError::MissingDelimiter));
    }

    #[test]
    fn undecodable_metadata_is_malformed() {
        let err = parse(b"Title = \nLastEditedAt = 1\n+++\nbody").unwrap_err();
        assert!(matches!(err, CodecError::InvalidMetadata(_)));

        let err = parse(b"Title = \"only a title\"\n+++\nbody").unwrap_err();
        assert!(matches!(err, CodecError::InvalidMetadata(_)));

        let err = parse(b"Title = \"\xff\"\nLastEditedAt = 1\n+++\nbody").unwrap_err();
        assert!(matches!(err, CodecError::NonUtf8Metadata(_)));
    }

    #[test]
    fn unknown_metadata_keys_are_ignored() {
        let (metadata, body) = parse(b"Title = \"T\"\nLastEditedAt = 5\nAuthor = \"x\"\n+++\nbody").unwrap();
        assert_eq!(metadata.title, "T");
        assert_eq!(body, b"body");
    }

    #[test]
    fn body_may_contain_the_delimiter() {
        let body = b"before\n+++\nafter";
        let bytes = serialize(&test_metadata(), body);
        let (_, parsed) = parse(&bytes).unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn multiline_titles_are_escaped() {
        let metadata = Metadata {
            title: "line one\n+++\nline two\r\n".into(),
            ..test_metadata()
        };
        let bytes = serialize(&metadata, b"body");
        assert!(bytes.starts_with(b"Title = \"line one\\n+++\\nline two\\r\\n\"\n"));
        assert_eq!(parse(&bytes).unwrap(), (metadata, b"body".to_vec()));
    }

    #[test]
    fn quotes_and_control_characters_are_escaped() {
        assert_eq!(basic_string("say \"hi\" \\o/"), "\"say \\\"hi\\\" \\\\o/\"");
        assert_eq!(basic_string("a\tb\u{1}\u{7f}"), "\"a\\tb\\u0001\\u007F\"");
    }

    #[test]
    fn html_for_heading_and_paragraph() {
        let html = to_html(b"# Test Heading\nThis is just some test text\n");
        assert_eq!(html, "<h1>Test Heading</h1>\n<p>This is just some test text</p>\n");
    }

    #[test]
    fn newlines_become_hard_breaks() {
        assert_eq!(to_html(b"one\ntwo\n"), "<p>one<br />\ntwo</p>\n");
    }

    #[test]
    fn tables_and_strikethrough_are_enabled() {
        let html = to_html(b"| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn bare_urls_are_linked() {
        let html = to_html(b"See https://example.com/docs. Thanks\n");
        assert_eq!(
            html,
            "<p>See <a href=\"https://example.com/docs\">https://example.com/docs</a>. Thanks</p>\n"
        );
    }

    #[test]
    fn urls_in_code_and_links_are_untouched() {
        let html = to_html(b"`http://a.example`\n\n```\nhttp://b.example\n```\n\n[c](http://c.example)\n");
        assert!(html.contains("<code>http://a.example</code>"));
        assert!(html.contains("<pre><code>http://b.example\n</code></pre>"));
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn bare_scheme_is_not_a_link() {
        assert_eq!(to_html(b"just http:// here\n"), "<p>just http:// here</p>\n");
    }

    #[test]
    fn scheme_inside_word_is_not_a_link() {
        assert_eq!(split_urls("xhttp://a"), vec![Piece::Text("xhttp://a".into())]);
    }

    #[test]
    fn split_urls_keeps_surrounding_text() {
        assert_eq!(
            split_urls("a http://x.y and https://z.w!"),
            vec![
                Piece::Text("a ".into()),
                Piece::Url("http://x.y".into()),
                Piece::Text(" and ".into()),
                Piece::Url("https://z.w".into()),
                Piece::Text("!".into()),
            ]
        );
    }

    #[test]
    fn invalid_utf8_body_still_renders() {
        let html = to_html(b"caf\xe9\n");
        assert!(html.starts_with("<p>caf"));
    }

    proptest! {
        #[test]
        fn serialize_then_parse_is_identity(
            title in "[a-zA-Z0-9 _.,:;'\"\\\\!?()/+\n\r\täöüé\u{1}\u{7f}-]{0,40}",
            secs in any::<i64>(),
            body in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let metadata = Metadata { title, last_edited_at: Timestamp::from_secs(secs) };
            let bytes = serialize(&metadata, &body);
            let (parsed_metadata, parsed_body) = parse(&bytes).unwrap();
            prop_assert_eq!(parsed_metadata, metadata);
            prop_assert_eq!(parsed_body, body);
        }
    }
}
