//! Message decoding: header map plus every text-typed MIME part.
//!
//! This is best effort by construction. `mail-parser` handles transfer
//! encodings and charsets; when it gives up, the body after the first blank
//! line is used as a single plain-text part.

use mail_parser::{Message, MessageParser, PartType};
use tracing::debug;

use crate::error::{MboxError, Result};
use crate::parser::header::Headers;
use crate::parser::mbox::{strip_bom, FROM_MARKER};

/// Maximum nesting of `message/rfc822` parts that is descended into.
const MAX_DEPTH: usize = 10;

/// Kind of a decoded text part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Plain,
    Html,
}

/// One decoded `text/*` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPart {
    pub kind: TextKind,
    pub text: String,
}

impl TextPart {
    /// Plain-text rendering of the part.
    pub fn as_plain(&self) -> String {
        match self.kind {
            TextKind::Plain => self.text.clone(),
            TextKind::Html => html_to_text(&self.text),
        }
    }
}

/// Result of decoding one raw message.
#[derive(Debug, Clone, Default)]
pub struct DecodedMessage {
    pub headers: Headers,
    pub parts: Vec<TextPart>,
}

impl DecodedMessage {
    /// All text parts, rendered to plain text and joined with newlines.
    pub fn body_text(&self) -> String {
        self.parts
            .iter()
            .map(TextPart::as_plain)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The part best suited for reading: the first `text/plain` part,
    /// otherwise the first HTML part converted to text.
    pub fn display_text(&self) -> Option<String> {
        self.parts
            .iter()
            .find(|p| p.kind == TextKind::Plain)
            .or_else(|| self.parts.first())
            .map(TextPart::as_plain)
    }
}

/// Decode a raw message as cut by the segmenter.
///
/// `offset` is only used for error reporting. Fails only when there is
/// nothing to decode at all.
pub fn decode_message(raw_message: &[u8], offset: u64) -> Result<DecodedMessage> {
    let message_bytes = skip_from_line(raw_message);
    if message_bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(MboxError::ParseError {
            offset,
            reason: "message has no content".into(),
        });
    }

    let header_end = find_header_end(message_bytes).unwrap_or(message_bytes.len());
    let headers = Headers::parse(&message_bytes[..header_end]);

    let parts = match MessageParser::default().parse(message_bytes) {
        Some(msg) => {
            let mut parts = Vec::new();
            collect_text_parts(&msg, 0, &mut parts);
            parts
        }
        None => {
            debug!(offset, "mail-parser rejected message, using raw body");
            let body = extract_body_fallback(message_bytes);
            if body.is_empty() {
                Vec::new()
            } else {
                vec![TextPart {
                    kind: TextKind::Plain,
                    text: body,
                }]
            }
        }
    };

    Ok(DecodedMessage { headers, parts })
}

/// Walk every part of `msg` in order, descending into attached messages.
fn collect_text_parts(msg: &Message<'_>, depth: usize, out: &mut Vec<TextPart>) {
    for part in &msg.parts {
        if part.is_encoding_problem {
            debug!("Text part had decoding problems, keeping lossy text");
        }
        match &part.body {
            PartType::Text(text) => out.push(TextPart {
                kind: TextKind::Plain,
                text: text.to_string(),
            }),
            PartType::Html(html) => out.push(TextPart {
                kind: TextKind::Html,
                text: html.to_string(),
            }),
            PartType::Message(nested) if depth < MAX_DEPTH => {
                collect_text_parts(nested, depth + 1, out);
            }
            _ => {}
        }
    }
}

/// Skip the `From ` separator line (and a byte order mark before it) at
/// the start of MBOX messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = strip_bom(data);
    if data.starts_with(FROM_MARKER) {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
        return &[];
    }
    data
}

/// Find the byte offset where headers end (position of the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    if data.starts_with(b"\n") || data.starts_with(b"\r\n") {
        return Some(0);
    }
    (0..data.len()).find(|&i| {
        data[i..].starts_with(b"\n\n") || data[i..].starts_with(b"\r\n\r\n")
    })
}

/// Everything after the first blank line, decoded lossily.
fn extract_body_fallback(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    if let Some(pos) = text.find("\r\n\r\n") {
        if text.find("\n\n").is_none_or(|lf| lf > pos) {
            return text[pos + 4..].to_string();
        }
    }
    match text.find("\n\n") {
        Some(pos) => text[pos + 2..].to_string(),
        None => String::new(),
    }
}

/// Convert HTML to plain text for indexing and terminal display.
///
/// - Preserves line breaks from `<br>`, `<p>`, `<div>` and friends
/// - Removes scripts and styles
/// - Decodes common HTML entities
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    let mut result = String::with_capacity(text.len());
    let mut tag = String::new();
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                if is_block_tag(&tag) {
                    result.push('\n');
                }
            }
            _ if in_tag => tag.push(ch),
            _ => result.push(ch),
        }
    }

    for (entity, replacement) in [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", " "),
        ("&#160;", " "),
        ("&amp;", "&"),
    ] {
        result = result.replace(entity, replacement);
    }

    // Collapse runs of blank lines into one
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(result.len());
    for line in result.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

fn is_block_tag(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(
        name.as_str(),
        "br" | "p" | "div" | "tr" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
fn remove_tag_block(html: &str, tag: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut result = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = lower[pos..].find(&open).map(|i| pos + i) {
        result.push_str(&html[pos..start]);
        match lower[start..].find(&close) {
            Some(end) => pos = start + end + close.len(),
            None => {
                pos = html.len();
                break;
            }
        }
    }
    result.push_str(&html[pos..]);
    result
}
