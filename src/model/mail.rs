//! Indexed message records.

use serde::Serialize;

use crate::parser::mime::DecodedMessage;

/// Shown and stored when the `From:` header is missing.
pub const NO_SENDER: &str = "No Sender";
/// Shown and stored when the `Subject:` header is missing.
pub const NO_SUBJECT: &str = "No Subject";
/// Shown and stored when the `Date:` header is missing.
pub const NO_DATE: &str = "No Date";

/// A message as persisted in the index store.
///
/// `[start_offset, end_offset)` is the exact byte range of the message in
/// the archive, envelope line included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    /// Surrogate row id, shared with the full-text entry.
    pub id: i64,
    pub message_id: String,
    pub sender: String,
    pub subject: String,
    /// Raw `Date:` header text. Not normalized.
    pub date: String,
    pub start_offset: u64,
    pub end_offset: u64,
}

impl MessageRecord {
    /// Size of the message in bytes.
    pub fn size(&self) -> u64 {
        self.end_offset - self.start_offset
    }
}

/// A row about to be inserted, together with its searchable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub message_id: String,
    pub sender: String,
    pub subject: String,
    pub date: String,
    pub start_offset: u64,
    pub end_offset: u64,
    pub body: String,
}

impl NewMessage {
    /// Derive the indexed fields of a decoded message.
    ///
    /// Missing headers get fixed placeholders, and a missing `Message-ID`
    /// is replaced by one derived from the start offset, which is unique
    /// within the archive.
    pub fn from_decoded(decoded: &DecodedMessage, start_offset: u64, end_offset: u64) -> Self {
        let headers = &decoded.headers;
        let message_id = headers
            .get_non_empty("message-id")
            .map(|id| id.trim().to_string())
            .unwrap_or_else(|| synthetic_message_id(start_offset));

        Self {
            message_id,
            sender: header_or(decoded, "from", NO_SENDER),
            subject: header_or(decoded, "subject", NO_SUBJECT),
            date: header_or(decoded, "date", NO_DATE),
            start_offset,
            end_offset,
            body: decoded.body_text(),
        }
    }
}

/// Key used for messages without a `Message-ID` header.
pub fn synthetic_message_id(start_offset: u64) -> String {
    format!("missing-id-{start_offset}")
}

fn header_or(decoded: &DecodedMessage, name: &str, placeholder: &str) -> String {
    decoded
        .headers
        .get(name)
        .map(str::to_string)
        .unwrap_or_else(|| placeholder.to_string())
}

/// One row of a search result listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub sender: String,
    pub subject: String,
    pub date: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::mime::decode_message;

    #[test]
    fn test_fields_from_headers() {
        let raw = b"From a@x\nFrom: Alice <a@x>\nSubject: Hi\nDate: Mon, 1 Jan 2024 10:00:00 +0000\n\
Message-ID:  <m1@x> \n\nbody\n";
        let decoded = decode_message(raw, 0).unwrap();
        let msg = NewMessage::from_decoded(&decoded, 100, 200);
        assert_eq!(msg.message_id, "<m1@x>");
        assert_eq!(msg.sender, "Alice <a@x>");
        assert_eq!(msg.subject, "Hi");
        assert_eq!(msg.date, "Mon, 1 Jan 2024 10:00:00 +0000");
        assert_eq!((msg.start_offset, msg.end_offset), (100, 200));
        assert!(msg.body.contains("body"));
    }

    #[test]
    fn test_placeholders_and_synthetic_id() {
        let decoded = decode_message(b"From a@x\nX-Other: 1\n\nbody\n", 0).unwrap();
        let msg = NewMessage::from_decoded(&decoded, 512, 600);
        assert_eq!(msg.message_id, "missing-id-512");
        assert_eq!(msg.sender, NO_SENDER);
        assert_eq!(msg.subject, NO_SUBJECT);
        assert_eq!(msg.date, NO_DATE);
    }

    #[test]
    fn test_blank_message_id_is_synthesized() {
        let decoded = decode_message(b"From a@x\nMessage-ID:\n\nbody\n", 0).unwrap();
        let msg = NewMessage::from_decoded(&decoded, 7, 30);
        assert_eq!(msg.message_id, "missing-id-7");
    }
}
