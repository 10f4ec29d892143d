//! Plain-text rendering of result listings and single messages.

use std::io::{self, Write};

use crossterm::style::{style, Color, Stylize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::DisplayConfig;
use crate::model::mail::SearchHit;
use crate::parser::mime::DecodedMessage;
use crate::search::highlight;

use super::state::Pager;

const RULE_WIDTH: usize = 80;

/// Headers printed above a message body, as `(label, header name)`.
const DETAIL_HEADERS: [(&str, &str); 4] = [
    ("From", "from"),
    ("To", "to"),
    ("Subject", "subject"),
    ("Date", "date"),
];

/// Terminal colors, or none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    color: bool,
}

impl Palette {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    fn paint(&self, s: &str, color: Color, bold: bool) -> String {
        if !self.color {
            return s.to_string();
        }
        let styled = style(s).with(color);
        if bold {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    }

    pub fn header(&self, s: &str) -> String {
        self.paint(s, Color::Blue, false)
    }

    pub fn prompt(&self, s: &str) -> String {
        self.paint(s, Color::Yellow, false)
    }

    pub fn error(&self, s: &str) -> String {
        self.paint(s, Color::Red, false)
    }

    /// Match marker. Without colors, matches are wrapped in `*`.
    pub fn highlight(&self, s: &str) -> String {
        if self.color {
            self.paint(s, Color::Red, true)
        } else {
            format!("*{s}*")
        }
    }
}

/// Column widths of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub date: usize,
    pub sender: usize,
    pub subject: usize,
}

impl From<&DisplayConfig> for Columns {
    fn from(cfg: &DisplayConfig) -> Self {
        Self {
            date: cfg.date_width,
            sender: cfg.sender_width,
            subject: cfg.subject_width,
        }
    }
}

impl Default for Columns {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

/// Write the current page of results.
pub fn render_listing(
    out: &mut dyn Write,
    hits: &[SearchHit],
    pager: &Pager,
    term: &str,
    palette: Palette,
    columns: Columns,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "--- Found {} matching emails ---", hits.len())?;
    if pager.total_pages() > 1 {
        writeln!(
            out,
            "--- Page {} of {} ---",
            pager.page() + 1,
            pager.total_pages()
        )?;
    }

    for index in pager.visible() {
        let hit = &hits[index];
        let date = fit(&hit.date, columns.date, true);
        let sender = fit(&hit.sender, columns.sender, true);
        let subject = fit(&hit.subject, columns.subject, false);
        let subject = highlight(&subject, term, |m| palette.highlight(m));
        writeln!(
            out,
            "[{:03}] {} | {} | {}",
            index + 1,
            palette.header(&date),
            sender,
            subject
        )?;
    }
    Ok(())
}

/// The listing prompt.
pub fn prompt(palette: Palette) -> String {
    palette.prompt("Enter # to view, 'n'/'p' for next/prev page, '+'/'-' to resize, or 'q' to quit: ")
}

/// Write one decoded message with `term` highlighted in its body.
pub fn render_message(
    out: &mut dyn Write,
    message: &DecodedMessage,
    term: &str,
    palette: Palette,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    for (label, name) in DETAIL_HEADERS {
        let value = message.headers.get(name).unwrap_or("N/A");
        writeln!(out, "{} {}", palette.header(&format!("{label:<10}:")), value)?;
    }
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

    match message.display_text() {
        Some(body) => {
            let body = highlight(&body, term, |m| palette.highlight(m));
            writeln!(out, "{}", body.trim_end())?;
        }
        None => writeln!(out, "[No text content]")?,
    }
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out)?;
    Ok(())
}

/// Truncate `s` to at most `width` columns, optionally padding with spaces.
/// Control characters are shown as spaces.
fn fit(s: &str, width: usize, pad: bool) -> String {
    let mut result = String::with_capacity(width);
    let mut used = 0;
    for ch in s.chars() {
        let ch = if ch.is_control() { ' ' } else { ch };
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        result.push(ch);
        used += w;
    }
    if pad {
        let current = UnicodeWidthStr::width(result.as_str());
        result.extend(std::iter::repeat_n(' ', width.saturating_sub(current)));
    }
    result
}
