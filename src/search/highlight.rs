//! Case-insensitive literal highlighting of a search term.

use std::borrow::Cow;

use regex::RegexBuilder;

/// Wrap every case-insensitive occurrence of `term` in `text` with `paint`.
///
/// `term` is matched literally (regex metacharacters have no meaning) and
/// the text between matches is copied unchanged. An empty term returns the
/// text as-is.
pub fn highlight<'a, F>(text: &'a str, term: &str, paint: F) -> Cow<'a, str>
where
    F: Fn(&str) -> String,
{
    if term.is_empty() {
        return Cow::Borrowed(text);
    }
    let Ok(re) = RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    else {
        return Cow::Borrowed(text);
    };

    if !re.is_match(text) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for m in re.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        out.push_str(&paint(m.as_str()));
        last = m.end();
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}
