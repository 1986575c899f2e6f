//! HTML stripping shared by reply sanitising and FAQ page parsing.
//!
//! Fragments are rendered with `html2text` and its undecorated plain
//! config, so `<b>` does not turn into `**` and every named or numeric
//! entity is decoded by a real HTML parser.

use std::sync::OnceLock;

use regex::Regex;

/// Wrap width handed to the renderer; wide enough that no FAQ answer wraps.
const RENDER_WIDTH: usize = 4096;

fn tag_re() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").unwrap())
}

fn space_re() -> &'static Regex {
    static SPACE: OnceLock<Regex> = OnceLock::new();
    SPACE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Removes tags and decodes entities line by line. Line breaks are kept.
pub fn strip_tags(html: &str) -> String {
    if !html.contains(['<', '&']) {
        return html.to_string();
    }
    html.lines().map(to_plain_line).collect::<Vec<_>>().join("\n")
}

/// Text content of an HTML fragment on a single line.
pub fn to_plain_line(html: &str) -> String {
    let text = match html2text::config::plain_no_decorate().string_from_read(html.as_bytes(), RENDER_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, "html render failed, dropping tags only");
            tag_re().replace_all(html, "").into_owned()
        }
    };
    space_re().replace_all(&text, " ").trim().to_string()
}
