//! Playlist rewriting for the same-origin proxy.
//!
//! Every URI a player could fetch from a playlist is replaced with
//! `/proxy?url=<percent-encoded absolute URI>`, so sub-playlists, segments,
//! init sections and keys all flow back through the proxy.
//!
//! Rewriting runs in two passes over the text:
//! 1. **Absolute sweep**: every `http://` / `https://` token on any line,
//!    tag lines included, is wrapped in place.
//! 2. **Line sweep**: each bare URI line that is not yet wrapped is resolved
//!    against the playlist's own URL and wrapped; `URI="..."` attributes on tag
//!    lines get the same treatment.
//!
//! The second pass relies on the first having run: a line that already starts
//! with the proxy prefix is left alone, which is what keeps the rewrite
//! idempotent.
//!
//! Lines are split on `\n` and joined back with `\n`, so line count, order,
//! blank lines, a trailing `\r` and the final newline all survive unchanged.
//! Lines that cannot be resolved are kept verbatim rather than failing the
//! whole playlist.

use tracing::{debug, warn};
use url::Url;

/// Route the proxy is mounted on
pub const PROXY_PATH: &str = "/proxy";

/// Prefix of every proxy-wrapped URI
const PROXY_PREFIX: &str = "/proxy?url=";

/// Quoted URI attribute as used by `EXT-X-KEY`, `EXT-X-MAP`, `EXT-X-MEDIA`, ...
const URI_ATTRIBUTE: &str = "URI=\"";

/// Wrap an absolute upstream URI into a same-origin proxy reference.
///
/// Everything outside `A-Za-z0-9-_.~` is percent-encoded, so a nested query
/// string (`?a=1&b=2`) cannot leak into the proxy's own query.
pub fn proxy_url(target: &str) -> String {
    format!("{}{}", PROXY_PREFIX, urlencoding::encode(target))
}

/// Inverse of [`proxy_url`]. Returns `None` for anything that is not a
/// proxy reference or does not decode to UTF-8.
pub fn target_from_proxy_url(proxied: &str) -> Option<String> {
    let encoded = proxied.strip_prefix(PROXY_PREFIX)?;
    urlencoding::decode(encoded).ok().map(|s| s.into_owned())
}

/// Rewrite a playlist body fetched from `base` so every URI in it points at
/// the proxy.
pub fn rewrite_playlist(body: &str, base: &Url) -> String {
    let swept = sweep_absolute_uris(body);
    let rewritten = sweep_lines(&swept, base);
    debug!(
        "Rewrote playlist from {} ({} -> {} bytes)",
        base,
        body.len(),
        rewritten.len()
    );
    rewritten
}

/// One line of playlist text, without its line terminator.
enum Line<'a> {
    Blank,
    Tag,
    Uri(&'a str),
}

impl<'a> Line<'a> {
    fn classify(content: &'a str) -> Self {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            Line::Blank
        } else if trimmed.starts_with('#') {
            Line::Tag
        } else {
            Line::Uri(trimmed)
        }
    }
}

/// Split a trailing `\r` off so CRLF playlists keep their line endings.
fn split_cr(line: &str) -> (&str, &str) {
    match line.strip_suffix('\r') {
        Some(content) => (content, "\r"),
        None => (line, ""),
    }
}

// ── Pass 1: absolute URIs anywhere ───────────────────────────────────────────

fn sweep_absolute_uris(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + body.len() / 2);

    for (idx, line) in body.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let in_tag = line.trim_start().starts_with('#');
        wrap_absolute_uris(line, in_tag, &mut out);
    }

    out
}

/// Copy `line` into `out`, wrapping each absolute URI token.
///
/// A token ends at whitespace. Inside a tag it also ends at a double quote,
/// so quoted attribute values keep their closing quote.
fn wrap_absolute_uris(line: &str, in_tag: bool, out: &mut String) {
    let mut rest = line;

    while let Some((start, scheme_len)) = find_absolute_uri(rest) {
        out.push_str(&rest[..start]);

        let candidate = &rest[start..];
        let end = candidate
            .find(|c: char| c.is_whitespace() || (in_tag && c == '"'))
            .unwrap_or(candidate.len());

        if end > scheme_len {
            out.push_str(&proxy_url(&candidate[..end]));
        } else {
            // bare "http://" with nothing after it
            out.push_str(&candidate[..end]);
        }

        rest = &candidate[end..];
    }

    out.push_str(rest);
}

/// Byte offset and scheme length of the first `http://` or `https://`.
fn find_absolute_uri(haystack: &str) -> Option<(usize, usize)> {
    let mut from = 0;

    while let Some(pos) = haystack[from..].find("http") {
        let at = from + pos;
        let tail = &haystack[at + 4..];
        if tail.starts_with("://") {
            return Some((at, "http://".len()));
        }
        if tail.starts_with("s://") {
            return Some((at, "https://".len()));
        }
        from = at + 4;
    }

    None
}

// ── Pass 2: URI lines and URI attributes ─────────────────────────────────────

fn sweep_lines(text: &str, base: &Url) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);

    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
        }

        let (content, cr) = split_cr(line);
        match Line::classify(content) {
            Line::Blank => out.push_str(line),
            Line::Tag => {
                rewrite_uri_attributes(content, base, &mut out);
                out.push_str(cr);
            }
            Line::Uri(reference) => match proxy_reference(reference, base) {
                Some(proxied) => {
                    out.push_str(&proxied);
                    out.push_str(cr);
                }
                None => out.push_str(line),
            },
        }
    }

    out
}

/// Copy a tag line into `out`, wrapping every `URI="..."` value that is not
/// proxied yet.
fn rewrite_uri_attributes(tag: &str, base: &Url, out: &mut String) {
    let mut rest = tag;

    while let Some(at) = find_uri_attribute(rest) {
        let value_start = at + URI_ATTRIBUTE.len();
        out.push_str(&rest[..value_start]);

        let after = &rest[value_start..];
        let Some(value_len) = after.find('"') else {
            // Unterminated quote: keep the remainder as-is
            rest = after;
            break;
        };

        let value = &after[..value_len];
        match proxy_reference(value, base) {
            Some(proxied) => out.push_str(&proxied),
            None => out.push_str(value),
        }
        rest = &after[value_len..];
    }

    out.push_str(rest);
}

/// Offset of the next `URI="` that starts an attribute (preceded by `:` or `,`).
fn find_uri_attribute(haystack: &str) -> Option<usize> {
    let mut from = 0;

    while let Some(pos) = haystack[from..].find(URI_ATTRIBUTE) {
        let at = from + pos;
        if matches!(haystack[..at].chars().next_back(), Some(':' | ',')) {
            return Some(at);
        }
        from = at + URI_ATTRIBUTE.len();
    }

    None
}

/// Proxy-wrap one URI reference.
///
/// Returns `None` when the reference must stay as it is: empty, already
/// proxied, or not resolvable against `base`.
fn proxy_reference(reference: &str, base: &Url) -> Option<String> {
    if reference.is_empty() || reference.starts_with(PROXY_PREFIX) {
        return None;
    }

    // Absolute references are wrapped byte-for-byte, never re-serialized
    if Url::parse(reference).is_ok() {
        return Some(proxy_url(reference));
    }

    match base.join(reference) {
        Ok(resolved) => Some(proxy_url(resolved.as_str())),
        Err(e) => {
            warn!(
                "Leaving unresolvable playlist reference {:?} untouched: {}",
                reference, e
            );
            None
        }
    }
}
