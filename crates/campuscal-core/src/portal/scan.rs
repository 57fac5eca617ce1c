//! Token scanners for the portal's HTML pages.
//!
//! The portal's pages are boilerplate and all the pipeline ever needs is "the
//! first element matching a predicate". A small tokenizer over tags and text
//! covers that without building a document tree. It understands quoted
//! attributes, comments, character references and the raw-text bodies of
//! `<script>`/`<style>`, and nothing else.

// ============================================================================
// Page markers
// ============================================================================

const INCORRECT_LOGIN_MARKER: &str =
    "<p>Bitte versuchen Sie es erneut. Überprüfen Sie ggf. Ihre Zugangsdaten.</p>";

const ACCESS_DENIED_MARKER: &str = "<body class=\"access_denied\">";

const NO_EVENTS_MARKER: &str = "<td class=\"tbdata_error\">Die Kalenderdatei konnte nicht erstellt werden, weil im gewählten Zeitraum keine Termine vorhanden sind.</td>";

/// `id` of the `<div>` holding the session identifier.
const SESSION_ID_ELEMENT_ID: &str = "sessionId";

/// Script name that identifies the calendar download link.
const FILE_TRANSFER_SCRIPT: &str = "filetransfer.exe";

/// Longest character reference we try to decode, `&` and `;` excluded.
const MAX_ENTITY_LEN: usize = 10;

/// The login page was shown again with the "check your credentials" hint.
pub fn is_incorrect_login(body: &str) -> bool {
    body.contains(INCORRECT_LOGIN_MARKER)
}

pub fn is_access_denied(body: &str) -> bool {
    body.contains(ACCESS_DENIED_MARKER)
}

/// The export page reports an empty range instead of offering a file.
pub fn has_no_events(body: &str) -> bool {
    body.contains(NO_EVENTS_MARKER)
}

/// Text content of the first `<div id="sessionId">`.
pub fn find_session_id(html: &str) -> Option<String> {
    let mut tokens = Tokenizer::new(html);
    while let Some(token) = tokens.next() {
        if token.is_start_tag("div") && token.attr("id") == Some(SESSION_ID_ELEMENT_ID) {
            return match tokens.next() {
                Some(Token::Text(text)) => {
                    Some(text.trim().to_string()).filter(|id| !id.is_empty())
                }
                _ => None,
            };
        }
    }
    None
}

/// `href` of the first anchor pointing at the file transfer script.
pub fn find_download_link(html: &str) -> Option<String> {
    Tokenizer::new(html)
        .filter(|token| token.is_start_tag("a"))
        .find_map(|token| {
            token
                .attr("href")
                .filter(|href| href.contains(FILE_TRANSFER_SCRIPT))
                .map(str::to_string)
        })
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Tag and attribute names are lowercased; attribute values are unescaped.
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
    },
    EndTag(String),
    Text(String),
}

impl Token {
    fn is_start_tag(&self, tag: &str) -> bool {
        matches!(self, Token::StartTag { name, .. } if name == tag)
    }

    fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Token::StartTag { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

pub(crate) struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    /// Set after `<script>`/`<style>`: the closing tag ending the raw text.
    raw_text_close: Option<&'static str>,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text_close: None,
        }
    }

    fn raw_text(&mut self, close: &str) -> Option<Token> {
        let rest = &self.input[self.pos..];
        // ASCII lowercasing keeps byte offsets intact
        let end = rest.to_ascii_lowercase().find(close).unwrap_or(rest.len());
        self.pos += end;
        (end > 0).then(|| Token::Text(rest[..end].to_string()))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(close) = self.raw_text_close.take() {
            if let Some(text) = self.raw_text(close) {
                return Some(text);
            }
        }

        loop {
            let rest = &self.input[self.pos..];
            if rest.is_empty() {
                return None;
            }

            if let Some(comment) = rest.strip_prefix("<!--") {
                self.pos += comment.find("-->").map_or(rest.len(), |i| i + 7);
                continue;
            }

            // Doctype and processing instructions
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos += rest.find('>').map_or(rest.len(), |i| i + 1);
                continue;
            }

            if starts_tag(rest) {
                let Some(len) = tag_len(rest) else {
                    // Unterminated tag at end of input
                    self.pos = self.input.len();
                    return None;
                };
                self.pos += len;
                let token = parse_tag(&rest[1..len - 1]);
                if let Token::StartTag { name, .. } = &token {
                    self.raw_text_close = raw_text_close(name);
                }
                return Some(token);
            }

            let len = text_len(rest);
            self.pos += len;
            return Some(Token::Text(unescape(&rest[..len])));
        }
    }
}

fn raw_text_close(tag: &str) -> Option<&'static str> {
    match tag {
        "script" => Some("</script"),
        "style" => Some("</style"),
        _ => None,
    }
}

fn starts_tag(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('<')
        && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/')
}

/// Length of a text run. A leading `<` that does not open markup is text.
fn text_len(rest: &str) -> usize {
    let skip = rest.chars().next().map_or(0, char::len_utf8);
    rest[skip..].find('<').map_or(rest.len(), |i| i + skip)
}

/// Length of the tag at the start of `rest`, up to and including `>`.
fn tag_len(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut after_equals = false;
    for (i, c) in rest.char_indices().skip(1) {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '>' => return Some(i + 1),
            '"' | '\'' if after_equals => quote = Some(c),
            _ => {}
        }
        if !c.is_whitespace() {
            after_equals = c == '=';
        }
    }
    None
}

/// Parse the inside of a tag, without the angle brackets.
fn parse_tag(inner: &str) -> Token {
    if let Some(closing) = inner.strip_prefix('/') {
        let name = closing.split_whitespace().next().unwrap_or("");
        return Token::EndTag(name.to_ascii_lowercase());
    }

    let name_len = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());

    Token::StartTag {
        name: inner[..name_len].to_ascii_lowercase(),
        attrs: parse_attrs(&inner[name_len..]),
    }
}

fn parse_attrs(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = s;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let key_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        if key_len == 0 {
            // Stray '='
            rest = &rest[1..];
            continue;
        }
        let key = rest[..key_len].to_ascii_lowercase();
        rest = rest[key_len..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(after) => {
                let after = after.trim_start();
                match after.chars().next() {
                    Some(q @ ('"' | '\'')) => {
                        let body = &after[1..];
                        let end = body.find(q).unwrap_or(body.len());
                        rest = body.get(end + 1..).unwrap_or("");
                        &body[..end]
                    }
                    _ => {
                        let end = after.find(char::is_whitespace).unwrap_or(after.len());
                        rest = &after[end..];
                        &after[..end]
                    }
                }
            }
            None => "",
        };

        attrs.push((key, unescape(value)));
    }

    attrs
}

/// Replace character references with the characters they stand for.
fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_entity(rest) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the reference at the start of `s` (which begins with `&`).
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let end = s.find(';')?;
    if end > MAX_ENTITY_LEN + 1 {
        return None;
    }

    let c = match &s[1..end] {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        name => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)?
        }
    };

    Some((c, end + 1))
}
