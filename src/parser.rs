//! Import statement extraction for stylesheet sources
//!
//! Only `@import` directives are recognised; everything else in a stylesheet is
//! opaque text. Comments are removed before scanning, so an import that is
//! commented out is never reported.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::ImportError;

/// Syntax family of a stylesheet, which decides how a directive ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntaxMode {
    /// `.scss` and `.css`: directives end with `;`
    #[default]
    Braces,
    /// `.sass`: directives end at the end of the line
    Indented,
}

impl SyntaxMode {
    /// Pick the syntax mode from a file extension.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("sass") => SyntaxMode::Indented,
            _ => SyntaxMode::Braces,
        }
    }
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex literal")
}

fn regex_braces_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // @import "a", 'b';  @import url("c.css");  @import (d);
    RE.get_or_init(|| regex(r"(?i)@import\s*(url\s*\()?\s*\(?([^;]+?)\)?\s*;"))
}

fn regex_indented_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(r"(?im)^[ \t]*@import[ \t]+(url[ \t]*\()?[ \t]*([^\r\n]*?)[ \t]*\)?[ \t]*;?[ \t\r]*$")
    })
}

/// Extract import targets from stylesheet text, in textual order.
///
/// Directives that use the `url(...)` wrapper and remote locations are left
/// out; they are plain CSS imports that never resolve to a local source.
pub fn parse(content: &str, mode: SyntaxMode) -> Result<Vec<String>, ImportError> {
    let cleaned = remove_comments(content);
    let re = match mode {
        SyntaxMode::Braces => regex_braces_import(),
        SyntaxMode::Indented => regex_indented_import(),
    };

    let mut targets = Vec::new();
    for caps in re.captures_iter(&cleaned) {
        if caps.get(1).is_some() {
            continue;
        }
        if let Some(arguments) = caps.get(2) {
            flatten_directive(arguments.as_str(), &mut targets)?;
        }
    }
    Ok(targets)
}

/// Split a directive argument list into individual unquoted targets.
fn flatten_directive(arguments: &str, targets: &mut Vec<String>) -> Result<(), ImportError> {
    for fragment in arguments.split(',') {
        let fragment = fragment.trim();
        if fragment.is_empty() || starts_with_url(fragment) {
            continue;
        }

        let target = strip_quotes(fragment)?.trim();
        if target.is_empty() || is_remote(target) {
            continue;
        }
        targets.push(target.to_string());
    }
    Ok(())
}

fn starts_with_url(fragment: &str) -> bool {
    fragment.len() >= 4 && fragment.as_bytes()[..4].eq_ignore_ascii_case(b"url(")
}

fn is_remote(target: &str) -> bool {
    target.starts_with("//") || target.starts_with("http://") || target.starts_with("https://")
}

/// Remove one matching pair of surrounding quotes.
///
/// A fragment that starts or ends with a quote without a matching partner is
/// rejected rather than passed through.
pub fn strip_quotes(fragment: &str) -> Result<&str, ImportError> {
    let bytes = fragment.as_bytes();
    let is_quote = |b: Option<&u8>| matches!(b, Some(b'"') | Some(b'\''));
    let (first, last) = (bytes.first(), bytes.last());

    match (is_quote(first), is_quote(last)) {
        (false, false) => Ok(fragment),
        (true, true) if bytes.len() >= 2 && first == last => Ok(&fragment[1..fragment.len() - 1]),
        _ => Err(ImportError::InvalidImportRule { rule: fragment.to_string(), file: None }),
    }
}

/// Strip `/* */` and `//` comments.
///
/// Comment markers inside quoted strings or `url(...)` are kept, so
/// `url("http://host/x.css")` survives. Newlines inside block comments are
/// preserved to keep line-based scanning aligned.
pub fn remove_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut quote: Option<char> = None;
    let mut in_url = false;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q || c == '\n' {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '(' => {
                if ends_with_url(&out) {
                    in_url = true;
                }
                out.push(c);
            }
            ')' | '\n' => {
                in_url = false;
                out.push(c);
            }
            '/' if !in_url && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    if inner == '\n' {
                        out.push('\n');
                    }
                    prev = inner;
                }
            }
            '/' if !in_url && chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn ends_with_url(text: &str) -> bool {
    let bytes = text.trim_end().as_bytes();
    bytes.len() >= 3 && bytes[bytes.len() - 3..].eq_ignore_ascii_case(b"url")
}
