//! Post-processing of generator output.
//!
//! Removes the synthetic aggregator declaration and prepends the banner.

use std::fmt;
use typebridge_schema::ForcedInclusion;

/// Header written above every generated file.
pub const BANNER: &str = "/* tslint:disable */\n\
/**\n\
/* This file was automatically generated from pydantic models by running typebridge.\n\
/* Do not modify it by hand - just update the pydantic models and then re-run the script\n\
*/\n\
\n";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FinalizeError {
    #[error("generator output has no declaration for the aggregator `{name}`")]
    AggregatorNotFound { name: String },
}

/// Final text of a generated file: banner plus declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    text: String,
}

impl OutputDocument {
    /// A file with nothing but the banner.
    pub fn empty() -> Self {
        Self {
            text: BANNER.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Declarations below the banner.
    pub fn declarations(&self) -> &str {
        &self.text[BANNER.len()..]
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for OutputDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Strip the `aggregator` declaration from `raw` and prepend the banner.
///
/// A missing declaration is an error only when `inclusion` put one in the
/// schema root.
pub fn finalize(
    raw: &str,
    aggregator: &str,
    inclusion: ForcedInclusion,
) -> Result<OutputDocument, FinalizeError> {
    let body = match remove_declaration(raw, aggregator) {
        Some(body) => body,
        None if inclusion.expects_aggregator() => {
            return Err(FinalizeError::AggregatorNotFound {
                name: aggregator.to_string(),
            });
        }
        None => raw.to_string(),
    };

    let mut text = String::with_capacity(BANNER.len() + body.len());
    text.push_str(BANNER);
    text.push_str(&body);
    Ok(OutputDocument { text })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclarationKind {
    Interface,
    Alias,
}

/// `text` without the top-level declaration of `name`, its JSDoc block and
/// one trailing blank line.
fn remove_declaration(text: &str, name: &str) -> Option<String> {
    let start = top_level_line_starts(text)
        .into_iter()
        .find_map(|offset| header(&text[offset..], name).map(|kind| (offset, kind)));
    let (start, kind) = start?;

    let mut end = start + declaration_len(&text[start..], kind);
    end += text[end..].find('\n').map_or(text.len() - end, |i| i + 1);
    if text[end..].starts_with('\n') {
        end += 1;
    }

    let start = jsdoc_start(&text[..start]).unwrap_or(start);
    let mut out = String::with_capacity(text.len() - (end - start));
    out.push_str(&text[..start]);
    out.push_str(&text[end..]);
    Some(out)
}

fn header(line: &str, name: &str) -> Option<DeclarationKind> {
    [
        ("export interface ", DeclarationKind::Interface),
        ("export type ", DeclarationKind::Alias),
    ]
    .into_iter()
    .find_map(|(keyword, kind)| {
        let rest = line.strip_prefix(keyword)?.strip_prefix(name)?;
        rest.starts_with([' ', '{', '<', '=']).then_some(kind)
    })
}

/// Length of the declaration at the start of `text`, up to its closing
/// brace (interfaces) or terminating semicolon (aliases).
fn declaration_len(text: &str, kind: DeclarationKind) -> usize {
    let end = scan(text, |offset, c, depth| match (kind, c) {
        (DeclarationKind::Interface, '}') if depth == 1 => Some(offset + 1),
        (DeclarationKind::Alias, ';') if depth == 0 => Some(offset + 1),
        _ => None,
    });
    end.unwrap_or(text.len())
}

/// Offsets of lines that begin outside any bracket, comment or string.
fn top_level_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    scan(text, |offset, c, depth| {
        if c == '\n' && depth == 0 {
            starts.push(offset + 1);
        }
        None::<()>
    });
    starts.retain(|&s| s < text.len());
    starts
}

/// Start of a `/** ... */` block that ends on the line right before
/// `before`'s end.
fn jsdoc_start(before: &str) -> Option<usize> {
    let above = before.strip_suffix('\n')?;
    if !above.trim_end_matches([' ', '\t', '\r']).ends_with("*/") {
        return None;
    }
    let close = above.rfind("*/")?;
    let open = above[..close].rfind("/*")?;
    if !above[open..].starts_with("/**") {
        return None;
    }
    let line_start = above[..open].rfind('\n').map_or(0, |i| i + 1);
    above[line_start..open]
        .trim()
        .is_empty()
        .then_some(line_start)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    LineComment,
    BlockComment,
    Str(char),
}

/// Walk the code characters of `text` (skipping comments and string
/// literals), passing each with the bracket depth before it. Stops at the
/// first `Some` returned by `visit`.
fn scan<T>(text: &str, mut visit: impl FnMut(usize, char, usize) -> Option<T>) -> Option<T> {
    let mut state = Lex::Code;
    let mut depth = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match state {
            Lex::LineComment => {
                if c != '\n' {
                    continue;
                }
                state = Lex::Code;
            }
            Lex::BlockComment => {
                if c == '*' && chars.next_if(|&(_, n)| n == '/').is_some() {
                    state = Lex::Code;
                }
                continue;
            }
            Lex::Str(quote) => {
                if c == '\\' {
                    chars.next();
                } else if c == quote {
                    state = Lex::Code;
                }
                continue;
            }
            Lex::Code => {}
        }

        match c {
            '/' if chars.next_if(|&(_, n)| n == '/').is_some() => {
                state = Lex::LineComment;
                continue;
            }
            '/' if chars.next_if(|&(_, n)| n == '*').is_some() => {
                state = Lex::BlockComment;
                continue;
            }
            '"' | '\'' | '`' => {
                state = Lex::Str(c);
                continue;
            }
            _ => {}
        }

        if let Some(found) = visit(offset, c, depth) {
            return Some(found);
        }
        match c {
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}
