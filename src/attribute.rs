//! Indentation-scoped attribute text.
//!
//! Each line holds a name and an optional value; lines indented deeper than
//! the previous one become its children:
//!
//! ```text
//! node Math
//!   id Math1
//!   in A
//!     real 4
//! ```
//!
//! Values that would not survive a re-read unchanged (empty strings,
//! surrounding whitespace, quotes, backslashes, newlines) are written
//! double-quoted with backslash escapes. Lines whose first non-blank
//! character is `#` are comments.

use std::fmt::Write as _;

const INDENT: usize = 2;

/// Errors from reading attribute text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributeError {
    #[error("line {line}: unterminated quoted value")]
    UnterminatedQuote { line: usize },
    #[error("line {line}: unknown escape \\{escape}")]
    BadEscape { line: usize, escape: char },
    #[error("line {line}: text after closing quote")]
    TrailingText { line: usize },
}

/// One node of an attribute tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
    pub children: Vec<Attribute>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            children: Vec::new(),
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Append a leaf child `name value`.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.children.push(Attribute::with_value(name, value));
        self
    }

    /// Append a valueless leaf child, used for flags like `collapsed`.
    pub fn push_flag(&mut self, name: impl Into<String>) -> &mut Self {
        self.children.push(Attribute::new(name));
        self
    }

    /// Append a child that will receive its own children, returning it.
    pub fn push_sub(&mut self, name: impl Into<String>, value: Option<&str>) -> &mut Attribute {
        let mut att = Attribute::new(name);
        att.value = value.map(str::to_string);
        self.children.push(att);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// First child with the given name.
    pub fn find(&self, name: &str) -> Option<&Attribute> {
        self.children.iter().find(|att| att.name == name)
    }

    pub fn value_str(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Render the children of this attribute as text. The root's own
    /// name and value are not written.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_into(&mut out, 0);
        }
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        let _ = write!(out, "{:width$}{}", "", self.name, width = depth * INDENT);
        if let Some(value) = &self.value {
            out.push(' ');
            out.push_str(&quote_if_needed(value));
        }
        out.push('\n');
        for child in &self.children {
            child.write_into(out, depth + 1);
        }
    }

    /// Parse attribute text into an unnamed root holding the top-level entries.
    pub fn parse(text: &str) -> Result<Attribute, AttributeError> {
        // (indent, attribute) pairs for the open chain of ancestors.
        let mut stack: Vec<(isize, Attribute)> = vec![(-1, Attribute::default())];

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let indent = indent_width(raw) as isize;
            let (name, rest) = match trimmed.find(char::is_whitespace) {
                Some(at) => (&trimmed[..at], trimmed[at..].trim()),
                None => (trimmed, ""),
            };
            let value = if rest.is_empty() {
                None
            } else {
                Some(unquote(rest, line_no)?)
            };

            while stack.len() > 1 && stack[stack.len() - 1].0 >= indent {
                close_top(&mut stack);
            }
            stack.push((
                indent,
                Attribute {
                    name: name.to_string(),
                    value,
                    children: Vec::new(),
                },
            ));
        }

        while stack.len() > 1 {
            close_top(&mut stack);
        }
        Ok(stack.pop().map(|(_, root)| root).unwrap_or_default())
    }
}

fn close_top(stack: &mut Vec<(isize, Attribute)>) {
    if let Some((_, done)) = stack.pop() {
        if let Some((_, parent)) = stack.last_mut() {
            parent.children.push(done);
        }
    }
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.starts_with('"')
        || value.trim() != value
        || value.contains(['\\', '\n', '\r'])
}

fn quote_if_needed(value: &str) -> String {
    if !needs_quotes(value) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

fn unquote(rest: &str, line: usize) -> Result<String, AttributeError> {
    let Some(body) = rest.strip_prefix('"') else {
        return Ok(rest.to_string());
    };

    let mut value = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if chars.as_str().trim().is_empty() {
                    return Ok(value);
                }
                return Err(AttributeError::TrailingText { line });
            }
            '\\' => match chars.next() {
                Some('"') => value.push('"'),
                Some('\\') => value.push('\\'),
                Some('n') => value.push('\n'),
                Some('r') => value.push('\r'),
                Some(escape) => return Err(AttributeError::BadEscape { line, escape }),
                None => return Err(AttributeError::UnterminatedQuote { line }),
            },
            other => value.push(other),
        }
    }
    Err(AttributeError::UnterminatedQuote { line })
}

/// Shortest decimal text that reads back to the same `f64`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Keeps -0 from leaking into files.
        return "0".to_string();
    }
    format!("{}", value)
}

/// Space separated numbers, as used by `matrix`, `xywh` and colors.
pub fn format_numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format_number(*v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse up to `N` whitespace or comma separated numbers. Returns how many
/// were read; unparsable text stops the scan.
pub fn parse_numbers<const N: usize>(text: &str, out: &mut [f64; N]) -> usize {
    let mut count = 0;
    for token in text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        if count == N {
            break;
        }
        match token.parse::<f64>() {
            Ok(v) => {
                out[count] = v;
                count += 1;
            }
            Err(_) => break,
        }
    }
    count
}

/// Boolean attribute values. A bare flag (no value) counts as true.
pub fn parse_bool(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => true,
        Some(v) => matches!(v.as_str(), "yes" | "true" | "on" | "1" | ""),
    }
}
