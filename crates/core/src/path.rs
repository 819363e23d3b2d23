// Path expressions: dot/bracket notation parsed into component sequences

use crate::error::{PathError, PathResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{self, Write};
use std::iter::{Enumerate, Peekable};
use std::num::IntErrorKind;
use std::ops::Deref;
use std::str::{Chars, FromStr};

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathComponent {
    /// Object field name
    Key(String),
    /// Array position, negative values count from the end
    Index(i64),
    /// Every element of an array (read-only)
    SelectAll,
}

impl PathComponent {
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }
}

/// An ordered root-to-node traversal route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathComponent>);

impl Path {
    /// The empty path, addressing the root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, component: PathComponent) {
        self.0.push(component);
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.0
    }

    pub fn into_components(self) -> Vec<PathComponent> {
        self.0
    }

    /// Whether any component is a `SelectAll`
    pub fn contains_wildcard(&self) -> bool {
        self.0.iter().any(|c| matches!(c, PathComponent::SelectAll))
    }

    /// Render the first `len` components, for error locations
    pub(crate) fn prefix(&self, len: usize) -> String {
        Path(self.0[..len.min(self.0.len())].to_vec()).to_string()
    }
}

impl Deref for Path {
    type Target = [PathComponent];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<PathComponent>> for Path {
    fn from(components: Vec<PathComponent>) -> Self {
        Self(components)
    }
}

impl FromIterator<PathComponent> for Path {
    fn from_iter<I: IntoIterator<Item = PathComponent>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Canonical rendering; always parses back to an equal path.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            match component {
                PathComponent::Key(key) if key.is_empty() => f.write_str("[\"\"]")?,
                PathComponent::Key(key) => {
                    if i > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(&escape_key(key))?;
                }
                PathComponent::Index(index) => write!(f, "[{}]", index)?,
                PathComponent::SelectAll => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

/// Backslash-escape the characters that carry meaning in a dot path.
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        if matches!(ch, '.' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Anything that can be turned into a [`Path`]: raw text is parsed,
/// a parsed `Path` is borrowed as is.
pub trait AsPath {
    fn as_path(&self) -> PathResult<Cow<'_, Path>>;
}

impl AsPath for str {
    fn as_path(&self) -> PathResult<Cow<'_, Path>> {
        parse(self).map(Cow::Owned)
    }
}

impl AsPath for String {
    fn as_path(&self) -> PathResult<Cow<'_, Path>> {
        parse(self).map(Cow::Owned)
    }
}

impl AsPath for Path {
    fn as_path(&self) -> PathResult<Cow<'_, Path>> {
        Ok(Cow::Borrowed(self))
    }
}

type Cursor<'a> = Peekable<Enumerate<Chars<'a>>>;

/// Parse a path expression such as `a.b["c.d"][0][-1]` or `items[]`.
pub fn parse(text: &str) -> PathResult<Path> {
    let mut components = Vec::new();
    let mut buffer = String::new();
    let mut chars: Cursor<'_> = text.chars().enumerate().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\\' => buffer.push(escaped(&mut chars, pos)?),
            '.' => flush(&mut buffer, &mut components),
            '[' => {
                flush(&mut buffer, &mut components);
                components.push(parse_bracket(&mut chars, pos)?);
            }
            ']' => return Err(PathError::parse(pos, "unexpected ']' outside brackets")),
            other => buffer.push(other),
        }
    }
    flush(&mut buffer, &mut components);

    Ok(Path(components))
}

fn flush(buffer: &mut String, components: &mut Vec<PathComponent>) {
    if !buffer.is_empty() {
        components.push(PathComponent::Key(std::mem::take(buffer)));
    }
}

fn escaped(chars: &mut Cursor<'_>, backslash: usize) -> PathResult<char> {
    chars
        .next()
        .map(|(_, ch)| ch)
        .ok_or_else(|| PathError::parse(backslash, "unterminated escape"))
}

/// Parse the rest of a bracket group; the opening `[` is already consumed.
fn parse_bracket(chars: &mut Cursor<'_>, open: usize) -> PathResult<PathComponent> {
    if matches!(chars.peek(), Some((_, '"'))) {
        chars.next();
        return parse_quoted(chars, open);
    }

    let mut content = String::new();
    loop {
        match chars.next() {
            Some((_, ']')) => break,
            Some((pos, '\\')) => content.push(escaped(chars, pos)?),
            Some((_, ch)) => content.push(ch),
            None => return Err(PathError::parse(open, "unterminated '['")),
        }
    }

    if content.is_empty() {
        return Ok(PathComponent::SelectAll);
    }

    // Integers beyond i64 saturate and always resolve out of range
    match content.parse::<i64>() {
        Ok(index) => Ok(PathComponent::Index(index)),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(PathComponent::Index(i64::MAX)),
            IntErrorKind::NegOverflow => Ok(PathComponent::Index(i64::MIN)),
            _ => Err(PathError::parse(
                open + 1,
                format!("invalid array index '{}'", content),
            )),
        },
    }
}

fn parse_quoted(chars: &mut Cursor<'_>, open: usize) -> PathResult<PathComponent> {
    let mut key = String::new();
    loop {
        match chars.next() {
            Some((_, '"')) => break,
            Some((pos, '\\')) => key.push(escaped(chars, pos)?),
            Some((_, ch)) => key.push(ch),
            None => return Err(PathError::parse(open, "unterminated quoted key")),
        }
    }

    match chars.next() {
        Some((_, ']')) => Ok(PathComponent::Key(key)),
        Some((pos, ch)) => Err(PathError::parse(
            pos,
            format!("expected ']' after quoted key, found '{}'", ch),
        )),
        None => Err(PathError::parse(open, "unterminated '['")),
    }
}
