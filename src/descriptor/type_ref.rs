//! Field type references and their textual syntax.
//!
//! ```text
//! ty   := name | option<ty> | list<ty> | set<ty> | map<ty> | map<ty, ty>
//! name := [A-Za-z_][A-Za-z0-9_.]*
//! ```
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Plain(String),
    Optional(Box<TypeRef>),
    List(Box<TypeRef>),
    Set(Box<TypeRef>),
    /// `key: None` means text keys.
    Map {
        key: Option<Box<TypeRef>>,
        value: Box<TypeRef>,
    },
}

/// Which container shape wraps a resolved inner codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    List,
    Set,
    Map,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type reference `{input}`: {message}")]
pub struct TypeRefParseError {
    pub input: String,
    pub message: String,
}

impl TypeRef {
    pub fn plain(name: impl Into<String>) -> Self {
        Self::Plain(name.into())
    }

    pub fn optional(inner: TypeRef) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn set(inner: TypeRef) -> Self {
        Self::Set(Box::new(inner))
    }

    pub fn map(value: TypeRef) -> Self {
        Self::Map { key: None, value: Box::new(value) }
    }

    pub fn map_keyed(key: TypeRef, value: TypeRef) -> Self {
        Self::Map { key: Some(Box::new(key)), value: Box::new(value) }
    }

    /// The named type at the centre of every wrapper.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Plain(name) => name,
            Self::Optional(inner) | Self::List(inner) | Self::Set(inner) => inner.base_name(),
            Self::Map { value, .. } => value.base_name(),
        }
    }

    /// Whether `name` appears anywhere inside this reference, keys included.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Self::Plain(n) => n == name,
            Self::Optional(inner) | Self::List(inner) | Self::Set(inner) => inner.mentions(name),
            Self::Map { key, value } => {
                key.as_deref().is_some_and(|k| k.mentions(name)) || value.mentions(name)
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(name) => f.write_str(name),
            Self::Optional(inner) => write!(f, "option<{inner}>"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Set(inner) => write!(f, "set<{inner}>"),
            Self::Map { key: None, value } => write!(f, "map<{value}>"),
            Self::Map { key: Some(key), value } => write!(f, "map<{key}, {value}>"),
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
        })
    }
}

impl FromStr for TypeRef {
    type Err = TypeRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut p = Parser { src: s, pos: 0 };
        let ty = p.ty().map_err(|message| TypeRefParseError {
            input: s.to_owned(),
            message,
        })?;
        p.skip_ws();
        if p.pos != s.len() {
            return Err(TypeRefParseError {
                input: s.to_owned(),
                message: format!("unexpected trailing input at offset {}", p.pos),
            });
        }
        Ok(ty)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeRefParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TypeRef> for String {
    fn from(t: TypeRef) -> Self {
        t.to_string()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.src[self.pos..].starts_with(|c: char| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(format!("expected `{c}` at offset {}", self.pos))
        }
    }

    fn ident(&mut self) -> Result<&str, String> {
        self.skip_ws();
        let rest = &self.src[self.pos..];
        let len = rest
            .char_indices()
            .find(|&(i, c)| {
                let ok = if i == 0 {
                    c.is_ascii_alphabetic() || c == '_'
                } else {
                    c.is_ascii_alphanumeric() || c == '_' || c == '.'
                };
                !ok
            })
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(format!("expected a type name at offset {}", self.pos));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.src[start..self.pos])
    }

    fn ty(&mut self) -> Result<TypeRef, String> {
        let name = self.ident()?.to_owned();
        match name.as_str() {
            "option" | "list" | "set" => {
                self.expect('<')?;
                let inner = self.ty()?;
                self.expect('>')?;
                Ok(match name.as_str() {
                    "option" => TypeRef::optional(inner),
                    "list" => TypeRef::list(inner),
                    _ => TypeRef::set(inner),
                })
            }
            "map" => {
                self.expect('<')?;
                let first = self.ty()?;
                if self.eat(',') {
                    let value = self.ty()?;
                    self.expect('>')?;
                    Ok(TypeRef::map_keyed(first, value))
                } else {
                    self.expect('>')?;
                    Ok(TypeRef::map(first))
                }
            }
            _ => Ok(TypeRef::Plain(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_wrappers() {
        let t: TypeRef = "option<list<Node>>".parse().unwrap();
        assert_eq!(t, TypeRef::optional(TypeRef::list(TypeRef::plain("Node"))));
        assert_eq!(t.base_name(), "Node");
    }

    #[test]
    fn parses_keyed_maps() {
        let t: TypeRef = "map< int , set<string> >".parse().unwrap();
        assert_eq!(
            t,
            TypeRef::map_keyed(TypeRef::plain("int"), TypeRef::set(TypeRef::plain("string")))
        );
        assert_eq!(t.to_string(), "map<int, set<string>>");
        assert!(t.mentions("int"));
    }

    #[test]
    fn rejects_garbage() {
        assert!("list<".parse::<TypeRef>().is_err());
        assert!("list<a> b".parse::<TypeRef>().is_err());
        assert!("".parse::<TypeRef>().is_err());
    }

    #[test]
    fn serde_goes_through_the_text_form() {
        let t: TypeRef = serde_json::from_str(r#""map<Node>""#).unwrap();
        assert_eq!(t, TypeRef::map(TypeRef::plain("Node")));
        assert_eq!(serde_json::to_string(&t).unwrap(), r#""map<Node>""#);
    }
}
