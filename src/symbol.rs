//! Atomic names for concepts, instances and relations.
//!
//! A [`Symbol`] is a reference-counted string: cloning one is a pointer copy,
//! and equality compares the text. Every head of a proposition, every actor
//! and every physical object in a story is a symbol. The [`InstanceNamer`]
//! mints fresh instance names (`bed-3`, `key-12`) when a plan needs an object
//! that the story has not named.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name of a concept, instance or relation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Create a symbol from its name.
    pub fn new(name: &str) -> Self {
        Symbol(Arc::from(name))
    }

    /// The symbol's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(Arc::from(name))
    }
}

impl From<&Symbol> for Symbol {
    fn from(sym: &Symbol) -> Self {
        sym.clone()
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Symbol::from(name))
    }
}

/// Generates fresh instance names of the form `class-N`.
///
/// The counter is shared across classes, so names are unique within one
/// session regardless of class.
#[derive(Debug, Default, Clone)]
pub struct InstanceNamer {
    next: u64,
}

impl InstanceNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new instance name for `class`.
    pub fn fresh(&mut self, class: &Symbol) -> Symbol {
        self.next += 1;
        Symbol::from(format!("{}-{}", class, self.next))
    }
}
