//! Header fields.

use std::fmt::{self, Display, Formatter};

/// A single header field.
#[derive(Debug, Clone)]
pub struct HeaderField {
    name: String,
    value: String,
}

impl HeaderField {
    /// Create a new header field.
    pub fn new<N, V>(name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Get the field name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the field value.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Check if the field has a given name.
    ///
    /// Field names are case-insensitive.
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl<N, V> From<(N, V)> for HeaderField
where
    N: Into<String>,
    V: Into<String>,
{
    #[inline]
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

impl Display for HeaderField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// An ordered collection of header fields.
///
/// A name may appear multiple times (e.g. `WWW-Authenticate`). Insertion
/// order is preserved.
#[derive(Debug, Clone)]
pub struct HeaderFields {
    fields: Vec<HeaderField>,
}

impl HeaderFields {
    /// Create a new empty collection.
    #[inline]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Get the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if there are no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Add a given field, keeping any existing fields of the same name.
    pub fn add<T>(&mut self, field: T)
    where
        T: Into<HeaderField>,
    {
        self.fields.push(field.into());
    }

    /// Replace all fields of the same name with a given field.
    pub fn set<T>(&mut self, field: T)
    where
        T: Into<HeaderField>,
    {
        let field = field.into();

        self.remove(field.name());
        self.fields.push(field);
    }

    /// Remove all fields with a given name.
    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|f| !f.is(name));
    }

    /// Get all fields in insertion order.
    #[inline]
    pub fn all(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter()
    }

    /// Get the values of all fields with a given name, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.fields
            .iter()
            .filter(move |f| f.is(name))
            .map(HeaderField::value)
    }

    /// Get the value of the last field with a given name.
    pub fn last_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.is(name))
            .map(HeaderField::value)
    }
}

impl Default for HeaderFields {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
