//! Column-name to field-position mappings.
//!
//! A [`FieldMapping`] is derived once per record type from its
//! [`Record::fields`] description and memoized in a [`MappingCache`].
//!
//! # Naming rules
//!
//! - fields that are not public are skipped
//! - fields tagged `"-"` are skipped
//! - a tagged field is mapped under its tag
//! - any other field is mapped under its lower-camel-cased name
//!   (`user_name` becomes `userName`)
//!
//! # Concurrency
//!
//! Lookups take a shared lock. A miss builds the mapping outside the lock and
//! inserts it under the write lock; when two callers race on the same type,
//! the first insert wins and both receive that entry. Entries are immutable
//! `Arc`s, so a reader can never observe a half-built mapping.

use crate::db::record::Record;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Tag value that excludes a field from mapping.
pub const SKIP_TAG: &str = "-";

/// Declaration of one field of a record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name as declared.
    pub name: &'static str,
    /// Whether the field is visible outside its module.
    pub public: bool,
    /// Explicit column name, or `"-"` to skip.
    pub tag: Option<&'static str>,
}

impl FieldDef {
    /// A public, untagged field.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            public: true,
            tag: None,
        }
    }

    /// Set the tag.
    pub const fn tagged(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Mark the field as not public.
    pub const fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// The column name this field is mapped under, or `None` when skipped.
    pub fn column_name(&self) -> Option<String> {
        if !self.public {
            return None;
        }
        match self.tag {
            Some(SKIP_TAG) => None,
            Some(tag) if !tag.is_empty() => Some(tag.to_string()),
            _ => Some(lower_camel(self.name)),
        }
    }
}

/// Immutable column-name to field-position mapping for one record shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    shape: &'static str,
    positions: HashMap<String, usize>,
}

impl FieldMapping {
    /// Build the mapping from a shape description.
    pub fn from_fields(shape: &'static str, fields: &[FieldDef]) -> Self {
        let positions = fields
            .iter()
            .enumerate()
            .filter_map(|(position, field)| field.column_name().map(|name| (name, position)))
            .collect();

        Self { shape, positions }
    }

    /// Build the mapping for a record type.
    pub fn of<R: Record>() -> Self {
        Self::from_fields(std::any::type_name::<R>(), R::fields())
    }

    /// Type name of the shape this mapping was built from.
    pub fn shape(&self) -> &'static str {
        self.shape
    }

    /// Field position for a column, if the column is mapped.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    /// Number of mapped columns.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate over `(column, position)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.positions.iter().map(|(name, pos)| (name.as_str(), *pos))
    }

    /// Resolve result columns against this mapping: `Some(position)` for a
    /// mapped column, `None` for a column to discard.
    pub fn bind_plan<S: AsRef<str>>(&self, columns: &[S]) -> Vec<Option<usize>> {
        columns
            .iter()
            .map(|column| self.position(column.as_ref()))
            .collect()
    }
}

/// Cache of [`FieldMapping`]s keyed by record type. Entries are never evicted.
#[derive(Debug, Default)]
pub struct MappingCache {
    entries: RwLock<HashMap<TypeId, Arc<FieldMapping>>>,
    /// Count of mappings built, including ones that lost an insert race.
    computed: AtomicUsize,
}

impl MappingCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the mapping for `R`, building it on first use.
    pub fn mapping<R: Record>(&self) -> Arc<FieldMapping> {
        let key = TypeId::of::<R>();

        if let Some(mapping) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(mapping);
        }

        let built = Arc::new(FieldMapping::of::<R>());
        self.computed.fetch_add(1, Ordering::AcqRel);

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key).or_insert(built))
    }

    /// Number of mappings built so far.
    pub fn computations(&self) -> usize {
        self.computed.load(Ordering::Acquire)
    }

    /// Number of cached record shapes.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lower-camel-case a field name: `user_name` → `userName`, `Id` → `id`.
///
/// Underscores separate words; the first character of the result is
/// lowercased and every later word starts uppercase. Characters inside a
/// word are kept as written.
pub fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for ch in name.chars() {
        if ch == '_' {
            // leading underscores do not start a word
            upper_next = !out.is_empty();
            continue;
        }
        if out.is_empty() {
            out.extend(ch.to_lowercase());
        } else if upper_next {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        upper_next = false;
    }

    out
}
