//! The record contract.
//!
//! A record shape describes its fields once ([`Record::fields`]) and accepts
//! values by field position ([`Record::assign`]). The scanner combines the two
//! with a cached [`FieldMapping`](crate::db::FieldMapping) so that any struct
//! can be filled from any result set without per-query code.
//!
//! Most shapes are declared through the [`record!`](crate::record) macro. A
//! manual implementation looks like this:
//!
//! ```
//! use rowscan::db::{FieldDef, FieldError, Record, Value, set_field};
//!
//! #[derive(Debug, Default, Clone)]
//! struct Tag {
//!     id: i64,
//!     label: String,
//! }
//!
//! impl Record for Tag {
//!     fn fields() -> &'static [FieldDef] {
//!         const FIELDS: &[FieldDef] = &[FieldDef::new("id"), FieldDef::new("label").tagged("tag_label")];
//!         FIELDS
//!     }
//!
//!     fn assign(&mut self, position: usize, value: Value) -> Result<(), FieldError> {
//!         match position {
//!             0 => set_field(&mut self.id, value),
//!             1 => set_field(&mut self.label, value),
//!             _ => Err(FieldError::NoSuchField(position)),
//!         }
//!     }
//! }
//! ```

use crate::db::mapping::FieldDef;
use crate::db::value::{ConversionError, FromValue, Value};
use thiserror::Error;

/// A struct that result rows can be scanned into.
pub trait Record: Default + 'static {
    /// Field declarations in declaration order. Positions index this slice.
    fn fields() -> &'static [FieldDef];

    /// Store `value` into the field at `position`.
    fn assign(&mut self, position: usize, value: Value) -> Result<(), FieldError>;
}

/// Failure to store a value into a record field.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("no assignable field at position {0}")]
    NoSuchField(usize),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Convert `value` and store it in `slot`.
pub fn set_field<T: FromValue>(slot: &mut T, value: Value) -> Result<(), FieldError> {
    *slot = T::from_value(value)?;
    Ok(())
}
