//! Row scanning into records.
//!
//! Both entry points resolve the cursor's columns against the record's cached
//! [`FieldMapping`](crate::db::FieldMapping) once, producing a bind plan of
//! `Some(field position)` or `None` (discard) per column, then assign values
//! column by column.
//!
//! # Error behavior
//!
//! - a record type that declares no fields is not a scan destination:
//!   `InvalidDestination`, raised before the cursor is touched (both forms)
//! - [`scan_one`] on an empty result: `NoData`
//! - [`scan_all`] on an empty result: `Ok`, destination left empty
//! - conversion and decode failures: `Scan`, naming the column
//!
//! [`scan_all`] keeps the rows it appended before a failing row; the caller
//! sees a partially filled vector alongside the error.

use crate::db::cursor::RowCursor;
use crate::db::mapping::MappingCache;
use crate::db::record::{FieldError, Record};
use crate::error::{DbError, DbResult};

/// Scan the first row of `cursor` into `dest`.
///
/// Fields with a matching column are overwritten; all other fields keep
/// their current values.
pub fn scan_one<R, C>(cache: &MappingCache, dest: &mut R, cursor: &mut C) -> DbResult<()>
where
    R: Record,
    C: RowCursor + ?Sized,
{
    ensure_record::<R>("single-row scan")?;

    if !cursor.advance()? {
        return Err(DbError::NoData);
    }

    let columns = cursor.columns()?;
    let plan = cache.mapping::<R>().bind_plan(&columns);

    scan_row(dest, cursor, &columns, &plan)
}

/// Scan every remaining row of `cursor`, appending one record per row to `dest`.
pub fn scan_all<R, C>(cache: &MappingCache, dest: &mut Vec<R>, cursor: &mut C) -> DbResult<()>
where
    R: Record + Clone,
    C: RowCursor + ?Sized,
{
    ensure_record::<R>("multi-row scan")?;

    let columns = cursor.columns()?;
    let plan = cache.mapping::<R>().bind_plan(&columns);
    let mut buffer = R::default();

    while cursor.advance()? {
        scan_row(&mut buffer, cursor, &columns, &plan)?;
        dest.push(buffer.clone());
    }

    Ok(())
}

fn ensure_record<R: Record>(form: &str) -> DbResult<()> {
    if R::fields().is_empty() {
        return Err(DbError::invalid_destination(format!(
            "{} needs a record with at least one field, got {}",
            form,
            std::any::type_name::<R>()
        )));
    }
    Ok(())
}

fn scan_row<R, C>(
    dest: &mut R,
    cursor: &C,
    columns: &[String],
    plan: &[Option<usize>],
) -> DbResult<()>
where
    R: Record,
    C: RowCursor + ?Sized,
{
    for (index, (column, target)) in columns.iter().zip(plan).enumerate() {
        let Some(position) = *target else {
            continue;
        };

        let value = cursor.value(index)?;
        dest.assign(position, value).map_err(|e| match e {
            FieldError::NoSuchField(position) => DbError::invalid_destination(format!(
                "{} has no assignable field at position {} (column '{}')",
                std::any::type_name::<R>(),
                position,
                column
            )),
            FieldError::Conversion(e) => DbError::scan(column.as_str(), e.to_string()),
        })?;
    }

    Ok(())
}
