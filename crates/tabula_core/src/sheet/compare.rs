//! # Sheet Copy and Comparison
//!
//! Raw, byte-level duplication and equality of whole sheets. Mostly used
//! for snapshots in tests and for double buffering a sheet between phases.

use super::Sheet;
use crate::error::{SheetError, SheetResult};

/// Creates a new sheet with the same columns and contents as `source`.
///
/// # Errors
///
/// Propagates column registration errors, which cannot occur for a
/// well-formed source.
pub fn copy(source: &Sheet) -> SheetResult<Sheet> {
    let mut dest = Sheet::with_config(source.config);
    copy_into(source, &mut dest)?;
    Ok(dest)
}

/// Overwrites `dest` with the columns and contents of `source`.
///
/// Every column of `dest` is dropped first, then each source column is
/// registered again with the source's kind and element layout and
/// raw-copied. `dest` keeps its own configuration.
///
/// # Errors
///
/// [`SheetError::SchemaMismatch`] if the column capacities differ. `dest`
/// is untouched in that case.
pub fn copy_into(source: &Sheet, dest: &mut Sheet) -> SheetResult<()> {
    if source.column_capacity() != dest.column_capacity() {
        return dest.config.check_policy.fail(SheetError::SchemaMismatch {
            source_columns: source.column_capacity(),
            dest_columns: dest.column_capacity(),
        });
    }

    dest.clear();
    for id in source.columns() {
        let theirs = source.column(id)?;
        dest.add_column(id, theirs.kind(), theirs.type_info().copied())?
            .copy_from(theirs);
    }
    dest.names.clone_from(&source.names);
    dest.n_entities = source.n_entities();
    tracing::debug!(
        columns = dest.n_columns(),
        entities = dest.n_entities,
        "sheet copied"
    );
    Ok(())
}

/// Deep, byte-level equality. Intended for tests.
///
/// Compares the column capacity, the entity count, the set of registered
/// columns and, per column, kind, element layout, members in dense order
/// and payload bytes.
/// The first difference found is logged at debug level.
#[must_use]
pub fn equals(a: &Sheet, b: &Sheet) -> bool {
    if a.column_capacity() != b.column_capacity() {
        tracing::debug!(
            a = a.column_capacity(),
            b = b.column_capacity(),
            "column capacities differ"
        );
        return false;
    }
    if a.n_entities() != b.n_entities() {
        tracing::debug!(a = a.n_entities(), b = b.n_entities(), "entity counts differ");
        return false;
    }
    if !a.columns().eq(b.columns()) {
        tracing::debug!(a = a.n_columns(), b = b.n_columns(), "registered columns differ");
        return false;
    }
    for id in a.columns() {
        let (Some(ours), Some(theirs)) = (a.try_column(id), b.try_column(id)) else {
            return false;
        };
        if !ours.content_eq(theirs) {
            tracing::debug!(column = %id, name = a.column_name(id), "column contents differ");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnId, ColumnKind, EntityId, TypeInfo};

    const HEAT: ColumnId = ColumnId::new(0);
    const FLAG: ColumnId = ColumnId::new(1);
    const LINK: ColumnId = ColumnId::new(2);

    fn populated() -> Sheet {
        let mut sheet = Sheet::new(3);
        sheet.add_filled_column::<f32>(HEAT).unwrap();
        sheet.add_sparse_column(FLAG).unwrap();
        sheet.add_sparse_column_with_data::<u32>(LINK).unwrap();
        sheet.add_entities(5).unwrap();
        sheet.get_array_mut::<f32>(HEAT).unwrap()[..5].copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        sheet.sparse_mut(FLAG).unwrap().add_component(EntityId::new(4)).unwrap();
        sheet
            .sparse_with_data_mut(LINK)
            .unwrap()
            .insert(EntityId::new(2), 77u32)
            .unwrap();
        sheet
    }

    #[test]
    fn test_copy_is_equal() {
        let source = populated();
        let copied = copy(&source).unwrap();
        assert!(equals(&source, &copied));
        assert_eq!(
            copied.sparse_with_data(LINK).unwrap().get::<u32>(EntityId::new(2)),
            Some(&77)
        );
    }

    #[test]
    fn test_copy_into_overwrites() {
        let source = populated();
        let mut dest = Sheet::new(3);
        dest.add_filled_column::<f32>(HEAT).unwrap();
        dest.add_sparse_column(FLAG).unwrap();
        dest.add_sparse_column_with_data::<u32>(LINK).unwrap();
        dest.add_entities(50).unwrap();
        dest.sparse_mut(FLAG).unwrap().add_component(EntityId::new(40)).unwrap();

        copy_into(&source, &mut dest).unwrap();
        assert!(equals(&source, &dest));
        assert_eq!(dest.n_entities(), 5);
    }

    #[test]
    fn test_schema_mismatch() {
        let source = populated();
        let mut dest = Sheet::new(4);
        assert!(matches!(
            copy_into(&source, &mut dest),
            Err(SheetError::SchemaMismatch {
                source_columns: 3,
                dest_columns: 4
            })
        ));
    }

    #[test]
    fn test_schema_mismatch_leaves_dest_intact() {
        let source = populated();
        let mut dest = Sheet::new(5);
        dest.add_sparse_column(FLAG).unwrap();
        dest.add_entities(2).unwrap();
        assert!(copy_into(&source, &mut dest).is_err());
        assert_eq!(dest.n_entities(), 2);
        assert_eq!(dest.n_columns(), 1);
    }

    #[test]
    fn test_copy_into_empty_dest() {
        let source = populated();
        let mut dest = Sheet::new(3);

        copy_into(&source, &mut dest).unwrap();
        assert!(equals(&source, &dest));
        assert_eq!(dest.get_array::<f32>(HEAT).unwrap()[..5], [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(dest.sparse(FLAG).unwrap().has_component(EntityId::new(4)));
    }

    #[test]
    fn test_copy_into_replaces_layout() {
        let source = populated();
        let mut dest = Sheet::new(3);
        dest.add_filled_column::<f32>(HEAT).unwrap();
        dest.add_column(FLAG, ColumnKind::Filled, Some(TypeInfo::of::<u8>()))
            .unwrap();
        dest.add_sparse_column_with_data::<u64>(LINK).unwrap();
        dest.add_entities(2).unwrap();

        copy_into(&source, &mut dest).unwrap();
        assert!(equals(&source, &dest));
        assert_eq!(dest.column(FLAG).unwrap().kind(), ColumnKind::Sparse);
        assert_eq!(
            dest.sparse_with_data(LINK).unwrap().get::<u32>(EntityId::new(2)),
            Some(&77)
        );
    }

    #[test]
    fn test_copy_into_drops_extra_columns() {
        const EXTRA: ColumnId = ColumnId::new(2);

        let mut source = Sheet::new(3);
        source.add_filled_column::<u32>(HEAT).unwrap();
        source.add_sparse_column(FLAG).unwrap();
        source.add_entities(3).unwrap();

        let mut dest = Sheet::new(3);
        dest.add_filled_column::<u32>(EXTRA).unwrap();
        dest.add_entities(3).unwrap();
        dest.get_array_mut::<u32>(EXTRA).unwrap()[..3].copy_from_slice(&[77, 88, 99]);

        copy_into(&source, &mut dest).unwrap();
        assert!(dest.try_column(EXTRA).is_none());
        assert!(equals(&source, &dest));
    }

    #[test]
    fn test_equals_detects_differences() {
        let a = populated();
        let mut b = populated();
        assert!(equals(&a, &b));
        b.get_array_mut::<f32>(HEAT).unwrap()[0] = -1.0;
        assert!(!equals(&a, &b));

        let mut c = populated();
        c.sparse_mut(FLAG).unwrap().add_component(EntityId::new(0)).unwrap();
        assert!(!equals(&a, &c));

        let mut d = populated();
        d.remove_column(FLAG);
        assert!(!equals(&a, &d));
    }

    #[test]
    fn test_equals_detects_capacity() {
        let mut narrow = Sheet::new(2);
        narrow.add_sparse_column(HEAT).unwrap();
        let mut wide = Sheet::new(5);
        wide.add_sparse_column(HEAT).unwrap();
        assert!(!equals(&narrow, &wide));
    }
}
