//! Integration test for the sheet's entity lifecycle across all column kinds.

use tabula_core::sheet::{copy, equals};
use tabula_core::{ColumnId, EntityId, Sheet, SheetError};

const POSITION: ColumnId = ColumnId::new(0);
const ALIVE: ColumnId = ColumnId::new(1);
const ARMED: ColumnId = ColumnId::new(2);
const AMMO: ColumnId = ColumnId::new(3);

fn e(index: u32) -> EntityId {
    EntityId::new(index)
}

fn world() -> Sheet {
    let mut sheet = Sheet::new(4);
    sheet.add_filled_column::<[f32; 2]>(POSITION).unwrap();
    sheet.add_sparse_column(ALIVE).unwrap();
    sheet.add_sparse_column(ARMED).unwrap();
    sheet.add_sparse_column_with_data::<u32>(AMMO).unwrap();
    sheet
}

#[test]
fn test_three_entity_scenario() {
    let mut sheet = world();
    let first = sheet.add_entities(3).unwrap();
    assert_eq!(first, e(0));
    assert_eq!(sheet.n_entities(), 3);

    let positions = sheet.get_array_mut::<[f32; 2]>(POSITION).unwrap();
    positions[0] = [1.0, 1.0];
    positions[1] = [2.0, 2.0];
    positions[2] = [3.0, 3.0];

    sheet.sparse_mut(ALIVE).unwrap().add_component(e(0)).unwrap();
    sheet.sparse_mut(ALIVE).unwrap().add_component(e(2)).unwrap();
    sheet.sparse_with_data_mut(AMMO).unwrap().insert(e(2), 30u32).unwrap();

    assert!(sheet.sparse(ALIVE).unwrap().has_component(e(2)));
    assert!(!sheet.sparse(ALIVE).unwrap().has_component(e(1)));
    assert_eq!(sheet.sparse_with_data(AMMO).unwrap().get::<u32>(e(2)), Some(&30));
    assert_eq!(sheet.sparse_with_data(AMMO).unwrap().get::<u32>(e(0)), None);
    assert_eq!(
        sheet.get_array::<[f32; 2]>(POSITION).unwrap(),
        &[[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]
    );
}

#[test]
fn test_single_component_toggle() {
    const LEVEL: ColumnId = ColumnId::new(0);
    const MARKED: ColumnId = ColumnId::new(1);

    let mut sheet = Sheet::new(2);
    sheet.add_filled_column::<u8>(LEVEL).unwrap();
    sheet.add_sparse_column(MARKED).unwrap();
    sheet.add_entities(3).unwrap();

    sheet.sparse_mut(MARKED).unwrap().add_component(e(1)).unwrap();
    let marked = sheet.sparse(MARKED).unwrap();
    assert!(!marked.has_component(e(0)));
    assert!(marked.has_component(e(1)));
    assert!(!marked.has_component(e(2)));
    assert_eq!(marked.len(), 1);

    assert!(sheet.sparse_mut(MARKED).unwrap().remove_component(e(1)).is_some());
    let marked = sheet.sparse(MARKED).unwrap();
    assert!(!marked.has_component(e(1)));
    assert_eq!(marked.len(), 0);
    assert_eq!(sheet.get_array::<u8>(LEVEL).unwrap().len(), 3);
}

#[test]
fn test_duplicate_component_is_rejected() {
    let mut sheet = world();
    sheet.add_entities(2).unwrap();
    let alive = sheet.sparse_mut(ALIVE).unwrap();
    alive.add_component(e(1)).unwrap();
    assert_eq!(
        alive.add_component(e(1)),
        Err(SheetError::DuplicateComponent { entity: e(1) })
    );
    assert_eq!(alive.len(), 1);
}

#[test]
fn test_component_past_entity_count_is_rejected() {
    let mut sheet = world();
    sheet.add_entities(2).unwrap();
    assert!(matches!(
        sheet.sparse_mut(ALIVE).unwrap().add_component(e(2)),
        Err(SheetError::Bounds { .. })
    ));
}

#[test]
fn test_sheet_intersection() {
    let mut sheet = world();
    sheet.add_entities(8).unwrap();
    for id in [1, 3, 5] {
        sheet.sparse_mut(ALIVE).unwrap().add_component(e(id)).unwrap();
    }
    for id in [3, 5, 7] {
        sheet.sparse_mut(ARMED).unwrap().add_component(e(id)).unwrap();
    }

    let both = tabula_core::intersection(
        sheet.sparse(ALIVE).unwrap(),
        sheet.sparse(ARMED).unwrap(),
    );
    let mut members: Vec<EntityId> = both.iter().collect();
    members.sort_unstable();
    assert_eq!(members, vec![e(3), e(5)]);
}

#[test]
fn test_push_pop_cycle() {
    let mut sheet = world();
    sheet.add_entities(5).unwrap();
    sheet.sparse_mut(ALIVE).unwrap().add_component(e(1)).unwrap();
    sheet.sparse_mut(ALIVE).unwrap().add_component(e(4)).unwrap();
    sheet.sparse_with_data_mut(AMMO).unwrap().insert(e(3), 7u32).unwrap();

    sheet.pop_entities(2).unwrap();
    assert_eq!(sheet.n_entities(), 3);
    assert_eq!(sheet.sparse(ALIVE).unwrap().dense(), &[e(1)]);
    assert!(sheet.sparse_with_data(AMMO).unwrap().is_empty());
    for id in sheet.columns().collect::<Vec<_>>() {
        assert_eq!(sheet.column(id).unwrap().n_entities(), 3);
    }

    assert_eq!(sheet.add_entities(2).unwrap(), e(3));
    // Re-added rows come back without membership
    assert!(!sheet.sparse(ALIVE).unwrap().has_component(e(4)));
}

#[test]
fn test_extract_renumbers_every_column() {
    let mut sheet = world();
    sheet.add_entities(6).unwrap();
    {
        let positions = sheet.get_array_mut::<[f32; 2]>(POSITION).unwrap();
        for (i, p) in positions.iter_mut().take(6).enumerate() {
            *p = [i as f32, 0.0];
        }
    }
    for id in [0, 2, 5] {
        sheet.sparse_mut(ALIVE).unwrap().add_component(e(id)).unwrap();
    }
    sheet.sparse_with_data_mut(AMMO).unwrap().insert(e(4), 44u32).unwrap();
    sheet.sparse_with_data_mut(AMMO).unwrap().insert(e(1), 11u32).unwrap();

    sheet.extract_entities_sorted(&[e(1), e(3)]).unwrap();

    assert_eq!(sheet.n_entities(), 4);
    assert_eq!(
        sheet.get_array::<[f32; 2]>(POSITION).unwrap(),
        &[[0.0, 0.0], [2.0, 0.0], [4.0, 0.0], [5.0, 0.0]]
    );
    let alive = sheet.sparse(ALIVE).unwrap();
    for id in [0, 1, 3] {
        assert!(alive.has_component(e(id)), "entity {id} should be alive");
    }
    assert!(!alive.has_component(e(2)));
    let ammo = sheet.sparse_with_data(AMMO).unwrap();
    assert_eq!(ammo.len(), 1);
    assert_eq!(ammo.get::<u32>(e(2)), Some(&44));
}

#[test]
fn test_unsorted_extract_changes_nothing() {
    let mut sheet = world();
    sheet.add_entities(4).unwrap();
    let before = copy(&sheet).unwrap();
    assert!(matches!(
        sheet.extract_entities_sorted(&[e(2), e(1)]),
        Err(SheetError::Unsorted { .. })
    ));
    assert!(matches!(
        sheet.extract_entities_sorted(&[e(4)]),
        Err(SheetError::Bounds { .. })
    ));
    assert!(equals(&before, &sheet));
}

#[test]
fn test_insert_then_extract_round_trip() {
    let mut sheet = Sheet::new(2);
    sheet.add_filled_column::<u64>(ColumnId::new(0)).unwrap();
    sheet.add_filled_column::<i16>(ColumnId::new(1)).unwrap();
    sheet.add_entities(4).unwrap();
    sheet.get_array_mut::<u64>(ColumnId::new(0)).unwrap()[..4].copy_from_slice(&[10, 20, 30, 40]);
    sheet.get_array_mut::<i16>(ColumnId::new(1)).unwrap()[..4].copy_from_slice(&[-1, -2, -3, -4]);
    let before = copy(&sheet).unwrap();

    let slots = [e(0), e(3), e(5)];
    sheet.insert_entities_sorted(&slots).unwrap();
    assert_eq!(sheet.n_entities(), 7);
    assert_eq!(
        sheet.get_array::<u64>(ColumnId::new(0)).unwrap(),
        &[0, 10, 20, 0, 30, 0, 40]
    );

    sheet.extract_entities_sorted(&slots).unwrap();
    assert!(equals(&before, &sheet));
}

#[test]
fn test_growth_preserves_contents() {
    let mut sheet = world();
    sheet.add_entities(1).unwrap();
    sheet.get_array_mut::<[f32; 2]>(POSITION).unwrap()[0] = [9.0, 9.0];
    sheet.sparse_with_data_mut(AMMO).unwrap().insert(e(0), 99u32).unwrap();

    for _ in 0..10 {
        sheet.add_entities(100).unwrap();
    }
    assert_eq!(sheet.n_entities(), 1001);
    assert_eq!(sheet.get_array::<[f32; 2]>(POSITION).unwrap()[0], [9.0, 9.0]);
    assert_eq!(sheet.get_array::<[f32; 2]>(POSITION).unwrap()[1000], [0.0, 0.0]);
    assert_eq!(sheet.sparse_with_data(AMMO).unwrap().get::<u32>(e(0)), Some(&99));
}

#[test]
fn test_pre_add_keeps_entity_count() {
    let mut sheet = world();
    sheet.pre_add_entities(500);
    assert_eq!(sheet.n_entities(), 0);
    for id in sheet.columns().collect::<Vec<_>>() {
        assert!(sheet.column(id).unwrap().capacity() >= 500);
    }
}
