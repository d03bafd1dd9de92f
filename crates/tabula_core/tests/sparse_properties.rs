//! Property tests: sparse sets and dense columns checked against plain
//! collections.

use std::collections::BTreeSet;

use proptest::prelude::*;
use tabula_core::{
    intersection, intersection_of, CheckPolicy, EntityId, FilledColumn, SheetError, SparseColumn,
    TypeInfo,
};

const N_ENTITIES: usize = 64;

fn set_of(members: &BTreeSet<u32>) -> SparseColumn {
    let mut set = SparseColumn::new();
    set.push_entities(N_ENTITIES);
    for &id in members {
        set.add_component(EntityId::new(id)).unwrap();
    }
    set
}

fn members(set: &SparseColumn) -> BTreeSet<u32> {
    set.iter().map(EntityId::get).collect()
}

fn arb_members() -> impl Strategy<Value = BTreeSet<u32>> {
    prop::collection::btree_set(0..N_ENTITIES as u32, 0..N_ENTITIES)
}

/// Old id -> new id after removing `garbage`, or `None` if removed.
fn renumber(old: u32, garbage: &BTreeSet<u32>) -> Option<u32> {
    if garbage.contains(&old) {
        None
    } else {
        Some(old - garbage.range(..old).count() as u32)
    }
}

proptest! {
    #[test]
    fn prop_add_remove_matches_model(ops in prop::collection::vec((any::<bool>(), 0..N_ENTITIES as u32), 0..200)) {
        let mut set = SparseColumn::new();
        set.push_entities(N_ENTITIES);
        let mut model = BTreeSet::new();

        for (add, raw) in ops {
            let id = EntityId::new(raw);
            if add {
                let result = set.add_component(id);
                if model.insert(raw) {
                    prop_assert!(result.is_ok());
                } else {
                    prop_assert_eq!(result, Err(SheetError::DuplicateComponent { entity: id }));
                }
            } else {
                prop_assert_eq!(set.remove_component(id).is_some(), model.remove(&raw));
            }
            prop_assert_eq!(set.len(), model.len());
        }

        prop_assert_eq!(members(&set), model.clone());
        for raw in 0..N_ENTITIES as u32 {
            prop_assert_eq!(set.has_component(EntityId::new(raw)), model.contains(&raw));
        }
        for (slot, &id) in set.dense().iter().enumerate() {
            prop_assert_eq!(set.search(id), Some(slot));
        }
    }

    #[test]
    fn prop_intersection_matches_brute_force(a in arb_members(), b in arb_members()) {
        let expected: BTreeSet<u32> = a.intersection(&b).copied().collect();
        let (sa, sb) = (set_of(&a), set_of(&b));

        let ab = intersection(&sa, &sb);
        let ba = intersection(&sb, &sa);
        prop_assert_eq!(members(&ab), expected.clone());
        prop_assert_eq!(members(&ba), expected);
        prop_assert!(ab.n_entities() >= N_ENTITIES);
        prop_assert_eq!(members(&intersection(&sa, &sa)), a);
    }

    #[test]
    fn prop_intersection_of_many(sets in prop::collection::vec(arb_members(), 1..6)) {
        let mut expected = sets[0].clone();
        for other in &sets[1..] {
            expected = expected.intersection(other).copied().collect();
        }
        let columns: Vec<SparseColumn> = sets.iter().map(set_of).collect();
        let refs: Vec<&SparseColumn> = columns.iter().collect();
        prop_assert_eq!(members(&intersection_of(&refs)), expected);
    }

    #[test]
    fn prop_extract_renumbers_members(model in arb_members(), garbage in arb_members()) {
        let mut set = set_of(&model);
        let ids: Vec<EntityId> = garbage.iter().copied().map(EntityId::new).collect();
        set.extract_sorted(&ids).unwrap();

        let expected: BTreeSet<u32> = model.iter().filter_map(|&old| renumber(old, &garbage)).collect();
        prop_assert_eq!(members(&set), expected);
        prop_assert_eq!(set.n_entities(), N_ENTITIES - garbage.len());
    }

    #[test]
    fn prop_pop_drops_tail_members(model in arb_members(), n in 0..=N_ENTITIES) {
        let mut set = set_of(&model);
        set.pop_entities(n).unwrap();
        let remaining = (N_ENTITIES - n) as u32;
        let expected: BTreeSet<u32> = model.iter().copied().filter(|&id| id < remaining).collect();
        prop_assert_eq!(members(&set), expected);
    }

    #[test]
    fn prop_filled_growth_preserves_rows(batches in prop::collection::vec(1..50usize, 1..20)) {
        let mut column = FilledColumn::new(TypeInfo::of::<u32>(), CheckPolicy::Report);
        let mut model: Vec<u32> = Vec::new();
        for batch in batches {
            let start = column.len();
            column.push_entities(batch);
            for row in start..start + batch {
                let value = (row as u32).wrapping_mul(2_654_435_761);
                column.set(EntityId::new(row as u32), value).unwrap();
                model.push(value);
            }
            prop_assert!(column.capacity() >= column.len());
        }
        prop_assert_eq!(column.as_slice::<u32>().unwrap(), model.as_slice());
    }

    #[test]
    fn prop_filled_extract_matches_filter(len in 1..100usize, picks in prop::collection::btree_set(0..100u32, 0..30)) {
        let mut column = FilledColumn::new(TypeInfo::of::<u16>(), CheckPolicy::Report);
        column.push_entities(len);
        let model: Vec<u16> = (0..len as u16).map(|i| i * 3).collect();
        column.as_mut_slice::<u16>().unwrap()[..len].copy_from_slice(&model);

        let garbage: BTreeSet<u32> = picks.into_iter().filter(|&i| (i as usize) < len).collect();
        let ids: Vec<EntityId> = garbage.iter().copied().map(EntityId::new).collect();
        column.extract_sorted(&ids).unwrap();

        let expected: Vec<u16> = model
            .iter()
            .enumerate()
            .filter(|(i, _)| !garbage.contains(&(*i as u32)))
            .map(|(_, &v)| v)
            .collect();
        prop_assert_eq!(column.as_slice::<u16>().unwrap(), expected.as_slice());
    }
}
