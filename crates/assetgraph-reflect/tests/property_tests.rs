//! Property tests for item identity tables under list edits.

use assetgraph_reflect::{CollectionItemIds, Index, ItemId};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Insert(usize),
    Remove(usize),
    Assign(usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        any::<usize>().prop_map(Edit::Insert),
        any::<usize>().prop_map(Edit::Remove),
        any::<usize>().prop_map(Edit::Assign),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The table tracks a plain list of optional ids slot for slot.
    #[test]
    fn shifts_match_a_list_of_slots(
        initial in 0usize..8,
        edits in proptest::collection::vec(edit(), 0..24),
    ) {
        let mut ids = CollectionItemIds::new();
        let mut slots: Vec<Option<ItemId>> = vec![None; initial];
        let mut next = 1u128;

        for edit in edits {
            match edit {
                Edit::Insert(seed) => {
                    let at = seed % (slots.len() + 1);
                    ids.shift_insert(at);
                    slots.insert(at, None);
                }
                Edit::Remove(seed) => {
                    if slots.is_empty() {
                        continue;
                    }
                    let at = seed % slots.len();
                    prop_assert_eq!(ids.shift_remove(at), slots.remove(at));
                }
                Edit::Assign(seed) => {
                    if slots.is_empty() {
                        continue;
                    }
                    let at = seed % slots.len();
                    let id = ItemId::from_u128(next);
                    next += 1;
                    ids.insert(Index::Position(at), id);
                    slots[at] = Some(id);
                }
            }
        }

        for (position, expected) in slots.iter().enumerate() {
            prop_assert_eq!(ids.get(&Index::Position(position)), *expected);
        }
        prop_assert_eq!(ids.len(), slots.iter().flatten().count());
        for (position, id) in slots.iter().enumerate() {
            if let Some(id) = id {
                prop_assert_eq!(ids.index_of(*id), Some(&Index::Position(position)));
            }
        }
    }
}
