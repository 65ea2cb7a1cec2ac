//! Per-entity-type merge-by-key with new-count accounting (C4, §4.4).

use std::collections::HashMap;
use std::hash::Hash;

/// `MergeByKey(existing, incoming, key_fn)` (§4.4): existing order is
/// preserved, new items are appended in incoming order, and a duplicate
/// key is overwritten in place (last-writer-wins by value).
pub fn merge_by_key<T: Clone, K: Eq + Hash>(
    existing: Vec<T>,
    incoming: Vec<T>,
    key_fn: impl Fn(&T) -> K,
) -> (Vec<T>, usize) {
    let mut merged = existing;
    let mut index_of: HashMap<K, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, item)| (key_fn(item), i))
        .collect();

    let mut new_count = 0;
    for item in incoming {
        let key = key_fn(&item);
        match index_of.get(&key) {
            Some(&i) => merged[i] = item,
            None => {
                index_of.insert(key, merged.len());
                merged.push(item);
                new_count += 1;
            }
        }
    }

    (merged, new_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
        value: i32,
    }

    #[test]
    fn appends_new_items_in_incoming_order() {
        let existing = vec![Item { id: "a", value: 1 }];
        let incoming = vec![
            Item { id: "b", value: 2 },
            Item { id: "c", value: 3 },
        ];
        let (merged, new_count) = merge_by_key(existing, incoming, |i| i.id);
        assert_eq!(new_count, 2);
        assert_eq!(
            merged,
            vec![
                Item { id: "a", value: 1 },
                Item { id: "b", value: 2 },
                Item { id: "c", value: 3 },
            ]
        );
    }

    #[test]
    fn overwrites_existing_keys_in_place_last_writer_wins() {
        let existing = vec![
            Item { id: "a", value: 1 },
            Item { id: "b", value: 2 },
        ];
        let incoming = vec![Item { id: "a", value: 99 }];
        let (merged, new_count) = merge_by_key(existing, incoming, |i| i.id);
        assert_eq!(new_count, 0);
        assert_eq!(
            merged,
            vec![
                Item { id: "a", value: 99 },
                Item { id: "b", value: 2 },
            ]
        );
    }

    #[test]
    fn idempotent_under_repeated_merge() {
        let existing = vec![Item { id: "a", value: 1 }];
        let incoming = vec![Item { id: "a", value: 1 }];
        let (merged, new_count) = merge_by_key(existing, incoming, |i| i.id);
        assert_eq!(new_count, 0);
        assert_eq!(merged, vec![Item { id: "a", value: 1 }]);
    }
}
