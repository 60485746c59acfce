// ── Reference ordering ──

use std::collections::HashMap;
use std::hash::Hash;

use tradewatch_api::models::CopyWallet;

/// Reorder `items` so those whose key appears in `reference` come first,
/// in reference order; the rest follow in their original relative order.
///
/// Stable: items sharing a key keep their relative order. Reference keys
/// with no matching item are ignored; a repeated reference key counts at
/// its first position.
pub fn reorder_by_reference<T, K, F>(items: Vec<T>, reference: &[K], key_fn: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut rank: HashMap<&K, usize> = HashMap::with_capacity(reference.len());
    for (i, k) in reference.iter().enumerate() {
        rank.entry(k).or_insert(i);
    }

    let mut ranked: Vec<(usize, usize, T)> = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let r = rank.get(&key_fn(&item)).copied().unwrap_or(usize::MAX);
            (r, i, item)
        })
        .collect();
    ranked.sort_by_key(|(r, i, _)| (*r, *i));
    ranked.into_iter().map(|(_, _, item)| item).collect()
}

/// Copy wallets in the user's chosen order.
pub fn ordered_copy_wallets(wallets: &[CopyWallet], order: &[String]) -> Vec<CopyWallet> {
    reorder_by_reference(wallets.to_vec(), order, |w| w.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn referenced_items_first() {
        let out = reorder_by_reference(vec!["a", "b", "c"], &["b", "a"], |s| *s);
        assert_eq!(out, vec!["b", "a", "c"]);
    }

    #[test]
    fn unreferenced_keep_original_order() {
        let out = reorder_by_reference(vec![5, 4, 3, 2, 1], &[2], |n| *n);
        assert_eq!(out, vec![2, 5, 4, 3, 1]);
    }

    #[test]
    fn unknown_and_repeated_reference_keys() {
        let out = reorder_by_reference(vec!["a", "b", "c"], &["z", "c", "a", "c"], |s| *s);
        assert_eq!(out, vec!["c", "a", "b"]);
    }

    #[test]
    fn duplicate_item_keys_stay_stable() {
        let items = vec![("x", 1), ("y", 2), ("x", 3)];
        let out = reorder_by_reference(items, &["x"], |(k, _)| *k);
        assert_eq!(out, vec![("x", 1), ("x", 3), ("y", 2)]);
    }

    #[test]
    fn copy_wallets_follow_saved_order() {
        let wallet = |id: &str| CopyWallet {
            id: id.into(),
            name: id.to_uppercase(),
            balance: 0.0,
            smart_wallet_address: None,
            created_at: None,
        };
        let wallets = vec![wallet("w1"), wallet("w2"), wallet("w3")];
        let ids: Vec<String> = ordered_copy_wallets(&wallets, &["w3".to_owned()])
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec!["w3", "w1", "w2"]);
    }
}
