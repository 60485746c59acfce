// ── Copy-trade multiplier merging ──

use std::collections::HashMap;

use serde::Serialize;

use tradewatch_api::models::CopyTradeSetting;

/// One instrument of a copy-trade setting with its effective multiplier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentMultiplier {
    pub token_address: String,
    pub multiplier: f64,
    /// `true` when `multiplier` comes from an explicit override.
    pub overridden: bool,
}

/// Pair every instrument with its override, or `default` when there is
/// none. Addresses match case-insensitively; overrides for instruments
/// not in `token_addresses` are ignored, as are non-positive or non-finite
/// override values.
pub fn merge_multiplier_overrides(
    token_addresses: &[String],
    overrides: Option<&HashMap<String, f64>>,
    default: f64,
) -> Vec<InstrumentMultiplier> {
    let normalized: HashMap<String, f64> = overrides
        .into_iter()
        .flatten()
        .filter(|(_, m)| m.is_finite() && **m > 0.0)
        .map(|(addr, m)| (addr.to_ascii_lowercase(), *m))
        .collect();

    token_addresses
        .iter()
        .map(|addr| match normalized.get(&addr.to_ascii_lowercase()) {
            Some(m) => InstrumentMultiplier {
                token_address: addr.clone(),
                multiplier: *m,
                overridden: true,
            },
            None => InstrumentMultiplier {
                token_address: addr.clone(),
                multiplier: default,
                overridden: false,
            },
        })
        .collect()
}

/// [`merge_multiplier_overrides`] for a stored setting.
pub fn setting_multipliers(setting: &CopyTradeSetting, default: f64) -> Vec<InstrumentMultiplier> {
    merge_multiplier_overrides(&setting.token_addresses, setting.multipliers.as_ref(), default)
}

/// Inverse of the merge: the override map to submit, keeping only
/// instruments whose multiplier differs from `default`.
pub fn collect_overrides(rows: &[InstrumentMultiplier], default: f64) -> HashMap<String, f64> {
    rows.iter()
        .filter(|row| (row.multiplier - default).abs() > f64::EPSILON)
        .map(|row| (row.token_address.clone(), row.multiplier))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens() -> Vec<String> {
        vec!["0xETH".into(), "0xbtc".into(), "0xsol".into()]
    }

    #[test]
    fn missing_overrides_use_default() {
        let rows = merge_multiplier_overrides(&tokens(), None, 1.0);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| !r.overridden && (r.multiplier - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn overrides_match_case_insensitively() {
        let overrides = HashMap::from([
            ("0xeth".to_owned(), 2.5),
            ("0xBTC".to_owned(), -1.0),
            ("0xdoge".to_owned(), 9.0),
        ]);
        let rows = merge_multiplier_overrides(&tokens(), Some(&overrides), 1.0);

        assert_eq!(
            rows[0],
            InstrumentMultiplier {
                token_address: "0xETH".into(),
                multiplier: 2.5,
                overridden: true,
            }
        );
        assert!(!rows[1].overridden, "invalid override is ignored");
        assert!(!rows[2].overridden);
        assert!(rows.iter().all(|r| r.token_address != "0xdoge"));
    }

    #[test]
    fn collect_overrides_drops_defaults() {
        let overrides = HashMap::from([("0xsol".to_owned(), 3.0)]);
        let rows = merge_multiplier_overrides(&tokens(), Some(&overrides), 1.0);
        let collected = collect_overrides(&rows, 1.0);
        assert_eq!(collected, HashMap::from([("0xsol".to_owned(), 3.0)]));
    }
}
