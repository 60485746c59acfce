// ── Token units and ratio conversions ──
//
// On-chain amounts arrive as decimal integer strings in the token's
// smallest unit. Conversions go through strings so no precision is lost
// before the final display value.

use thiserror::Error;

use tradewatch_api::models::Vault;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("Invalid amount: {0:?}")]
    Invalid(String),

    #[error("{value} has more than {decimals} decimal places")]
    TooPrecise { value: String, decimals: u8 },

    #[error("Amount {0} does not fit in 128 bits")]
    Overflow(String),
}

/// Fixed-point scale of one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Units {
    decimals: u8,
}

impl Units {
    pub const USDC: Self = Self::new(6);
    pub const ETHER: Self = Self::new(18);

    pub const fn new(decimals: u8) -> Self {
        Self { decimals }
    }

    pub const fn decimals(self) -> u8 {
        self.decimals
    }

    /// Raw integer amount to an exact decimal string.
    ///
    /// `"1500000"` with 6 decimals is `"1.5"`; whole amounts keep one
    /// fractional digit (`"2.0"`).
    pub fn format(self, raw: &str) -> Result<String, UnitsError> {
        let raw = raw.trim();
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UnitsError::Invalid(raw.to_owned()));
        }

        let digits = digits.trim_start_matches('0');
        let scale = usize::from(self.decimals);
        let padded = if digits.len() <= scale {
            format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
        } else {
            digits.to_owned()
        };
        let (int, frac) = padded.split_at(padded.len() - scale);
        let frac = frac.trim_end_matches('0');

        let mut out = String::with_capacity(padded.len() + 2);
        if negative && (int != "0" || !frac.is_empty()) {
            out.push('-');
        }
        out.push_str(int);
        out.push('.');
        out.push_str(if frac.is_empty() { "0" } else { frac });
        Ok(out)
    }

    /// Decimal string to the raw integer amount. Rejects more fractional
    /// digits than the token has.
    pub fn parse(self, value: &str) -> Result<u128, UnitsError> {
        let value = value.trim();
        let (int, frac) = value.split_once('.').unwrap_or((value, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (int.is_empty() && frac.is_empty()) || !all_digits(int) || !all_digits(frac) {
            return Err(UnitsError::Invalid(value.to_owned()));
        }

        let frac = frac.trim_end_matches('0');
        let scale = usize::from(self.decimals);
        if frac.len() > scale {
            return Err(UnitsError::TooPrecise {
                value: value.to_owned(),
                decimals: self.decimals,
            });
        }

        let combined = format!("{int}{frac:0<scale$}");
        if combined.is_empty() {
            return Ok(0);
        }
        combined
            .parse::<u128>()
            .map_err(|_| UnitsError::Overflow(value.to_owned()))
    }

    /// Raw integer amount as a float, for charts and sorting.
    pub fn to_f64(self, raw: &str) -> Result<f64, UnitsError> {
        self.format(raw)?
            .parse::<f64>()
            .map_err(|_| UnitsError::Invalid(raw.to_owned()))
    }
}

/// Total vault deposits in whole tokens, when the backend reported them.
pub fn vault_total_deposit(vault: &Vault) -> Result<Option<f64>, UnitsError> {
    vault
        .total_deposit_raw
        .as_deref()
        .map(|raw| Units::new(vault.deposit_decimals).to_f64(raw))
        .transpose()
}

// ── Ratios ───────────────────────────────────────────────────────────

pub fn bps_to_ratio(bps: u32) -> f64 {
    f64::from(bps) / 10_000.0
}

pub fn bps_to_percent(bps: u32) -> f64 {
    f64::from(bps) / 100.0
}

pub fn ratio_to_percent(ratio: f64) -> f64 {
    ratio * 100.0
}

pub fn percent_to_ratio(percent: f64) -> f64 {
    percent / 100.0
}

/// `0.125` → `"12.50%"`.
pub fn format_percent(ratio: f64, precision: usize) -> String {
    format!("{:.precision$}%", ratio_to_percent(ratio))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_exact_decimals() {
        assert_eq!(Units::USDC.format("1500000").unwrap(), "1.5");
        assert_eq!(Units::USDC.format("1").unwrap(), "0.000001");
        assert_eq!(Units::USDC.format("0").unwrap(), "0.0");
        assert_eq!(Units::USDC.format("-2000000").unwrap(), "-2.0");
        assert_eq!(Units::new(0).format("123").unwrap(), "123.0");
        assert_eq!(
            Units::ETHER.format("1234567890123456789012").unwrap(),
            "1234.567890123456789012"
        );
    }

    #[test]
    fn format_rejects_garbage() {
        assert!(matches!(Units::USDC.format("1.5"), Err(UnitsError::Invalid(_))));
        assert!(matches!(Units::USDC.format(""), Err(UnitsError::Invalid(_))));
        assert!(matches!(Units::USDC.format("-"), Err(UnitsError::Invalid(_))));
    }

    #[test]
    fn parse_to_raw() {
        assert_eq!(Units::USDC.parse("1.5").unwrap(), 1_500_000);
        assert_eq!(Units::USDC.parse("42").unwrap(), 42_000_000);
        assert_eq!(Units::USDC.parse(".25").unwrap(), 250_000);
        assert_eq!(Units::USDC.parse("0.1000000").unwrap(), 100_000);
        assert_eq!(Units::ETHER.parse("1").unwrap(), 1_000_000_000_000_000_000);
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            Units::USDC.parse("0.0000001"),
            Err(UnitsError::TooPrecise { decimals: 6, .. })
        ));
        assert!(matches!(Units::USDC.parse("1e6"), Err(UnitsError::Invalid(_))));
        assert!(matches!(Units::USDC.parse("."), Err(UnitsError::Invalid(_))));
        assert!(matches!(
            Units::ETHER.parse("999999999999999999999999999999"),
            Err(UnitsError::Overflow(_))
        ));
    }

    #[test]
    fn format_parse_agree() {
        let raw = Units::USDC.parse("1234.000567").unwrap();
        assert_eq!(Units::USDC.format(&raw.to_string()).unwrap(), "1234.000567");
    }

    #[test]
    fn vault_deposit_uses_vault_decimals() {
        let vault = Vault {
            id: "v1".into(),
            name: "Alpha".into(),
            tvl: 0.0,
            apr: None,
            manager: None,
            total_deposit_raw: Some("2500000".into()),
            deposit_decimals: 6,
        };
        assert_eq!(vault_total_deposit(&vault).unwrap(), Some(2.5));

        let empty = Vault {
            total_deposit_raw: None,
            ..vault
        };
        assert_eq!(vault_total_deposit(&empty).unwrap(), None);
    }

    #[test]
    fn ratio_helpers() {
        assert!((bps_to_ratio(250) - 0.025).abs() < 1e-12);
        assert!((bps_to_percent(250) - 2.5).abs() < 1e-12);
        assert!((percent_to_ratio(ratio_to_percent(0.3)) - 0.3).abs() < 1e-12);
        assert_eq!(format_percent(0.125, 2), "12.50%");
    }
}
