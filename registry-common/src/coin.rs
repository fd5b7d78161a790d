// Native token denominations and coin arithmetic (spec §6).
//
// `wire` is the display denomination; `mwire` (1e-3) and `uwire` (1e-6) are
// the sub-denominations everything is actually stored and moved in
// (`uwire`, the base unit). Parsing follows the same "amount+denom" string
// format the original used for its governance-adjustable fee parameters.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoinError {
    #[error("malformed coin string: {0}")]
    Malformed(String),
    #[error("unknown denomination: {0}")]
    UnknownDenom(String),
    #[error("negative amount is not a valid coin")]
    Negative,
    #[error("coin amount overflow")]
    Overflow,
}

/// Multiplier (relative to the base unit `uwire`) for each recognized
/// denomination. Registered at startup, not carried as runtime state (spec
/// §9 "Global-state management").
pub fn denom_multiplier(denom: &str) -> Result<u128, CoinError> {
    match denom {
        "uwire" => Ok(1),
        "mwire" => Ok(1_000),
        "wire" => Ok(1_000_000),
        other => Err(CoinError::UnknownDenom(other.to_string())),
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug, Serialize, Deserialize)]
pub struct Coin {
    pub denom_uwire: u128,
}

impl Coin {
    pub const fn zero() -> Self {
        Coin { denom_uwire: 0 }
    }

    pub fn from_uwire(amount: u128) -> Self {
        Coin { denom_uwire: amount }
    }

    pub fn is_zero(&self) -> bool {
        self.denom_uwire == 0
    }

    pub fn checked_add(&self, other: &Coin) -> Result<Coin, CoinError> {
        self.denom_uwire
            .checked_add(other.denom_uwire)
            .map(Coin::from_uwire)
            .ok_or(CoinError::Overflow)
    }

    pub fn checked_sub(&self, other: &Coin) -> Result<Coin, CoinError> {
        self.denom_uwire
            .checked_sub(other.denom_uwire)
            .map(Coin::from_uwire)
            .ok_or(CoinError::Negative)
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}uwire", self.denom_uwire)
    }
}

/// Parses a single coin string such as `"1000000uwire"` or `"2.5wire"`.
/// Negative amounts are rejected per spec §6.
pub fn parse_coin(input: &str) -> Result<Coin, CoinError> {
    let input = input.trim();
    let split_at = input
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| CoinError::Malformed(input.to_string()))?;
    let (amount_str, denom) = input.split_at(split_at);
    if amount_str.starts_with('-') {
        return Err(CoinError::Negative);
    }
    let multiplier = denom_multiplier(denom)?;

    let amount_uwire = if let Some((whole, frac)) = amount_str.split_once('.') {
        let whole: u128 = whole
            .parse()
            .map_err(|_| CoinError::Malformed(input.to_string()))?;
        let frac_digits = frac.len() as u32;
        let frac_value: u128 = frac
            .parse()
            .map_err(|_| CoinError::Malformed(input.to_string()))?;
        let scale = 10u128
            .checked_pow(frac_digits)
            .ok_or(CoinError::Overflow)?;
        whole
            .checked_mul(multiplier)
            .and_then(|w| {
                frac_value
                    .checked_mul(multiplier)
                    .map(|f| (w, f / scale.max(1)))
            })
            .map(|(w, f)| w + f)
            .ok_or(CoinError::Overflow)?
    } else {
        let whole: u128 = amount_str
            .parse()
            .map_err(|_| CoinError::Malformed(input.to_string()))?;
        whole.checked_mul(multiplier).ok_or(CoinError::Overflow)?
    };

    Ok(Coin::from_uwire(amount_uwire))
}

/// A multi-denom balance, keyed by base-unit totals. Bonds and module
/// accounts hold `Coins`; parsed fee parameters are always single-denom but
/// balances can in principle accumulate more than one.
#[derive(Clone, Default, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(denom: &str, amount: u128) -> Self {
        let mut map = BTreeMap::new();
        if amount > 0 {
            map.insert(denom.to_string(), amount);
        }
        Coins(map)
    }

    pub fn uwire(amount: u128) -> Self {
        Self::single("uwire", amount)
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        *self.0.get(denom).unwrap_or(&0)
    }

    pub fn total_uwire(&self) -> u128 {
        self.amount_of("uwire")
    }

    pub fn is_zero(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }

    pub fn checked_add(&self, other: &Coins) -> Result<Coins, CoinError> {
        let mut out = self.0.clone();
        for (denom, amount) in &other.0 {
            let entry = out.entry(denom.clone()).or_insert(0);
            *entry = entry.checked_add(*amount).ok_or(CoinError::Overflow)?;
        }
        Ok(Coins(out))
    }

    pub fn checked_sub(&self, other: &Coins) -> Result<Coins, CoinError> {
        let mut out = self.0.clone();
        for (denom, amount) in &other.0 {
            let entry = out.entry(denom.clone()).or_insert(0);
            *entry = entry.checked_sub(*amount).ok_or(CoinError::Negative)?;
        }
        Ok(Coins(out))
    }

    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other
            .0
            .iter()
            .all(|(denom, amount)| self.amount_of(denom) >= *amount)
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Coins::uwire(coin.denom_uwire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_uwire() {
        assert_eq!(parse_coin("1000000uwire").unwrap().denom_uwire, 1_000_000);
    }

    #[test]
    fn parses_wire_with_multiplier() {
        assert_eq!(parse_coin("1wire").unwrap().denom_uwire, 1_000_000);
    }

    #[test]
    fn parses_fractional_wire() {
        assert_eq!(parse_coin("2.5wire").unwrap().denom_uwire, 2_500_000);
    }

    #[test]
    fn rejects_negative() {
        assert_eq!(parse_coin("-5uwire").unwrap_err(), CoinError::Negative);
    }

    #[test]
    fn rejects_unknown_denom() {
        assert!(matches!(
            parse_coin("5foo"),
            Err(CoinError::UnknownDenom(_))
        ));
    }

    #[test]
    fn coins_arithmetic() {
        let a = Coins::uwire(5_000_000);
        let b = Coins::uwire(1_000_000);
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.total_uwire(), 6_000_000);
        let diff = sum.checked_sub(&b).unwrap();
        assert_eq!(diff.total_uwire(), 5_000_000);
        assert!(a.checked_sub(&sum).is_err());
    }
}
