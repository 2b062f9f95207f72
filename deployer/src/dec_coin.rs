use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use cosmrs::{Coin, Denom};
use error_stack::{ensure, Report, Result, ResultExt};
use num_traits::cast;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use crate::report::ResultCompatExt;

#[derive(Error, Debug)]
pub enum Error {
    #[error("'{0}' is not a valid decimal coin")]
    Parsing(String),
    #[error("amount must be a finite, non-negative number")]
    InvalidAmount,
    #[error("invalid denomination")]
    InvalidDenom,
    #[error("fee amount overflows")]
    FeeOverflow,
}

/// A coin with a decimal amount, as used for gas prices, e.g. `0.007uamplifier`.
#[derive(SerializeDisplay, DeserializeFromStr, Clone, Debug, PartialEq)]
pub struct DecCoin {
    pub amount: f64,
    pub denom: Denom,
}

impl DecCoin {
    pub fn new(amount: f64, denom: &str) -> Result<Self, Error> {
        ensure!(amount.is_finite() && amount >= 0.0, Error::InvalidAmount);

        Ok(Self {
            amount,
            denom: ResultCompatExt::change_context(denom.parse::<Denom>(), Error::InvalidDenom)?,
        })
    }

    /// Fee to pay for the given amount of gas, rounded up to the next integer unit.
    pub fn fee_for_gas(&self, gas: u64) -> Result<Coin, Error> {
        let gas: f64 = cast(gas).ok_or(Error::FeeOverflow)?;
        let amount: u128 = cast((gas * self.amount).ceil()).ok_or(Error::FeeOverflow)?;

        Ok(Coin {
            amount,
            denom: self.denom.clone(),
        })
    }
}

impl FromStr for DecCoin {
    type Err = Report<Error>;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let s = s.trim();
        let denom_start = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .filter(|idx| *idx > 0)
            .ok_or_else(|| Report::new(Error::Parsing(s.to_string())))?;
        let (amount, denom) = s.split_at(denom_start);

        let amount = amount
            .parse::<f64>()
            .change_context(Error::Parsing(s.to_string()))?;

        DecCoin::new(amount, denom)
    }
}

impl Display for DecCoin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[cfg(test)]
mod tests {
    use super::{DecCoin, Error};

    #[test]
    fn parse_gas_price() {
        let coin: DecCoin = "0.007uamplifier".parse().unwrap();

        assert_eq!(coin.amount, 0.007);
        assert_eq!(coin.denom.to_string(), "uamplifier");
    }

    #[test]
    fn parse_integer_amount() {
        let coin: DecCoin = "1uaxl".parse().unwrap();

        assert_eq!(coin.amount, 1.0);
        assert_eq!(coin.denom.to_string(), "uaxl");
    }

    #[test]
    fn parse_invalid_gas_price_fails() {
        for input in ["", "uaxl", "0.007", "0.0.7uaxl", "abc123"] {
            let err = input.parse::<DecCoin>().unwrap_err();
            assert!(
                matches!(err.current_context(), Error::Parsing(_)),
                "{input} should fail to parse"
            );
        }
    }

    #[test]
    fn negative_or_infinite_amount_is_rejected() {
        assert!(matches!(
            DecCoin::new(-1.0, "uaxl").unwrap_err().current_context(),
            Error::InvalidAmount
        ));
        assert!(matches!(
            DecCoin::new(f64::INFINITY, "uaxl").unwrap_err().current_context(),
            Error::InvalidAmount
        ));
    }

    #[test]
    fn display_matches_cosmos_notation() {
        let coin = DecCoin::new(0.00005, "uamplifier").unwrap();

        assert_eq!(coin.to_string(), "0.00005uamplifier");
        assert_eq!(coin.to_string().parse::<DecCoin>().unwrap(), coin);
    }

    #[test]
    fn fee_is_rounded_up() {
        let coin = DecCoin::new(0.007, "uamplifier").unwrap();

        let fee = coin.fee_for_gas(150_001).unwrap();

        assert_eq!(fee.amount, 1051);
        assert_eq!(fee.denom.to_string(), "uamplifier");
    }

    #[test]
    fn zero_gas_costs_nothing() {
        let coin = DecCoin::new(0.007, "uamplifier").unwrap();

        assert_eq!(coin.fee_for_gas(0).unwrap().amount, 0);
    }

    #[test]
    fn serde_uses_string_representation() {
        let coin: DecCoin = serde_json::from_str("\"0.5uaxl\"").unwrap();

        assert_eq!(coin, DecCoin::new(0.5, "uaxl").unwrap());
        assert_eq!(serde_json::to_string(&coin).unwrap(), "\"0.5uaxl\"");
    }
}
