//! Monetary amount for deposits and withdrawals

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use super::result::{Error, Result};

/// Fractional digits stored for balances and amounts (DECIMAL(18, 2))
pub const MONEY_SCALE: u32 = 2;

/// Largest value a DECIMAL(18, 2) column holds (9999999999999999.99),
/// for amounts and balances
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

/// A strictly positive amount with at most two fractional digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(Error::invalid_amount("the amount must be greater than zero"));
        }
        check_max(value)?;
        check_scale(value)?;
        Ok(Self(value))
    }

    /// Parse user input such as `"250.50"`
    pub fn parse(input: &str) -> Result<Self> {
        let value = Decimal::from_str(input.trim())
            .map_err(|_| Error::invalid_amount("please enter a number"))?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Validate an opening balance: zero is allowed, negative is not
pub fn check_opening_balance(value: Decimal) -> Result<Decimal> {
    if value < Decimal::ZERO {
        return Err(Error::invalid_amount("the opening balance cannot be negative"));
    }
    check_scale(value)?;
    Ok(value)
}

/// Parse an opening balance typed on the command line
pub fn parse_opening_balance(input: &str) -> Result<Decimal> {
    let value = Decimal::from_str(input.trim())
        .map_err(|_| Error::invalid_amount(format!("'{}' is not a valid balance", input.trim())))?;
    check_opening_balance(value)
}

fn check_max(value: Decimal) -> Result<()> {
    if value > MAX_AMOUNT {
        return Err(Error::invalid_amount(format!(
            "amounts above {} are not accepted",
            MAX_AMOUNT
        )));
    }
    Ok(())
}

fn check_scale(value: Decimal) -> Result<()> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(Error::invalid_amount(format!(
            "at most {} decimal places are allowed",
            MONEY_SCALE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_amount() {
        let amount = Amount::new(Decimal::new(25050, 2)).unwrap();
        assert_eq!(amount.value(), Decimal::new(25050, 2));
        assert_eq!(amount.to_string(), "250.50");
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert!(matches!(Amount::new(Decimal::ZERO), Err(Error::InvalidAmount(_))));
        assert!(matches!(Amount::new(Decimal::new(-1, 0)), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_too_many_decimal_places() {
        assert!(matches!(Amount::parse("1.005"), Err(Error::InvalidAmount(_))));
        // Trailing zeros are not extra precision
        assert!(Amount::parse("1.500").is_ok());
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(Amount::parse(" 100 ").unwrap().value(), Decimal::new(100, 0));
        assert!(matches!(Amount::parse("ten"), Err(Error::InvalidAmount(_))));
        assert!(matches!(Amount::parse(""), Err(Error::InvalidAmount(_))));
        assert!(matches!(Amount::parse("-5"), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_opening_balance() {
        assert_eq!(check_opening_balance(Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert!(check_opening_balance(Decimal::new(-1, 2)).is_err());
        assert!(check_opening_balance(Decimal::new(1, 3)).is_err());
        assert_eq!(check_opening_balance(MAX_AMOUNT).unwrap(), MAX_AMOUNT);
        assert!(matches!(
            check_opening_balance(MAX_AMOUNT + Decimal::new(1, 2)),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_max_amount_matches_column() {
        assert_eq!(MAX_AMOUNT.to_string(), "9999999999999999.99");
        assert_eq!(MAX_AMOUNT, Decimal::new(999_999_999_999_999_999, 2));
    }

    #[test]
    fn test_amount_above_column_maximum_rejected() {
        assert_eq!(Amount::parse("9999999999999999.99").unwrap().value(), MAX_AMOUNT);
        assert!(matches!(
            Amount::parse("100000000000000000"),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::parse("10000000000000000.00"),
            Err(Error::InvalidAmount(_))
        ));
        // Too large for Decimal itself
        assert!(matches!(
            Amount::parse("100000000000000000000000000000000"),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_parse_opening_balance() {
        assert_eq!(parse_opening_balance(" 10.50 ").unwrap(), Decimal::new(1050, 2));
        assert!(matches!(parse_opening_balance("lots"), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_opening_balance("-1"), Err(Error::InvalidAmount(_))));
        assert!(matches!(
            parse_opening_balance("99999999999999999"),
            Err(Error::InvalidAmount(_))
        ));
    }
}
