use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};

const DISPLAY_PLACES: u32 = 3;

/// An amount rendered with Indonesian digit grouping: `.` between thousands
/// and `,` before the fraction, e.g. `Rp 1.234.567,5`. At most three fraction
/// digits are shown, with halves rounded away from zero.
#[derive(Debug, Clone, Copy)]
pub struct Money<'a> {
    amount: Decimal,
    currency: &'a str,
}

impl<'a> Money<'a> {
    pub fn new(amount: Decimal, currency: &'a str) -> Self {
        Money { amount, currency }
    }
}

impl<'a> fmt::Display for Money<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if !self.currency.is_empty() {
            write!(fmt, "{} ", self.currency)?;
        }
        let shown = self
            .amount
            .round_dp_with_strategy(DISPLAY_PLACES, RoundingStrategy::MidpointAwayFromZero);
        write!(fmt, "{}", Grouped(shown))
    }
}

/// A quantity with grouping but no rounding beyond trailing zeros.
pub struct Grouped(pub Decimal);

impl fmt::Display for Grouped {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let plain = self.0.normalize().to_string();
        let (sign, digits) = if plain.starts_with('-') {
            ("-", &plain[1..])
        } else {
            ("", &plain[..])
        };
        let mut parts = digits.splitn(2, '.');
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next();

        fmt.write_str(sign)?;
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                fmt.write_str(".")?;
            }
            write!(fmt, "{}", c)?;
        }
        if let Some(fraction) = fraction {
            write!(fmt, ",{}", fraction)?;
        }
        Ok(())
    }
}
