//! Measurement units and the fixed conversion table.
//!
//! Every unit maps to a "grams-equivalent" factor, so weight, volume and
//! count share one basis: a millilitre weighs a gram and a piece counts as
//! one. Unrecognised unit names are carried through verbatim and convert with
//! a factor of one.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Unit {
    Gram,
    Kilogram,
    Millilitre,
    Litre,
    Tablespoon,
    Teaspoon,
    Piece,
    Other(String),
}

impl Unit {
    /// The known units, in the order they are offered for selection.
    pub fn known() -> [Unit; 7] {
        [
            Unit::Gram,
            Unit::Kilogram,
            Unit::Millilitre,
            Unit::Litre,
            Unit::Piece,
            Unit::Tablespoon,
            Unit::Teaspoon,
        ]
    }

    pub fn name(&self) -> &str {
        match self {
            Unit::Gram => "gram",
            Unit::Kilogram => "kg",
            Unit::Millilitre => "ml",
            Unit::Litre => "liter",
            Unit::Tablespoon => "tablespoon",
            Unit::Teaspoon => "teaspoon",
            Unit::Piece => "piece",
            Unit::Other(name) => name,
        }
    }

    pub fn factor(&self) -> Decimal {
        match self {
            Unit::Gram | Unit::Millilitre | Unit::Piece => Decimal::ONE,
            Unit::Kilogram | Unit::Litre => Decimal::from(1000),
            Unit::Tablespoon => Decimal::from(15),
            Unit::Teaspoon => Decimal::from(5),
            Unit::Other(_) => Decimal::ONE,
        }
    }

    pub fn is_known(&self) -> bool {
        match self {
            Unit::Other(_) => false,
            _ => true,
        }
    }
}

/// Expresses `quantity` of `from` in units of `to`; `None` when the result
/// does not fit in a `Decimal`.
pub fn convert(quantity: Decimal, from: &Unit, to: &Unit) -> Option<Decimal> {
    if from.factor() == to.factor() {
        return Some(quantity);
    }
    let (from, to) = (from.factor(), to.factor());
    quantity
        .checked_mul(from)
        .and_then(|q| q.checked_div(to))
        .or_else(|| quantity.checked_div(to)?.checked_mul(from))
}

impl FromStr for Unit {
    type Err = Infallible;
    fn from_str(src: &str) -> Result<Self, Infallible> {
        let name = src.trim();
        let unit = match name.to_lowercase().as_str() {
            "gram" | "grams" | "g" | "gr" => Unit::Gram,
            "kg" | "kilogram" | "kilograms" => Unit::Kilogram,
            "ml" | "millilitre" | "milliliter" => Unit::Millilitre,
            "liter" | "litre" | "l" => Unit::Litre,
            "tablespoon" | "tbsp" | "sdm" => Unit::Tablespoon,
            "teaspoon" | "tsp" | "sdt" => Unit::Teaspoon,
            "piece" | "pieces" | "pcs" | "pc" => Unit::Piece,
            _ => Unit::Other(name.to_string()),
        };
        Ok(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        match name.parse() {
            Ok(unit) => Ok(unit),
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal")
    }

    fn all_units() -> Vec<Unit> {
        let mut units = Unit::known().to_vec();
        units.push(Unit::Other("cup".into()));
        units
    }

    #[test]
    fn converting_to_the_same_unit_is_identity() {
        for unit in all_units() {
            for q in &["0", "1", "2.5", "0.333", "12345.678", "-4"] {
                assert_eq!(convert(dec(q), &unit, &unit), Some(dec(q)), "{} {}", q, unit);
            }
        }
    }

    #[test]
    fn kilograms_to_grams() {
        assert_eq!(convert(Decimal::ONE, &Unit::Kilogram, &Unit::Gram), Some(dec("1000")));
        assert_eq!(convert(dec("250"), &Unit::Gram, &Unit::Kilogram), Some(dec("0.25")));
    }

    #[test]
    fn litres_to_millilitres() {
        assert_eq!(convert(Decimal::ONE, &Unit::Litre, &Unit::Millilitre), Some(dec("1000")));
    }

    #[test]
    fn spoons_are_measured_in_grams() {
        assert_eq!(convert(dec("2"), &Unit::Tablespoon, &Unit::Gram), Some(dec("30")));
        assert_eq!(convert(dec("3"), &Unit::Teaspoon, &Unit::Tablespoon), Some(dec("1")));
    }

    #[test]
    fn volume_and_weight_are_interchangeable() {
        assert_eq!(convert(dec("500"), &Unit::Millilitre, &Unit::Kilogram), Some(dec("0.5")));
        assert_eq!(convert(dec("3"), &Unit::Piece, &Unit::Gram), Some(dec("3")));
    }

    #[test]
    fn unknown_units_fall_back_to_factor_one() {
        let cup = Unit::Other("cup".into());
        assert_eq!(cup.factor(), Decimal::ONE);
        assert_eq!(convert(dec("2"), &cup, &Unit::Gram), Some(dec("2")));
        assert_eq!(convert(dec("2000"), &cup, &Unit::Kilogram), Some(dec("2")));
    }

    #[test]
    fn oversized_quantities_do_not_convert() {
        assert_eq!(convert(Decimal::MAX, &Unit::Kilogram, &Unit::Gram), None);
        let down = convert(Decimal::MAX, &Unit::Gram, &Unit::Kilogram).expect("fits");
        assert!(down < Decimal::MAX, "{}", down);
        assert_eq!(convert(Decimal::MAX, &Unit::Gram, &Unit::Millilitre), Some(Decimal::MAX));
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("sdm".parse::<Unit>(), Ok(Unit::Tablespoon));
        assert_eq!("SDT".parse::<Unit>(), Ok(Unit::Teaspoon));
        assert_eq!("pcs".parse::<Unit>(), Ok(Unit::Piece));
        assert_eq!(" Litre ".parse::<Unit>(), Ok(Unit::Litre));
        assert_eq!("g".parse::<Unit>(), Ok(Unit::Gram));
    }

    #[test]
    fn keeps_unknown_names_verbatim() {
        let unit = "Cup".parse::<Unit>().expect("parse");
        assert_eq!(unit, Unit::Other("Cup".into()));
        assert_eq!(unit.to_string(), "Cup");
        assert!(!unit.is_known());
    }

    #[test]
    fn serializes_by_canonical_name() {
        let json = serde_json::to_string(&Unit::Tablespoon).expect("to json");
        assert_eq!(json, "\"tablespoon\"");
        let back: Unit = serde_json::from_str("\"sdm\"").expect("from json");
        assert_eq!(back, Unit::Tablespoon);
        let other: Unit = serde_json::from_str("\"bunch\"").expect("from json");
        assert_eq!(other, Unit::Other("bunch".into()));
    }

    #[test]
    fn known_units_round_trip_through_their_names() {
        for unit in Unit::known().iter() {
            assert!(unit.is_known());
            assert_eq!(unit.name().parse::<Unit>().as_ref(), Ok(unit));
        }
    }
}
