use std::str::FromStr;

use anyhow::bail;
use rust_decimal::Decimal;

use infra::ids::Id;

use super::ProductLine;
use crate::costing::IngredientLookup;
use crate::errors::LineParseError;
use crate::ingredients::Ingredient;
use crate::units::Unit;

const FIELD_SEPARATOR: char = ':';

/// A recipe line as typed by hand: `<ingredient-id>:<quantity>[:<unit>]`.
/// Without a unit, the line is measured in the ingredient's own unit.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSpec {
    pub ingredient_id: Id<Ingredient>,
    pub quantity: Decimal,
    pub unit: Option<Unit>,
}

impl LineSpec {
    /// Fills in a missing unit from `catalog`. A line naming an unknown
    /// ingredient falls back to grams; validation rejects it later.
    pub fn resolve<L: IngredientLookup + ?Sized>(self, catalog: &L) -> ProductLine {
        let LineSpec {
            ingredient_id,
            quantity,
            unit,
        } = self;
        let unit = match unit {
            Some(unit) => unit,
            None => catalog
                .ingredient(&ingredient_id)
                .map(|i| i.unit().clone())
                .unwrap_or(Unit::Gram),
        };
        ProductLine::new(ingredient_id, quantity, unit)
    }
}

impl FromStr for LineSpec {
    type Err = anyhow::Error;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let mut parts = src.trim().splitn(3, FIELD_SEPARATOR);
        let (id, quantity) = match (parts.next(), parts.next()) {
            (Some(id), Some(quantity)) if !id.is_empty() => (id, quantity.trim()),
            _ => bail!(LineParseError::Malformed(src.to_string())),
        };
        let ingredient_id = id.parse()?;
        let quantity = match quantity.parse::<Decimal>() {
            Ok(quantity) => quantity,
            Err(_) => bail!(LineParseError::BadQuantity(
                quantity.to_string(),
                src.to_string()
            )),
        };
        let unit = match parts.next().map(str::trim) {
            Some(name) if !name.is_empty() => match name.parse::<Unit>() {
                Ok(unit) => Some(unit),
                Err(never) => match never {},
            },
            _ => None,
        };
        Ok(LineSpec {
            ingredient_id,
            quantity,
            unit,
        })
    }
}
