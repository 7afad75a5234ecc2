//! Cost aggregation: a product line costs its quantity, expressed in the
//! ingredient's own unit, times the ingredient's price per unit. Arithmetic is
//! checked: a cost too large for a `Decimal` comes back as `CostOverflow`.

use log::*;
use rust_decimal::Decimal;
use serde::Serialize;

use infra::ids::Id;

use crate::errors::CostOverflow;
use crate::ingredients::{Ingredient, IngredientList};
use crate::products::ProductLine;
use crate::units::{self, Unit};

pub trait IngredientLookup {
    fn ingredient(&self, id: &Id<Ingredient>) -> Option<&Ingredient>;
}

impl IngredientLookup for [Ingredient] {
    fn ingredient(&self, id: &Id<Ingredient>) -> Option<&Ingredient> {
        self.iter().find(|i| i.id() == *id)
    }
}

impl IngredientLookup for IngredientList {
    fn ingredient(&self, id: &Id<Ingredient>) -> Option<&Ingredient> {
        self.get(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCost {
    pub ingredient_id: Id<Ingredient>,
    pub quantity: Decimal,
    pub unit: Unit,
    /// `None` when the ingredient no longer exists.
    pub ingredient: Option<CostedIngredient>,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostedIngredient {
    pub name: String,
    pub unit: Unit,
    pub converted_quantity: Decimal,
    pub price_per_unit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub lines: Vec<LineCost>,
    pub total: Decimal,
}

pub fn line_cost(line: &ProductLine, ingredient: &Ingredient) -> Result<Decimal, CostOverflow> {
    units::convert(line.quantity, &line.unit, ingredient.unit())
        .and_then(|converted| converted.checked_mul(ingredient.price_per_unit()))
        .ok_or(CostOverflow(line.ingredient_id))
}

/// Sums the cost of every line whose ingredient can still be found.
pub fn total_cost<L: IngredientLookup + ?Sized>(
    lines: &[ProductLine],
    catalog: &L,
) -> Result<Decimal, CostOverflow> {
    let mut total = Decimal::ZERO;
    for line in lines {
        let ingredient = match catalog.ingredient(&line.ingredient_id) {
            Some(ingredient) => ingredient,
            None => {
                warn!("Skipping line for missing ingredient {}", line.ingredient_id);
                continue;
            }
        };
        let cost = line_cost(line, ingredient)?;
        total = total
            .checked_add(cost)
            .ok_or(CostOverflow(line.ingredient_id))?;
    }
    Ok(total)
}

pub fn breakdown<L: IngredientLookup + ?Sized>(
    lines: &[ProductLine],
    catalog: &L,
) -> Result<CostBreakdown, CostOverflow> {
    let mut costed = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    for line in lines {
        let (ingredient, cost) = match catalog.ingredient(&line.ingredient_id) {
            Some(i) => {
                let converted_quantity = units::convert(line.quantity, &line.unit, i.unit())
                    .ok_or(CostOverflow(line.ingredient_id))?;
                let detail = CostedIngredient {
                    name: i.name().to_string(),
                    unit: i.unit().clone(),
                    converted_quantity,
                    price_per_unit: i.price_per_unit(),
                };
                (Some(detail), line_cost(line, i)?)
            }
            None => (None, Decimal::ZERO),
        };
        total = total
            .checked_add(cost)
            .ok_or(CostOverflow(line.ingredient_id))?;
        costed.push(LineCost {
            ingredient_id: line.ingredient_id,
            quantity: line.quantity,
            unit: line.unit.clone(),
            ingredient,
            cost,
        });
    }
    Ok(CostBreakdown {
        lines: costed,
        total,
    })
}
