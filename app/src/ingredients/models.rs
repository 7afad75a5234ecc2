use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, Document, HasMeta};
use infra::ids::{Entity, Id};

use crate::errors::ValidationError;
use crate::units::Unit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub(crate) id: Id<Ingredient>,
    pub(crate) name: String,
    pub(crate) purchase_price: Decimal,
    pub(crate) package_size: Decimal,
    pub(crate) unit: Unit,
    pub(crate) price_per_unit: Decimal,
}

/// What a user supplies for an ingredient; everything else is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientDraft {
    pub name: String,
    pub purchase_price: Decimal,
    pub package_size: Decimal,
    pub unit: Unit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientList {
    #[serde(flatten)]
    pub(crate) meta: DocMeta,
    pub(crate) ingredients: Vec<Ingredient>,
}

impl Ingredient {
    pub(crate) fn new(id: Id<Ingredient>, draft: IngredientDraft) -> Self {
        let mut ingredient = Ingredient {
            id,
            name: String::new(),
            purchase_price: Decimal::ZERO,
            package_size: Decimal::ONE,
            unit: Unit::Gram,
            price_per_unit: Decimal::ZERO,
        };
        ingredient.revise(draft);
        ingredient
    }

    /// Replaces the user-supplied fields and re-derives the price per unit.
    pub(crate) fn revise(&mut self, draft: IngredientDraft) {
        let IngredientDraft {
            name,
            purchase_price,
            package_size,
            unit,
        } = draft;
        self.name = name.trim().to_string();
        self.purchase_price = purchase_price;
        self.package_size = package_size;
        self.unit = unit;
        self.price_per_unit = purchase_price
            .checked_div(package_size)
            .unwrap_or(Decimal::ZERO);
    }

    pub fn id(&self) -> Id<Ingredient> {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn purchase_price(&self) -> Decimal {
        self.purchase_price
    }
    pub fn package_size(&self) -> Decimal {
        self.package_size
    }
    pub fn unit(&self) -> &Unit {
        &self.unit
    }
    pub fn price_per_unit(&self) -> Decimal {
        self.price_per_unit
    }
}

impl IngredientDraft {
    pub fn new(
        name: impl Into<String>,
        purchase_price: Decimal,
        package_size: Decimal,
        unit: Unit,
    ) -> Self {
        IngredientDraft {
            name: name.into(),
            purchase_price,
            package_size,
            unit,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName("ingredient"));
        }
        if self.package_size <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePackageSize(self.package_size));
        }
        if self.purchase_price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice(self.purchase_price));
        }
        if self.purchase_price.checked_div(self.package_size).is_none() {
            return Err(ValidationError::UnrepresentablePrice(
                self.purchase_price,
                self.package_size,
            ));
        }
        Ok(())
    }
}

impl IngredientList {
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn get(&self, id: &Id<Ingredient>) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| i.id == *id)
    }

    pub(crate) fn get_mut(&mut self, id: &Id<Ingredient>) -> Option<&mut Ingredient> {
        self.ingredients.iter_mut().find(|i| i.id == *id)
    }

    pub(crate) fn remove(&mut self, id: &Id<Ingredient>) -> Option<Ingredient> {
        let idx = self.ingredients.iter().position(|i| i.id == *id)?;
        Some(self.ingredients.remove(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }
}

impl Entity for Ingredient {
    const PREFIX: &'static str = "ingredient";
}

impl HasMeta for IngredientList {
    fn meta(&self) -> &DocMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta {
        &mut self.meta
    }
}

impl Document for IngredientList {
    const NAME: &'static str = "ingredients";
    const SCHEMA_VERSION: u32 = 1;
}
