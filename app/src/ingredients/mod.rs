//! The ingredient catalog: purchase prices and the price per unit derived
//! from them.

use anyhow::{Context, Result};
use log::*;

use infra::ids::Id;

use crate::errors::CatalogError;
use crate::products::Product;
use crate::services::{Commandable, Queryable, Request};
use crate::CostBook;

mod models;

pub use self::models::{Ingredient, IngredientDraft, IngredientList};

#[derive(Debug, Clone, PartialEq)]
pub struct AddIngredient(pub IngredientDraft);

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateIngredient {
    pub id: Id<Ingredient>,
    pub draft: IngredientDraft,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeleteIngredient(pub Id<Ingredient>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListIngredients;

/// An ingredient as saved, along with the products whose cost moved because
/// of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Repriced {
    pub ingredient: Ingredient,
    pub products: Vec<Id<Product>>,
}

impl Request for AddIngredient {
    type Resp = Ingredient;
}

impl Request for UpdateIngredient {
    type Resp = Repriced;
}

impl Request for DeleteIngredient {
    type Resp = Ingredient;
}

impl Request for ListIngredients {
    type Resp = Vec<Ingredient>;
}

impl Commandable<AddIngredient> for CostBook {
    fn execute(&self, AddIngredient(draft): AddIngredient) -> Result<Ingredient> {
        draft.validate()?;
        let mut list = self.load_ingredients()?;
        let ingredient = Ingredient::new(self.idgen().generate(), draft);
        info!(
            "Adding ingredient {} ({}): {} per {}",
            ingredient.id(),
            ingredient.name(),
            ingredient.price_per_unit(),
            ingredient.unit()
        );
        list.ingredients.push(ingredient.clone());
        self.save_catalog(&mut list)?;
        Ok(ingredient)
    }
}

impl Commandable<UpdateIngredient> for CostBook {
    fn execute(&self, req: UpdateIngredient) -> Result<Repriced> {
        let UpdateIngredient { id, draft } = req;
        draft.validate()?;
        let mut list = self.load_ingredients()?;
        let ingredient = {
            let ingredient = list
                .get_mut(&id)
                .ok_or_else(|| CatalogError::IngredientNotFound(id))?;
            ingredient.revise(draft);
            ingredient.clone()
        };
        info!(
            "Updated ingredient {} ({}): {} per {}",
            id,
            ingredient.name(),
            ingredient.price_per_unit(),
            ingredient.unit()
        );
        let products = self.save_catalog(&mut list)?;
        Ok(Repriced {
            ingredient,
            products,
        })
    }
}

impl Commandable<DeleteIngredient> for CostBook {
    fn execute(&self, DeleteIngredient(id): DeleteIngredient) -> Result<Ingredient> {
        let products = self.load_products()?;
        let users = products
            .using(&id)
            .map(|p| p.name().to_string())
            .collect::<Vec<_>>();
        if !users.is_empty() {
            warn!("Refusing to delete ingredient {} used by {:?}", id, users);
            return Err(CatalogError::IngredientInUse(id, users).into());
        }

        let mut list = self.load_ingredients()?;
        let removed = list
            .remove(&id)
            .ok_or_else(|| CatalogError::IngredientNotFound(id))?;
        self.save_ingredients(&mut list)
            .context("save ingredients")?;
        info!("Deleted ingredient {} ({})", id, removed.name());
        Ok(removed)
    }
}

impl Queryable<ListIngredients> for CostBook {
    fn query(&self, _: ListIngredients) -> Result<Vec<Ingredient>> {
        let list = self.load_ingredients()?;
        Ok(list.ingredients)
    }
}
