//! Products and their recipes. A product's total cost is kept in step with
//! the ingredient catalog.

use anyhow::{Context, Result};
use log::*;

use infra::ids::Id;

use crate::costing::{self, CostBreakdown};
use crate::errors::{CatalogError, ValidationError};
use crate::ingredients::IngredientList;
use crate::services::{Commandable, Queryable, Request};
use crate::CostBook;

mod lines;
mod models;

pub use self::lines::LineSpec;
pub use self::models::{Product, ProductDraft, ProductLine, ProductList};

#[derive(Debug, Clone, PartialEq)]
pub struct AddProduct(pub ProductDraft);

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateProduct {
    pub id: Id<Product>,
    pub draft: ProductDraft,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeleteProduct(pub Id<Product>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListProducts;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShowProduct(pub Id<Product>);

/// Costs a recipe that has not been saved.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateCost(pub Vec<ProductLine>);

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetail {
    pub product: Product,
    pub breakdown: CostBreakdown,
}

impl Request for AddProduct {
    type Resp = Product;
}

impl Request for UpdateProduct {
    type Resp = Product;
}

impl Request for DeleteProduct {
    type Resp = Product;
}

impl Request for ListProducts {
    type Resp = Vec<Product>;
}

impl Request for ShowProduct {
    type Resp = ProductDetail;
}

impl Request for EstimateCost {
    type Resp = CostBreakdown;
}

fn check_draft(draft: &ProductDraft, catalog: &IngredientList) -> Result<(), ValidationError> {
    if catalog.is_empty() {
        return Err(ValidationError::EmptyCatalog);
    }
    draft.validate(catalog)
}

impl Commandable<AddProduct> for CostBook {
    fn execute(&self, AddProduct(draft): AddProduct) -> Result<Product> {
        let catalog = self.load_ingredients()?;
        check_draft(&draft, &catalog)?;

        let mut list = self.load_products()?;
        let product = Product::new(self.idgen().generate(), draft, &catalog)?;
        info!(
            "Adding product {} ({}) costing {}",
            product.id(),
            product.name(),
            product.total_cost()
        );
        list.products.push(product.clone());
        self.save_products(&mut list).context("save products")?;
        Ok(product)
    }
}

impl Commandable<UpdateProduct> for CostBook {
    fn execute(&self, req: UpdateProduct) -> Result<Product> {
        let UpdateProduct { id, draft } = req;
        let catalog = self.load_ingredients()?;
        check_draft(&draft, &catalog)?;

        let mut list = self.load_products()?;
        let product = {
            let product = list
                .get_mut(&id)
                .ok_or_else(|| CatalogError::ProductNotFound(id))?;
            product.revise(draft, &catalog)?;
            product.clone()
        };
        info!(
            "Updated product {} ({}) costing {}",
            id,
            product.name(),
            product.total_cost()
        );
        self.save_products(&mut list).context("save products")?;
        Ok(product)
    }
}

impl Commandable<DeleteProduct> for CostBook {
    fn execute(&self, DeleteProduct(id): DeleteProduct) -> Result<Product> {
        let mut list = self.load_products()?;
        let removed = list
            .remove(&id)
            .ok_or_else(|| CatalogError::ProductNotFound(id))?;
        self.save_products(&mut list).context("save products")?;
        info!("Deleted product {} ({})", id, removed.name());
        Ok(removed)
    }
}

impl Queryable<ListProducts> for CostBook {
    fn query(&self, _: ListProducts) -> Result<Vec<Product>> {
        let list = self.load_products()?;
        Ok(list.products)
    }
}

impl Queryable<ShowProduct> for CostBook {
    fn query(&self, ShowProduct(id): ShowProduct) -> Result<ProductDetail> {
        let catalog = self.load_ingredients()?;
        let list = self.load_products()?;
        let product = list
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::ProductNotFound(id))?;
        let breakdown = costing::breakdown(product.lines(), &catalog)?;
        debug!("Breakdown for {}: {:?}", id, breakdown);
        Ok(ProductDetail { product, breakdown })
    }
}

impl Queryable<EstimateCost> for CostBook {
    fn query(&self, EstimateCost(lines): EstimateCost) -> Result<CostBreakdown> {
        let catalog = self.load_ingredients()?;
        Ok(costing::breakdown(&lines, &catalog)?)
    }
}
