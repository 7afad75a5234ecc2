use anyhow::{Context, Result};
use log::*;

use infra::documents::RecordKey;
use infra::ids::{Id, IdGen};
use infra::persistence::{Documents, Storage};

pub mod config;
pub mod costing;
pub mod errors;
pub mod ingredients;
pub mod money;
pub mod products;
pub mod services;
pub mod units;

#[cfg(test)]
mod test;

use crate::ingredients::IngredientList;
use crate::products::{Product, ProductList};
use crate::services::{Queryable, Request};

/// The ingredient catalog and product list, kept as two records in a
/// key-value store.
pub struct CostBook {
    storage: Box<dyn Storage>,
    namespace: String,
    idgen: IdGen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShowStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub ingredients: usize,
    pub products: usize,
}

impl CostBook {
    pub fn new(config: &config::Config) -> Result<Self> {
        let storage = config.store.build().context("open store")?;
        Ok(Self::with_storage(storage, config.namespace.clone()))
    }

    pub fn with_storage(storage: Box<dyn Storage>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        info!("Opening cost book in namespace {:?}", namespace);
        CostBook {
            storage,
            namespace,
            idgen: IdGen::new(),
        }
    }

    pub fn setup(&self) -> Result<()> {
        debug!("Init store");
        self.docs().setup().context("setup store")
    }

    pub fn storage(&self) -> &dyn Storage {
        &*self.storage
    }

    pub fn ingredients_key(&self) -> RecordKey<IngredientList> {
        RecordKey::new(self.namespace.as_str())
    }

    pub fn products_key(&self) -> RecordKey<ProductList> {
        RecordKey::new(self.namespace.as_str())
    }

    fn docs(&self) -> Documents {
        Documents::wrap(&*self.storage)
    }

    pub(crate) fn idgen(&self) -> &IdGen {
        &self.idgen
    }

    pub(crate) fn load_ingredients(&self) -> Result<IngredientList> {
        let key = self.ingredients_key();
        let list = self
            .docs()
            .load(&key)
            .with_context(|| format!("load {}", key))?
            .unwrap_or_default();
        trace!("Loaded {} ingredients from {}", list.len(), key);
        Ok(list)
    }

    pub(crate) fn save_ingredients(&self, list: &mut IngredientList) -> Result<()> {
        self.docs().save(&self.ingredients_key(), list)
    }

    pub(crate) fn load_products(&self) -> Result<ProductList> {
        let key = self.products_key();
        let list = self
            .docs()
            .load(&key)
            .with_context(|| format!("load {}", key))?
            .unwrap_or_default();
        trace!("Loaded {} products from {}", list.len(), key);
        Ok(list)
    }

    pub(crate) fn save_products(&self, list: &mut ProductList) -> Result<()> {
        self.docs().save(&self.products_key(), list)
    }

    /// Saves `catalog` along with the product costs it implies. Products are
    /// repriced before anything is written, so a cost that does not fit leaves
    /// both records as they were. The product list is only written when a
    /// total moved.
    pub(crate) fn save_catalog(&self, catalog: &mut IngredientList) -> Result<Vec<Id<Product>>> {
        let mut products = self.load_products()?;
        let changed = products.reprice_all(&*catalog)?;
        self.save_ingredients(catalog)
            .context("save ingredients")?;
        if changed.is_empty() {
            debug!("No product costs changed");
            return Ok(changed);
        }
        for id in changed.iter() {
            info!("Repriced product {}", id);
        }
        self.save_products(&mut products)
            .context("save repriced products")?;
        Ok(changed)
    }
}

impl Request for ShowStats {
    type Resp = Stats;
}

impl Queryable<ShowStats> for CostBook {
    fn query(&self, _: ShowStats) -> Result<Stats> {
        let ingredients = self.load_ingredients()?.len();
        let products = self.load_products()?.len();
        Ok(Stats {
            ingredients,
            products,
        })
    }
}
