use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, Document, HasMeta};
use infra::ids::{Entity, Id};

use crate::costing::{self, IngredientLookup};
use crate::errors::{CostOverflow, ValidationError};
use crate::ingredients::Ingredient;
use crate::units::Unit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub ingredient_id: Id<Ingredient>,
    pub quantity: Decimal,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub(crate) id: Id<Product>,
    pub(crate) name: String,
    pub(crate) lines: Vec<ProductLine>,
    pub(crate) total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub lines: Vec<ProductLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductList {
    #[serde(flatten)]
    pub(crate) meta: DocMeta,
    pub(crate) products: Vec<Product>,
}

impl ProductLine {
    pub fn new(ingredient_id: Id<Ingredient>, quantity: Decimal, unit: Unit) -> Self {
        ProductLine {
            ingredient_id,
            quantity,
            unit,
        }
    }
}

impl Product {
    pub(crate) fn new<L: IngredientLookup + ?Sized>(
        id: Id<Product>,
        draft: ProductDraft,
        catalog: &L,
    ) -> Result<Self, CostOverflow> {
        let mut product = Product {
            id,
            name: String::new(),
            lines: Vec::new(),
            total_cost: Decimal::ZERO,
        };
        product.revise(draft, catalog)?;
        Ok(product)
    }

    /// Replaces name and lines and recosts them. Leaves the product untouched
    /// when the cost does not fit.
    pub(crate) fn revise<L: IngredientLookup + ?Sized>(
        &mut self,
        draft: ProductDraft,
        catalog: &L,
    ) -> Result<(), CostOverflow> {
        let ProductDraft { name, lines } = draft;
        let total_cost = costing::total_cost(&lines, catalog)?;
        self.name = name.trim().to_string();
        self.lines = lines;
        self.total_cost = total_cost;
        Ok(())
    }

    /// Recomputes the total against `catalog`, reporting whether it moved.
    pub(crate) fn reprice<L: IngredientLookup + ?Sized>(
        &mut self,
        catalog: &L,
    ) -> Result<bool, CostOverflow> {
        let total_cost = costing::total_cost(&self.lines, catalog)?;
        if total_cost == self.total_cost {
            return Ok(false);
        }
        self.total_cost = total_cost;
        Ok(true)
    }

    pub fn uses(&self, ingredient: &Id<Ingredient>) -> bool {
        self.lines.iter().any(|l| l.ingredient_id == *ingredient)
    }

    pub fn id(&self) -> Id<Product> {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn lines(&self) -> &[ProductLine] {
        &self.lines
    }
    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, lines: Vec<ProductLine>) -> Self {
        ProductDraft {
            name: name.into(),
            lines,
        }
    }

    pub fn validate<L: IngredientLookup + ?Sized>(&self, catalog: &L) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName("product"));
        }
        if self.lines.is_empty() {
            return Err(ValidationError::NoLines);
        }
        for (idx, line) in self.lines.iter().enumerate() {
            if line.quantity <= Decimal::ZERO {
                return Err(ValidationError::NonPositiveQuantity(idx + 1, line.quantity));
            }
            if catalog.ingredient(&line.ingredient_id).is_none() {
                return Err(ValidationError::UnknownIngredient(idx + 1, line.ingredient_id));
            }
        }
        Ok(())
    }
}

impl ProductList {
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &Id<Product>) -> Option<&Product> {
        self.products.iter().find(|p| p.id == *id)
    }

    pub(crate) fn get_mut(&mut self, id: &Id<Product>) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == *id)
    }

    pub(crate) fn remove(&mut self, id: &Id<Product>) -> Option<Product> {
        let idx = self.products.iter().position(|p| p.id == *id)?;
        Some(self.products.remove(idx))
    }

    pub fn using<'a>(&'a self, ingredient: &'a Id<Ingredient>) -> impl 'a + Iterator<Item = &'a Product> {
        self.products.iter().filter(move |p| p.uses(ingredient))
    }

    /// Brings every total up to date with `catalog`; returns the products
    /// whose cost changed. Stops at the first product whose cost overflows.
    pub(crate) fn reprice_all<L: IngredientLookup + ?Sized>(
        &mut self,
        catalog: &L,
    ) -> Result<Vec<Id<Product>>, CostOverflow> {
        let mut changed = Vec::new();
        for product in self.products.iter_mut() {
            if product.reprice(catalog)? {
                changed.push(product.id);
            }
        }
        Ok(changed)
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }
}

impl Entity for Product {
    const PREFIX: &'static str = "product";
}

impl HasMeta for ProductList {
    fn meta(&self) -> &DocMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta {
        &mut self.meta
    }
}

impl Document for ProductList {
    const NAME: &'static str = "products";
    const SCHEMA_VERSION: u32 = 1;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ingredients::IngredientDraft;
    use maplit::btreeset;
    use std::collections::BTreeSet;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal")
    }

    fn catalog() -> Vec<Ingredient> {
        vec![
            Ingredient::new(
                Id::hashed("flour"),
                IngredientDraft::new("Flour", dec("15000"), dec("1"), Unit::Kilogram),
            ),
            Ingredient::new(
                Id::hashed("milk"),
                IngredientDraft::new("Milk", dec("20000"), dec("1"), Unit::Litre),
            ),
        ]
    }

    fn cake() -> ProductDraft {
        ProductDraft::new(
            "Cake",
            vec![
                ProductLine::new(Id::hashed("flour"), dec("250"), Unit::Gram),
                ProductLine::new(Id::hashed("milk"), dec("100"), Unit::Millilitre),
            ],
        )
    }

    #[test]
    fn should_cost_on_creation() {
        let product = Product::new(Id::hashed("cake"), cake(), &catalog()[..]).expect("cost");
        // 0.25kg * 15000 + 0.1l * 20000
        assert_eq!(product.total_cost(), dec("5750"));
    }

    #[test]
    fn should_require_a_name() {
        let draft = ProductDraft {
            name: "".into(),
            ..cake()
        };
        assert_eq!(
            draft.validate(&catalog()[..]),
            Err(ValidationError::MissingName("product"))
        );
    }

    #[test]
    fn should_require_lines() {
        let draft = ProductDraft::new("Air", vec![]);
        assert_eq!(draft.validate(&catalog()[..]), Err(ValidationError::NoLines));
    }

    #[test]
    fn should_require_positive_quantities() {
        let mut draft = cake();
        draft.lines[1].quantity = Decimal::ZERO;
        assert_eq!(
            draft.validate(&catalog()[..]),
            Err(ValidationError::NonPositiveQuantity(2, Decimal::ZERO))
        );
    }

    #[test]
    fn should_require_known_ingredients() {
        let mut draft = cake();
        draft.lines[0].ingredient_id = Id::hashed("butter");
        assert_eq!(
            draft.validate(&catalog()[..]),
            Err(ValidationError::UnknownIngredient(1, Id::hashed("butter")))
        );
    }

    #[test]
    fn reprice_reports_only_changes() {
        let mut catalog = catalog();
        let mut list = ProductList::default();
        list.products.push(Product::new(Id::hashed("cake"), cake(), &catalog[..]).expect("cost"));
        list.products.push(Product::new(
            Id::hashed("bread"),
            ProductDraft::new(
                "Bread",
                vec![ProductLine::new(Id::hashed("flour"), dec("500"), Unit::Gram)],
            ),
            &catalog[..],
        )
        .expect("cost"));
        list.products.push(Product::new(
            Id::hashed("latte"),
            ProductDraft::new(
                "Latte",
                vec![ProductLine::new(Id::hashed("milk"), dec("200"), Unit::Millilitre)],
            ),
            &catalog[..],
        )
        .expect("cost"));

        assert_eq!(list.reprice_all(&catalog[..]), Ok(vec![]));

        catalog[0].revise(IngredientDraft::new(
            "Flour",
            dec("20000"),
            dec("1"),
            Unit::Kilogram,
        ));
        let changed = list
            .reprice_all(&catalog[..])
            .expect("reprice")
            .into_iter()
            .collect::<BTreeSet<_>>();

        assert_eq!(changed, btreeset! { Id::hashed("cake"), Id::hashed("bread") });
        assert_eq!(list.get(&Id::hashed("bread")).map(Product::total_cost), Some(dec("10000")));
        assert_eq!(list.get(&Id::hashed("latte")).map(Product::total_cost), Some(dec("4000")));
    }

    #[test]
    fn using_finds_referencing_products() {
        let catalog = catalog();
        let mut list = ProductList::default();
        list.products.push(Product::new(Id::hashed("cake"), cake(), &catalog[..]).expect("cost"));

        let flour = Id::hashed("flour");
        let names = list.using(&flour).map(Product::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["Cake"]);
        let butter = Id::hashed("butter");
        assert_eq!(list.using(&butter).count(), 0);
    }
}
