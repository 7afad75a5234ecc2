use rust_decimal::Decimal;

use infra::persistence::MemoryStore;

use crate::ingredients::IngredientDraft;
use crate::units::Unit;
use crate::CostBook;

pub(crate) fn book() -> CostBook {
    env_logger::try_init().unwrap_or_default();
    let book = CostBook::with_storage(Box::new(MemoryStore::new()), "test");
    book.setup().expect("setup");
    book
}

pub(crate) fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal")
}

pub(crate) fn draft(name: &str, price: &str, size: &str, unit: Unit) -> IngredientDraft {
    IngredientDraft::new(name, dec(price), dec(size), unit)
}

mod stats {
    use super::*;
    use crate::ingredients::AddIngredient;
    use crate::products::{AddProduct, ProductDraft, ProductLine};
    use crate::services::{Commandable, Queryable};
    use crate::{ShowStats, Stats};

    #[test]
    fn counts_both_records() {
        let book = book();
        assert_eq!(book.query(ShowStats).expect("stats"), Stats::default());

        let flour = book
            .execute(AddIngredient(draft("Flour", "15000", "1", Unit::Kilogram)))
            .expect("add flour");
        book.execute(AddIngredient(draft("Salt", "5000", "500", Unit::Gram)))
            .expect("add salt");
        book.execute(AddProduct(ProductDraft::new(
            "Bread",
            vec![ProductLine::new(flour.id(), dec("1"), Unit::Kilogram)],
        )))
        .expect("add bread");

        assert_eq!(
            book.query(ShowStats).expect("stats"),
            Stats {
                ingredients: 2,
                products: 1
            }
        );
    }

    #[test]
    fn records_live_under_versioned_keys() {
        let book = book();
        let flour = book
            .execute(AddIngredient(draft("Flour", "15000", "1", Unit::Kilogram)))
            .expect("add flour");
        book.execute(AddProduct(ProductDraft::new(
            "Bread",
            vec![ProductLine::new(flour.id(), dec("1"), Unit::Kilogram)],
        )))
        .expect("add bread");

        assert_eq!(book.ingredients_key().to_string(), "test:ingredients:v1");
        assert_eq!(book.products_key().to_string(), "test:products:v1");

        let ingredients = book
            .storage()
            .fetch("test:ingredients:v1")
            .expect("fetch")
            .expect("ingredients present");
        assert_eq!(ingredients["ingredients"][0]["name"], serde_json::json!("Flour"));
        assert!(book
            .storage()
            .fetch("test:products:v1")
            .expect("fetch")
            .is_some());
    }
}
