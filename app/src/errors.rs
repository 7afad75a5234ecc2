use err_derive::Error;
use rust_decimal::Decimal;

use infra::ids::Id;

use crate::ingredients::Ingredient;
use crate::products::Product;

/// Input that must be corrected before it can be saved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error(display = "{} name is required", _0)]
    MissingName(&'static str),
    #[error(display = "package size must be greater than zero, got {}", _0)]
    NonPositivePackageSize(Decimal),
    #[error(display = "purchase price must not be negative, got {}", _0)]
    NegativePrice(Decimal),
    #[error(display = "price {} for a package of {} gives an unrepresentable price per unit", _0, _1)]
    UnrepresentablePrice(Decimal, Decimal),
    #[error(display = "add ingredients to the catalog before creating products")]
    EmptyCatalog,
    #[error(display = "a product needs at least one ingredient")]
    NoLines,
    #[error(display = "quantity on line {} must be greater than zero, got {}", _0, _1)]
    NonPositiveQuantity(usize, Decimal),
    #[error(display = "line {} refers to unknown ingredient {}", _0, _1)]
    UnknownIngredient(usize, Id<Ingredient>),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error(display = "no such ingredient: {}", _0)]
    IngredientNotFound(Id<Ingredient>),
    #[error(display = "no such product: {}", _0)]
    ProductNotFound(Id<Product>),
    #[error(
        display = "ingredient {} is used by {:?}; delete those products first",
        _0,
        _1
    )]
    IngredientInUse(Id<Ingredient>, Vec<String>),
}

/// A cost that does not fit in a `Decimal`; raised before anything is saved.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(display = "cost of the line using ingredient {} is too large", _0)]
pub struct CostOverflow(pub Id<Ingredient>);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineParseError {
    #[error(display = "expected <ingredient-id>:<quantity>[:<unit>], got {:?}", _0)]
    Malformed(String),
    #[error(display = "bad quantity {:?} in line {:?}", _0, _1)]
    BadQuantity(String, String),
}
