use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use structopt::StructOpt;

use costbook::costing::CostBreakdown;
use costbook::ingredients::{
    AddIngredient, DeleteIngredient, Ingredient, IngredientDraft, ListIngredients,
    UpdateIngredient,
};
use costbook::money::{Grouped, Money};
use costbook::products::{
    AddProduct, DeleteProduct, EstimateCost, LineSpec, ListProducts, Product, ProductDraft,
    ProductLine, ShowProduct, UpdateProduct,
};
use costbook::services::{Commandable, Queryable};
use costbook::units::{self, Unit};
use costbook::{CostBook, ShowStats};
use infra::ids::Id;

#[derive(Debug, StructOpt)]
#[structopt(name = "cb", about = "Ingredient costs and product cost book")]
struct Opt {
    /// Configuration file
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "setup", about = "Initialise the store and show record keys")]
    Setup,
    #[structopt(name = "units", about = "List known units and their factors")]
    Units,
    #[structopt(name = "convert", about = "Convert a quantity between units")]
    Convert { quantity: Decimal, from: Unit, to: Unit },
    #[structopt(name = "ingredient", about = "Manage the ingredient catalog")]
    Ingredient {
        #[structopt(subcommand)]
        cmd: IngredientCmd,
    },
    #[structopt(name = "product", about = "Manage products")]
    Product {
        #[structopt(subcommand)]
        cmd: ProductCmd,
    },
    #[structopt(name = "estimate", about = "Cost a recipe without saving it")]
    Estimate {
        /// <ingredient-id>:<quantity>[:<unit>]
        #[structopt(short = "l", long = "line", required = true)]
        lines: Vec<LineSpec>,
    },
    #[structopt(name = "stats", about = "Count ingredients and products")]
    Stats,
}

#[derive(Debug, StructOpt)]
enum IngredientCmd {
    #[structopt(name = "add", about = "Add an ingredient")]
    Add(IngredientArgs),
    #[structopt(name = "update", about = "Change an ingredient")]
    Update {
        id: Id<Ingredient>,
        #[structopt(flatten)]
        args: IngredientArgs,
    },
    #[structopt(name = "delete", about = "Delete an unused ingredient")]
    Delete {
        id: Id<Ingredient>,
        #[structopt(short = "y", long = "yes")]
        yes: bool,
    },
    #[structopt(name = "list", about = "List ingredients")]
    List,
}

#[derive(Debug, StructOpt)]
struct IngredientArgs {
    #[structopt(short = "n", long = "name")]
    name: String,
    /// Price paid for one package
    #[structopt(short = "p", long = "price")]
    price: Decimal,
    /// Amount in one package
    #[structopt(short = "s", long = "size")]
    size: Decimal,
    #[structopt(short = "u", long = "unit", default_value = "gram")]
    unit: Unit,
}

#[derive(Debug, StructOpt)]
enum ProductCmd {
    #[structopt(name = "add", about = "Add a product")]
    Add(ProductArgs),
    #[structopt(name = "update", about = "Change a product")]
    Update {
        id: Id<Product>,
        #[structopt(flatten)]
        args: ProductArgs,
    },
    #[structopt(name = "delete", about = "Delete a product")]
    Delete {
        id: Id<Product>,
        #[structopt(short = "y", long = "yes")]
        yes: bool,
    },
    #[structopt(name = "list", about = "List products")]
    List,
    #[structopt(name = "show", about = "Show a product's cost breakdown")]
    Show { id: Id<Product> },
}

#[derive(Debug, StructOpt)]
struct ProductArgs {
    #[structopt(short = "n", long = "name")]
    name: String,
    /// <ingredient-id>:<quantity>[:<unit>]
    #[structopt(short = "l", long = "line", required = true)]
    lines: Vec<LineSpec>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Config {
    #[serde(flatten)]
    costbook: costbook::config::Config,
    env_logger: costbook::config::EnvLogger,
}

impl From<IngredientArgs> for IngredientDraft {
    fn from(args: IngredientArgs) -> Self {
        IngredientDraft::new(args.name, args.price, args.size, args.unit)
    }
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut config: Config = match opt.config.as_ref() {
        Some(path) => {
            let buf =
                fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
            toml::from_str(&buf).with_context(|| format!("parse config {:?}", path))?
        }
        None => Config::default(),
    };

    config.env_logger.builder().init();
    config.costbook.apply_env()?;

    let cb = CostBook::new(&config.costbook)?;
    cb.setup()?;

    let currency = config.costbook.currency.as_str();
    match opt.command {
        Commands::Setup => {
            println!("store: {}", config.costbook.store.describe());
            println!("ingredients: {}", cb.ingredients_key());
            println!("products: {}", cb.products_key());
        }
        Commands::Units => {
            for unit in Unit::known().iter() {
                println!("{:<12}{}", unit.name(), unit.factor());
            }
        }
        Commands::Convert { quantity, from, to } => {
            let converted = units::convert(quantity, &from, &to)
                .with_context(|| format!("{} {} does not fit in {}", quantity, from, to))?;
            println!(
                "{} {} = {} {}",
                Grouped(quantity),
                from,
                Grouped(converted),
                to
            );
        }
        Commands::Ingredient { cmd } => ingredient_command(&cb, currency, cmd)?,
        Commands::Product { cmd } => product_command(&cb, currency, cmd)?,
        Commands::Estimate { lines } => {
            let lines = resolve_lines(&cb, lines)?;
            let breakdown = cb.query(EstimateCost(lines))?;
            print_breakdown(&breakdown, currency);
        }
        Commands::Stats => {
            let stats = cb.query(ShowStats)?;
            println!("ingredients: {}", stats.ingredients);
            println!("products: {}", stats.products);
        }
    }

    Ok(())
}

fn ingredient_command(cb: &CostBook, currency: &str, cmd: IngredientCmd) -> Result<()> {
    match cmd {
        IngredientCmd::Add(args) => {
            let ingredient = cb.execute(AddIngredient(args.into()))?;
            print_ingredient(&ingredient, currency);
        }
        IngredientCmd::Update { id, args } => {
            let repriced = cb.execute(UpdateIngredient {
                id,
                draft: args.into(),
            })?;
            print_ingredient(&repriced.ingredient, currency);
            if !repriced.products.is_empty() {
                println!("repriced {} product(s):", repriced.products.len());
                for product in cb.query(ListProducts)? {
                    if repriced.products.contains(&product.id()) {
                        print_product(&product, currency);
                    }
                }
            }
        }
        IngredientCmd::Delete { id, yes } => {
            if yes || confirm(&format!("Delete ingredient {}?", id))? {
                let removed = cb.execute(DeleteIngredient(id))?;
                println!("deleted {} ({})", removed.id(), removed.name());
            }
        }
        IngredientCmd::List => {
            let ingredients = cb.query(ListIngredients)?;
            if ingredients.is_empty() {
                println!("no ingredients yet");
            }
            for ingredient in ingredients.iter() {
                print_ingredient(ingredient, currency);
            }
        }
    }
    Ok(())
}

fn product_command(cb: &CostBook, currency: &str, cmd: ProductCmd) -> Result<()> {
    match cmd {
        ProductCmd::Add(args) => {
            let lines = resolve_lines(cb, args.lines)?;
            let product = cb.execute(AddProduct(ProductDraft::new(args.name, lines)))?;
            print_product(&product, currency);
        }
        ProductCmd::Update { id, args } => {
            let lines = resolve_lines(cb, args.lines)?;
            let product = cb.execute(UpdateProduct {
                id,
                draft: ProductDraft::new(args.name, lines),
            })?;
            print_product(&product, currency);
        }
        ProductCmd::Delete { id, yes } => {
            if yes || confirm(&format!("Delete product {}?", id))? {
                let removed = cb.execute(DeleteProduct(id))?;
                println!("deleted {} ({})", removed.id(), removed.name());
            }
        }
        ProductCmd::List => {
            let products = cb.query(ListProducts)?;
            if products.is_empty() {
                println!("no products yet");
            }
            for product in products.iter() {
                print_product(product, currency);
            }
        }
        ProductCmd::Show { id } => {
            let detail = cb.query(ShowProduct(id))?;
            print_product(&detail.product, currency);
            print_breakdown(&detail.breakdown, currency);
        }
    }
    Ok(())
}

fn resolve_lines(cb: &CostBook, specs: Vec<LineSpec>) -> Result<Vec<ProductLine>> {
    let catalog = cb.query(ListIngredients)?;
    Ok(specs
        .into_iter()
        .map(|spec| spec.resolve(&catalog[..]))
        .collect())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn added(stamp: std::time::SystemTime) -> String {
    let stamp: DateTime<Utc> = stamp.into();
    stamp.format("%Y-%m-%d").to_string()
}

fn print_ingredient(ingredient: &Ingredient, currency: &str) {
    println!(
        "{}: {} - {} / {} {} ({} per {}; added {})",
        ingredient.id(),
        ingredient.name(),
        Money::new(ingredient.purchase_price(), currency),
        Grouped(ingredient.package_size()),
        ingredient.unit(),
        Money::new(ingredient.price_per_unit(), currency),
        ingredient.unit(),
        added(ingredient.id().timestamp()),
    );
}

fn print_product(product: &Product, currency: &str) {
    println!(
        "{}: {} - {} ({} ingredient(s))",
        product.id(),
        product.name(),
        Money::new(product.total_cost(), currency),
        product.lines().len(),
    );
}

fn print_breakdown(breakdown: &CostBreakdown, currency: &str) {
    for line in breakdown.lines.iter() {
        match line.ingredient.as_ref() {
            Some(ingredient) => println!(
                "  {}: {} {} = {} {} x {} = {}",
                ingredient.name,
                Grouped(line.quantity),
                line.unit,
                Grouped(ingredient.converted_quantity),
                ingredient.unit,
                Money::new(ingredient.price_per_unit, currency),
                Money::new(line.cost, currency),
            ),
            None => println!(
                "  (missing {}): {} {} skipped",
                line.ingredient_id,
                Grouped(line.quantity),
                line.unit
            ),
        }
    }
    println!("  total: {}", Money::new(breakdown.total, currency));
}
