//! Trolley CLI

use std::{io, process};

use clap::{Parser, Subcommand};
use trolley::{pricing::money, products::ProductId};
use trolley_app::{
    config::{LoggingConfig, StoreConfig},
    context::AppContext,
    observability,
    store::{CartSnapshot, Mutation, Persistence},
};

#[derive(Debug, Parser)]
#[command(name = "trolley", about = "Trolley cart CLI", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreConfig,

    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn load() -> Result<Self, clap::Error> {
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the cart
    Show,

    /// List the catalog
    Products,

    /// Add a product to the cart
    Add {
        /// Product identifier
        product: String,

        /// Size variant
        size: String,

        /// Units to add
        #[arg(default_value_t = 1)]
        quantity: u32,
    },

    /// Remove a line, numbered as shown by `show`
    Remove { line: usize },

    /// Set a line's quantity; zero or less removes it
    Update {
        line: usize,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Empty the cart
    Clear {
        /// Confirm emptying the cart
        #[arg(long)]
        yes: bool,
    },

    /// Merge the guest cart into the signed-in user's cart
    Merge,

    /// Check the cart is ready for checkout
    Checkout,
}

#[tokio::main]
pub async fn main() {
    let cli = Cli::load().unwrap_or_else(|error| error.exit());

    if let Err(error) = observability::init_subscriber(&cli.logging) {
        eprintln!("{error}");
    }

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let context = AppContext::from_config(&cli.store)
        .map_err(|error| format!("failed to start: {error}"))?;

    let store = context.store.clone();

    store.load_current().await;

    match cli.command {
        Commands::Show => {}
        Commands::Products => {
            for product in context.catalog.products() {
                println!(
                    "{:<28} {:<36} {:>10}  stock {:>3}  sizes {}",
                    product.id.as_str(),
                    product.name,
                    money(product.unit_price()).to_string(),
                    product.stock_count,
                    product.available_sizes.join(", "),
                );
            }

            return Ok(());
        }
        Commands::Add {
            product,
            size,
            quantity,
        } => {
            let persistence = store
                .add_item(&ProductId::new(product), &size, quantity)
                .await
                .map_err(|error| format!("could not add item: {error}"))?;

            warn_unsaved(persistence);
        }
        Commands::Remove { line } => {
            let mutation = store
                .remove_item(line_index(line))
                .await
                .map_err(|error| format!("could not remove line: {error}"))?;

            report_mutation(mutation, line);
        }
        Commands::Update { line, quantity } => {
            let mutation = store
                .update_item_quantity(line_index(line), quantity)
                .await
                .map_err(|error| format!("could not update line: {error}"))?;

            report_mutation(mutation, line);
        }
        Commands::Clear { yes } => {
            if !yes {
                return Err("refusing to clear the cart without --yes".to_string());
            }

            let persistence = store
                .clear_cart()
                .await
                .map_err(|error| format!("could not clear cart: {error}"))?;

            warn_unsaved(persistence);
        }
        Commands::Merge => {
            let outcome = store
                .merge_guest_cart()
                .await
                .map_err(|error| format!("could not merge carts: {error}"))?;

            println!(
                "merged {} line(s), added {} line(s)",
                outcome.report.merged, outcome.report.appended
            );

            for item in &outcome.report.dropped {
                println!(
                    "kept in guest cart: {} ({}) x{}",
                    item.name, item.size, item.quantity
                );
            }

            if let Mutation::Applied(persistence) = outcome.mutation {
                warn_unsaved(persistence);
            }
        }
        Commands::Checkout => {
            let summary = store
                .checkout()
                .await
                .map_err(|error| format!("cannot check out: {error}"))?;

            println!(
                "ready to check out {} item(s) for {}, total {}",
                summary.totals.item_count,
                summary.identity.email,
                summary.totals.total_money()
            );

            return Ok(());
        }
    }

    render(&store.snapshot())
}

fn render(snapshot: &CartSnapshot) -> Result<(), String> {
    println!("Cart for {}", snapshot.context);

    snapshot
        .receipt()
        .write_to(io::stdout().lock())
        .map_err(|error| format!("failed to print cart: {error}"))
}

/// Lines are numbered from one on screen. Zero maps to an index no cart can hold.
fn line_index(line: usize) -> usize {
    line.checked_sub(1).unwrap_or(usize::MAX)
}

fn report_mutation(mutation: Mutation, line: usize) {
    match mutation {
        Mutation::Applied(persistence) => warn_unsaved(persistence),
        Mutation::Unchanged => println!("line {line}: nothing to change"),
    }
}

fn warn_unsaved(persistence: Persistence) {
    match persistence {
        Persistence::Saved => {}
        Persistence::Degraded => {
            eprintln!("warning: your account cart could not be saved; kept a copy on this device");
        }
        Persistence::Unsaved => eprintln!("warning: cart changes could not be saved"),
    }
}
