use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;
use stylehub::core::log::init_logging;
use stylehub::{AppCommand, CartCommand, CurrencyCommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Inspect or change the shopping cart
    #[command(subcommand)]
    Cart(CartCommands),
    /// Show exchange rates or pick the display currency
    #[command(subcommand)]
    Currency(CurrencyCommands),
    /// Run the cart and exchange-rate HTTP server
    Serve {
        /// Address to listen on, overrides the configured one
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartCommands {
    /// Display cart lines and order summary
    Show,
    /// Add a product to the cart
    Add {
        product_id: String,
        /// Unit price in USD
        #[arg(short, long)]
        price: Decimal,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Remove a line from the cart
    Remove {
        product_id: String,
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Set the quantity of a line; 0 removes it
    Set {
        product_id: String,
        quantity: u32,
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CurrencyCommands {
    /// Display exchange rates and the selected currency
    Show,
    /// Select the display currency (USD, EUR, GBP, RUB)
    Set { code: String },
}

impl From<CartCommands> for CartCommand {
    fn from(cmd: CartCommands) -> CartCommand {
        match cmd {
            CartCommands::Show => CartCommand::Show,
            CartCommands::Add {
                product_id,
                price,
                quantity,
                size,
            } => CartCommand::Add {
                product_id,
                price,
                quantity,
                size,
            },
            CartCommands::Remove { product_id, size } => CartCommand::Remove { product_id, size },
            CartCommands::Set {
                product_id,
                quantity,
                size,
            } => CartCommand::Set {
                product_id,
                quantity,
                size,
            },
            CartCommands::Clear => CartCommand::Clear,
        }
    }
}

impl From<CurrencyCommands> for CurrencyCommand {
    fn from(cmd: CurrencyCommands) -> CurrencyCommand {
        match cmd {
            CurrencyCommands::Show => CurrencyCommand::Show,
            CurrencyCommands::Set { code } => CurrencyCommand::Set { code },
        }
    }
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Cart(cmd) => AppCommand::Cart(cmd.into()),
            Commands::Currency(cmd) => AppCommand::Currency(cmd.into()),
            Commands::Serve { bind } => AppCommand::Serve { bind },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => stylehub::cli::setup::setup(),
        Some(cmd) => stylehub::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
