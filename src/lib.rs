pub mod cart_store;
pub mod cli;
pub mod core;
pub mod providers;
pub mod rates;
pub mod server;
pub mod session;
pub mod store;

use crate::core::config::AppConfig;
use crate::providers::http_rates::HttpRateProvider;
use crate::rates::RateSource;
use crate::session::Session;
use anyhow::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum CartCommand {
    Show,
    Add {
        product_id: String,
        price: Decimal,
        quantity: u32,
        size: Option<String>,
    },
    Remove {
        product_id: String,
        size: Option<String>,
    },
    Set {
        product_id: String,
        quantity: u32,
        size: Option<String>,
    },
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CurrencyCommand {
    Show,
    Set { code: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Cart(CartCommand),
    Currency(CurrencyCommand),
    Serve { bind: Option<String> },
}

impl AppCommand {
    /// Whether the command displays converted amounts and so needs fresh rates.
    fn needs_rates(&self) -> bool {
        matches!(
            self,
            AppCommand::Cart(CartCommand::Show) | AppCommand::Currency(CurrencyCommand::Show)
        )
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("stylehub starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    if let AppCommand::Serve { bind } = &command {
        return server::serve(&config, bind.as_deref()).await;
    }

    let storage = store::open_client_storage(&config);
    let rates = RateSource::new(Arc::new(HttpRateProvider::from_config(
        &config.providers.rates,
    )));

    let mut session = if command.needs_rates() {
        let spinner = cli::ui::new_spinner("Fetching exchange rates...");
        let session = Session::open(storage, rates, config.currency).await;
        spinner.finish_and_clear();
        session
    } else {
        Session::restore(storage, rates, config.currency)
    };

    match command {
        AppCommand::Cart(cmd) => run_cart(&mut session, cmd)?,
        AppCommand::Currency(cmd) => run_currency(&mut session, cmd)?,
        AppCommand::Serve { .. } => unreachable!("serve is handled before the session opens"),
    }

    session.close();
    Ok(())
}

fn run_cart(session: &mut Session, command: CartCommand) -> Result<()> {
    match command {
        CartCommand::Show => println!("{}", cli::cart::render(session)),
        CartCommand::Add {
            product_id,
            price,
            quantity,
            size,
        } => cli::cart::add(session, &product_id, price, quantity, size.as_deref())?,
        CartCommand::Remove { product_id, size } => {
            session.cart_mut().remove(&product_id, size.as_deref())?
        }
        CartCommand::Set {
            product_id,
            quantity,
            size,
        } => session
            .cart_mut()
            .set_quantity(&product_id, size.as_deref(), quantity)?,
        CartCommand::Clear => session.cart_mut().clear()?,
    }
    Ok(())
}

fn run_currency(session: &mut Session, command: CurrencyCommand) -> Result<()> {
    match command {
        CurrencyCommand::Show => println!("{}", cli::currency::render(session)),
        CurrencyCommand::Set { code } => cli::currency::set(session, &code)?,
    }
    Ok(())
}
