//! # Quote Preview
//!
//! Prices a cart snapshot from a JSON file with the reference tax and
//! shipping strategies. Used by support staff and for local development.
//!
//! ## Usage
//! ```bash
//! cargo run -p hanko-pricing --bin hanko-quote -- --cart ./cart.json
//!
//! # Try a promotion code (prices it as a flat ¥ amount)
//! cargo run -p hanko-pricing --bin hanko-quote -- --cart ./cart.json --promo SPRING10=700
//!
//! # Custom configuration
//! cargo run -p hanko-pricing --bin hanko-quote -- --cart ./cart.json --config ./pricing.toml
//! ```
//!
//! The breakdown is printed to stdout as pretty JSON; logs go to stderr.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use hanko_core::{Cart, Money};
use hanko_pricing::ports::{PromotionRequest, PromotionValidation};
use hanko_pricing::{
    init_tracing, CartPricingEngine, CollaboratorError, PriceCartCommand, PricingConfig,
    PromotionValidator,
};
use tracing::{error, info};

/// Accepts exactly one code, worth a fixed amount.
struct FixedPromotion {
    code: String,
    amount: Money,
}

impl PromotionValidator for FixedPromotion {
    fn validate(&self, request: &PromotionRequest) -> Result<PromotionValidation, CollaboratorError> {
        if request.code == self.code {
            Ok(PromotionValidation::eligible(&self.code, self.amount))
        } else {
            Ok(PromotionValidation::rejected(&request.code, "unknown code"))
        }
    }
}

struct Args {
    cart: PathBuf,
    promo: Option<String>,
    bypass_cache: bool,
    config: Option<PathBuf>,
}

fn print_help() {
    println!("Hanko Quote Preview");
    println!();
    println!("Usage: hanko-quote --cart <FILE> [OPTIONS]");
    println!();
    println!("Options:");
    println!("      --cart <FILE>        Cart snapshot (JSON)");
    println!("      --promo <CODE[=N]>   Promotion code, optionally worth N minor units");
    println!("      --bypass-cache       Ignore cached shipping quotes");
    println!("      --config <FILE>      pricing.toml (default: platform config dir)");
    println!("  -h, --help               Show this help message");
}

/// Returns `Ok(None)` when help was printed.
fn parse_args() -> Result<Option<Args>, String> {
    let args: Vec<String> = env::args().collect();

    let mut cart = None;
    let mut promo = None;
    let mut bypass_cache = false;
    let mut config = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--cart" | "--promo" | "--config" => {
                let flag = args[i].as_str();
                let value = args
                    .get(i + 1)
                    .cloned()
                    .ok_or_else(|| format!("{flag} needs a value"))?;
                match flag {
                    "--cart" => cart = Some(PathBuf::from(value)),
                    "--promo" => promo = Some(value),
                    _ => config = Some(PathBuf::from(value)),
                }
                i += 1;
            }
            "--bypass-cache" => bypass_cache = true,
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let cart = cart.ok_or("--cart is required")?;
    Ok(Some(Args {
        cart,
        promo,
        bypass_cache,
        config,
    }))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = PricingConfig::load(args.config)?;
    let mut engine = CartPricingEngine::from_config(&config)?;

    let contents = std::fs::read_to_string(&args.cart)?;
    let cart: Cart = serde_json::from_str(&contents)?;
    info!(path = ?args.cart, items = cart.items.len(), "Loaded cart");

    let mut command = PriceCartCommand::new(cart);
    if let Some(promo) = args.promo {
        let (code, amount) = match promo.split_once('=') {
            Some((code, amount)) => (code.to_string(), amount.trim().parse::<i64>()?),
            None => (promo.clone(), 0),
        };
        let code = code.trim().to_uppercase();
        engine = engine.with_promotion_validator(Arc::new(FixedPromotion {
            code: code.clone(),
            amount: Money::from_minor(amount),
        }));
        command = command.with_promotion_code(code);
    }
    if args.bypass_cache {
        command = command.bypassing_shipping_cache();
    }

    let result = engine.calculate(&command)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Quote failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
