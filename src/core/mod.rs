//! Canonical invoice model and the pure building blocks shared by every
//! parser strategy: number normalization, unit and currency tables, the
//! product catalog, client configuration and the dedup ledger.

mod config;
mod currencies;
mod error;
mod inventory;
mod ledger;
pub mod numbers;
mod types;
pub mod units;

pub use config::*;
pub use currencies::{currency_from_iso, is_known_currency_code};
pub use error::*;
pub use inventory::*;
pub use ledger::*;
pub use numbers::{derive_unit_price, kilos_in_name, parse_colombian_number};
pub use types::*;
pub use units::map_unit_code;
