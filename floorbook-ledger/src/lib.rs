mod config;
pub use config::LedgerConfig;

mod db;
pub use db::{PgStore, MIGRATOR};

mod error;
pub use error::Error;

mod ledger;
pub use ledger::Ledger;

mod locks;
pub use locks::{FloorGuard, FloorLocks};

pub mod api {
    pub use floorbook_api::*;
}
