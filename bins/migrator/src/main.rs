//! Database migration runner for Claimflow.
//!
//! Reads `DATABASE_URL` (or `--database-url`).
//!
//! Usage:
//!   migrator up      - Apply the schema
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop everything and re-apply

use claimflow_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI installs its own tracing subscriber
    cli::run_cli(Migrator).await;
}
