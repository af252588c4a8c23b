mod config;
mod db;
mod fetch;
mod models;
mod run;

use anyhow::Result;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cfg = config::Config::load()?;
    let cycle = models::BillingCycle::new(cfg.cycle_start_day)?;
    let db = db::Database::open(&cfg.db_path, cycle)?;
    run::as_cli(&args, &cfg, &db)
}
