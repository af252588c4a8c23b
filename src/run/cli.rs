use anyhow::{Context, Result};
use chrono::{NaiveDateTime, NaiveTime};

use crate::config::Config;
use crate::db::Database;
use crate::fetch::{ChaosClient, Credentials};
use crate::models::format_ts;

pub(crate) fn as_cli(args: &[String], cfg: &Config, db: &Database) -> Result<()> {
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }
    match args[1].as_str() {
        "update" | "u" => cli_update(&args[2..], cfg, db),
        "status" | "s" => cli_status(db),
        "history" => cli_history(&args[2..], db),
        "quota" => cli_quota(&args[2..], db),
        "export" => cli_export(&args[2..], db),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("netquota {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("netquota — local broadband quota tracker");
    println!();
    println!("Usage: netquota <command>");
    println!();
    println!("Commands:");
    println!("  update                        Fetch a quota reading from the Chaos API and store it");
    println!("    --user <name> --pass <pw>   Credentials (default: read from the auth file)");
    println!("    --force                     Fetch even if the last reading is recent");
    println!("  status                        Show the latest reading");
    println!("  history                       Print stored readings with monthly totals");
    println!("    --from <ts> --to <ts>       Inclusive range, YYYY-MM-DD [HH:MM:SS]");
    println!("  quota [<YYYY-MM-DD> <bytes>]  List recorded months, or backfill one month's quota");
    println!("  export [path]                 Write readings to CSV");
    println!("    --from <ts> --to <ts>       Inclusive range, YYYY-MM-DD [HH:MM:SS]");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
}

fn cli_update(args: &[String], cfg: &Config, db: &Database) -> Result<()> {
    let user = args
        .windows(2)
        .find(|w| w[0] == "--user")
        .map(|w| w[1].clone());
    let pass = args
        .windows(2)
        .find(|w| w[0] == "--pass")
        .map(|w| w[1].clone());
    let force = args.iter().any(|a| a == "--force");

    // Be polite: the quota only moves slowly, so there is no point hitting
    // the API more often than the configured interval.
    if !force {
        if let Some(latest) = db.latest_timestamp()? {
            let elapsed = chrono::Local::now().naive_local() - latest;
            if elapsed < cfg.min_fetch_interval {
                println!(
                    "Last reading is only {} minutes old; skipping fetch (--force to override)",
                    elapsed.num_minutes()
                );
                return Ok(());
            }
        }
    }

    let credentials = Credentials::resolve(user, pass, &cfg.auth_path)?;
    let client = ChaosClient::new(&cfg.base_url);
    let sample = client.fetch_quota(&credentials)?;
    db.save_sample(&sample)?;

    println!(
        "Recorded reading at {}: {} of {} remaining",
        format_ts(sample.timestamp),
        format_bytes(sample.remaining),
        format_bytes(sample.total),
    );
    Ok(())
}

fn cli_status(db: &Database) -> Result<()> {
    if let Some(point) = db.latest_point()? {
        println!("netquota — {}", format_ts(point.timestamp));
        println!("{}", "─".repeat(40));
        println!(
            "  Remaining: {} of {} ({})",
            format_bytes(point.remaining),
            format_bytes(point.total),
            format_percent(point.percent),
        );
        return Ok(());
    }

    // A reading may exist without a matching month; the view hides it, so
    // say why instead of pretending the store is empty.
    match db.latest_timestamp()? {
        Some(latest) => println!(
            "Latest reading ({}) has no monthly quota recorded for its billing month.\n\
             Backfill it with: netquota quota <YYYY-MM-DD> <bytes>",
            format_ts(latest)
        ),
        None => println!("No readings stored yet. Run `netquota update` first."),
    }
    Ok(())
}

fn cli_history(args: &[String], db: &Database) -> Result<()> {
    let (from, to) = parse_range(args)?;
    let points = db.query_view(from, to)?;
    if points.is_empty() {
        println!("No readings in range");
        return Ok(());
    }

    println!(
        "{:<20} {:>12} {:>12} {:>8}",
        "Timestamp", "Remaining", "Total", "%"
    );
    println!("{}", "─".repeat(56));
    for point in &points {
        println!(
            "{:<20} {:>12} {:>12} {:>8}",
            format_ts(point.timestamp),
            format_bytes(point.remaining),
            format_bytes(point.total),
            format_percent(point.percent),
        );
    }
    Ok(())
}

fn cli_quota(args: &[String], db: &Database) -> Result<()> {
    if args.is_empty() {
        let months = db.monthly_quotas()?;
        if months.is_empty() {
            println!("No monthly quotas recorded");
            return Ok(());
        }
        println!("{:<20} Quota", "Month start");
        println!("{}", "─".repeat(34));
        for month in &months {
            println!(
                "{:<20} {}",
                format_ts(month.month_start),
                format_bytes(month.quota)
            );
        }
        return Ok(());
    }

    if args.len() != 2 {
        anyhow::bail!("Usage: netquota quota <YYYY-MM-DD> <bytes>");
    }
    let month_start = parse_ts_arg(&args[0])?;
    let quota: i64 = args[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("Quota must be a byte count: {}", args[1]))?;
    db.record_monthly_quota(month_start, quota)?;
    println!(
        "Recorded quota for month starting {}: {}",
        format_ts(month_start),
        format_bytes(quota)
    );
    Ok(())
}

fn cli_export(args: &[String], db: &Database) -> Result<()> {
    let (from, to) = parse_range(args)?;

    // Output path is the first non-flag argument.
    let output_path = args
        .first()
        .filter(|a| !a.starts_with('-'))
        .cloned()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            format!("{home}/netquota-export.csv")
        });

    let points = db.query_view(from, to)?;
    if points.is_empty() {
        println!("No readings in range");
        return Ok(());
    }

    let mut wtr = csv::Writer::from_path(&output_path)
        .with_context(|| format!("Failed to open {output_path}"))?;
    wtr.write_record(["timestamp", "remaining", "total", "percent"])?;
    for point in &points {
        wtr.write_record([
            format_ts(point.timestamp),
            point.remaining.to_string(),
            point.total.to_string(),
            point
                .percent
                .map(|p| format!("{p:.3}"))
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    println!("Exported {} readings to {output_path}", points.len());
    Ok(())
}

// ── Argument helpers ─────────────────────────────────────────

fn parse_range(args: &[String]) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
    let from = args
        .windows(2)
        .find(|w| w[0] == "--from")
        .map(|w| parse_ts_arg(&w[1]))
        .transpose()?;
    let to = args
        .windows(2)
        .find(|w| w[0] == "--to")
        .map(|w| parse_ts_arg(&w[1]))
        .transpose()?;
    Ok((from, to))
}

/// Accept a full `YYYY-MM-DD HH:MM:SS` timestamp or a bare date (midnight).
fn parse_ts_arg(s: &str) -> Result<NaiveDateTime> {
    if let Ok(ts) = crate::models::parse_ts(s) {
        return Ok(ts);
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| anyhow::anyhow!("Not a timestamp (YYYY-MM-DD [HH:MM:SS]): {s}"))
}

fn format_bytes(bytes: i64) -> String {
    format!("{:.1} GB", bytes as f64 / 1e9)
}

fn format_percent(percent: Option<f64>) -> String {
    match percent {
        Some(p) => format!("{p:.1}%"),
        None => "-".to_string(),
    }
}
