mod bootstrap;

use std::path::Path;

use anyhow::Result;
use chrono::Local;
use perdiem_core::rates::RateTable;
use perdiem_core::settings::Settings;
use perdiem_data::analysis::{analyze, AnalysisInput};
use perdiem_report::build_report;
use perdiem_report::json::render_json;
use perdiem_report::table::{render_summary, render_table};
use perdiem_report::xlsx::write_xlsx;

fn main() -> Result<()> {
    let settings = Settings::load();

    let perdiem_dir = bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("perdiem v{} starting", env!("CARGO_PKG_VERSION"));

    if settings.init_rates {
        let path = settings
            .rates
            .clone()
            .unwrap_or_else(|| perdiem_dir.join("rates.json"));
        init_rates(&path)?;
        println!("Rate table written to {}", path.display());
        return Ok(());
    }

    let rates = RateTable::load(settings.rates.as_deref())?;
    tracing::debug!("Rate policy: {:?}", rates.policy);

    let gps1 = settings.require_gps1()?;
    let result = analyze(AnalysisInput {
        gps1,
        gps2: settings.gps2.as_deref(),
        mapping: settings.mapping.as_deref(),
    })?;
    tracing::info!(
        "Loaded in {:.2}s, built in {:.2}s",
        result.metadata.load_time_seconds,
        result.metadata.transform_time_seconds
    );

    let report = build_report(&result, &rates);

    match settings.format.as_str() {
        "json" => println!("{}", render_json(&report, &result.statistics)?),
        "xlsx" => {
            let path = settings.output_path(Local::now().date_naive());
            write_xlsx(&report, &path)?;
            println!("Report written to {}", path.display());
            print!("{}", render_summary(&result.statistics));
        }
        _ => {
            print!("{}", render_table(&report));
            println!();
            print!("{}", render_summary(&result.statistics));
        }
    }

    Ok(())
}

/// Save the built-in rate table, refusing to overwrite an existing file.
fn init_rates(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!(
            "{} already exists; remove it first to reset the rates",
            path.display()
        );
    }
    RateTable::default().save_to(path)?;
    Ok(())
}
