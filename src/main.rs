// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing::info;

use tradeflow_dashboard::{
    init_from_config, CompareAxis, Config, CriteriaUpdate, CsvLoader, Dashboard, DataStore, JsonRenderer, Metric,
    Renderer, Side,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(flows) = cli.flows {
        config.data.flows_path = flows;
    }
    if let Some(entities) = cli.entities {
        config.data.entities_path = entities;
    }

    match cli.command.unwrap_or(Commands::Ui) {
        Commands::View(args) => run_view(&config, args),
        Commands::Options => run_options(&config),
        Commands::Ui => run_ui_mode(&config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Trade-flow dashboard: top exporters, yearly imports and side-by-side comparisons.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to $TRADEFLOW_CONFIG or config/tradeflow.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the flow table CSV
    #[arg(long, global = true)]
    flows: Option<PathBuf>,

    /// Override the entity centroid CSV
    #[arg(long, global = true)]
    entities: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the view-model for the given criteria as JSON.
    View(ViewArgs),
    /// Print the selectable filter values as JSON.
    Options,
    /// Interactive terminal dashboard (default).
    Ui,
}

#[derive(Args)]
struct ViewArgs {
    /// Importer (PartnerISO3) for side A
    #[arg(long)]
    partner: Option<String>,

    /// Importer for side B when comparing countries
    #[arg(long)]
    partner2: Option<String>,

    #[arg(long)]
    year: Option<i32>,

    #[arg(long)]
    year2: Option<i32>,

    #[arg(long)]
    temp: Option<String>,

    #[arg(long)]
    temp2: Option<String>,

    /// Value chain / product class
    #[arg(long)]
    product: Option<String>,

    /// Number of exporters to rank; zero or negative means 10
    #[arg(long, allow_negative_numbers = true)]
    top_n: Option<i64>,

    /// value_usd or quantity_mt
    #[arg(long)]
    metric: Option<Metric>,

    /// Compare along countries, years or temperature
    #[arg(long)]
    compare: Option<CompareAxis>,

    #[arg(long)]
    hide_a: bool,

    #[arg(long)]
    hide_b: bool,

    /// Per-exporter lines instead of the total
    #[arg(long)]
    breakdown: bool,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,
}

impl ViewArgs {
    fn criteria_updates(&self) -> Vec<CriteriaUpdate> {
        let mut updates = Vec::new();
        if let Some(partner) = &self.partner {
            updates.push(CriteriaUpdate::PrimaryPartner(Some(partner.clone())));
        }
        if let Some(partner) = &self.partner2 {
            updates.push(CriteriaUpdate::SecondaryPartner(Some(partner.clone())));
        }
        if self.year.is_some() {
            updates.push(CriteriaUpdate::Year(self.year));
        }
        if self.year2.is_some() {
            updates.push(CriteriaUpdate::SecondaryYear(self.year2));
        }
        if self.temp.is_some() {
            updates.push(CriteriaUpdate::Temperature(self.temp.clone()));
        }
        if self.temp2.is_some() {
            updates.push(CriteriaUpdate::SecondaryTemperature(self.temp2.clone()));
        }
        if self.product.is_some() {
            updates.push(CriteriaUpdate::ProductClass(self.product.clone()));
        }
        if let Some(n) = self.top_n {
            updates.push(CriteriaUpdate::TopN(n));
        }
        if let Some(metric) = self.metric {
            updates.push(CriteriaUpdate::Metric(metric));
        }
        updates
    }
}

// ==============================================================================
// Commands
// ==============================================================================

fn load_store(config: &Config) -> Result<DataStore> {
    let loader = CsvLoader::new(&config.data.flows_path, &config.data.entities_path);
    let (store, report) = loader.load().context("Failed to load trade-flow data")?;
    info!(
        flows = report.flow_rows,
        coerced = report.coerced_numbers,
        "loaded data set"
    );
    Ok(store)
}

fn run_view(config: &Config, args: ViewArgs) -> Result<()> {
    init_from_config(&config.logging, false)?;

    let store = load_store(config)?;
    let mut dashboard = Dashboard::with_store(config.dashboard.clone(), store);

    dashboard.set_criteria(args.criteria_updates());
    if let Some(axis) = args.compare {
        dashboard.enter_compare(axis);
        if args.hide_a {
            dashboard.toggle_visibility(Side::A);
        }
        if args.hide_b {
            dashboard.toggle_visibility(Side::B);
        }
    }
    if args.breakdown {
        dashboard.set_show_breakdown(true);
    }

    let pass = dashboard.rebuild_view_model()?;
    let mut renderer = JsonRenderer::new(io::stdout().lock()).with_pretty(args.pretty);
    renderer.render(&pass)?;

    Ok(())
}

fn run_options(config: &Config) -> Result<()> {
    init_from_config(&config.logging, false)?;

    let store = load_store(config)?;
    let options = store.options();
    println!("{}", serde_json::to_string_pretty(&options)?);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    init_from_config(&config.logging, true)?;

    println!("🌍 Loading trade-flow data...");
    let store = load_store(config)?;
    println!("✓ Loaded {} flow records\n", store.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(Dashboard::with_store(config.dashboard.clone(), store));
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print a snapshot: tradeflow view --partner <ISO3>");
    std::process::exit(1);
}
