/// main.rs — Pairs backtest entry point
///
/// Command-line front end for the pairs engine: load two CSV price files,
/// fit the spread, backtest the z-score strategy and report.
///
/// Usage:
///   pairs_backtest analyze KO.csv PEP.csv
///   pairs_backtest run KO.csv PEP.csv --entry-threshold 2.5 --output-dir ./reports
///   pairs_backtest sweep KO.csv PEP.csv --entry 1.5,2,2.5 --exit 0,0.5
///   pairs_backtest --help
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pairs_backtest::{BacktestReport, CsvSource, ReportConfig, ReportGenerator};
use pairs_engine::sweep::{ParameterGrid, best_by_sharpe, run_sweep};
use pairs_engine::{AlignedSeries, StrategyConfig, align, analyze};

#[derive(Parser)]
#[command(name = "pairs_backtest")]
#[command(about = "Statistical-arbitrage pairs analysis and backtest")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit the spread model and print the current signal and pair statistics
    Analyze {
        #[command(flatten)]
        pair: PairArgs,
    },

    /// Run the backtest and write reports
    Run {
        #[command(flatten)]
        pair: PairArgs,

        /// Output directory for JSON / CSV reports
        #[arg(short, long, default_value = "./reports")]
        output_dir: PathBuf,

        /// Print the report without writing files
        #[arg(long)]
        no_export: bool,
    },

    /// Backtest a grid of threshold / risk settings in parallel
    Sweep {
        #[command(flatten)]
        pair: PairArgs,

        /// Entry thresholds to try
        #[arg(long, value_delimiter = ',')]
        entry: Vec<f64>,

        /// Exit thresholds to try
        #[arg(long, value_delimiter = ',')]
        exit: Vec<f64>,

        /// Stop-loss percentages to try
        #[arg(long, value_delimiter = ',')]
        stop_loss: Vec<f64>,

        /// Take-profit percentages to try
        #[arg(long, value_delimiter = ',')]
        take_profit: Vec<f64>,

        /// Rows to print, best Sharpe first
        #[arg(long, default_value = "10")]
        top: usize,

        /// Write all rows as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Inputs and strategy settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct PairArgs {
    /// CSV with asset 1 prices (the regressor)
    pub asset1: PathBuf,
    /// CSV with asset 2 prices
    pub asset2: PathBuf,

    /// Label for asset 1 (default: file stem)
    #[arg(long)]
    pub name1: Option<String>,
    /// Label for asset 2 (default: file stem)
    #[arg(long)]
    pub name2: Option<String>,
    /// Price column in both files (default: close / adj close / price)
    #[arg(long)]
    pub price_column: Option<String>,

    /// JSON strategy config; CLI flags override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Read PAIRS_* variables (and .env) instead of defaults
    #[arg(long, conflicts_with = "config")]
    pub from_env: bool,

    #[arg(long)]
    pub corr_window: Option<usize>,
    #[arg(long)]
    pub entry_threshold: Option<f64>,
    #[arg(long)]
    pub exit_threshold: Option<f64>,
    #[arg(long)]
    pub initial_capital: Option<f64>,
    #[arg(long)]
    pub transaction_cost_pct: Option<f64>,
    #[arg(long)]
    pub max_position_pct: Option<f64>,
    #[arg(long)]
    pub stop_loss_pct: Option<f64>,
    #[arg(long)]
    pub take_profit_pct: Option<f64>,

    /// Bars per year for annualised volatility
    #[arg(long, default_value = "252", value_parser = positive_f64)]
    pub periods_per_year: f64,
}

fn positive_f64(raw: &str) -> std::result::Result<f64, String> {
    let v: f64 = raw.trim().parse().map_err(|e| format!("{raw:?}: {e}"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(format!("must be a positive number, got {raw}"))
    }
}

impl PairArgs {
    /// Base config (defaults, JSON file or env) with CLI overrides applied,
    /// validated once, before any data is touched.
    pub fn strategy_config(&self) -> Result<StrategyConfig> {
        let mut cfg = if let Some(path) = &self.config {
            let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
            StrategyConfig::from_json(&text).with_context(|| format!("loading config {}", path.display()))?
        } else if self.from_env {
            StrategyConfig::from_env()?
        } else {
            StrategyConfig::default()
        };

        if let Some(v) = self.corr_window { cfg.corr_window = v; }
        if let Some(v) = self.entry_threshold { cfg.entry_threshold = v; }
        if let Some(v) = self.exit_threshold { cfg.exit_threshold = v; }
        if let Some(v) = self.initial_capital { cfg.initial_capital = v; }
        if let Some(v) = self.transaction_cost_pct { cfg.transaction_cost_pct = v; }
        if let Some(v) = self.max_position_pct { cfg.max_position_pct = v; }
        if let Some(v) = self.stop_loss_pct { cfg.stop_loss_pct = v; }
        if let Some(v) = self.take_profit_pct { cfg.take_profit_pct = v; }

        cfg.validate()?;
        Ok(cfg)
    }

    fn source(&self, path: &PathBuf, name: &Option<String>) -> CsvSource {
        let mut src = CsvSource::new(path);
        if let Some(n) = name {
            src = src.with_label(n.clone());
        }
        if let Some(c) = &self.price_column {
            src = src.with_price_column(c.clone());
        }
        src
    }

    pub fn load_aligned(&self) -> Result<AlignedSeries> {
        let s1 = self.source(&self.asset1, &self.name1).load()?;
        let s2 = self.source(&self.asset2, &self.name2).load()?;
        let aligned = align(&s1, &s2)?;
        info!("{} common bars for {} / {}", aligned.len(), aligned.name1, aligned.name2);
        Ok(aligned)
    }
}

/// Main application
pub struct PairsApp {
    cli: Cli,
}

impl PairsApp {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Analyze { pair } => self.analyze(pair),
            Commands::Run { pair, output_dir, no_export } => self.backtest(pair, output_dir, *no_export),
            Commands::Sweep { pair, entry, exit, stop_loss, take_profit, top, output } => {
                let grid = ParameterGrid::new(pair.strategy_config()?)
                    .entry_thresholds(entry.clone())
                    .exit_thresholds(exit.clone())
                    .stop_losses(stop_loss.clone())
                    .take_profits(take_profit.clone());
                self.sweep(pair, &grid, *top, output.as_ref())
            }
        }
    }

    fn analyze(&self, pair: &PairArgs) -> Result<()> {
        let cfg = pair.strategy_config()?;
        let aligned = pair.load_aligned()?;
        let analysis = analyze(&aligned, &cfg)?;

        println!("{}", "=".repeat(60));
        println!("PAIR: {} / {}  ({} bars)", analysis.name1, analysis.name2, aligned.len());
        println!("{}", "=".repeat(60));
        println!("  Hedge ratio β:     {:.4}", analysis.model.beta);
        println!("  Intercept α:       {:.4}", analysis.model.alpha);
        println!("  R²:                {:.4}", analysis.model.r_squared);
        match analysis.model.current_zscore() {
            Some(z) => println!("  Current Z-score:   {z:+.3}"),
            None => println!("  Current Z-score:   N/A"),
        }
        println!("  Signal:            {}", analysis.current_label);
        match analysis.stats.pearson_corr {
            Some(c) => println!("  Price correlation: {c:.3}"),
            None => println!("  Price correlation: N/A"),
        }
        match analysis.stats.half_life() {
            Some(h) => println!("  Half-life:         {h:.1} bars"),
            None => println!("  Half-life:         N/A (no mean reversion)"),
        }
        Ok(())
    }

    fn backtest(&self, pair: &PairArgs, output_dir: &PathBuf, no_export: bool) -> Result<()> {
        let cfg = pair.strategy_config()?;
        let aligned = pair.load_aligned()?;
        let run = pairs_engine::run(&aligned, &cfg, pair.periods_per_year)?;

        let report = BacktestReport::build(&run, &aligned, &cfg);
        println!("{report}");

        if !no_export {
            let generator = ReportGenerator::new(ReportConfig { output_dir: output_dir.clone(), ..Default::default() });
            for path in generator.export(&report, &run, &aligned)? {
                println!("wrote {}", path.display());
            }
        }
        Ok(())
    }

    fn sweep(&self, pair: &PairArgs, grid: &ParameterGrid, top: usize, output: Option<&PathBuf>) -> Result<()> {
        let aligned = pair.load_aligned()?;
        let mut outcomes = run_sweep(&aligned, &grid.configs(), pair.periods_per_year);

        if let Some(path) = output {
            fs::write(path, serde_json::to_string_pretty(&outcomes)?)?;
            info!("sweep results written to {}", path.display());
        }

        if let Some(best) = best_by_sharpe(&outcomes) {
            info!(
                "best Sharpe: entry={} exit={} stop={} tp={}",
                best.config.entry_threshold, best.config.exit_threshold, best.config.stop_loss_pct, best.config.take_profit_pct
            );
        }

        outcomes.sort_by(|a, b| {
            let sa = a.metrics().map_or(f64::NEG_INFINITY, |m| m.sharpe);
            let sb = b.metrics().map_or(f64::NEG_INFINITY, |m| m.sharpe);
            sb.total_cmp(&sa)
        });

        println!(
            "{:>6} {:>6} {:>6} {:>6} | {:>7} {:>8} {:>7} {:>7} {:>7}",
            "entry", "exit", "stop", "tp", "trades", "return%", "win%", "sharpe", "maxdd%"
        );
        for o in outcomes.iter().take(top) {
            let c = &o.config;
            match &o.result {
                Ok(m) => println!(
                    "{:>6.2} {:>6.2} {:>6.1} {:>6.1} | {:>7} {:>8.2} {:>7.1} {:>7.3} {:>7.2}",
                    c.entry_threshold, c.exit_threshold, c.stop_loss_pct, c.take_profit_pct,
                    m.n_trades, m.total_return_pct, m.win_rate_pct, m.sharpe, m.max_drawdown_pct
                ),
                Err(e) => println!(
                    "{:>6.2} {:>6.2} {:>6.1} {:>6.1} | rejected: {}",
                    c.entry_threshold, c.exit_threshold, c.stop_loss_pct, c.take_profit_pct, e
                ),
            }
        }
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    let app = PairsApp::new(cli);
    if let Err(e) = app.run() {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
