//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::stdin_confirm_adapter::StdinConfirm;
use crate::domain::backtest::{BacktestConfig, BacktestResult, Backtester};
use crate::domain::config_validation::{
    validate_backtest_config, validate_backtest_values, validate_execution_config,
};
use crate::domain::error::TradedeskError;
use crate::domain::execution::{
    ApiSettings, DEFAULT_REFERENCE_PRICE, ExecutionConfig, ExecutionEngine, LedgerBackend,
    OKX_BASE_URL,
};
use crate::domain::metrics::PerformanceReport;
use crate::domain::order::{ExecutionMode, OrderRequest, OrderResult, OrderSide, OrderStatus, OrderType};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "tradedesk", about = "Signal backtester and paper/live execution ledger")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a signal series against prices and report performance
    Backtest {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// CSV with date,open,high,low,close,volume
        #[arg(long)]
        prices: PathBuf,
        /// CSV with date,signal (0 flat, 1 long)
        #[arg(long)]
        signals: PathBuf,
        /// Write the trajectory table here
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        capital: Option<f64>,
        #[arg(long)]
        commission: Option<f64>,
    },
    /// Place a buy or sell order
    Order {
        #[arg(short, long)]
        config: Option<PathBuf>,
        side: OrderSide,
        /// BASE/QUOTE, e.g. BTC/USDT
        symbol: String,
        amount: f64,
        #[arg(long)]
        price: Option<f64>,
        /// Send as a limit order at --price
        #[arg(long)]
        limit: bool,
        #[arg(long)]
        stop_loss: Option<f64>,
        #[arg(long)]
        take_profit: Option<f64>,
        #[arg(long)]
        mode: Option<ExecutionMode>,
    },
    /// Show available balances
    Balance {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        mode: Option<ExecutionMode>,
        #[arg(default_values = ["USDT", "BTC", "ETH"])]
        assets: Vec<String>,
    },
    /// Show open positions
    Positions {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        mode: Option<ExecutionMode>,
    },
    /// Show the paper trade log
    History {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            prices,
            signals,
            output,
            capital,
            commission,
        } => run_backtest(
            config.as_ref(),
            &prices,
            &signals,
            output.as_ref(),
            capital,
            commission,
        ),
        Command::Order {
            config,
            side,
            symbol,
            amount,
            price,
            limit,
            stop_loss,
            take_profit,
            mode,
        } => {
            let mut request = OrderRequest::market(&symbol, side, amount).with_stops(stop_loss, take_profit);
            request.price = price;
            if limit {
                request.order_type = OrderType::Limit;
            }
            run_order(config.as_ref(), mode, &request)
        }
        Command::Balance {
            config,
            mode,
            assets,
        } => run_balance(config.as_ref(), mode, &assets),
        Command::Positions { config, mode } => run_positions(config.as_ref(), mode),
        Command::History { config } => run_history(config.as_ref()),
        Command::Validate { config } => run_validate(&config),
    }
}

/// Load the INI file, or an empty config when none was given.
pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    let loaded = match path {
        Some(p) => FileConfigAdapter::from_file(p),
        None => FileConfigAdapter::from_string(""),
    };
    loaded.map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, TradedeskError> {
    validate_backtest_config(adapter)?;
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", defaults.initial_capital),
        commission: adapter.get_double("backtest", "commission", defaults.commission),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
    })
}

/// Gather execution settings. File values win; `env` supplies the fallbacks
/// (`TRADING_MODE`, `OKX_API_KEY`, `OKX_SECRET_KEY`, `OKX_PASSPHRASE`).
pub fn build_execution_config(
    adapter: &dyn ConfigPort,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ExecutionConfig, TradedeskError> {
    validate_execution_config(adapter)?;

    let lookup = |section: &str, key: &str, var: &str| {
        adapter
            .get_string(section, key)
            .or_else(|| env(var).filter(|v| !v.trim().is_empty()))
    };

    let mode: ExecutionMode = match lookup("execution", "mode", "TRADING_MODE") {
        Some(raw) => raw.parse()?,
        None => ExecutionMode::Mock,
    };
    let store: LedgerBackend = match adapter.get_string("execution", "store") {
        Some(raw) => raw.parse()?,
        None => LedgerBackend::default(),
    };

    Ok(ExecutionConfig {
        mode,
        data_dir: adapter
            .get_string("execution", "data_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| ExecutionConfig::default().data_dir),
        store,
        default_price: adapter.get_double("execution", "default_price", DEFAULT_REFERENCE_PRICE),
        api: ApiSettings {
            api_key: lookup("okx", "api_key", "OKX_API_KEY"),
            secret_key: lookup("okx", "secret_key", "OKX_SECRET_KEY"),
            passphrase: lookup("okx", "passphrase", "OKX_PASSPHRASE"),
            base_url: adapter
                .get_string("okx", "base_url")
                .unwrap_or_else(|| OKX_BASE_URL.to_string()),
        },
    })
}

fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

/// Load prices and signals, replay them and compute the report.
pub fn run_backtest_pipeline(
    data: &dyn DataPort,
    prices_source: &str,
    signals_source: &str,
    config: &BacktestConfig,
) -> Result<(BacktestResult, PerformanceReport), TradedeskError> {
    let prices = data.load_prices(prices_source)?;
    let signals = data.load_signals(signals_source)?;
    eprintln!("  Loaded {} prices, {} signals", prices.len(), signals.len());

    let result = Backtester::from_config(config).run(&prices, &signals);
    let report = PerformanceReport::compute(&result.trajectory.values(), config.risk_free_rate);
    Ok((result, report))
}

fn run_backtest(
    config_path: Option<&PathBuf>,
    prices: &Path,
    signals: &Path,
    output: Option<&PathBuf>,
    capital: Option<f64>,
    commission: Option<f64>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Some(c) = capital {
        bt_config.initial_capital = c;
    }
    if let Some(c) = commission {
        bt_config.commission = c;
    }
    if let Err(e) = validate_backtest_values(&bt_config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!(
        "Backtesting {} against {} (capital {}, commission {})",
        signals.display(),
        prices.display(),
        bt_config.initial_capital,
        bt_config.commission
    );

    let csv = CsvAdapter::new(PathBuf::new());
    let (result, report) = match run_backtest_pipeline(
        &csv,
        &prices.to_string_lossy(),
        &signals.to_string_lossy(),
        &bt_config,
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if result.trajectory.is_empty() {
        eprintln!("warning: prices and signals share no timestamps; nothing to report");
    } else {
        println!("=== Performance ===");
        print!("{report}");
        println!(
            "Final value:       {:.2} ({} steps, {} trades)",
            result.trajectory.final_value().unwrap_or(bt_config.initial_capital),
            result.trajectory.len(),
            result.trades
        );
    }

    if let Some(out) = output {
        if let Err(e) = csv.write_trajectory(&result.trajectory, &out.to_string_lossy()) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("Trajectory written to: {}", out.display());
    }
    ExitCode::SUCCESS
}

fn open_engine(
    config_path: Option<&PathBuf>,
    mode_override: Option<ExecutionMode>,
) -> Result<ExecutionEngine, ExitCode> {
    let adapter = load_config(config_path)?;
    let fail = |e: TradedeskError| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    };

    let mut config = build_execution_config(&adapter, process_env).map_err(fail)?;
    if let Some(mode) = mode_override {
        config.mode = mode;
    }
    ExecutionEngine::from_config(&config, Box::new(StdinConfirm)).map_err(fail)
}

/// Exit code for an order outcome: rejected orders share the validation code and
/// failed ones the network code; everything else is success.
pub fn order_exit_code(result: &OrderResult) -> ExitCode {
    match result.status {
        OrderStatus::Rejected => ExitCode::from(5),
        OrderStatus::Failed => ExitCode::from(6),
        OrderStatus::Filled | OrderStatus::Submitted | OrderStatus::Cancelled => ExitCode::SUCCESS,
    }
}

fn run_order(
    config_path: Option<&PathBuf>,
    mode: Option<ExecutionMode>,
    request: &OrderRequest,
) -> ExitCode {
    let mut engine = match open_engine(config_path, mode) {
        Ok(e) => e,
        Err(code) => return code,
    };
    eprintln!(
        "[{}] {} {} {}",
        engine.mode(),
        request.side,
        request.amount,
        request.symbol
    );

    let result = engine.place_order(request);
    println!("status:   {}", result.status);
    if let Some(id) = &result.order_id {
        println!("order id: {id}");
    }
    if let Some(price) = result.price {
        println!("price:    {price}");
    }
    if let Some(reason) = &result.reason {
        println!("reason:   {reason}");
    }
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    order_exit_code(&result)
}

fn run_balance(config_path: Option<&PathBuf>, mode: Option<ExecutionMode>, assets: &[String]) -> ExitCode {
    let engine = match open_engine(config_path, mode) {
        Ok(e) => e,
        Err(code) => return code,
    };
    eprintln!("[{}] balances", engine.mode());
    for asset in assets {
        println!("{:<8} {}", asset, engine.get_balance(asset));
    }
    ExitCode::SUCCESS
}

fn run_positions(config_path: Option<&PathBuf>, mode: Option<ExecutionMode>) -> ExitCode {
    let engine = match open_engine(config_path, mode) {
        Ok(e) => e,
        Err(code) => return code,
    };
    let positions = engine.get_positions();
    if positions.is_empty() {
        eprintln!("No open positions");
        return ExitCode::SUCCESS;
    }
    println!(
        "{:<12} {:>14} {:>14} {:>14} {:>14} {:>8}  flag",
        "symbol", "amount", "entry", "current", "pnl", "pnl%"
    );
    for p in positions {
        let flag = if p.stop_loss_hit() {
            "SL"
        } else if p.take_profit_hit() {
            "TP"
        } else {
            ""
        };
        println!(
            "{:<12} {:>14.6} {:>14.2} {:>14.2} {:>14.2} {:>7.2}%  {}",
            p.symbol,
            p.amount,
            p.entry_price,
            p.current_price,
            p.unrealized_pnl,
            p.pnl_pct * 100.0,
            flag
        );
    }
    ExitCode::SUCCESS
}

fn run_history(config_path: Option<&PathBuf>) -> ExitCode {
    let engine = match open_engine(config_path, None) {
        Ok(e) => e,
        Err(code) => return code,
    };
    if engine.mode().is_networked() {
        eprintln!("Trade history is only kept for mock mode");
    }
    let trades = engine.get_trade_history();
    if trades.is_empty() {
        eprintln!("No trades recorded");
        return ExitCode::SUCCESS;
    }
    for t in trades {
        let pnl = t.pnl.map(|v| format!("{v:.2}")).unwrap_or_default();
        println!(
            "{} {:<25} {:<10} {:<4} {:>12} @ {:<12} {:<6} {}",
            t.time, t.id, t.symbol, t.side, t.amount, t.price, t.kind, pnl
        );
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(Some(config_path)) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = build_backtest_config(&adapter).and_then(|bt| {
        let exec = build_execution_config(&adapter, process_env)?;
        if exec.mode.is_networked() {
            exec.api.credentials(exec.mode)?;
        }
        Ok((bt, exec))
    });

    match checked {
        Ok((bt, exec)) => {
            eprintln!(
                "  backtest:  capital {}, commission {}, risk-free {}",
                bt.initial_capital, bt.commission, bt.risk_free_rate
            );
            eprintln!(
                "  execution: mode {}, store {:?}, data dir {}",
                exec.mode,
                exec.store,
                exec.data_dir.display()
            );
            eprintln!("Config validated successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
