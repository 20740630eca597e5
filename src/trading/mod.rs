//! Trading history analysis
//!
//! Reads a broker export (.xlsx/.xls), computes performance metrics and
//! renders the Vietnamese overview report used as agent context.

pub mod report;
pub mod stats;
pub mod table;

pub use report::{format_amount, generate_report};
pub use stats::{SymbolStats, TradeStats};
pub use table::{read_workbook, Cell, RawTable};

use crate::error::AgentError;
use crate::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{error, info};

/// One closed position after column normalisation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub symbol: String,
    /// BUY / SELL
    pub side: String,
    pub close_time: Option<NaiveDateTime>,
    pub net_profit: Option<f64>,
    pub commission: Option<f64>,
    pub swap: Option<f64>,
    pub balance_after: Option<f64>,
    pub pips: Option<f64>,
    pub volume_lots_closed: Option<f64>,
    pub quantity_closed: Option<f64>,
    pub open_price: Option<f64>,
    pub close_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingSummary {
    pub total_trades: usize,
    pub net_profit: f64,
    pub win_rate: f64,
}

/// Outcome of analysing one file; failures are reported, never raised
#[derive(Debug, Clone, Serialize)]
pub struct TradingAnalysis {
    pub success: bool,
    pub file_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TradeStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TradingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TradingAnalysis {
    pub fn from_trades(file_path: PathBuf, trades: &[Trade]) -> Self {
        let stats = TradeStats::calculate(trades);
        let report = generate_report(&stats);
        let summary = TradingSummary {
            total_trades: stats.trades,
            net_profit: stats.net_profit,
            win_rate: stats.win_rate_pct,
        };

        Self {
            success: true,
            file_path,
            stats: Some(stats),
            report: Some(report),
            summary: Some(summary),
            error: None,
        }
    }

    fn failed(file_path: PathBuf, message: String) -> Self {
        Self {
            success: false,
            file_path,
            stats: None,
            report: None,
            summary: None,
            error: Some(message),
        }
    }
}

pub fn load_trades(path: &Path) -> Result<Vec<Trade>> {
    read_workbook(path)?.into_trades()
}

/// Read, measure and report on a trading export
pub fn analyze_trading_file(path: impl AsRef<Path>) -> TradingAnalysis {
    let path = path.as_ref();
    info!(path = %path.display(), "Analyzing trading file");

    match load_trades(path) {
        Ok(trades) => {
            let analysis = TradingAnalysis::from_trades(path.to_path_buf(), &trades);
            info!(path = %path.display(), trades = trades.len(), "Trading analysis complete");
            analysis
        }
        Err(e) => {
            let message = format!("Lỗi phân tích: {}", e);
            error!(path = %path.display(), "{}", message);
            TradingAnalysis::failed(path.to_path_buf(), message)
        }
    }
}

/// Resolve a client-supplied file name inside `data_dir`.
///
/// Only relative paths made of plain components are accepted, and an
/// existing file must not resolve (through symlinks) outside the directory.
pub fn resolve_data_file(data_dir: &Path, requested: &str) -> Result<PathBuf> {
    let relative = Path::new(requested.trim());
    let confined = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if relative.as_os_str().is_empty() || !confined {
        return Err(AgentError::TradingDataError(format!(
            "'{}' must be a relative path inside the trading data directory",
            requested
        )));
    }

    let candidate = data_dir.join(relative);
    if let (Ok(file), Ok(root)) = (candidate.canonicalize(), data_dir.canonicalize()) {
        if !file.starts_with(&root) {
            return Err(AgentError::TradingDataError(format!(
                "'{}' resolves outside the trading data directory",
                requested
            )));
        }
    }

    Ok(candidate)
}
