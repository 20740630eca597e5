use super::{ContextSources, ExternalLookup};
use crate::error::AgentError;
use crate::trading::report::risk_grade;
use crate::trading::{analyze_trading_file, format_amount, TradeStats, TradingAnalysis};
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

pub const SECTIONS: [&str; 5] = [
    "trading_data",
    "performance_metrics",
    "risk_analysis",
    "symbol_analysis",
    "win_rate",
];

/// Context drawn from one trading export
pub struct TradingContextProvider {
    file_path: PathBuf,
}

impl TradingContextProvider {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    async fn analyze(&self) -> Result<TradingAnalysis> {
        let path = self.file_path.clone();
        tokio::task::spawn_blocking(move || analyze_trading_file(path))
            .await
            .map_err(|e| AgentError::ChainError(format!("trading analysis task failed: {}", e)))
    }
}

/// Every context section for a completed analysis
pub fn build_sections(stats: &TradeStats, report: &str) -> ContextSources {
    let mut sections = ContextSources::new();

    sections.insert(
        "trading_data".to_string(),
        format!(
            "Detailed trading history with total {} trades. Net profit: {}. Win rate: {:.1}%.\n{}",
            stats.trades,
            format_amount(stats.net_profit),
            stats.win_rate_pct,
            report
        ),
    );

    let profit_factor = if stats.profit_factor.is_finite() {
        format!("{:.2}", stats.profit_factor)
    } else {
        "inf".to_string()
    };
    sections.insert(
        "performance_metrics".to_string(),
        format!(
            "Performance details - Average win: {}, Average loss: {}, Profit factor: {}, Best trade: {}, Worst trade: {}.",
            format_amount(stats.avg_profit_win),
            format_amount(stats.avg_loss_loss),
            profit_factor,
            format_amount(stats.best_trade),
            format_amount(stats.worst_trade)
        ),
    );

    sections.insert(
        "risk_analysis".to_string(),
        format!(
            "Risk analysis - Max consecutive losses: {}. Largest single loss: {}. Risk management: {}.",
            stats.max_consecutive_losses,
            format_amount(stats.worst_trade.abs()),
            risk_grade(stats.worst_trade)
        ),
    );

    let symbols: Vec<String> = stats
        .symbol_analysis
        .iter()
        .map(|s| {
            format!(
                "{}: {} trades, profit {}, win rate {:.1}%.",
                s.symbol,
                s.trades,
                format_amount(s.profit),
                s.win_rate
            )
        })
        .collect();
    sections.insert(
        "symbol_analysis".to_string(),
        format!("Symbol analysis - {}", symbols.join(" ")),
    );

    let win_rate = if stats.win_rate_pct >= 60.0 {
        "High win rate (>=60%) shows good trading performance."
    } else if stats.win_rate_pct >= 50.0 {
        "Medium win rate (50-60%) needs improvement."
    } else {
        "Low win rate (<50%) needs better risk management system."
    };
    sections.insert("win_rate".to_string(), win_rate.to_string());

    sections
}

/// Keep the requested sections, or all of them when none is requested
pub fn select_sections(mut sections: ContextSources, keywords: &[String]) -> ContextSources {
    let wanted: Vec<&str> = keywords
        .iter()
        .map(|k| k.as_str())
        .filter(|k| sections.contains_key(*k))
        .collect();

    if wanted.is_empty() {
        return sections;
    }

    sections.retain(|key, _| wanted.contains(&key.as_str()));
    sections
}

#[async_trait]
impl ExternalLookup for TradingContextProvider {
    async fn lookup(&self, keywords: &[String]) -> Result<Option<ContextSources>> {
        let analysis = self.analyze().await?;

        let (Some(stats), Some(report)) = (analysis.stats.as_ref(), analysis.report.as_deref()) else {
            return Err(AgentError::TradingDataError(
                analysis
                    .error
                    .clone()
                    .unwrap_or_else(|| "analysis produced no statistics".to_string()),
            ));
        };

        let sections = select_sections(build_sections(stats, report), keywords);
        info!(
            path = %self.file_path.display(),
            sections = sections.len(),
            "Trading context built"
        );

        Ok(Some(sections))
    }

    fn default_keywords(&self) -> Vec<String> {
        SECTIONS.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::{generate_report, Trade};

    fn stats() -> TradeStats {
        let trades = vec![
            Trade {
                symbol: "EURUSD".into(),
                net_profit: Some(120.0),
                ..Trade::default()
            },
            Trade {
                symbol: "XAUUSD".into(),
                net_profit: Some(-80.0),
                ..Trade::default()
            },
        ];
        TradeStats::calculate(&trades)
    }

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_all_sections_built() {
        let stats = stats();
        let sections = build_sections(&stats, &generate_report(&stats));

        assert_eq!(sections.len(), SECTIONS.len());
        assert!(sections["trading_data"].starts_with("Detailed trading history with total 2 trades"));
        assert!(sections["symbol_analysis"].contains("XAUUSD: 1 trades, profit -80.00"));
        assert!(sections["risk_analysis"].contains("Cần kiểm tra"));
        assert!(sections["win_rate"].starts_with("Medium win rate"));
    }

    #[test]
    fn test_sections_filtered_by_keyword() {
        let stats = stats();
        let sections = build_sections(&stats, "report");

        let picked = select_sections(sections.clone(), &keywords(&["win_rate", "emotions"]));
        assert_eq!(picked.keys().collect::<Vec<_>>(), vec!["win_rate"]);

        let all = select_sections(sections, &keywords(&["emotions"]));
        assert_eq!(all.len(), SECTIONS.len());
    }

    #[tokio::test]
    async fn test_unreadable_file_fails_lookup() {
        let provider = TradingContextProvider::new("/nonexistent/history.xlsx");
        let err = provider.lookup(&keywords(&["win_rate"])).await.unwrap_err();
        assert!(matches!(err, AgentError::TradingDataError(_)));
    }
}
