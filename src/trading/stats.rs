//! Trade performance metrics

use super::Trade;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolStats {
    pub symbol: String,
    pub trades: usize,
    pub profit: f64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeStats {
    pub trades: usize,
    pub net_profit: f64,
    pub win_rate_pct: f64,
    pub avg_profit_per_trade: f64,
    pub avg_profit_win: f64,
    pub avg_loss_loss: f64,
    /// `f64::INFINITY` when there are no losing trades
    #[serde(serialize_with = "serialize_ratio", deserialize_with = "deserialize_ratio")]
    pub profit_factor: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub max_consecutive_losses: usize,
    /// In order of first appearance
    pub symbol_analysis: Vec<SymbolStats>,
}

// JSON has no infinity; emit it as a string instead of null
fn serialize_ratio<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_str("inf")
    }
}

fn deserialize_ratio<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ratio {
        Number(f64),
        Text(String),
    }

    match Ratio::deserialize(deserializer)? {
        Ratio::Number(value) => Ok(value),
        Ratio::Text(text) if text.eq_ignore_ascii_case("inf") => Ok(f64::INFINITY),
        Ratio::Text(text) => Err(serde::de::Error::custom(format!(
            "invalid profit factor '{}'",
            text
        ))),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl TradeStats {
    /// Trades with no readable profit count towards the total only
    pub fn calculate(trades: &[Trade]) -> Self {
        let count = trades.len();
        let profits: Vec<f64> = trades.iter().filter_map(|t| t.net_profit).collect();
        let wins: Vec<f64> = profits.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = profits.iter().copied().filter(|p| *p < 0.0).collect();

        let net_profit: f64 = profits.iter().sum();
        let win_rate_pct = if count > 0 {
            wins.len() as f64 / count as f64 * 100.0
        } else {
            0.0
        };
        let avg_profit_per_trade = if count > 0 { net_profit / count as f64 } else { 0.0 };

        let total_profit: f64 = wins.iter().sum();
        let total_loss = losses.iter().sum::<f64>().abs();
        let profit_factor = if total_loss > 0.0 {
            total_profit / total_loss
        } else {
            f64::INFINITY
        };

        let best_trade = profits.iter().copied().reduce(f64::max).unwrap_or(0.0);
        let worst_trade = profits.iter().copied().reduce(f64::min).unwrap_or(0.0);

        let mut max_consecutive_losses = 0;
        let mut streak = 0;
        for trade in trades {
            if trade.net_profit.is_some_and(|p| p < 0.0) {
                streak += 1;
                max_consecutive_losses = max_consecutive_losses.max(streak);
            } else {
                streak = 0;
            }
        }

        Self {
            trades: count,
            net_profit,
            win_rate_pct,
            avg_profit_per_trade,
            avg_profit_win: mean(&wins),
            avg_loss_loss: mean(&losses),
            profit_factor,
            best_trade,
            worst_trade,
            max_consecutive_losses,
            symbol_analysis: symbol_breakdown(trades),
        }
    }
}

fn symbol_breakdown(trades: &[Trade]) -> Vec<SymbolStats> {
    let mut symbols: Vec<&str> = Vec::new();
    for trade in trades {
        if !symbols.contains(&trade.symbol.as_str()) {
            symbols.push(&trade.symbol);
        }
    }

    symbols
        .into_iter()
        .map(|symbol| {
            let group: Vec<&Trade> = trades.iter().filter(|t| t.symbol == symbol).collect();
            let wins = group
                .iter()
                .filter(|t| t.net_profit.is_some_and(|p| p > 0.0))
                .count();

            SymbolStats {
                symbol: symbol.to_string(),
                trades: group.len(),
                profit: group.iter().filter_map(|t| t.net_profit).sum(),
                win_rate: wins as f64 / group.len() as f64 * 100.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(symbol: &str, profit: Option<f64>) -> Trade {
        Trade {
            symbol: symbol.to_string(),
            side: "BUY".to_string(),
            net_profit: profit,
            ..Trade::default()
        }
    }

    #[test]
    fn test_basic_metrics() {
        let trades = vec![
            trade("EURUSD", Some(100.0)),
            trade("EURUSD", Some(-40.0)),
            trade("XAUUSD", Some(-20.0)),
            trade("EURUSD", Some(60.0)),
        ];

        let stats = TradeStats::calculate(&trades);
        assert_eq!(stats.trades, 4);
        assert_eq!(stats.net_profit, 100.0);
        assert_eq!(stats.win_rate_pct, 50.0);
        assert_eq!(stats.avg_profit_per_trade, 25.0);
        assert_eq!(stats.avg_profit_win, 80.0);
        assert_eq!(stats.avg_loss_loss, -30.0);
        assert!((stats.profit_factor - 160.0 / 60.0).abs() < 1e-9);
        assert_eq!(stats.best_trade, 100.0);
        assert_eq!(stats.worst_trade, -40.0);
        assert_eq!(stats.max_consecutive_losses, 2);
    }

    #[test]
    fn test_symbols_in_first_seen_order() {
        let trades = vec![
            trade("XAUUSD", Some(5.0)),
            trade("EURUSD", Some(-1.0)),
            trade("XAUUSD", Some(-2.0)),
        ];

        let stats = TradeStats::calculate(&trades);
        let symbols: Vec<&str> = stats.symbol_analysis.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["XAUUSD", "EURUSD"]);
        assert_eq!(stats.symbol_analysis[0].trades, 2);
        assert_eq!(stats.symbol_analysis[0].profit, 3.0);
        assert_eq!(stats.symbol_analysis[0].win_rate, 50.0);
    }

    #[test]
    fn test_no_losses_gives_infinite_factor() {
        let stats = TradeStats::calculate(&[trade("EURUSD", Some(10.0))]);
        assert!(stats.profit_factor.is_infinite());

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["profit_factor"], "inf");

        let restored: TradeStats = serde_json::from_value(json).unwrap();
        assert_eq!(restored, stats);
    }

    #[test]
    fn test_finite_factor_reads_back() {
        let stats = TradeStats::calculate(&[trade("EURUSD", Some(30.0)), trade("EURUSD", Some(-10.0))]);
        let restored: TradeStats = serde_json::from_value(serde_json::to_value(&stats).unwrap()).unwrap();
        assert_eq!(restored.profit_factor, 3.0);

        let mut json = serde_json::to_value(&stats).unwrap();
        json["profit_factor"] = serde_json::json!("lots");
        assert!(serde_json::from_value::<TradeStats>(json).is_err());
    }

    #[test]
    fn test_missing_profit_breaks_streak() {
        let trades = vec![
            trade("A", Some(-1.0)),
            trade("A", None),
            trade("A", Some(-1.0)),
        ];

        let stats = TradeStats::calculate(&trades);
        assert_eq!(stats.max_consecutive_losses, 1);
        assert_eq!(stats.trades, 3);
        assert_eq!(stats.net_profit, -2.0);
    }

    #[test]
    fn test_empty() {
        let stats = TradeStats::calculate(&[]);
        assert_eq!(stats.trades, 0);
        assert_eq!(stats.win_rate_pct, 0.0);
        assert_eq!(stats.best_trade, 0.0);
        assert!(stats.symbol_analysis.is_empty());
    }
}
