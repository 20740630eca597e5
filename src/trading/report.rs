//! Vietnamese trading overview report

use super::stats::TradeStats;

/// Two decimals with thousands separators: `-1234.5` → `-1,234.50`
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

fn format_ratio(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", value)
    }
}

pub fn performance_grade(win_rate_pct: f64) -> &'static str {
    if win_rate_pct >= 60.0 {
        "🟢 Tuyệt vời (>60% win rate)"
    } else if win_rate_pct >= 50.0 {
        "🟡 Tốt (50-60% win rate)"
    } else {
        "🔴 Cần cải thiện (<50% win rate)"
    }
}

pub fn risk_grade(worst_trade: f64) -> String {
    let risk = worst_trade.abs();
    if risk <= 50.0 {
        format!("🟢 Tốt (rủi ro/lệnh: {})", format_amount(risk))
    } else {
        format!("🔴 Cần kiểm tra (rủi ro/lệnh: {})", format_amount(risk))
    }
}

pub fn generate_report(stats: &TradeStats) -> String {
    let mut lines = vec![
        "📊 BÁO CÁO TỔNG QUAN GIAO DỊCH".to_string(),
        "=".repeat(50),
        String::new(),
        "📈 TỔNG QUAN".to_string(),
        format!("• Tổng số lệnh: {}", stats.trades),
        format!("• Tổng lợi nhuận: {}", format_amount(stats.net_profit)),
        format!("• Tỷ lệ thắng: {:.1}%", stats.win_rate_pct),
        format!(
            "• Lợi nhuận trung bình/lệnh: {}",
            format_amount(stats.avg_profit_per_trade)
        ),
        String::new(),
        "🎯 HIỆU SUẤT".to_string(),
        format!("• Lệnh thắng trung bình: {}", format_amount(stats.avg_profit_win)),
        format!("• Lệnh thua trung bình: {}", format_amount(stats.avg_loss_loss)),
        format!("• Hệ số lợi nhuận: {}", format_ratio(stats.profit_factor)),
        format!("• Lệnh thắng nhất: {}", format_amount(stats.best_trade)),
        format!("• Lệnh thua nhất: {}", format_amount(stats.worst_trade)),
        String::new(),
        "⚠️ RỦI RO".to_string(),
        format!(
            "• Số lệnh lỗ liên tiếp tối đa: {}",
            stats.max_consecutive_losses
        ),
        String::new(),
        "💱 PHÂN TÍCH CẶP TIỀN".to_string(),
    ];

    for symbol in &stats.symbol_analysis {
        lines.push(format!(
            "• {}: {} lệnh, lợi nhuận: {}, win rate: {:.1}%",
            symbol.symbol,
            symbol.trades,
            format_amount(symbol.profit),
            symbol.win_rate
        ));
    }

    lines.push(String::new());
    lines.push("🎯 ĐÁNH GIÁ TỔNG QUAN".to_string());
    lines.push(format!("• Hiệu suất: {}", performance_grade(stats.win_rate_pct)));
    lines.push(format!("• Quản lý rủi ro: {}", risk_grade(stats.worst_trade)));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::Trade;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(12.346), "12.35");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(-1234567.0), "-1,234,567.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(f64::INFINITY), "inf");
    }

    #[test]
    fn test_grades() {
        assert!(performance_grade(60.0).contains("Tuyệt vời"));
        assert!(performance_grade(55.0).contains("Tốt"));
        assert!(performance_grade(10.0).contains("Cần cải thiện"));
        assert!(risk_grade(-50.0).starts_with("🟢"));
        assert!(risk_grade(-50.01).starts_with("🔴"));
    }

    #[test]
    fn test_report_sections() {
        let trades = vec![
            Trade {
                symbol: "EURUSD".into(),
                net_profit: Some(1500.0),
                ..Trade::default()
            },
            Trade {
                symbol: "EURUSD".into(),
                net_profit: Some(-20.0),
                ..Trade::default()
            },
        ];
        let report = generate_report(&TradeStats::calculate(&trades));

        assert!(report.starts_with("📊 BÁO CÁO TỔNG QUAN GIAO DỊCH"));
        assert!(report.contains("• Tổng số lệnh: 2"));
        assert!(report.contains("• Tổng lợi nhuận: 1,480.00"));
        assert!(report.contains("• Hệ số lợi nhuận: 75.00"));
        assert!(report.contains("• EURUSD: 2 lệnh, lợi nhuận: 1,480.00, win rate: 50.0%"));
        assert!(report.contains("• Quản lý rủi ro: 🟢 Tốt (rủi ro/lệnh: 20.00)"));
    }
}
