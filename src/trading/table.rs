//! Spreadsheet loading and column normalisation

use super::Trade;
use crate::error::AgentError;
use crate::Result;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Standard column name and the headers accepted for it, in priority order
const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    ("symbol", &["symbol", "cặp tiền", "cặp", "pair", "instrument"]),
    ("side", &["side", "hướng", "direction", "loại", "type"]),
    ("close_time", &["close_time", "thời gian đóng", "ngày đóng", "date", "time"]),
    ("net_profit", &["net_profit", "lợi nhuận ròng", "pnl", "profit", "lãi lỗ"]),
    ("commission", &["commission", "phí giao dịch", "phí", "fee"]),
    ("swap", &["swap", "phí qua đêm", "phí swap", "overnight"]),
    ("balance_after", &["balance_after", "số dư sau", "balance", "số dư"]),
    ("pips", &["pips", "điểm", "pip"]),
    ("volume_lots_closed", &["volume_lots_closed", "khối lượng đóng", "volume", "lot"]),
    ("quantity_closed", &["quantity_closed", "số lượng đóng", "quantity", "số lượng"]),
    ("open_price", &["open_price", "giá mở", "giá vào lệnh", "entry price"]),
    ("close_price", &["close_price", "giá đóng", "giá thoát lệnh", "exit price"]),
];

pub const REQUIRED_COLUMNS: [&str; 4] = ["symbol", "side", "close_time", "net_profit"];

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(n) => Some(n.to_string()),
            Cell::DateTime(dt) => Some(dt.to_string()),
        }
    }

    /// Numeric value; unparseable text is treated as missing
    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Day-first date parsing; numbers are Excel serial days
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Number(n) => excel_serial_to_datetime(*n),
            Cell::Text(s) => parse_datetime_text(s.trim()),
            Cell::Empty => None,
        }
    }
}

/// Header row plus data rows of the first worksheet
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows,
        }
    }

    /// Resolve every standard column to a header position
    fn column_positions(&self) -> HashMap<&'static str, usize> {
        let lowered: Vec<String> = self.headers.iter().map(|h| h.to_lowercase()).collect();
        let mut positions = HashMap::new();

        for (standard, aliases) in COLUMN_ALIASES {
            let found = aliases
                .iter()
                .find_map(|alias| lowered.iter().position(|h| h == alias));
            if let Some(index) = found {
                positions.insert(*standard, index);
            }
        }

        positions
    }

    /// Convert rows into trades, failing if a required column is absent
    pub fn into_trades(self) -> Result<Vec<Trade>> {
        let positions = self.column_positions();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !positions.contains_key(c))
            .collect();
        if !missing.is_empty() {
            return Err(AgentError::TradingDataError(format!(
                "Thiếu cột bắt buộc: {:?}",
                missing
            )));
        }

        let cell = |row: &[Cell], column: &str| -> Cell {
            positions
                .get(column)
                .and_then(|&i| row.get(i))
                .cloned()
                .unwrap_or(Cell::Empty)
        };

        let trades = self
            .rows
            .iter()
            .filter(|row| row.iter().any(|c| *c != Cell::Empty))
            .map(|row| Trade {
                symbol: cell(row, "symbol").text().unwrap_or_default(),
                side: normalize_side(&cell(row, "side").text().unwrap_or_default()),
                close_time: cell(row, "close_time").datetime(),
                net_profit: cell(row, "net_profit").number(),
                commission: cell(row, "commission").number(),
                swap: cell(row, "swap").number(),
                balance_after: cell(row, "balance_after").number(),
                pips: cell(row, "pips").number(),
                volume_lots_closed: cell(row, "volume_lots_closed").number(),
                quantity_closed: cell(row, "quantity_closed").number(),
                open_price: cell(row, "open_price").number(),
                close_price: cell(row, "close_price").number(),
            })
            .collect();

        Ok(trades)
    }
}

/// Vietnamese side labels become BUY/SELL; anything else is kept
pub fn normalize_side(side: &str) -> String {
    match side.trim() {
        "Mua" => "BUY".to_string(),
        "Bán" => "SELL".to_string(),
        other => other.to_string(),
    }
}

/// Load the first worksheet of an `.xlsx` or `.xls` file
pub fn read_workbook(path: &Path) -> Result<RawTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if !matches!(extension.as_deref(), Some("xlsx") | Some("xls")) {
        return Err(AgentError::TradingDataError(
            "File phải có định dạng .xlsx hoặc .xls".to_string(),
        ));
    }

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AgentError::TradingDataError("Workbook has no worksheets".to_string()))??;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|row| row.iter().map(|c| convert_cell(c).text().unwrap_or_default()).collect())
        .unwrap_or_default();
    let rows: Vec<Vec<Cell>> = rows.map(|row| row.iter().map(convert_cell).collect()).collect();

    debug!(path = %path.display(), rows = rows.len(), "Worksheet loaded");

    Ok(RawTable::new(headers, rows))
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(Cell::DateTime)
            .unwrap_or(Cell::Empty),
    }
}

fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    if text.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_vietnamese_headers_are_mapped() {
        let table = RawTable::new(
            vec![
                "Cặp tiền".into(),
                " Hướng ".into(),
                "Thời gian đóng".into(),
                "Lợi nhuận ròng".into(),
                "Phí".into(),
            ],
            vec![vec![
                text("EURUSD"),
                text("Mua"),
                text("05/03/2024 14:30:00"),
                Cell::Number(12.5),
                text("-0.7"),
            ]],
        );

        let trades = table.into_trades().unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].symbol, "EURUSD");
        assert_eq!(trades[0].side, "BUY");
        assert_eq!(trades[0].net_profit, Some(12.5));
        assert_eq!(trades[0].commission, Some(-0.7));

        let close = trades[0].close_time.unwrap();
        assert_eq!((close.day(), close.month(), close.hour()), (5, 3, 14));
    }

    #[test]
    fn test_missing_required_column() {
        let table = RawTable::new(
            vec!["symbol".into(), "side".into(), "profit".into()],
            vec![],
        );

        let err = table.into_trades().unwrap_err();
        assert!(err.to_string().contains("close_time"));
    }

    #[test]
    fn test_first_alias_wins() {
        let table = RawTable::new(
            vec![
                "symbol".into(),
                "side".into(),
                "date".into(),
                "profit".into(),
                "net_profit".into(),
            ],
            vec![vec![
                text("XAUUSD"),
                text("Bán"),
                Cell::Number(45352.5),
                Cell::Number(1.0),
                Cell::Number(2.0),
            ]],
        );

        let trades = table.into_trades().unwrap();
        assert_eq!(trades[0].net_profit, Some(2.0));
        assert_eq!(trades[0].side, "SELL");
        assert_eq!(trades[0].close_time.unwrap().hour(), 12);
    }

    #[test]
    fn test_bad_numbers_become_missing() {
        assert_eq!(text("abc").number(), None);
        assert_eq!(text("1,250.5").number(), Some(1250.5));
        assert_eq!(Cell::Empty.number(), None);
    }

    #[test]
    fn test_blank_rows_skipped() {
        let table = RawTable::new(
            vec!["symbol".into(), "side".into(), "close_time".into(), "net_profit".into()],
            vec![
                vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty],
                vec![text("GBPUSD"), text("BUY"), text("2024-01-02"), Cell::Number(-3.0)],
            ],
        );

        assert_eq!(table.into_trades().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_other_extensions() {
        let err = read_workbook(Path::new("trades.csv")).unwrap_err();
        assert!(matches!(err, AgentError::TradingDataError(_)));
    }
}
