//! Parsing for Tally daybook CSV exports.
//!
//! Expected columns: date, voucher type, narration, debit, credit.
//! Tally writes dates as dd-MM-yyyy; ISO dates are accepted as well.
//! Malformed rows are collected as errors rather than aborting the import.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct TallyRow {
    pub entry_date: NaiveDate,
    pub voucher_type: String,
    pub narration: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
}

/// Parse a whole export. Returns the valid rows plus one error string per
/// rejected line (numbered for the operator).
pub fn parse_csv(input: &str) -> (Vec<TallyRow>, Vec<String>) {
    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Header row is optional; detect it by a non-date first column.
        if idx == 0 && parse_date(first_field(line)).is_none() {
            continue;
        }
        match parse_line(line) {
            Ok(row) => rows.push(row),
            Err(msg) => errors.push(format!("line {}: {}", idx + 1, msg)),
        }
    }

    (rows, errors)
}

fn parse_line(line: &str) -> Result<TallyRow, String> {
    let fields = split_line(line);
    if fields.len() < 5 {
        return Err(format!("expected 5 columns, found {}", fields.len()));
    }

    let entry_date = parse_date(&fields[0]).ok_or_else(|| format!("invalid date '{}'", fields[0]))?;
    let voucher_type = fields[1].trim().to_string();
    if voucher_type.is_empty() {
        return Err("missing voucher type".to_string());
    }
    let narration = {
        let n = fields[2].trim();
        (!n.is_empty()).then(|| n.to_string())
    };
    let debit = parse_amount(&fields[3]).ok_or_else(|| format!("invalid debit '{}'", fields[3]))?;
    let credit = parse_amount(&fields[4]).ok_or_else(|| format!("invalid credit '{}'", fields[4]))?;

    Ok(TallyRow { entry_date, voucher_type, narration, debit, credit })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return Some(Decimal::ZERO);
    }
    // Tally exports can carry Indian digit grouping.
    Decimal::from_str(&s.replace(',', "")).ok().filter(|d| !d.is_sign_negative())
}

fn first_field(line: &str) -> &str {
    line.split(',').next().unwrap_or("").trim_matches('"')
}

/// Quote-aware CSV field splitter (doubled quotes inside quoted fields).
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_skips_header() {
        let input = "Date,Voucher Type,Narration,Debit,Credit\n\
                     01-04-2026,Payment,Office rent,15000,0\n\
                     2026-04-02,Receipt,,0,5000\n";
        let (rows, errors) = parse_csv(input);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entry_date, "2026-04-01".parse().unwrap());
        assert_eq!(rows[0].debit, Decimal::from(15000));
        assert_eq!(rows[1].narration, None);
        assert_eq!(rows[1].credit, Decimal::from(5000));
    }

    #[test]
    fn malformed_rows_become_errors_not_failures() {
        let input = "01-04-2026,Payment,ok,100,0\n\
                     not-a-date,Payment,bad,100,0\n\
                     01-04-2026,Payment,bad amount,abc,0\n\
                     01-04-2026,,missing voucher,100,0\n";
        let (rows, errors) = parse_csv(input);
        assert_eq!(rows.len(), 1);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("line 2:"));
    }

    #[test]
    fn quoted_fields_with_commas_and_grouping() {
        let input = r#"01-04-2026,Journal,"Transfer, branch ""A""","1,50,000",0"#;
        let (rows, errors) = parse_csv(input);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(rows[0].narration.as_deref(), Some(r#"Transfer, branch "A""#));
        assert_eq!(rows[0].debit, Decimal::from(150_000));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let (rows, errors) = parse_csv("01-04-2026,Payment,neg,-5,0\n");
        assert!(rows.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let (rows, errors) = parse_csv("");
        assert!(rows.is_empty());
        assert!(errors.is_empty());
    }
}
