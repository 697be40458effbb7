//! Spreadsheet row extraction for issuer transaction exports.
//!
//! The supported exports share one structural layout: eight rows of
//! header/metadata, then a data table with eleven fixed columns. The
//! offsets are format constants of the sources, not configuration.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Range, Reader};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::utils::normalize;

/// Rows of issuer-specific header/metadata before the data table.
pub const HEADER_ROWS: u32 = 8;

const COL_DATE: u32 = 0;
const COL_CARD_NUMBER: u32 = 1;
const COL_MERCHANT_NAME: u32 = 2;
const COL_APPROVAL_AMOUNT: u32 = 3;
const COL_AMOUNT: u32 = 4;
const COL_VAT: u32 = 5;
const COL_RELATION: u32 = 6;
const COL_INSTALLMENT: u32 = 7;
const COL_STATUS: u32 = 8;
const COL_MERCHANT_NUMBER: u32 = 9;
const COL_BUSINESS_NUMBER: u32 = 10;

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("unreadable spreadsheet: {0}")]
    Unreadable(String),

    #[error("workbook contains no sheets")]
    NoSheets,
}

/// One raw row, positionally mapped to the fixed column layout. Field
/// contents are not validated here; the orchestrator decides what a
/// usable row is.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub date: Data,
    pub card_number: Data,
    pub merchant_name: Data,
    pub approval_amount: Data,
    pub amount: Data,
    pub vat: Data,
    pub relation: Data,
    pub installment: Data,
    pub status: Data,
    pub merchant_number: Data,
    pub business_number: Data,
}

impl RawRow {
    fn from_range(range: &Range<Data>, row: u32) -> Self {
        let cell = |col: u32| range.get_value((row, col)).cloned().unwrap_or(Data::Empty);
        Self {
            date: cell(COL_DATE),
            card_number: cell(COL_CARD_NUMBER),
            merchant_name: cell(COL_MERCHANT_NAME),
            approval_amount: cell(COL_APPROVAL_AMOUNT),
            amount: cell(COL_AMOUNT),
            vat: cell(COL_VAT),
            relation: cell(COL_RELATION),
            installment: cell(COL_INSTALLMENT),
            status: cell(COL_STATUS),
            merchant_number: cell(COL_MERCHANT_NUMBER),
            business_number: cell(COL_BUSINESS_NUMBER),
        }
    }

    fn is_blank(&self) -> bool {
        [
            &self.date,
            &self.card_number,
            &self.merchant_name,
            &self.approval_amount,
            &self.amount,
            &self.vat,
            &self.relation,
            &self.installment,
            &self.status,
            &self.merchant_number,
            &self.business_number,
        ]
        .iter()
        .all(|cell| cell.is_empty())
    }

    /// Trimmed, non-empty merchant name.
    pub fn merchant(&self) -> Option<String> {
        normalize::cell_text(&self.merchant_name)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Transaction date, if the cell parses.
    pub fn occurred(&self) -> Option<DateTime<Utc>> {
        normalize::date_from_cell(&self.date)
    }

    /// Charged amount; unparseable cells degrade to zero.
    pub fn amount_value(&self) -> i64 {
        normalize::amount_from_cell(&self.amount)
    }
}

/// Parse the byte stream as a workbook and iterate the data rows of its
/// first sheet. The returned iterator is lazy, finite and non-restartable.
pub fn extract_rows(bytes: &[u8]) -> Result<RowIter, SpreadsheetError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| SpreadsheetError::Unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoSheets)?
        .map_err(|e| SpreadsheetError::Unreadable(e.to_string()))?;
    Ok(RowIter::over(range))
}

/// Iterator over the data region of a sheet, header rows skipped and
/// fully blank rows dropped.
pub struct RowIter {
    range: Range<Data>,
    next_row: u32,
    end_row: Option<u32>,
}

impl RowIter {
    pub fn over(range: Range<Data>) -> Self {
        let end_row = range.end().map(|(row, _)| row);
        Self {
            range,
            next_row: HEADER_ROWS,
            end_row,
        }
    }
}

impl Iterator for RowIter {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        let end_row = self.end_row?;
        while self.next_row <= end_row {
            let row = RawRow::from_range(&self.range, self.next_row);
            self.next_row += 1;
            if !row.is_blank() {
                return Some(row);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a sheet range shaped like an issuer export: eight header
    /// rows, then one data row per (date, merchant, amount) triple.
    fn sheet_with_rows(rows: &[(&str, &str, &str)]) -> Range<Data> {
        let end_row = HEADER_ROWS + rows.len() as u32;
        let mut range = Range::new((0, 0), (end_row, 10));
        range.set_value((0, 0), Data::String("이용내역 조회".into()));
        range.set_value((7, 0), Data::String("이용일자".into()));
        for (i, (date, merchant, amount)) in rows.iter().enumerate() {
            let row = HEADER_ROWS + i as u32;
            range.set_value((row, COL_DATE), Data::String(date.to_string()));
            range.set_value((row, COL_CARD_NUMBER), Data::String("1234-56**-****".into()));
            range.set_value((row, COL_MERCHANT_NAME), Data::String(merchant.to_string()));
            range.set_value((row, COL_AMOUNT), Data::String(amount.to_string()));
            range.set_value((row, COL_STATUS), Data::String("승인".into()));
        }
        range
    }

    #[test]
    fn maps_rows_beyond_the_header_offset_in_order() {
        let range = sheet_with_rows(&[
            ("2026-07-01", "스타벅스 강남점", "5,600원"),
            ("2026-07-02", "GS25", "2,100원"),
            ("2026-07-03", "택시", "12,000원"),
        ]);

        let rows: Vec<RawRow> = RowIter::over(range).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].merchant().as_deref(), Some("스타벅스 강남점"));
        assert_eq!(rows[1].merchant().as_deref(), Some("GS25"));
        assert_eq!(rows[2].amount_value(), 12000);
    }

    #[test]
    fn header_rows_are_never_yielded() {
        let range = sheet_with_rows(&[("2026-07-01", "편의점", "1,000원")]);
        let rows: Vec<RawRow> = RowIter::over(range).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].merchant().as_deref(), Some("편의점"));
    }

    #[test]
    fn fully_blank_rows_are_dropped() {
        // Two data rows with an untouched row between them.
        let mut range = Range::new((0, 0), (HEADER_ROWS + 2, 10));
        range.set_value((HEADER_ROWS, COL_MERCHANT_NAME), Data::String("A".into()));
        range.set_value((HEADER_ROWS + 2, COL_MERCHANT_NAME), Data::String("B".into()));

        let rows: Vec<RawRow> = RowIter::over(range).collect();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn merchant_accessor_trims_and_rejects_empty() {
        let range = sheet_with_rows(&[("2026-07-01", "  카페  ", "0")]);
        let rows: Vec<RawRow> = RowIter::over(range).collect();
        assert_eq!(rows[0].merchant().as_deref(), Some("카페"));

        let range = sheet_with_rows(&[("2026-07-01", "   ", "0")]);
        let rows: Vec<RawRow> = RowIter::over(range).collect();
        assert_eq!(rows[0].merchant(), None);
    }

    #[test]
    fn invalid_date_cell_yields_no_date() {
        let range = sheet_with_rows(&[("invalid-date", "카페", "100원")]);
        let rows: Vec<RawRow> = RowIter::over(range).collect();
        assert!(rows[0].occurred().is_none());
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(matches!(
            extract_rows(b"definitely not a workbook"),
            Err(SpreadsheetError::Unreadable(_))
        ));
    }
}
