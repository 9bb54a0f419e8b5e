//! Roll reconciled flows up into the coupons of the summary report.
use crate::config::ReportColumns;
use crate::table::{self, Table};

/// A report row asking for the coupons of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// The index of the row in its table.
    pub row: usize,
    pub operation_code: String,
}

/// The present values of one flow row, as far as the report is concerned.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentValue {
    pub contract_code: String,
    pub receivable: f64,
    pub payable: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    pub row: usize,
    pub operation_code: String,
    /// The sum of receivable present values, in millions.
    pub coupon: f64,
    /// The sum of payable present values, in millions.
    pub coupon_alt: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// One record per request that matched at least one flow, in request order.
    pub records: Vec<ReportRecord>,
    /// The codes of requests without any flow, whose rows stay as they are. Empty codes match nothing.
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSchema {
    pub code: usize,
    pub coupon: usize,
    pub coupon_alt: usize,
}

impl ReportSchema {
    pub fn resolve(table: &Table, columns: &ReportColumns) -> Result<Self, table::Error> {
        let idx = table.columns(&[
            columns.code.as_str(),
            columns.coupon.as_str(),
            columns.coupon_alt.as_str(),
        ])?;
        Ok(ReportSchema {
            code: idx[0],
            coupon: idx[1],
            coupon_alt: idx[2],
        })
    }

    pub fn requests(&self, table: &Table) -> Vec<ReportRequest> {
        table
            .rows
            .iter()
            .enumerate()
            .map(|(row, record)| ReportRequest {
                row,
                operation_code: record.get(self.code).unwrap_or_default().trim().to_owned(),
            })
            .collect()
    }

    pub fn write_back(&self, table: &mut Table, records: &[ReportRecord]) {
        for record in records {
            table.set(record.row, self.coupon, &crate::format_amount(record.coupon));
            table.set(record.row, self.coupon_alt, &crate::format_amount(record.coupon_alt));
        }
    }
}

/// Compensated summation, so the total doesn't depend on the order of the flows beyond rounding
/// of the final result.
#[derive(Debug, Default, Clone, Copy)]
struct Sum {
    total: f64,
    compensation: f64,
}

impl Sum {
    fn add(&mut self, value: f64) {
        let total = self.total + value;
        self.compensation += if self.total.abs() >= value.abs() {
            (self.total - total) + value
        } else {
            (value - total) + self.total
        };
        self.total = total;
    }

    fn value(self) -> f64 {
        self.total + self.compensation
    }
}

pub(crate) mod function {
    use crate::report::{Aggregation, PresentValue, ReportRecord, ReportRequest, Sum};
    use std::collections::HashMap;

    const MILLION: f64 = 1_000_000.0;

    /// Sum up all present `values` per operation code of `requests`. Values and requests with an empty
    /// code take no part.
    pub fn aggregate(requests: &[ReportRequest], values: &[PresentValue]) -> Aggregation {
        let mut sums = HashMap::<&str, (Sum, Sum)>::new();
        for value in values.iter().filter(|value| !value.contract_code.is_empty()) {
            let (receivable, payable) = sums.entry(value.contract_code.as_str()).or_default();
            receivable.add(value.receivable);
            payable.add(value.payable);
        }

        let mut records = Vec::new();
        let mut unmatched = Vec::new();
        for request in requests {
            match sums.get(request.operation_code.as_str()) {
                Some((receivable, payable)) => records.push(ReportRecord {
                    row: request.row,
                    operation_code: request.operation_code.clone(),
                    coupon: receivable.value() / MILLION,
                    coupon_alt: payable.value() / MILLION,
                }),
                None => unmatched.push(request.operation_code.clone()),
            }
        }
        Aggregation { records, unmatched }
    }
}
