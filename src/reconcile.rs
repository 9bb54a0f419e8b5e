//! Overwrite the amounts of flow rows with the estimates sharing their contract code and date.
use crate::config::{EstimateColumns, FlowColumns, Rule};
use crate::report::PresentValue;
use crate::table::{self, Table};
use time::Date;

/// A problem with a single row, which causes that row to be skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("Line {line}: '{value}' in column '{column}' is not a date")]
    Date {
        line: u64,
        column: String,
        value: String,
    },
    #[error("Line {line}: '{value}' in column '{column}' is not a number")]
    Amount {
        line: u64,
        column: String,
        value: String,
    },
    #[error("Line {line}: '{value}' in column '{column}' is neither leg 1 nor leg 2")]
    Leg {
        line: u64,
        column: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowRecord {
    /// The index of the row in its table.
    pub row: usize,
    pub contract_code: String,
    pub collection_date: Date,
    pub receivable_interest: f64,
    pub payable_interest: f64,
    pub receivable_pv: f64,
    pub payable_pv: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRecord {
    pub line: u64,
    pub contract_code: String,
    pub date: Date,
    /// `None` if the cell was empty.
    pub discount_flow: Option<f64>,
    /// `None` if the cell was empty.
    pub collateral_flow: Option<f64>,
    /// Only read when reconciling with [`Rule::Leg`].
    pub leg: Option<Leg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Receivable,
    Payable,
}

/// Records read from a table, and the rows that had to be skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub skipped: Vec<RowError>,
}

/// The column indices of a flows table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSchema {
    pub code: usize,
    pub date: usize,
    pub receivable_interest: usize,
    pub payable_interest: usize,
    pub receivable_pv: usize,
    pub payable_pv: usize,
}

/// The column indices of an estimates table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateSchema {
    pub code: usize,
    pub date: usize,
    pub discount_flow: usize,
    pub collateral_flow: usize,
    pub leg: Option<usize>,
}

impl FlowSchema {
    pub fn resolve(table: &Table, columns: &FlowColumns) -> Result<Self, table::Error> {
        let idx = table.columns(&[
            columns.code.as_str(),
            columns.date.as_str(),
            columns.receivable_interest.as_str(),
            columns.payable_interest.as_str(),
            columns.receivable_pv.as_str(),
            columns.payable_pv.as_str(),
        ])?;
        Ok(FlowSchema {
            code: idx[0],
            date: idx[1],
            receivable_interest: idx[2],
            payable_interest: idx[3],
            receivable_pv: idx[4],
            payable_pv: idx[5],
        })
    }

    /// Read all flow rows of `table`. Empty amounts are zero.
    pub fn load(&self, table: &Table) -> Loaded<FlowRecord> {
        load(table, |cell| {
            Ok(FlowRecord {
                row: cell.row,
                contract_code: cell.text(self.code).to_owned(),
                collection_date: cell.date(self.date)?,
                receivable_interest: cell.amount(self.receivable_interest)?.unwrap_or(0.0),
                payable_interest: cell.amount(self.payable_interest)?.unwrap_or(0.0),
                receivable_pv: cell.amount(self.receivable_pv)?.unwrap_or(0.0),
                payable_pv: cell.amount(self.payable_pv)?.unwrap_or(0.0),
            })
        })
    }

    /// Read the contract code and present values of every row of `table`, whatever its other cells hold.
    /// Amounts that are empty or not a number count as zero.
    pub fn present_values(&self, table: &Table) -> Vec<PresentValue> {
        let amount = |record: &csv::StringRecord, column: usize| {
            crate::parse_amount(record.get(column).unwrap_or_default())
                .ok()
                .flatten()
                .unwrap_or(0.0)
        };
        table
            .rows
            .iter()
            .map(|record| PresentValue {
                contract_code: record.get(self.code).unwrap_or_default().trim().to_owned(),
                receivable: amount(record, self.receivable_pv),
                payable: amount(record, self.payable_pv),
            })
            .collect()
    }

    /// Write the amounts of `updated` that differ from `original` into `table`,
    /// leaving every other cell as it was read. Returns the amount of rows that changed.
    pub fn write_back(
        &self,
        table: &mut Table,
        original: &[FlowRecord],
        updated: &[FlowRecord],
    ) -> usize {
        let mut changed_rows = 0;
        for (before, after) in original.iter().zip(updated) {
            let mut changed = false;
            for (column, old, new) in [
                (self.receivable_interest, before.receivable_interest, after.receivable_interest),
                (self.payable_interest, before.payable_interest, after.payable_interest),
                (self.receivable_pv, before.receivable_pv, after.receivable_pv),
                (self.payable_pv, before.payable_pv, after.payable_pv),
            ] {
                if old != new {
                    table.set(after.row, column, &crate::format_amount(new));
                    changed = true;
                }
            }
            changed_rows += usize::from(changed);
        }
        changed_rows
    }
}

impl EstimateSchema {
    /// The leg column is only required if `rule` is [`Rule::Leg`].
    pub fn resolve(table: &Table, columns: &EstimateColumns, rule: Rule) -> Result<Self, table::Error> {
        let mut names = vec![
            columns.code.as_str(),
            columns.date.as_str(),
            columns.discount_flow.as_str(),
            columns.collateral_flow.as_str(),
        ];
        if rule == Rule::Leg {
            names.push(columns.leg.as_str());
        }
        let idx = table.columns(&names)?;
        Ok(EstimateSchema {
            code: idx[0],
            date: idx[1],
            discount_flow: idx[2],
            collateral_flow: idx[3],
            leg: idx.get(4).copied(),
        })
    }

    pub fn load(&self, table: &Table) -> Loaded<EstimateRecord> {
        load(table, |cell| {
            Ok(EstimateRecord {
                line: cell.line(),
                contract_code: cell.text(self.code).to_owned(),
                date: cell.date(self.date)?,
                discount_flow: cell.amount(self.discount_flow)?,
                collateral_flow: cell.amount(self.collateral_flow)?,
                leg: self.leg.map(|column| cell.leg(column)).transpose()?,
            })
        })
    }
}

fn load<T>(table: &Table, parse: impl Fn(&Cell<'_>) -> Result<T, RowError>) -> Loaded<T> {
    let mut loaded = Loaded {
        records: Vec::with_capacity(table.rows.len()),
        skipped: Vec::new(),
    };
    for (row, record) in table.rows.iter().enumerate() {
        match parse(&Cell { table, row, record }) {
            Ok(parsed) => loaded.records.push(parsed),
            Err(err) => loaded.skipped.push(err),
        }
    }
    loaded
}

struct Cell<'a> {
    table: &'a Table,
    row: usize,
    record: &'a csv::StringRecord,
}

impl<'a> Cell<'a> {
    fn text(&self, column: usize) -> &'a str {
        self.record.get(column).unwrap_or_default().trim()
    }

    fn line(&self) -> u64 {
        self.table.line(self.row)
    }

    fn column_name(&self, column: usize) -> String {
        self.table.headers.get(column).unwrap_or_default().to_owned()
    }

    fn date(&self, column: usize) -> Result<Date, RowError> {
        let value = self.text(column);
        crate::date::parse_cell(value).ok_or_else(|| RowError::Date {
            line: self.line(),
            column: self.column_name(column),
            value: value.to_owned(),
        })
    }

    fn amount(&self, column: usize) -> Result<Option<f64>, RowError> {
        crate::parse_amount(self.text(column)).map_err(|crate::InvalidAmount(value)| {
            RowError::Amount {
                line: self.line(),
                column: self.column_name(column),
                value,
            }
        })
    }

    fn leg(&self, column: usize) -> Result<Leg, RowError> {
        match self.text(column) {
            "1" => Ok(Leg::Receivable),
            "2" => Ok(Leg::Payable),
            value => Err(RowError::Leg {
                line: self.line(),
                column: self.column_name(column),
                value: value.to_owned(),
            }),
        }
    }
}

impl Rule {
    /// Return `flow` with the amounts of `estimate` applied to it.
    pub fn apply(self, flow: &FlowRecord, estimate: &EstimateRecord) -> FlowRecord {
        let mut out = flow.clone();
        match self {
            Rule::Sign => {
                assign_by_sign(
                    estimate.discount_flow,
                    &mut out.receivable_interest,
                    &mut out.payable_interest,
                );
                assign_by_sign(
                    estimate.collateral_flow,
                    &mut out.receivable_pv,
                    &mut out.payable_pv,
                );
            }
            Rule::Leg => {
                let (interest, pv) = match estimate.leg {
                    Some(Leg::Receivable) => (&mut out.receivable_interest, &mut out.receivable_pv),
                    Some(Leg::Payable) => (&mut out.payable_interest, &mut out.payable_pv),
                    None => return out,
                };
                if let Some(collateral) = estimate.collateral_flow {
                    *interest = collateral.abs();
                }
                if let Some(discount) = estimate.discount_flow {
                    *pv = discount.abs();
                }
            }
        }
        out
    }
}

/// Zero leaves both fields untouched.
fn assign_by_sign(value: Option<f64>, receivable: &mut f64, payable: &mut f64) {
    match value {
        Some(value) if value > 0.0 => *receivable = value,
        Some(value) if value < 0.0 => *payable = value.abs(),
        _ => {}
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The flows in input order, with all matching estimates applied.
    pub flows: Vec<FlowRecord>,
    /// The amount of times an estimate was applied to a flow.
    pub modified_rows: usize,
    /// The lines of estimates that didn't match any flow.
    pub unmatched_estimates: Vec<u64>,
}

pub(crate) mod function {
    use crate::config::Rule;
    use crate::reconcile::{EstimateRecord, FlowRecord, Reconciliation};
    use std::collections::HashMap;

    /// Apply each of `estimates` in order to all `flows` with the same contract code and date, so
    /// later estimates for the same key win over earlier ones. An empty contract code matches nothing.
    pub fn reconcile(
        flows: &[FlowRecord],
        estimates: &[EstimateRecord],
        rule: Rule,
    ) -> Reconciliation {
        let mut by_key = HashMap::<_, Vec<usize>>::new();
        for (idx, flow) in flows
            .iter()
            .enumerate()
            .filter(|(_, flow)| !flow.contract_code.is_empty())
        {
            by_key
                .entry((flow.contract_code.as_str(), flow.collection_date))
                .or_default()
                .push(idx);
        }

        let mut updated = flows.to_vec();
        let mut modified_rows = 0;
        let mut unmatched_estimates = Vec::new();
        for estimate in estimates {
            match by_key.get(&(estimate.contract_code.as_str(), estimate.date)) {
                Some(indices) => {
                    for &idx in indices {
                        updated[idx] = rule.apply(&updated[idx], estimate);
                        modified_rows += 1;
                    }
                }
                None => unmatched_estimates.push(estimate.line),
            }
        }

        Reconciliation {
            flows: updated,
            modified_rows,
            unmatched_estimates,
        }
    }
}
