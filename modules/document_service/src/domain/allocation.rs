//! Counter allocation planning
//!
//! Pure part of the allocation algorithm: given the live counter rows of one
//! stream, decide which row advances (or which row is created) and compute its
//! next state. Repositories run this inside the transaction that holds the
//! stream's rows locked.

use crate::contract::Counter;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Numbering stream: the unit of mutual exclusion for allocation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub tenant_id: Uuid,
    pub document_type_id: Uuid,
    pub series: String,
}

/// Settings used for counters created on first use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDefaults {
    pub padding_length: u8,
    pub reset_on_year_change: bool,
}

impl Default for CounterDefaults {
    fn default() -> Self {
        Self {
            padding_length: 5,
            reset_on_year_change: true,
        }
    }
}

/// Write the repository must perform to commit an allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterWrite {
    /// First use of the stream (or of the year): insert a new row
    Insert(Counter),
    /// Advance an existing row
    Update(Counter),
}

impl CounterWrite {
    pub fn counter(&self) -> &Counter {
        match self {
            CounterWrite::Insert(c) | CounterWrite::Update(c) => c,
        }
    }

    pub fn into_counter(self) -> Counter {
        match self {
            CounterWrite::Insert(c) | CounterWrite::Update(c) => c,
        }
    }
}

/// Everything the planner needs besides the stored rows
#[derive(Debug, Clone)]
pub struct AllocationRequest<'a> {
    pub stream: &'a StreamKey,
    pub current_year: i32,
    pub acting_user: &'a str,
    pub now: DateTime<Utc>,
    pub defaults: CounterDefaults,
}

/// Pick the row of the stream that serves `current_year`.
///
/// Preference: the row scoped to the current year, then a row that does not
/// reset on year change (year-less first, then the latest year), then the
/// latest resetting row, which will roll over. Rows configured for a later
/// year are left for that year; with nothing else a new row is created.
pub fn select_counter(rows: &[Counter], current_year: i32) -> Option<&Counter> {
    if let Some(row) = rows.iter().find(|c| c.year == Some(current_year)) {
        return Some(row);
    }

    let past = |c: &&Counter| !matches!(c.year, Some(year) if year > current_year);

    let continuous = rows
        .iter()
        .filter(past)
        .filter(|c| !c.reset_on_year_change)
        .max_by_key(|c| c.year.unwrap_or(i32::MAX));
    if continuous.is_some() {
        return continuous;
    }

    rows.iter()
        .filter(past)
        .filter(|c| c.reset_on_year_change)
        .max_by_key(|c| c.year.unwrap_or(i32::MIN))
}

/// Compute the next state of the stream for one allocation.
pub fn plan_allocation(rows: Vec<Counter>, request: &AllocationRequest<'_>) -> CounterWrite {
    let selected = select_counter(&rows, request.current_year).cloned();

    match selected {
        None => {
            let counter = Counter {
                id: Uuid::new_v4(),
                tenant_id: request.stream.tenant_id,
                document_type_id: request.stream.document_type_id,
                series: request.stream.series.clone(),
                year: Some(request.current_year),
                current_value: 1,
                prefix: None,
                padding_length: request.defaults.padding_length,
                format_pattern: None,
                reset_on_year_change: request.defaults.reset_on_year_change,
                notes: None,
                created_at: request.now,
                created_by: request.acting_user.to_string(),
                updated_at: request.now,
                updated_by: request.acting_user.to_string(),
                deleted_at: None,
            };
            CounterWrite::Insert(counter)
        }
        Some(mut counter) => {
            if counter.reset_on_year_change && counter.year != Some(request.current_year) {
                counter.current_value = 0;
                counter.year = Some(request.current_year);
            }
            counter.current_value += 1;
            counter.updated_at = request.now;
            counter.updated_by = request.acting_user.to_string();
            CounterWrite::Update(counter)
        }
    }
}
