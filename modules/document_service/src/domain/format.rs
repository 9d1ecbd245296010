//! Document number rendering

use crate::contract::{Counter, DocumentNumber};

/// Counter state needed to render a document number
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot<'a> {
    pub prefix: Option<&'a str>,
    pub series: &'a str,
    pub year: Option<i32>,
    pub value: i64,
    pub padding_length: u8,
    pub format_pattern: Option<&'a str>,
}

impl<'a> CounterSnapshot<'a> {
    /// Snapshot of a stored counter at its current value
    pub fn of(counter: &'a Counter) -> Self {
        Self {
            prefix: counter.prefix.as_deref(),
            series: &counter.series,
            year: counter.year,
            value: counter.current_value,
            padding_length: counter.padding_length,
            format_pattern: counter.format_pattern.as_deref(),
        }
    }
}

/// Render a document number.
///
/// With a pattern, `{PREFIX}`, `{SERIES}`, `{YEAR}` and `{NUMBER}` are replaced
/// literally and the result is returned as is. Without one, the non-empty parts
/// prefix, series, year and number are joined with `/`.
///
/// `padding_length` must already be validated (1..=10).
pub fn format_number(snapshot: &CounterSnapshot<'_>) -> String {
    let number = format!(
        "{:0width$}",
        snapshot.value,
        width = usize::from(snapshot.padding_length)
    );
    let prefix = snapshot.prefix.unwrap_or_default();
    let year = snapshot.year.map(|y| y.to_string()).unwrap_or_default();

    if let Some(pattern) = snapshot.format_pattern {
        return pattern
            .replace("{PREFIX}", prefix)
            .replace("{SERIES}", snapshot.series)
            .replace("{YEAR}", &year)
            .replace("{NUMBER}", &number);
    }

    [prefix, snapshot.series, year.as_str(), number.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Number handed out for a counter that was just advanced
pub fn issue_number(counter: &Counter) -> DocumentNumber {
    DocumentNumber {
        formatted: format_number(&CounterSnapshot::of(counter)),
        value: counter.current_value,
        year: counter.year,
        counter_id: counter.id,
    }
}
