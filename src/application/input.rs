//! Readers for fault-tree logic, basic-event and hazard-curve files.
//!
//! All three formats are comma separated without header row. Fields may be quoted and are
//! trimmed; blank lines and lines starting with `#` are skipped.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::{DomainError, DomainResult, Distribution, Gate, HazardCurve, LogicRow};

/// One basic-event line: `NAME, PE|NORM|LNORM, P0[, P1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicEventInput {
    pub name: String,
    pub distribution: Distribution,
    pub params: Vec<f64>,
}

impl BasicEventInput {
    pub fn new(name: &str, distribution: Distribution, params: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            distribution,
            params: params.to_vec(),
        }
    }
}

/// Data records of `content` with their 1-based line number.
fn records(content: &str, path: &Path) -> DomainResult<Vec<(u64, StringRecord)>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            DomainError::InvalidInput(format!("{}:{}: {}", path.display(), line, e))
        })?;
        // Indented comments and whitespace-only lines
        let first = record.get(0).unwrap_or("");
        if first.starts_with('#') || record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows.push((line, record));
    }
    Ok(rows)
}

fn joined(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(", ")
}

fn parse_number(value: &str, path: &Path, line: u64) -> DomainResult<f64> {
    value.parse::<f64>().map_err(|_| {
        DomainError::InvalidInput(format!(
            "{}:{}: '{}' is not a number",
            path.display(),
            line,
            value
        ))
    })
}

/// Logic file: `NAME, AND|OR, DEP0, DEP1, ...` per line; the first row names the root.
pub fn parse_logic(content: &str, path: &Path) -> DomainResult<Vec<LogicRow>> {
    let mut rows = Vec::new();
    for (line, record) in records(content, path)? {
        if record.len() < 3 {
            return Err(DomainError::InvalidInput(format!(
                "{}:{}: expected 'EVENT, AND|OR, DEP, ...', got '{}'",
                path.display(),
                line,
                joined(&record)
            )));
        }
        let gate: Gate = record[1].parse()?;
        rows.push(LogicRow {
            name: record[0].to_string(),
            gate,
            deps: record.iter().skip(2).map(str::to_string).collect(),
        });
    }
    Ok(rows)
}

pub fn parse_basic_events(content: &str, path: &Path) -> DomainResult<Vec<BasicEventInput>> {
    let mut events = Vec::new();
    for (line, record) in records(content, path)? {
        if record.len() < 3 {
            return Err(DomainError::InvalidInput(format!(
                "{}:{}: expected 'EVENT, PE|NORM|LNORM, VALUE, ...', got '{}'",
                path.display(),
                line,
                joined(&record)
            )));
        }
        let distribution: Distribution = record[1].parse().map_err(|d| {
            DomainError::InvalidInput(format!(
                "{}:{}: unknown distribution '{}', expected PE, NORM or LNORM",
                path.display(),
                line,
                d
            ))
        })?;
        let params = record
            .iter()
            .skip(2)
            .map(|v| parse_number(v, path, line))
            .collect::<DomainResult<Vec<_>>>()?;
        events.push(BasicEventInput {
            name: record[0].to_string(),
            distribution,
            params,
        });
    }
    Ok(events)
}

/// Hazard file: `IM, FREQUENCY` per line.
pub fn parse_hazard(content: &str, path: &Path) -> DomainResult<HazardCurve> {
    let mut points = Vec::new();
    for (line, record) in records(content, path)? {
        if record.len() != 2 {
            return Err(DomainError::InvalidInput(format!(
                "{}:{}: hazard curve rows need exactly two columns, got {}",
                path.display(),
                line,
                record.len()
            )));
        }
        points.push((
            parse_number(&record[0], path, line)?,
            parse_number(&record[1], path, line)?,
        ));
    }
    HazardCurve::new(points)
}
