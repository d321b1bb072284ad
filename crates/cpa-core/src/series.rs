// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpaError;

/// One observation of an ingested series.
///
/// `index` is the sequential position assigned at ingestion (0, 1, 2, ...),
/// not whatever index column the raw input carried.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub index: usize,
    pub value: f64,
    pub timestamp: Option<String>,
}

/// Immutable, validated series of observations.
///
/// Invariants held after construction: length >= 1, indices sequential from
/// 0, every value finite. The values are kept in a dense buffer alongside
/// the points so detectors can borrow `&[f64]` without copying.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    points: Vec<Point>,
    values: Vec<f64>,
}

impl Series {
    fn from_points(points: Vec<Point>) -> Result<Self, CpaError> {
        if points.is_empty() {
            return Err(CpaError::EmptyInput);
        }
        let values = points.iter().map(|p| p.value).collect();
        Ok(Self { points, values })
    }

    /// Builds a series from bare values with implicit sequential indices.
    pub fn from_values(values: &[f64]) -> Result<Self, CpaError> {
        for (index, value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(CpaError::invalid_input(format!(
                    "non-finite value at position {index}: {value}"
                )));
            }
        }
        Self::from_points(
            values
                .iter()
                .enumerate()
                .map(|(index, &value)| Point {
                    index,
                    value,
                    timestamp: None,
                })
                .collect(),
        )
    }

    /// Builds a series from stored `[x, y]` pairs.
    ///
    /// The x coordinate is discarded in favor of sequential indices; only y
    /// becomes the value.
    pub fn from_xy_pairs(pairs: &[(f64, f64)]) -> Result<Self, CpaError> {
        for (position, (x, y)) in pairs.iter().enumerate() {
            if !y.is_finite() {
                return Err(CpaError::invalid_input(format!(
                    "non-finite y value at position {position}: (x={x}, y={y})"
                )));
            }
        }
        Self::from_points(
            pairs
                .iter()
                .enumerate()
                .map(|(index, &(_, y))| Point {
                    index,
                    value: y,
                    timestamp: None,
                })
                .collect(),
        )
    }

    /// Parses delimited text with 2-3 comma-separated columns per line.
    ///
    /// A header row is detected by checking whether the first field of the
    /// first line parses as a number; if not, that line is skipped. A data
    /// line contributes a point only when its first two fields both parse as
    /// finite numbers; other lines are skipped without aborting the scan.
    /// The raw first column is discarded, the second becomes the value, and
    /// a non-empty third column becomes the timestamp.
    pub fn parse_delimited(raw: &str) -> Result<Self, CpaError> {
        let mut lines = raw.lines();
        let mut points = Vec::new();

        let first_line = lines.next();
        if let Some(line) = first_line {
            if !line_has_numeric_lead(line) {
                // header row; consumed
            } else if let Some(point) = parse_line(line, points.len()) {
                points.push(point);
            }
        }

        for line in lines {
            if let Some(point) = parse_line(line, points.len()) {
                points.push(point);
            }
        }

        Self::from_points(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: a series holds at least one point by construction.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }
}

fn line_has_numeric_lead(line: &str) -> bool {
    line.split(',')
        .next()
        .map(str::trim)
        .is_some_and(|field| field.parse::<f64>().is_ok())
}

fn parse_line(line: &str, next_index: usize) -> Option<Point> {
    let mut fields = line.split(',');
    let _raw_index: f64 = fields.next()?.trim().parse().ok().filter(|v: &f64| v.is_finite())?;
    let value: f64 = fields.next()?.trim().parse().ok().filter(|v: &f64| v.is_finite())?;
    let timestamp = fields
        .next()
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string);

    Some(Point {
        index: next_index,
        value,
        timestamp,
    })
}
