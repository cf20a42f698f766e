//! Flatten a [`Pairing`] into CSV rows: one header row, then one row per spot
//! correspondence of every track pair.
//!
//! Supplemental columns append a spot feature, looked up on the left or right
//! spot of each row; a missing feature is written as `NaN`.

use crate::{
    correspondence::SpotPair,
    error::{PairingError, Result},
    pairing::{Pairing, TrackPair},
    types::Side,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;

/// Fixed leading columns of every export.
pub const CSV_HEADER: [&str; 12] = [
    "Track_pair",
    "Track_1_id",
    "Track_2_id",
    "Frame",
    "Spot_1_X",
    "Spot_1_Y",
    "Spot_1_Z",
    "Spot_2_X",
    "Spot_2_Y",
    "Spot_2_Z",
    "Distance",
    "Source_Image",
];

/// An extra column holding a spot feature from one side of each pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplementalColumn {
    pub header: String,
    pub feature_key: String,
    pub side: Side,
}

impl SupplementalColumn {
    pub fn new(header: impl Into<String>, feature_key: impl Into<String>, side: Side) -> Self {
        Self {
            header: header.into(),
            feature_key: feature_key.into(),
            side,
        }
    }

    fn value(&self, pair: &SpotPair<'_>) -> String {
        let spot = match self.side {
            Side::Left => pair.s1,
            Side::Right => pair.s2,
        };
        decimal(spot.feature(&self.feature_key).unwrap_or(f64::NAN))
    }
}

/// Parses `HEADER:FEATURE_KEY:SIDE`, where side is `1`, `2`, `left` or `right`.
impl FromStr for SupplementalColumn {
    type Err = PairingError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PairingError::InvalidColumn(s.to_string());
        let mut parts = s.split(':');
        let (Some(header), Some(key), Some(side), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if header.is_empty() || key.is_empty() {
            return Err(invalid());
        }
        let side = match side.to_ascii_lowercase().as_str() {
            "1" | "left" => Side::Left,
            "2" | "right" => Side::Right,
            _ => return Err(invalid()),
        };
        Ok(Self::new(header, key, side))
    }
}

/// Real values always carry a decimal point (`7.0`, not `7`).
fn decimal(value: f64) -> String {
    format!("{value:?}")
}

pub fn csv_header(columns: &[SupplementalColumn]) -> Vec<String> {
    CSV_HEADER
        .iter()
        .map(|h| h.to_string())
        .chain(columns.iter().map(|c| c.header.clone()))
        .collect()
}

fn csv_row(
    track_pair: &TrackPair<'_>,
    pair: &SpotPair<'_>,
    source_image: &str,
    columns: &[SupplementalColumn],
) -> Vec<String> {
    let (p1, p2) = (&pair.s1.position, &pair.s2.position);
    let mut row = vec![
        track_pair.name(),
        track_pair.id1.to_string(),
        track_pair.id2.to_string(),
        pair.frame().to_string(),
        decimal(p1.x),
        decimal(p1.y),
        decimal(p1.z),
        decimal(p2.x),
        decimal(p2.y),
        decimal(p2.z),
        decimal(pair.distance()),
        source_image.to_string(),
    ];
    row.extend(columns.iter().map(|c| c.value(pair)));
    row
}

/// Data rows, in pair order then frame order. The header is not included.
pub fn csv_rows(pairing: &Pairing<'_>, columns: &[SupplementalColumn]) -> Vec<Vec<String>> {
    let source = pairing.source_image_path().unwrap_or_default();
    pairing
        .pairs()
        .iter()
        .flat_map(|tp| tp.paired().iter().map(move |p| csv_row(tp, p, source, columns)))
        .collect()
}

/// Write header and rows to `writer`. Returns the number of data rows.
pub fn write_csv<W: Write>(
    pairing: &Pairing<'_>,
    columns: &[SupplementalColumn],
    writer: W,
) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(csv_header(columns))?;
    let rows = csv_rows(pairing, columns);
    for row in &rows {
        wtr.write_record(row)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(rows.len())
}
