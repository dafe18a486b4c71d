use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::domain::{Emission, Location, MappedLocation};
use crate::error::VamosError;

pub const LOCATION_COLUMNS: [&str; 3] = ["id", "lat", "lon"];
pub const EMISSION_COLUMNS: [&str; 6] = [
    "id",
    "gesamt_mg_m2",
    "reifen_mg_m2",
    "bremsen_mg_m2",
    "strasse_mg_m2",
    "zw",
];

pub fn parse_dates(body: &[u8]) -> Result<Vec<String>, VamosError> {
    serde_json::from_slice::<Vec<String>>(body)
        .map_err(|err| VamosError::Format(format!("dates: expected a JSON array of strings: {err}")))
}

pub fn read_locations<R: Read>(reader: R, source: &str) -> Result<Vec<Location>, VamosError> {
    read_table(reader, source, &LOCATION_COLUMNS, |row| {
        Ok(Location {
            epid: row.text(0),
            lat: row.real(1)?,
            lng: row.real(2)?,
        })
    })
}

pub fn read_mapped_locations<R: Read>(
    reader: R,
    source: &str,
) -> Result<Vec<MappedLocation>, VamosError> {
    read_table(reader, source, &LOCATION_COLUMNS, |row| {
        Ok(MappedLocation {
            epid: row.text(0),
            lat: row.real(1)?,
            lng: row.real(2)?,
        })
    })
}

pub fn read_emissions<R: Read>(reader: R, source: &str) -> Result<Vec<Emission>, VamosError> {
    read_table(reader, source, &EMISSION_COLUMNS, |row| {
        Ok(Emission {
            epid: row.text(0),
            gesamt: row.real(1)?,
            reifen: row.real(2)?,
            bremsen: row.real(3)?,
            strasse: row.real(4)?,
            zw: row.real(5)?,
        })
    })
}

/// Reads a headed CSV table, projecting `columns` by name. Extra columns are ignored.
fn read_table<R, T, F>(
    reader: R,
    source: &str,
    columns: &[&str],
    mut build: F,
) -> Result<Vec<T>, VamosError>
where
    R: Read,
    F: FnMut(&Row<'_>) -> Result<T, VamosError>,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|err| VamosError::Format(format!("{source}: {err}")))?
        .clone();
    debug!(source, fields = ?headers.iter().collect::<Vec<_>>(), "table header");

    let positions = columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|field| field == *column)
                .ok_or_else(|| {
                    VamosError::Format(format!("{source}: missing required column '{column}'"))
                })
        })
        .collect::<Result<Vec<_>, VamosError>>()?;

    let mut items = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|err| VamosError::Format(format!("{source}: {err}")))?;
        let row = Row {
            source,
            line: index + 2,
            columns,
            positions: &positions,
            record: &record,
        };
        items.push(build(&row)?);
    }
    Ok(items)
}

struct Row<'a> {
    source: &'a str,
    line: usize,
    columns: &'a [&'a str],
    positions: &'a [usize],
    record: &'a StringRecord,
}

impl Row<'_> {
    fn raw(&self, slot: usize) -> &str {
        self.record.get(self.positions[slot]).unwrap_or("")
    }

    fn text(&self, slot: usize) -> String {
        self.raw(slot).to_string()
    }

    fn real(&self, slot: usize) -> Result<f64, VamosError> {
        let raw = self.raw(slot);
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| {
                VamosError::Format(format!(
                    "{}: line {}: column '{}' is not a real number: '{raw}'",
                    self.source, self.line, self.columns[slot]
                ))
            })
    }
}
