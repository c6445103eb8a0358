//! CSV seeding of ports and lanes.
//!
//! Port files need `name,continent,latitude,longitude` (`lat`, `lon` and `lng`
//! are accepted as well). Lane files need
//! `from_name,from_continent,to_name,to_continent,distance_km`. Every row is
//! parsed and validated before anything is written, so a malformed file
//! leaves the registry untouched.

use std::collections::BTreeMap;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::lane::{Lane, NewLane};
use crate::port::{Coordinates, NewPort, PortKey};
use crate::registry::PortRegistry;

/// Outcome of one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

const PORT_COLUMNS: &[(&str, &[&str])] = &[
    ("name", &["name", "port", "port_name"]),
    ("continent", &["continent", "region"]),
    ("latitude", &["latitude", "lat"]),
    ("longitude", &["longitude", "lon", "lng", "long"]),
];

const LANE_COLUMNS: &[(&str, &[&str])] = &[
    ("from_name", &["from_name", "home_port", "origin"]),
    ("from_continent", &["from_continent", "home_port_continent", "origin_continent"]),
    ("to_name", &["to_name", "destination_port", "destination"]),
    ("to_continent", &["to_continent", "destination_port_continent", "destination_continent"]),
    ("distance_km", &["distance_km", "distance", "km"]),
];

/// Header positions for the canonical columns of one file kind.
struct ColumnMap {
    kind: &'static str,
    index: BTreeMap<&'static str, usize>,
}

impl ColumnMap {
    fn from_headers(
        kind: &'static str,
        headers: &StringRecord,
        columns: &[(&'static str, &[&str])],
    ) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(normalize).collect();
        let mut index = BTreeMap::new();
        for (canon, alternatives) in columns {
            let position = alternatives
                .iter()
                .find_map(|alt| normalized.iter().position(|h| h == &normalize(alt)));
            if let Some(position) = position {
                index.insert(*canon, position);
            }
        }

        let missing: Vec<&str> = columns
            .iter()
            .map(|(canon, _)| *canon)
            .filter(|canon| !index.contains_key(canon))
            .collect();
        if !missing.is_empty() {
            return Err(Error::ImportValidation {
                message: format!(
                    "{kind} file missing required columns: {}. Available: {}",
                    missing.join(", "),
                    headers.iter().collect::<Vec<_>>().join(", ")
                ),
            });
        }

        Ok(Self { kind, index })
    }

    fn text(&self, record: &StringRecord, field: &str, row: usize) -> Result<String> {
        let value = self
            .index
            .get(field)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .unwrap_or_default();
        if value.is_empty() {
            return Err(Error::ImportValidation {
                message: format!("missing {field} in {} row {row}", self.kind),
            });
        }
        Ok(value.to_string())
    }

    fn number(&self, record: &StringRecord, field: &str, row: usize) -> Result<f64> {
        let text = self.text(record, field, row)?;
        text.parse::<f64>().map_err(|err| Error::ImportValidation {
            message: format!("invalid {field} '{text}' in {} row {row}: {err}", self.kind),
        })
    }
}

fn normalize(header: &str) -> String {
    header
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn read_rows<R, T>(
    reader: R,
    kind: &'static str,
    columns: &[(&'static str, &[&str])],
    mut parse: impl FnMut(&ColumnMap, &StringRecord, usize) -> Result<T>,
) -> Result<Vec<T>>
where
    R: Read,
{
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|err| Error::ImportValidation {
            message: format!("failed to read {kind} headers: {err}"),
        })?
        .clone();
    let map = ColumnMap::from_headers(kind, &headers, columns)?;

    let mut rows = Vec::new();
    for (offset, result) in csv_reader.records().enumerate() {
        // Header is line 1.
        let row = offset + 2;
        let record = result?;
        rows.push(parse(&map, &record, row)?);
    }
    Ok(rows)
}

/// Register every port in `reader`, skipping (name, continent) pairs that are
/// already registered.
pub fn import_ports<R: Read>(registry: &PortRegistry, reader: R) -> Result<ImportSummary> {
    let ports = read_rows(reader, "ports", PORT_COLUMNS, |map, record, row| {
        let port = NewPort {
            name: map.text(record, "name", row)?,
            continent: map.text(record, "continent", row)?,
            coordinates: Coordinates::new(
                map.number(record, "latitude", row)?,
                map.number(record, "longitude", row)?,
            ),
        };
        port.validate().map_err(|err| Error::ImportValidation {
            message: format!("ports row {row}: {err}"),
        })?;
        Ok(port)
    })?;

    let mut summary = ImportSummary::default();
    for port in ports {
        match registry.register_port(port) {
            Ok(_) => summary.inserted += 1,
            Err(Error::DuplicatePort { name, continent }) => {
                info!(name = %name, continent = %continent, "port already registered; skipping");
                summary.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        "imported ports"
    );
    Ok(summary)
}

/// Register every lane in `reader`.
///
/// Lanes whose endpoints are not registered, and exact repeats of an existing
/// lane, are skipped.
pub fn import_lanes<R: Read>(registry: &PortRegistry, reader: R) -> Result<ImportSummary> {
    let lanes = read_rows(reader, "lanes", LANE_COLUMNS, |map, record, row| {
        let lane = NewLane {
            from: PortKey::new(
                map.text(record, "from_name", row)?,
                map.text(record, "from_continent", row)?,
            ),
            to: PortKey::new(
                map.text(record, "to_name", row)?,
                map.text(record, "to_continent", row)?,
            ),
            distance_km: map.number(record, "distance_km", row)?,
        };
        lane.validate().map_err(|err| Error::ImportValidation {
            message: format!("lanes row {row}: {err}"),
        })?;
        Ok(lane)
    })?;

    let mut existing = registry.list_lanes()?;
    let mut summary = ImportSummary::default();
    for lane in lanes {
        if existing.iter().any(|known| same_lane(known, &lane)) {
            summary.skipped += 1;
            continue;
        }
        match registry.register_lane(lane) {
            Ok(stored) => {
                existing.push(stored);
                summary.inserted += 1;
            }
            Err(Error::PortNotFound { query, .. }) => {
                warn!(port = %query, "lane endpoint not registered; skipping");
                summary.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        "imported lanes"
    );
    Ok(summary)
}

fn same_lane(known: &Lane, candidate: &NewLane) -> bool {
    let endpoints = (known.from == candidate.from && known.to == candidate.to)
        || (known.from == candidate.to && known.to == candidate.from);
    endpoints && known.distance_km == candidate.distance_km
}
