use crate::error::{ChargepolError, Result};
use crate::event::{ChargeEvent, ChargeType, EventSet};

use clap::ValueEnum;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Columns a CSV event file must name in its header
const CSV_COLUMNS: [&str; 6] = ["time", "charge", "zmin", "zwidth", "lon", "lat"];

/// Field order of a chargepol output line
const CHARGEPOL_FIELDS: [&str; 6] = ["charge", "time", "zmin", "zwidth", "lat", "lon"];

/// On-disk layout of an event file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Detect from the first data line
    #[default]
    Auto,
    /// Headered CSV: time, charge, zmin, zwidth, lon, lat
    Csv,
    /// Headerless chargepol output: charge time zmin zwidth lat lon
    Chargepol,
}

/// Raw CSV row; numbers stay text so parse errors can name field and value
#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    charge: String,
    zmin: String,
    zwidth: String,
    lon: String,
    lat: String,
}

impl CsvRow {
    fn into_event(self, line: usize) -> Result<ChargeEvent> {
        Ok(ChargeEvent {
            timestamp: parse_number(&self.time, "time", line)?,
            charge: parse_charge(&self.charge, line)?,
            z_min: parse_number(&self.zmin, "zmin", line)?,
            z_width: parse_number(&self.zwidth, "zwidth", line)?,
            lon: parse_number(&self.lon, "lon", line)?,
            lat: parse_number(&self.lat, "lat", line)?,
        })
    }
}

/// UTF-8 byte order mark, as written by spreadsheet exports
const BOM: char = '\u{feff}';

/// Load an event file, picking the parser from `format`
pub fn load_events<P: AsRef<Path>>(path: P, format: InputFormat) -> Result<EventSet> {
    let path = path.as_ref();
    let format = match format {
        InputFormat::Auto => sniff_format(BufReader::new(File::open(path)?))?,
        other => other,
    };
    debug!("Reading {} as {:?}", path.display(), format);

    let file = File::open(path)?;
    let events = match format {
        InputFormat::Csv => read_csv_events(file)?,
        _ => read_chargepol_events(BufReader::new(file))?,
    };
    info!("Loaded {} charge events from {}", events.len(), path.display());
    Ok(events)
}

/// Guess the format from the first non-blank, non-comment line.
/// A line naming both a `time` and a `zwidth` column is a CSV header.
pub fn sniff_format<R: BufRead>(reader: R) -> Result<InputFormat> {
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_start_matches(BOM).trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let names: Vec<String> = trimmed
            .split(',')
            .map(|f| f.trim().to_ascii_lowercase())
            .collect();
        let is_header = names.iter().any(|n| n == "time") && names.iter().any(|n| n == "zwidth");
        return Ok(if is_header { InputFormat::Csv } else { InputFormat::Chargepol });
    }
    Ok(InputFormat::Chargepol)
}

/// Read a headered CSV event table.
/// Column order is free; extra columns are ignored.
pub fn read_csv_events<R: Read>(reader: R) -> Result<EventSet> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = normalized_headers(&mut rdr)?;

    let mut events = Vec::new();
    for result in rdr.records() {
        let rec = result?;
        if rec.iter().all(|f| f.is_empty()) {
            continue;
        }
        let line = rec.position().map(|p| p.line() as usize).unwrap_or(0);
        let row: CsvRow = rec.deserialize(Some(&headers))?;
        events.push(row.into_event(line)?);
    }

    Ok(EventSet::new(events))
}

/// Lower-cased header row, checked for every required column
fn normalized_headers<R: Read>(rdr: &mut csv::Reader<R>) -> Result<StringRecord> {
    let headers = rdr
        .headers()
        .map_err(|e| ChargepolError::CsvHeader(format!("Failed to read headers: {}", e)))?;
    let normalized: StringRecord = headers
        .iter()
        .map(|h| h.trim_start_matches(BOM).trim().to_ascii_lowercase())
        .collect();

    let missing: Vec<&str> = CSV_COLUMNS
        .iter()
        .copied()
        .filter(|col| !normalized.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(ChargepolError::CsvHeader(format!(
            "Missing column(s): {}",
            missing.join(", ")
        )));
    }

    Ok(normalized)
}

/// Read chargepol output: one event per line, `charge time zmin zwidth lat lon`,
/// separated by commas and/or whitespace. `#` starts a comment line.
pub fn read_chargepol_events<R: BufRead>(reader: R) -> Result<EventSet> {
    let mut events = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let trimmed = line.trim_start_matches(BOM).trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != CHARGEPOL_FIELDS.len() {
            return Err(ChargepolError::FieldCount {
                line: line_no,
                expected: CHARGEPOL_FIELDS.len(),
                got: fields.len(),
            });
        }

        let charge = parse_charge(fields[0], line_no)?;
        let number = |idx: usize| parse_number(fields[idx], CHARGEPOL_FIELDS[idx], line_no);
        events.push(ChargeEvent {
            timestamp: number(1)?,
            charge,
            z_min: number(2)?,
            z_width: number(3)?,
            lat: number(4)?,
            lon: number(5)?,
        });
    }

    Ok(EventSet::new(events))
}

fn parse_charge(value: &str, line: usize) -> Result<ChargeType> {
    value.parse().map_err(|_| ChargepolError::ChargeType {
        line,
        value: value.to_string(),
    })
}

fn parse_number(value: &str, field: &'static str, line: usize) -> Result<f64> {
    value.parse().map_err(|source| ChargepolError::Number {
        line,
        field,
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    const FIXTURE_CSV: &str = "time,charge,zmin,zwidth,lon,lat\n\
        72010.25,pos,6.0,2.5,-95.36,29.76\n\
        72011.50,neg,3.0,1.25,-95.10,29.55\n\
        72013.75,pos,9.5,1.0,-94.80,29.30\n";

    #[test]
    fn test_three_row_fixture() {
        let events = read_csv_events(FIXTURE_CSV.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);

        let parts = events.partition();
        assert_eq!(parts.positive.len(), 2);
        assert_eq!(parts.negative.len(), 1);

        let pos_tops: Vec<f64> = parts.positive.iter().map(|e| e.z_max()).collect();
        assert_eq!(pos_tops, vec![8.5, 10.5]);
        let neg_tops: Vec<f64> = parts.negative.iter().map(|e| e.z_max()).collect();
        assert_eq!(neg_tops, vec![4.25]);
    }

    #[test]
    fn test_csv_columns_any_order_and_case() {
        let data = "LAT, Lon ,ZWidth,zmin,Charge,TIME,station\n\
                    29.7,-95.4,1.5,4.0,-1,100.0,KHGX\n";
        let events = read_csv_events(data.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        let e = events.as_slice()[0];
        assert_eq!(e.charge, ChargeType::Negative);
        assert_eq!(e.lat, 29.7);
        assert_eq!(e.lon, -95.4);
        assert_eq!(e.timestamp, 100.0);
        assert_eq!(e.z_max(), 5.5);
    }

    #[test]
    fn test_csv_skips_blank_lines() {
        let data = "time,charge,zmin,zwidth,lon,lat\n\n1,pos,1,1,-95,29\n\n2,neg,1,1,-95,29\n";
        let events = read_csv_events(data.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_csv_missing_column() {
        let data = "time,charge,zmin,lon,lat\n1,pos,1,-95,29\n";
        match read_csv_events(data.as_bytes()) {
            Err(ChargepolError::CsvHeader(msg)) => assert!(msg.contains("zwidth")),
            other => panic!("expected header error, got {:?}", other),
        }
    }

    #[test]
    fn test_csv_bad_charge() {
        let data = "time,charge,zmin,zwidth,lon,lat\n1,pos,1,1,-95,29\n2,zero,1,1,-95,29\n";
        match read_csv_events(data.as_bytes()) {
            Err(ChargepolError::ChargeType { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "zero");
            }
            other => panic!("expected charge error, got {:?}", other),
        }
    }

    #[test]
    fn test_csv_bad_number() {
        let data = "time,charge,zmin,zwidth,lon,lat\n1,pos,high,1,-95,29\n";
        match read_csv_events(data.as_bytes()) {
            Err(ChargepolError::Number { line, field, value, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(field, "zmin");
                assert_eq!(value, "high");
            }
            other => panic!("expected number error, got {:?}", other),
        }

        let data = "time,charge,zmin,zwidth,lon,lat\n1,pos,1,1,-95,29\n2,neg,1,1,west,29\n";
        let err = read_csv_events(data.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("lon") && msg.contains("west") && msg.contains('3'), "{msg}");
    }

    #[test]
    fn test_bom_csv_detected_and_loaded() {
        let data = "\u{feff}time,charge,zmin,zwidth,lon,lat\n1,pos,6,2,-95,29\n";
        assert_eq!(sniff_format(Cursor::new(data)).unwrap(), InputFormat::Csv);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data.as_bytes()).unwrap();
        let events = load_events(file.path(), InputFormat::Auto).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events.as_slice()[0].timestamp, 1.0);
        assert_eq!(events.as_slice()[0].z_max(), 8.0);
    }

    #[test]
    fn test_bom_chargepol() {
        let data = "\u{feff}pos 1.0 5.0 1.0 29.5 -95.5\n";
        let events = read_chargepol_events(Cursor::new(data)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events.as_slice()[0].charge, ChargeType::Positive);
    }

    #[test]
    fn test_chargepol_lines() {
        let data = "# chargepol output\n\
                    pos 72010.25 6.0 2.5 29.76 -95.36\n\
                    \n\
                    neg, 72011.5, 3.0, 1.25, 29.55, -95.10\n";
        let events = read_chargepol_events(Cursor::new(data)).unwrap();
        assert_eq!(events.len(), 2);

        let first = events.as_slice()[0];
        assert_eq!(first.charge, ChargeType::Positive);
        assert_eq!(first.lat, 29.76);
        assert_eq!(first.lon, -95.36);
        assert_eq!(first.z_max(), 8.5);

        let second = events.as_slice()[1];
        assert_eq!(second.charge, ChargeType::Negative);
        assert_eq!(second.timestamp, 72011.5);
    }

    #[test]
    fn test_chargepol_field_count() {
        let data = "pos 1 2 3 29.0\n";
        match read_chargepol_events(Cursor::new(data)) {
            Err(ChargepolError::FieldCount { line, expected, got }) => {
                assert_eq!((line, expected, got), (1, 6, 5));
            }
            other => panic!("expected field count error, got {:?}", other),
        }
    }

    #[test]
    fn test_chargepol_bad_number_names_field() {
        let data = "# header\nneg 1 2 x 29.0 -95.0\n";
        match read_chargepol_events(Cursor::new(data)) {
            Err(ChargepolError::Number { line, field, value, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(field, "zwidth");
                assert_eq!(value, "x");
            }
            other => panic!("expected number error, got {:?}", other),
        }
    }

    #[test]
    fn test_sniff_format() {
        let csv = "# comment\n\ntime, charge, zmin, zwidth, lon, lat\n";
        assert_eq!(sniff_format(Cursor::new(csv)).unwrap(), InputFormat::Csv);
        let pol = "pos 1 2 3 29.0 -95.0\n";
        assert_eq!(sniff_format(Cursor::new(pol)).unwrap(), InputFormat::Chargepol);
        assert_eq!(sniff_format(Cursor::new("")).unwrap(), InputFormat::Chargepol);
    }

    #[test]
    fn test_load_events_from_disk() {
        let mut csv_file = NamedTempFile::new().unwrap();
        csv_file.write_all(FIXTURE_CSV.as_bytes()).unwrap();
        let events = load_events(csv_file.path(), InputFormat::Auto).unwrap();
        assert_eq!(events.len(), 3);

        let mut pol_file = NamedTempFile::new().unwrap();
        writeln!(pol_file, "pos 1.0 5.0 1.0 29.5 -95.5").unwrap();
        writeln!(pol_file, "neg 2.0 3.0 0.5 29.6 -95.4").unwrap();
        let events = load_events(pol_file.path(), InputFormat::Chargepol).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.z_max() == e.z_min + e.z_width));
    }

    #[test]
    fn test_load_events_missing_file() {
        let result = load_events("/nonexistent/chargepol.txt", InputFormat::Auto);
        assert!(matches!(result, Err(ChargepolError::Io(_))));
    }
}
