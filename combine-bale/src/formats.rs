//! Output formats
//!
//! JSON for pipeline interchange, quoted CSV for spreadsheets, CEF lines
//! for SIEM ingestion and gzipped CSV trees for tiq-test. Writers return the
//! number of records written.

use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use combine_core::{Direction, EnrichedIndicator, EnrichmentData, Indicator, IndicatorType};

use crate::PublishError;

const REGULAR_HEADER: [&str; 6] = ["entity", "type", "direction", "source", "notes", "date"];

const ENRICHED_HEADER: [&str; 12] = [
    "entity", "type", "direction", "source", "notes", "date", "asnumber", "asname", "country",
    "hostname", "ips", "mx",
];

/// Pretty-printed JSON array, non-ASCII characters written as-is
pub fn write_json<T: Serialize, W: Write>(records: &[T], mut writer: W) -> Result<usize, PublishError> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!("Wrote {} records as JSON", records.len());
    Ok(records.len())
}

/// Regular CSV, every field quoted
pub fn write_regular_csv<W: Write>(records: &[Indicator], mut writer: W) -> Result<usize, PublishError> {
    write_row(&mut writer, &REGULAR_HEADER)?;
    for record in records {
        write_row(&mut writer, &indicator_fields(record))?;
    }
    writer.flush()?;
    info!("Wrote {} records as CSV", records.len());
    Ok(records.len())
}

/// Enriched CSV: the regular columns followed by the enrichment columns
///
/// A and MX answers are joined with `|`. Records with an empty enrichment
/// get empty enrichment columns.
pub fn write_enriched_csv<W: Write>(
    records: &[EnrichedIndicator],
    mut writer: W,
) -> Result<usize, PublishError> {
    write_row(&mut writer, &ENRICHED_HEADER)?;
    for record in records {
        let mut fields = indicator_fields(&record.indicator).to_vec();
        fields.extend(enrichment_fields(&record.enriched));
        write_row(&mut writer, &fields)?;
    }
    writer.flush()?;
    info!("Wrote {} enriched records as CSV", records.len());
    Ok(records.len())
}

/// One CEF line per address, domain or subnet; other types are skipped
pub fn write_cef<W: Write>(records: &[EnrichedIndicator], mut writer: W) -> Result<usize, PublishError> {
    let mut written = 0;
    for record in records {
        match cef_line(record) {
            Some(line) => {
                writeln!(writer, "{}", line)?;
                written += 1;
            }
            None => debug!(
                "No CEF mapping for {}[{}], skipping",
                record.indicator.indicator_type, record.indicator.value
            ),
        }
    }
    writer.flush()?;
    info!("Wrote {} of {} records as CEF", written, records.len());
    Ok(written)
}

/// Records written by [`write_tiq`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TiqReport {
    pub raw_inbound: usize,
    pub raw_outbound: usize,
    pub enriched_inbound: usize,
    pub enriched_outbound: usize,
}

/// Write the day's data into a tiq-test tree
///
/// Layout under `<root>/data`:
/// - `raw/public_{inbound,outbound}/<YYYYMMDD>.csv.gz`: regular CSV
/// - `enriched/public_{inbound,outbound}/<YYYYMMDD>.csv.gz`: enriched CSV,
///   IPv4 only
///
/// Missing directories are created; files of the same day are replaced.
pub fn write_tiq(
    regular: &[Indicator],
    enriched: &[EnrichedIndicator],
    root: &Path,
    date: NaiveDate,
) -> Result<TiqReport, PublishError> {
    let data = root.join("data");
    info!("Preparing tiq directory structure under {}", data.display());
    let file_name = format!("{}.csv.gz", date.format("%Y%m%d"));

    let mut report = TiqReport::default();
    for direction in [Direction::Inbound, Direction::Outbound] {
        let folder = format!("public_{}", direction);

        let raw: Vec<Indicator> = regular
            .iter()
            .filter(|i| i.direction == direction)
            .cloned()
            .collect();
        let path = tiq_path(&data, "raw", &folder, &file_name)?;
        info!("Output regular data as GZip CSV to {}", path.display());
        let written = gzipped(&path, |w| write_regular_csv(&raw, w))?;

        let rich: Vec<EnrichedIndicator> = enriched
            .iter()
            .filter(|e| {
                e.indicator.direction == direction && e.indicator.indicator_type == IndicatorType::Ipv4
            })
            .cloned()
            .collect();
        let path = tiq_path(&data, "enriched", &folder, &file_name)?;
        info!("Output enriched data as GZip CSV to {}", path.display());
        let rich_written = gzipped(&path, |w| write_enriched_csv(&rich, w))?;

        match direction {
            Direction::Inbound => {
                report.raw_inbound = written;
                report.enriched_inbound = rich_written;
            }
            Direction::Outbound => {
                report.raw_outbound = written;
                report.enriched_outbound = rich_written;
            }
        }
    }
    Ok(report)
}

fn tiq_path(data: &Path, kind: &str, folder: &str, file_name: &str) -> Result<PathBuf, PublishError> {
    let dir = data.join(kind).join(folder);
    fs::create_dir_all(&dir)?;
    Ok(dir.join(file_name))
}

fn gzipped<F>(path: &Path, write: F) -> Result<usize, PublishError>
where
    F: FnOnce(&mut GzEncoder<File>) -> Result<usize, PublishError>,
{
    let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
    let written = write(&mut encoder)?;
    encoder.finish()?;
    Ok(written)
}

fn indicator_fields(indicator: &Indicator) -> [String; 6] {
    [
        indicator.value.clone(),
        indicator.indicator_type.to_string(),
        indicator.direction.to_string(),
        indicator.source_name.clone(),
        indicator.note.clone().unwrap_or_default(),
        indicator.date.to_string(),
    ]
}

fn enrichment_fields(data: &EnrichmentData) -> [String; 6] {
    [
        data.as_num.map(|n| n.to_string()).unwrap_or_default(),
        data.as_name.clone().unwrap_or_default(),
        data.country.clone().unwrap_or_default(),
        data.hostname.clone().unwrap_or_default(),
        data.a.join("|"),
        data.mx.join("|"),
    ]
}

fn write_row<W: Write, S: AsRef<str>>(writer: &mut W, fields: &[S]) -> std::io::Result<()> {
    let row = fields
        .iter()
        .map(|field| format!("\"{}\"", field.as_ref().replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",");
    writer.write_all(row.as_bytes())?;
    writer.write_all(b"\r\n")
}

fn cef_line(record: &EnrichedIndicator) -> Option<String> {
    let indicator = &record.indicator;
    let value = cef_escape(&indicator.value);
    let direction = indicator.direction.as_str();
    let msg = cef_escape(&indicator.source_name);

    match &indicator.indicator_type {
        IndicatorType::Ipv4 | IndicatorType::Ipv6 => {
            let [asnumber, asname, country, ..] = enrichment_fields(&record.enriched);
            Some(format!(
                "{}Known Malicious Host|1|src={} direction={} msg={} asnumber={} asname={} country={}",
                CEF_PREFIX,
                value,
                direction,
                msg,
                asnumber,
                cef_escape(&asname),
                country
            ))
        }
        IndicatorType::Fqdn => Some(format!(
            "{}Known Malicious Domain|1|shost={} direction={} msg={}",
            CEF_PREFIX, value, direction, msg
        )),
        IndicatorType::Other(kind) if kind == "Subnet" => Some(format!(
            "{}Known Malicious Subnet|1|shost={} direction={} msg={}",
            CEF_PREFIX, value, direction, msg
        )),
        _ => None,
    }
}

const CEF_PREFIX: &str = "CEF:0|Combine|API|1.0|100|";

// Extension values must not break the key=value framing
fn cef_escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('=', "\\=")
        .replace(['\r', '\n'], " ")
}
