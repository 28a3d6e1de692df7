//! Sorted IPv4 range index mapping addresses to autonomous systems
//!
//! Built once from a header-less `start,end,org` source where `org` reads
//! `AS<number> <name>`. Entries are ordered by the numeric value of their
//! start address and never change after construction, so lookups from many
//! tasks need no locking.

use std::io::Read;
use std::net::Ipv4Addr;
use tracing::{debug, warn};

use crate::CoreError;

/// Autonomous system owning a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsOrg {
    /// AS number, when the org string carried a numeric `AS` prefix
    pub number: Option<u32>,
    /// Organization name (may be empty)
    pub name: String,
}

impl AsOrg {
    /// Decode `"AS15169 Google LLC"` into number and name
    pub fn parse(org: &str) -> Self {
        let (head, name) = match org.split_once(' ') {
            Some((head, name)) => (head, name),
            None => (org, ""),
        };
        Self {
            number: head.replace("AS", "").parse().ok(),
            name: name.to_string(),
        }
    }
}

/// One contiguous, inclusive address range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEntry {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub org: AsOrg,
}

impl RangeEntry {
    pub fn new(start: Ipv4Addr, end: Ipv4Addr, org: &str) -> Self {
        Self {
            start,
            end,
            org: AsOrg::parse(org),
        }
    }

    fn contains(&self, addr: Ipv4Addr) -> bool {
        self.start <= addr && addr <= self.end
    }
}

/// Read-only index of ranges sorted ascending by start address
///
/// Entries are assumed not to overlap; this is not verified.
#[derive(Debug, Clone, Default)]
pub struct RangeIndex {
    entries: Vec<RangeEntry>,
}

impl RangeIndex {
    pub fn from_entries(mut entries: Vec<RangeEntry>) -> Self {
        entries.sort_by_key(|entry| u32::from(entry.start));
        Self { entries }
    }

    /// Parse a range source
    ///
    /// Start and end may be decimal integers or dotted quads, and `org` may
    /// be quoted. Bytes that are not valid UTF-8 become U+FFFD. Rows that
    /// cannot be parsed are skipped.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, CoreError> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;

        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for (lineno, line) in raw.split(|b| *b == b'\n').enumerate() {
            let line = String::from_utf8_lossy(line);
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match parse_row(line) {
                Some(entry) => entries.push(entry),
                None => {
                    skipped += 1;
                    debug!("Skipping range row {}: {:?}", lineno + 1, line);
                }
            }
        }

        if skipped > 0 {
            warn!("Skipped {} unparsable range rows", skipped);
        }
        debug!("Loaded {} address ranges", entries.len());
        Ok(Self::from_entries(entries))
    }

    /// Find the organization owning `addr`
    ///
    /// Picks the entry with the greatest start not above `addr`, then checks
    /// that `addr` does not fall past its end (a gap between ranges).
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<&AsOrg> {
        let idx = self.entries.partition_point(|entry| entry.start <= addr);
        if idx == 0 {
            return None;
        }
        let entry = &self.entries[idx - 1];
        entry.contains(addr).then_some(&entry.org)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_row(line: &str) -> Option<RangeEntry> {
    let fields = split_csv_row(line);
    if fields.len() < 3 {
        return None;
    }
    let start = parse_addr(&fields[0])?;
    let end = parse_addr(&fields[1])?;
    if end < start {
        return None;
    }
    Some(RangeEntry::new(start, end, fields[2].trim()))
}

fn parse_addr(field: &str) -> Option<Ipv4Addr> {
    let field = field.trim();
    field
        .parse::<u32>()
        .map(Ipv4Addr::from)
        .or_else(|_| field.parse::<Ipv4Addr>())
        .ok()
}

/// Split one CSV row, honouring double quotes and `""` escapes
fn split_csv_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn sample_index() -> RangeIndex {
        RangeIndex::from_entries(vec![
            RangeEntry::new(ip("8.0.0.0"), ip("8.0.0.255"), "AS200 Bar"),
            RangeEntry::new(ip("1.0.0.0"), ip("1.0.0.255"), "AS100 Foo"),
        ])
    }

    #[test]
    fn test_lookup_hit() {
        let index = sample_index();
        let org = index.lookup(ip("1.0.0.5")).unwrap();
        assert_eq!(org.number, Some(100));
        assert_eq!(org.name, "Foo");
    }

    #[test]
    fn test_lookup_gap_and_edges() {
        let index = sample_index();
        assert!(index.lookup(ip("5.5.5.5")).is_none());
        assert!(index.lookup(ip("0.255.255.255")).is_none());
        assert!(index.lookup(ip("9.0.0.0")).is_none());
        assert_eq!(index.lookup(ip("8.0.0.255")).unwrap().number, Some(200));
        assert_eq!(index.lookup(ip("8.0.0.0")).unwrap().name, "Bar");
    }

    #[test]
    fn test_numeric_ordering() {
        // "9.0.0.0" sorts after "10.0.0.0" as a string but before it numerically
        let index = RangeIndex::from_entries(vec![
            RangeEntry::new(ip("10.0.0.0"), ip("10.0.0.255"), "AS10 Ten"),
            RangeEntry::new(ip("9.0.0.0"), ip("9.0.0.255"), "AS9 Nine"),
        ]);
        assert_eq!(index.lookup(ip("9.0.0.1")).unwrap().number, Some(9));
        assert_eq!(index.lookup(ip("10.0.0.1")).unwrap().number, Some(10));
    }

    #[test]
    fn test_from_reader_mixed_formats() {
        let source = b"16777216,16777471,\"AS15169 Google, Inc.\"\n\
8.8.8.0,8.8.8.255,AS15169 Google LLC\r\n\
\n\
not,a,row\n\
16777472,16778239,AS1 Caf\xe9\n";

        let index = RangeIndex::from_reader(&source[..]).unwrap();
        assert_eq!(index.len(), 3);

        let org = index.lookup(ip("1.0.0.1")).unwrap();
        assert_eq!(org.number, Some(15169));
        assert_eq!(org.name, "Google, Inc.");

        let org = index.lookup(ip("1.0.1.1")).unwrap();
        assert_eq!(org.name, "Caf\u{FFFD}");

        assert_eq!(index.lookup(ip("8.8.8.8")).unwrap().name, "Google LLC");
    }

    #[test]
    fn test_org_without_number() {
        let org = AsOrg::parse("Unknown");
        assert_eq!(org.number, None);
        assert_eq!(org.name, "");
    }
}
