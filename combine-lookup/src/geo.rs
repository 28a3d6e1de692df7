//! GeoIP country lookup

use maxminddb::{geoip2, MaxMindDBError, Reader};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use crate::LookupError;

/// Country lookup for IPv4 addresses
pub trait GeoLookup: Send + Sync {
    /// ISO country code, or `None` when the database has no answer
    fn country_of(&self, addr: Ipv4Addr) -> Result<Option<String>, LookupError>;
}

/// Country database in MaxMind DB format, held in memory
pub struct MmdbCountry {
    reader: Reader<Vec<u8>>,
}

impl MmdbCountry {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let path = path.as_ref();
        let reader = Reader::open_readfile(path)
            .map_err(|e| LookupError::Geo(format!("{}: {}", path.display(), e)))?;
        Ok(Self { reader })
    }
}

impl GeoLookup for MmdbCountry {
    fn country_of(&self, addr: Ipv4Addr) -> Result<Option<String>, LookupError> {
        match self.reader.lookup::<geoip2::Country>(IpAddr::V4(addr)) {
            Ok(record) => Ok(record
                .country
                .and_then(|country| country.iso_code)
                .map(str::to_string)),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(LookupError::Geo(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_missing_database() {
        let result = MmdbCountry::open("/nonexistent/GeoLite2-Country.mmdb");
        assert!(matches!(result, Err(LookupError::Geo(_))));
    }

    #[test]
    fn test_open_garbage_database() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not an mmdb file").unwrap();
        assert!(MmdbCountry::open(file.path()).is_err());
    }
}
