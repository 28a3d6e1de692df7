//! Feed plugin interface
//!
//! A feed turns the raw content fetched from one of its URLs into normalized
//! indicators. Each feed is its own type; there is no shared mutable base.

use chrono::NaiveDate;

use crate::{Direction, Indicator, IndicatorType};

/// A source of raw threat indicators
pub trait FeedPlugin: Send + Sync {
    /// Feed name, recorded as `source_name` on every indicator
    fn name(&self) -> &str;

    /// Direction every indicator from this feed is tagged with
    fn direction(&self) -> Direction;

    /// URLs the feed is fetched from
    fn urls(&self) -> &[&'static str];

    /// Parse content fetched from `source` into indicators dated `date`
    fn parse(&self, source: &str, content: &str, date: NaiveDate) -> Vec<Indicator>;
}

/// Tor exit node list published by dan.me.uk
#[derive(Debug, Clone, Copy, Default)]
pub struct DanTorList;

impl DanTorList {
    const URLS: &'static [&'static str] = &["https://www.dan.me.uk/torlist/"];
}

impl FeedPlugin for DanTorList {
    fn name(&self) -> &str {
        "dantorlist"
    }

    fn direction(&self) -> Direction {
        Direction::Outbound
    }

    fn urls(&self) -> &[&'static str] {
        Self::URLS
    }

    fn parse(&self, source: &str, content: &str, date: NaiveDate) -> Vec<Indicator> {
        content
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('/'))
            .filter_map(|line| line.split_whitespace().next())
            .map(|value| {
                Indicator::new(
                    value,
                    IndicatorType::Ipv4,
                    self.direction(),
                    self.name(),
                    source,
                    date,
                )
            })
            .collect()
    }
}

/// All feeds compiled into this build
pub fn builtin_feeds() -> Vec<Box<dyn FeedPlugin>> {
    vec![Box::new(DanTorList)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dantorlist_parse() {
        let feed = DanTorList;
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let content = "# header\n/ comment\n\n1.2.3.4\n5.6.7.8 extra\n";

        let indicators = feed.parse(feed.urls()[0], content, date);
        assert_eq!(indicators.len(), 2);
        assert_eq!(indicators[0].value, "1.2.3.4");
        assert_eq!(indicators[1].value, "5.6.7.8");
        assert!(indicators.iter().all(|i| i.direction == Direction::Outbound));
        assert_eq!(indicators[0].source_name, "dantorlist");
        assert_eq!(indicators[0].source, "https://www.dan.me.uk/torlist/");
        assert_eq!(indicators[0].date, date);
    }

    #[test]
    fn test_builtin_feeds() {
        let feeds = builtin_feeds();
        assert!(feeds.iter().any(|f| f.name() == "dantorlist"));
    }
}
