use regex::Regex;

use super::MetricSet;

/// Pulls the watched `name:value` pairs out of an `INFO` report.
///
/// The pattern is compiled once from the watch list and reused for every
/// cycle.
#[derive(Debug, Clone)]
pub struct InfoParser {
    pattern: Regex,
}

impl InfoParser {
    pub fn new<S: AsRef<str>>(watched: &[S]) -> Result<Self, regex::Error> {
        let names = watched
            .iter()
            .map(|name| regex::escape(name.as_ref()))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            pattern: Regex::new(&format!("(?m)^({names}):([[:alnum:]]+)"))?,
        })
    }

    /// Never fails: values that are not integers are dropped, and watched
    /// fields missing from the report are simply absent. When a field shows
    /// up more than once the last occurrence wins.
    pub fn parse(&self, report: &str) -> MetricSet {
        let mut metrics = MetricSet::new();

        for caps in self.pattern.captures_iter(report) {
            if let Ok(value) = caps[2].parse::<i64>() {
                metrics.insert_int(&caps[1], value);
            }
        }

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "# Server\r\n\
redis_version:3.2.0\r\n\
tcp_port:6379\r\n\
uptime_in_seconds:21536\r\n\
\r\n\
# Clients\r\n\
connected_clients:1\r\n\
\r\n\
# Memory\r\n\
used_memory:7751008\r\n\
used_memory_human:7.39M\r\n\
mem_fragmentation_ratio:1.84\r\n\
\r\n\
# Replication\r\n\
role:master\r\n\
\r\n\
# Stats\r\n\
total_connections_received:6111\r\n\
latest_fork_usec:995\r\n";

    #[test]
    fn extracts_watched_fields() {
        let parser = InfoParser::new(&["used_memory", "connected_clients"]).unwrap();
        let metrics = parser.parse(REPORT);

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics.int("used_memory"), Some(7751008));
        assert_eq!(metrics.int("connected_clients"), Some(1));
    }

    #[test]
    fn unwatched_fields_never_appear() {
        let parser = InfoParser::new(&["connected_clients", "blocked_clients"]).unwrap();
        let metrics = parser.parse(REPORT);

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics.int("connected_clients"), Some(1));
        assert!(!metrics.contains("used_memory"));
        assert!(!metrics.contains("tcp_port"));
    }

    #[test]
    fn prefix_of_another_field_does_not_match_it() {
        // `used_memory` must not pick up `used_memory_human`
        let parser = InfoParser::new(&["used_memory"]).unwrap();
        assert_eq!(parser.parse("used_memory_human:7.39M\n").len(), 0);

        // nor a suffix of a longer name
        let parser = InfoParser::new(&["clients"]).unwrap();
        assert!(parser.parse(REPORT).is_empty());
    }

    #[test]
    fn ratio_keeps_integer_part() {
        let parser = InfoParser::new(&["mem_fragmentation_ratio"]).unwrap();
        assert_eq!(parser.parse(REPORT).int("mem_fragmentation_ratio"), Some(1));
    }

    #[test]
    fn non_integer_values_are_dropped() {
        let parser = InfoParser::new(&["role", "big"]).unwrap();
        let metrics = parser.parse("role:master\nbig:99999999999999999999999\n");
        assert!(metrics.is_empty());
    }

    #[test]
    fn last_occurrence_wins() {
        let parser = InfoParser::new(&["connected_clients"]).unwrap();
        let metrics = parser.parse("connected_clients:1\nconnected_clients:7\n");
        assert_eq!(metrics.int("connected_clients"), Some(7));
    }

    #[test]
    fn names_are_escaped() {
        let parser = InfoParser::new(&["a.b"]).unwrap();
        assert!(parser.parse("axb:1\n").is_empty());
        assert_eq!(parser.parse("a.b:3\n").int("a.b"), Some(3));
    }
}
