//! statsd text protocol parsing.
//!
//! A packet holds newline separated lines of the form
//! `name:value|type[|@rate]`; one name may carry several `value|type`
//! groups separated by `:`.

use crate::error::IngestError;

/// One observation decoded from a statsd line
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    /// Increment, already divided by its sample rate
    Counter(f64),
    /// `delta` is set for `+N`/`-N` values
    Gauge { value: f64, delta: bool },
    Timer(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub key: String,
    pub sample: Sample,
}

/// Make a metric name safe for use inside derived stat names: whitespace
/// runs become `_`, `/` becomes `-`, anything outside `[A-Za-z0-9_.-]` is
/// dropped.
pub fn sanitize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut in_space = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_space {
                key.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        match c {
            '/' => key.push('-'),
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') => key.push(c),
            _ => {}
        }
    }
    key
}

/// Parse every non-empty line of a packet.
pub fn parse_packet(packet: &str) -> impl Iterator<Item = Result<Vec<Metric>, IngestError>> + '_ {
    packet
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_line)
}

pub fn parse_line(line: &str) -> Result<Vec<Metric>, IngestError> {
    let malformed = |reason| IngestError::Malformed {
        line: line.to_string(),
        reason,
    };

    let mut groups = line.split(':');
    let key = sanitize_key(groups.next().unwrap_or_default());
    if key.is_empty() {
        return Err(malformed("empty metric name"));
    }

    let mut metrics = Vec::new();
    for group in groups {
        let fields: Vec<&str> = group.split('|').collect();
        if fields.len() < 2 {
            return Err(malformed("missing metric type"));
        }
        let raw_value = fields[0].trim();
        let value: f64 = raw_value
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| IngestError::InvalidValue {
                line: line.to_string(),
                value: raw_value.to_string(),
            })?;

        let sample = match fields[1].trim() {
            "c" => {
                let rate = match fields.get(2) {
                    Some(field) => parse_sample_rate(field).ok_or_else(|| malformed("bad sample rate"))?,
                    None => 1.0,
                };
                Sample::Counter(value / rate)
            }
            "g" => Sample::Gauge {
                value,
                delta: raw_value.starts_with(['+', '-']),
            },
            "ms" | "h" => Sample::Timer(value),
            other => {
                return Err(IngestError::Unsupported {
                    kind: other.to_string(),
                })
            }
        };
        metrics.push(Metric {
            key: key.clone(),
            sample,
        });
    }

    if metrics.is_empty() {
        return Err(malformed("no value"));
    }
    Ok(metrics)
}

fn parse_sample_rate(field: &str) -> Option<f64> {
    let rate: f64 = field.trim().strip_prefix('@')?.parse().ok()?;
    (rate > 0.0 && rate <= 1.0).then_some(rate)
}
