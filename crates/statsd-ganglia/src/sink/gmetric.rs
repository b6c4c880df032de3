//! Ganglia 3.1 gmetric wire encoding (XDR).
//!
//! A metric is announced with two datagrams: a full metadata message
//! describing the metric, followed by a string value message.

use api_types::MetricType;
use api_types::SinkRecord;

use crate::error::SendError;

const GMETADATA_FULL: u32 = 128;
const GMETRIC_STRING: u32 = 133;

/// Encoded metadata and value datagrams for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmetricPackets {
    pub metadata: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Default)]
struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn put_bool(&mut self, value: bool) -> &mut Self {
        self.put_u32(u32::from(value))
    }

    fn put_string(&mut self, value: &str) -> &mut Self {
        let bytes = value.as_bytes();
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        let pad = (4 - bytes.len() % 4) % 4;
        self.buf.extend(std::iter::repeat(0u8).take(pad));
        self
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Render a value the way gmond expects for the record's type.
///
/// Integer types are rounded to the nearest whole number, so a `0.9` rate
/// sent as `int32` goes out as `"1"`.
pub fn format_value(value: f64, metric_type: MetricType) -> String {
    if metric_type.is_integer() {
        format!("{}", value.round() as i64)
    } else {
        value.to_string()
    }
}

pub fn encode(record: &SinkRecord) -> Result<GmetricPackets, SendError> {
    if record.name.is_empty() {
        return Err(SendError::Encode {
            reason: "metric name is empty".to_string(),
        });
    }
    if !record.value.is_finite() {
        return Err(SendError::Encode {
            reason: format!("value of {} is not finite", record.name),
        });
    }

    let mut metadata = XdrWriter::default();
    metadata
        .put_u32(GMETADATA_FULL)
        .put_string(&record.hostname)
        .put_string(&record.name)
        .put_bool(record.spoof)
        .put_string(&record.metric_type.to_string())
        .put_string(&record.name)
        .put_string(&record.units)
        .put_u32(record.slope.code())
        .put_u32(record.tmax)
        .put_u32(record.dmax);

    let extra_count = if record.spoof { 2 } else { 1 };
    metadata
        .put_u32(extra_count)
        .put_string("GROUP")
        .put_string(&record.group);
    if record.spoof {
        metadata
            .put_string("SPOOF_HOST")
            .put_string(&record.hostname);
    }

    let mut value = XdrWriter::default();
    value
        .put_u32(GMETRIC_STRING)
        .put_string(&record.hostname)
        .put_string(&record.name)
        .put_bool(record.spoof)
        .put_string("%s")
        .put_string(&format_value(record.value, record.metric_type));

    Ok(GmetricPackets {
        metadata: metadata.finish(),
        value: value.finish(),
    })
}

#[cfg(test)]
mod tests {
    use api_types::MetricDescriptor;
    use similar_asserts::assert_eq;

    use super::*;

    fn record(spoof: bool) -> SinkRecord {
        SinkRecord::new(
            "web01".to_string(),
            spoof,
            MetricDescriptor::with_defaults("hits", "StatsD"),
            12.6,
        )
    }

    /// Pull XDR fields back out for assertions
    struct XdrReader<'a> {
        buf: &'a [u8],
    }

    impl XdrReader<'_> {
        fn u32(&mut self) -> u32 {
            let (head, rest) = self.buf.split_at(4);
            self.buf = rest;
            u32::from_be_bytes(head.try_into().expect("4 bytes"))
        }

        fn string(&mut self) -> String {
            let len = self.u32() as usize;
            let padded = len + (4 - len % 4) % 4;
            let (head, rest) = self.buf.split_at(padded);
            self.buf = rest;
            String::from_utf8(head[..len].to_vec()).expect("utf8")
        }
    }

    #[test]
    fn string_padding() {
        let mut writer = XdrWriter::default();
        writer.put_string("abcde");
        assert_eq!(
            writer.finish(),
            vec![0, 0, 0, 5, b'a', b'b', b'c', b'd', b'e', 0, 0, 0]
        );

        let mut writer = XdrWriter::default();
        writer.put_string("abcd");
        assert_eq!(writer.finish().len(), 8);
    }

    #[test]
    fn metadata_packet_layout() {
        let packets = encode(&record(false)).expect("encodes");
        let mut reader = XdrReader {
            buf: &packets.metadata,
        };

        assert_eq!(reader.u32(), 128);
        assert_eq!(reader.string(), "web01");
        assert_eq!(reader.string(), "hits");
        assert_eq!(reader.u32(), 0);
        assert_eq!(reader.string(), "int32");
        assert_eq!(reader.string(), "hits");
        assert_eq!(reader.string(), "count");
        assert_eq!(reader.u32(), 3);
        assert_eq!(reader.u32(), 0);
        assert_eq!(reader.u32(), 0);
        assert_eq!(reader.u32(), 1);
        assert_eq!(reader.string(), "GROUP");
        assert_eq!(reader.string(), "StatsD");
        assert!(reader.buf.is_empty());
    }

    #[test]
    fn spoofed_metadata_carries_spoof_host() {
        let packets = encode(&record(true)).expect("encodes");
        let mut reader = XdrReader {
            buf: &packets.metadata,
        };

        reader.u32();
        reader.string();
        reader.string();
        assert_eq!(reader.u32(), 1);
        for _ in 0..3 {
            reader.string();
        }
        for _ in 0..3 {
            reader.u32();
        }
        assert_eq!(reader.u32(), 2);
        assert_eq!(reader.string(), "GROUP");
        assert_eq!(reader.string(), "StatsD");
        assert_eq!(reader.string(), "SPOOF_HOST");
        assert_eq!(reader.string(), "web01");
    }

    #[test]
    fn value_packet_layout() {
        let packets = encode(&record(false)).expect("encodes");
        let mut reader = XdrReader {
            buf: &packets.value,
        };

        assert_eq!(reader.u32(), 133);
        assert_eq!(reader.string(), "web01");
        assert_eq!(reader.string(), "hits");
        assert_eq!(reader.u32(), 0);
        assert_eq!(reader.string(), "%s");
        // int32 values are rounded
        assert_eq!(reader.string(), "13");
        assert!(reader.buf.is_empty());
    }

    #[test]
    fn integer_types_round_to_nearest() {
        assert_eq!(format_value(0.9, MetricType::Int32), "1");
        assert_eq!(format_value(2.4, MetricType::Uint16), "2");
        assert_eq!(format_value(-2.6, MetricType::Int32), "-3");
    }

    #[test]
    fn float_values_keep_fraction() {
        assert_eq!(format_value(12.5, MetricType::Double), "12.5");
        assert_eq!(format_value(12.5, MetricType::Uint32), "13");
        assert_eq!(format_value(-0.4, MetricType::Int8), "0");
    }

    #[test]
    fn rejects_non_finite_value() {
        let mut bad = record(false);
        bad.value = f64::NAN;
        assert!(matches!(encode(&bad), Err(SendError::Encode { .. })));
    }
}
