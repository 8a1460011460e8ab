use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a block record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockSource {
    Merged,
    Tile,
}

impl BlockSource {
    /// Sort rank: merged mosaics ahead of tile-level detections.
    pub fn rank(self) -> u8 {
        match self {
            BlockSource::Merged => 0,
            BlockSource::Tile => 1,
        }
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            BlockSource::Merged => "merged",
            BlockSource::Tile => "tile",
        }
    }

    /// Loose detection of a "merged" marker in a source tag or id.
    pub fn from_marker(marker: &str) -> Self {
        if marker.to_ascii_lowercase().contains("merged") {
            BlockSource::Merged
        } else {
            BlockSource::Tile
        }
    }
}

impl std::fmt::Display for BlockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id_prefix())
    }
}

/// The three identities a block can be looked up by, in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockKeys {
    pub persistent_id: Option<String>,
    pub block_id: Option<String>,
    pub label: Option<String>,
}

impl BlockKeys {
    pub fn new(persistent_id: Option<String>, block_id: Option<String>, label: Option<String>) -> Self {
        Self { persistent_id, block_id, label }
    }

    pub fn is_empty(&self) -> bool {
        self.persistent_id.is_none() && self.block_id.is_none() && self.label.is_none()
    }
}

/// Parse the timestamp spellings backends emit: RFC 3339, naive ISO-8601
/// (assumed UTC), or a unix epoch in seconds or milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => {
            let raw = n.as_f64()?;
            // Anything past year 2286 in seconds is really milliseconds.
            let millis = if raw.abs() > 1e10 { raw } else { raw * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_marker() {
        assert_eq!(BlockSource::from_marker("Merged-Mosaic"), BlockSource::Merged);
        assert_eq!(BlockSource::from_marker("tile"), BlockSource::Tile);
        assert!(BlockSource::Merged.rank() < BlockSource::Tile.rank());
    }

    #[test]
    fn test_timestamp_spellings() {
        let rfc = parse_timestamp(&json!("2024-05-01T10:00:00Z")).unwrap();
        let naive = parse_timestamp(&json!("2024-05-01T10:00:00.000")).unwrap();
        let secs = parse_timestamp(&json!(1714557600)).unwrap();
        let millis = parse_timestamp(&json!(1714557600000i64)).unwrap();
        assert_eq!(rfc, naive);
        assert_eq!(rfc, secs);
        assert_eq!(rfc, millis);
        assert!(parse_timestamp(&json!("yesterday")).is_none());
    }
}
