//! Single-pass decoding of one dump line into a typed record.
//!
//! The deserializer is a hand-written map visitor: fields arrive in stream
//! order (so a later `updateTime` overrides an earlier `date`), unknown
//! fields are skipped, and no generic document tree is ever built.

use crate::error::CatalogError;
use chrono::{DateTime, NaiveDateTime};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;

/// Classification codes for the `mainStar` field. Unrecognized labels map
/// to 0 ("unknown"), never an error.
const MAIN_STAR_CLASSES: &[(&str, i32)] = &[
    ("O (Blue-White) Star", 1),
    ("B (Blue-White) Star", 2),
    ("B (Blue-White super giant) Star", 3),
    ("A (Blue-White) Star", 4),
    ("A (Blue-White super giant) Star", 5),
    ("F (White) Star", 6),
    ("F (White super giant) Star", 7),
    ("G (White-Yellow) Star", 8),
    ("G (White-Yellow super giant) Star", 9),
    ("K (Yellow-Orange) Star", 10),
    ("K (Yellow-Orange giant) Star", 11),
    ("M (Red dwarf) Star", 12),
    ("M (Red giant) Star", 13),
    ("M (Red super giant) Star", 14),
    ("L (Brown dwarf) Star", 15),
    ("T (Brown dwarf) Star", 16),
    ("Y (Brown dwarf) Star", 17),
    ("T Tauri Star", 18),
    ("Herbig Ae/Be Star", 19),
    ("Wolf-Rayet Star", 20),
    ("Wolf-Rayet N Star", 21),
    ("Wolf-Rayet NC Star", 22),
    ("Wolf-Rayet C Star", 23),
    ("Wolf-Rayet O Star", 24),
    ("CS Star", 25),
    ("C Star", 26),
    ("CN Star", 27),
    ("CJ Star", 28),
    ("CH Star", 29),
    ("CHd Star", 30),
    ("MS-type Star", 31),
    ("S-type Star", 32),
    ("White Dwarf (D) Star", 33),
    ("White Dwarf (DA) Star", 34),
    ("White Dwarf (DAB) Star", 35),
    ("White Dwarf (DAO) Star", 36),
    ("White Dwarf (DAZ) Star", 37),
    ("White Dwarf (DAV) Star", 38),
    ("White Dwarf (DB) Star", 39),
    ("White Dwarf (DBZ) Star", 40),
    ("White Dwarf (DBV) Star", 41),
    ("White Dwarf (DO) Star", 42),
    ("White Dwarf (DOV) Star", 43),
    ("White Dwarf (DQ) Star", 44),
    ("White Dwarf (DC) Star", 45),
    ("White Dwarf (DCV) Star", 46),
    ("White Dwarf (DX) Star", 47),
    ("Neutron Star", 48),
    ("Black Hole", 49),
    ("Supermassive Black Hole", 50),
];

pub fn main_star_info(label: &str) -> i32 {
    MAIN_STAR_CLASSES
        .iter()
        .find(|(name, _)| *name == label)
        .map_or(0, |(_, code)| *code)
}

/// One decoded dump record, coordinates already fixed-point.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpRecord {
    pub address: i64,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub timestamp: Option<NaiveDateTime>,
    pub needs_permit: bool,
    pub info: i32,
}

/// Fixed-point conversion: 1 unit = 1/128 of a position unit,
/// round half away from zero.
fn to_fixed(value: f64) -> i32 {
    (value * 128.0).round() as i32
}

/// Both timestamp fields arrive as ISO-8601 strings, with or without the
/// `T` separator and zone suffix.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCoords {
    x: f64,
    y: f64,
    z: f64,
}

impl<'de> Deserialize<'de> for DumpRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = DumpRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a system dump record object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<DumpRecord, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut address: Option<i64> = None;
                let mut name: Option<String> = None;
                let mut coords: Option<RawCoords> = None;
                let mut timestamp: Option<NaiveDateTime> = None;
                let mut needs_permit = false;
                let mut info = 0;

                while let Some(key) = map.next_key::<&str>()? {
                    match key {
                        "id64" => address = Some(map.next_value()?),
                        "name" => name = Some(map.next_value()?),
                        "coords" => coords = Some(map.next_value()?),
                        "date" | "updateTime" => {
                            let raw: String = map.next_value()?;
                            timestamp = Some(parse_timestamp(&raw).ok_or_else(|| {
                                de::Error::custom(format!("unparseable timestamp {raw:?}"))
                            })?);
                        }
                        "needsPermit" => needs_permit = map.next_value()?,
                        "mainStar" => {
                            let raw: String = map.next_value()?;
                            info = main_star_info(&raw);
                        }
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }

                let address = address.ok_or_else(|| de::Error::missing_field("id64"))?;
                let name = name.ok_or_else(|| de::Error::missing_field("name"))?;
                let coords = coords.ok_or_else(|| de::Error::missing_field("coords"))?;

                Ok(DumpRecord {
                    address,
                    name,
                    x: to_fixed(coords.x),
                    y: to_fixed(coords.y),
                    z: to_fixed(coords.z),
                    timestamp,
                    needs_permit,
                    info,
                })
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Strip frame noise (whitespace and the array-element comma) around the
/// JSON object before parsing.
fn trim_frame(line: &[u8]) -> &[u8] {
    let mut slice = line;
    while let [rest @ .., last] = slice {
        if last.is_ascii_whitespace() || *last == b',' {
            slice = rest;
        } else {
            break;
        }
    }
    while let [first, rest @ ..] = slice {
        if first.is_ascii_whitespace() {
            slice = rest;
        } else {
            break;
        }
    }
    slice
}

pub fn decode_line(line: &[u8]) -> Result<DumpRecord, CatalogError> {
    serde_json::from_slice(trim_frame(line))
        .map_err(|err| CatalogError::MalformedRecord(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{decode_line, main_star_info, to_fixed};

    #[test]
    fn fixed_point_rounds_half_away_from_zero() {
        assert_eq!(to_fixed(12.0039), 1537);
        assert_eq!(to_fixed(-12.0039), -1537);
        assert_eq!(to_fixed(0.00390625), 1); // exactly 0.5 fixed units
        assert_eq!(to_fixed(0.0), 0);
    }

    #[test]
    fn decodes_a_full_record() {
        let line = br#"{"id64":10477373803,"name":"Sol","coords":{"x":0.0,"y":0.0,"z":0.0},"date":"2021-01-01 12:34:56","needsPermit":true,"mainStar":"G (White-Yellow) Star"}"#;
        let rec = decode_line(line).expect("decode");
        assert_eq!(rec.address, 10477373803);
        assert_eq!(rec.name, "Sol");
        assert_eq!((rec.x, rec.y, rec.z), (0, 0, 0));
        assert!(rec.needs_permit);
        assert_eq!(rec.info, 8);
        assert_eq!(
            rec.timestamp.map(|t| t.to_string()),
            Some("2021-01-01 12:34:56".to_string())
        );
    }

    #[test]
    fn later_timestamp_field_wins() {
        let line = br#"{"id64":1,"name":"A 1","coords":{"x":1.0,"y":2.0,"z":3.0},"date":"2020-01-01 00:00:00","updateTime":"2022-06-05 10:00:00"}"#;
        let rec = decode_line(line).expect("decode");
        assert_eq!(
            rec.timestamp.map(|t| t.to_string()),
            Some("2022-06-05 10:00:00".to_string())
        );
    }

    #[test]
    fn tolerates_array_comma_and_unknown_fields() {
        let line = b"  {\"id64\":2,\"name\":\"B 2\",\"coords\":{\"x\":12.0039,\"y\":0.5,\"z\":-1.25},\"population\":12345} ,";
        let rec = decode_line(line).expect("decode");
        assert_eq!((rec.x, rec.y, rec.z), (1537, 64, -160));
        assert!(!rec.needs_permit);
        assert_eq!(rec.timestamp, None);
    }

    #[test]
    fn unknown_main_star_maps_to_zero() {
        assert_eq!(main_star_info("Exotic Anomaly"), 0);
        assert_eq!(main_star_info("Neutron Star"), 48);
    }

    #[test]
    fn wrong_field_type_is_an_error() {
        let line = br#"{"id64":"not a number","name":"X","coords":{"x":0,"y":0,"z":0}}"#;
        assert!(decode_line(line).is_err());
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let line = br#"{"name":"X","coords":{"x":0,"y":0,"z":0}}"#;
        let err = decode_line(line).unwrap_err();
        assert!(err.to_string().contains("id64"));
    }

    #[test]
    fn rfc3339_update_time_parses() {
        let line = br#"{"id64":3,"name":"C 3","coords":{"x":0,"y":0,"z":0},"updateTime":"2023-03-04T05:06:07Z"}"#;
        let rec = decode_line(line).expect("decode");
        assert_eq!(
            rec.timestamp.map(|t| t.to_string()),
            Some("2023-03-04 05:06:07".to_string())
        );
    }
}
