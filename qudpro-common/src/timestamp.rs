//! RFC 3339 (de)serialization for [`UtcDateTime`], for use with
//! `#[serde(with = "qudpro_common::timestamp")]`.

use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcDateTime, UtcOffset,
    format_description::well_known::Rfc3339,
};

pub fn serialize<S>(value: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = PrimitiveDateTime::new(value.date(), value.time())
        .assume_utc()
        .format(&Rfc3339)
        .map_err(S::Error::custom)?;

    serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<UtcDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let parsed = OffsetDateTime::parse(&raw, &Rfc3339)
        .map_err(D::Error::custom)?
        .to_offset(UtcOffset::UTC);

    Ok(UtcDateTime::new(parsed.date(), parsed.time()))
}
