//! Module for working with snowflake IDs.
//!
//! A snowflake packs, from the most significant bit down, 42 bits of
//! milliseconds since an [`Epoch`], a 5 bit worker id, a 5 bit process id and
//! a 12 bit sequence number. Every generator running at the same time needs its
//! own worker and process id pair. See <https://en.wikipedia.org/wiki/Snowflake_ID>

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Debug, Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_OFFSET: u64 = 22;
pub const TIMESTAMP_LENGTH: u64 = 42;
pub const TIMESTAMP_BITMASK: u64 = ((1 << TIMESTAMP_LENGTH) - 1) << TIMESTAMP_OFFSET;

pub const WORKER_ID_OFFSET: u64 = 17;
pub const WORKER_ID_LENGTH: u64 = 5;
pub const WORKER_ID_BITMASK: u64 = ((1 << WORKER_ID_LENGTH) - 1) << WORKER_ID_OFFSET;

pub const PROCESS_ID_OFFSET: u64 = 12;
pub const PROCESS_ID_LENGTH: u64 = 5;
pub const PROCESS_ID_BITMASK: u64 = ((1 << PROCESS_ID_LENGTH) - 1) << PROCESS_ID_OFFSET;

pub const SEQUENCE_OFFSET: u64 = 0;
pub const SEQUENCE_LENGTH: u64 = 12;
pub const SEQUENCE_BITMASK: u64 = ((1 << SEQUENCE_LENGTH) - 1) << SEQUENCE_OFFSET;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimestampFromDateTimeError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Worker id was out of range: {0}")]
pub struct WorkerIdOutOfRangeError(u16);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct WorkerId(u16);

impl WorkerId {
    #[must_use]
    pub fn new(id: u16) -> Option<Self> {
        (u64::from(id) < 1 << WORKER_ID_LENGTH).then_some(Self(id))
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for WorkerId {
    type Error = WorkerIdOutOfRangeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(WorkerIdOutOfRangeError(value))
    }
}

impl<'de> Deserialize<'de> for WorkerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = u16::deserialize(deserializer)?;
        Self::new(inner)
            .ok_or_else(|| Error::invalid_value(Unexpected::Unsigned(inner.into()), &"WorkerId"))
    }
}

/// Tells apart the generators of one worker.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct ProcessId(u8);

impl ProcessId {
    #[must_use]
    pub const fn new(id: u8) -> Option<Self> {
        if id < 1 << PROCESS_ID_LENGTH {
            Some(Self(id))
        } else {
            None
        }
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

/// Milliseconds since `SnowflakeEpoch`, limited to [`TIMESTAMP_LENGTH`] bits.
#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct SnowflakeTimestamp<SnowflakeEpoch>(u64, PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> SnowflakeTimestamp<SnowflakeEpoch> {
    #[must_use]
    pub fn new(millis: u64) -> Option<Self> {
        (millis < 1 << TIMESTAMP_LENGTH).then_some(Self(millis, PhantomData))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Clamps to the representable range instead of failing.
    #[must_use]
    pub fn saturating_from_time(value: UtcDateTime) -> Self
    where
        SnowflakeEpoch: Epoch,
    {
        match Self::try_from(value) {
            Ok(timestamp) => timestamp,
            Err(SnowflakeTimestampFromDateTimeError::TimeBeforeEpoch) => Self(0, PhantomData),
            Err(SnowflakeTimestampFromDateTimeError::TimestampTooLarge) => {
                Self((1 << TIMESTAMP_LENGTH) - 1, PhantomData)
            }
        }
    }
}

impl<SnowflakeEpoch: Epoch> TryFrom<UtcDateTime> for SnowflakeTimestamp<SnowflakeEpoch> {
    type Error = SnowflakeTimestampFromDateTimeError;

    fn try_from(value: UtcDateTime) -> Result<Self, Self::Error> {
        let millis = (value - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
        if millis < 0 {
            return Err(Self::Error::TimeBeforeEpoch);
        }
        let millis_u64 = u64::try_from(millis).map_err(|_| Self::Error::TimestampTooLarge)?;
        Self::new(millis_u64).ok_or(Self::Error::TimestampTooLarge)
    }
}

impl<SnowflakeEpoch: Epoch> From<SnowflakeTimestamp<SnowflakeEpoch>> for UtcDateTime {
    fn from(value: SnowflakeTimestamp<SnowflakeEpoch>) -> Self {
        // Fits: the timestamp has at most 42 bits.
        #[allow(clippy::cast_possible_wrap)]
        let millis = value.0 as i64;
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(millis)
    }
}

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn from_parts(
        timestamp: SnowflakeTimestamp<SnowflakeEpoch>,
        worker_id: WorkerId,
        process_id: ProcessId,
        sequence: u16,
    ) -> Self {
        let snowflake = timestamp.get() << TIMESTAMP_OFFSET
            | u64::from(worker_id.get()) << WORKER_ID_OFFSET
            | u64::from(process_id.get()) << PROCESS_ID_OFFSET
            | (u64::from(sequence) << SEQUENCE_OFFSET) & SEQUENCE_BITMASK;

        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp(self) -> SnowflakeTimestamp<SnowflakeEpoch> {
        SnowflakeTimestamp((self.0 & TIMESTAMP_BITMASK) >> TIMESTAMP_OFFSET, PhantomData)
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        WorkerId(((self.0 & WORKER_ID_BITMASK) >> WORKER_ID_OFFSET) as u16)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        #[allow(clippy::cast_possible_truncation)]
        ProcessId(((self.0 & PROCESS_ID_BITMASK) >> PROCESS_ID_OFFSET) as u8)
    }

    #[must_use]
    pub fn sequence(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let sequence = ((self.0 & SEQUENCE_BITMASK) >> SEQUENCE_OFFSET) as u16;
        sequence
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

/// Issues strictly increasing snowflakes for a single worker and process.
///
/// Two calls within the same millisecond get consecutive sequence numbers.
/// If the sequence is exhausted, or the clock stalls or steps backwards, the
/// generator keeps counting from the last issued snowflake, borrowing from
/// future milliseconds. An id is therefore never issued twice by one
/// generator.
#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    last: Option<Snowflake<SnowflakeEpoch>>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            last: None,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    #[must_use]
    pub fn last_issued(&self) -> Option<Snowflake<SnowflakeEpoch>> {
        self.last
    }

    pub fn generate_at(&mut self, time: UtcDateTime) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        let timestamp = SnowflakeTimestamp::saturating_from_time(time);

        let snowflake = match self.last {
            Some(last) if last.timestamp() >= timestamp => {
                if u64::from(last.sequence()) + 1 < 1 << SEQUENCE_LENGTH {
                    Snowflake::from_parts(
                        last.timestamp(),
                        self.worker_id,
                        self.process_id,
                        last.sequence() + 1,
                    )
                } else {
                    let borrowed = SnowflakeTimestamp::new(last.timestamp().get() + 1)
                        .unwrap_or(last.timestamp());
                    Snowflake::from_parts(borrowed, self.worker_id, self.process_id, 0)
                }
            }
            _ => Snowflake::from_parts(timestamp, self.worker_id, self.process_id, 0),
        };

        self.last = Some(snowflake);
        snowflake
    }

    pub fn generate(&mut self) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}
