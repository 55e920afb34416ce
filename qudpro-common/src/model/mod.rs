pub mod comment;
pub mod post;

use crate::{
    model::comment::InvalidCommentTextError,
    snowflake::{Epoch, ProcessId, Snowflake, SnowflakeGenerator, WorkerId},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData, num::TryFromIntError};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    CommentText(#[from] InvalidCommentTextError),
    #[error("Like count was out of range: {0}")]
    LikeCount(#[from] TryFromIntError),
    #[error("Unknown post origin: {0}")]
    PostOrigin(String),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct QudproEpoch;
impl Epoch for QudproEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type QudproSnowflake = Snowflake<QudproEpoch>;
pub type QudproSnowflakeGenerator = SnowflakeGenerator<QudproEpoch>;

/// The id generators one worker runs side by side. Each one stamps its own
/// process id into the snowflakes it issues.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
#[repr(u8)]
pub enum IdIssuer {
    /// Posts created in the persisted store.
    PersistedStore = 0,
    /// Posts injected into the feed by the scheduler.
    FeedInjection = 1,
    /// Generated posts mixed into a load.
    SyntheticSource = 2,
}

impl IdIssuer {
    #[must_use]
    pub fn process_id(self) -> ProcessId {
        ProcessId::new(self as u8).unwrap_or_default()
    }

    #[must_use]
    pub fn generator(self, worker_id: WorkerId) -> QudproSnowflakeGenerator {
        QudproSnowflakeGenerator::new(worker_id, self.process_id())
    }
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(QudproSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: QudproSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> QudproSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<QudproSnowflake> for Id<Marker> {
    fn from(value: QudproSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(QudproSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
