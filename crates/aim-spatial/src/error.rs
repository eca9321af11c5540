use aim_core::EntityId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("belt '{0}' needs at least two points")]
    ShortPolyline(String),

    #[error("entity '{0}' has zero length")]
    ZeroLength(String),

    #[error("entity '{0}' must have positive speed")]
    ZeroSpeed(String),

    #[error("entity {0} is not part of this graph")]
    UnknownEntity(EntityId),

    #[error("no route from {from} to {to}")]
    NoRoute { from: EntityId, to: EntityId },
}

pub type SpatialResult<T> = Result<T, SpatialError>;
