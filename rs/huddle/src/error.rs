use crate::{Direction, EngineError, MediaError, SignalError};

/// A collaborator failure underlying a session error.
///
/// Most join steps talk to both the signaling channel and the media engine,
/// so either can be the source of a given step's failure.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Failure {
	#[error(transparent)]
	Signal(#[from] SignalError),

	#[error(transparent)]
	Engine(#[from] EngineError),
}

/// A list of possible errors that can occur during a session.
///
/// Errors raised during the ordered join sequence abort the join and are
/// recorded as the session-level error; errors during live event handling
/// are logged and swallowed instead.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
	#[error("media acquisition failed")]
	MediaAcquisition(#[source] MediaError),

	#[error("capability load failed")]
	CapabilityLoad(#[source] Failure),

	#[error("transport creation failed")]
	TransportCreation(#[source] Failure),

	#[error("transport connect failed")]
	TransportConnect(#[source] Failure),

	#[error("produce failed")]
	Produce(#[source] Failure),

	#[error("consume failed")]
	Consume(#[source] Failure),

	/// The engine reported a terminal connection state for this direction.
	#[error("{0} transport failed")]
	TransportFailed(Direction),

	/// The signaling channel went away before or during the join.
	#[error("signaling channel unavailable")]
	Disconnected(#[source] SignalError),

	/// The configured join deadline expired at a suspension point.
	#[error("timeout")]
	Timeout,

	/// The session has no live room for this operation.
	#[error("session closed")]
	Closed,
}

pub type Result<T> = std::result::Result<T, Error>;
