use std::future::Future;

use tokio::sync::oneshot;

use crate::{
	Capabilities, CodecParams, ConsumeParams, ConsumerId, Direction, DtlsParams, Error, MediaKind, MediaTrack,
	ProducerId, TransportId, TransportParams,
};

/// A list of possible errors from the media transport engine.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum EngineError {
	#[error("engine closed")]
	Closed,

	#[error("engine failure: {0}")]
	Failed(String),
}

/// The connection state of a transport, as reported by the engine.
///
/// Transports start in `Connecting` and reach `Connected` after the
/// ICE/DTLS handshake. `Failed` and `Closed` are terminal and session-fatal
/// for that direction; the session surfaces an error but does not unwind
/// resources on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
	Connecting,
	Connected,
	Failed,
	Closed,
}

impl TransportState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Failed | Self::Closed)
	}
}

/// A single-use completion handle for an engine intent.
///
/// The engine hands one of these out with each intent and suspends until it
/// is answered. Exactly one of [resolve](Self::resolve) or
/// [reject](Self::reject) must be invoked; both consume the handle, so
/// answering twice does not compile. Dropping the handle unanswered is
/// reported to the engine as an abandonment, so "answered never" cannot hang
/// it either.
pub struct Continuation<T> {
	reply: oneshot::Sender<Result<T, Error>>,
}

impl<T> Continuation<T> {
	/// Create a continuation and the receiving half the engine awaits.
	pub fn new() -> (Self, oneshot::Receiver<Result<T, Error>>) {
		let (reply, rx) = oneshot::channel();
		(Self { reply }, rx)
	}

	pub fn resolve(self, value: T) {
		let _ = self.reply.send(Ok(value));
	}

	pub fn reject(self, err: Error) {
		let _ = self.reply.send(Err(err));
	}
}

/// An engine-local event surfaced by a transport.
///
/// Delivered in the order the engine raises them; the session services them
/// from the moment the transport is created, before any media flows.
pub enum TransportEvent {
	/// The engine needs its DTLS parameters exchanged over signaling.
	/// Raised once per transport, on first produce or consume.
	Connect {
		dtls: DtlsParams,
		reply: Continuation<()>,
	},

	/// The engine wants to publish a track. Raised once per produced track,
	/// on send-direction transports only. The reply carries the
	/// server-issued producer id.
	Produce {
		kind: MediaKind,
		codec: CodecParams,
		reply: Continuation<ProducerId>,
	},

	/// The transport's connection state changed.
	State(TransportState),
}

/// The media transport engine: negotiated parameters in, live transport
/// objects out.
pub trait MediaEngine: Send + Sync + 'static {
	type Transport: MediaTransport;

	/// Load the relay router's capabilities into the engine.
	///
	/// Must complete before any transport is created.
	fn load(&self, capabilities: &Capabilities) -> impl Future<Output = Result<(), EngineError>> + Send;

	fn create_transport(
		&self,
		direction: Direction,
		params: TransportParams,
	) -> impl Future<Output = Result<Self::Transport, EngineError>> + Send;
}

/// A negotiated network path owned by the engine, observed by the session.
///
/// Handles are cheap to clone; all clones refer to the same transport.
pub trait MediaTransport: Clone + Send + Sync + 'static {
	type Producer: MediaProducer;
	type Consumer: MediaConsumer;

	fn id(&self) -> TransportId;

	/// Publish a local track. Suspends until the engine's produce intent has
	/// been answered over signaling.
	fn produce(&self, track: MediaTrack) -> impl Future<Output = Result<Self::Producer, EngineError>> + Send;

	/// Subscribe to a remote producer using relay-issued parameters.
	fn consume(&self, params: ConsumeParams) -> impl Future<Output = Result<Self::Consumer, EngineError>> + Send;

	/// The next engine-local event; None once the transport is closed.
	fn event(&self) -> impl Future<Output = Option<TransportEvent>> + Send;

	/// Close the transport and everything riding on it. Idempotent.
	fn close(&self);
}

/// A locally published track, visible to the relay.
pub trait MediaProducer: Clone + Send + Sync + 'static {
	fn id(&self) -> ProducerId;
	fn kind(&self) -> MediaKind;

	fn pause(&self);
	fn resume(&self);
	fn is_paused(&self) -> bool;

	/// Close the producer. Idempotent; terminal.
	fn close(&self);
}

/// A local subscription to a remote producer's track.
pub trait MediaConsumer: Clone + Send + Sync + 'static {
	fn id(&self) -> ConsumerId;
	fn producer_id(&self) -> ProducerId;

	/// The remote track this consumer delivers.
	fn track(&self) -> MediaTrack;

	/// Consumers are created server-paused; resume once bookkeeping is done.
	fn resume(&self);

	/// Close the consumer. Idempotent; terminal.
	fn close(&self);
}
