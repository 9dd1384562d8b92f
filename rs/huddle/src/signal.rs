use std::{fmt, future::Future};

use crate::{ConsumerId, MediaKind, ParticipantId, PeerId, ProducerId, RoomId, TransportId};

/// Which way media flows over a transport, from the client's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
	Send,
	Recv,
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Send => "send".fmt(f),
			Self::Recv => "recv".fmt(f),
		}
	}
}

/// ICE credentials negotiated for a transport.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IceParams {
	pub username_fragment: String,
	pub password: String,
}

/// A candidate network path offered by the relay.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IceCandidate {
	pub address: String,
	pub port: u16,
	pub protocol: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DtlsRole {
	#[default]
	Auto,
	Client,
	Server,
}

/// DTLS parameters exchanged during the transport handshake.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DtlsParams {
	pub role: DtlsRole,
	pub fingerprint: String,
}

/// Everything the media engine needs to instantiate a transport.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransportParams {
	pub id: TransportId,
	pub ice: IceParams,
	pub candidates: Vec<IceCandidate>,
	pub dtls: DtlsParams,
}

/// A codec the relay's router supports or selected.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodecParams {
	pub mime_type: String,
	pub clock_rate: u32,
	pub channels: Option<u8>,
}

/// The negotiated media capability snapshot, fetched once per session.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capabilities {
	pub codecs: Vec<CodecParams>,
}

/// The parameters needed to instantiate a consumer on the receive transport.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumeParams {
	pub id: ConsumerId,
	pub producer: ProducerId,
	pub kind: MediaKind,
	pub codec: CodecParams,
}

/// A producer currently live in the room, as reported by the relay.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemoteProducer {
	pub id: ProducerId,
	/// The directory peer id, when signaling knows it.
	pub peer: Option<PeerId>,
}

/// A produce request forwarded to the relay on behalf of the engine.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProduceRequest {
	pub transport: TransportId,
	pub kind: MediaKind,
	pub codec: CodecParams,
	pub room: RoomId,
	pub participant: ParticipantId,
}

/// One row of the external participant directory.
///
/// Maps a transport-level originator id to a directory id. Both sides are raw
/// strings; the directory is not required to agree with signaling about id
/// types, which is why hangup reconciliation compares loosely.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectoryEntry {
	pub origin: String,
	pub peer: String,
}

/// An event pushed by the relay's control plane.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalEvent {
	/// A remote participant published a new track.
	NewProducer {
		producer: ProducerId,
		peer: Option<PeerId>,
	},
	/// A remote participant left the room.
	Hangup { peer: PeerId },
	/// The relay tore the room down.
	RoomClosed { room: RoomId },
}

/// A list of possible errors from the signaling channel.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum SignalError {
	#[error("channel closed")]
	Closed,

	#[error("not connected")]
	NotConnected,

	#[error("rejected: {0}")]
	Rejected(String),
}

/// The bidirectional event/RPC connection to the relay's control plane.
///
/// A connection-handle value passed to the session at construction. Handles
/// are cheap to clone and all clones share the underlying connection.
pub trait Signal: Clone + Send + Sync + 'static {
	/// Suspend until the channel is established.
	///
	/// Bounded only by the channel's own connect timeout; the session imposes
	/// none of its own unless configured with a deadline.
	fn connected(&self) -> impl Future<Output = Result<(), SignalError>> + Send;

	/// The channel-assigned identity of the local participant, once connected.
	fn participant_id(&self) -> Option<ParticipantId>;

	/// Fetch the relay router's media capabilities.
	fn capabilities(&self) -> impl Future<Output = Result<Capabilities, SignalError>> + Send;

	/// Ask the relay to allocate a transport in the given direction.
	fn create_transport(&self, direction: Direction) -> impl Future<Output = Result<TransportParams, SignalError>> + Send;

	/// Forward the engine's DTLS parameters to complete the transport handshake.
	fn connect_transport(
		&self,
		transport: &TransportId,
		dtls: DtlsParams,
	) -> impl Future<Output = Result<(), SignalError>> + Send;

	/// Publish a track; returns the server-issued producer id.
	fn produce(&self, request: ProduceRequest) -> impl Future<Output = Result<ProducerId, SignalError>> + Send;

	/// Request consumer parameters for a remote producer.
	fn consume(
		&self,
		transport: &TransportId,
		producer: &ProducerId,
		capabilities: &Capabilities,
	) -> impl Future<Output = Result<ConsumeParams, SignalError>> + Send;

	/// List the producers currently live in the room.
	fn list_producers(
		&self,
		room: &RoomId,
		exclude: Option<&ParticipantId>,
	) -> impl Future<Output = Result<Vec<RemoteProducer>, SignalError>> + Send;

	/// A snapshot of the external participant directory.
	fn directory(&self) -> Vec<DirectoryEntry>;

	/// The next pushed event; None once the channel closes.
	fn event(&self) -> impl Future<Output = Option<SignalEvent>> + Send;

	/// Announce room membership; unlocks delivery of [SignalEvent::NewProducer].
	fn join_room(&self, room: &RoomId);

	/// Announce room departure.
	fn leave_room(&self);
}
