use std::fmt;

// All identifiers are opaque strings issued by the relay or the directory.
// They only support equality, hashing, and display; nothing parses them.
macro_rules! id {
	($(#[$doc:meta])* $name:ident) => {
		$(#[$doc])*
		#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
		#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
		#[cfg_attr(feature = "serde", serde(transparent))]
		pub struct $name(String);

		impl $name {
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl<T: Into<String>> From<T> for $name {
			fn from(id: T) -> Self {
				Self(id.into())
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				self.0.fmt(f)
			}
		}
	};
}

id!(
	/// A room on the relay, immutable for the life of a session.
	RoomId
);
id!(
	/// A participant as known to the external directory.
	PeerId
);
id!(
	/// The channel-assigned identity of the local participant.
	ParticipantId
);
id!(
	/// A published track, issued by the relay on produce.
	ProducerId
);
id!(
	/// A subscription to a remote producer, issued by the relay on consume.
	ConsumerId
);
id!(
	/// A negotiated network path, issued by the relay on transport creation.
	TransportId
);
id!(
	/// A local or remote media track.
	TrackId
);

/// The best-known identifier for a remote participant.
///
/// Remote tracks are grouped under the directory peer id when signaling
/// reports one, and under the transport-level originator id otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeerKey {
	Peer(PeerId),
	Producer(ProducerId),
}

impl PeerKey {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Peer(peer) => peer.as_str(),
			Self::Producer(producer) => producer.as_str(),
		}
	}

	/// Loose equality against a raw identifier from another id space.
	///
	/// The directory may hand back numeric identifiers where signaling used
	/// strings, so both sides are compared by their string form.
	pub fn matches(&self, raw: &str) -> bool {
		self.as_str() == raw
	}
}

impl fmt::Display for PeerKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.as_str().fmt(f)
	}
}
