use std::collections::HashMap;

use crate::{MediaTrack, PeerKey, ProducerId};

/// One remote participant's tracks, merged into a single playable stream.
#[derive(Clone, Debug, Default)]
pub struct PeerStream {
	// Tracks keyed by the producer that emitted them.
	tracks: Vec<(ProducerId, MediaTrack)>,
}

impl PeerStream {
	pub fn tracks(&self) -> impl Iterator<Item = &MediaTrack> {
		self.tracks.iter().map(|(_, track)| track)
	}

	pub fn len(&self) -> usize {
		self.tracks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tracks.is_empty()
	}

	fn insert(&mut self, producer: ProducerId, track: MediaTrack) -> bool {
		if self.tracks.iter().any(|(existing, _)| *existing == producer) {
			return false;
		}

		self.tracks.push((producer, track));
		true
	}

	fn stop(&self) {
		for (_, track) in &self.tracks {
			track.stop();
		}
	}
}

/// Aggregates inbound tracks per remote participant.
///
/// The registry is the sole owner of aggregated remote streams; consumers of
/// [snapshot](Self::snapshot) only ever read copies.
#[derive(Debug, Default)]
pub struct StreamRegistry {
	entries: HashMap<PeerKey, PeerStream>,
}

impl StreamRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a consumed track under the given peer key.
	///
	/// Creates the aggregate entry if absent. A track already present for its
	/// producer id is not re-added, which is what makes a join tail racing a
	/// live new-producer event safe. Returns the updated snapshot.
	pub fn add_track(&mut self, key: PeerKey, producer: ProducerId, track: MediaTrack) -> HashMap<PeerKey, PeerStream> {
		let entry = self.entries.entry(key.clone()).or_default();
		if entry.insert(producer.clone(), track) {
			tracing::trace!(peer = %key, %producer, "track aggregated");
		}

		self.snapshot()
	}

	/// Stop every track in the entry's stream and delete the entry.
	///
	/// Returns false if the key was unknown; that is not an error.
	pub fn remove(&mut self, key: &PeerKey) -> bool {
		match self.entries.remove(key) {
			Some(stream) => {
				stream.stop();
				true
			}
			None => false,
		}
	}

	pub fn contains(&self, key: &PeerKey) -> bool {
		self.entries.contains_key(key)
	}

	pub fn keys(&self) -> impl Iterator<Item = &PeerKey> {
		self.entries.keys()
	}

	/// An immutable copy, safe to read while the registry keeps mutating.
	pub fn snapshot(&self) -> HashMap<PeerKey, PeerStream> {
		self.entries.clone()
	}

	/// Stop every aggregated track and drop all entries.
	pub fn clear(&mut self) {
		for stream in self.entries.values() {
			stream.stop();
		}

		self.entries.clear();
	}
}

#[cfg(test)]
impl StreamRegistry {
	pub fn assert_len(&self, key: &PeerKey, len: usize) {
		assert_eq!(self.entries.get(key).map(PeerStream::len).unwrap_or(0), len);
	}

	pub fn assert_missing(&self, key: &PeerKey) {
		assert!(!self.contains(key), "entry should be absent");
	}
}
