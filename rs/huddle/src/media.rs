use std::{
	fmt,
	future::Future,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
};

use crate::TrackId;

/// Whether a track carries audio or video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaKind {
	Audio,
	Video,
}

impl fmt::Display for MediaKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Audio => "audio".fmt(f),
			Self::Video => "video".fmt(f),
		}
	}
}

/// Which kinds of local media to acquire.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Constraints {
	pub audio: bool,
	pub video: bool,
}

impl Default for Constraints {
	fn default() -> Self {
		Self { audio: true, video: true }
	}
}

/// A live media track.
///
/// Cheap to clone; all clones share liveness. Stopping any clone stops the
/// underlying capture or playback permanently.
#[derive(Clone, Debug)]
pub struct MediaTrack {
	id: TrackId,
	kind: MediaKind,
	stopped: Arc<AtomicBool>,
}

impl MediaTrack {
	pub fn new<T: Into<TrackId>>(id: T, kind: MediaKind) -> Self {
		Self {
			id: id.into(),
			kind,
			stopped: Arc::new(AtomicBool::new(false)),
		}
	}

	pub fn id(&self) -> &TrackId {
		&self.id
	}

	pub fn kind(&self) -> MediaKind {
		self.kind
	}

	/// Stop the track. Idempotent; terminal.
	pub fn stop(&self) {
		self.stopped.store(true, Ordering::Relaxed);
	}

	pub fn is_stopped(&self) -> bool {
		self.stopped.load(Ordering::Relaxed)
	}
}

/// The locally captured tracks, exclusively owned by the session.
#[derive(Clone, Debug, Default)]
pub struct LocalStream {
	tracks: Vec<MediaTrack>,
}

impl LocalStream {
	pub fn new(tracks: Vec<MediaTrack>) -> Self {
		Self { tracks }
	}

	pub fn tracks(&self) -> &[MediaTrack] {
		&self.tracks
	}

	pub fn stop(&self) {
		for track in &self.tracks {
			track.stop();
		}
	}
}

/// A list of possible errors when acquiring local media.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum MediaError {
	#[error("permission denied")]
	Denied,

	#[error("device unavailable")]
	Unavailable,

	#[error("acquisition failed: {0}")]
	Failed(String),
}

/// Acquires camera/microphone tracks.
///
/// External capability; the session only calls [acquire](Self::acquire) once
/// per join and releases the returned stream on leave.
pub trait MediaSource: Send + Sync + 'static {
	fn acquire(&self, constraints: Constraints) -> impl Future<Output = Result<LocalStream, MediaError>> + Send;
}
