//! # huddle: client sessions for a selective-forwarding media relay
//!
//! `huddle` drives a participant's device through everything required to be
//! in a room: capability negotiation, transport establishment, local-track
//! publication, remote-track subscription, and teardown, while staying
//! consistent under asynchronous peer-arrival and peer-departure events.
//!
//! ## API
//!
//! The API is built around one [Session] per room membership, generic over
//! three collaborators the surrounding application provides:
//! - [Signal]: the event/RPC connection to the relay's control plane.
//! - [MediaEngine]: creates the transports/producers/consumers that perform
//!   the actual media-plane handshake.
//! - [MediaSource]: acquires the camera and microphone.
//!
//! A typical flow:
//! - [Session::new] with the three collaborators and a [SessionConfig].
//! - [Session::join] to run the ordered join sequence; on failure the error
//!   is also recorded in the session state.
//! - [Session::state] / [Session::updates] to render the read-only
//!   [SessionState] snapshot (local stream, one aggregated [PeerStream] per
//!   remote participant, most recent error).
//! - [Session::pause] / [Session::resume] for microphone mute and camera off.
//! - [Session::leave] to release everything; [Session::ended] resolves when
//!   the session is over, including a server-side room close.
//!
//! Remote tracks are grouped per participant by the [StreamRegistry] under a
//! [PeerKey]: the directory peer id when signaling reports one, else the
//! transport-level originator id.

mod engine;
mod error;
mod id;
mod media;
mod registry;
mod session;
mod signal;

pub use engine::*;
pub use error::*;
pub use id::*;
pub use media::*;
pub use registry::*;
pub use session::*;
pub use signal::*;
