use std::{
	collections::HashMap,
	future::Future,
	sync::{Arc, Mutex, MutexGuard},
	time::Duration,
};

use tokio::sync::watch;

use crate::{
	Capabilities, Constraints, DirectoryEntry, Direction, Error, LocalStream, MediaConsumer, MediaEngine, MediaKind,
	MediaProducer, MediaSource, MediaTransport, PeerId, PeerKey, PeerStream, ProduceRequest, RemoteProducer, Result,
	RoomId, Signal, SignalEvent, StreamRegistry, TransportEvent,
};

/// Session tuning knobs.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct SessionConfig {
	/// Which kinds of local media to acquire on join.
	pub constraints: Constraints,

	/// Deadline applied to each suspension point of the join sequence.
	///
	/// None waits as long as the collaborators do. Live event handling is
	/// never subject to this deadline.
	#[cfg_attr(
		feature = "serde",
		serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")
	)]
	pub deadline: Option<Duration>,
}

/// The read-only snapshot exposed to the UI layer.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
	/// The locally captured stream, once acquired.
	pub local: Option<LocalStream>,

	/// One aggregated stream per remote participant.
	pub remote: HashMap<PeerKey, PeerStream>,

	/// The most recent session-level error.
	pub error: Option<Error>,
}

struct State<E: MediaEngine> {
	room: Option<RoomId>,
	capabilities: Option<Capabilities>,
	local: Option<LocalStream>,
	send: Option<E::Transport>,
	recv: Option<E::Transport>,
	producers: Vec<<E::Transport as MediaTransport>::Producer>,
	consumers: Vec<<E::Transport as MediaTransport>::Consumer>,
	registry: StreamRegistry,
	error: Option<Error>,
}

impl<E: MediaEngine> Default for State<E> {
	fn default() -> Self {
		Self {
			room: None,
			capabilities: None,
			local: None,
			send: None,
			recv: None,
			producers: Vec::new(),
			consumers: Vec::new(),
			registry: StreamRegistry::new(),
			error: None,
		}
	}
}

struct Shared<S, E: MediaEngine, M> {
	signal: S,
	engine: E,
	source: M,
	config: SessionConfig,
	state: Mutex<State<E>>,
	updates: watch::Sender<SessionState>,

	// Bumped whenever the session restarts or ends; spawned loops exit on it.
	epoch: watch::Sender<u64>,
	ended: watch::Sender<bool>,
}

/// One active room membership.
///
/// The session exclusively owns its transports, producers, consumers, and
/// local tracks. Handles are cheap to clone and all clones drive the same
/// session.
pub struct Session<S: Signal, E: MediaEngine, M: MediaSource> {
	shared: Arc<Shared<S, E, M>>,
}

impl<S: Signal, E: MediaEngine, M: MediaSource> Clone for Session<S, E, M> {
	fn clone(&self) -> Self {
		Self {
			shared: self.shared.clone(),
		}
	}
}

impl<S: Signal, E: MediaEngine, M: MediaSource> Session<S, E, M> {
	pub fn new(signal: S, engine: E, source: M, config: SessionConfig) -> Self {
		Self {
			shared: Arc::new(Shared {
				signal,
				engine,
				source,
				config,
				state: Mutex::new(State::default()),
				updates: watch::Sender::new(SessionState::default()),
				epoch: watch::Sender::new(0),
				ended: watch::Sender::new(false),
			}),
		}
	}

	/// Join a room: acquire local media, negotiate capabilities, establish
	/// both transports, publish every local track, then subscribe to the
	/// producers already live in the room.
	///
	/// A failure aborts the join and is recorded as the session error;
	/// whatever was established stays up until [leave](Self::leave).
	pub async fn join<T: Into<RoomId>>(&self, room: T) -> Result<()> {
		let room = room.into();
		tracing::info!(%room, "joining room");

		self.reset();

		let res = self.join_inner(&room).await;
		match &res {
			Ok(()) => tracing::info!(%room, "joined room"),
			Err(err) => {
				tracing::warn!(%err, %room, "join failed");
				self.set_error(err.clone());
			}
		}

		res
	}

	async fn join_inner(&self, room: &RoomId) -> Result<()> {
		let shared = &self.shared;

		// The channel may still be dialing; nothing works without it.
		self.deadline(shared.signal.connected())
			.await?
			.map_err(Error::Disconnected)?;

		let local = self
			.deadline(shared.source.acquire(shared.config.constraints))
			.await?
			.map_err(Error::MediaAcquisition)?;

		{
			let mut state = self.lock();
			state.room = Some(room.clone());
			state.local = Some(local.clone());
		}
		self.publish();

		// Route server events for the rest of the session.
		self.spawn_events();

		let capabilities = self
			.deadline(shared.signal.capabilities())
			.await?
			.map_err(|err| Error::CapabilityLoad(err.into()))?;

		self.deadline(shared.engine.load(&capabilities))
			.await?
			.map_err(|err| Error::CapabilityLoad(err.into()))?;

		self.lock().capabilities = Some(capabilities);

		let send = self.create_transport(Direction::Send).await?;
		self.create_transport(Direction::Recv).await?;

		for track in local.tracks() {
			let producer = self
				.deadline(send.produce(track.clone()))
				.await?
				.map_err(|err| Error::Produce(err.into()))?;

			tracing::debug!(producer = %producer.id(), kind = %track.kind(), "published local track");
			self.lock().producers.push(producer);
		}

		// Become visible to the room; the relay starts pushing new-producer
		// events for us from here on.
		shared.signal.join_room(room);

		let exclude = shared.signal.participant_id();
		let existing = self
			.deadline(shared.signal.list_producers(room, exclude.as_ref()))
			.await?
			.map_err(|err| Error::Consume(err.into()))?;

		// Never subscribe to our own producers, even if the relay ignored the
		// exclusion hint.
		let own: Vec<_> = self.lock().producers.iter().map(|producer| producer.id()).collect();

		for remote in existing {
			if own.contains(&remote.id) {
				continue;
			}

			// A failure here doesn't abort the join; the rest of the room
			// still works.
			if let Err(err) = self.deadline(self.subscribe(&remote)).await.and_then(|res| res) {
				tracing::trace!(%err, producer = %remote.id, "skipped initial subscription");
			}
		}

		Ok(())
	}

	/// Request transport parameters from signaling, instantiate the transport
	/// via the engine, and start servicing its intents before any media flows.
	async fn create_transport(&self, direction: Direction) -> Result<E::Transport> {
		let params = self
			.deadline(self.shared.signal.create_transport(direction))
			.await?
			.map_err(|err| Error::TransportCreation(err.into()))?;

		let transport = self
			.deadline(self.shared.engine.create_transport(direction, params))
			.await?
			.map_err(|err| Error::TransportCreation(err.into()))?;

		tracing::debug!(%direction, transport = %transport.id(), "transport created");
		self.spawn_intents(direction, transport.clone());

		let mut state = self.lock();
		match direction {
			Direction::Send => state.send = Some(transport.clone()),
			Direction::Recv => state.recv = Some(transport.clone()),
		}

		Ok(transport)
	}

	/// Subscribe to a remote producer: consumer parameters from signaling,
	/// consumer from the engine, resume, then aggregate the track.
	async fn subscribe(&self, remote: &RemoteProducer) -> Result<()> {
		let (recv, capabilities) = {
			let state = self.lock();
			let recv = state.recv.clone().ok_or(Error::Closed)?;
			let capabilities = state.capabilities.clone().ok_or(Error::Closed)?;
			(recv, capabilities)
		};

		let params = self
			.shared
			.signal
			.consume(&recv.id(), &remote.id, &capabilities)
			.await
			.map_err(|err| Error::Consume(err.into()))?;

		let consumer = recv.consume(params).await.map_err(|err| Error::Consume(err.into()))?;

		// Created server-paused; unpause once we're ready to aggregate.
		consumer.resume();

		let key = match &remote.peer {
			Some(peer) => PeerKey::Peer(peer.clone()),
			None => PeerKey::Producer(remote.id.clone()),
		};

		let track = consumer.track();
		{
			let mut state = self.lock();
			state.registry.add_track(key.clone(), remote.id.clone(), track);
			state.consumers.push(consumer);
		}
		self.publish();

		tracing::debug!(producer = %remote.id, peer = %key, "subscribed to remote producer");
		Ok(())
	}

	fn spawn_events(&self) {
		let session = self.clone();
		let mut epoch = self.shared.epoch.subscribe();

		web_async::spawn(async move {
			loop {
				let event = tokio::select! {
					_ = epoch.changed() => break,
					event = session.shared.signal.event() => match event {
						Some(event) => event,
						None => break,
					},
				};

				session.handle_event(event).await;
			}
		});
	}

	async fn handle_event(&self, event: SignalEvent) {
		match event {
			SignalEvent::NewProducer { producer, peer } => {
				// Our own producers echo back; don't subscribe to ourselves.
				let own = self.lock().producers.iter().any(|local| local.id() == producer);
				if own {
					tracing::trace!(%producer, "ignoring own producer");
					return;
				}

				let remote = RemoteProducer { id: producer, peer };
				if let Err(err) = self.subscribe(&remote).await {
					tracing::warn!(%err, producer = %remote.id, "subscription failed");
				}
			}
			SignalEvent::Hangup { peer } => self.handle_hangup(&peer),
			SignalEvent::RoomClosed { room } => {
				let current = self.lock().room.clone();
				if current.as_ref() == Some(&room) {
					tracing::info!(%room, "room closed by server");
					self.leave();
				} else {
					tracing::trace!(%room, "ignoring close for another room");
				}
			}
		}
	}

	fn handle_hangup(&self, peer: &PeerId) {
		let mut state = self.lock();

		let exact = PeerKey::Peer(peer.clone());
		let key = if state.registry.contains(&exact) {
			Some(exact)
		} else {
			directory_match(&state.registry, &self.shared.signal.directory(), peer)
		};

		let Some(key) = key else {
			// The directory may lag behind signaling; nothing to clean up.
			tracing::debug!(%peer, "hangup for unknown peer");
			return;
		};

		state.registry.remove(&key);
		drop(state);
		self.publish();

		tracing::debug!(%peer, %key, "peer hung up");
	}

	fn spawn_intents(&self, direction: Direction, transport: E::Transport) {
		let session = self.clone();
		let mut epoch = self.shared.epoch.subscribe();

		web_async::spawn(async move {
			loop {
				let event = tokio::select! {
					_ = epoch.changed() => break,
					event = transport.event() => match event {
						Some(event) => event,
						None => break,
					},
				};

				session.handle_intent(direction, &transport, event).await;
			}
		});
	}

	async fn handle_intent(&self, direction: Direction, transport: &E::Transport, event: TransportEvent) {
		match event {
			TransportEvent::Connect { dtls, reply } => {
				tracing::debug!(%direction, transport = %transport.id(), "connecting transport");

				match self.shared.signal.connect_transport(&transport.id(), dtls).await {
					Ok(()) => reply.resolve(()),
					Err(err) => {
						tracing::warn!(%err, %direction, "transport connect rejected");
						reply.reject(Error::TransportConnect(err.into()));
					}
				}
			}
			TransportEvent::Produce { kind, codec, reply } => {
				let room = self.lock().room.clone();
				let participant = self.shared.signal.participant_id();

				let (Some(room), Some(participant)) = (room, participant) else {
					reply.reject(Error::Closed);
					return;
				};

				let request = ProduceRequest {
					transport: transport.id(),
					kind,
					codec,
					room,
					participant,
				};

				match self.shared.signal.produce(request).await {
					Ok(producer) => reply.resolve(producer),
					Err(err) => {
						tracing::warn!(%err, %direction, "produce rejected");
						reply.reject(Error::Produce(err.into()));
					}
				}
			}
			TransportEvent::State(state) => {
				tracing::debug!(%direction, ?state, "transport state changed");

				if state.is_terminal() {
					// Session-fatal for this direction. The caller observes
					// the error and decides when to leave; nothing unwinds
					// here.
					self.set_error(Error::TransportFailed(direction));
				}
			}
		}
	}

	/// Tear the session down. Idempotent and unconditional: every resource
	/// release is independent and best-effort, so calling this with nothing
	/// to release is fine.
	pub fn leave(&self) {
		tracing::info!("leaving room");

		// Stop routing events before tearing anything down.
		self.shared.epoch.send_modify(|epoch| *epoch += 1);

		let mut state = self.lock();
		if let Some(local) = state.local.take() {
			local.stop();
		}

		if let Some(send) = state.send.take() {
			send.close();
		}
		if let Some(recv) = state.recv.take() {
			recv.close();
		}

		for producer in state.producers.drain(..) {
			producer.close();
		}
		for consumer in state.consumers.drain(..) {
			consumer.close();
		}

		state.registry.clear();
		state.room = None;
		state.capabilities = None;
		drop(state);

		self.shared.signal.leave_room();
		self.shared.ended.send_replace(true);
		self.publish();
	}

	/// Pause every local producer of the given kind (microphone mute, camera
	/// off). Remote subscriptions are unaffected.
	pub fn pause(&self, kind: MediaKind) {
		for producer in self.lock().producers.iter().filter(|producer| producer.kind() == kind) {
			producer.pause();
		}

		tracing::debug!(%kind, "paused local producers");
	}

	/// Resume local producers previously paused with [pause](Self::pause).
	pub fn resume(&self, kind: MediaKind) {
		for producer in self.lock().producers.iter().filter(|producer| producer.kind() == kind) {
			producer.resume();
		}

		tracing::debug!(%kind, "resumed local producers");
	}

	/// The current read-only snapshot.
	pub fn state(&self) -> SessionState {
		self.shared.updates.borrow().clone()
	}

	/// Await snapshot changes; the receiver always sees the latest state.
	pub fn updates(&self) -> watch::Receiver<SessionState> {
		self.shared.updates.subscribe()
	}

	/// The most recent session-level error, if any.
	pub fn error(&self) -> Option<Error> {
		self.lock().error.clone()
	}

	/// Resolves once the session has ended: an explicit leave or a
	/// server-side room close. The caller is expected to navigate away from
	/// the session view.
	pub async fn ended(&self) {
		let mut ended = self.shared.ended.subscribe();
		while !*ended.borrow_and_update() {
			if ended.changed().await.is_err() {
				return;
			}
		}
	}

	// Drop residual state from a previous membership and restart the epoch.
	fn reset(&self) {
		self.shared.epoch.send_modify(|epoch| *epoch += 1);

		let mut state = self.lock();
		state.room = None;
		state.capabilities = None;
		state.local = None;
		state.send = None;
		state.recv = None;
		state.producers.clear();
		state.consumers.clear();
		state.registry.clear();
		state.error = None;
		drop(state);

		self.shared.ended.send_replace(false);
		self.publish();
	}

	fn set_error(&self, err: Error) {
		self.lock().error = Some(err);
		self.publish();
	}

	fn publish(&self) {
		let state = self.lock();
		let snapshot = SessionState {
			local: state.local.clone(),
			remote: state.registry.snapshot(),
			error: state.error.clone(),
		};
		drop(state);

		self.shared.updates.send_replace(snapshot);
	}

	async fn deadline<T>(&self, fut: impl Future<Output = T>) -> Result<T> {
		match self.shared.config.deadline {
			Some(deadline) => tokio::time::timeout(deadline, fut).await.map_err(|_| Error::Timeout),
			None => Ok(fut.await),
		}
	}

	fn lock(&self) -> MutexGuard<'_, State<E>> {
		self.shared.state.lock().unwrap()
	}
}

/// Directory-assisted hangup resolution, tried after an exact key match
/// fails: find the registry entry whose transport-level key the external
/// directory maps to the departed peer. Loose comparison on both sides.
fn directory_match(registry: &StreamRegistry, directory: &[DirectoryEntry], peer: &PeerId) -> Option<PeerKey> {
	registry
		.keys()
		.find(|key| {
			directory
				.iter()
				.any(|entry| key.matches(&entry.origin) && entry.peer == peer.as_str())
		})
		.cloned()
}

#[cfg(test)]
impl<S: Signal, E: MediaEngine, M: MediaSource> Session<S, E, M> {
	pub fn assert_producers(&self, len: usize) {
		assert_eq!(self.lock().producers.len(), len, "wrong producer count");
	}

	pub fn assert_consumers(&self, len: usize) {
		assert_eq!(self.lock().consumers.len(), len, "wrong consumer count");
	}
}
