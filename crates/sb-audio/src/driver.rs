//! Server-synchronized live driver
//!
//! Reconciles the internally maintained musical transport with the
//! externally owned server transport once per real-time cycle, and
//! arbitrates the timebase master role.
//!
//! Two clocks are in play. The internal transport counts frames and
//! ticks at the local tempo; the server counts frames on its own
//! transport. Under tempo changes the internal frame position is
//! rescaled to keep tick-based code consistent, which makes it diverge
//! from the server's frame count by a constant `frame_offset`:
//!
//! ```text
//! external_frame = internal_frame + frame_offset
//! ```
//!
//! The offset is recomputed exactly when the tick size changes and held
//! constant otherwise, so a mismatch between the predicted and reported
//! external frame can only mean one thing: somebody relocated the
//! transport.
//!
//! The server never tells a demoted timebase master that it lost the
//! role; it just stops invoking the timebase callback. A countdown
//! reset by the callback and decremented by every rolling cycle turns
//! that silence into an observable role change.

use std::sync::Arc;

use parking_lot::RwLock;

use sb_core::{BbtPosition, Instrument, InstrumentComponent, Sample, Song, TransportInfo};
use sb_event::{EventKind, EventQueue};

use crate::{
    AudioError, AudioOutput, AudioProcessor, AudioResult, AudioServer, Channel, DriverCallbacks,
    PortId, ServerPosition, ServerState, TimebaseRole, TrackBuffers, TrackRouting,
    track_port_name, MAX_TRACK_OUTPUTS,
};
use crate::routing::TrackPorts;

/// Frames of predicted-vs-reported mismatch tolerated before a cycle is
/// classified as an external relocation. Zero: the prediction must
/// match exactly.
pub const RELOCATION_TOLERANCE: u64 = 0;

/// Reset value of the timebase countdown. The role is considered lost
/// after this many rolling cycles without a timebase callback.
pub const TIMEBASE_TRACKING_RESET: i32 = 2;

/// Cycles of tempo-broadcast suppression after a master-issued
/// relocation, while dependent frame/tick bookkeeping settles.
pub const MASTER_RELOCATION_WAITS: u32 = 2;

const MAIN_PORT_L: &str = "out_L";
const MAIN_PORT_R: &str = "out_R";
const DEFAULT_BPM: f64 = 120.0;

/// Live output driver synchronized to an external transport server.
pub struct ServerDriver<S: AudioServer> {
    server: S,
    client_name: String,
    connect_defaults: bool,
    processor: Box<dyn AudioProcessor>,
    events: Arc<EventQueue>,

    transport: TransportInfo,
    sample_rate: u32,
    buffer_size: u32,
    frame_offset: i64,
    last_state: ServerState,
    last_pos: ServerPosition,

    role: TimebaseRole,
    timebase_tracking: i32,
    master_waits: u32,
    last_broadcast_bpm: f64,

    main_ports: Option<(PortId, PortId)>,
    track_ports: Vec<TrackPorts>,
    routing: RwLock<Arc<TrackRouting>>,

    out_l: Vec<Sample>,
    out_r: Vec<Sample>,
    track_bufs: Vec<TrackBuffers>,

    initialized: bool,
    connected: bool,
}

impl<S: AudioServer> ServerDriver<S> {
    pub fn new(server: S, processor: Box<dyn AudioProcessor>, events: Arc<EventQueue>) -> Self {
        Self {
            server,
            client_name: "strikebox".to_string(),
            connect_defaults: true,
            processor,
            events,
            transport: TransportInfo::new(DEFAULT_BPM, 48000),
            sample_rate: 48000,
            buffer_size: 0,
            frame_offset: 0,
            last_state: ServerState::Stopped,
            last_pos: ServerPosition::default(),
            role: TimebaseRole::None,
            timebase_tracking: 0,
            master_waits: 0,
            last_broadcast_bpm: DEFAULT_BPM,
            main_ports: None,
            track_ports: Vec::new(),
            routing: RwLock::new(Arc::new(TrackRouting::new())),
            out_l: Vec::new(),
            out_r: Vec::new(),
            track_bufs: Vec::new(),
            initialized: false,
            connected: false,
        }
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Whether `connect` should wire the master ports to the system
    /// playback sinks.
    pub fn set_connect_defaults(&mut self, connect: bool) {
        self.connect_defaults = connect;
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut S {
        &mut self.server
    }

    // ───────────────────────────────────────────────────────────────────
    // REAL-TIME CYCLE
    // ───────────────────────────────────────────────────────────────────

    /// One full cycle of the production path: reconcile transport, run
    /// the processor into freshly zeroed buffers, advance the internal
    /// clocks. Real-time safe; returns 0 on success.
    pub fn process_cycle(&mut self, nframes: u32) -> i32 {
        self.update_transport_info();

        let frames = (nframes as usize).min(self.out_l.len());
        self.out_l[..frames].fill(0.0);
        self.out_r[..frames].fill(0.0);
        let track_count = self.routing.read().track_count();
        for buf in self.track_bufs[..track_count].iter_mut() {
            buf.clear(frames);
        }

        let Self {
            processor,
            transport,
            out_l,
            out_r,
            track_bufs,
            ..
        } = self;
        processor.process(
            transport,
            &mut out_l[..frames],
            &mut out_r[..frames],
            &mut track_bufs[..track_count],
        );

        if self.transport.playing {
            self.transport.advance(nframes);
        }
        0
    }

    /// Query the server transport and reconcile the internal one.
    ///
    /// Strictly ordered within the cycle: this runs first, the
    /// processor second, the timebase callback (server-invoked) last.
    pub fn update_transport_info(&mut self) {
        let (state, pos) = self.server.transport_query();

        if self.role == TimebaseRole::Master {
            // Demotion is silent; infer it from the missing callback.
            if state == ServerState::Rolling {
                self.timebase_tracking -= 1;
                if self.timebase_tracking <= 0 {
                    let demoted = if pos.bbt.is_some() {
                        TimebaseRole::Slave
                    } else {
                        TimebaseRole::None
                    };
                    self.role = demoted;
                    self.master_waits = 0;
                    self.events.push(EventKind::RoleChanged, demoted as i32);
                }
            }
        } else {
            self.refresh_observer_role(pos.bbt.is_some());
        }

        match state {
            ServerState::Stopped => {
                self.transport.playing = false;
                // The transport can be repositioned while stopped; track
                // it silently so the next start begins in the right
                // place.
                if pos.frame as i64 != self.transport.frame as i64 + self.frame_offset {
                    self.frame_offset = 0;
                    match pos.bbt {
                        Some(bbt) => self.relocate_using_bbt(pos.frame, &bbt),
                        None => self.transport.locate_frame(pos.frame),
                    }
                }
            }
            ServerState::Starting => {
                // First half of the handshake: hold this cycle and wait
                // for Rolling.
                self.transport.playing = false;
            }
            ServerState::Rolling => {
                if self.last_state != ServerState::Rolling {
                    // The start or relocation is finalized now; the
                    // reported position is authoritative.
                    self.frame_offset = 0;
                    match pos.bbt {
                        Some(bbt) => self.relocate_using_bbt(pos.frame, &bbt),
                        None => self.transport.locate_frame(pos.frame),
                    }
                } else {
                    let predicted = self.transport.frame as i64 + self.frame_offset;
                    let diff = pos.frame as i64 - predicted;
                    if diff.unsigned_abs() > RELOCATION_TOLERANCE {
                        self.frame_offset = 0;
                        match pos.bbt {
                            Some(bbt) => self.relocate_using_bbt(pos.frame, &bbt),
                            None => self.transport.locate_frame(pos.frame),
                        }
                        self.events.push(
                            EventKind::RelocationOccurred,
                            pos.frame.min(i32::MAX as u64) as i32,
                        );
                    } else if self.role == TimebaseRole::Slave {
                        if let Some(bbt) = pos.bbt {
                            if (bbt.bpm - self.transport.bpm).abs() > f64::EPSILON {
                                self.adopt_master_tempo(pos.frame, &bbt);
                            }
                        }
                    }
                }
                self.transport.playing = true;
            }
        }

        self.last_state = state;
        self.last_pos = pos;
    }

    fn refresh_observer_role(&mut self, bbt_present: bool) {
        let observed = if bbt_present {
            TimebaseRole::Slave
        } else {
            TimebaseRole::None
        };
        if self.role != observed {
            self.role = observed;
            self.events.push(EventKind::RoleChanged, observed as i32);
        }
    }

    /// Snap to a position broadcast in bar/beat/tick form: adopt its
    /// tempo, relocate the musical clock, and capture the resulting
    /// frame offset so the invariant holds exactly at this instant.
    fn relocate_using_bbt(&mut self, frame: u64, bbt: &BbtPosition) {
        self.transport.set_bpm(bbt.bpm, self.sample_rate);
        self.transport.locate_tick(bbt.abs_tick_native());
        self.frame_offset = frame as i64 - self.transport.frame as i64;
    }

    /// An external master changed the tempo mid-roll: keep the musical
    /// position, rescale the internal frame to the new tick size, and
    /// recompute the offset against the reported external frame.
    fn adopt_master_tempo(&mut self, frame: u64, bbt: &BbtPosition) {
        let tick = self.transport.tick;
        self.transport.set_bpm(bbt.bpm, self.sample_rate);
        self.transport.locate_tick(tick);
        self.frame_offset = frame as i64 - self.transport.frame as i64;
    }

    /// Local tempo edit. The external frame equivalent of the current
    /// position is captured before the tick size changes, the internal
    /// frame is rescaled to keep the tick position, and the offset
    /// takes up the difference.
    pub fn set_bpm(&mut self, bpm: f64) {
        let external = self.transport.frame as i64 + self.frame_offset;
        let tick = self.transport.tick;
        self.transport.set_bpm(bpm, self.sample_rate);
        self.transport.locate_tick(tick);
        self.frame_offset = external - self.transport.frame as i64;
    }

    /// Constant offset between the external and internal frame
    /// positions.
    pub fn frame_offset(&self) -> i64 {
        self.frame_offset
    }

    // ───────────────────────────────────────────────────────────────────
    // TRANSPORT CONTROL
    // ───────────────────────────────────────────────────────────────────

    pub fn start_transport(&mut self) {
        self.server.transport_start();
    }

    pub fn stop_transport(&mut self) {
        self.server.transport_stop();
    }

    /// Request a relocation. While master, the following timebase
    /// broadcasts derive from the relocation target and the tempo
    /// broadcast is suppressed for two full cycles.
    pub fn locate_transport(&mut self, frame: u64) {
        self.server.transport_locate(frame);
        if self.role == TimebaseRole::Master {
            self.master_waits = MASTER_RELOCATION_WAITS;
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // TIMEBASE ARBITRATION
    // ───────────────────────────────────────────────────────────────────

    /// Ask the server for the timebase master role. Rejection is not an
    /// error: the driver silently stays in its observer role.
    pub fn register_as_master(&mut self) {
        match self.server.acquire_timebase() {
            Ok(()) => {
                self.role = TimebaseRole::Master;
                self.timebase_tracking = TIMEBASE_TRACKING_RESET;
                self.master_waits = 0;
                self.last_broadcast_bpm = self.transport.bpm;
                self.events
                    .push(EventKind::RoleChanged, TimebaseRole::Master as i32);
                log::info!("registered as timebase master");
            }
            Err(err) => {
                log::warn!("timebase master registration rejected: {err}");
            }
        }
    }

    /// Voluntarily give up the master role. Always safe.
    pub fn release_master(&mut self) {
        if self.role == TimebaseRole::Master {
            self.server.release_timebase();
            self.role = TimebaseRole::None;
            self.events
                .push(EventKind::RoleChanged, TimebaseRole::None as i32);
            log::info!("released timebase master role");
        }
    }

    pub fn role(&self) -> TimebaseRole {
        self.role
    }

    /// Tempo broadcast by the external timebase master, if one is
    /// present.
    pub fn master_bpm(&self) -> Option<f64> {
        match self.role {
            TimebaseRole::Slave => self.last_pos.bbt.map(|bbt| bbt.bpm),
            _ => None,
        }
    }

    /// Server-invoked once per cycle after `process_cycle`, only while
    /// rolling and only while the server still recognizes this client
    /// as timebase master. Fills the broadcast position.
    pub fn timebase_callback(
        &mut self,
        _state: ServerState,
        _nframes: u32,
        pos: &mut ServerPosition,
        new_pos: bool,
    ) {
        if self.role != TimebaseRole::Master {
            return;
        }
        self.timebase_tracking = TIMEBASE_TRACKING_RESET;

        if self.master_waits > 0 || new_pos {
            // Derive the broadcast from the relocation target the
            // server reports; keep broadcasting the previous tempo
            // until the bookkeeping has settled.
            let tick = pos.frame as f64 / self.transport.tick_size;
            pos.bbt = Some(BbtPosition::from_tick(tick, self.last_broadcast_bpm));
            if self.master_waits > 0 {
                self.master_waits -= 1;
            }
        } else {
            self.last_broadcast_bpm = self.transport.bpm;
            pos.bbt = Some(BbtPosition::from_tick(
                self.transport.tick,
                self.transport.bpm,
            ));
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // PER-TRACK PORT ROUTING
    // ───────────────────────────────────────────────────────────────────

    /// Rebuild the per-track output ports for the given topology.
    ///
    /// Instruments and their components are walked in declaration
    /// order and assigned sequential track indices; a fresh index gets
    /// a newly registered stereo pair, an index whose identity changed
    /// gets its pair renamed, and pairs beyond the new maximum are
    /// unregistered. Re-invoking with an unchanged topology touches no
    /// ports. Non-real-time; the new routing table is published as one
    /// atomic handle swap.
    pub fn make_track_outputs(&mut self, song: &Song) -> AudioResult<()> {
        let mut routing = TrackRouting::new();
        let mut next = 0usize;

        'instruments: for instrument in &song.instruments {
            for component in &instrument.components {
                if next >= MAX_TRACK_OUTPUTS {
                    log::warn!(
                        "track output limit of {MAX_TRACK_OUTPUTS} reached; remaining components share the master bus"
                    );
                    break 'instruments;
                }
                self.set_track_output(next, instrument, component)?;
                routing.insert(instrument.id, component.id, next);
                next += 1;
            }
        }

        while self.track_ports.len() > next {
            if let Some(pair) = self.track_ports.pop() {
                self.server.unregister_port(pair.l)?;
                self.server.unregister_port(pair.r)?;
            }
        }

        *self.routing.write() = Arc::new(routing);
        log::debug!("track outputs rebuilt: {next} stereo pairs");
        Ok(())
    }

    /// Register or rename the stereo pair at track index `track`.
    fn set_track_output(
        &mut self,
        track: usize,
        instrument: &Instrument,
        component: &InstrumentComponent,
    ) -> AudioResult<()> {
        let name_l = track_port_name(&component.name, track, &instrument.name, Channel::Left);
        let name_r = track_port_name(&component.name, track, &instrument.name, Channel::Right);

        let Self {
            server,
            track_ports,
            ..
        } = self;

        if let Some(pair) = track_ports.get_mut(track) {
            if pair.name_l != name_l || pair.name_r != name_r {
                server.rename_port(pair.l, &name_l)?;
                server.rename_port(pair.r, &name_r)?;
                pair.name_l = name_l;
                pair.name_r = name_r;
            }
        } else {
            let l = server.register_port(&name_l)?;
            let r = server.register_port(&name_r)?;
            track_ports.push(TrackPorts { l, r, name_l, name_r });
        }
        Ok(())
    }

    /// Current routing table handle.
    pub fn routing(&self) -> Arc<TrackRouting> {
        Arc::clone(&*self.routing.read())
    }

    /// Stereo cycle buffers of the track routed for an instrument
    /// component, for per-instrument output independent of the master
    /// bus.
    pub fn track_out_for(
        &mut self,
        instrument_id: u32,
        component_id: u32,
    ) -> Option<(&mut [Sample], &mut [Sample])> {
        let track = self.routing.read().track_for(instrument_id, component_id)?;
        let frames = self.buffer_size as usize;
        self.track_bufs.get_mut(track).map(|buf| buf.stereo(frames))
    }

    // ───────────────────────────────────────────────────────────────────
    // SERVER NOTIFICATIONS
    // ───────────────────────────────────────────────────────────────────

    /// The server terminated the connection. Originates outside the
    /// calling thread's control flow, so it surfaces as an event, not
    /// an error.
    pub fn on_shutdown(&mut self) {
        self.connected = false;
        self.events.push(EventKind::ServerShutdown, 0);
    }

    pub fn on_xrun(&mut self) -> i32 {
        self.events.push(EventKind::XRun, 0);
        0
    }

    pub fn on_sample_rate_changed(&mut self, sample_rate: u32) -> i32 {
        self.sample_rate = sample_rate;
        let bpm = self.transport.bpm;
        self.transport.set_bpm(bpm, sample_rate);
        self.events
            .push(EventKind::SampleRateChanged, sample_rate as i32);
        0
    }

    pub fn on_buffer_size_changed(&mut self, buffer_size: u32) -> i32 {
        self.buffer_size = buffer_size;
        let frames = buffer_size as usize;
        self.out_l.resize(frames, 0.0);
        self.out_r.resize(frames, 0.0);
        for buf in &mut self.track_bufs {
            *buf = TrackBuffers::new(frames);
        }
        self.events
            .push(EventKind::BufferSizeChanged, buffer_size as i32);
        0
    }

    /// The default stereo sinks refused the connection; scan the
    /// remaining sinks and take the first two that accept one.
    fn connect_playback_fallback(&mut self, l: PortId, r: PortId) -> AudioResult<()> {
        let mut connected = 0usize;
        for channel in 0..self.server.playback_channel_count() {
            let port = if connected == 0 { l } else { r };
            if self.server.connect_to_playback(port, channel).is_ok() {
                connected += 1;
                if connected == 2 {
                    log::info!("playback connected via fallback sinks");
                    return Ok(());
                }
            }
        }
        Err(AudioError::PortConnection(
            "no usable playback sinks".to_string(),
        ))
    }
}

impl<S: AudioServer> AudioOutput for ServerDriver<S> {
    fn init(&mut self, _buffer_size: u32) -> AudioResult<()> {
        // The server dictates the negotiated values; the requested
        // buffer size is advisory only.
        self.server.open(&self.client_name)?;
        self.sample_rate = self.server.sample_rate();
        self.buffer_size = self.server.buffer_size();

        let frames = self.buffer_size as usize;
        self.out_l = vec![0.0; frames];
        self.out_r = vec![0.0; frames];
        self.track_bufs = (0..MAX_TRACK_OUTPUTS)
            .map(|_| TrackBuffers::new(frames))
            .collect();

        let bpm = self.transport.bpm;
        self.transport = TransportInfo::new(bpm, self.sample_rate);
        self.processor.set_sample_rate(self.sample_rate);

        let l = self.server.register_port(MAIN_PORT_L)?;
        let r = self.server.register_port(MAIN_PORT_R)?;
        self.main_ports = Some((l, r));
        self.initialized = true;

        log::info!(
            "audio driver initialized: {} Hz, {} frames per cycle",
            self.sample_rate,
            self.buffer_size
        );
        Ok(())
    }

    fn connect(&mut self) -> AudioResult<()> {
        if !self.initialized {
            return Err(AudioError::NotInitialized);
        }
        self.server.activate()?;

        if self.connect_defaults {
            if let Some((l, r)) = self.main_ports {
                let default = self
                    .server
                    .connect_to_playback(l, 0)
                    .and_then(|()| self.server.connect_to_playback(r, 1));
                if let Err(err) = default {
                    log::warn!("default playback connection failed: {err}; scanning sinks");
                    self.connect_playback_fallback(l, r)?;
                }
            }
        }
        self.connected = true;
        log::info!("audio driver connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        // Callback delivery stops before any resource goes away.
        self.server.deactivate();
        self.server.close();
        self.connected = false;
        self.initialized = false;
        self.main_ports = None;
        self.track_ports.clear();
        *self.routing.write() = Arc::new(TrackRouting::new());
        log::info!("audio driver disconnected");
    }

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn transport(&self) -> &TransportInfo {
        &self.transport
    }

    fn out_l(&mut self) -> &mut [Sample] {
        &mut self.out_l
    }

    fn out_r(&mut self) -> &mut [Sample] {
        &mut self.out_r
    }

    fn track_out_l(&mut self, track: usize) -> Option<&mut [Sample]> {
        if track >= self.routing.read().track_count() {
            return None;
        }
        let frames = self.buffer_size as usize;
        self.track_bufs.get_mut(track).map(|buf| &mut buf.l[..frames])
    }

    fn track_out_r(&mut self, track: usize) -> Option<&mut [Sample]> {
        if track >= self.routing.read().track_count() {
            return None;
        }
        let frames = self.buffer_size as usize;
        self.track_bufs.get_mut(track).map(|buf| &mut buf.r[..frames])
    }
}

impl<S: AudioServer + 'static> DriverCallbacks for ServerDriver<S> {
    fn process(&mut self, nframes: u32) -> i32 {
        self.process_cycle(nframes)
    }

    fn timebase(
        &mut self,
        state: ServerState,
        nframes: u32,
        pos: &mut ServerPosition,
        new_pos: bool,
    ) {
        self.timebase_callback(state, nframes, pos, new_pos);
    }

    fn shutdown(&mut self) {
        self.on_shutdown();
    }
}
