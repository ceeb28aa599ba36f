//! External transport-server contract
//!
//! The live driver only ever talks to the server through this trait.
//! A production backend wraps the real client library; tests drive the
//! driver with an in-memory fake. The server owns the transport clock,
//! dictates sample rate and buffer size, and arbitrates the timebase
//! master role among its clients.

use sb_core::BbtPosition;

use crate::AudioResult;

/// Opaque handle to a registered output port.
pub type PortId = usize;

/// Transport state as reported by the server for an entire cycle.
///
/// `Starting` is the first half of the two-cycle start/relocation
/// handshake: clients hold their transport until the server reports
/// `Rolling` in a following cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Rolling,
    Starting,
}

impl ServerState {
    /// Decode the wire value used by the C calling convention
    /// (0 stopped, 1 rolling, 3 starting, 4 starting across a
    /// networked transport; unknown values read as stopped).
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Rolling,
            3 | 4 => Self::Starting,
            _ => Self::Stopped,
        }
    }
}

/// Transport position reported by the server: the frame of the first
/// sample of the current cycle, plus bar/beat/tick metadata when a
/// timebase master is broadcasting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ServerPosition {
    pub frame: u64,
    pub bbt: Option<BbtPosition>,
}

/// Who drives the authoritative tempo on the server's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum TimebaseRole {
    /// This process broadcasts tempo/position metadata.
    Master = 1,
    /// An external master broadcasts; local tempo settings are
    /// disregarded in favor of the broadcast BPM.
    Slave = 0,
    /// No external master present, and this process is a normal client.
    None = -1,
}

/// Client-side view of the external audio/transport server.
///
/// `deactivate` and `close` must be idempotent and safe to call in any
/// order; the driver relies on that for teardown of half-connected
/// states. Implementations must not deliver any further callback once
/// `deactivate` has returned.
pub trait AudioServer: Send {
    /// Open a client session. Sample rate and buffer size are valid
    /// afterwards.
    fn open(&mut self, client_name: &str) -> AudioResult<()>;

    /// Close the client session.
    fn close(&mut self);

    fn sample_rate(&self) -> u32;

    fn buffer_size(&self) -> u32;

    /// Start callback delivery.
    fn activate(&mut self) -> AudioResult<()>;

    /// Stop callback delivery and detach all ports.
    fn deactivate(&mut self);

    fn register_port(&mut self, name: &str) -> AudioResult<PortId>;

    fn rename_port(&mut self, port: PortId, name: &str) -> AudioResult<()>;

    fn unregister_port(&mut self, port: PortId) -> AudioResult<()>;

    /// Connect an output port to the system playback sink `channel`.
    fn connect_to_playback(&mut self, port: PortId, channel: usize) -> AudioResult<()>;

    /// Number of system playback sinks available for scanning when the
    /// default stereo pair cannot be connected.
    fn playback_channel_count(&self) -> usize;

    /// State and position valid for the whole current cycle.
    fn transport_query(&self) -> (ServerState, ServerPosition);

    fn transport_start(&mut self);

    fn transport_stop(&mut self);

    /// Request a relocation; takes effect over the two-cycle handshake.
    fn transport_locate(&mut self, frame: u64);

    /// Request the timebase master role. The server may reject this.
    fn acquire_timebase(&mut self) -> AudioResult<()>;

    /// Voluntarily give up the timebase master role. Always safe.
    fn release_timebase(&mut self);
}
