//! In-memory transport server for driver tests
//!
//! Implements the full `AudioServer` contract with settable failure
//! toggles and call counters, so tests can script transport scenarios
//! and assert on port traffic.

use std::collections::HashMap;

use crate::{AudioError, AudioResult, AudioServer, PortId, ServerPosition, ServerState};

pub struct FakeServer {
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub state: ServerState,
    pub position: ServerPosition,

    pub fail_open: bool,
    pub fail_activate: bool,
    pub fail_register: bool,
    pub fail_playback_connect: bool,
    pub fail_timebase: bool,
    pub broken_playback_channels: Vec<usize>,

    pub opened: bool,
    pub active: bool,
    pub timebase_held: bool,

    pub ports: HashMap<PortId, String>,
    next_port: PortId,
    pub registered_count: usize,
    pub renamed_count: usize,
    pub unregistered_count: usize,
    pub locate_requests: Vec<u64>,
    pub playback_channels: usize,
    pub playback_connections: Vec<(PortId, usize)>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            state: ServerState::Stopped,
            position: ServerPosition::default(),
            fail_open: false,
            fail_activate: false,
            fail_register: false,
            fail_playback_connect: false,
            fail_timebase: false,
            broken_playback_channels: Vec::new(),
            opened: false,
            active: false,
            timebase_held: false,
            ports: HashMap::new(),
            next_port: 0,
            registered_count: 0,
            renamed_count: 0,
            unregistered_count: 0,
            locate_requests: Vec::new(),
            playback_channels: 2,
            playback_connections: Vec::new(),
        }
    }

    pub fn reset_counters(&mut self) {
        self.registered_count = 0;
        self.renamed_count = 0;
        self.unregistered_count = 0;
    }

    pub fn port_name(&self, port: PortId) -> Option<&str> {
        self.ports.get(&port).map(String::as_str)
    }

    /// Advance the server clock by one cycle while rolling, the way the
    /// real server does between process callbacks.
    pub fn advance(&mut self, nframes: u32) {
        if self.state == ServerState::Rolling {
            self.position.frame += nframes as u64;
        }
    }
}

impl AudioServer for FakeServer {
    fn open(&mut self, _client_name: &str) -> AudioResult<()> {
        if self.fail_open {
            return Err(AudioError::ServerUnavailable("fake server down".into()));
        }
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.ports.clear();
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn activate(&mut self) -> AudioResult<()> {
        if self.fail_activate {
            return Err(AudioError::ActivationFailed("fake activation refused".into()));
        }
        self.active = true;
        Ok(())
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn register_port(&mut self, name: &str) -> AudioResult<PortId> {
        if self.fail_register {
            return Err(AudioError::PortRegistration(name.to_string()));
        }
        let id = self.next_port;
        self.next_port += 1;
        self.ports.insert(id, name.to_string());
        self.registered_count += 1;
        Ok(id)
    }

    fn rename_port(&mut self, port: PortId, name: &str) -> AudioResult<()> {
        match self.ports.get_mut(&port) {
            Some(existing) => {
                *existing = name.to_string();
                self.renamed_count += 1;
                Ok(())
            }
            None => Err(AudioError::PortRegistration(format!("unknown port {port}"))),
        }
    }

    fn unregister_port(&mut self, port: PortId) -> AudioResult<()> {
        match self.ports.remove(&port) {
            Some(_) => {
                self.unregistered_count += 1;
                Ok(())
            }
            None => Err(AudioError::PortRegistration(format!("unknown port {port}"))),
        }
    }

    fn connect_to_playback(&mut self, port: PortId, channel: usize) -> AudioResult<()> {
        if self.fail_playback_connect || self.broken_playback_channels.contains(&channel) {
            return Err(AudioError::PortConnection(format!("no sink {channel}")));
        }
        self.playback_connections.push((port, channel));
        Ok(())
    }

    fn playback_channel_count(&self) -> usize {
        self.playback_channels
    }

    fn transport_query(&self) -> (ServerState, ServerPosition) {
        (self.state, self.position)
    }

    fn transport_start(&mut self) {
        if self.state == ServerState::Stopped {
            self.state = ServerState::Starting;
        }
    }

    fn transport_stop(&mut self) {
        self.state = ServerState::Stopped;
    }

    fn transport_locate(&mut self, frame: u64) {
        self.position.frame = frame;
        self.locate_requests.push(frame);
        if self.state != ServerState::Stopped {
            self.state = ServerState::Starting;
        }
    }

    fn acquire_timebase(&mut self) -> AudioResult<()> {
        if self.fail_timebase {
            return Err(AudioError::ActivationFailed(
                "timebase master role refused".into(),
            ));
        }
        self.timebase_held = true;
        Ok(())
    }

    fn release_timebase(&mut self) {
        self.timebase_held = false;
    }
}
