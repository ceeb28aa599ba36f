//! Event definition
//!
//! An event is a (kind, value) pair small enough to be stored in a
//! single atomic word, which is what makes the queue wait-free.

/// Kind of a driver-level occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EventKind {
    /// Sentinel returned when the queue is empty
    #[default]
    None = 0,
    /// The external server terminated the connection
    ServerShutdown = 1,
    /// The local timebase role changed; value carries the new role
    RoleChanged = 2,
    /// The external transport jumped to a new position
    RelocationOccurred = 3,
    /// The server reported a dropout
    XRun = 4,
    /// The server changed the negotiated sample rate; value carries it
    SampleRateChanged = 5,
    /// The server changed the negotiated buffer size; value carries it
    BufferSizeChanged = 6,
}

impl EventKind {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::ServerShutdown,
            2 => Self::RoleChanged,
            3 => Self::RelocationOccurred,
            4 => Self::XRun,
            5 => Self::SampleRateChanged,
            6 => Self::BufferSizeChanged,
            _ => Self::None,
        }
    }
}

/// A driver-level notification. The payload is an opaque integer whose
/// meaning depends on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Event {
    pub kind: EventKind,
    pub value: i32,
}

impl Event {
    /// The "queue empty" sentinel.
    pub const NONE: Self = Self {
        kind: EventKind::None,
        value: 0,
    };

    pub fn new(kind: EventKind, value: i32) -> Self {
        Self { kind, value }
    }

    /// Pack into one atomic word: kind in the high half, value in the low.
    pub(crate) fn pack(self) -> u64 {
        ((self.kind as u64) << 32) | (self.value as u32 as u64)
    }

    pub(crate) fn unpack(raw: u64) -> Self {
        Self {
            kind: EventKind::from_u8((raw >> 32) as u8),
            value: raw as u32 as i32,
        }
    }
}
