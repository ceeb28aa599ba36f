//! C-convention callback trampolines
//!
//! Real server APIs deliver their real-time callbacks through a plain
//! function pointer plus an opaque context pointer. These trampolines
//! are the single thin bridge from that convention into a polymorphic
//! driver method: the context points at a `Box<dyn DriverCallbacks>`
//! and the trampoline immediately dispatches through it. No global
//! driver instance is involved.

use core::ffi::c_void;

use crate::{ServerPosition, ServerState};

/// Callbacks a driver exposes to the server's real-time thread.
pub trait DriverCallbacks: Send {
    /// One cycle of work; returns 0 on success.
    fn process(&mut self, nframes: u32) -> i32;

    /// Timebase master broadcast, invoked after `process` while the
    /// transport is rolling and this client holds the master role.
    fn timebase(&mut self, state: ServerState, nframes: u32, pos: &mut ServerPosition, new_pos: bool);

    /// The server terminated the connection.
    fn shutdown(&mut self);
}

/// Context type the trampolines expect behind the opaque pointer.
pub type CallbackContext = Box<dyn DriverCallbacks>;

/// # Safety
/// `ctx` must point at a live [`CallbackContext`] and must not be
/// aliased for the duration of the call.
pub unsafe extern "C" fn process_trampoline(nframes: u32, ctx: *mut c_void) -> i32 {
    let callbacks = unsafe { &mut *(ctx as *mut CallbackContext) };
    callbacks.process(nframes)
}

/// # Safety
/// `ctx` as for [`process_trampoline`]; `pos` must point at a valid
/// [`ServerPosition`] the server owns for this cycle.
pub unsafe extern "C" fn timebase_trampoline(
    state: i32,
    nframes: u32,
    pos: *mut ServerPosition,
    new_pos: i32,
    ctx: *mut c_void,
) {
    let callbacks = unsafe { &mut *(ctx as *mut CallbackContext) };
    let pos = unsafe { &mut *pos };
    callbacks.timebase(ServerState::from_raw(state), nframes, pos, new_pos != 0);
}

/// # Safety
/// `ctx` as for [`process_trampoline`].
pub unsafe extern "C" fn shutdown_trampoline(ctx: *mut c_void) {
    let callbacks = unsafe { &mut *(ctx as *mut CallbackContext) };
    callbacks.shutdown();
}
