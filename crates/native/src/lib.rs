//! Thin C ABI shim over the core crate, for embedding Fluvion in a non-Rust
//! host (a game engine's native plugin layer, typically). All the logic
//! lives in the `fluvion` crate; this crate only owns the `extern "C"`
//! surface and the raw-pointer bookkeeping that surface requires.

use fluvion::{Supervisor, TileCoord, WorldConfig};
use std::os::raw::c_char;
use std::ffi::CStr;

/// Opaque handle to a running world, returned to the host as a raw pointer.
/// The host is responsible for passing it back unmodified to every other
/// function in this crate and for calling
/// [`fluvion_world_destroy`] exactly once when done with it.
pub struct FluvionWorldHandle(Supervisor);

/// Parse `config_json` (a null-terminated UTF-8 JSON string) and configure a
/// new world. Returns a null pointer if the JSON is malformed or the config
/// fails validation; the host should treat that as a fatal configuration
/// error and not retry with the same input.
///
/// # Safety
/// `config_json` must be a valid pointer to a null-terminated C string that
/// lives for the duration of this call.
#[no_mangle]
pub unsafe extern "C" fn fluvion_world_create(config_json: *const c_char) -> *mut FluvionWorldHandle {
    if config_json.is_null() {
        return std::ptr::null_mut();
    }
    let json = match CStr::from_ptr(config_json).to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };
    let config: WorldConfig = match serde_json::from_str(json) {
        Ok(c) => c,
        Err(_) => return std::ptr::null_mut(),
    };
    match Supervisor::configure(config) {
        Ok(supervisor) => Box::into_raw(Box::new(FluvionWorldHandle(supervisor))),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Schedule the initial batch centered on tile `(tx, ty)`.
///
/// # Safety
/// `handle` must be a live pointer returned by [`fluvion_world_create`] and
/// not yet passed to [`fluvion_world_destroy`].
#[no_mangle]
pub unsafe extern "C" fn fluvion_world_start(handle: *mut FluvionWorldHandle, tx: i32, ty: i32) {
    if let Some(world) = handle.as_ref() {
        world.0.start_initial_batch(TileCoord::new(tx, ty));
    }
}

/// `1` while at least one batch is still generating, `0` otherwise.
///
/// # Safety
/// Same pointer contract as [`fluvion_world_start`].
#[no_mangle]
pub unsafe extern "C" fn fluvion_world_is_generating(handle: *const FluvionWorldHandle) -> u8 {
    match handle.as_ref() {
        Some(world) => world.0.is_generating() as u8,
        None => 0,
    }
}

/// Tear down a world: stop accepting new work, join the worker thread, and
/// free the handle. The handle must not be used again after this call.
///
/// # Safety
/// `handle` must be a pointer previously returned by
/// [`fluvion_world_create`], not already destroyed.
#[no_mangle]
pub unsafe extern "C" fn fluvion_world_destroy(handle: *mut FluvionWorldHandle) {
    if handle.is_null() {
        return;
    }
    let world = Box::from_raw(handle);
    world.0.shutdown();
}
