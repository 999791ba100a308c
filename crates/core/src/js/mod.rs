//! WebAssembly bindings, built only when the `js` feature is enabled. Lets a
//! JS host configure a world, drive its streaming supervisor, and read back
//! tile bytes. The disk cache still works under wasm32, but a JS host is
//! expected to disable it and supply its own persistence if it wants one.

use crate::{
    config::WorldConfig,
    geometry::{TileCoord, Vec3},
    stream::Supervisor,
};
use wasm_bindgen::prelude::*;

/// Convert any error into a JS-thrown string, matching the convention used
/// throughout this crate's wasm surface: callers see a message, not a
/// typed error object.
trait IntoJs<T> {
    fn into_js(self) -> Result<T, JsValue>;
}

impl<T, E: std::fmt::Display> IntoJs<T> for Result<T, E> {
    fn into_js(self) -> Result<T, JsValue> {
        self.map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// The JS-facing entry point. One instance owns one world's streaming
/// supervisor; create a new instance to start a new world.
#[wasm_bindgen]
pub struct FluvionWorld {
    supervisor: Supervisor,
}

#[wasm_bindgen]
impl FluvionWorld {
    /// Configure and start a new world from a JS config object. Invalid
    /// configs (out-of-range fields, a cache root that can't be created)
    /// are rejected here rather than surfacing later as a silent no-op.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<FluvionWorld, JsValue> {
        console_error_panic_hook::set_once();
        let config: WorldConfig = config.into_serde().into_js()?;
        let supervisor = Supervisor::configure(config).into_js()?;
        Ok(Self { supervisor })
    }

    /// Schedule the initial batch centered on tile `(tx, ty)`. A second call
    /// while the first is still generating is ignored with a logged
    /// warning, matching the library's idempotency contract.
    pub fn start(&self, tx: i32, ty: i32) {
        self.supervisor.start_initial_batch(TileCoord::new(tx, ty));
    }

    /// `true` while at least one batch is still generating.
    pub fn is_generating(&self) -> bool {
        self.supervisor.is_generating()
    }

    /// Advance one step: drain any tiles the worker finished since the
    /// last call, predict and kick off the next batch if the consumer is
    /// nearing the edge of the active region, and return the flattened
    /// heights of the resident 3x3 tile neighborhood around the consumer, as
    /// one `Float32Array` per tile, row-major. Tiles not yet resident are
    /// omitted, not zero-filled. Never blocks.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &self,
        pos_x: f32,
        pos_y: f32,
        pos_z: f32,
        vel_x: f32,
        vel_y: f32,
        vel_z: f32,
    ) -> js_sys::Array {
        self.supervisor
            .tick(
                Vec3::new(pos_x, pos_y, pos_z),
                Vec3::new(vel_x, vel_y, vel_z),
            )
            .into_iter()
            .map(|tile| js_sys::Float32Array::from(tile.heightmap.as_slice()).into())
            .collect()
    }
}
