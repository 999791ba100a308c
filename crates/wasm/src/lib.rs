//! This crate is the npm-packagable entry point for Fluvion. The generation
//! logic and its `#[wasm_bindgen]` surface both live in the core crate's
//! `js` module; this crate adds the packaging concerns that only matter to
//! a wasm host (panic hook, console logging) and re-exports that surface.
//!
//! You probably won't ever want to include this crate in another Rust
//! project. Instead, use `wasm-pack` to build this into an npm package.

use fluvion::js::FluvionWorld as CoreWorld;
use wasm_bindgen::prelude::*;

/// A top-level interface for interacting with Fluvion from JS.
#[wasm_bindgen]
pub struct FluvionWorld {
    inner: CoreWorld,
}

#[wasm_bindgen]
impl FluvionWorld {
    /// Configure and start a new world. Initializes the panic hook and
    /// console logger; should be constructed once per JS app instance.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<FluvionWorld, JsValue> {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::default());
        Ok(Self {
            inner: CoreWorld::new(config)?,
        })
    }

    pub fn start(&self, tx: i32, ty: i32) {
        self.inner.start(tx, ty);
    }

    pub fn is_generating(&self) -> bool {
        self.inner.is_generating()
    }

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
        self.inner.tick(pos_x, pos_y, pos_z, vel_x, vel_y, vel_z)
    }
}
