// Mounts the dashboard when the wasm module is instantiated by the page that
// serves it. On native targets there is nothing to mount.

fn main() {}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn wasm_start() {
    gymdash_web::start();
}
