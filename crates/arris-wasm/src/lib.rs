//! WASM bindings for the arris mesh CAD toolkit.
//!
//! Exposes solids by numeric handle and the fillet/chamfer entry points
//! to JavaScript/TypeScript via wasm-bindgen. Module initialization is
//! the single asynchronous boundary the browser host awaits; every call
//! after that is synchronous.

use std::cell::RefCell;
use std::collections::HashMap;

use arris::{
    BlendConfig, BlendEdge, BspKernel, ChamferRequest, FilletRequest, SideMode, Solid,
    TubeStrategy,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

thread_local! {
    static SOLIDS: RefCell<HashMap<u32, Solid>> = RefCell::new(HashMap::new());
    static NEXT_HANDLE: RefCell<u32> = const { RefCell::new(1) };
}

/// Initialize the WASM module (sets up the panic hook for readable
/// error messages in the console).
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"[WASM] arris loaded".into());
}

/// Triangle mesh output for rendering.
#[derive(Serialize, Deserialize)]
pub struct WasmMesh {
    /// Flat vertex positions `[x0, y0, z0, ...]`.
    pub positions: Vec<f64>,
    /// Flat triangle indices `[i0, i1, i2, ...]`.
    pub indices: Vec<u32>,
    /// One face-label id per triangle.
    pub labels: Vec<u32>,
}

/// Edge input from JS: a polyline between two named faces.
#[derive(Serialize, Deserialize)]
pub struct WasmEdge {
    /// Polyline points as `[x, y, z]` triples.
    pub points: Vec<[f64; 3]>,
    /// Whether the edge closes into a loop.
    pub closed: bool,
    /// Face on the A side.
    pub face_a: String,
    /// Face on the B side.
    pub face_b: String,
}

/// Blend options from JS; all fields optional.
#[derive(Serialize, Deserialize, Default)]
pub struct WasmBlendOptions {
    /// `"inset"` (default) or `"outset"`.
    pub side: Option<String>,
    /// Tool oversizing fraction.
    pub inflate: Option<f64>,
    /// Radial resolution.
    pub segments: Option<u32>,
    /// `"auto"` (default), `"fast"`, or `"spheres"`.
    pub strategy: Option<String>,
}

/// Result envelope for feature operations.
#[derive(Serialize, Deserialize)]
pub struct WasmFeatureResult {
    /// Handle of the result solid, when one was produced.
    pub solid: Option<u32>,
    /// Centerline / edge diagnostic polyline.
    pub centerline: Vec<[f64; 3]>,
    /// Error description, when the attempt degraded.
    pub error: Option<String>,
}

impl WasmBlendOptions {
    fn to_config(&self) -> BlendConfig {
        let mut config = BlendConfig::default();
        if let Some(side) = &self.side {
            config.side = match side.as_str() {
                "outset" => SideMode::Outset,
                _ => SideMode::Inset,
            };
        }
        if let Some(inflate) = self.inflate {
            config.inflate = inflate;
        }
        if let Some(segments) = self.segments {
            config.segments = segments;
        }
        if let Some(strategy) = &self.strategy {
            config.strategy = match strategy.as_str() {
                "fast" => TubeStrategy::FastRings,
                "spheres" => TubeStrategy::SphereHulls,
                _ => TubeStrategy::Auto,
            };
        }
        config
    }
}

fn store_solid(solid: Solid) -> u32 {
    let handle = NEXT_HANDLE.with(|n| {
        let mut n = n.borrow_mut();
        let h = *n;
        *n += 1;
        h
    });
    SOLIDS.with(|s| s.borrow_mut().insert(handle, solid));
    handle
}

fn with_solid<T>(handle: u32, f: impl FnOnce(&Solid) -> T) -> Result<T, JsValue> {
    SOLIDS.with(|s| {
        s.borrow()
            .get(&handle)
            .map(f)
            .ok_or_else(|| JsValue::from_str(&format!("unknown solid handle {handle}")))
    })
}

fn parse_edge(edge: &WasmEdge) -> BlendEdge {
    let points = edge
        .points
        .iter()
        .map(|p| arris::Point3::new(p[0], p[1], p[2]))
        .collect();
    BlendEdge::between_faces(points, edge.closed, &edge.face_a, &edge.face_b)
}

/// Create a box solid; returns its handle.
#[wasm_bindgen]
pub fn new_box(sx: f64, sy: f64, sz: f64) -> u32 {
    store_solid(arris::make_box(sx, sy, sz))
}

/// Create a cylinder solid; returns its handle.
#[wasm_bindgen]
pub fn new_cylinder(radius: f64, height: f64, segments: u32) -> u32 {
    store_solid(arris::make_cylinder(radius, height, segments))
}

/// Drop a solid from the registry.
#[wasm_bindgen]
pub fn free_solid(handle: u32) {
    SOLIDS.with(|s| s.borrow_mut().remove(&handle));
}

/// Fetch a solid's render mesh.
#[wasm_bindgen]
pub fn solid_mesh(handle: u32) -> Result<JsValue, JsValue> {
    let mesh = with_solid(handle, |solid| {
        let m = solid.mesh();
        WasmMesh {
            positions: m.positions.clone(),
            indices: m.indices.clone(),
            labels: m.labels.clone(),
        }
    })?;
    serde_wasm_bindgen::to_value(&mesh).map_err(into_js)
}

/// Round an edge of a solid.
#[wasm_bindgen]
pub fn fillet_edge(
    handle: u32,
    edge: JsValue,
    radius: f64,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let edge: WasmEdge = serde_wasm_bindgen::from_value(edge).map_err(into_js)?;
    let options: WasmBlendOptions = if options.is_undefined() || options.is_null() {
        WasmBlendOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options).map_err(into_js)?
    };

    let request = FilletRequest {
        edge: parse_edge(&edge),
        radius,
        config: options.to_config(),
    };
    let kernel = BspKernel::new();
    let outcome = with_solid(handle, |solid| arris::fillet_solid(solid, &request, &kernel))?;

    let result = WasmFeatureResult {
        solid: outcome.final_solid.map(store_solid),
        centerline: outcome
            .centerline
            .iter()
            .map(|p| [p.x, p.y, p.z])
            .collect(),
        error: outcome.error.map(|e| e.to_string()),
    };
    serde_wasm_bindgen::to_value(&result).map_err(into_js)
}

/// Bevel an edge of a solid.
#[wasm_bindgen]
pub fn chamfer_edge(
    handle: u32,
    edge: JsValue,
    distance: f64,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let edge: WasmEdge = serde_wasm_bindgen::from_value(edge).map_err(into_js)?;
    let options: WasmBlendOptions = if options.is_undefined() || options.is_null() {
        WasmBlendOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options).map_err(into_js)?
    };

    let request = ChamferRequest::new(parse_edge(&edge), distance, options.to_config());
    let kernel = BspKernel::new();
    let outcome = with_solid(handle, |solid| arris::chamfer_solid(solid, &request, &kernel))?;

    let result = WasmFeatureResult {
        solid: outcome.final_solid.map(store_solid),
        centerline: outcome
            .edge_points
            .iter()
            .map(|p| [p.x, p.y, p.z])
            .collect(),
        error: outcome.error.map(|e| e.to_string()),
    };
    serde_wasm_bindgen::to_value(&result).map_err(into_js)
}

fn into_js<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}
