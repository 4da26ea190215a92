#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod config;
pub mod geom;
pub mod interaction;
pub mod scene;
pub mod session;

use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

use geom::{EdgeOverlay, GeomMesh, LineStrip};
use interaction::{CameraPreset, PickOutcome, RecordingSink, TransitionOutcome, Viewport};
use scene::{Geometry, LabelBitmap, NodeId};
use session::Session;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    // A second initialize keeps the logger that is already installed.
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| {
            std::thread::available_parallelism()
                .map(|value| value.get())
                .ok()
        })
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("could not start the rayon thread pool: {err}")))
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

/// Geometry of one node in the shape a WebGL host uploads.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GeometryExport<'a> {
    Group,
    Mesh {
        mesh: &'a GeomMesh,
    },
    Edges {
        positions: &'a [[f64; 3]],
        overlay: &'a EdgeOverlay,
    },
    Lines {
        lines: &'a LineStrip,
    },
    Label {
        label: &'a LabelBitmap,
        rgba: Vec<u8>,
    },
}

impl<'a> From<&'a Geometry> for GeometryExport<'a> {
    fn from(geometry: &'a Geometry) -> Self {
        match geometry {
            Geometry::Group => Self::Group,
            Geometry::Mesh(mesh) => Self::Mesh { mesh: mesh.as_ref() },
            Geometry::Edges { mesh, overlay } => Self::Edges {
                positions: &mesh.positions,
                overlay: overlay.as_ref(),
            },
            Geometry::Lines(lines) => Self::Lines { lines },
            Geometry::Label(label) => Self::Label {
                label: label.as_ref(),
                rgba: label.to_rgba(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PickExport {
    Hit { node: NodeId, distance: f64 },
    Miss,
}

impl From<PickOutcome> for PickExport {
    fn from(outcome: PickOutcome) -> Self {
        match outcome {
            PickOutcome::Hit { node, distance } => Self::Hit { node, distance },
            PickOutcome::Miss => Self::Miss,
        }
    }
}

/// Public entry point for consumers.
#[wasm_bindgen]
pub struct Engine {
    sink: RecordingSink,
    session: Option<Session>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Engine {
        Engine {
            sink: RecordingSink::new(),
            session: None,
        }
    }

    #[wasm_bindgen]
    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Builds the tree. Missing documents fall back to the default config and
    /// the built-in catalog.
    #[wasm_bindgen]
    pub fn load(
        &mut self,
        config_json: Option<String>,
        catalog_json: Option<String>,
        width: f64,
        height: f64,
    ) -> Result<(), JsValue> {
        if let Some(mut previous) = self.session.take() {
            previous.teardown();
        }
        let session = Session::from_json(
            config_json.as_deref(),
            catalog_json.as_deref(),
            Viewport::new(width, height),
            Rc::new(self.sink.clone()),
        )
        .map_err(to_js_error)?;
        self.session = Some(session);
        Ok(())
    }

    /// Advances one frame; `false` tells the host to stop its loop.
    #[wasm_bindgen]
    pub fn frame(&mut self, dt: f64) -> bool {
        self.session.as_mut().is_some_and(|session| session.frame(dt))
    }

    #[wasm_bindgen]
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if let Some(session) = self.session.as_mut() {
            session.pointer_down(x, y);
        }
    }

    /// Returns the hovered node id, if any.
    #[wasm_bindgen]
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<usize> {
        self.session
            .as_mut()
            .and_then(|session| session.pointer_move(x, y))
            .map(NodeId::index)
    }

    /// `undefined` for drags, otherwise the resolved pick.
    #[wasm_bindgen]
    pub fn pointer_up(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        let outcome = self
            .session
            .as_mut()
            .and_then(|session| session.pointer_up(x, y))
            .map(PickExport::from);
        serde_wasm_bindgen::to_value(&outcome).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn pointer_leave(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.pointer_leave();
        }
    }

    #[wasm_bindgen]
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), JsValue> {
        self.session_mut()?
            .resize(Viewport::new(width, height))
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn filter_by_area(&mut self, area: &str) -> Result<usize, JsValue> {
        self.session_mut()?.filter_by_area(area).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn show_all(&mut self) -> Result<usize, JsValue> {
        self.session_mut()?.show_all().map_err(to_js_error)
    }

    /// `true` when the camera started moving.
    #[wasm_bindgen]
    pub fn focus_entity(&mut self, entity_id: &str) -> Result<bool, JsValue> {
        let outcome = self.session_mut()?.focus_entity(entity_id).map_err(to_js_error)?;
        Ok(outcome == TransitionOutcome::Started)
    }

    /// Accepts `front`, `side`, `top` or `reset`.
    #[wasm_bindgen]
    pub fn camera_preset(&mut self, name: &str) -> Result<bool, JsValue> {
        let preset = CameraPreset::from_name(name)
            .ok_or_else(|| js_error(&format!("unknown camera preset `{name}`")))?;
        Ok(self.session_mut()?.camera_preset(preset) == TransitionOutcome::Started)
    }

    #[wasm_bindgen]
    pub fn orbit(&mut self, delta_azimuth: f64, delta_polar: f64) -> Result<bool, JsValue> {
        Ok(self.session_mut()?.orbit(delta_azimuth, delta_polar))
    }

    #[wasm_bindgen]
    pub fn zoom(&mut self, factor: f64) -> Result<bool, JsValue> {
        Ok(self.session_mut()?.zoom(factor))
    }

    #[wasm_bindgen]
    pub fn toggle_auto_rotate(&mut self) -> Result<bool, JsValue> {
        Ok(self.session_mut()?.toggle_auto_rotate())
    }

    #[wasm_bindgen]
    pub fn toggle_bloom(&mut self) -> Result<bool, JsValue> {
        Ok(self.session_mut()?.toggle_bloom())
    }

    #[wasm_bindgen]
    pub fn toggle_particles(&mut self) -> Result<bool, JsValue> {
        Ok(self.session_mut()?.toggle_particles())
    }

    #[wasm_bindgen]
    pub fn scene_snapshot(&self) -> Result<JsValue, JsValue> {
        let snapshot = self.session()?.snapshot().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&snapshot).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn node_geometry(&self, node: usize) -> Result<JsValue, JsValue> {
        let scene = self.session()?.scene().map_err(to_js_error)?;
        let node = scene
            .get(NodeId(node))
            .ok_or_else(|| js_error(&format!("unknown node {node}")))?;
        serde_wasm_bindgen::to_value(&GeometryExport::from(&node.geometry)).map_err(to_js_error)
    }

    /// Ambient then flow points as a flat `[x, y, z, ...]` buffer.
    #[wasm_bindgen]
    pub fn particle_positions(&self) -> Result<Vec<f64>, JsValue> {
        let particles = self.session()?.particles();
        Ok(particles
            .ambient
            .positions
            .iter()
            .chain(&particles.flow.positions)
            .flat_map(|p| p.to_array())
            .collect())
    }

    #[wasm_bindgen]
    pub fn lights(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.session()?.lights()).map_err(to_js_error)
    }

    /// Events published since the last call, oldest first.
    #[wasm_bindgen]
    pub fn drain_events(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.sink.drain()).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn summary(&self) -> Result<JsValue, JsValue> {
        let summary = self.session()?.summary().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(summary).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        let stats = self.session()?.stats().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&stats).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
    }
}

impl Engine {
    fn session(&self) -> Result<&Session, JsValue> {
        self.session.as_ref().ok_or_else(|| js_error("no tree loaded"))
    }

    fn session_mut(&mut self) -> Result<&mut Session, JsValue> {
        self.session.as_mut().ok_or_else(|| js_error("no tree loaded"))
    }

    /// Native access to the running session.
    #[must_use]
    pub fn session_ref(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}
