//! Scene configuration.
//!
//! Every section deserializes with defaults, so a JSON document only needs the
//! values it overrides. `TreeConfig::from_json` validates after parsing.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and > 0, got {value}")))
    }
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and >= 0, got {value}")))
    }
}

fn require_min(field: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value >= min {
        Ok(())
    } else {
        Err(invalid(field, format!("must be at least {min}, got {value}")))
    }
}

// ─── Palette ─────────────────────────────────────────────────────────────────

/// Knowledge-area tag to `0xRRGGBB` color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaPalette {
    colors: BTreeMap<String, u32>,
}

impl AreaPalette {
    pub const FALLBACK_AREA: &'static str = "fundamentos";
    pub const FALLBACK_COLOR: u32 = 0x00ffff;

    #[must_use]
    pub fn new(colors: BTreeMap<String, u32>) -> Self {
        Self { colors }
    }

    #[must_use]
    pub fn get(&self, area: &str) -> Option<u32> {
        self.colors.get(area).copied()
    }

    #[must_use]
    pub fn contains(&self, area: &str) -> bool {
        self.colors.contains_key(area)
    }

    /// Color used for unrecognized tags: the `fundamentos` entry, or cyan.
    #[must_use]
    pub fn fallback(&self) -> u32 {
        self.get(Self::FALLBACK_AREA).unwrap_or(Self::FALLBACK_COLOR)
    }

    #[must_use]
    pub fn color_or_fallback(&self, area: &str) -> u32 {
        self.get(area).unwrap_or_else(|| self.fallback())
    }

    pub fn insert(&mut self, area: impl Into<String>, color: u32) {
        self.colors.insert(area.into(), color);
    }

    pub fn areas(&self) -> impl Iterator<Item = &str> {
        self.colors.keys().map(String::as_str)
    }
}

impl Default for AreaPalette {
    fn default() -> Self {
        let colors = [
            ("fundamentos", 0x00ffff),
            ("web", 0x00bfff),
            ("ia", 0x9d00ff),
            ("redes", 0x00ff88),
            ("sistemas", 0xff3366),
            ("datos", 0xffb800),
            ("gamedev", 0xff00ff),
        ]
        .into_iter()
        .map(|(area, color)| (area.to_string(), color))
        .collect();
        Self { colors }
    }
}

// ─── Shared decoration settings ──────────────────────────────────────────────

/// Torus rings placed along a curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingSettings {
    /// Curve is sampled at `samples + 1` points.
    pub samples: usize,
    /// A ring is placed on every `stride`-th sample.
    pub stride: usize,
    pub base_radius: f64,
    pub tip_radius: f64,
    pub tube_radius: f64,
    /// Radians per 1/60 s; alternates sign ring to ring.
    pub spin_speed: f64,
    pub opacity: f64,
    /// Opacity lost per sample index.
    pub opacity_falloff: f64,
}

impl Default for RingSettings {
    fn default() -> Self {
        Self {
            samples: 15,
            stride: 2,
            base_radius: 0.35,
            tip_radius: 0.12,
            tube_radius: 0.02,
            spin_speed: 0.01,
            opacity: 0.4,
            opacity_falloff: 0.015,
        }
    }
}

impl RingSettings {
    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        require_min(field, self.samples, 1)?;
        require_min(field, self.stride, 1)?;
        require_positive(field, self.base_radius)?;
        require_positive(field, self.tip_radius)?;
        require_positive(field, self.tube_radius)
    }
}

/// Small floating markers scattered along a curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub samples: usize,
    pub radius: f64,
    /// Maximum lateral offset from the curve.
    pub jitter: f64,
    pub float_amplitude: f64,
    pub float_speed: f64,
    pub opacity: f64,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            samples: 25,
            radius: 0.03,
            jitter: 0.04,
            float_amplitude: 0.05,
            float_speed: 2.0,
            opacity: 0.8,
        }
    }
}

// ─── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootsConfig {
    /// Roots sit on a circle of this radius around the trunk.
    pub circle_radius: f64,
    pub stem_radius_top: f64,
    pub stem_radius_bottom: f64,
    pub stem_height: f64,
    pub stem_segments: usize,
    pub stem_y: f64,
    pub stem_opacity: f64,
    pub halo_scale: f64,
    pub connections_per_root: usize,
    pub connection_start_y: f64,
    /// Connections land on a circle of `connection_spread` around this point.
    pub connection_target: [f64; 3],
    pub connection_spread: f64,
    pub connection_curve_height: f64,
    pub connection_curve_depth: f64,
    pub connection_radius_start: f64,
    pub connection_radius_end: f64,
    pub connection_taper_exponent: f64,
    pub connection_segments: usize,
    pub connection_radial_segments: usize,
    pub connection_opacity: f64,
}

impl Default for RootsConfig {
    fn default() -> Self {
        Self {
            circle_radius: 4.0,
            stem_radius_top: 0.2,
            stem_radius_bottom: 0.5,
            stem_height: 0.75,
            stem_segments: 16,
            stem_y: 2.0,
            stem_opacity: 0.5,
            halo_scale: 1.1,
            connections_per_root: 3,
            connection_start_y: 1.25,
            connection_target: [0.0, 2.0, 0.0],
            connection_spread: 2.0,
            connection_curve_height: 1.0,
            connection_curve_depth: 0.5,
            connection_radius_start: 0.1,
            connection_radius_end: 0.04,
            connection_taper_exponent: 2.0,
            connection_segments: 60,
            connection_radial_segments: 8,
            connection_opacity: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrunkConfig {
    pub radius_top: f64,
    pub radius_bottom: f64,
    pub base_y: f64,
    pub height: f64,
    /// Interior spine control points between base and canopy.
    pub spine_points: usize,
    pub spine_jitter: f64,
    pub spine_tension: f64,
    pub tubular_segments: usize,
    pub radial_segments: usize,
    pub opacity: f64,
    pub rings: RingSettings,
    /// Distance of trunk subject nodes from the spine.
    pub node_radius: f64,
    pub node_start_y: f64,
    pub node_spacing: f64,
}

impl Default for TrunkConfig {
    fn default() -> Self {
        Self {
            radius_top: 0.2,
            radius_bottom: 1.0,
            base_y: 0.0,
            height: 7.0,
            spine_points: 3,
            spine_jitter: 0.15,
            spine_tension: 0.5,
            tubular_segments: 48,
            radial_segments: 10,
            opacity: 0.9,
            rings: RingSettings {
                samples: 10,
                stride: 2,
                base_radius: 1.3,
                tip_radius: 0.5,
                tube_radius: 0.05,
                spin_speed: 0.0,
                opacity: 0.8,
                opacity_falloff: 0.0,
            },
            node_radius: 1.2,
            node_start_y: 1.0,
            node_spacing: 1.0,
        }
    }
}

impl TrunkConfig {
    /// Height at which branches leave the trunk.
    #[must_use]
    pub fn canopy_y(&self) -> f64 {
        self.base_y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchConfig {
    /// Branch start points sit on a circle of this radius at canopy height.
    pub start_radius: f64,
    pub height_variation: f64,
    pub radius_start: f64,
    pub radius_end: f64,
    pub taper_exponent: f64,
    pub tubular_segments: usize,
    pub radial_segments: usize,
    pub jitter_amplitude: f64,
    pub opacity: f64,
    pub emissive_intensity: f64,
    pub edge_opacity: f64,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            start_radius: 0.6,
            height_variation: 0.5,
            radius_start: 0.25,
            radius_end: 0.05,
            taper_exponent: 1.5,
            tubular_segments: 80,
            radial_segments: 16,
            jitter_amplitude: 0.12,
            opacity: 0.5,
            emissive_intensity: 0.6,
            edge_opacity: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRingConfig {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub opacity: f64,
}

/// Subject node spheres used by roots and trunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub radius: f64,
    pub segments: usize,
    pub inner_ring: NodeRingConfig,
    pub outer_ring: NodeRingConfig,
}

impl Default for NodeRingConfig {
    fn default() -> Self {
        Self {
            inner_radius: 0.4,
            outer_radius: 0.5,
            opacity: 0.4,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            radius: 0.25,
            segments: 24,
            inner_ring: NodeRingConfig::default(),
            outer_ring: NodeRingConfig {
                inner_radius: 0.52,
                outer_radius: 0.6,
                opacity: 0.2,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitRing {
    /// Multiple of the central radius.
    pub radius: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralNodeConfig {
    pub radius: f64,
    pub segments: usize,
    pub opacity: f64,
    pub emissive_intensity: f64,
    pub shell_scale: f64,
    pub shell_opacity: f64,
    pub rings: Vec<OrbitRing>,
    pub ring_spin: f64,
    pub pulse_amount: f64,
    pub pulse_speed: f64,
}

impl Default for CentralNodeConfig {
    fn default() -> Self {
        Self {
            radius: 0.6,
            segments: 32,
            opacity: 0.9,
            emissive_intensity: 1.2,
            shell_scale: 1.15,
            shell_opacity: 0.3,
            rings: vec![
                OrbitRing {
                    radius: 1.5,
                    opacity: 0.4,
                },
                OrbitRing {
                    radius: 1.9,
                    opacity: 0.25,
                },
            ],
            ring_spin: 0.005,
            pulse_amount: 0.05,
            pulse_speed: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub radius: f64,
    pub float_speed: f64,
    pub float_amount: f64,
    /// Maximum random angular offset per satellite; 0 keeps the exact layout.
    pub angle_jitter: f64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            radius: 2.5,
            float_speed: 0.8,
            float_amount: 0.3,
            angle_jitter: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatelliteNodeConfig {
    pub radius: f64,
    pub segments: usize,
    pub opacity: f64,
    pub emissive_intensity: f64,
    pub shell_scale: f64,
    pub shell_opacity: f64,
    pub ring_inner_radius: f64,
    pub ring_outer_radius: f64,
    pub ring_opacity: f64,
    pub ring_spin: f64,
    pub pulse_amount: f64,
    pub pulse_speed: f64,
    pub float_amount: f64,
    pub float_speed: f64,
}

impl Default for SatelliteNodeConfig {
    fn default() -> Self {
        Self {
            radius: 0.2,
            segments: 16,
            opacity: 0.85,
            emissive_intensity: 1.0,
            shell_scale: 1.1,
            shell_opacity: 0.4,
            ring_inner_radius: 0.28,
            ring_outer_radius: 0.32,
            ring_opacity: 0.5,
            ring_spin: 0.01,
            pulse_amount: 0.1,
            pulse_speed: 2.0,
            float_amount: 0.05,
            float_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub curve_height: f64,
    pub opacity: f64,
    pub divisions: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            curve_height: 0.4,
            opacity: 0.4,
            divisions: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    /// Logical canvas size; the bitmap is rendered at twice this.
    pub width: u32,
    pub height: u32,
    pub font_px: u32,
    /// Quad width in world units; height is `scale * aspect`.
    pub scale: f64,
    pub aspect: f64,
    /// Vertical offset above the node it labels.
    pub offset_y: f64,
    pub opacity: f64,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            width: 192,
            height: 48,
            font_px: 32,
            scale: 1.5,
            aspect: 0.3,
            offset_y: 0.4,
            opacity: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub central: LabelStyle,
    pub satellite: LabelStyle,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            central: LabelStyle {
                width: 256,
                height: 64,
                font_px: 48,
                scale: 2.5,
                offset_y: 0.8,
                ..LabelStyle::default()
            },
            satellite: LabelStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub central: CentralNodeConfig,
    pub orbit: OrbitConfig,
    pub satellite: SatelliteNodeConfig,
    pub connections: ConnectorConfig,
    pub labels: LabelConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationConfig {
    pub branch_rings: RingSettings,
    pub branch_particles: ParticleSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub pulse_speed: f64,
    pub pulse_amount: f64,
    pub float_speed: f64,
    pub float_amount: f64,
    /// Phase added per node index so neighbours do not pulse in lockstep.
    pub phase_step: f64,
    pub ring_spin: f64,
    pub glow_base: f64,
    pub glow_amount: f64,
    pub glow_speed: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            pulse_speed: 2.0,
            pulse_amount: 0.1,
            float_speed: 1.0,
            float_amount: 0.05,
            phase_step: 0.5,
            ring_spin: 0.01,
            glow_base: 0.8,
            glow_amount: 0.2,
            glow_speed: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewPreset {
    pub position: [f64; 3],
    pub target: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPresets {
    pub front: ViewPreset,
    pub side: ViewPreset,
    pub top: ViewPreset,
}

impl Default for CameraPresets {
    fn default() -> Self {
        Self {
            front: ViewPreset {
                position: [0.0, 5.0, 12.0],
                target: [0.0, 2.0, 0.0],
            },
            side: ViewPreset {
                position: [12.0, 5.0, 0.0],
                target: [0.0, 2.0, 0.0],
            },
            top: ViewPreset {
                position: [0.0, 15.0, 0.1],
                target: [0.0, 0.0, 0.0],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f64,
    pub near: f64,
    pub far: f64,
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub min_distance: f64,
    pub max_distance: f64,
    pub min_polar_angle: f64,
    pub max_polar_angle: f64,
    pub transition_ms: f64,
    pub auto_rotate: bool,
    /// Orbit speed multiplier; 1.0 is one revolution per minute.
    pub auto_rotate_speed: f64,
    pub focus_offset: [f64; 3],
    pub presets: CameraPresets,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 5.0, 12.0],
            target: [0.0, 2.0, 0.0],
            min_distance: 5.0,
            max_distance: 25.0,
            min_polar_angle: PI * 0.1,
            max_polar_angle: PI * 0.8,
            transition_ms: 1000.0,
            auto_rotate: false,
            auto_rotate_speed: 0.5,
            focus_offset: [3.0, 2.0, 3.0],
            presets: CameraPresets::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Pointer travel on either axis beyond which a press becomes a drag.
    pub drag_threshold_px: f64,
    pub hover_emissive_intensity: f64,
    pub hover_decoration_opacity: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 5.0,
            hover_emissive_intensity: 1.5,
            hover_decoration_opacity: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientParticleConfig {
    pub count: usize,
    pub radius_min: f64,
    pub radius_max: f64,
    pub height_min: f64,
    pub height_max: f64,
    /// Maximum drift per 1/60 s on each axis.
    pub velocity: [f64; 3],
    pub size: f64,
    pub opacity: f64,
}

impl Default for AmbientParticleConfig {
    fn default() -> Self {
        Self {
            count: 200,
            radius_min: 3.0,
            radius_max: 13.0,
            height_min: -3.0,
            height_max: 12.0,
            velocity: [0.002, 0.005, 0.002],
            size: 0.1,
            opacity: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowParticleConfig {
    pub count: usize,
    /// Progress gained per 1/60 s, where 1.0 is the full climb.
    pub speed: f64,
    pub start_y: f64,
    pub end_y: f64,
    pub radius: f64,
    pub size: f64,
    pub opacity: f64,
}

impl Default for FlowParticleConfig {
    fn default() -> Self {
        Self {
            count: 60,
            speed: 0.005,
            start_y: -1.0,
            end_y: 8.0,
            radius: 1.5,
            size: 0.15,
            opacity: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticlesConfig {
    pub enabled: bool,
    pub ambient: AmbientParticleConfig,
    pub flow: FlowParticleConfig,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ambient: AmbientParticleConfig::default(),
            flow: FlowParticleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    pub threshold: f64,
    pub strength: f64,
    pub radius: f64,
    pub exposure: f64,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            strength: 1.5,
            radius: 0.8,
            exposure: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub bloom_enabled: bool,
    pub bloom: BloomConfig,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            bloom_enabled: true,
            bloom: BloomConfig::default(),
        }
    }
}

// ─── Lights ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientLightConfig {
    pub color: u32,
    pub intensity: f64,
}

impl Default for AmbientLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    pub near: f64,
    pub far: f64,
    /// Half extent of the orthographic shadow frustum.
    pub size: f64,
    pub map_size: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 50.0,
            size: 15.0,
            map_size: 2048,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightConfig {
    pub color: u32,
    pub intensity: f64,
    pub position: [f64; 3],
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 0.5,
            position: [5.0, 10.0, 5.0],
            cast_shadow: true,
            shadow: ShadowConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLightConfig {
    pub color: u32,
    pub intensity: f64,
    pub distance: f64,
    pub position: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HemisphereLightConfig {
    pub sky_color: u32,
    pub ground_color: u32,
    pub intensity: f64,
}

impl Default for HemisphereLightConfig {
    fn default() -> Self {
        Self {
            sky_color: 0x0066ff,
            ground_color: 0x002244,
            intensity: 0.4,
        }
    }
}

/// Point light `i` runs at `base_intensity + sin(t * speed + i) * amount`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightPulseConfig {
    pub base_intensity: f64,
    pub speed: f64,
    pub amount: f64,
}

impl Default for LightPulseConfig {
    fn default() -> Self {
        Self {
            base_intensity: 2.0,
            speed: 0.5,
            amount: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotlightConfig {
    pub color: u32,
    /// Cone half angle in radians.
    pub angle: f64,
    pub penumbra: f64,
    pub decay: f64,
    pub distance: f64,
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub cast_shadow: bool,
    /// Intensity before anything has been selected.
    pub initial_intensity: f64,
    pub focus_intensity: f64,
    pub rest_intensity: f64,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            angle: PI / 6.0,
            penumbra: 0.3,
            decay: 2.0,
            distance: 20.0,
            position: [0.0, 10.0, 0.0],
            target: [0.0, 0.0, 0.0],
            cast_shadow: true,
            initial_intensity: 0.0,
            focus_intensity: 5.0,
            rest_intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub ambient: AmbientLightConfig,
    pub directional: DirectionalLightConfig,
    pub points: Vec<PointLightConfig>,
    pub hemisphere: HemisphereLightConfig,
    pub pulse: LightPulseConfig,
    pub spotlight: SpotlightConfig,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            ambient: AmbientLightConfig::default(),
            directional: DirectionalLightConfig::default(),
            points: vec![
                PointLightConfig {
                    color: 0x00ffff,
                    intensity: 1.0,
                    distance: 20.0,
                    position: [-5.0, 5.0, 5.0],
                },
                PointLightConfig {
                    color: 0xff00ff,
                    intensity: 0.8,
                    distance: 20.0,
                    position: [5.0, 5.0, -5.0],
                },
            ],
            hemisphere: HemisphereLightConfig::default(),
            pulse: LightPulseConfig::default(),
            spotlight: SpotlightConfig::default(),
        }
    }
}

// ─── Root ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Base seed for every jitter and particle generator.
    pub seed: u64,
    pub palette: AreaPalette,
    pub roots: RootsConfig,
    pub trunk: TrunkConfig,
    pub branches: BranchConfig,
    pub nodes: NodeConfig,
    pub clusters: ClusterConfig,
    pub decorations: DecorationConfig,
    pub animation: AnimationConfig,
    pub camera: CameraConfig,
    pub interaction: InteractionConfig,
    pub particles: ParticlesConfig,
    pub effects: EffectsConfig,
    pub lights: LightsConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            seed: 0x6b6e_7472,
            palette: AreaPalette::default(),
            roots: RootsConfig::default(),
            trunk: TrunkConfig::default(),
            branches: BranchConfig::default(),
            nodes: NodeConfig::default(),
            clusters: ClusterConfig::default(),
            decorations: DecorationConfig::default(),
            animation: AnimationConfig::default(),
            camera: CameraConfig::default(),
            interaction: InteractionConfig::default(),
            particles: ParticlesConfig::default(),
            effects: EffectsConfig::default(),
            lights: LightsConfig::default(),
        }
    }
}

impl TreeConfig {
    /// Parses a (possibly partial) JSON document and validates the result.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let roots = &self.roots;
        require_positive("roots.stem_radius_top", roots.stem_radius_top)?;
        require_positive("roots.stem_radius_bottom", roots.stem_radius_bottom)?;
        require_positive("roots.stem_height", roots.stem_height)?;
        require_min("roots.stem_segments", roots.stem_segments, 3)?;
        require_positive("roots.connection_radius_start", roots.connection_radius_start)?;
        require_positive("roots.connection_radius_end", roots.connection_radius_end)?;
        require_positive("roots.connection_taper_exponent", roots.connection_taper_exponent)?;
        require_min("roots.connection_segments", roots.connection_segments, 8)?;
        require_min("roots.connection_radial_segments", roots.connection_radial_segments, 6)?;

        let trunk = &self.trunk;
        require_positive("trunk.radius_top", trunk.radius_top)?;
        require_positive("trunk.radius_bottom", trunk.radius_bottom)?;
        require_positive("trunk.height", trunk.height)?;
        require_min("trunk.tubular_segments", trunk.tubular_segments, 8)?;
        require_min("trunk.radial_segments", trunk.radial_segments, 6)?;
        if !(0.0..=1.0).contains(&trunk.spine_tension) {
            return Err(invalid("trunk.spine_tension", "must be within [0, 1]"));
        }
        require_non_negative("trunk.spine_jitter", trunk.spine_jitter)?;
        trunk.rings.validate("trunk.rings")?;

        let branches = &self.branches;
        require_positive("branches.radius_start", branches.radius_start)?;
        require_positive("branches.radius_end", branches.radius_end)?;
        require_positive("branches.taper_exponent", branches.taper_exponent)?;
        require_min("branches.tubular_segments", branches.tubular_segments, 8)?;
        require_min("branches.radial_segments", branches.radial_segments, 6)?;
        require_non_negative("branches.jitter_amplitude", branches.jitter_amplitude)?;

        require_positive("nodes.radius", self.nodes.radius)?;
        require_min("nodes.segments", self.nodes.segments, 3)?;

        let clusters = &self.clusters;
        require_positive("clusters.central.radius", clusters.central.radius)?;
        require_positive("clusters.satellite.radius", clusters.satellite.radius)?;
        require_positive("clusters.orbit.radius", clusters.orbit.radius)?;
        require_non_negative("clusters.orbit.angle_jitter", clusters.orbit.angle_jitter)?;
        require_min("clusters.connections.divisions", clusters.connections.divisions, 1)?;

        self.decorations.branch_rings.validate("decorations.branch_rings")?;
        require_positive(
            "decorations.branch_particles.radius",
            self.decorations.branch_particles.radius,
        )?;

        let camera = &self.camera;
        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(invalid("camera.fov", format!("must be within (0, 180), got {}", camera.fov)));
        }
        require_positive("camera.near", camera.near)?;
        if camera.far <= camera.near {
            return Err(invalid("camera.far", "must be greater than camera.near"));
        }
        require_positive("camera.min_distance", camera.min_distance)?;
        if camera.max_distance < camera.min_distance {
            return Err(invalid("camera.max_distance", "must be >= camera.min_distance"));
        }
        if camera.max_polar_angle < camera.min_polar_angle {
            return Err(invalid("camera.max_polar_angle", "must be >= camera.min_polar_angle"));
        }
        require_non_negative("camera.transition_ms", camera.transition_ms)?;

        require_non_negative(
            "interaction.drag_threshold_px",
            self.interaction.drag_threshold_px,
        )?;

        let ambient = &self.particles.ambient;
        if ambient.radius_max < ambient.radius_min {
            return Err(invalid("particles.ambient.radius_max", "must be >= radius_min"));
        }
        if ambient.height_max < ambient.height_min {
            return Err(invalid("particles.ambient.height_max", "must be >= height_min"));
        }
        require_non_negative("particles.flow.speed", self.particles.flow.speed)?;

        let lights = &self.lights;
        require_non_negative("lights.ambient.intensity", lights.ambient.intensity)?;
        require_non_negative("lights.directional.intensity", lights.directional.intensity)?;
        require_non_negative("lights.hemisphere.intensity", lights.hemisphere.intensity)?;
        for point in &lights.points {
            require_non_negative("lights.points.intensity", point.intensity)?;
            require_non_negative("lights.points.distance", point.distance)?;
        }
        require_non_negative("lights.pulse.base_intensity", lights.pulse.base_intensity)?;
        if lights.pulse.amount.abs() > lights.pulse.base_intensity {
            return Err(invalid(
                "lights.pulse.amount",
                "must not exceed base_intensity or intensities turn negative",
            ));
        }
        let spot = &lights.spotlight;
        if !(spot.angle > 0.0 && spot.angle <= PI / 2.0) {
            return Err(invalid(
                "lights.spotlight.angle",
                format!("must be within (0, PI/2], got {}", spot.angle),
            ));
        }
        if !(0.0..=1.0).contains(&spot.penumbra) {
            return Err(invalid("lights.spotlight.penumbra", "must be within [0, 1]"));
        }
        require_non_negative("lights.spotlight.focus_intensity", spot.focus_intensity)?;
        require_non_negative("lights.spotlight.rest_intensity", spot.rest_intensity)?;
        require_non_negative("lights.spotlight.initial_intensity", spot.initial_intensity)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        TreeConfig::default().validate().expect("default config is valid");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = TreeConfig::from_json(r#"{ "interaction": { "drag_threshold_px": 8.0 } }"#)
            .expect("parse");
        assert_eq!(config.interaction.drag_threshold_px, 8.0);
        assert_eq!(config.interaction.hover_emissive_intensity, 1.5);
        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(config.palette.get("ia"), Some(0x9d00ff));
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let mut config = TreeConfig::default();
        config.seed = 42;
        config.palette.insert("gamedev", 0x123456);
        config.trunk.height = 9.0;
        let json = config.to_json().unwrap();
        assert_eq!(TreeConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = TreeConfig::from_json(r#"{ "branches": { "tubular_segments": 4 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "branches.tubular_segments",
                ..
            }
        ));

        let err = TreeConfig::from_json(r#"{ "camera": { "near": 5.0, "far": 1.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "camera.far", .. }));

        assert!(matches!(
            TreeConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn light_rig_defaults_and_overrides() {
        let lights = LightsConfig::default();
        assert_eq!(lights.points.len(), 2);
        assert_eq!(lights.points[1].color, 0xff00ff);
        assert_eq!(lights.spotlight.focus_intensity, 5.0);
        assert_eq!(lights.spotlight.rest_intensity, 1.0);

        let config = TreeConfig::from_json(r#"{ "lights": { "pulse": { "speed": 1.5 } } }"#).unwrap();
        assert_eq!(config.lights.pulse.speed, 1.5);
        assert_eq!(config.lights.pulse.base_intensity, 2.0);
        assert_eq!(config.lights.points, lights.points);

        let err = TreeConfig::from_json(r#"{ "lights": { "pulse": { "amount": 3.0 } } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "lights.pulse.amount", .. }));
        let err = TreeConfig::from_json(r#"{ "lights": { "spotlight": { "angle": 2.0 } } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "lights.spotlight.angle", .. }));
    }

    #[test]
    fn palette_falls_back_to_fundamentos() {
        let palette = AreaPalette::default();
        assert_eq!(palette.color_or_fallback("web"), 0x00bfff);
        assert_eq!(palette.color_or_fallback("quimica"), 0x00ffff);

        let mut custom = AreaPalette::new(BTreeMap::new());
        assert_eq!(custom.fallback(), AreaPalette::FALLBACK_COLOR);
        custom.insert("fundamentos", 0x112233);
        assert_eq!(custom.color_or_fallback("unknown"), 0x112233);
    }
}
