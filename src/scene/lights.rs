//! Light rig for renderers that draw the tree.
//!
//! The crate does no shading; it keeps the state a renderer needs to place
//! and drive its lights. Point lights pulse with elapsed time and the
//! spotlight follows the selection.

use serde::Serialize;

use crate::config::{
    AmbientLightConfig, DirectionalLightConfig, HemisphereLightConfig, LightPulseConfig,
    LightsConfig, SpotlightConfig,
};
use crate::geom::Point3;

use super::material::Color;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f64,
    pub position: [f64; 3],
    pub cast_shadow: bool,
    pub shadow_near: f64,
    pub shadow_far: f64,
    pub shadow_size: f64,
    pub shadow_map_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f64,
    pub distance: f64,
    pub position: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HemisphereLight {
    pub sky_color: Color,
    pub ground_color: Color,
    pub intensity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spotlight {
    pub color: Color,
    pub intensity: f64,
    pub angle: f64,
    pub penumbra: f64,
    pub decay: f64,
    pub distance: f64,
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub cast_shadow: bool,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightRig {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    pub points: Vec<PointLight>,
    pub hemisphere: HemisphereLight,
    pub spotlight: Spotlight,
    #[serde(skip)]
    pulse: LightPulseConfig,
    #[serde(skip)]
    focus_intensity: f64,
    #[serde(skip)]
    rest_intensity: f64,
}

impl LightRig {
    #[must_use]
    pub fn new(config: &LightsConfig) -> Self {
        let AmbientLightConfig { color, intensity } = config.ambient;
        let ambient = AmbientLight {
            color: Color::from_hex(color),
            intensity,
        };

        let DirectionalLightConfig {
            color,
            intensity,
            position,
            cast_shadow,
            shadow,
        } = config.directional;
        let directional = DirectionalLight {
            color: Color::from_hex(color),
            intensity,
            position,
            cast_shadow,
            shadow_near: shadow.near,
            shadow_far: shadow.far,
            shadow_size: shadow.size,
            shadow_map_size: shadow.map_size,
        };

        let points = config
            .points
            .iter()
            .map(|point| PointLight {
                color: Color::from_hex(point.color),
                intensity: point.intensity,
                distance: point.distance,
                position: point.position,
            })
            .collect();

        let HemisphereLightConfig {
            sky_color,
            ground_color,
            intensity,
        } = config.hemisphere;
        let hemisphere = HemisphereLight {
            sky_color: Color::from_hex(sky_color),
            ground_color: Color::from_hex(ground_color),
            intensity,
        };

        let spot: &SpotlightConfig = &config.spotlight;
        let spotlight = Spotlight {
            color: Color::from_hex(spot.color),
            intensity: spot.initial_intensity,
            angle: spot.angle,
            penumbra: spot.penumbra,
            decay: spot.decay,
            distance: spot.distance,
            position: spot.position,
            target: spot.target,
            cast_shadow: spot.cast_shadow,
            focused: false,
        };

        Self {
            ambient,
            directional,
            points,
            hemisphere,
            spotlight,
            pulse: config.pulse,
            focus_intensity: spot.focus_intensity,
            rest_intensity: spot.rest_intensity,
        }
    }

    /// Sets every point light for `elapsed` seconds; the index offsets the phase.
    pub fn pulse(&mut self, elapsed: f64) {
        let LightPulseConfig {
            base_intensity,
            speed,
            amount,
        } = self.pulse;
        for (i, light) in self.points.iter_mut().enumerate() {
            light.intensity = base_intensity + (elapsed * speed + i as f64).sin() * amount;
        }
    }

    /// Aims the spotlight at `point` at focus intensity.
    pub fn focus_on(&mut self, point: Point3) {
        self.spotlight.target = point.to_array();
        self.spotlight.intensity = self.focus_intensity;
        self.spotlight.focused = true;
    }

    /// Dims the spotlight to its rest intensity. The target stays where it was.
    pub fn unfocus(&mut self) {
        self.spotlight.intensity = self.rest_intensity;
        self.spotlight.focused = false;
    }

    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.spotlight.focused
    }
}
