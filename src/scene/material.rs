//! Surface descriptors shared by every drawable in the tree.
//!
//! A [`MaterialFactory`] keeps one template per (area, kind) pair and hands out
//! clones, so nodes can mutate their own opacity and emissive intensity during
//! hover and animation without touching siblings.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::AreaPalette;

// ─── Color ───────────────────────────────────────────────────────────────────

/// Linear RGB with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| f64::from((hex >> shift) & 0xff) / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    #[must_use]
    pub fn to_hex(self) -> u32 {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// `#rrggbb`.
    #[must_use]
    pub fn to_css(self) -> String {
        format!("#{:06x}", self.to_hex())
    }

    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Hue, saturation and lightness all in `[0, 1]`.
    #[must_use]
    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        if s == 0.0 {
            return Self::new(l, l, l);
        }
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let channel = |t: f64| {
            let t = t.rem_euclid(1.0);
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * 6.0 * (2.0 / 3.0 - t)
            } else {
                p
            }
        };
        Self::new(channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
    }

    #[must_use]
    pub fn to_array(self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

// ─── Kinds and presets ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Wireframe shells around nodes and root stems.
    Hologram,
    Tube,
    Node,
    Line,
    Ring,
    Edges,
    Particle,
    Label,
}

impl MaterialKind {
    pub const ALL: [Self; 8] = [
        Self::Hologram,
        Self::Tube,
        Self::Node,
        Self::Line,
        Self::Ring,
        Self::Edges,
        Self::Particle,
        Self::Label,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hologram => "hologram",
            Self::Tube => "tube",
            Self::Node => "node",
            Self::Line => "line",
            Self::Ring => "ring",
            Self::Edges => "edges",
            Self::Particle => "particle",
            Self::Label => "label",
        }
    }

    #[must_use]
    pub const fn preset(self) -> MaterialPreset {
        match self {
            Self::Hologram => MaterialPreset {
                opacity: 0.7,
                emissive_intensity: 0.8,
                metalness: 0.9,
                roughness: 0.2,
                wireframe: true,
                double_sided: true,
                blending: Blending::Normal,
                lit: true,
            },
            Self::Tube => MaterialPreset {
                opacity: 0.8,
                emissive_intensity: 1.0,
                metalness: 0.9,
                roughness: 0.1,
                wireframe: false,
                double_sided: true,
                blending: Blending::Normal,
                lit: true,
            },
            Self::Node => MaterialPreset {
                opacity: 0.9,
                emissive_intensity: 1.0,
                metalness: 0.8,
                roughness: 0.2,
                wireframe: false,
                double_sided: false,
                blending: Blending::Normal,
                lit: true,
            },
            Self::Line => MaterialPreset {
                opacity: 0.4,
                ..MaterialPreset::UNLIT
            },
            Self::Ring => MaterialPreset {
                opacity: 0.3,
                double_sided: true,
                ..MaterialPreset::UNLIT
            },
            Self::Edges => MaterialPreset {
                opacity: 0.9,
                blending: Blending::Additive,
                ..MaterialPreset::UNLIT
            },
            Self::Particle => MaterialPreset {
                opacity: 0.8,
                blending: Blending::Additive,
                ..MaterialPreset::UNLIT
            },
            Self::Label => MaterialPreset {
                opacity: 0.95,
                ..MaterialPreset::UNLIT
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Blending {
    Normal,
    Additive,
}

/// Per-kind surface defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialPreset {
    pub opacity: f64,
    pub emissive_intensity: f64,
    pub metalness: f64,
    pub roughness: f64,
    pub wireframe: bool,
    pub double_sided: bool,
    pub blending: Blending,
    /// `false` for flat-shaded basic materials (lines, rings, sprites).
    pub lit: bool,
}

impl MaterialPreset {
    const UNLIT: Self = Self {
        opacity: 1.0,
        emissive_intensity: 0.0,
        metalness: 0.0,
        roughness: 1.0,
        wireframe: false,
        double_sided: false,
        blending: Blending::Normal,
        lit: false,
    };
}

// ─── Surface material ────────────────────────────────────────────────────────

/// Base values saved while a node is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaterialRestore {
    pub emissive_intensity: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceMaterial {
    pub kind: MaterialKind,
    pub color: Color,
    pub emissive: Color,
    pub emissive_intensity: f64,
    pub opacity: f64,
    pub transparent: bool,
    pub metalness: f64,
    pub roughness: f64,
    pub wireframe: bool,
    pub double_sided: bool,
    pub blending: Blending,
    pub depth_test: bool,
    pub depth_write: bool,
    pub lit: bool,
}

impl SurfaceMaterial {
    #[must_use]
    pub fn new(kind: MaterialKind, color: Color) -> Self {
        let preset = kind.preset();
        Self {
            kind,
            color,
            emissive: color,
            emissive_intensity: preset.emissive_intensity,
            opacity: preset.opacity,
            transparent: true,
            metalness: preset.metalness,
            roughness: preset.roughness,
            wireframe: preset.wireframe,
            double_sided: preset.double_sided,
            blending: preset.blending,
            // Labels draw on top of the geometry they annotate.
            depth_test: kind != MaterialKind::Label,
            depth_write: !matches!(preset.blending, Blending::Additive),
            lit: preset.lit,
        }
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    #[must_use]
    pub fn with_emissive_intensity(mut self, intensity: f64) -> Self {
        self.emissive_intensity = intensity;
        self
    }

    #[must_use]
    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    #[must_use]
    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self.depth_write = blending == Blending::Normal;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self.emissive = color;
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> MaterialRestore {
        MaterialRestore {
            emissive_intensity: self.emissive_intensity,
            opacity: self.opacity,
        }
    }

    pub fn restore(&mut self, saved: MaterialRestore) {
        self.emissive_intensity = saved.emissive_intensity;
        self.opacity = saved.opacity;
    }
}

// ─── Factory ─────────────────────────────────────────────────────────────────

/// Resolves area tags to colors and caches one template per (area, kind).
///
/// Unknown tags resolve to the palette fallback. Each distinct unknown tag is
/// logged once and queued for the build summary.
#[derive(Debug, Clone)]
pub struct MaterialFactory {
    palette: AreaPalette,
    cache: BTreeMap<(String, MaterialKind), SurfaceMaterial>,
    seen_unknown: BTreeSet<String>,
    pending_unknown: Vec<String>,
}

impl MaterialFactory {
    #[must_use]
    pub fn new(palette: AreaPalette) -> Self {
        Self {
            palette,
            cache: BTreeMap::new(),
            seen_unknown: BTreeSet::new(),
            pending_unknown: Vec::new(),
        }
    }

    #[must_use]
    pub fn palette(&self) -> &AreaPalette {
        &self.palette
    }

    /// Area color, or the fallback when the tag is not in the palette.
    pub fn color_for(&mut self, area: &str) -> Color {
        match self.palette.get(area) {
            Some(hex) => Color::from_hex(hex),
            None => {
                self.note_unknown(area);
                Color::from_hex(self.palette.fallback())
            }
        }
    }

    pub fn material(&mut self, area: &str, kind: MaterialKind) -> SurfaceMaterial {
        let key = (area.to_string(), kind);
        if let Some(template) = self.cache.get(&key) {
            return template.clone();
        }

        let color = self.color_for(area);
        let template = SurfaceMaterial::new(kind, color);
        self.cache.insert(key, template.clone());
        template
    }

    /// Number of cached templates.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.cache.len()
    }

    /// Every unknown tag seen so far, sorted.
    #[must_use]
    pub fn unknown_areas(&self) -> Vec<String> {
        self.seen_unknown.iter().cloned().collect()
    }

    /// Unknown tags recorded since the last call.
    pub fn take_unknown_areas(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_unknown)
    }

    fn note_unknown(&mut self, area: &str) {
        if self.seen_unknown.insert(area.to_string()) {
            log::warn!(
                "unknown knowledge area `{area}`, using fallback color {}",
                Color::from_hex(self.palette.fallback()).to_css()
            );
            self.pending_unknown.push(area.to_string());
        }
    }
}
