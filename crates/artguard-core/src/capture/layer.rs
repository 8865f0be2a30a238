//! Layer identity and the capability matrix that enumerates layers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A viewpoint around the artwork.
///
/// Declaration order is enumeration order: capture iterates directions in this
/// order and the quality scorer breaks ties in favour of earlier variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Main,
    Detail,
    Left,
    Right,
    Top,
    Bottom,
}

impl Direction {
    /// All directions in enumeration order.
    pub const ALL: [Direction; 6] = [
        Direction::Main,
        Direction::Detail,
        Direction::Left,
        Direction::Right,
        Direction::Top,
        Direction::Bottom,
    ];

    /// Short tag used in layer ids and embed messages.
    pub fn tag(self) -> &'static str {
        match self {
            Direction::Main => "main",
            Direction::Detail => "detail",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Top => "top",
            Direction::Bottom => "bottom",
        }
    }

    /// Parses a tag produced by [`Direction::tag`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.tag() == tag)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A structural rendering channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapType {
    Depth,
    Normal,
    AmbientOcclusion,
    Curvature,
    /// The unprocessed colour render, only present when the matrix includes plain images.
    PlainImage,
}

impl MapType {
    pub const ALL: [MapType; 5] = [
        MapType::Depth,
        MapType::Normal,
        MapType::AmbientOcclusion,
        MapType::Curvature,
        MapType::PlainImage,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            MapType::Depth => "depth",
            MapType::Normal => "normal",
            MapType::AmbientOcclusion => "ao",
            MapType::Curvature => "curvature",
            MapType::PlainImage => "image",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.tag() == tag)
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Identity of one layer within a protection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerKey {
    pub direction: Direction,
    pub map_type: MapType,
}

impl LayerKey {
    pub fn new(direction: Direction, map_type: MapType) -> Self {
        Self {
            direction,
            map_type,
        }
    }

    /// Wire identifier, `<direction-tag>_<maptype-tag>`.
    pub fn layer_id(&self) -> String {
        format!("{}_{}", self.direction.tag(), self.map_type.tag())
    }

    /// Parses a wire identifier back into a key.
    pub fn parse(layer_id: &str) -> Option<Self> {
        let (direction, map_type) = layer_id.split_once('_')?;
        Some(Self::new(
            Direction::from_tag(direction)?,
            MapType::from_tag(map_type)?,
        ))
    }

    /// Per-layer embed payload, `<direction-tag>_<maptype-tag>_<sessionId>`.
    pub fn message(&self, session_id: &str) -> String {
        format!("{}_{}", self.layer_id(), session_id)
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.direction.tag(), self.map_type.tag())
    }
}

/// Named matrix configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixPreset {
    /// 6 directions x {depth, normal, ao} = 18 layers
    #[default]
    Standard,
    /// 6 directions x {depth, normal, ao, curvature} = 24 layers
    Extended,
    /// 6 directions x ({depth, normal, ao, curvature} + plain image) = 30 layers
    Full,
}

impl std::str::FromStr for MatrixPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "extended" => Ok(Self::Extended),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown matrix preset '{}'", other)),
        }
    }
}

/// The capability matrix: which directions and map types one cycle captures.
///
/// A single parameterized descriptor replaces per-layer-count pipeline variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMatrix {
    pub directions: Vec<Direction>,
    pub map_types: Vec<MapType>,
    /// Adds one [`MapType::PlainImage`] layer per direction.
    #[serde(default)]
    pub include_plain_image: bool,
}

impl LayerMatrix {
    pub fn from_preset(preset: MatrixPreset) -> Self {
        let mut map_types = vec![MapType::Depth, MapType::Normal, MapType::AmbientOcclusion];
        if matches!(preset, MatrixPreset::Extended | MatrixPreset::Full) {
            map_types.push(MapType::Curvature);
        }
        Self {
            directions: Direction::ALL.to_vec(),
            map_types,
            include_plain_image: preset == MatrixPreset::Full,
        }
    }

    /// Names the first direction or map type listed more than once.
    pub fn first_duplicate(&self) -> Option<String> {
        if let Some(d) = first_repeat(&self.directions) {
            return Some(format!("direction '{}'", d.tag()));
        }
        first_repeat(&self.map_types).map(|m| format!("map type '{}'", m.tag()))
    }

    /// Map types captured for every direction, plain image last when enabled.
    pub fn map_types_per_direction(&self) -> Vec<MapType> {
        let mut types: Vec<MapType> = self
            .map_types
            .iter()
            .copied()
            .filter(|m| *m != MapType::PlainImage)
            .collect();
        if self.include_plain_image {
            types.push(MapType::PlainImage);
        }
        types
    }

    /// Layer keys in capture order (direction-major).
    pub fn layers(&self) -> Vec<LayerKey> {
        let map_types = self.map_types_per_direction();
        self.directions
            .iter()
            .flat_map(|d| map_types.iter().map(move |m| LayerKey::new(*d, *m)))
            .collect()
    }

    /// Total number of layers one cycle produces.
    pub fn layer_count(&self) -> usize {
        self.directions.len() * self.map_types_per_direction().len()
    }
}

impl Default for LayerMatrix {
    fn default() -> Self {
        Self::from_preset(MatrixPreset::default())
    }
}

/// Watermark intensity per map type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthTable {
    pub depth: f32,
    pub normal: f32,
    pub ambient_occlusion: f32,
    pub curvature: f32,
    pub plain_image: f32,
}

impl StrengthTable {
    /// The first map type whose strength is not a finite value in `[0, 1]`.
    pub fn first_out_of_range(&self) -> Option<(MapType, f32)> {
        MapType::ALL
            .into_iter()
            .map(|m| (m, self.strength_for(m)))
            .find(|(_, s)| !s.is_finite() || !(0.0..=1.0).contains(s))
    }

    pub fn strength_for(&self, map_type: MapType) -> f32 {
        match map_type {
            MapType::Depth => self.depth,
            MapType::Normal => self.normal,
            MapType::AmbientOcclusion => self.ambient_occlusion,
            MapType::Curvature => self.curvature,
            MapType::PlainImage => self.plain_image,
        }
    }
}

impl Default for StrengthTable {
    fn default() -> Self {
        Self {
            depth: 0.8,
            normal: 0.7,
            ambient_occlusion: 0.6,
            curvature: 0.65,
            plain_image: 0.5,
        }
    }
}

fn first_repeat<T: Copy + Eq + std::hash::Hash>(items: &[T]) -> Option<T> {
    let mut seen = std::collections::HashSet::new();
    items.iter().copied().find(|item| !seen.insert(*item))
}
