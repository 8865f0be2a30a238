//! Seams to the host renderer: where images and artwork bounds come from.

use super::layer::{Direction, MapType};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounds of the artwork in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtworkBounds {
    pub center: [f32; 3],
    pub extents: [f32; 3],
}

impl ArtworkBounds {
    /// Longest half-extent, used by renderers to frame the artwork.
    pub fn radius(&self) -> f32 {
        self.extents.iter().fold(0.0_f32, |acc, e| acc.max(e.abs()))
    }
}

/// Narrow read-only view of the artwork's placement.
pub trait ArtworkBoundsProvider: Send + Sync {
    fn bounds(&self) -> ArtworkBounds;
}

/// Bounds that never change, for hosts with a fixed canvas and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBounds(pub ArtworkBounds);

impl ArtworkBoundsProvider for StaticBounds {
    fn bounds(&self) -> ArtworkBounds {
        self.0
    }
}

/// One capture request handed to the [`ImageSource`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRequest {
    pub direction: Direction,
    pub map_type: MapType,
    pub bounds: ArtworkBounds,
    pub width: u32,
    pub height: u32,
}

/// RGBA8 pixel storage backing one capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PixelBuffer {
    /// Resizes to `width x height`, zero-filling. Keeps the allocation when it is large enough.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.rgba.clear();
        self.rgba.resize(width as usize * height as usize * 4, 0);
    }

    /// Iterates pixels as `[r, g, b, a]`. A trailing partial pixel is ignored.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.rgba
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    pub fn pixel_count(&self) -> usize {
        self.rgba.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.rgba.len() < 4
    }
}

/// Produces still images of the artwork.
///
/// Implementations render the requested view into `buffer` (raw RGBA, used for
/// quality scoring) and return the encoded image that is sent for protection.
/// The buffer arrives zeroed and sized to the request.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn capture(&self, request: &ViewRequest, buffer: &mut PixelBuffer) -> Result<Vec<u8>>;
}
