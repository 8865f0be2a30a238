//! Procedural image source for running the pipeline without a VR host.
//!
//! Every view renders a shaded disc whose tint depends on the direction and
//! whose shading depends on the map type, then encodes it as binary PPM.

use artguard_core::capture::{Direction, ImageSource, MapType, PixelBuffer, ViewRequest};
use artguard_core::error::Result;
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct SyntheticImageSource;

impl SyntheticImageSource {
    pub fn new() -> Self {
        Self
    }

    fn tint(direction: Direction) -> [f32; 3] {
        match direction {
            Direction::Main => [0.9, 0.4, 0.3],
            Direction::Detail => [0.8, 0.6, 0.2],
            Direction::Left => [0.3, 0.7, 0.4],
            Direction::Right => [0.3, 0.5, 0.8],
            Direction::Top => [0.6, 0.6, 0.6],
            Direction::Bottom => [0.4, 0.3, 0.5],
        }
    }

    /// Shade in `[0, 1]` for a point at normalized offset `(dx, dy)` inside the disc.
    fn shade(map_type: MapType, dx: f32, dy: f32) -> f32 {
        let r2 = (dx * dx + dy * dy).min(1.0);
        let dz = (1.0 - r2).sqrt();
        match map_type {
            MapType::Depth => dz,
            MapType::Normal => 0.5 + 0.5 * dx,
            MapType::AmbientOcclusion => 0.3 + 0.7 * dz * dz,
            MapType::Curvature => 0.5 + 0.5 * (r2 * 6.0).sin(),
            MapType::PlainImage => 0.6 + 0.4 * dy,
        }
    }
}

/// Byte offset of pixel `(x, y)` in an RGBA buffer `width` pixels wide.
fn pixel_offset(x: u32, y: u32, width: u32) -> usize {
    (y as usize * width as usize + x as usize) * 4
}

/// Encodes RGBA pixels as binary PPM (alpha dropped).
pub fn encode_ppm(buffer: &PixelBuffer) -> Vec<u8> {
    let header = format!("P6\n{} {}\n255\n", buffer.width, buffer.height);
    let mut out = Vec::with_capacity(header.len() + buffer.pixel_count() * 3);
    out.extend_from_slice(header.as_bytes());
    for [r, g, b, _] in buffer.pixels() {
        out.extend_from_slice(&[r, g, b]);
    }
    out
}

#[async_trait]
impl ImageSource for SyntheticImageSource {
    async fn capture(&self, request: &ViewRequest, buffer: &mut PixelBuffer) -> Result<Vec<u8>> {
        let width = request.width.max(1);
        let height = request.height.max(1);
        buffer.reset(width, height);

        let tint = Self::tint(request.direction);
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        // Larger artworks fill more of the frame.
        let fill = (0.35 + request.bounds.radius() * 0.3).clamp(0.35, 0.48);
        let radius = width.min(height) as f32 * fill;

        for y in 0..height {
            for x in 0..width {
                let dx = (x as f32 + 0.5 - cx) / radius;
                let dy = (y as f32 + 0.5 - cy) / radius;
                let offset = pixel_offset(x, y, width);
                let px = &mut buffer.rgba[offset..offset + 4];

                if dx * dx + dy * dy > 1.0 {
                    px.copy_from_slice(&[0, 0, 0, 0]);
                    continue;
                }
                let shade = Self::shade(request.map_type, dx, dy);
                for (channel, t) in px.iter_mut().zip(tint) {
                    *channel = (t * shade * 255.0).round().clamp(0.0, 255.0) as u8;
                }
                px[3] = 255;
            }
        }

        Ok(encode_ppm(buffer))
    }
}
