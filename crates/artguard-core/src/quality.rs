//! Preview quality scoring.
//!
//! Scores decide which capture is shown to people as the primary preview.
//! They never decide whether a layer is sent for protection.

use crate::capture::{CaptureJob, Direction, PixelBuffer};

const CONTENT_WEIGHT: f32 = 0.4;
const SATURATION_WEIGHT: f32 = 0.3;
const CONTRAST_WEIGHT: f32 = 0.3;

/// Pixels more transparent than this are background.
const BACKGROUND_ALPHA: u8 = 26;
/// Pixels whose brightest channel is below this are background.
const BACKGROUND_LEVEL: u8 = 13;

/// Breakdown of the score before the direction weight is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QualityMetrics {
    pub content_ratio: f32,
    pub avg_saturation: f32,
    pub avg_contrast: f32,
}

impl QualityMetrics {
    pub fn measure(image: &PixelBuffer) -> Self {
        let count = image.pixel_count();
        if count == 0 {
            return Self::default();
        }

        let mut content = 0usize;
        let mut saturation = 0.0f64;
        let mut contrast = 0.0f64;

        for [r, g, b, a] in image.pixels() {
            let max = r.max(g).max(b);
            let min = r.min(g).min(b);

            if a >= BACKGROUND_ALPHA && max >= BACKGROUND_LEVEL {
                content += 1;
            }
            if max > 0 {
                saturation += f64::from(max - min) / f64::from(max);
            }
            let brightness = (f64::from(r) + f64::from(g) + f64::from(b)) / (3.0 * 255.0);
            contrast += (brightness - 0.5).abs() * 2.0;
        }

        let n = count as f64;
        Self {
            content_ratio: (content as f64 / n) as f32,
            avg_saturation: (saturation / n) as f32,
            avg_contrast: (contrast / n) as f32,
        }
    }

    pub fn weighted(&self) -> f32 {
        CONTENT_WEIGHT * self.content_ratio
            + SATURATION_WEIGHT * self.avg_saturation
            + CONTRAST_WEIGHT * self.avg_contrast
    }
}

/// Scores captured views and picks the primary preview.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Viewpoint preference: the main view is favoured, the bottom view least.
    pub fn direction_weight(direction: Direction) -> f32 {
        match direction {
            Direction::Main => 1.0,
            Direction::Detail => 0.9,
            Direction::Left | Direction::Right => 0.8,
            Direction::Top => 0.7,
            Direction::Bottom => 0.6,
        }
    }

    /// Returns a score in `[0, 1]`.
    pub fn score(&self, image: &PixelBuffer, direction: Direction) -> f32 {
        let raw = QualityMetrics::measure(image).weighted() * Self::direction_weight(direction);
        if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
    }

    /// Picks the highest-scoring job; ties go to the first-enumerated direction.
    ///
    /// Returns `None` only for an empty slice.
    pub fn select_primary<'a>(&self, jobs: &'a [CaptureJob]) -> Option<&'a CaptureJob> {
        jobs.iter().fold(None, |best: Option<&CaptureJob>, job| match best {
            None => Some(job),
            Some(current) => {
                let better = job.quality_score > current.quality_score
                    || (job.quality_score == current.quality_score
                        && job.direction < current.direction);
                Some(if better { job } else { current })
            }
        })
    }
}
