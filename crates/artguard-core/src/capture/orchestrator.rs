use super::job::CaptureJob;
use super::layer::{LayerKey, LayerMatrix, StrengthTable};
use super::pool::BufferPool;
use super::source::{ArtworkBounds, ArtworkBoundsProvider, ImageSource, ViewRequest};
use crate::config::CaptureConfig;
use crate::quality::QualityScorer;
use crate::session::CreationSession;
use chrono::Utc;
use std::sync::Arc;

/// Captures the full layer matrix for one protection cycle.
///
/// Capture always yields exactly [`LayerMatrix::layer_count`] jobs in
/// direction-major order. A failed image request degrades that one job to an
/// empty placeholder instead of shortening the list.
pub struct CaptureOrchestrator {
    source: Arc<dyn ImageSource>,
    bounds: Arc<dyn ArtworkBoundsProvider>,
    pool: BufferPool,
    scorer: QualityScorer,
    matrix: LayerMatrix,
    strengths: StrengthTable,
    yield_every: usize,
    width: u32,
    height: u32,
}

impl CaptureOrchestrator {
    pub fn new(
        source: Arc<dyn ImageSource>,
        bounds: Arc<dyn ArtworkBoundsProvider>,
        pool: BufferPool,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            source,
            bounds,
            pool,
            scorer: QualityScorer::new(),
            matrix: config.layer_matrix(),
            strengths: config.strengths,
            yield_every: config.yield_every.max(1),
            width: config.image_width,
            height: config.image_height,
        }
    }

    pub fn matrix(&self) -> &LayerMatrix {
        &self.matrix
    }

    pub fn scorer(&self) -> &QualityScorer {
        &self.scorer
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Captures every layer of the matrix for `session`.
    ///
    /// Yields to the scheduler after every `yield_every` captures.
    pub async fn produce_jobs(&self, session: &CreationSession) -> Vec<CaptureJob> {
        let layers = self.matrix.layers();
        let bounds = self.bounds.bounds();
        let mut jobs = Vec::with_capacity(layers.len());
        let mut degraded = 0usize;

        tracing::info!(
            "[CaptureOrchestrator] Capturing {} layers for session {}",
            layers.len(),
            session.id
        );

        for (index, key) in layers.into_iter().enumerate() {
            let job = self.capture_one(key, &session.id, bounds).await;
            if job.acquisition_error.is_some() {
                degraded += 1;
            }
            jobs.push(job);

            if (index + 1) % self.yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }

        if degraded > 0 {
            tracing::warn!(
                "[CaptureOrchestrator] {} of {} layers captured as placeholders",
                degraded,
                jobs.len()
            );
        }

        jobs
    }

    async fn capture_one(
        &self,
        key: LayerKey,
        session_id: &str,
        bounds: ArtworkBounds,
    ) -> CaptureJob {
        let request = ViewRequest {
            direction: key.direction,
            map_type: key.map_type,
            bounds,
            width: self.width,
            height: self.height,
        };

        // Returned to the pool when this scope ends, whichever branch runs.
        let mut buffer = self.pool.acquire();
        buffer.reset(self.width, self.height);

        let (image_bytes, quality_score, acquisition_error) =
            match self.source.capture(&request, &mut buffer).await {
                Ok(bytes) => {
                    let score = self.scorer.score(&buffer, key.direction);
                    tracing::debug!(
                        "[CaptureOrchestrator] {} captured ({} bytes, quality {:.3})",
                        key,
                        bytes.len(),
                        score
                    );
                    (bytes, score, None)
                }
                Err(e) => {
                    tracing::warn!(
                        "[CaptureOrchestrator] Image source failed for {}: {}",
                        key,
                        e
                    );
                    (Vec::new(), 0.0, Some(e.to_string()))
                }
            };

        CaptureJob {
            direction: key.direction,
            map_type: key.map_type,
            image_bytes,
            strength: self.strengths.strength_for(key.map_type),
            message: key.message(session_id),
            captured_at: Utc::now(),
            quality_score,
            acquisition_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{
        ArtworkBounds, Direction, MapType, MatrixPreset, PixelBuffer, StaticBounds,
    };
    use crate::error::{ArtguardError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Paints a solid colour and fails for a configurable set of layers.
    struct ScriptedSource {
        failing: Vec<LayerKey>,
        seen: Mutex<Vec<ViewRequest>>,
    }

    impl ScriptedSource {
        fn new(failing: Vec<LayerKey>) -> Self {
            Self {
                failing,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageSource for ScriptedSource {
        async fn capture(&self, request: &ViewRequest, buffer: &mut PixelBuffer) -> Result<Vec<u8>> {
            self.seen.lock().unwrap().push(*request);
            let key = LayerKey::new(request.direction, request.map_type);
            if self.failing.contains(&key) {
                return Err(ArtguardError::acquisition(key.layer_id(), "gpu readback failed"));
            }
            buffer.reset(request.width, request.height);
            for px in buffer.rgba.chunks_exact_mut(4) {
                px.copy_from_slice(&[200, 40, 40, 255]);
            }
            Ok(vec![7; 16])
        }
    }

    fn config(preset: MatrixPreset) -> CaptureConfig {
        CaptureConfig {
            matrix: preset,
            image_width: 4,
            image_height: 4,
            ..CaptureConfig::default()
        }
    }

    fn orchestrator(source: Arc<ScriptedSource>, preset: MatrixPreset) -> CaptureOrchestrator {
        let bounds = StaticBounds(ArtworkBounds {
            center: [0.0, 1.0, 0.0],
            extents: [0.5, 0.5, 0.5],
        });
        CaptureOrchestrator::new(source, Arc::new(bounds), BufferPool::new(8), &config(preset))
    }

    #[tokio::test]
    async fn test_produces_full_matrix_in_direction_major_order() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let orchestrator = orchestrator(source.clone(), MatrixPreset::Standard);
        let session = CreationSession::new();

        let jobs = orchestrator.produce_jobs(&session).await;

        assert_eq!(jobs.len(), 18);
        assert_eq!(jobs[0].layer_id(), "main_depth");
        assert_eq!(jobs[1].layer_id(), "main_normal");
        assert_eq!(jobs[3].layer_id(), "detail_depth");
        assert_eq!(jobs[0].message, format!("main_depth_{}", session.id));
        assert_eq!(jobs[0].strength, 0.8);
        assert!(jobs.iter().all(|j| j.quality_score > 0.0));

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen[0].bounds.extents, [0.5, 0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_source_failures_degrade_to_placeholders() {
        let failing = vec![
            LayerKey::new(Direction::Main, MapType::Depth),
            LayerKey::new(Direction::Bottom, MapType::PlainImage),
        ];
        let source = Arc::new(ScriptedSource::new(failing));
        let orchestrator = orchestrator(source, MatrixPreset::Full);

        let jobs = orchestrator.produce_jobs(&CreationSession::new()).await;

        assert_eq!(jobs.len(), 30);
        let placeholders: Vec<_> = jobs.iter().filter(|j| j.is_placeholder()).collect();
        assert_eq!(placeholders.len(), 2);
        assert!(placeholders.iter().all(|j| j.acquisition_error.is_some()));
        assert_eq!(placeholders[0].quality_score, 0.0);
    }

    #[tokio::test]
    async fn test_every_buffer_is_returned() {
        let failing = vec![LayerKey::new(Direction::Top, MapType::Normal)];
        let source = Arc::new(ScriptedSource::new(failing));
        let orchestrator = orchestrator(source, MatrixPreset::Extended);

        orchestrator.produce_jobs(&CreationSession::new()).await;
        orchestrator.produce_jobs(&CreationSession::new()).await;

        let stats = orchestrator.pool().stats();
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.allocated, 1, "sequential capture reuses one buffer");
    }
}
