//! Per-invocation coordinator: fetch → decode → generate → upload.
//!
//! ```text
//! Start ─▶ Fetched ─▶ Decoded ─▶ Generated ─▶ Uploaded ─▶ Done
//!   │         │          │           │            │
//!   └─────────┴──────────┴───────────┴────────────┴──▶ Failed
//! ```
//!
//! `Fetched` covers decoding the trigger key and reading the source object.
//! A source that no longer exists ends the run at `Done` without writing
//! anything. Every other failure is converted into a [`Failure`] where it is
//! raised and classified once, here, with the default status. There are no
//! retries between stages; redelivery of the trigger is the retry mechanism,
//! which is safe because output keys and bytes depend only on the source.
//!
//! Decoding and resizing are CPU-bound and run on the blocking pool, where the
//! generator fans out over its own rayon threads.

use crate::envelope::Failure;
use crate::imaging::{DerivativeGenerator, GenerateError, ImageBackend, plan_derivatives};
use crate::key;
use crate::response::Response;
use crate::store::ObjectStore;
use crate::types::{DerivativeSpec, RequestContext, TriggerEvent};
use crate::upload::upload_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

pub const SUCCESS_MESSAGE: &str = "Successfully processed image";
pub const FAILURE_MESSAGE: &str = "Fail to process image";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Trigger event carries no records")]
    EmptyEvent,
}

impl From<PipelineError> for Failure {
    fn from(err: PipelineError) -> Self {
        Failure::payload_not_valid(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Fetched,
    Decoded,
    Generated,
    Uploaded,
    Done,
    Failed,
}

/// Result of one run: the final stage plus the envelope for the caller.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub stage: Stage,
    /// Last stage reached before the run ended. Equals `stage` unless it failed.
    pub reached: Stage,
    pub response: Response,
}

pub struct Pipeline<B> {
    store: Arc<dyn ObjectStore>,
    generator: Arc<DerivativeGenerator<B>>,
    specs: Vec<DerivativeSpec>,
}

impl<B: ImageBackend + Send + 'static> Pipeline<B> {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        generator: Arc<DerivativeGenerator<B>>,
        specs: Vec<DerivativeSpec>,
    ) -> Self {
        Self {
            store,
            generator,
            specs,
        }
    }

    /// Process a trigger event and return the envelope for the transport.
    pub async fn handle(&self, ctx: &RequestContext, event: &TriggerEvent) -> Response {
        self.run(ctx, event).await.response
    }

    /// Like [`Pipeline::handle`], also reporting where the run ended.
    pub async fn run(&self, ctx: &RequestContext, event: &TriggerEvent) -> Outcome {
        let span = ctx.span();
        async {
            let mut reached = Stage::Start;
            match self.execute(event, &mut reached).await {
                Ok(()) => Outcome {
                    stage: Stage::Done,
                    reached,
                    response: Response::success(ctx, SUCCESS_MESSAGE, None),
                },
                Err(failure) => {
                    tracing::debug!(stage = ?reached, "pipeline failed");
                    Outcome {
                        stage: Stage::Failed,
                        reached,
                        response: Response::from_failure(ctx, &failure, FAILURE_MESSAGE),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, event: &TriggerEvent, reached: &mut Stage) -> Result<(), Failure> {
        let source = event.source().ok_or(PipelineError::EmptyEvent)?;
        let decoded = key::decode(&source.raw_key)?;

        let Some(bytes) = self.store.get(&source.bucket, &decoded.key).await? else {
            tracing::warn!(
                bucket = %source.bucket,
                key = %decoded.key,
                "source object is absent, nothing to process"
            );
            *reached = Stage::Done;
            return Ok(());
        };
        advance(reached, Stage::Fetched);

        let plans = plan_derivatives(&decoded, &self.specs);
        let generator = Arc::clone(&self.generator);
        let span = tracing::Span::current();
        let results = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let image = generator.decode(&bytes)?;
            tracing::debug!(stage = ?Stage::Decoded, "stage reached");
            generator.generate_from(&image, &plans)
        })
        .await?;
        if !matches!(results, Err(GenerateError::ImageDecode(_))) {
            *reached = Stage::Decoded;
        }
        let results = results?;
        advance(reached, Stage::Generated);

        upload_all(self.store.as_ref(), &source.bucket, results).await?;
        advance(reached, Stage::Uploaded);

        *reached = Stage::Done;
        Ok(())
    }
}

fn advance(reached: &mut Stage, next: Stage) {
    tracing::debug!(stage = ?next, "stage reached");
    *reached = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ErrorEnvelope;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::{Quality, RustBackend};
    use crate::store::MemoryStore;
    use crate::test_helpers::synthetic_png;

    fn specs() -> Vec<DerivativeSpec> {
        [50, 100, 500].map(DerivativeSpec::new).to_vec()
    }

    fn pipeline<B: ImageBackend + Send + 'static>(
        store: Arc<MemoryStore>,
        backend: B,
    ) -> Pipeline<B> {
        let generator = DerivativeGenerator::new(backend, Quality::default(), 3).unwrap();
        Pipeline::new(store, Arc::new(generator), specs())
    }

    fn ctx() -> RequestContext {
        RequestContext::new("req-1", "resize-image")
    }

    // =========================================================================
    // Happy path
    // =========================================================================

    #[tokio::test]
    async fn uploads_every_derivative_beside_the_source() {
        let store = Arc::new(MemoryStore::new());
        store.insert("images", "input/abc.jpg", vec![1, 2, 3]);
        let pipeline = pipeline(store.clone(), MockBackend::new());

        let outcome = pipeline
            .run(&ctx(), &TriggerEvent::single("images", "input/abc.jpg"))
            .await;

        assert_eq!(outcome.stage, Stage::Done);
        assert_eq!(outcome.reached, Stage::Done);
        assert!(outcome.response.is_success());
        assert_eq!(
            store.keys("images"),
            vec![
                "input/abc.jpg",
                "resized/abc/100.jpg",
                "resized/abc/50.jpg",
                "resized/abc/500.jpg"
            ]
        );
        assert_eq!(
            store.object("images", "resized/abc/500.jpg").unwrap(),
            b"500:500x400".to_vec()
        );
    }

    #[tokio::test]
    async fn encoded_key_is_decoded_before_fetch() {
        let store = Arc::new(MemoryStore::new());
        store.insert("images", "input/my photo.png", vec![0]);
        let pipeline = pipeline(store.clone(), MockBackend::new());

        let response = pipeline
            .handle(&ctx(), &TriggerEvent::single("images", "input/my+photo.png"))
            .await;

        assert!(response.is_success());
        assert!(store.object("images", "resized/my photo/50.png").is_some());
    }

    #[tokio::test]
    async fn success_envelope_is_fixed() {
        let store = Arc::new(MemoryStore::new());
        store.insert("b", "input/a.png", vec![0]);
        let response = pipeline(store, MockBackend::new())
            .handle(&ctx(), &TriggerEvent::single("b", "input/a.png"))
            .await;

        assert_eq!(
            response,
            Response::Success {
                request_id: "req-1".into(),
                status_code: 200,
                message: SUCCESS_MESSAGE.into(),
                data: serde_json::json!({}),
            }
        );
    }

    #[tokio::test]
    async fn absent_object_is_a_no_op_success() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(store.clone(), MockBackend::new());

        let outcome = pipeline
            .run(&ctx(), &TriggerEvent::single("b", "input/x.png"))
            .await;

        assert_eq!(outcome.stage, Stage::Done);
        assert!(outcome.response.is_success());
        assert_eq!(store.put_count(), 0);
        assert!(pipeline.generator.backend().get_operations().is_empty());
    }

    #[tokio::test]
    async fn redelivery_produces_identical_state() {
        let store = Arc::new(MemoryStore::new());
        store.insert("images", "input/photo.png", synthetic_png(640, 480));
        let pipeline = pipeline(store.clone(), RustBackend::new());
        let event = TriggerEvent::single("images", "input/photo.png");

        assert!(pipeline.handle(&ctx(), &event).await.is_success());
        let first: Vec<_> = store
            .keys("images")
            .into_iter()
            .map(|k| (store.object("images", &k), k))
            .collect();

        assert!(pipeline.handle(&ctx(), &event).await.is_success());
        let second: Vec<_> = store
            .keys("images")
            .into_iter()
            .map(|k| (store.object("images", &k), k))
            .collect();

        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[tokio::test]
    async fn empty_event_is_a_payload_error() {
        let store = Arc::new(MemoryStore::new());
        let response = pipeline(store, MockBackend::new())
            .handle(&ctx(), &TriggerEvent { records: vec![] })
            .await;

        assert_eq!(response.status_code(), 400);
        let error = response.error().unwrap();
        assert_eq!(error.name, "PayloadNotValidException");
        assert_eq!(
            error.detail,
            Some(serde_json::json!("Trigger event carries no records"))
        );
    }

    #[tokio::test]
    async fn malformed_key_fails_before_fetch() {
        let store = Arc::new(MemoryStore::new());
        let outcome = pipeline(store, MockBackend::new())
            .run(&ctx(), &TriggerEvent::single("b", "input/%zz.png"))
            .await;

        assert_eq!(outcome.stage, Stage::Failed);
        assert_eq!(outcome.reached, Stage::Start);
        assert_eq!(outcome.response.error(), Some(&ErrorEnvelope::generic()));
    }

    #[tokio::test]
    async fn store_not_found_maps_to_404() {
        let store = Arc::new(MemoryStore::new());
        store.fail_key("b", "input/a.png", 404);
        let response = pipeline(store, MockBackend::new())
            .handle(&ctx(), &TriggerEvent::single("b", "input/a.png"))
            .await;

        assert_eq!(response.status_code(), 404);
        assert_eq!(response.error(), Some(&ErrorEnvelope::not_found()));
    }

    #[tokio::test]
    async fn store_read_failure_is_a_backend_error() {
        let store = Arc::new(MemoryStore::new());
        store.fail_key("b", "input/a.png", 503);
        let response = pipeline(store, MockBackend::new())
            .handle(&ctx(), &TriggerEvent::single("b", "input/a.png"))
            .await;

        assert_eq!(response.error(), Some(&ErrorEnvelope::backend()));
        let http = response.into_http();
        assert!(!http.body.contains("injected failure"));
    }

    #[tokio::test]
    async fn undecodable_source_fails_without_writes() {
        let store = Arc::new(MemoryStore::new());
        store.insert("b", "input/a.png", b"not an image".to_vec());
        let outcome = pipeline(store.clone(), MockBackend::undecodable())
            .run(&ctx(), &TriggerEvent::single("b", "input/a.png"))
            .await;

        assert_eq!(outcome.stage, Stage::Failed);
        assert_eq!(outcome.reached, Stage::Fetched);
        assert_eq!(outcome.response.error(), Some(&ErrorEnvelope::generic()));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn one_failed_resize_discards_the_whole_set() {
        let store = Arc::new(MemoryStore::new());
        store.insert("b", "input/a.png", vec![0]);
        let outcome = pipeline(store.clone(), MockBackend::new().failing_on(100))
            .run(&ctx(), &TriggerEvent::single("b", "input/a.png"))
            .await;

        assert_eq!(outcome.stage, Stage::Failed);
        assert_eq!(outcome.reached, Stage::Decoded);
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn partial_upload_failure_keeps_siblings() {
        let store = Arc::new(MemoryStore::new());
        store.insert("b", "input/a.png", vec![0]);
        store.fail_key("b", "resized/a/100.png", 500);
        let outcome = pipeline(store.clone(), MockBackend::new())
            .run(&ctx(), &TriggerEvent::single("b", "input/a.png"))
            .await;

        assert_eq!(outcome.stage, Stage::Failed);
        assert_eq!(outcome.reached, Stage::Generated);
        assert_eq!(outcome.response.status_code(), 500);
        assert_eq!(outcome.response.error(), Some(&ErrorEnvelope::generic()));
        assert!(store.object("b", "resized/a/50.png").is_some());
        assert!(store.object("b", "resized/a/500.png").is_some());
    }
}
