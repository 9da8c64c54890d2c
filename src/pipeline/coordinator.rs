//! Request orchestration: rasterize, bounded OCR fan-out, ordered fan-in.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout_at;
use uuid::Uuid;

use super::error::PipelineError;
use super::types::{ProcessMode, ProcessOptions, Stage, StageTracker};
use crate::document::{Document, DocumentResult, FailureReason, Page, PageResult, TextSource};
use crate::ocr::{OcrEngine, OcrWorker};
use crate::raster::{RasterOptions, Rasterizer};

/// Fixed settings taken from the process configuration
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub dpi: u32,
    pub max_page_pixels: u64,
    /// OCR invocations allowed in flight across all requests
    pub ocr_concurrency: usize,
    pub page_timeout: Duration,
}

/// Drives one document from bytes to an ordered [`DocumentResult`].
///
/// Shared by every request; the permit pool is the only state that spans
/// requests.
pub struct Coordinator {
    rasterizer: Arc<dyn Rasterizer>,
    worker: OcrWorker,
    permits: Arc<Semaphore>,
    dpi: u32,
    max_page_pixels: u64,
}

impl Coordinator {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        engine: Arc<dyn OcrEngine>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            rasterizer,
            worker: OcrWorker::new(engine, settings.page_timeout),
            permits: Arc::new(Semaphore::new(settings.ocr_concurrency.max(1))),
            dpi: settings.dpi,
            max_page_pixels: settings.max_page_pixels,
        }
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        self.worker.engine()
    }

    #[tracing::instrument(skip_all, fields(request_id = %request_id, bytes = document.size()))]
    pub async fn process(
        &self,
        document: &Document,
        options: &ProcessOptions,
        request_id: Uuid,
    ) -> Result<DocumentResult, PipelineError> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + options.request_timeout;
        let mut stage = StageTracker::new(request_id);

        stage.advance(Stage::Rasterizing);
        let raster_options = RasterOptions {
            max_pages: options.max_pages,
            dpi: self.dpi,
            max_page_pixels: self.max_page_pixels,
            extract_text_layer: options.mode == ProcessMode::Auto,
        };

        let pages = match timeout_at(deadline, self.rasterizer.rasterize(document, &raster_options)).await {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                stage.advance(Stage::Failed);
                tracing::info!(error = %e, "Rasterization failed");
                return Err(e.into());
            }
            Err(_) => {
                let at = stage.current();
                stage.advance(Stage::Failed);
                return Err(PipelineError::RequestTimeout {
                    stage: at,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
        };

        if let Err(e) = validate_indices(&pages) {
            stage.advance(Stage::Failed);
            tracing::error!(error = %e, "Rasterizer broke page ordering");
            return Err(e);
        }

        let page_count = pages.len();
        tracing::debug!(pages = page_count, "Document rasterized");

        stage.advance(Stage::OcrInFlight);
        let mut slots: Vec<Option<PageResult>> = vec![None; page_count];
        let mut tasks = JoinSet::new();

        for page in pages {
            if options.mode == ProcessMode::Auto {
                if let Some(text) = usable_text_layer(&page) {
                    slots[page.index] = Some(PageResult::success(
                        page.index,
                        text,
                        None,
                        TextSource::TextLayer,
                        Duration::ZERO,
                    ));
                    continue;
                }
            }

            let worker = self.worker.clone();
            let permits = Arc::clone(&self.permits);
            let language = options.language.clone();

            tasks.spawn(async move {
                let index = page.index;
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return PageResult::failed(
                            index,
                            FailureReason::Internal,
                            "OCR pool closed",
                            Duration::ZERO,
                        )
                    }
                };
                worker.recognize(page, &language).await
            });
        }

        let mut deadline_hit = false;
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(result))) => {
                    let index = result.index;
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Ok(Some(Err(e))) => {
                    // The slot stays empty and is synthesized below
                    tracing::error!(error = %e, "OCR task did not complete");
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_hit = true;
                    tracing::warn!(
                        outstanding = tasks.len(),
                        "Request deadline elapsed, aborting outstanding pages"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        stage.advance(Stage::Aggregating);
        let results: Vec<PageResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or_else(|| missing_page(index, deadline_hit)))
            .collect();

        let result = DocumentResult::assemble(results, options.language.clone(), started.elapsed());

        if deadline_hit && result.succeeded() == 0 {
            stage.advance(Stage::Failed);
            return Err(PipelineError::RequestTimeout {
                stage: Stage::OcrInFlight,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        stage.advance(Stage::Completed);
        tracing::info!(
            pages = result.page_count,
            succeeded = result.succeeded(),
            status = ?result.overall_status,
            elapsed_ms = result.elapsed_ms,
            "Document processed"
        );
        Ok(result)
    }
}

fn validate_indices(pages: &[Page]) -> Result<(), PipelineError> {
    if pages.is_empty() {
        return Err(PipelineError::Internal("Rasterizer returned no pages".to_string()));
    }

    match pages.iter().enumerate().find(|(i, page)| page.index != *i) {
        Some((position, page)) => Err(PipelineError::Internal(format!(
            "Page at position {} has index {}",
            position, page.index
        ))),
        None => Ok(()),
    }
}

fn usable_text_layer(page: &Page) -> Option<String> {
    page.text_layer
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn missing_page(index: usize, deadline_hit: bool) -> PageResult {
    if deadline_hit {
        PageResult::failed(
            index,
            FailureReason::RequestTimeout,
            "Request deadline elapsed before this page finished",
            Duration::ZERO,
        )
    } else {
        PageResult::failed(
            index,
            FailureReason::Internal,
            "OCR task ended without a result",
            Duration::ZERO,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    use crate::document::{OverallStatus, PageStatus};
    use crate::ocr::mock::{MockEngine, MockStep};
    use crate::raster::fake::{fake_page, FakeRasterizer};
    use crate::raster::RasterError;

    fn coordinator(
        rasterizer: Arc<FakeRasterizer>,
        engine: Arc<MockEngine>,
        concurrency: usize,
        page_timeout_ms: u64,
    ) -> Coordinator {
        Coordinator::new(
            rasterizer,
            engine,
            CoordinatorSettings {
                dpi: 200,
                max_page_pixels: 40_000_000,
                ocr_concurrency: concurrency,
                page_timeout: Duration::from_millis(page_timeout_ms),
            },
        )
    }

    fn options(request_timeout_ms: u64, mode: ProcessMode) -> ProcessOptions {
        ProcessOptions {
            language: "eng".to_string(),
            max_pages: 20,
            request_timeout: Duration::from_millis(request_timeout_ms),
            mode,
        }
    }

    fn document() -> Document {
        Document::new(
            Bytes::from_static(b"%PDF-1.4\n"),
            Some("application/pdf".to_string()),
            None,
        )
    }

    fn statuses(result: &DocumentResult) -> Vec<PageStatus> {
        result.pages.iter().map(|p| p.status).collect()
    }

    fn indices(result: &DocumentResult) -> Vec<usize> {
        result.pages.iter().map(|p| p.index).collect()
    }

    async fn run(coordinator: &Coordinator, options: &ProcessOptions) -> Result<DocumentResult, PipelineError> {
        coordinator.process(&document(), options, Uuid::new_v4()).await
    }

    #[tokio::test]
    async fn test_all_pages_succeed() {
        let engine = Arc::new(MockEngine::new(MockStep::Text("text")));
        let c = coordinator(Arc::new(FakeRasterizer::pages(5)), engine.clone(), 3, 1000);

        let result = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap();

        assert_eq!(result.page_count, 5);
        assert_eq!(indices(&result), vec![0, 1, 2, 3, 4]);
        assert_eq!(result.overall_status, OverallStatus::Success);
        assert_eq!(result.language, "eng");
        assert_eq!(engine.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_independent_of_completion() {
        let delays = ["zero", "one", "two", "three"];
        let mut engine = MockEngine::new(MockStep::Text("unused"));
        for (i, text) in delays.iter().enumerate() {
            let delay = Duration::from_millis(((delays.len() - i) * 10) as u64);
            engine = engine.with_step(i, MockStep::Delay(delay, *text));
        }
        let c = coordinator(Arc::new(FakeRasterizer::pages(4)), Arc::new(engine), 4, 1000);

        let result = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap();

        let texts: Vec<&str> = result.pages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, delays.to_vec());
        assert_eq!(indices(&result), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_rasterizer_failure_skips_ocr() {
        let engine = Arc::new(MockEngine::new(MockStep::Text("never")));
        let rasterizer = Arc::new(FakeRasterizer::failing(|| {
            RasterError::Corrupt("bad xref".to_string())
        }));
        let c = coordinator(rasterizer.clone(), engine.clone(), 3, 1000);

        let err = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap_err();

        assert!(matches!(err, PipelineError::Rasterization(RasterError::Corrupt(_))));
        assert_eq!(rasterizer.calls(), 1);
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_single_page() {
        let engine = Arc::new(MockEngine::new(MockStep::Text("only")));
        let c = coordinator(Arc::new(FakeRasterizer::pages(1)), engine, 3, 1000);

        let result = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap();

        assert_eq!(result.page_count, 1);
        assert_eq!(result.pages[0].index, 0);
        assert_eq!(result.pages[0].text, "only");
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_timeout_is_isolated() {
        let engine = Arc::new(MockEngine::new(MockStep::Text("ok")).with_step(1, MockStep::Hang));
        let c = coordinator(Arc::new(FakeRasterizer::pages(3)), engine, 3, 100);

        let result = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap();

        assert_eq!(
            statuses(&result),
            vec![PageStatus::Success, PageStatus::Failed, PageStatus::Success]
        );
        assert_eq!(result.pages[1].reason, Some(FailureReason::Timeout));
        assert_eq!(result.overall_status, OverallStatus::Partial);
    }

    #[tokio::test]
    async fn test_invalid_middle_page_is_partial() {
        let mut broken = fake_page(1);
        broken.image.clear();
        let rasterizer = FakeRasterizer::with_pages(vec![fake_page(0), broken, fake_page(2)]);
        let engine = Arc::new(MockEngine::new(MockStep::Text("ok")));
        let c = coordinator(Arc::new(rasterizer), engine.clone(), 3, 1000);

        let result = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap();

        assert_eq!(
            statuses(&result),
            vec![PageStatus::Success, PageStatus::Failed, PageStatus::Success]
        );
        assert_eq!(result.pages[1].reason, Some(FailureReason::InvalidPageImage));
        assert_eq!(result.overall_status, OverallStatus::Partial);
        assert_eq!(engine.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let engine = Arc::new(MockEngine::new(MockStep::Delay(
            Duration::from_millis(10),
            "slow",
        )));
        let c = coordinator(Arc::new(FakeRasterizer::pages(8)), engine.clone(), 2, 1000);

        let result = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap();

        assert_eq!(result.overall_status, OverallStatus::Success);
        assert_eq!(engine.calls(), 8);
        assert_eq!(engine.max_in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permit_pool_is_shared_across_requests() {
        let engine = Arc::new(MockEngine::new(MockStep::Delay(
            Duration::from_millis(10),
            "slow",
        )));
        let c = coordinator(Arc::new(FakeRasterizer::pages(4)), engine.clone(), 2, 1000);
        let opts = options(10_000, ProcessMode::Ocr);

        let (a, b) = tokio::join!(run(&c, &opts), run(&c, &opts));

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(engine.calls(), 8);
        assert_eq!(engine.max_in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_deadline_returns_partial() {
        let engine = Arc::new(MockEngine::new(MockStep::Text("ok")).with_step(2, MockStep::Hang));
        let c = coordinator(Arc::new(FakeRasterizer::pages(3)), engine, 3, 60_000);

        let result = run(&c, &options(1000, ProcessMode::Ocr)).await.unwrap();

        assert_eq!(result.page_count, 3);
        assert_eq!(result.pages[2].reason, Some(FailureReason::RequestTimeout));
        assert_eq!(result.overall_status, OverallStatus::Partial);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_deadline_with_no_pages_done() {
        let engine = Arc::new(MockEngine::new(MockStep::Hang));
        let c = coordinator(Arc::new(FakeRasterizer::pages(2)), engine, 3, 60_000);

        let err = run(&c, &options(1000, ProcessMode::Ocr)).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::RequestTimeout {
                stage: Stage::OcrInFlight,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_deadline_during_rasterization() {
        let engine = Arc::new(MockEngine::new(MockStep::Text("never")));
        let c = coordinator(Arc::new(FakeRasterizer::hanging()), engine.clone(), 3, 1000);

        let err = run(&c, &options(1000, ProcessMode::Ocr)).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::RequestTimeout {
                stage: Stage::Rasterizing,
                ..
            }
        ));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_engine_panic_is_contained() {
        let engine = Arc::new(MockEngine::new(MockStep::Text("ok")).with_step(0, MockStep::Panic));
        let c = coordinator(Arc::new(FakeRasterizer::pages(2)), engine, 3, 1000);

        let result = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap();

        assert_eq!(result.pages[0].reason, Some(FailureReason::Internal));
        assert!(result.pages[1].is_success());
    }

    #[tokio::test]
    async fn test_text_layer_used_in_auto_mode() {
        let mut layered = fake_page(0);
        layered.text_layer = Some("  Embedded text \n".to_string());
        let blank_layer = Page {
            text_layer: Some("   ".to_string()),
            ..fake_page(1)
        };
        let rasterizer = Arc::new(FakeRasterizer::with_pages(vec![layered, blank_layer]));
        let engine = Arc::new(MockEngine::new(MockStep::Text("from ocr")));
        let c = coordinator(rasterizer, engine.clone(), 3, 1000);

        let result = run(&c, &options(10_000, ProcessMode::Auto)).await.unwrap();

        assert_eq!(result.pages[0].text, "Embedded text");
        assert_eq!(result.pages[0].source, Some(TextSource::TextLayer));
        assert_eq!(result.pages[1].text, "from ocr");
        assert_eq!(result.pages[1].source, Some(TextSource::Ocr));
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_ocr_mode_ignores_text_layer() {
        let mut layered = fake_page(0);
        layered.text_layer = Some("Embedded".to_string());
        let rasterizer = Arc::new(FakeRasterizer::with_pages(vec![layered]));
        let engine = Arc::new(MockEngine::new(MockStep::Text("from ocr")));
        let c = coordinator(rasterizer, engine.clone(), 3, 1000);

        let result = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap();

        assert_eq!(result.pages[0].text, "from ocr");
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_gap_in_page_indices_is_internal() {
        let rasterizer = Arc::new(FakeRasterizer::with_pages(vec![fake_page(0), fake_page(2)]));
        let engine = Arc::new(MockEngine::new(MockStep::Text("ok")));
        let c = coordinator(rasterizer, engine.clone(), 3, 1000);

        let err = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap_err();

        assert!(matches!(err, PipelineError::Internal(_)));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_repeat_runs_match() {
        let engine = Arc::new(MockEngine::new(MockStep::Text("ok")).with_step(1, MockStep::Fail("smudge")));
        let c = coordinator(Arc::new(FakeRasterizer::pages(4)), engine, 2, 1000);
        let opts = options(10_000, ProcessMode::Ocr);

        let first = run(&c, &opts).await.unwrap();
        let second = run(&c, &opts).await.unwrap();

        assert_eq!(indices(&first), indices(&second));
        assert_eq!(statuses(&first), statuses(&second));
        assert_eq!(first.text(), second.text());
    }

    #[tokio::test]
    async fn test_every_page_failing_is_still_a_result() {
        let engine = Arc::new(MockEngine::new(MockStep::Fail("unreadable")));
        let c = coordinator(Arc::new(FakeRasterizer::pages(3)), engine, 3, 1000);

        let result = run(&c, &options(10_000, ProcessMode::Ocr)).await.unwrap();

        assert_eq!(result.page_count, 3);
        assert_eq!(result.overall_status, OverallStatus::Failed);
    }
}
