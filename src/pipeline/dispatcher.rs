//! Bounded-concurrency region recognition.
//!
//! A single coordinator owns the page's regions. It admits at most
//! `concurrency` workers at a time from a [`JoinSet`]; each worker crops one
//! region and hands the crop to the [`RegionRecognizer`]. Results are written
//! back by offset on the coordinator, so the output order never depends on
//! completion order.

use crate::core::cancel::CancellationToken;
use crate::core::config::RegionConcurrency;
use crate::core::errors::{OCRError, OcrResult};
use crate::domain::labels::{LayoutTaskType, RecognitionTask};
use crate::domain::structure::ProcessedRegion;
use crate::processors::geometry::{NormalizedBBox, NormalizedPoint};
use crate::utils::crop::crop_region;
use async_trait::async_trait;
use image::RgbImage;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Recognizes the content of one cropped region.
///
/// Implementations wrap a text/table/formula recognition model. They are
/// shared between concurrent workers and must be safe to call in parallel.
#[async_trait]
pub trait RegionRecognizer: Send + Sync {
    /// Returns the recognized content of `image` for the given task.
    async fn recognize(&self, image: RgbImage, task: RecognitionTask) -> OcrResult<String>;
}

/// One region scheduled for recognition.
#[derive(Debug, Clone)]
struct WorkItem {
    offset: usize,
    region_index: usize,
    label: String,
    task: RecognitionTask,
    bbox: NormalizedBBox,
    polygon: Vec<NormalizedPoint>,
}

/// Builds the work list for a page.
///
/// Skip regions are left out. An abandon region is a policy violation and
/// fails the page before any work starts.
fn build_work_items(regions: &[ProcessedRegion]) -> OcrResult<(Vec<WorkItem>, usize)> {
    let mut items = Vec::with_capacity(regions.len());
    let mut skipped = 0;
    for (offset, region) in regions.iter().enumerate() {
        match region.task_type {
            LayoutTaskType::Skip => skipped += 1,
            LayoutTaskType::Abandon => {
                return Err(OCRError::UnexpectedAbandonRegion {
                    index: region.index,
                    label: region.native_label.clone(),
                });
            }
            task_type => {
                let Some(task) = task_type.recognition_task() else {
                    skipped += 1;
                    continue;
                };
                items.push(WorkItem {
                    offset,
                    region_index: region.index,
                    label: region.native_label.clone(),
                    task,
                    bbox: region.bbox,
                    polygon: region.polygon.clone(),
                });
            }
        }
    }
    Ok((items, skipped))
}

/// Crops and recognizes one region.
async fn run_work_item(
    page_index: usize,
    item: WorkItem,
    page_image: Arc<RgbImage>,
    recognizer: Arc<dyn RegionRecognizer>,
    cancel: CancellationToken,
) -> OcrResult<(usize, String)> {
    let WorkItem {
        offset,
        region_index,
        label,
        task,
        bbox,
        polygon,
    } = item;

    let recognized = async {
        cancel.check("before cropping region")?;
        let cropped = tokio::task::spawn_blocking(move || {
            crop_region(&page_image, &bbox, Some(polygon.as_slice()))
        })
        .await??;

        cancel.check("before recognizing region")?;
        recognizer.recognize(cropped, task).await
    }
    .await;

    recognized
        .map(|text| (offset, text))
        .map_err(|err| OCRError::region_failed(page_index, region_index, label, err))
}

/// Runs region recognition for one page with bounded concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionDispatcher {
    concurrency: usize,
}

impl Default for RegionDispatcher {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RegionDispatcher {
    /// Creates a dispatcher admitting at most `concurrency` workers (at least one).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Creates a dispatcher whose limit is resolved from the policy and the host's memory.
    pub fn from_config(config: &RegionConcurrency) -> Self {
        Self::new(config.resolve_for_host())
    }

    /// The maximum number of workers in flight.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Recognizes every text, table and formula region of a page.
    ///
    /// Returns the regions in their input order with `content` filled for
    /// recognized regions and left `None` for skipped ones. The first worker
    /// failure, or cancellation, aborts all outstanding workers and fails the
    /// whole page; partial results are never returned.
    ///
    /// # Errors
    ///
    /// * `OCRError::UnexpectedAbandonRegion` - an abandon region reached dispatch.
    /// * `OCRError::Cancelled` - `cancel` fired before all regions completed.
    /// * `OCRError::RegionFailed` - a region failed to crop or recognize.
    pub async fn dispatch(
        &self,
        page_index: usize,
        page_image: Arc<RgbImage>,
        mut regions: Vec<ProcessedRegion>,
        recognizer: Arc<dyn RegionRecognizer>,
        cancel: &CancellationToken,
    ) -> OcrResult<Vec<ProcessedRegion>> {
        let (items, skipped) = build_work_items(&regions)?;
        debug!(
            "Page {}: dispatching {} regions ({} skipped) with concurrency {}",
            page_index,
            items.len(),
            skipped,
            self.concurrency
        );
        if items.is_empty() {
            return Ok(regions);
        }

        let mut workers = JoinSet::new();
        let outcome = self
            .coordinate(
                page_index,
                items,
                &page_image,
                &recognizer,
                cancel,
                &mut workers,
                &mut regions,
            )
            .await;

        if let Err(err) = outcome {
            workers.abort_all();
            while workers.join_next().await.is_some() {}
            if err.is_cancelled() {
                debug!("Page {}: region dispatch cancelled", page_index);
            } else {
                error!("Page {}: region dispatch failed: {}", page_index, err);
            }
            return Err(err);
        }
        Ok(regions)
    }

    #[allow(clippy::too_many_arguments)]
    async fn coordinate(
        &self,
        page_index: usize,
        items: Vec<WorkItem>,
        page_image: &Arc<RgbImage>,
        recognizer: &Arc<dyn RegionRecognizer>,
        cancel: &CancellationToken,
        workers: &mut JoinSet<OcrResult<(usize, String)>>,
        regions: &mut [ProcessedRegion],
    ) -> OcrResult<()> {
        let mut pending = items.into_iter();
        let mut in_flight = 0usize;

        loop {
            while in_flight < self.concurrency {
                let Some(item) = pending.next() else {
                    break;
                };
                cancel.check("before scheduling region")?;
                workers.spawn(run_work_item(
                    page_index,
                    item,
                    Arc::clone(page_image),
                    Arc::clone(recognizer),
                    cancel.clone(),
                ));
                in_flight += 1;
            }

            if in_flight == 0 {
                return Ok(());
            }

            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(OCRError::cancelled("waiting for region workers"));
                }
                joined = workers.join_next() => joined,
            };
            let Some(joined) = joined else {
                return Ok(());
            };
            in_flight -= 1;

            let (offset, text) = joined??;
            if let Some(region) = regions.get_mut(offset) {
                region.content = Some(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::OpaqueError;
    use crate::domain::labels::task_type_for_label;
    use image::Rgb;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Page of 20 horizontal stripes, 50 px tall; stripe `i` has red value `i`.
    fn stripe_page() -> Arc<RgbImage> {
        Arc::new(RgbImage::from_fn(20, 1000, |_, y| Rgb([(y / 50) as u8, 0, 0])))
    }

    fn stripe_region(index: usize, label: &str) -> ProcessedRegion {
        let y1 = index as i32 * 50;
        let bbox = NormalizedBBox::new(0, y1, 1000, y1 + 40);
        ProcessedRegion {
            index,
            class_id: 0,
            native_label: label.to_string(),
            score: 0.9,
            order: None,
            task_type: task_type_for_label(label),
            bbox,
            polygon: bbox.polygon(),
            content: None,
        }
    }

    #[derive(Default)]
    struct StripeRecognizer {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_on: Option<u8>,
        cancel_on_call: Option<CancellationToken>,
    }

    #[async_trait]
    impl RegionRecognizer for StripeRecognizer {
        async fn recognize(&self, image: RgbImage, task: RecognitionTask) -> OcrResult<String> {
            let stripe = image.get_pixel(0, 0)[0];
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(token) = &self.cancel_on_call {
                token.cancel();
            }

            // Later stripes tend to finish first.
            let delay = (u64::from(stripe) * 37) % 11 + 1;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on == Some(stripe) {
                return Err(OCRError::inference_error(
                    "recognizer",
                    "region recognition failed",
                    OpaqueError::from_display("model exploded"),
                ));
            }
            Ok(format!("{}:{}", task.as_str(), stripe))
        }
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        assert_eq!(RegionDispatcher::new(0).concurrency(), 1);
        assert_eq!(RegionDispatcher::new(3).concurrency(), 3);
        let config = RegionConcurrency::new()
            .with_policy(crate::core::config::ConcurrencyPolicy::Fixed(5))
            .with_hard_cap(2);
        assert_eq!(RegionDispatcher::from_config(&config).concurrency(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_results_follow_input_order_under_bounded_concurrency() {
        let regions: Vec<_> = (0..12)
            .map(|i| stripe_region(i, if i % 4 == 3 { "table" } else { "text" }))
            .collect();
        let recognizer = Arc::new(StripeRecognizer::default());
        let dispatcher = RegionDispatcher::new(3);

        let out = dispatcher
            .dispatch(
                0,
                stripe_page(),
                regions,
                recognizer.clone(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(out.len(), 12);
        for (i, region) in out.iter().enumerate() {
            let task = if i % 4 == 3 { "table" } else { "text" };
            assert_eq!(region.index, i);
            assert_eq!(region.content.as_deref(), Some(format!("{task}:{i}").as_str()));
        }
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 12);
        assert!(recognizer.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_skip_regions_keep_empty_content() {
        let regions = vec![
            stripe_region(0, "doc_title"),
            stripe_region(1, "image"),
            stripe_region(2, "display_formula"),
            stripe_region(3, "chart"),
        ];
        let recognizer = Arc::new(StripeRecognizer::default());

        let out = RegionDispatcher::new(2)
            .dispatch(
                0,
                stripe_page(),
                regions,
                recognizer.clone(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(out[0].content.as_deref(), Some("text:0"));
        assert_eq!(out[1].content, None);
        assert_eq!(out[2].content.as_deref(), Some("formula:2"));
        assert_eq!(out[3].content, None);
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_abandon_region_fails_before_any_work() {
        let regions = vec![stripe_region(0, "text"), stripe_region(1, "header")];
        let recognizer = Arc::new(StripeRecognizer::default());

        let err = RegionDispatcher::new(2)
            .dispatch(
                0,
                stripe_page(),
                regions,
                recognizer.clone(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OCRError::UnexpectedAbandonRegion { index: 1, ref label } if label == "header"
        ));
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_recognizer_failure_fails_the_page() {
        let regions: Vec<_> = (0..6).map(|i| stripe_region(i, "text")).collect();
        let recognizer = Arc::new(StripeRecognizer {
            fail_on: Some(2),
            ..Default::default()
        });

        let err = RegionDispatcher::new(2)
            .dispatch(
                4,
                stripe_page(),
                regions,
                recognizer,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            OCRError::RegionFailed {
                page_index,
                region_index,
                ref label,
                ..
            } => {
                assert_eq!(page_index, 4);
                assert_eq!(region_index, 2);
                assert_eq!(label, "text");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancellation_stops_new_recognizer_calls() {
        let cancel = CancellationToken::new();
        let regions: Vec<_> = (0..8).map(|i| stripe_region(i, "text")).collect();
        let recognizer = Arc::new(StripeRecognizer {
            cancel_on_call: Some(cancel.clone()),
            ..Default::default()
        });

        let err = RegionDispatcher::new(2)
            .dispatch(0, stripe_page(), regions, recognizer.clone(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());

        let calls = recognizer.calls.load(Ordering::SeqCst);
        assert!(calls >= 1 && calls <= 2, "calls = {calls}");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_already_cancelled_token_issues_no_calls() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let recognizer = Arc::new(StripeRecognizer::default());

        let err = RegionDispatcher::new(2)
            .dispatch(
                0,
                stripe_page(),
                vec![stripe_region(0, "text")],
                recognizer.clone(),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    }
}
