//! Layout-first document parser.
//!
//! This module wires the pieces of the pipeline together for whole pages and
//! documents:
//! 1. Detects layout regions with a pluggable [`LayoutDetector`]
//! 2. Post-processes detections into ordered regions ([`LayoutPostProcess`])
//! 3. Recognizes text, table and formula regions with bounded concurrency
//!    ([`RegionDispatcher`])
//! 4. Formats regions and renders Markdown ([`LayoutResultFormatter`])

use crate::core::cancel::CancellationToken;
use crate::core::config::{ParallelPolicy, RegionConcurrency};
use crate::core::constants::DEFAULT_LAYOUT_SCORE_THRESHOLD;
use crate::core::errors::{OCRError, OcrResult};
use crate::domain::labels::{LayoutLabelConfig, LayoutTaskType};
use crate::domain::structure::{Document, Page, ProcessedRegion};
use crate::pipeline::dispatcher::{RegionDispatcher, RegionRecognizer};
use crate::pipeline::pages::PageSelection;
use crate::processors::layout_postprocess::{
    LayoutPostProcess, LayoutPostprocessOptions, PostprocessOutput, RawDetections,
};
use crate::processors::result_formatter::LayoutResultFormatter;
use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Produces raw layout detections for a page image.
#[async_trait]
pub trait LayoutDetector: Send + Sync {
    /// Detects layout regions scoring at least `score_threshold`.
    ///
    /// A threshold of `f32::NEG_INFINITY` asks for every candidate the model produced.
    async fn detect(&self, image: &RgbImage, score_threshold: f32) -> OcrResult<RawDetections>;
}

/// Configuration for [`DocParser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocParserConfig {
    /// Score threshold for the first detection pass.
    /// Default: 0.3
    #[serde(default = "DocParserConfig::default_score_threshold")]
    pub score_threshold: f32,

    /// Detect again without a score threshold when the first pass yields no regions.
    /// Default: true
    #[serde(default = "DocParserConfig::default_retry_without_threshold")]
    pub retry_without_threshold: bool,

    /// Drop abandon regions (headers, footers, page numbers) before recognition.
    /// When disabled, an abandon region reaching dispatch fails the page.
    /// Default: true
    #[serde(default = "DocParserConfig::default_drop_abandon_regions")]
    pub drop_abandon_regions: bool,

    /// Layout post-processing options.
    #[serde(default = "LayoutPostprocessOptions::pp_doclayout_v3")]
    pub postprocess: LayoutPostprocessOptions,

    /// Recognition concurrency policy.
    #[serde(default)]
    pub concurrency: RegionConcurrency,

    /// Page formatting parallelism.
    #[serde(default)]
    pub parallel: ParallelPolicy,
}

impl Default for DocParserConfig {
    fn default() -> Self {
        Self {
            score_threshold: Self::default_score_threshold(),
            retry_without_threshold: Self::default_retry_without_threshold(),
            drop_abandon_regions: Self::default_drop_abandon_regions(),
            postprocess: LayoutPostprocessOptions::pp_doclayout_v3(),
            concurrency: RegionConcurrency::default(),
            parallel: ParallelPolicy::default(),
        }
    }
}

impl DocParserConfig {
    /// Create a new DocParserConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first-pass score threshold.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Enable or disable the threshold-free retry.
    pub fn with_retry_without_threshold(mut self, retry: bool) -> Self {
        self.retry_without_threshold = retry;
        self
    }

    /// Enable or disable dropping abandon regions before recognition.
    pub fn with_drop_abandon_regions(mut self, drop: bool) -> Self {
        self.drop_abandon_regions = drop;
        self
    }

    /// Set the post-processing options.
    pub fn with_postprocess(mut self, options: LayoutPostprocessOptions) -> Self {
        self.postprocess = options;
        self
    }

    /// Set the recognition concurrency policy.
    pub fn with_concurrency(mut self, concurrency: RegionConcurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the page formatting parallelism.
    pub fn with_parallel(mut self, parallel: ParallelPolicy) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> OcrResult<()> {
        if !self.score_threshold.is_finite() || !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(OCRError::config_error_with_context(
                "score_threshold",
                &self.score_threshold.to_string(),
                "must be within [0, 1]",
            ));
        }
        self.postprocess.validate()?;
        self.concurrency.validate()?;
        self.parallel.validate()?;
        Ok(())
    }

    fn default_score_threshold() -> f32 {
        DEFAULT_LAYOUT_SCORE_THRESHOLD
    }

    fn default_retry_without_threshold() -> bool {
        true
    }

    fn default_drop_abandon_regions() -> bool {
        true
    }
}

/// Result of parsing one page or a whole document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedDocument {
    /// Formatted pages, sorted by index.
    pub document: Document,
    /// Per-page Markdown joined with a blank line.
    pub markdown: String,
    /// Post-processing notes, prefixed with their page index.
    pub diagnostics: Vec<String>,
}

/// Document parser combining a layout detector with a region recognizer.
///
/// The parser holds only shared collaborators and immutable configuration,
/// so concurrent `parse_*` calls on one instance are independent.
pub struct DocParser {
    detector: Arc<dyn LayoutDetector>,
    recognizer: Arc<dyn RegionRecognizer>,
    config: DocParserConfig,
    postprocess: LayoutPostProcess,
    dispatcher: RegionDispatcher,
    formatter: LayoutResultFormatter,
}

impl std::fmt::Debug for DocParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocParser")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl DocParser {
    /// Creates a parser.
    ///
    /// The recognition concurrency is resolved here, once, from
    /// `config.concurrency` and the host's physical memory.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::ConfigError` if `labels` or `config` is invalid.
    pub fn new(
        detector: Arc<dyn LayoutDetector>,
        recognizer: Arc<dyn RegionRecognizer>,
        labels: LayoutLabelConfig,
        config: DocParserConfig,
    ) -> OcrResult<Self> {
        labels.validate()?;
        config.validate()?;

        let postprocess = LayoutPostProcess::new(labels, config.postprocess.clone());
        let dispatcher = RegionDispatcher::from_config(&config.concurrency);
        let formatter = LayoutResultFormatter::new(config.parallel.clone());
        info!(
            "DocParser ready: {} layout classes, recognition concurrency {}",
            postprocess.labels().id2label.len(),
            dispatcher.concurrency()
        );

        Ok(Self {
            detector,
            recognizer,
            config,
            postprocess,
            dispatcher,
            formatter,
        })
    }

    /// Replaces the dispatcher, e.g. to pin the concurrency in tests.
    pub fn with_dispatcher(mut self, dispatcher: RegionDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Returns a reference to the parser's configuration.
    pub fn config(&self) -> &DocParserConfig {
        &self.config
    }

    /// The layout post-processor used for every page.
    pub fn postprocess(&self) -> &LayoutPostProcess {
        &self.postprocess
    }

    /// Parses one page image.
    ///
    /// # Arguments
    ///
    /// * `page_index` - 0-based page index, used in image placeholders.
    /// * `image` - The page image.
    /// * `cancel` - Cancellation signal checked around detection and recognition.
    pub async fn parse_page(
        &self,
        page_index: usize,
        image: RgbImage,
        cancel: &CancellationToken,
    ) -> OcrResult<ParsedDocument> {
        let (page, diagnostics) = self.recognize_page(page_index, image, cancel).await?;
        let formatted = self.formatter.format(vec![page]);
        Ok(ParsedDocument {
            document: formatted.document,
            markdown: formatted.markdown,
            diagnostics,
        })
    }

    /// Parses several pages in order and merges them into one document.
    ///
    /// Pages are detected and recognized one after another; cancellation is
    /// checked between pages. Formatting runs once over all pages.
    ///
    /// # Errors
    ///
    /// Any page failure fails the whole document. Duplicate page indices are
    /// rejected with `OCRError::InvalidInput`.
    pub async fn parse_document(
        &self,
        pages: Vec<(usize, RgbImage)>,
        cancel: &CancellationToken,
    ) -> OcrResult<ParsedDocument> {
        let mut seen = BTreeSet::new();
        if let Some((duplicate, _)) = pages.iter().find(|(index, _)| !seen.insert(*index)) {
            return Err(OCRError::invalid_input(format!(
                "page index {duplicate} appears more than once"
            )));
        }

        let start = Instant::now();
        let page_count = pages.len();
        let mut recognized = Vec::with_capacity(page_count);
        let mut diagnostics = Vec::new();
        for (page_index, image) in pages {
            cancel.check("before parsing page")?;
            let (page, page_diagnostics) = self.recognize_page(page_index, image, cancel).await?;
            recognized.push(page);
            diagnostics.extend(page_diagnostics);
        }

        let formatted = self.formatter.format(recognized);
        info!(
            "Parsed {} pages ({} regions) in {:.2?}",
            page_count,
            formatted.document.region_count(),
            start.elapsed()
        );
        Ok(ParsedDocument {
            document: formatted.document,
            markdown: formatted.markdown,
            diagnostics,
        })
    }

    /// Parses the pages of `images` picked by `selection`.
    ///
    /// `images` holds every page of the source in order; selected 1-based
    /// page `p` becomes page index `p - 1`.
    pub async fn parse_selected(
        &self,
        images: Vec<RgbImage>,
        selection: &PageSelection,
        cancel: &CancellationToken,
    ) -> OcrResult<ParsedDocument> {
        let wanted: BTreeSet<usize> = selection
            .resolve(images.len())?
            .into_iter()
            .map(|page| page - 1)
            .collect();
        let pages = images
            .into_iter()
            .enumerate()
            .filter(|(index, _)| wanted.contains(index))
            .collect();
        self.parse_document(pages, cancel).await
    }

    /// Detects, post-processes and recognizes one page, without formatting.
    async fn recognize_page(
        &self,
        page_index: usize,
        image: RgbImage,
        cancel: &CancellationToken,
    ) -> OcrResult<(Page, Vec<String>)> {
        cancel.check("before layout detection")?;
        let PostprocessOutput {
            regions,
            diagnostics,
        } = self.detect_regions(page_index, &image).await?;
        for note in &diagnostics {
            warn!("Page {}: {}", page_index, note);
        }

        let regions = if self.config.drop_abandon_regions {
            drop_abandon_regions(regions)
        } else {
            regions
        };

        cancel.check("before region recognition")?;
        let regions = self
            .dispatcher
            .dispatch(
                page_index,
                Arc::new(image),
                regions,
                Arc::clone(&self.recognizer),
                cancel,
            )
            .await?;

        let diagnostics = diagnostics
            .into_iter()
            .map(|note| format!("page {page_index}: {note}"))
            .collect();
        Ok((Page::new(page_index, regions), diagnostics))
    }

    /// Runs detection and post-processing, retrying once without a score
    /// threshold when the first pass yields nothing.
    async fn detect_regions(
        &self,
        page_index: usize,
        image: &RgbImage,
    ) -> OcrResult<PostprocessOutput> {
        let raw = self
            .detector
            .detect(image, self.config.score_threshold)
            .await?;
        let output = self.postprocess.apply(&raw)?;
        if !output.regions.is_empty() || !self.config.retry_without_threshold {
            return Ok(output);
        }

        debug!(
            "Page {}: no regions at score threshold {}, retrying without threshold",
            page_index, self.config.score_threshold
        );
        let raw = self.detector.detect(image, f32::NEG_INFINITY).await?;
        self.postprocess.apply(&raw)
    }
}

/// Removes abandon regions and re-densifies indices.
fn drop_abandon_regions(regions: Vec<ProcessedRegion>) -> Vec<ProcessedRegion> {
    let before = regions.len();
    let kept: Vec<ProcessedRegion> = regions
        .into_iter()
        .filter(|region| region.task_type != LayoutTaskType::Abandon)
        .enumerate()
        .map(|(index, mut region)| {
            region.index = index;
            region
        })
        .collect();
    if kept.len() != before {
        debug!("Dropped {} abandon regions", before - kept.len());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::labels::RecognitionTask;
    use crate::processors::geometry::NormalizedBBox;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns canned detections; an empty answer for finite thresholds when `only_on_retry`.
    struct FixedDetector {
        raw: RawDetections,
        only_on_retry: bool,
        thresholds: Mutex<Vec<f32>>,
    }

    impl FixedDetector {
        fn new(raw: RawDetections) -> Self {
            Self {
                raw,
                only_on_retry: false,
                thresholds: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LayoutDetector for FixedDetector {
        async fn detect(&self, _image: &RgbImage, score_threshold: f32) -> OcrResult<RawDetections> {
            self.thresholds.lock().unwrap().push(score_threshold);
            if self.only_on_retry && score_threshold.is_finite() {
                return Ok(RawDetections::default());
            }
            Ok(self.raw.clone())
        }
    }

    /// Echoes the task and crop width.
    #[derive(Default)]
    struct EchoRecognizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RegionRecognizer for EchoRecognizer {
        async fn recognize(&self, image: RgbImage, task: RecognitionTask) -> OcrResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match task {
                RecognitionTask::Formula => "x^2".to_string(),
                _ => format!("{} {}", task.as_str(), image.width()),
            })
        }
    }

    // Class IDs from the PP-DocLayout-V3 table.
    const DOC_TITLE: usize = 6;
    const TEXT: usize = 22;
    const IMAGE: usize = 14;
    const HEADER: usize = 12;
    const DISPLAY_FORMULA: usize = 5;

    fn raw(detections: &[(usize, f32, [i32; 4])]) -> RawDetections {
        RawDetections {
            scores: detections.iter().map(|d| d.1).collect(),
            labels: detections.iter().map(|d| d.0).collect(),
            boxes: detections
                .iter()
                .map(|d| NormalizedBBox::new(d.2[0], d.2[1], d.2[2], d.2[3]))
                .collect(),
            order_seq: None,
            polygons: None,
        }
    }

    fn page_image() -> RgbImage {
        RgbImage::from_pixel(100, 100, image::Rgb([255, 255, 255]))
    }

    fn parser(detector: FixedDetector, recognizer: Arc<EchoRecognizer>) -> DocParser {
        DocParser::new(
            Arc::new(detector),
            recognizer,
            LayoutLabelConfig::pp_doclayout_v3(),
            DocParserConfig::default(),
        )
        .unwrap()
        .with_dispatcher(RegionDispatcher::new(2))
    }

    #[test]
    fn test_label_ids_used_by_tests() {
        let labels = LayoutLabelConfig::pp_doclayout_v3();
        assert_eq!(labels.label(DOC_TITLE), Some("doc_title"));
        assert_eq!(labels.label(TEXT), Some("text"));
        assert_eq!(labels.label(IMAGE), Some("image"));
        assert_eq!(labels.label(HEADER), Some("header"));
        assert_eq!(labels.label(DISPLAY_FORMULA), Some("display_formula"));
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config: DocParserConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.score_threshold, 0.3);
        assert!(config.retry_without_threshold);
        assert!(config.drop_abandon_regions);
        assert!(config.postprocess.merge_mode_by_class_id.is_some());
        assert!(config.validate().is_ok());

        assert!(
            DocParserConfig::new()
                .with_score_threshold(1.5)
                .validate()
                .is_err()
        );
        assert!(
            DocParserConfig::new()
                .with_score_threshold(f32::NAN)
                .validate()
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_parse_page_end_to_end() {
        let detector = FixedDetector::new(raw(&[
            (TEXT, 0.9, [100, 300, 900, 400]),
            (DOC_TITLE, 0.95, [100, 50, 900, 120]),
            (HEADER, 0.8, [0, 0, 1000, 30]),
            (IMAGE, 0.9, [100, 500, 600, 800]),
        ]));
        let recognizer = Arc::new(EchoRecognizer::default());
        let parser = parser(detector, recognizer.clone());

        let parsed = parser
            .parse_page(0, page_image(), &CancellationToken::new())
            .await
            .unwrap();

        // Header dropped; title, text, image in reading order.
        let page = &parsed.document.pages[0];
        let labels: Vec<&str> = page.regions.iter().map(|r| r.native_label.as_str()).collect();
        assert_eq!(labels, vec!["doc_title", "text", "image"]);
        assert_eq!(
            page.regions.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            parsed.markdown,
            "# text 80\n\ntext 80\n\n![](page=0,bbox=[100,500,600,800])"
        );
        assert_eq!(
            parsed.diagnostics,
            vec!["page 0: order_seq missing; using (y1, x1) fallback ordering".to_string()]
        );
    }

    #[tokio::test]
    async fn test_retry_without_threshold_when_first_pass_is_empty() {
        let mut detector = FixedDetector::new(raw(&[(TEXT, 0.1, [100, 100, 900, 200])]));
        detector.only_on_retry = true;
        let detector = Arc::new(detector);
        let recognizer = Arc::new(EchoRecognizer::default());
        let parser = DocParser::new(
            detector.clone(),
            recognizer,
            LayoutLabelConfig::pp_doclayout_v3(),
            DocParserConfig::default(),
        )
        .unwrap();

        let parsed = parser
            .parse_page(0, page_image(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(parsed.document.region_count(), 1);
        let thresholds = detector.thresholds.lock().unwrap().clone();
        assert_eq!(thresholds.len(), 2);
        assert_eq!(thresholds[0], 0.3);
        assert_eq!(thresholds[1], f32::NEG_INFINITY);
    }

    #[tokio::test]
    async fn test_no_retry_when_disabled() {
        let mut detector = FixedDetector::new(raw(&[(TEXT, 0.1, [100, 100, 900, 200])]));
        detector.only_on_retry = true;
        let parser = DocParser::new(
            Arc::new(detector),
            Arc::new(EchoRecognizer::default()),
            LayoutLabelConfig::pp_doclayout_v3(),
            DocParserConfig::new().with_retry_without_threshold(false),
        )
        .unwrap();

        let parsed = parser
            .parse_page(3, page_image(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(parsed.document.pages.len(), 1);
        assert_eq!(parsed.document.pages[0].index, 3);
        assert!(parsed.document.pages[0].regions.is_empty());
        assert_eq!(parsed.markdown, "");
    }

    #[tokio::test]
    async fn test_abandon_region_fails_page_when_not_dropped() {
        let detector = FixedDetector::new(raw(&[
            (TEXT, 0.9, [100, 300, 900, 400]),
            (HEADER, 0.8, [0, 0, 1000, 30]),
        ]));
        let parser = DocParser::new(
            Arc::new(detector),
            Arc::new(EchoRecognizer::default()),
            LayoutLabelConfig::pp_doclayout_v3(),
            DocParserConfig::new().with_drop_abandon_regions(false),
        )
        .unwrap();

        let err = parser
            .parse_page(0, page_image(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OCRError::UnexpectedAbandonRegion { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_parse_document_merges_pages_in_index_order() {
        let detector = FixedDetector::new(raw(&[
            (DISPLAY_FORMULA, 0.9, [100, 100, 900, 200]),
            (IMAGE, 0.9, [100, 300, 500, 600]),
        ]));
        let parser = parser(detector, Arc::new(EchoRecognizer::default()));

        let parsed = parser
            .parse_document(
                vec![(1, page_image()), (0, page_image())],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let indices: Vec<usize> = parsed.document.pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(
            parsed.markdown,
            "$$\nx^2\n$$\n\n![](page=0,bbox=[100,300,500,600])\n\n\
             $$\nx^2\n$$\n\n![](page=1,bbox=[100,300,500,600])"
        );
        assert_eq!(parsed.diagnostics.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_pages_merge_like_parse_document() {
        let detector = FixedDetector::new(raw(&[
            (DOC_TITLE, 0.9, [100, 50, 900, 90]),
            (TEXT, 0.9, [100, 100, 900, 200]),
            (IMAGE, 0.9, [100, 300, 500, 600]),
        ]));
        let parser = parser(detector, Arc::new(EchoRecognizer::default()));
        let cancel = CancellationToken::new();

        let (second, first) = tokio::join!(
            parser.parse_page(1, page_image(), &cancel),
            parser.parse_page(0, page_image(), &cancel),
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        let merged = Document::merge([second.document, first.document]);

        let whole = parser
            .parse_document(vec![(0, page_image()), (1, page_image())], &cancel)
            .await
            .unwrap();
        assert_eq!(merged, whole.document);
        assert_eq!(
            format!("{}\n\n{}", first.markdown, second.markdown),
            whole.markdown
        );
    }

    #[tokio::test]
    async fn test_parse_document_rejects_duplicate_pages() {
        let parser = parser(
            FixedDetector::new(RawDetections::default()),
            Arc::new(EchoRecognizer::default()),
        );
        let err = parser
            .parse_document(
                vec![(0, page_image()), (0, page_image())],
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OCRError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_parse_selected_maps_pages_to_zero_based_indices() {
        let detector = FixedDetector::new(raw(&[(IMAGE, 0.9, [0, 0, 500, 500])]));
        let parser = parser(detector, Arc::new(EchoRecognizer::default()));
        let selection = PageSelection::parse(Some("1, 3")).unwrap();

        let parsed = parser
            .parse_selected(
                vec![page_image(), page_image(), page_image()],
                &selection,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let indices: Vec<usize> = parsed.document.pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 2]);

        let err = parser
            .parse_selected(vec![page_image()], &selection, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OCRError::PageSelection(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_detection() {
        let detector = Arc::new(FixedDetector::new(raw(&[(TEXT, 0.9, [0, 0, 500, 500])])));
        let parser = DocParser::new(
            detector.clone(),
            Arc::new(EchoRecognizer::default()),
            LayoutLabelConfig::pp_doclayout_v3(),
            DocParserConfig::default(),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = parser.parse_page(0, page_image(), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(detector.thresholds.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_abandon_regions_redensifies() {
        let region = |index: usize, label: &str| ProcessedRegion {
            index,
            class_id: 0,
            native_label: label.to_string(),
            score: 0.9,
            order: None,
            task_type: crate::domain::labels::task_type_for_label(label),
            bbox: NormalizedBBox::new(0, 0, 10, 10),
            polygon: NormalizedBBox::new(0, 0, 10, 10).polygon(),
            content: None,
        };
        let kept = drop_abandon_regions(vec![
            region(0, "header"),
            region(1, "text"),
            region(2, "footer"),
            region(3, "table"),
        ]);
        let summary: Vec<(usize, &str)> = kept
            .iter()
            .map(|r| (r.index, r.native_label.as_str()))
            .collect();
        assert_eq!(summary, vec![(0, "text"), (1, "table")]);
    }
}
