//! Layout Detection Post-processing
//!
//! This module turns raw layout detector output into an ordered list of
//! [`ProcessedRegion`]s. The pipeline is deterministic and runs in a fixed order:
//! count validation, order/polygon adoption, geometric filtering, NMS,
//! containment merging, reading-order sorting, unclipping and materialization.
//!
//! Only mismatched score/label/box counts are a hard error. Everything else
//! degrades with a diagnostic string so callers can decide whether the result
//! is acceptable.

use crate::core::constants::{DEFAULT_IOU_DIFFERENT_CLASS, DEFAULT_IOU_SAME_CLASS};
use crate::core::errors::{OCRError, OcrResult};
use crate::domain::labels::{LayoutLabelConfig, task_type_for_label};
use crate::domain::structure::ProcessedRegion;
use crate::processors::geometry::{
    NormalizedBBox, NormalizedPoint, UnclipRatio, iou, is_contained,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Containment merge mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeBboxMode {
    /// Keep containers, drop contained boxes.
    Large,
    /// Keep contained boxes, drop containers that are not themselves contained.
    Small,
    /// Keep everything.
    Union,
}

/// Raw layout detector output: parallel arrays of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetections {
    /// Detection confidences.
    pub scores: Vec<f32>,
    /// Detector class IDs.
    pub labels: Vec<usize>,
    /// Detection boxes in normalized coordinates.
    pub boxes: Vec<NormalizedBBox>,
    /// Optional per-detection reading order.
    #[serde(default)]
    pub order_seq: Option<Vec<i64>>,
    /// Optional per-detection outlines.
    #[serde(default)]
    pub polygons: Option<Vec<Vec<NormalizedPoint>>>,
}

impl RawDetections {
    /// Number of detections according to `scores`.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true if there are no detections.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Options for [`LayoutPostProcess`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPostprocessOptions {
    /// Whether to run NMS.
    #[serde(default = "LayoutPostprocessOptions::default_apply_nms")]
    pub apply_nms: bool,

    /// IoU at or above which a same-class detection is suppressed.
    /// Default: 0.6
    #[serde(default = "LayoutPostprocessOptions::default_iou_same_class")]
    pub iou_same_class: f32,

    /// IoU at or above which a different-class detection is suppressed.
    /// Default: 0.98
    #[serde(default = "LayoutPostprocessOptions::default_iou_different_class")]
    pub iou_different_class: f32,

    /// Global containment merge mode. Ignored when `merge_mode_by_class_id` is set.
    #[serde(default)]
    pub merge_mode: Option<MergeBboxMode>,

    /// Per-anchor-class containment merge modes.
    #[serde(default)]
    pub merge_mode_by_class_id: Option<BTreeMap<usize, MergeBboxMode>>,

    /// Global unclip ratio.
    #[serde(default)]
    pub unclip_ratio: Option<UnclipRatio>,

    /// Per-class unclip ratios, taking precedence over `unclip_ratio`.
    #[serde(default)]
    pub unclip_ratio_by_class_id: Option<BTreeMap<usize, UnclipRatio>>,
}

impl Default for LayoutPostprocessOptions {
    fn default() -> Self {
        Self {
            apply_nms: Self::default_apply_nms(),
            iou_same_class: Self::default_iou_same_class(),
            iou_different_class: Self::default_iou_different_class(),
            merge_mode: None,
            merge_mode_by_class_id: None,
            unclip_ratio: None,
            unclip_ratio_by_class_id: None,
        }
    }
}

impl LayoutPostprocessOptions {
    /// Create new options with NMS enabled and no merging or unclipping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options used with PP-DocLayout-V3: NMS plus the per-class merge table.
    pub fn pp_doclayout_v3() -> Self {
        Self::default().with_merge_mode_by_class_id(Some(default_merge_mode_by_class_id()))
    }

    /// Enable or disable NMS.
    pub fn with_apply_nms(mut self, apply: bool) -> Self {
        self.apply_nms = apply;
        self
    }

    /// Set the same-class and different-class IoU thresholds.
    pub fn with_iou_thresholds(mut self, same_class: f32, different_class: f32) -> Self {
        self.iou_same_class = same_class;
        self.iou_different_class = different_class;
        self
    }

    /// Set the global merge mode.
    pub fn with_merge_mode(mut self, mode: Option<MergeBboxMode>) -> Self {
        self.merge_mode = mode;
        self
    }

    /// Set the per-class merge modes.
    pub fn with_merge_mode_by_class_id(
        mut self,
        modes: Option<BTreeMap<usize, MergeBboxMode>>,
    ) -> Self {
        self.merge_mode_by_class_id = modes;
        self
    }

    /// Set the global unclip ratio.
    pub fn with_unclip_ratio(mut self, ratio: Option<UnclipRatio>) -> Self {
        self.unclip_ratio = ratio;
        self
    }

    /// Set the per-class unclip ratios.
    pub fn with_unclip_ratio_by_class_id(
        mut self,
        ratios: Option<BTreeMap<usize, UnclipRatio>>,
    ) -> Self {
        self.unclip_ratio_by_class_id = ratios;
        self
    }

    /// Validates thresholds and ratios.
    pub fn validate(&self) -> OcrResult<()> {
        for (field, value) in [
            ("iou_same_class", self.iou_same_class),
            ("iou_different_class", self.iou_different_class),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OCRError::config_error_with_context(
                    field,
                    &value.to_string(),
                    "must be within [0, 1]",
                ));
            }
        }

        let ratios = self.unclip_ratio.iter().chain(
            self.unclip_ratio_by_class_id
                .iter()
                .flat_map(|ratios| ratios.values()),
        );
        for ratio in ratios {
            if !ratio.is_valid() {
                return Err(OCRError::config_error_with_context(
                    "unclip_ratio",
                    &format!("({}, {})", ratio.width_ratio, ratio.height_ratio),
                    "ratios must be finite and positive",
                ));
            }
        }
        Ok(())
    }

    fn default_apply_nms() -> bool {
        true
    }

    fn default_iou_same_class() -> f32 {
        DEFAULT_IOU_SAME_CLASS
    }

    fn default_iou_different_class() -> f32 {
        DEFAULT_IOU_DIFFERENT_CLASS
    }

    fn unclip_ratio_for(&self, class_id: usize) -> Option<UnclipRatio> {
        self.unclip_ratio_by_class_id
            .as_ref()
            .and_then(|ratios| ratios.get(&class_id).copied())
            .or(self.unclip_ratio)
    }
}

/// Per-class merge table for the 25 PP-DocLayout-V3 classes.
///
/// Every class merges as `large` except `reference` (class 18), which merges as `small`.
pub fn default_merge_mode_by_class_id() -> BTreeMap<usize, MergeBboxMode> {
    (0..25)
        .map(|class_id| {
            let mode = if class_id == 18 {
                MergeBboxMode::Small
            } else {
                MergeBboxMode::Large
            };
            (class_id, mode)
        })
        .collect()
}

/// A detection between raw output and region materialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Detector class ID.
    pub class_id: usize,
    /// Detection confidence.
    pub score: f32,
    /// Detection box.
    pub bbox: NormalizedBBox,
    /// Reading order from `order_seq`, if adopted.
    pub order: Option<i64>,
    /// Outline from `polygons`, if adopted.
    pub polygon: Option<Vec<NormalizedPoint>>,
}

/// Output of [`LayoutPostProcess::apply`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostprocessOutput {
    /// Regions in reading order with dense indices.
    pub regions: Vec<ProcessedRegion>,
    /// Notes about degraded inputs (mismatched or missing order/polygons).
    pub diagnostics: Vec<String>,
}

/// Deterministic post-processor for layout detections.
///
/// Holds only immutable configuration, so one instance can be shared across
/// pages and threads.
#[derive(Debug, Clone)]
pub struct LayoutPostProcess {
    labels: LayoutLabelConfig,
    options: LayoutPostprocessOptions,
    preserve_class_ids: BTreeSet<usize>,
}

impl LayoutPostProcess {
    /// Creates a new layout post-processor.
    ///
    /// # Arguments
    ///
    /// * `labels` - Class ID to native label table.
    /// * `options` - NMS, merge and unclip options.
    pub fn new(labels: LayoutLabelConfig, options: LayoutPostprocessOptions) -> Self {
        let preserve_class_ids = labels.preserve_class_ids();
        Self {
            labels,
            options,
            preserve_class_ids,
        }
    }

    /// The label configuration.
    pub fn labels(&self) -> &LayoutLabelConfig {
        &self.labels
    }

    /// The post-processing options.
    pub fn options(&self) -> &LayoutPostprocessOptions {
        &self.options
    }

    /// Applies post-processing to raw detections.
    ///
    /// # Arguments
    ///
    /// * `raw` - Detector output.
    ///
    /// # Returns
    ///
    /// Ordered regions plus diagnostics, or `OCRError::InvalidRawCounts` when
    /// `scores`, `labels` and `boxes` differ in length.
    pub fn apply(&self, raw: &RawDetections) -> OcrResult<PostprocessOutput> {
        let count = raw.scores.len();
        if raw.labels.len() != count || raw.boxes.len() != count {
            return Err(OCRError::InvalidRawCounts {
                scores: raw.scores.len(),
                labels: raw.labels.len(),
                boxes: raw.boxes.len(),
            });
        }

        let mut diagnostics = Vec::new();
        let order_seq = match &raw.order_seq {
            Some(seq) if seq.len() == count => Some(seq.as_slice()),
            Some(_) => {
                diagnostics.push("order_seq count mismatch; using fallback ordering".to_string());
                None
            }
            None => None,
        };
        let polygons = match &raw.polygons {
            Some(polys) if polys.len() == count => Some(polys.as_slice()),
            Some(_) => {
                diagnostics
                    .push("polygon count mismatch; falling back to bbox polygons".to_string());
                None
            }
            None => None,
        };

        let mut detections: Vec<Detection> = (0..count)
            .map(|i| Detection {
                class_id: raw.labels[i],
                score: raw.scores[i],
                bbox: raw.boxes[i],
                order: order_seq.map(|seq| seq[i]),
                polygon: polygons.map(|polys| polys[i].clone()),
            })
            .filter(|det| det.bbox.is_valid())
            .collect();
        let valid_count = detections.len();

        if self.options.apply_nms {
            detections = nms(
                detections,
                self.options.iou_same_class,
                self.options.iou_different_class,
            );
        }
        let after_nms = detections.len();

        if let Some(modes) = &self.options.merge_mode_by_class_id {
            detections = containment_merge_by_class(detections, &self.preserve_class_ids, modes);
        } else if let Some(mode) = self.options.merge_mode {
            detections = containment_merge_global(detections, &self.preserve_class_ids, mode);
        }

        if order_seq.is_some() {
            detections.sort_by(|a, b| {
                a.order
                    .unwrap_or(0)
                    .cmp(&b.order.unwrap_or(0))
                    .then_with(|| a.bbox.reading_order_key().cmp(&b.bbox.reading_order_key()))
            });
        } else {
            diagnostics.push("order_seq missing; using (y1, x1) fallback ordering".to_string());
            detections.sort_by_key(|det| det.bbox.reading_order_key());
        }

        for det in &mut detections {
            if let Some(ratio) = self.options.unclip_ratio_for(det.class_id)
                && !ratio.is_identity()
            {
                det.bbox = det.bbox.unclip(ratio);
                det.polygon = None;
            }
        }

        let regions = self.materialize(detections);
        debug!(
            input = count,
            valid = valid_count,
            after_nms,
            regions = regions.len(),
            "layout postprocess complete"
        );

        Ok(PostprocessOutput {
            regions,
            diagnostics,
        })
    }

    fn materialize(&self, detections: Vec<Detection>) -> Vec<ProcessedRegion> {
        let mut regions = Vec::with_capacity(detections.len());
        for det in detections {
            let bbox = det.bbox.clamped();
            if !bbox.is_valid() {
                continue;
            }

            let native_label = self.labels.label_or_fallback(det.class_id);
            let task_type = task_type_for_label(&native_label);
            let polygon = match det.polygon {
                Some(poly) if poly.len() >= 3 => poly.iter().map(NormalizedPoint::clamped).collect(),
                _ => bbox.polygon(),
            };

            regions.push(ProcessedRegion {
                index: regions.len(),
                class_id: det.class_id,
                native_label,
                score: det.score,
                order: det.order.filter(|order| *order > 0),
                task_type,
                bbox,
                polygon,
                content: None,
            });
        }
        regions
    }
}

/// Greedy non-maximum suppression.
///
/// Detections are visited in descending score order (ties keep input order);
/// each kept detection suppresses every remaining one whose IoU with it is at
/// or above the same-class or different-class threshold.
pub fn nms(detections: Vec<Detection>, iou_same_class: f32, iou_different_class: f32) -> Vec<Detection> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| {
        detections[b]
            .score
            .partial_cmp(&detections[a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut suppressed = vec![false; detections.len()];
    let mut keep = Vec::with_capacity(detections.len());
    for (pos, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for &j in &order[pos + 1..] {
            if suppressed[j] {
                continue;
            }
            let threshold = if detections[i].class_id == detections[j].class_id {
                iou_same_class
            } else {
                iou_different_class
            };
            if iou(&detections[i].bbox, &detections[j].bbox) >= threshold {
                suppressed[j] = true;
            }
        }
    }

    let mut slots: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();
    keep.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// Global containment merge over all detections.
///
/// Detections whose class is in `preserve_class_ids` are never flagged as
/// contained and so are never removed.
pub fn containment_merge_global(
    detections: Vec<Detection>,
    preserve_class_ids: &BTreeSet<usize>,
    mode: MergeBboxMode,
) -> Vec<Detection> {
    if detections.len() <= 1 || mode == MergeBboxMode::Union {
        return detections;
    }
    let flags = check_containment(&detections, preserve_class_ids, None);
    let keep: Vec<bool> = (0..detections.len())
        .map(|i| flags.keeps(i, mode))
        .collect();
    retain_by_mask(detections, &keep)
}

/// Per-class containment merge.
///
/// Each configured class acts as an anchor in ascending class-ID order;
/// `large` drops boxes contained by an anchor-class box, `small` drops boxes
/// that contain an anchor-class box unless they are themselves contained.
/// Keep decisions are ANDed across anchors.
pub fn containment_merge_by_class(
    detections: Vec<Detection>,
    preserve_class_ids: &BTreeSet<usize>,
    modes: &BTreeMap<usize, MergeBboxMode>,
) -> Vec<Detection> {
    if detections.len() <= 1 {
        return detections;
    }
    let mut keep = vec![true; detections.len()];
    for (&anchor, &mode) in modes {
        if mode == MergeBboxMode::Union {
            continue;
        }
        let flags = check_containment(&detections, preserve_class_ids, Some((anchor, mode)));
        for (i, slot) in keep.iter_mut().enumerate() {
            *slot = *slot && flags.keeps(i, mode);
        }
    }
    retain_by_mask(detections, &keep)
}

struct ContainmentFlags {
    contains_other: Vec<bool>,
    contained_by_other: Vec<bool>,
}

impl ContainmentFlags {
    fn keeps(&self, i: usize, mode: MergeBboxMode) -> bool {
        match mode {
            MergeBboxMode::Union => true,
            MergeBboxMode::Large => !self.contained_by_other[i],
            MergeBboxMode::Small => !self.contains_other[i] || self.contained_by_other[i],
        }
    }
}

fn check_containment(
    detections: &[Detection],
    preserve_class_ids: &BTreeSet<usize>,
    anchor: Option<(usize, MergeBboxMode)>,
) -> ContainmentFlags {
    let n = detections.len();
    let mut flags = ContainmentFlags {
        contains_other: vec![false; n],
        contained_by_other: vec![false; n],
    };

    for i in 0..n {
        if preserve_class_ids.contains(&detections[i].class_id) {
            continue;
        }
        for j in 0..n {
            if i == j {
                continue;
            }
            let eligible = match anchor {
                None => true,
                Some((class_id, MergeBboxMode::Large)) => detections[j].class_id == class_id,
                Some((class_id, MergeBboxMode::Small)) => detections[i].class_id == class_id,
                Some((_, MergeBboxMode::Union)) => false,
            };
            if eligible && is_contained(&detections[i].bbox, &detections[j].bbox) {
                flags.contained_by_other[i] = true;
                flags.contains_other[j] = true;
            }
        }
    }
    flags
}

fn retain_by_mask(detections: Vec<Detection>, keep: &[bool]) -> Vec<Detection> {
    detections
        .into_iter()
        .zip(keep)
        .filter_map(|(det, &keep)| keep.then_some(det))
        .collect()
}
