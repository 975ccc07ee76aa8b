//! Document structure types.
//!
//! This module defines the region, page and document types that flow from the
//! layout postprocessor through recognition and formatting, plus the
//! block-list JSON export consumed by downstream tooling.

use crate::core::errors::OcrResult;
use crate::domain::labels::{LayoutTaskType, RegionKind, region_kind_for_label};
use crate::processors::geometry::{NormalizedBBox, NormalizedPoint};
use serde::{Deserialize, Serialize};

/// A layout region on one page.
///
/// `index` is the 0-based reading-order position and is kept dense after
/// every filtering or merge pass. `content` is `None` until recognition fills
/// it, and stays `None` for regions that are not recognized (images, charts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRegion {
    /// 0-based reading-order index within the page.
    pub index: usize,
    /// Detector class ID.
    pub class_id: usize,
    /// Native label (e.g. `doc_title`, `table`, `image`).
    pub native_label: String,
    /// Detection confidence.
    pub score: f32,
    /// Externally supplied reading order, when positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// What the pipeline does with this region.
    pub task_type: LayoutTaskType,
    /// Region bounds.
    pub bbox: NormalizedBBox,
    /// Region outline, at least 3 points.
    pub polygon: Vec<NormalizedPoint>,
    /// Recognized (and later formatted) content.
    #[serde(default)]
    pub content: Option<String>,
}

impl ProcessedRegion {
    /// Formatting kind derived from the native label.
    pub fn kind(&self) -> RegionKind {
        region_kind_for_label(&self.native_label)
    }

    /// Returns the region with its content replaced.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// One page of regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 0-based page index within the document.
    pub index: usize,
    /// Regions in reading order.
    pub regions: Vec<ProcessedRegion>,
}

impl Page {
    /// Creates a new page.
    pub fn new(index: usize, regions: Vec<ProcessedRegion>) -> Self {
        Self { index, regions }
    }
}

/// A multi-page document with pages kept sorted by index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Pages sorted by `index`.
    pub pages: Vec<Page>,
}

impl Document {
    /// Creates a document, sorting pages by index.
    pub fn new(mut pages: Vec<Page>) -> Self {
        pages.sort_by_key(|page| page.index);
        Self { pages }
    }

    /// Merges documents into one, keeping pages sorted by index.
    ///
    /// Use this to combine pages parsed independently, for example by
    /// concurrent [`DocParser::parse_page`](crate::pipeline::DocParser::parse_page)
    /// calls. The result equals what `parse_document` returns for the same pages.
    pub fn merge(documents: impl IntoIterator<Item = Document>) -> Self {
        Self::new(documents.into_iter().flat_map(|doc| doc.pages).collect())
    }

    /// Total number of regions across all pages.
    pub fn region_count(&self) -> usize {
        self.pages.iter().map(|page| page.regions.len()).sum()
    }

    /// Converts the document to the block-list export: one array per page.
    ///
    /// Pages and regions are sorted by index. Labels collapse to `"image"` for
    /// image-kind regions and `"text"` for everything else.
    pub fn to_block_list(&self) -> Vec<Vec<BlockListItem>> {
        let mut pages: Vec<&Page> = self.pages.iter().collect();
        pages.sort_by_key(|page| page.index);
        pages
            .into_iter()
            .map(|page| {
                let mut regions: Vec<&ProcessedRegion> = page.regions.iter().collect();
                regions.sort_by_key(|region| region.index);
                regions.into_iter().map(BlockListItem::from_region).collect()
            })
            .collect()
    }

    /// Serializes the block-list export to JSON.
    pub fn to_block_list_json(&self, pretty: bool) -> OcrResult<String> {
        let export = self.to_block_list();
        let json = if pretty {
            serde_json::to_string_pretty(&export)?
        } else {
            serde_json::to_string(&export)?
        };
        Ok(json)
    }
}

/// One region in the block-list export.
///
/// Field order (`index`, `label`, `content`, `bbox_2d`) is part of the export format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockListItem {
    /// Reading-order index.
    pub index: usize,
    /// `"image"` or `"text"`.
    pub label: String,
    /// Region content, empty when absent.
    pub content: String,
    /// `[x1, y1, x2, y2]` in normalized coordinates.
    pub bbox_2d: [i32; 4],
}

impl BlockListItem {
    fn from_region(region: &ProcessedRegion) -> Self {
        let label = match region.kind() {
            RegionKind::Image => "image",
            _ => "text",
        };
        Self {
            index: region.index,
            label: label.to_string(),
            content: region.content.clone().unwrap_or_default(),
            bbox_2d: region.bbox.to_array(),
        }
    }
}
