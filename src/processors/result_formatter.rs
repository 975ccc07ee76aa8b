//! Layout result formatting.
//!
//! Turns recognized regions into their final Markdown-ready form: per-region
//! content normalization, cross-region merges (formula numbers, hyphenated
//! words, bullet alignment) and Markdown rendering with image placeholders.
//! Formatting never fails; malformed content passes through best-effort.

use crate::core::config::ParallelPolicy;
use crate::core::constants::BULLET_ALIGNMENT_TOLERANCE;
use crate::domain::labels::RegionKind;
use crate::domain::structure::{Document, Page, ProcessedRegion};
use crate::processors::geometry::NormalizedBBox;
use crate::utils::text;
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A formatted document and its Markdown rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormattedDocument {
    /// Formatted pages, sorted by index.
    pub document: Document,
    /// Per-page Markdown joined with a blank line.
    pub markdown: String,
}

/// Formatter for recognized layout regions.
#[derive(Debug, Clone, Default)]
pub struct LayoutResultFormatter {
    parallel: ParallelPolicy,
}

impl LayoutResultFormatter {
    /// Creates a formatter using `parallel` to decide when to fan pages out over rayon.
    pub fn new(parallel: ParallelPolicy) -> Self {
        Self { parallel }
    }

    /// Formats pages and renders the joined Markdown.
    ///
    /// Pages are sorted by index first; output order does not depend on
    /// whether pages were formatted in parallel.
    pub fn format(&self, mut pages: Vec<Page>) -> FormattedDocument {
        pages.sort_by_key(|page| page.index);

        let formatted: Vec<(Page, String)> = if self.parallel.use_parallel_for_pages(pages.len()) {
            debug!("Formatting {} pages in parallel", pages.len());
            self.format_parallel(pages)
        } else {
            pages.into_iter().map(format_page).collect()
        };

        let mut markdown_pages = Vec::with_capacity(formatted.len());
        let mut document_pages = Vec::with_capacity(formatted.len());
        for (page, markdown) in formatted {
            markdown_pages.push(markdown);
            document_pages.push(page);
        }

        FormattedDocument {
            document: Document::new(document_pages),
            markdown: markdown_pages.join("\n\n"),
        }
    }

    fn format_parallel(&self, pages: Vec<Page>) -> Vec<(Page, String)> {
        let run = |pages: Vec<Page>| -> Vec<(Page, String)> {
            pages.into_par_iter().map(format_page).collect()
        };
        match self.parallel.max_threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(|| run(pages)),
                Err(err) => {
                    warn!("Falling back to the global rayon pool: {}", err);
                    run(pages)
                }
            },
            None => run(pages),
        }
    }
}

fn format_page(page: Page) -> (Page, String) {
    let regions = format_regions(page.regions);
    let page = Page::new(page.index, regions);
    let markdown = render_markdown(&page);
    (page, markdown)
}

/// Formats the regions of one page.
///
/// Regions are stable-sorted by index, normalized, stripped of empty content,
/// then merged. Indices are re-densified after every pass.
pub fn format_regions(regions: Vec<ProcessedRegion>) -> Vec<ProcessedRegion> {
    let mut regions = regions;
    regions.sort_by_key(|region| region.index);

    let mut formatted = Vec::with_capacity(regions.len());
    for mut region in regions {
        region.content = region
            .content
            .as_deref()
            .map(|content| format_content(content, region.kind(), &region.native_label));
        if region
            .content
            .as_deref()
            .is_some_and(|content| content.trim().is_empty())
        {
            continue;
        }
        region.index = formatted.len();
        formatted.push(region);
    }

    let formatted = merge_formula_numbers(formatted);
    let formatted = merge_hyphenated_blocks(formatted);
    format_bullet_points(formatted)
}

/// Normalizes the content of a single region.
pub fn format_content(content: &str, kind: RegionKind, native_label: &str) -> String {
    let mut output = text::clean_content(content);

    match native_label {
        "doc_title" => output = text::format_doc_title(&output),
        "paragraph_title" => output = text::format_paragraph_title(&output),
        _ => {}
    }

    match kind {
        RegionKind::Formula => text::format_formula(&output),
        RegionKind::Text => text::format_text(&output),
        _ => output,
    }
}

/// Renders one formatted page as Markdown.
pub fn render_markdown(page: &Page) -> String {
    page.regions
        .iter()
        .filter_map(|region| {
            if region.kind() == RegionKind::Image {
                Some(image_placeholder(page.index, &region.bbox))
            } else {
                region.content.clone().filter(|content| !content.is_empty())
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The Markdown placeholder for an image region: `![](page=<p>,bbox=[x1,y1,x2,y2])`.
pub fn image_placeholder(page_index: usize, bbox: &NormalizedBBox) -> String {
    format!(
        "![](page={},bbox=[{},{},{},{}])",
        page_index, bbox.x1, bbox.y1, bbox.x2, bbox.y2
    )
}

fn renumber(mut regions: Vec<ProcessedRegion>) -> Vec<ProcessedRegion> {
    for (index, region) in regions.iter_mut().enumerate() {
        region.index = index;
    }
    regions
}

fn with_formula_tag(mut formula: ProcessedRegion, number: &ProcessedRegion) -> ProcessedRegion {
    let number = text::clean_formula_number(number.content.as_deref().unwrap_or(""));
    if let Some(tagged) = formula
        .content
        .as_deref()
        .and_then(|content| text::attach_formula_tag(content, number))
    {
        formula.content = Some(tagged);
    }
    formula
}

/// Attaches `formula_number` regions to an adjacent formula as `\tag{N}`.
///
/// A number not adjacent to a formula is dropped.
pub fn merge_formula_numbers(regions: Vec<ProcessedRegion>) -> Vec<ProcessedRegion> {
    let mut merged = Vec::with_capacity(regions.len());
    let mut skip = BTreeSet::new();

    for (i, block) in regions.iter().enumerate() {
        if skip.contains(&i) {
            continue;
        }
        let next = regions.get(i + 1);

        if block.native_label == "formula_number" {
            if let Some(next) = next
                && next.kind() == RegionKind::Formula
            {
                merged.push(with_formula_tag(next.clone(), block));
                skip.insert(i + 1);
            }
            continue;
        }

        if block.kind() == RegionKind::Formula
            && let Some(next) = next
            && next.native_label == "formula_number"
        {
            merged.push(with_formula_tag(block.clone(), next));
            skip.insert(i + 1);
            continue;
        }

        merged.push(block.clone());
    }

    renumber(merged)
}

/// Rejoins words hyphenated across consecutive text regions.
///
/// For a text region ending in `-`, following text regions are scanned until
/// one starts with a lowercase letter; that candidate alone decides whether
/// the two regions merge.
pub fn merge_hyphenated_blocks(regions: Vec<ProcessedRegion>) -> Vec<ProcessedRegion> {
    let mut merged = Vec::with_capacity(regions.len());
    let mut skip = BTreeSet::new();

    for (i, block) in regions.iter().enumerate() {
        if skip.contains(&i) {
            continue;
        }
        let stripped = match block.content.as_deref() {
            Some(content) if block.kind() == RegionKind::Text => {
                text::trim_trailing_whitespace(content)
            }
            _ => "",
        };
        let Some(head) = stripped.strip_suffix('-') else {
            merged.push(block.clone());
            continue;
        };

        let mut merged_block = None;
        for (j, candidate) in regions.iter().enumerate().skip(i + 1) {
            if skip.contains(&j) || candidate.kind() != RegionKind::Text {
                continue;
            }
            let Some(next_content) = candidate.content.as_deref() else {
                continue;
            };
            let next_stripped = text::trim_leading_whitespace(next_content);
            if !next_stripped.chars().next().is_some_and(char::is_lowercase) {
                continue;
            }

            let before = head.split_whitespace().next_back();
            let after = next_stripped.split_whitespace().next();
            if let (Some(before), Some(after)) = (before, after)
                && text::should_merge_hyphenated_word(before, after)
            {
                let mut region = block.clone();
                region.content = Some(format!("{head}{next_stripped}"));
                merged_block = Some(region);
                skip.insert(j);
            }
            break;
        }

        merged.push(merged_block.unwrap_or_else(|| block.clone()));
    }

    renumber(merged)
}

/// Adds a `- ` bullet to text regions sandwiched between aligned bullet items.
pub fn format_bullet_points(mut regions: Vec<ProcessedRegion>) -> Vec<ProcessedRegion> {
    if regions.len() < 3 {
        return regions;
    }

    for i in 1..regions.len() - 1 {
        let (prev, current, next) = (&regions[i - 1], &regions[i], &regions[i + 1]);
        if [prev, current, next]
            .iter()
            .any(|region| region.native_label != "text")
        {
            continue;
        }
        let (Some(prev_content), Some(current_content), Some(next_content)) = (
            prev.content.as_deref(),
            current.content.as_deref(),
            next.content.as_deref(),
        ) else {
            continue;
        };
        if current_content.starts_with("- ")
            || !prev_content.starts_with("- ")
            || !next_content.starts_with("- ")
        {
            continue;
        }

        let aligned = |other: &ProcessedRegion| {
            (current.bbox.x1 - other.bbox.x1).abs() <= BULLET_ALIGNMENT_TOLERANCE
        };
        if aligned(prev) && aligned(next) {
            let content = format!("- {current_content}");
            regions[i].content = Some(content);
        }
    }

    regions
}
