//! Post-pass that turns Markdown image placeholders into cropped image files.
//!
//! The formatter renders image regions as `![](page=<p>,bbox=[x1,y1,x2,y2])`.
//! [`crop_and_replace_images`] crops each referenced region out of its page,
//! writes it as a JPEG and rewrites the tag to point at the file.

use crate::core::constants::DEFAULT_CROP_PREFIX;
use crate::core::errors::OcrResult;
use crate::processors::geometry::NormalizedBBox;
use crate::utils::crop::crop_region;
use ::image::RgbImage;
use ::image::codecs::jpeg::JpegEncoder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static IMAGE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[\]\(page=(\d+),bbox=(\[[\d,\s]+\])\)").expect("valid placeholder regex")
});

const JPEG_QUALITY: u8 = 95;

/// An image placeholder found in Markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownImageRef {
    /// 0-based page index.
    pub page_index: usize,
    /// Region bounds in `[0, 1000]` coordinates.
    pub bbox: NormalizedBBox,
    /// The placeholder text as it appears in the Markdown.
    pub original_tag: String,
}

/// Markdown with placeholders replaced, plus the files written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CroppedMarkdown {
    /// Rewritten Markdown.
    pub markdown: String,
    /// Paths of the JPEG files written, in placeholder order.
    pub saved: Vec<PathBuf>,
}

/// Finds every well-formed image placeholder in `markdown`, in document order.
pub fn extract_image_refs(markdown: &str) -> Vec<MarkdownImageRef> {
    IMAGE_PLACEHOLDER
        .captures_iter(markdown)
        .filter_map(|caps| {
            let page_index = caps.get(1)?.as_str().parse().ok()?;
            let bbox = parse_bbox(caps.get(2)?.as_str())?;
            Some(MarkdownImageRef {
                page_index,
                bbox,
                original_tag: caps.get(0)?.as_str().to_string(),
            })
        })
        .collect()
}

fn parse_bbox(text: &str) -> Option<NormalizedBBox> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
    let values = inner
        .split(',')
        .map(|part| part.trim().parse::<i32>().ok())
        .collect::<Option<Vec<_>>>()?;
    match values.as_slice() {
        [x1, y1, x2, y2] => Some(NormalizedBBox::new(*x1, *y1, *x2, *y2)),
        _ => None,
    }
}

/// Crops every referenced image region and rewrites its placeholder.
///
/// The i-th placeholder (0-based, counting all placeholders) on page `p` is
/// saved as `<prefix>_page<p>_idx<i>.jpg` in `output_dir` and its first
/// occurrence is replaced with `![Image p-i](imgs/<file>)`. A placeholder whose
/// page is missing from `page_images`, or whose crop or write fails, is left
/// untouched.
///
/// # Arguments
///
/// * `markdown` - Markdown produced by the formatter.
/// * `page_images` - Page images indexed by page index.
/// * `output_dir` - Directory for the JPEG files, created if missing.
/// * `prefix` - File name prefix; `None` uses `cropped`.
///
/// # Errors
///
/// Returns an IO error only if `output_dir` cannot be created.
pub fn crop_and_replace_images(
    markdown: &str,
    page_images: &[RgbImage],
    output_dir: impl AsRef<Path>,
    prefix: Option<&str>,
) -> OcrResult<CroppedMarkdown> {
    let refs = extract_image_refs(markdown);
    if refs.is_empty() {
        return Ok(CroppedMarkdown {
            markdown: markdown.to_string(),
            saved: Vec::new(),
        });
    }

    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;
    let prefix = prefix.unwrap_or(DEFAULT_CROP_PREFIX);

    let mut result = markdown.to_string();
    let mut saved = Vec::with_capacity(refs.len());
    for (idx, image_ref) in refs.iter().enumerate() {
        let Some(page_image) = page_images.get(image_ref.page_index) else {
            debug!(
                "Skipping image placeholder for missing page {}",
                image_ref.page_index
            );
            continue;
        };

        let filename = format!("{}_page{}_idx{}.jpg", prefix, image_ref.page_index, idx);
        let path = output_dir.join(&filename);
        if let Err(err) = write_crop(page_image, &image_ref.bbox, &path) {
            warn!("Keeping placeholder {}: {}", image_ref.original_tag, err);
            continue;
        }

        let new_tag = format!("![Image {}-{}](imgs/{})", image_ref.page_index, idx, filename);
        if let Some(pos) = result.find(&image_ref.original_tag) {
            result.replace_range(pos..pos + image_ref.original_tag.len(), &new_tag);
        }
        saved.push(path);
    }

    Ok(CroppedMarkdown {
        markdown: result,
        saved,
    })
}

fn write_crop(page_image: &RgbImage, bbox: &NormalizedBBox, path: &Path) -> OcrResult<()> {
    let cropped = crop_region(page_image, bbox, None)?;
    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(&cropped)?;
    Ok(())
}
