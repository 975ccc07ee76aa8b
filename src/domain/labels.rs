//! Layout label policy.
//!
//! This module maps the detector's class IDs to native label strings and native
//! labels to the task that decides what happens to a region downstream
//! (recognize as text/table/formula, keep without recognition, or discard).

use crate::core::errors::{OCRError, OcrResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// What the pipeline does with a region of a given native label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutTaskType {
    /// Recognize as plain text.
    Text,
    /// Recognize as a table.
    Table,
    /// Recognize as a formula.
    Formula,
    /// Keep the region without recognition (rendered as an image placeholder).
    Skip,
    /// Discard the region before recognition.
    Abandon,
}

impl LayoutTaskType {
    /// Returns the task as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutTaskType::Text => "text",
            LayoutTaskType::Table => "table",
            LayoutTaskType::Formula => "formula",
            LayoutTaskType::Skip => "skip",
            LayoutTaskType::Abandon => "abandon",
        }
    }

    /// The recognizer-facing task, or `None` for regions that are not recognized.
    pub fn recognition_task(&self) -> Option<RecognitionTask> {
        match self {
            LayoutTaskType::Text => Some(RecognitionTask::Text),
            LayoutTaskType::Table => Some(RecognitionTask::Table),
            LayoutTaskType::Formula => Some(RecognitionTask::Formula),
            LayoutTaskType::Skip | LayoutTaskType::Abandon => None,
        }
    }
}

/// Task discriminator handed to the recognizer collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionTask {
    /// Plain text recognition.
    Text,
    /// Table structure recognition.
    Table,
    /// Formula (LaTeX) recognition.
    Formula,
}

impl RecognitionTask {
    /// Returns the task as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionTask::Text => "text",
            RecognitionTask::Table => "table",
            RecognitionTask::Formula => "formula",
        }
    }
}

/// Formatting and visualization kind of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Text-like content.
    Text,
    /// Table content.
    Table,
    /// Formula content.
    Formula,
    /// Image-like content (images, charts).
    Image,
    /// Labels without a formatting policy.
    Unknown,
}

/// Labels whose regions are never removed by containment merging.
pub const PRESERVE_LABELS: [&str; 3] = ["image", "seal", "chart"];

/// Maps a native label to its task type. Unmapped labels are abandoned.
pub fn task_type_for_label(label: &str) -> LayoutTaskType {
    match label {
        "abstract" | "algorithm" | "content" | "doc_title" | "figure_title"
        | "paragraph_title" | "reference_content" | "text" | "vertical_text"
        | "vision_footnote" | "seal" | "formula_number" => LayoutTaskType::Text,
        "table" => LayoutTaskType::Table,
        "display_formula" | "inline_formula" => LayoutTaskType::Formula,
        "chart" | "image" => LayoutTaskType::Skip,
        _ => LayoutTaskType::Abandon,
    }
}

/// Maps a native label to its formatting kind. Unmapped labels are `Unknown`.
pub fn region_kind_for_label(label: &str) -> RegionKind {
    match label {
        "table" => RegionKind::Table,
        "display_formula" | "inline_formula" => RegionKind::Formula,
        "chart" | "image" => RegionKind::Image,
        "abstract" | "algorithm" | "content" | "doc_title" | "figure_title"
        | "paragraph_title" | "reference_content" | "text" | "vertical_text"
        | "vision_footnote" | "seal" | "formula_number" => RegionKind::Text,
        _ => RegionKind::Unknown,
    }
}

/// The 25 PP-DocLayout-V3 classes, indexed by class ID.
const PP_DOCLAYOUT_V3_LABELS: [&str; 25] = [
    "abstract",
    "algorithm",
    "aside_text",
    "chart",
    "content",
    "display_formula",
    "doc_title",
    "figure_title",
    "footer",
    "footer_image",
    "footnote",
    "formula_number",
    "header",
    "header_image",
    "image",
    "inline_formula",
    "number",
    "paragraph_title",
    "reference",
    "reference_content",
    "seal",
    "table",
    "text",
    "vertical_text",
    "vision_footnote",
];

/// Layout detector label configuration, as stored in the model's `config.json`.
///
/// `id2label` keys are strings in the file and are parsed to class IDs on load;
/// a non-integer key is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLayoutLabelConfig", into = "RawLayoutLabelConfig")]
pub struct LayoutLabelConfig {
    /// Model type string, e.g. `pp_doclayout_v3`.
    pub model_type: Option<String>,
    /// Declared number of classes.
    pub num_labels: Option<usize>,
    /// Class ID to native label.
    pub id2label: BTreeMap<usize, String>,
    /// Native label to class ID.
    pub label2id: Option<BTreeMap<String, usize>>,
}

#[derive(Serialize, Deserialize)]
struct RawLayoutLabelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_labels: Option<usize>,
    id2label: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label2id: Option<BTreeMap<String, usize>>,
}

impl TryFrom<RawLayoutLabelConfig> for LayoutLabelConfig {
    type Error = OCRError;

    fn try_from(raw: RawLayoutLabelConfig) -> Result<Self, Self::Error> {
        let mut id2label = BTreeMap::new();
        for (key, label) in raw.id2label {
            let id = key.trim().parse::<usize>().map_err(|_| {
                OCRError::config_error_with_context("id2label", &key, "key is not a class ID")
            })?;
            id2label.insert(id, label);
        }
        Ok(Self {
            model_type: raw.model_type,
            num_labels: raw.num_labels,
            id2label,
            label2id: raw.label2id,
        })
    }
}

impl From<LayoutLabelConfig> for RawLayoutLabelConfig {
    fn from(config: LayoutLabelConfig) -> Self {
        Self {
            model_type: config.model_type,
            num_labels: config.num_labels,
            id2label: config
                .id2label
                .into_iter()
                .map(|(id, label)| (id.to_string(), label))
                .collect(),
            label2id: config.label2id,
        }
    }
}

impl Default for LayoutLabelConfig {
    fn default() -> Self {
        Self::pp_doclayout_v3()
    }
}

impl LayoutLabelConfig {
    /// Creates a config from an explicit id → label table.
    pub fn new(id2label: BTreeMap<usize, String>) -> Self {
        Self {
            model_type: None,
            num_labels: Some(id2label.len()),
            id2label,
            label2id: None,
        }
    }

    /// The built-in PP-DocLayout-V3 label table.
    pub fn pp_doclayout_v3() -> Self {
        let id2label: BTreeMap<usize, String> = PP_DOCLAYOUT_V3_LABELS
            .iter()
            .enumerate()
            .map(|(id, label)| (id, label.to_string()))
            .collect();
        let label2id = id2label
            .iter()
            .map(|(id, label)| (label.clone(), *id))
            .collect();
        Self {
            model_type: Some("pp_doclayout_v3".to_string()),
            num_labels: Some(id2label.len()),
            id2label,
            label2id: Some(label2id),
        }
    }

    /// Parses a config from `config.json` contents.
    pub fn from_json_str(json: &str) -> OcrResult<Self> {
        // Rejected id2label keys surface as a ConfigError rather than a serde error.
        let raw: RawLayoutLabelConfig = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Loads `config.json` from a model folder.
    pub fn load(model_folder: impl AsRef<Path>) -> OcrResult<Self> {
        let path = model_folder.as_ref().join("config.json");
        let json = std::fs::read_to_string(&path)?;
        Self::from_json_str(&json)
    }

    /// Native label for a class ID.
    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.id2label.get(&class_id).map(String::as_str)
    }

    /// Native label for a class ID, falling back to `class_<id>`.
    pub fn label_or_fallback(&self, class_id: usize) -> String {
        self.label(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class_{class_id}"))
    }

    /// Class IDs whose labels are in [`PRESERVE_LABELS`].
    pub fn preserve_class_ids(&self) -> BTreeSet<usize> {
        self.id2label
            .iter()
            .filter(|(_, label)| PRESERVE_LABELS.contains(&label.as_str()))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Validates the config.
    pub fn validate(&self) -> OcrResult<()> {
        if self.id2label.is_empty() {
            return Err(OCRError::config_error("id2label must not be empty"));
        }
        Ok(())
    }
}
