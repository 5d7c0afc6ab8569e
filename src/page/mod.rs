pub mod assembler;
pub mod reader;
pub mod writer;

use serde::Deserialize;

use crate::geometry::{Point, Polygon};
use crate::labels::Labelled;

/// Label given to baselines that carry no explicit class.
pub const DEFAULT_LINE_LABEL: &str = "default";

/// Id of the full-page region used when regions are suppressed or lines
/// belong to no region.
pub const DUMMY_REGION_ID: &str = "r_dummy";

/// Label of the full-page dummy region.
pub const DUMMY_REGION_LABEL: &str = "text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub creator: String,
    pub created: String,
    pub last_change: String,
}

/// One annotated page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    pub metadata: PageMetadata,
    pub image_filename: String,
    pub width: u32,
    pub height: u32,
    pub text_direction: Option<TextDirection>,
    /// Regions in reading order.
    pub regions: Vec<Region>,
}

impl PageDocument {
    pub fn reading_order(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.id.as_str())
    }

    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.regions.iter().flat_map(|r| r.lines.iter())
    }

    pub fn line_count(&self) -> usize {
        self.regions.iter().map(|r| r.lines.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub id: String,
    pub label: String,
    pub kind: RegionKind,
    pub coords: Polygon,
    pub lines: Vec<TextLine>,
}

impl Labelled for Region {
    fn label(&self) -> &str {
        &self.label
    }

    fn set_label(&mut self, label: String) {
        self.label = label;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub id: String,
    pub label: String,
    pub coords: Option<Polygon>,
    pub baseline: Option<Vec<Point>>,
}

impl Labelled for TextLine {
    fn label(&self) -> &str {
        &self.label
    }

    fn set_label(&mut self, label: String) {
        self.label = label;
    }
}

/// PAGE region element names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionElement {
    AdvertRegion,
    ChartRegion,
    ChemRegion,
    CustomRegion,
    GraphicRegion,
    ImageRegion,
    LineDrawingRegion,
    MapRegion,
    MathsRegion,
    MusicRegion,
    NoiseRegion,
    SeparatorRegion,
    TableRegion,
    TextRegion,
    UnknownRegion,
}

impl RegionElement {
    const ALL: [RegionElement; 15] = [
        RegionElement::AdvertRegion,
        RegionElement::ChartRegion,
        RegionElement::ChemRegion,
        RegionElement::CustomRegion,
        RegionElement::GraphicRegion,
        RegionElement::ImageRegion,
        RegionElement::LineDrawingRegion,
        RegionElement::MapRegion,
        RegionElement::MathsRegion,
        RegionElement::MusicRegion,
        RegionElement::NoiseRegion,
        RegionElement::SeparatorRegion,
        RegionElement::TableRegion,
        RegionElement::TextRegion,
        RegionElement::UnknownRegion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegionElement::AdvertRegion => "AdvertRegion",
            RegionElement::ChartRegion => "ChartRegion",
            RegionElement::ChemRegion => "ChemRegion",
            RegionElement::CustomRegion => "CustomRegion",
            RegionElement::GraphicRegion => "GraphicRegion",
            RegionElement::ImageRegion => "ImageRegion",
            RegionElement::LineDrawingRegion => "LineDrawingRegion",
            RegionElement::MapRegion => "MapRegion",
            RegionElement::MathsRegion => "MathsRegion",
            RegionElement::MusicRegion => "MusicRegion",
            RegionElement::NoiseRegion => "NoiseRegion",
            RegionElement::SeparatorRegion => "SeparatorRegion",
            RegionElement::TableRegion => "TableRegion",
            RegionElement::TextRegion => "TextRegion",
            RegionElement::UnknownRegion => "UnknownRegion",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

/// Element type and `type` attribute used to write a region class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionKind {
    pub element: RegionElement,
    pub subtype: Option<String>,
}

impl RegionKind {
    pub fn new(element: RegionElement, subtype: Option<&str>) -> Self {
        Self {
            element,
            subtype: subtype.map(str::to_string),
        }
    }

    /// Look up the PAGE representation of a segmentation class.
    pub fn for_label(label: &str) -> Option<Self> {
        use RegionElement::*;
        let (element, subtype) = match label {
            "maths" => (MathsRegion, None),
            "graphic" => (GraphicRegion, None),
            "image" => (ImageRegion, None),
            "separator" => (SeparatorRegion, None),
            "table" => (TableRegion, None),
            "music" => (MusicRegion, None),
            "text" | "paragraph" => (TextRegion, Some("paragraph")),
            "endnote" | "header" | "heading" | "signature-mark" | "catch-word"
            | "drop-capital" | "page-number" | "footnote" | "marginalia" | "caption"
            | "other" => (TextRegion, Some(label)),
            // kraken default model classes
            "Title" => (TextRegion, Some("caption")),
            "Illustration" => (ImageRegion, None),
            "Commentary" => (TextRegion, Some("footnote")),
            "unknown" => (UnknownRegion, None),
            _ => return None,
        };
        Some(Self::new(element, subtype))
    }

    /// Label for a region read without an explicit `custom` structure type.
    pub fn default_label(&self) -> String {
        match (self.element, self.subtype.as_deref()) {
            (RegionElement::TextRegion, Some(t)) => t.to_string(),
            (RegionElement::TextRegion, None) => "text".to_string(),
            (RegionElement::MathsRegion, _) => "maths".to_string(),
            (RegionElement::GraphicRegion, _) => "graphic".to_string(),
            (RegionElement::ImageRegion, _) => "image".to_string(),
            (RegionElement::SeparatorRegion, _) => "separator".to_string(),
            (RegionElement::TableRegion, _) => "table".to_string(),
            (RegionElement::MusicRegion, _) => "music".to_string(),
            (RegionElement::UnknownRegion, _) => "unknown".to_string(),
            (_, Some(t)) => t.to_string(),
            (element, None) => element.as_str().to_string(),
        }
    }
}

/// Text direction of the input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Hlr,
    Hrl,
    Vlr,
    Vrl,
}

impl TextDirection {
    /// PAGE `readingDirection` attribute.
    pub fn reading_direction(self) -> &'static str {
        match self {
            TextDirection::Hlr => "left-to-right",
            TextDirection::Hrl => "right-to-left",
            TextDirection::Vlr | TextDirection::Vrl => "top-to-bottom",
        }
    }

    /// PAGE `textLineOrder` attribute.
    pub fn text_line_order(self) -> &'static str {
        match self {
            TextDirection::Hlr | TextDirection::Hrl => "top-to-bottom",
            TextDirection::Vlr => "left-to-right",
            TextDirection::Vrl => "right-to-left",
        }
    }

    pub fn from_page_attributes(
        reading_direction: &str,
        text_line_order: Option<&str>,
    ) -> Option<Self> {
        match (reading_direction, text_line_order) {
            ("left-to-right", _) => Some(TextDirection::Hlr),
            ("right-to-left", _) => Some(TextDirection::Hrl),
            ("top-to-bottom", Some("right-to-left")) => Some(TextDirection::Vrl),
            ("top-to-bottom", _) => Some(TextDirection::Vlr),
            _ => None,
        }
    }
}

/// Characters that delimit the `custom` attribute grammar.
pub const RESERVED_LABEL_CHARS: [char; 4] = ['{', '}', ';', ':'];

/// First character of `label` that cannot appear in a `custom` value.
pub fn reserved_label_char(label: &str) -> Option<char> {
    label.chars().find(|c| RESERVED_LABEL_CHARS.contains(c))
}

/// `custom="structure {type:heading;}"`
pub(crate) fn format_structure_type(label: &str) -> crate::error::Result<String> {
    if let Some(c) = reserved_label_char(label) {
        return Err(crate::error::PrepError::xml(format!(
            "label '{label}' contains reserved character '{c}'"
        )));
    }
    Ok(format!("structure {{type:{label};}}"))
}

/// Extract the `type` value of the `structure` block of a `custom` attribute.
pub(crate) fn parse_structure_type(custom: &str) -> Option<String> {
    let start = custom.find("structure")?;
    let rest = &custom[start + "structure".len()..];
    let open = rest.find('{')?;
    let close = rest[open..].find('}')? + open;
    rest[open + 1..close]
        .split(';')
        .filter_map(|kv| kv.split_once(':'))
        .find(|(k, _)| k.trim() == "type")
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `0001.bin.png` -> `0001.png`: stem before the first dot plus the last extension.
pub fn page_image_filename(file_name: &str) -> String {
    let mut parts = file_name.split('.');
    let stem = parts.next().unwrap_or(file_name);
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !stem.is_empty() && file_name.contains('.') => format!("{stem}.{ext}"),
        _ => file_name.to_string(),
    }
}

/// `0001.bin.png` -> `0001`.
pub fn file_stem_before_first_dot(file_name: &str) -> &str {
    match file_name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem,
        _ => file_name,
    }
}
