// PAGE XML parsing. Any PAGE namespace version is accepted.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::PrepError;
use crate::geometry::{Polygon, parse_points};
use crate::page::{
    DEFAULT_LINE_LABEL, PageDocument, PageMetadata, Region, RegionElement, RegionKind,
    TextDirection, TextLine, parse_structure_type,
};

#[derive(Debug, Default)]
struct PageAttrs {
    image_filename: String,
    width: u32,
    height: u32,
}

/// Parse a PAGE XML document from a string.
pub fn parse_page(xml: &str) -> crate::error::Result<PageDocument> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut elements: Vec<String> = Vec::new();
    let mut metadata = PageMetadata {
        creator: String::new(),
        created: String::new(),
        last_change: String::new(),
    };
    let mut page: Option<PageAttrs> = None;
    let mut text_direction: Option<TextDirection> = None;
    let mut order: HashMap<String, i64> = HashMap::new();
    let mut open_regions: Vec<Region> = Vec::new();
    let mut open_line: Option<TextLine> = None;
    let mut regions: Vec<Region> = Vec::new();

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = local_name(e)?;
                let parent = elements.last().map(String::as_str);

                match name.as_str() {
                    "Page" => page = Some(page_attrs(e)?),
                    "RegionRefIndexed" => {
                        let attrs = attributes(e)?;
                        if let (Some(r), Some(i)) = (attrs.get("regionRef"), attrs.get("index")) {
                            let index = i.parse::<i64>().map_err(|_| {
                                PrepError::xml(format!("invalid reading order index '{i}'"))
                            })?;
                            order.insert(r.clone(), index);
                        }
                    }
                    "TextLine" => open_line = Some(line_start(e)?),
                    "Coords" => {
                        let points = points_attr(e)?;
                        match parent {
                            Some("TextLine") => {
                                if let Some(line) = open_line.as_mut() {
                                    line.coords = Some(Polygon::new(points));
                                }
                            }
                            Some(p) if RegionElement::from_name(p).is_some() => {
                                if let Some(open) = open_regions.last_mut() {
                                    open.coords = Polygon::new(points);
                                }
                            }
                            _ => {}
                        }
                    }
                    "Baseline" if parent == Some("TextLine") => {
                        if let Some(line) = open_line.as_mut() {
                            line.baseline = Some(points_attr(e)?);
                        }
                    }
                    other => {
                        if let Some(element) = RegionElement::from_name(other) {
                            let (region, direction) = region_start(e, element)?;
                            if text_direction.is_none() {
                                text_direction = direction;
                            }
                            open_regions.push(region);
                        }
                    }
                }

                if is_empty {
                    close_element(&name, &mut open_regions, &mut open_line, &mut regions);
                } else {
                    elements.push(name);
                }
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                match elements.last().map(String::as_str) {
                    Some("Creator") => metadata.creator = text.into_owned(),
                    Some("Created") => metadata.created = text.into_owned(),
                    Some("LastChange") => metadata.last_change = text.into_owned(),
                    _ => {}
                }
            }
            Event::End(_) => {
                if let Some(name) = elements.pop() {
                    close_element(&name, &mut open_regions, &mut open_line, &mut regions);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let page = page.ok_or_else(|| PrepError::xml("no Page element found"))?;

    // Regions listed in the reading order come first, the rest keep document order.
    regions.sort_by_key(|r| order.get(&r.id).copied().unwrap_or(i64::MAX));

    Ok(PageDocument {
        metadata,
        image_filename: page.image_filename,
        width: page.width,
        height: page.height,
        text_direction,
        regions,
    })
}

/// Read and parse a PAGE XML file.
pub fn read_page(path: &Path) -> crate::error::Result<PageDocument> {
    let xml = fs::read_to_string(path)
        .map_err(|e| PrepError::input(format!("cannot read {}: {e}", path.display())))?;
    parse_page(&xml).map_err(|e| match e {
        PrepError::XmlError(msg) => PrepError::xml(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// `Page/@imageFilename` of a PAGE file, without building the document.
pub fn read_image_filename(path: &Path) -> crate::error::Result<Option<String>> {
    let xml = fs::read_to_string(path)
        .map_err(|e| PrepError::input(format!("cannot read {}: {e}", path.display())))?;
    let mut reader = Reader::from_str(&xml);
    reader.trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if local_name(e)? == "Page" {
                    return Ok(attributes(e)?
                        .remove("imageFilename")
                        .filter(|f| !f.is_empty()));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn close_element(
    name: &str,
    open_regions: &mut Vec<Region>,
    open_line: &mut Option<TextLine>,
    regions: &mut Vec<Region>,
) {
    if name == "TextLine" {
        if let (Some(line), Some(open)) = (open_line.take(), open_regions.last_mut()) {
            open.lines.push(line);
        }
    } else if RegionElement::from_name(name).is_some()
        && let Some(open) = open_regions.pop()
    {
        regions.push(open);
    }
}

fn local_name(e: &BytesStart) -> crate::error::Result<String> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_string)
        .map_err(|err| PrepError::xml(format!("element name is not UTF-8: {err}")))
}

fn attributes(e: &BytesStart) -> crate::error::Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.local_name().as_ref())
            .map_err(|err| PrepError::xml(format!("attribute name is not UTF-8: {err}")))?
            .to_string();
        let value = attr.unescape_value()?.into_owned();
        out.insert(key, value);
    }
    Ok(out)
}

fn page_attrs(e: &BytesStart) -> crate::error::Result<PageAttrs> {
    let attrs = attributes(e)?;
    let dimension = |key: &str| -> crate::error::Result<u32> {
        let raw = attrs
            .get(key)
            .ok_or_else(|| PrepError::xml(format!("Page element lacks {key}")))?;
        raw.trim()
            .parse::<u32>()
            .map_err(|_| PrepError::xml(format!("invalid {key} '{raw}'")))
    };
    Ok(PageAttrs {
        image_filename: attrs.get("imageFilename").cloned().unwrap_or_default(),
        width: dimension("imageWidth")?,
        height: dimension("imageHeight")?,
    })
}

fn points_attr(e: &BytesStart) -> crate::error::Result<Vec<crate::geometry::Point>> {
    match attributes(e)?.get("points") {
        Some(points) => parse_points(points),
        None => Ok(Vec::new()),
    }
}

fn line_start(e: &BytesStart) -> crate::error::Result<TextLine> {
    let attrs = attributes(e)?;
    let label = attrs
        .get("custom")
        .and_then(|c| parse_structure_type(c))
        .unwrap_or_else(|| DEFAULT_LINE_LABEL.to_string());
    Ok(TextLine {
        id: attrs.get("id").cloned().unwrap_or_default(),
        label,
        coords: None,
        baseline: None,
    })
}

fn region_start(
    e: &BytesStart,
    element: RegionElement,
) -> crate::error::Result<(Region, Option<TextDirection>)> {
    let attrs = attributes(e)?;
    let kind = RegionKind::new(element, attrs.get("type").map(String::as_str));
    let label = attrs
        .get("custom")
        .and_then(|c| parse_structure_type(c))
        .unwrap_or_else(|| kind.default_label());
    let direction = attrs.get("readingDirection").and_then(|rd| {
        TextDirection::from_page_attributes(rd, attrs.get("textLineOrder").map(String::as_str))
    });
    let region = Region {
        id: attrs.get("id").cloned().unwrap_or_default(),
        label,
        kind,
        coords: Polygon::default(),
        lines: Vec::new(),
    };
    Ok((region, direction))
}
