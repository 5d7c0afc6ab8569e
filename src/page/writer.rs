// PAGE XML serialization of an assembled document.

use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::geometry::{Point, points_to_string};
use crate::output::write_atomic;
use crate::page::{PageDocument, Region, TextLine, format_structure_type};

pub const PAGE_NAMESPACE: &str = "http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15";
const SCHEMA_LOCATION: &str = "http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15 \
     http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15/pagecontent.xsd";

type XmlWriter = Writer<Vec<u8>>;

/// Serialize the document into an in-memory buffer.
pub fn to_xml_bytes(doc: &PageDocument) -> crate::error::Result<Vec<u8>> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("PcGts");
    root.push_attribute(("xmlns", PAGE_NAMESPACE));
    root.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    w.write_event(Event::Start(root))?;

    write_metadata(&mut w, doc)?;

    let width = doc.width.to_string();
    let height = doc.height.to_string();
    let mut page = BytesStart::new("Page");
    page.push_attribute(("imageFilename", doc.image_filename.as_str()));
    page.push_attribute(("imageWidth", width.as_str()));
    page.push_attribute(("imageHeight", height.as_str()));
    w.write_event(Event::Start(page))?;

    if !doc.regions.is_empty() {
        write_reading_order(&mut w, doc)?;
    }
    for region in &doc.regions {
        write_region(&mut w, doc, region)?;
    }

    w.write_event(Event::End(BytesEnd::new("Page")))?;
    w.write_event(Event::End(BytesEnd::new("PcGts")))?;

    let mut bytes = w.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serialize and write atomically to `path`.
pub fn write_page(doc: &PageDocument, path: &Path) -> crate::error::Result<()> {
    let bytes = to_xml_bytes(doc)?;
    write_atomic(path, &bytes)
}

fn write_metadata(w: &mut XmlWriter, doc: &PageDocument) -> crate::error::Result<()> {
    w.write_event(Event::Start(BytesStart::new("Metadata")))?;
    text_element(w, "Creator", &doc.metadata.creator)?;
    text_element(w, "Created", &doc.metadata.created)?;
    text_element(w, "LastChange", &doc.metadata.last_change)?;
    w.write_event(Event::End(BytesEnd::new("Metadata")))?;
    Ok(())
}

fn write_reading_order(w: &mut XmlWriter, doc: &PageDocument) -> crate::error::Result<()> {
    w.write_event(Event::Start(BytesStart::new("ReadingOrder")))?;
    let mut group = BytesStart::new("OrderedGroup");
    group.push_attribute(("id", "g0"));
    w.write_event(Event::Start(group))?;
    for (index, id) in doc.reading_order().enumerate() {
        let index = index.to_string();
        let mut r = BytesStart::new("RegionRefIndexed");
        r.push_attribute(("index", index.as_str()));
        r.push_attribute(("regionRef", id));
        w.write_event(Event::Empty(r))?;
    }
    w.write_event(Event::End(BytesEnd::new("OrderedGroup")))?;
    w.write_event(Event::End(BytesEnd::new("ReadingOrder")))?;
    Ok(())
}

fn write_region(
    w: &mut XmlWriter,
    doc: &PageDocument,
    region: &Region,
) -> crate::error::Result<()> {
    let name = region.kind.element.as_str();
    let custom = format_structure_type(&region.label)?;
    let mut start = BytesStart::new(name);
    start.push_attribute(("id", region.id.as_str()));
    if let Some(subtype) = region.kind.subtype.as_deref() {
        start.push_attribute(("type", subtype));
    }
    if let Some(direction) = doc.text_direction
        && region.kind.element == crate::page::RegionElement::TextRegion
    {
        start.push_attribute(("readingDirection", direction.reading_direction()));
        start.push_attribute(("textLineOrder", direction.text_line_order()));
    }
    start.push_attribute(("custom", custom.as_str()));
    w.write_event(Event::Start(start))?;

    points_element(w, "Coords", region.coords.points())?;
    for line in &region.lines {
        write_line(w, line)?;
    }

    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_line(w: &mut XmlWriter, line: &TextLine) -> crate::error::Result<()> {
    let custom = format_structure_type(&line.label)?;
    let mut start = BytesStart::new("TextLine");
    start.push_attribute(("id", line.id.as_str()));
    start.push_attribute(("custom", custom.as_str()));
    w.write_event(Event::Start(start))?;

    if let Some(coords) = &line.coords {
        points_element(w, "Coords", coords.points())?;
    }
    if let Some(baseline) = &line.baseline {
        points_element(w, "Baseline", baseline)?;
    }

    w.write_event(Event::End(BytesEnd::new("TextLine")))?;
    Ok(())
}

fn points_element(w: &mut XmlWriter, name: &str, points: &[Point]) -> crate::error::Result<()> {
    let pts = points_to_string(points);
    let mut e = BytesStart::new(name);
    e.push_attribute(("points", pts.as_str()));
    w.write_event(Event::Empty(e))?;
    Ok(())
}

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> crate::error::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use crate::page::{PageMetadata, RegionKind, TextDirection};

    fn sample_doc() -> PageDocument {
        PageDocument {
            metadata: PageMetadata {
                creator: "test & co".into(),
                created: "2024-01-01T00:00:00".into(),
                last_change: "2024-01-01T00:00:00".into(),
            },
            image_filename: "0001.png".into(),
            width: 100,
            height: 50,
            text_direction: Some(TextDirection::Hlr),
            regions: vec![Region {
                id: "r0001".into(),
                label: "heading".into(),
                kind: RegionKind::for_label("heading").unwrap(),
                coords: Polygon::page(100, 50),
                lines: vec![TextLine {
                    id: "l0001".into(),
                    label: "default".into(),
                    coords: Some(Polygon::page(100, 10)),
                    baseline: Some(vec![Point::new(0, 8), Point::new(100, 8)]),
                }],
            }],
        }
    }

    #[test]
    fn test_writes_expected_structure() {
        let xml = String::from_utf8(to_xml_bytes(&sample_doc()).unwrap()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(PAGE_NAMESPACE));
        assert!(xml.contains("<Creator>test &amp; co</Creator>"));
        assert!(xml.contains("imageFilename=\"0001.png\""));
        assert!(xml.contains("<RegionRefIndexed index=\"0\" regionRef=\"r0001\"/>"));
        assert!(xml.contains("type=\"heading\""));
        assert!(xml.contains("readingDirection=\"left-to-right\""));
        assert!(xml.contains("custom=\"structure {type:heading;}\""));
        assert!(xml.contains("<Baseline points=\"0,8 100,8\"/>"));
    }

    #[test]
    fn test_empty_document_has_no_reading_order() {
        let mut doc = sample_doc();
        doc.regions.clear();
        let xml = String::from_utf8(to_xml_bytes(&doc).unwrap()).unwrap();
        assert!(!xml.contains("ReadingOrder"));
        assert!(xml.contains("<Page "));
    }

    #[test]
    fn test_reserved_character_in_label_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0001.xml");
        let mut doc = sample_doc();
        doc.regions[0].lines[0].label = "default;type:x".into();

        let result = write_page(&doc, &path);
        assert!(matches!(result, Err(crate::error::PrepError::XmlError(_))));
        assert!(!path.exists());
    }
}
