//! Shape elements of a slide's shape tree: reading their identity and
//! geometry, and generating the XML of new pictures and tables.

use akl_core::{Error, Geometry, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::xml::{attr, element_slice, escape, find_element, local_name};

/// Table style applied to generated tables ("Medium Style 2 - Accent 1").
pub const DEFAULT_TABLE_STYLE: &str = "{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}";

const TABLE_GRAPHIC_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

/// The element types that count as shapes of a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShapeKind {
    /// `p:sp`, autoshapes and text boxes; the only kind that holds text.
    AutoShape,
    /// `p:pic`
    Picture,
    /// `p:graphicFrame`, tables, charts and other graphic objects.
    GraphicFrame,
    /// `p:grpSp`
    Group,
    /// `p:cxnSp`
    Connector,
    /// `p:contentPart`
    ContentPart,
}

impl ShapeKind {
    /// Shape kind for an element local name, `None` for non-shape children.
    pub fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"sp" => Some(Self::AutoShape),
            b"pic" => Some(Self::Picture),
            b"graphicFrame" => Some(Self::GraphicFrame),
            b"grpSp" => Some(Self::Group),
            b"cxnSp" => Some(Self::Connector),
            b"contentPart" => Some(Self::ContentPart),
            _ => None,
        }
    }

    /// Whether shapes of this kind carry a text frame.
    pub fn has_text_frame(self) -> bool {
        self == Self::AutoShape
    }
}

/// Placeholder reference (`p:ph`) of a shape that inherits from its layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaceholderRef {
    /// `type` attribute (`title`, `body`, `pic`, ...).
    pub kind: Option<String>,
    /// `idx` attribute.
    pub idx: Option<String>,
}

impl PlaceholderRef {
    /// Whether a layout placeholder is the one this reference points at.
    pub fn matches(&self, other: &PlaceholderRef) -> bool {
        match (&self.idx, &other.idx) {
            (Some(a), Some(b)) => a == b,
            _ => self.kind.is_some() && self.kind == other.kind,
        }
    }

    /// Type of the slide master placeholder this one inherits from.
    ///
    /// Masters only carry title, body and footer placeholders; every content
    /// type (and a missing `type`, which means `obj`) falls back to `body`.
    pub fn master_kind(&self) -> &str {
        match self.kind.as_deref() {
            Some("title") | Some("ctrTitle") => "title",
            Some(kind @ ("dt" | "ftr" | "sldNum" | "hdr")) => kind,
            _ => "body",
        }
    }
}

/// Identity and placement of one shape, read from its XML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeInfo {
    /// `id` of `p:cNvPr`, unique within the slide.
    pub id: u32,
    /// `name` of `p:cNvPr`.
    pub name: String,
    /// Element type.
    pub kind: ShapeKind,
    /// Explicit transform; `None` when inherited from the layout.
    pub geometry: Option<Geometry>,
    /// Placeholder reference, if the shape is a layout placeholder.
    pub placeholder: Option<PlaceholderRef>,
    /// Visible text, paragraphs joined with `\n`.
    pub text: String,
}

impl ShapeInfo {
    /// Parse the XML of a single shape element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut kind = None;
        let mut id = 0;
        let mut name = None;
        let mut placeholder = None;
        let mut off: Option<(i64, i64)> = None;
        let mut ext: Option<(i64, i64)> = None;
        let mut xfrm_done = false;
        let mut paragraphs: Vec<String> = Vec::new();
        let mut in_text = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let local = local_name(e.name().as_ref()).to_vec();
                    if kind.is_none() {
                        kind = ShapeKind::from_local_name(&local);
                    }
                    Self::visit(
                        e,
                        &local,
                        stack.last().map(Vec::as_slice),
                        xfrm_done,
                        &mut id,
                        &mut name,
                        &mut placeholder,
                        &mut off,
                        &mut ext,
                    );
                    match local.as_slice() {
                        b"p" => paragraphs.push(String::new()),
                        b"t" => in_text = true,
                        _ => {}
                    }
                    stack.push(local);
                }
                Ok(Event::Empty(ref e)) => {
                    let local = local_name(e.name().as_ref()).to_vec();
                    Self::visit(
                        e,
                        &local,
                        stack.last().map(Vec::as_slice),
                        xfrm_done,
                        &mut id,
                        &mut name,
                        &mut placeholder,
                        &mut off,
                        &mut ext,
                    );
                    if local == b"p" {
                        paragraphs.push(String::new());
                    }
                }
                Ok(Event::Text(ref e)) => {
                    if in_text {
                        let text = e.unescape().unwrap_or_default();
                        if let Some(last) = paragraphs.last_mut() {
                            last.push_str(&text);
                        }
                    }
                }
                Ok(Event::End(_)) => {
                    if let Some(local) = stack.pop() {
                        match local.as_slice() {
                            b"xfrm" if off.is_some() || ext.is_some() => xfrm_done = true,
                            b"t" => in_text = false,
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!("Error parsing shape: {}", e)));
                }
                _ => {}
            }
        }

        let kind = kind.ok_or_else(|| {
            Error::PptxParseError("Element is not a shape".to_string())
        })?;
        let name = name.ok_or_else(|| {
            Error::PptxParseError("Shape has no non-visual properties (cNvPr)".to_string())
        })?;

        let geometry = match (off, ext) {
            (Some((x, y)), Some((cx, cy))) => Some(Geometry::new(x, y, cx, cy)),
            _ => None,
        };

        Ok(Self {
            id,
            name,
            kind,
            geometry,
            placeholder,
            text: paragraphs.join("\n"),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn visit(
        e: &BytesStart,
        local: &[u8],
        parent: Option<&[u8]>,
        xfrm_done: bool,
        id: &mut u32,
        name: &mut Option<String>,
        placeholder: &mut Option<PlaceholderRef>,
        off: &mut Option<(i64, i64)>,
        ext: &mut Option<(i64, i64)>,
    ) {
        match local {
            b"cNvPr" if name.is_none() => {
                *id = attr(e, b"id").and_then(|v| v.parse().ok()).unwrap_or(0);
                *name = Some(attr(e, b"name").unwrap_or_default());
            }
            b"ph" if placeholder.is_none() => {
                *placeholder = Some(PlaceholderRef {
                    kind: attr(e, b"type"),
                    idx: attr(e, b"idx"),
                });
            }
            b"off" if !xfrm_done && parent == Some(b"xfrm".as_slice()) && off.is_none() => {
                *off = Some((int_attr(e, b"x"), int_attr(e, b"y")));
            }
            b"ext" if !xfrm_done && parent == Some(b"xfrm".as_slice()) && ext.is_none() => {
                *ext = Some((int_attr(e, b"cx"), int_attr(e, b"cy")));
            }
            _ => {}
        }
    }
}

fn int_attr(e: &BytesStart, key: &[u8]) -> i64 {
    attr(e, key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// XML of a picture shape that stretches the image over `geometry`.
pub fn picture_xml(id: u32, name: &str, descr: &str, rel_id: &str, geometry: Geometry) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str("<p:pic>");
    xml.push_str("<p:nvPicPr>");
    xml.push_str(&format!(
        r#"<p:cNvPr id="{}" name="{}" descr="{}"/>"#,
        id,
        escape(name),
        escape(descr)
    ));
    xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>"#);
    xml.push_str("<p:nvPr/>");
    xml.push_str("</p:nvPicPr>");

    xml.push_str("<p:blipFill>");
    xml.push_str(&format!(r#"<a:blip r:embed="{}"/>"#, escape(rel_id)));
    xml.push_str("<a:stretch><a:fillRect/></a:stretch>");
    xml.push_str("</p:blipFill>");

    xml.push_str("<p:spPr>");
    push_xfrm(&mut xml, "a:xfrm", geometry);
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
    xml.push_str("</p:spPr>");
    xml.push_str("</p:pic>");
    xml
}

/// XML of a table graphic frame filling `geometry`.
///
/// Column widths and row heights are split evenly; the last column and row
/// absorb the remainder so that the grid covers the frame exactly.
pub fn table_xml(id: u32, name: &str, geometry: Geometry, rows: &[Vec<&str>]) -> String {
    let row_count = rows.len().max(1) as i64;
    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0).max(1) as i64;

    let mut xml = String::with_capacity(1024 + rows.len() * 256);
    xml.push_str("<p:graphicFrame>");
    xml.push_str("<p:nvGraphicFramePr>");
    xml.push_str(&format!(r#"<p:cNvPr id="{}" name="{}"/>"#, id, escape(name)));
    xml.push_str(r#"<p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr>"#);
    xml.push_str("<p:nvPr/>");
    xml.push_str("</p:nvGraphicFramePr>");
    push_xfrm(&mut xml, "p:xfrm", geometry);

    xml.push_str("<a:graphic>");
    xml.push_str(&format!(r#"<a:graphicData uri="{}">"#, TABLE_GRAPHIC_URI));
    xml.push_str("<a:tbl>");
    xml.push_str(&format!(
        r#"<a:tblPr firstRow="1" bandRow="1"><a:tableStyleId>{}</a:tableStyleId></a:tblPr>"#,
        DEFAULT_TABLE_STYLE
    ));

    xml.push_str("<a:tblGrid>");
    for col in 0..col_count {
        xml.push_str(&format!(
            r#"<a:gridCol w="{}"/>"#,
            even_share(geometry.width, col_count, col)
        ));
    }
    xml.push_str("</a:tblGrid>");

    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(
            r#"<a:tr h="{}">"#,
            even_share(geometry.height, row_count, r as i64)
        ));
        for c in 0..col_count as usize {
            let text = row.get(c).copied().unwrap_or("");
            xml.push_str("<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>");
            if text.is_empty() {
                xml.push_str("<a:p/>");
            } else {
                for line in text.split('\n') {
                    xml.push_str(&format!(
                        "<a:p><a:r><a:rPr lang=\"de-DE\" dirty=\"0\"/><a:t>{}</a:t></a:r></a:p>",
                        escape(line)
                    ));
                }
            }
            xml.push_str("</a:txBody><a:tcPr/></a:tc>");
        }
        xml.push_str("</a:tr>");
    }

    xml.push_str("</a:tbl>");
    xml.push_str("</a:graphicData>");
    xml.push_str("</a:graphic>");
    xml.push_str("</p:graphicFrame>");
    xml
}

fn even_share(total: i64, parts: i64, index: i64) -> i64 {
    let share = total / parts;
    if index == parts - 1 {
        total - share * (parts - 1)
    } else {
        share
    }
}

fn push_xfrm(xml: &mut String, tag: &str, g: Geometry) {
    xml.push_str(&format!(
        r#"<{tag}><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></{tag}>"#,
        g.left, g.top, g.width, g.height
    ));
}

/// Replace the text of an autoshape, one paragraph per line.
///
/// Body properties, list style, the first paragraph's properties and the
/// first run's properties are kept so the template's formatting survives.
pub fn set_text(shape_xml: &str, text: &str) -> Result<String> {
    let (range, body_pr, lst_style, p_pr, r_pr) = match find_element(shape_xml, b"txBody")? {
        Some(range) => {
            let body = &shape_xml[range.clone()];
            let first_p = element_slice(body, b"p")?;
            (
                Some(range),
                element_slice(body, b"bodyPr")?.unwrap_or("<a:bodyPr/>").to_string(),
                element_slice(body, b"lstStyle")?.unwrap_or("").to_string(),
                first_p
                    .map(|p| element_slice(p, b"pPr"))
                    .transpose()?
                    .flatten()
                    .unwrap_or("")
                    .to_string(),
                first_p
                    .map(|p| element_slice(p, b"rPr"))
                    .transpose()?
                    .flatten()
                    .unwrap_or("")
                    .to_string(),
            )
        }
        None => (
            None,
            "<a:bodyPr/>".to_string(),
            "<a:lstStyle/>".to_string(),
            String::new(),
            String::new(),
        ),
    };

    let mut body = String::from("<p:txBody>");
    body.push_str(&body_pr);
    body.push_str(&lst_style);
    for line in text.split('\n') {
        body.push_str("<a:p>");
        body.push_str(&p_pr);
        if !line.is_empty() {
            body.push_str("<a:r>");
            body.push_str(&r_pr);
            body.push_str(&format!("<a:t>{}</a:t>", escape(line)));
            body.push_str("</a:r>");
        }
        body.push_str("</a:p>");
    }
    body.push_str("</p:txBody>");

    let mut updated = String::with_capacity(shape_xml.len() + body.len());
    match range {
        Some(range) => {
            updated.push_str(&shape_xml[..range.start]);
            updated.push_str(&body);
            updated.push_str(&shape_xml[range.end..]);
        }
        None => {
            let close = shape_xml.rfind("</").ok_or_else(|| {
                Error::PptxParseError("Shape element is not closed".to_string())
            })?;
            updated.push_str(&shape_xml[..close]);
            updated.push_str(&body);
            updated.push_str(&shape_xml[close..]);
        }
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="costumer"><a:extLst><a:ext uri="{FF2B5EF4}"/></a:extLst></p:cNvPr><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="100" y="200"/><a:ext cx="3000" cy="400"/></a:xfrm></p:spPr><p:txBody><a:bodyPr anchor="ctr"/><a:lstStyle/><a:p><a:pPr algn="ctr"/><a:r><a:rPr lang="de-DE" sz="2400" b="1"/><a:t>Kundenname</a:t></a:r></a:p><a:p><a:r><a:t>second</a:t></a:r></a:p></p:txBody></p:sp>"#;

    #[test]
    fn test_parse_autoshape() {
        let info = ShapeInfo::parse(TITLE).unwrap();
        assert_eq!(info.id, 3);
        assert_eq!(info.name, "costumer");
        assert_eq!(info.kind, ShapeKind::AutoShape);
        assert_eq!(info.geometry, Some(Geometry::new(100, 200, 3000, 400)));
        assert_eq!(info.text, "Kundenname\nsecond");
        assert!(info.placeholder.is_none());
    }

    #[test]
    fn test_parse_inherited_placeholder() {
        let xml = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#;
        let info = ShapeInfo::parse(xml).unwrap();
        assert_eq!(info.geometry, None);
        assert_eq!(
            info.placeholder,
            Some(PlaceholderRef {
                kind: Some("title".into()),
                idx: None
            })
        );
    }

    #[test]
    fn test_parse_generated_table_and_picture() {
        let g = Geometry::new(10, 20, 900, 300);
        let table = table_xml(7, "Table 6", g, &[vec!["A", "B", "C"], vec!["1", "2", "3"]]);
        let info = ShapeInfo::parse(&table).unwrap();
        assert_eq!(info.kind, ShapeKind::GraphicFrame);
        assert_eq!(info.name, "Table 6");
        assert_eq!(info.geometry, Some(g));

        let pic = picture_xml(8, "Picture 7", "logo.png", "rId5", g);
        let info = ShapeInfo::parse(&pic).unwrap();
        assert_eq!(info.kind, ShapeKind::Picture);
        assert_eq!(info.id, 8);
        assert_eq!(info.geometry, Some(g));
        assert!(!info.kind.has_text_frame());
    }

    #[test]
    fn test_table_grid_covers_frame() {
        let g = Geometry::new(0, 0, 1000, 301);
        let xml = table_xml(2, "Table 1", g, &[vec!["a", "b", "c"], vec!["d", "e", "f"]]);
        assert!(xml.contains(r#"<a:gridCol w="333"/><a:gridCol w="333"/><a:gridCol w="334"/>"#));
        assert!(xml.contains(r#"<a:tr h="150">"#));
        assert!(xml.contains(r#"<a:tr h="151">"#));
        assert_eq!(xml.matches("<a:tc>").count(), 6);
    }

    #[test]
    fn test_table_escapes_cell_text() {
        let xml = table_xml(2, "Table 1", Geometry::default(), &[vec!["A & B"]]);
        assert!(xml.contains("<a:t>A &amp; B</a:t>"));
    }

    #[test]
    fn test_set_text_keeps_formatting() {
        let updated = set_text(TITLE, "Acme GmbH").unwrap();
        let info = ShapeInfo::parse(&updated).unwrap();
        assert_eq!(info.text, "Acme GmbH");
        assert!(updated.contains(r#"<a:bodyPr anchor="ctr"/>"#));
        assert!(updated.contains(r#"<a:pPr algn="ctr"/>"#));
        assert!(updated.contains(r#"<a:rPr lang="de-DE" sz="2400" b="1"/>"#));
        assert_eq!(info.geometry, Some(Geometry::new(100, 200, 3000, 400)));
    }

    #[test]
    fn test_set_text_without_text_body() {
        let xml = r#"<p:sp><p:nvSpPr><p:cNvPr id="4" name="box"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp>"#;
        let updated = set_text(xml, "one\ntwo").unwrap();
        assert!(updated.ends_with("</p:txBody></p:sp>"));
        assert_eq!(ShapeInfo::parse(&updated).unwrap().text, "one\ntwo");
    }

    #[test]
    fn test_placeholder_matching() {
        let by_idx = PlaceholderRef {
            kind: None,
            idx: Some("13".into()),
        };
        let layout = PlaceholderRef {
            kind: Some("body".into()),
            idx: Some("13".into()),
        };
        assert!(by_idx.matches(&layout));

        let title = PlaceholderRef {
            kind: Some("title".into()),
            idx: None,
        };
        assert!(title.matches(&PlaceholderRef {
            kind: Some("title".into()),
            idx: None
        }));
        assert!(!title.matches(&layout));
    }

    #[test]
    fn test_master_kind() {
        let ph = |kind: Option<&str>| PlaceholderRef {
            kind: kind.map(str::to_string),
            idx: Some("1".into()),
        };
        assert_eq!(ph(Some("ctrTitle")).master_kind(), "title");
        assert_eq!(ph(Some("title")).master_kind(), "title");
        assert_eq!(ph(Some("subTitle")).master_kind(), "body");
        assert_eq!(ph(Some("pic")).master_kind(), "body");
        assert_eq!(ph(None).master_kind(), "body");
        assert_eq!(ph(Some("sldNum")).master_kind(), "sldNum");
    }
}
