//! In-memory PPTX files for tests.

use akl_core::Geometry;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::xml::escape;

/// A 1x1 transparent PNG.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const TREE_HEADER: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

/// A shape placed on a fixture slide.
#[derive(Debug, Clone)]
pub enum FixtureShape {
    /// Text box with explicit position.
    Text {
        name: String,
        text: String,
        geometry: Geometry,
    },
    /// Placeholder that inherits its position from the layout or master.
    Placeholder {
        name: String,
        kind: Option<String>,
        idx: Option<String>,
    },
    /// Picture without media (only used for lookup tests).
    Picture { name: String, geometry: Geometry },
}

impl FixtureShape {
    pub fn text(name: &str, text: &str, geometry: Geometry) -> Self {
        Self::Text {
            name: name.to_string(),
            text: text.to_string(),
            geometry,
        }
    }

    pub fn placeholder(name: &str, idx: &str) -> Self {
        Self::Placeholder {
            name: name.to_string(),
            kind: None,
            idx: Some(idx.to_string()),
        }
    }

    pub fn typed_placeholder(name: &str, kind: &str) -> Self {
        Self::Placeholder {
            name: name.to_string(),
            kind: Some(kind.to_string()),
            idx: None,
        }
    }

    pub fn picture(name: &str, geometry: Geometry) -> Self {
        Self::Picture {
            name: name.to_string(),
            geometry,
        }
    }

    fn to_xml(&self, id: u32) -> String {
        match self {
            Self::Text {
                name,
                text,
                geometry: g,
            } => {
                let runs = if text.is_empty() {
                    String::new()
                } else {
                    format!(r#"<a:r><a:rPr lang="de-DE"/><a:t>{}</a:t></a:r>"#, escape(text))
                };
                format!(
                    r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="square"/><a:lstStyle/><a:p>{runs}</a:p></p:txBody></p:sp>"#,
                    escape(name),
                    g.left,
                    g.top,
                    g.width,
                    g.height
                )
            }
            Self::Placeholder { name, kind, idx } => {
                let mut ph = String::new();
                if let Some(kind) = kind {
                    ph.push_str(&format!(r#" type="{}""#, escape(kind)));
                }
                if let Some(idx) = idx {
                    ph.push_str(&format!(r#" idx="{}""#, escape(idx)));
                }
                format!(
                    r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph{ph}/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
                    escape(name)
                )
            }
            Self::Picture { name, geometry: g } => format!(
                r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="{}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill/><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm></p:spPr></p:pic>"#,
                escape(name),
                g.left,
                g.top,
                g.width,
                g.height
            ),
        }
    }
}

/// Builder for a small but structurally complete presentation.
#[derive(Debug, Clone, Default)]
pub struct PresentationFixture {
    slides: Vec<Vec<FixtureShape>>,
}

impl PresentationFixture {
    /// Position of the layout's body placeholder (`idx="13"`).
    pub const LAYOUT_BODY_GEOMETRY: Geometry = Geometry {
        left: 838_200,
        top: 1_825_625,
        width: 10_515_600,
        height: 4_351_338,
    };

    /// Position of the master's title placeholder.
    pub const MASTER_TITLE_GEOMETRY: Geometry = Geometry {
        left: 838_200,
        top: 365_125,
        width: 10_515_600,
        height: 1_325_563,
    };

    /// Position of the master's body placeholder, inherited by the layout's
    /// `idx="1"` body placeholder, which has no transform of its own.
    pub const MASTER_BODY_GEOMETRY: Geometry = Geometry {
        left: 838_200,
        top: 1_690_688,
        width: 10_515_600,
        height: 4_486_275,
    };

    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slide with the given shapes (ids start at 2).
    pub fn slide(mut self, shapes: Vec<FixtureShape>) -> Self {
        self.slides.push(shapes);
        self
    }

    /// Serialize the presentation as PPTX bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        let mut add = |name: &str, content: String| {
            zip.start_file(name, options).expect("start fixture entry");
            zip.write_all(content.as_bytes()).expect("write fixture entry");
        };

        let mut overrides = String::new();
        for i in 1..=self.slides.len() {
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            ));
        }
        add(
            "[Content_Types].xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>{overrides}</Types>"#
            ),
        );
        add(
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
                .to_string(),
        );

        // Slide relationships start after the master so that rId order and
        // slide order differ, as they do in real files.
        let mut slide_ids = String::new();
        let mut pres_rels = String::from(
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
        );
        for i in 1..=self.slides.len() {
            slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, i + 1));
            pres_rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{i}.xml"/>"#,
                i + 1
            ));
        }
        add(
            "ppt/presentation.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
            ),
        );
        add(
            "ppt/_rels/presentation.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{pres_rels}</Relationships>"#
            ),
        );

        let t = Self::MASTER_TITLE_GEOMETRY;
        let b = Self::MASTER_BODY_GEOMETRY;
        add(
            "ppt/slideMasters/slideMaster1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster {NS}><p:cSld><p:spTree>{TREE_HEADER}<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title Placeholder 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm></p:spPr></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Text Placeholder 2"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm></p:spPr></p:sp></p:spTree></p:cSld><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#,
                t.left, t.top, t.width, t.height, b.left, b.top, b.width, b.height
            ),
        );

        let g = Self::LAYOUT_BODY_GEOMETRY;
        add(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#
                .to_string(),
        );
        add(
            "ppt/slideLayouts/slideLayout1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout {NS}><p:cSld name="Title and Content"><p:spTree>{TREE_HEADER}<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="838200" y="365125"/><a:ext cx="10515600" cy="1325563"/></a:xfrm></p:spPr></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Content Placeholder 2"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph idx="13"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm></p:spPr></p:sp><p:sp><p:nvSpPr><p:cNvPr id="4" name="Text Placeholder 3"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp></p:spTree></p:cSld></p:sldLayout>"#,
                g.left, g.top, g.width, g.height
            ),
        );
        add(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#
                .to_string(),
        );

        for (i, shapes) in self.slides.iter().enumerate() {
            let body: String = shapes
                .iter()
                .enumerate()
                .map(|(j, s)| s.to_xml(j as u32 + 2))
                .collect();
            add(
                &format!("ppt/slides/slide{}.xml", i + 1),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {NS}><p:cSld><p:spTree>{TREE_HEADER}{body}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
                ),
            );
            add(
                &format!("ppt/slides/_rels/slide{}.xml.rels", i + 1),
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#
                    .to_string(),
            );
        }

        drop(add);
        zip.finish().expect("finish fixture archive").into_inner()
    }
}
