//! OPC package handling: the ZIP container, relationship parts and the
//! content type registry.

use akl_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::xml::{attr, escape, local_name, prefixed_attr};

/// Name of the content type registry part.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Main presentation part.
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Relationship type URIs used when editing slides.
pub mod rel_types {
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
}

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// A single part of the package.
#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// All parts of a PPTX file, held in memory in their original order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    /// Read every part of the ZIP archive.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
            parts.push(Part { name, data });
        }

        log::debug!("Loaded package with {} parts", parts.len());
        Ok(Self { parts })
    }

    /// Open a package from a file on disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Whether a part with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    /// Raw bytes of a part.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// A part decoded as UTF-8 text; missing parts are an error.
    pub fn part_str(&self, name: &str) -> Result<String> {
        let data = self
            .part(name)
            .ok_or_else(|| Error::PptxParseError(format!("Part not found in package: '{}'", name)))?;
        String::from_utf8(data.to_vec())
            .map_err(|e| Error::PptxParseError(format!("Part '{}' is not UTF-8: {}", name, e)))
    }

    /// Replace the content of a part, adding it if it does not exist yet.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// Names of all parts, in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    /// Relationships of `part`; an empty set if the part has no rels part.
    pub fn relationships(&self, part: &str) -> Result<Relationships> {
        let rels_path = rels_path_for(part);
        if !self.contains(&rels_path) {
            return Ok(Relationships::default());
        }
        Relationships::parse(&self.part_str(&rels_path)?)
    }

    /// Write back the relationships of `part`.
    pub fn set_relationships(&mut self, part: &str, rels: &Relationships) {
        self.set_part(&rels_path_for(part), rels.to_xml().into_bytes());
    }

    /// Make sure `[Content_Types].xml` maps `extension` to `content_type`.
    pub fn ensure_default_content_type(&mut self, extension: &str, content_type: &str) -> Result<()> {
        let xml = self.part_str(CONTENT_TYPES_PART)?;
        let mut reader = Reader::from_str(&xml);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Default" =>
                {
                    if attr(e, b"Extension").is_some_and(|ext| ext.eq_ignore_ascii_case(extension)) {
                        return Ok(());
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!("Error parsing content types: {}", e)));
                }
                _ => {}
            }
        }

        let close = xml
            .rfind("</Types>")
            .ok_or_else(|| Error::PptxParseError("Content types part has no </Types>".to_string()))?;
        let mut updated = String::with_capacity(xml.len() + 80);
        updated.push_str(&xml[..close]);
        updated.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            escape(extension),
            escape(content_type)
        ));
        updated.push_str(&xml[close..]);
        self.set_part(CONTENT_TYPES_PART, updated.into_bytes());
        log::debug!("Registered content type {} for .{}", content_type, extension);
        Ok(())
    }

    /// Slide part names in presentation order (`p:sldIdLst`).
    pub fn slide_parts(&self) -> Result<Vec<String>> {
        let xml = self.part_str(PRESENTATION_PART)?;
        let rels = self.relationships(PRESENTATION_PART)?;

        let mut slides = Vec::new();
        let mut reader = Reader::from_str(&xml);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"sldId" =>
                {
                    let rid = prefixed_attr(e, b"id").ok_or_else(|| {
                        Error::PptxParseError("Slide id without relationship id".to_string())
                    })?;
                    let rel = rels.get(&rid).ok_or_else(|| {
                        Error::PptxParseError(format!("Unknown slide relationship '{}'", rid))
                    })?;
                    slides.push(resolve_target(PRESENTATION_PART, &rel.target));
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!("Error parsing presentation: {}", e)));
                }
                _ => {}
            }
        }

        Ok(slides)
    }

    /// Next free `ppt/media/image<N>.<ext>` part name.
    pub fn next_media_name(&self, extension: &str) -> String {
        let next = self
            .part_names()
            .filter_map(|name| name.strip_prefix("ppt/media/image"))
            .filter_map(|rest| rest.split('.').next())
            .filter_map(|n| n.parse::<usize>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        format!("ppt/media/image{}.{}", next, extension)
    }

    /// Serialize the package as a ZIP archive.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for part in &self.parts {
            zip.start_file(part.name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", part.name, e)))?;
            zip.write_all(&part.data)?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        Ok(())
    }
}

/// One `<Relationship>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub target_mode: Option<String>,
}

/// The relationships of one part.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    rels: Vec<Relationship>,
}

impl Relationships {
    /// Parse a `.rels` part.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut rels = Vec::new();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    rels.push(Relationship {
                        id: attr(e, b"Id").unwrap_or_default(),
                        rel_type: attr(e, b"Type").unwrap_or_default(),
                        target: attr(e, b"Target").unwrap_or_default(),
                        target_mode: attr(e, b"TargetMode"),
                    });
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(Self { rels })
    }

    /// Relationship with the given id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.id == id)
    }

    /// First relationship of the given type.
    pub fn first_of_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.rel_type == rel_type)
    }

    /// Add a relationship and return its new id.
    pub fn add(&mut self, rel_type: &str, target: &str) -> String {
        let next = self
            .rels
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<usize>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{}", next);
        self.rels.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            target_mode: None,
        });
        id
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Whether there are no relationships.
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Serialize as a `.rels` part.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, RELATIONSHIPS_NS));
        for rel in &self.rels {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}""#,
                escape(&rel.id),
                escape(&rel.rel_type),
                escape(&rel.target)
            ));
            if let Some(mode) = &rel.target_mode {
                xml.push_str(&format!(r#" TargetMode="{}""#, escape(mode)));
            }
            xml.push_str("/>");
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target relative to the part that owns it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Target of `part` as seen from `source_part` (inverse of [`resolve_target`]).
pub fn relative_target(source_part: &str, part: &str) -> String {
    let source_dir: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target: Vec<&str> = part.split('/').collect();

    let common = source_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<&str> = vec![".."; source_dir.len() - common];
    segments.extend(&target[common..]);
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_path_for() {
        assert_eq!(
            rels_path_for("ppt/slides/slide1.xml"),
            "ppt/slides/_rels/slide1.xml.rels"
        );
        assert_eq!(rels_path_for("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slides/slide2.xml"),
            "ppt/slides/slide2.xml"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../media/image1.png"),
            "ppt/media/image1.png"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "/ppt/media/image3.png"),
            "ppt/media/image3.png"
        );
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(
            relative_target("ppt/slides/slide1.xml", "ppt/media/image4.png"),
            "../media/image4.png"
        );
        assert_eq!(
            relative_target("ppt/presentation.xml", "ppt/slides/slide1.xml"),
            "slides/slide1.xml"
        );
    }

    #[test]
    fn test_relationships_roundtrip_and_add() {
        let xml = r#"<?xml version="1.0"?><Relationships xmlns="x"><Relationship Id="rId1" Type="t/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId3" Type="t/image" Target="../media/image1.png"/></Relationships>"#;
        let mut rels = Relationships::parse(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels.get("rId3").unwrap().target, "../media/image1.png");

        let id = rels.add(rel_types::IMAGE, "../media/image2.png");
        assert_eq!(id, "rId4");

        let reparsed = Relationships::parse(&rels.to_xml()).unwrap();
        assert_eq!(reparsed.len(), 3);
        assert_eq!(reparsed.first_of_type(rel_types::IMAGE).unwrap().id, "rId4");
    }
}
