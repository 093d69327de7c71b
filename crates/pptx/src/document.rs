//! An editable presentation: the package plus the parsed shape trees of its
//! slides.

use akl_core::{Error, Geometry, Result, TabularData, ZOrder};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use crate::media::ImageFormat;
use crate::package::{rel_types, relative_target, resolve_target, Package};
use crate::shapes::{picture_xml, set_text, table_xml, ShapeInfo};
use crate::slide::{Slide, TreeNode};

/// A presentation loaded into memory for editing.
#[derive(Debug, Clone)]
pub struct PptxDocument {
    package: Package,
    slides: Vec<Slide>,
}

impl PptxDocument {
    /// Load a presentation from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let package = Package::from_reader(reader)?;

        let mut slides = Vec::new();
        for part_name in package.slide_parts()? {
            let xml = package.part_str(&part_name)?;
            slides.push(Slide::parse(&part_name, &xml)?);
        }

        log::debug!("Opened presentation with {} slides", slides.len());
        Ok(Self { package, slides })
    }

    /// Load a presentation from a file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Number of slides.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// The slide at 0-based `index`.
    pub fn slide(&self, index: usize) -> Result<&Slide> {
        let count = self.slides.len();
        self.slides
            .get(index)
            .ok_or(Error::InvalidSlideIndex { index, count })
    }

    fn slide_mut(&mut self, index: usize) -> Result<&mut Slide> {
        let count = self.slides.len();
        self.slides
            .get_mut(index)
            .ok_or(Error::InvalidSlideIndex { index, count })
    }

    /// Shape names of every slide, in document order.
    pub fn all_shape_names(&self) -> Result<Vec<Vec<String>>> {
        self.slides.iter().map(Slide::shape_names).collect()
    }

    /// Geometry of a shape. Placeholders without a transform of their own
    /// inherit it from the matching layout placeholder and, failing that,
    /// from the slide master.
    pub fn resolve_geometry(&self, slide: usize, shape: &ShapeInfo) -> Result<Geometry> {
        if let Some(geometry) = shape.geometry {
            return Ok(geometry);
        }

        let placeholder = shape.placeholder.as_ref().ok_or_else(|| {
            Error::PptxParseError(format!("Shape '{}' has no position", shape.name))
        })?;

        let slide_part = self.slide(slide)?.part_name().to_string();
        let layout_part = self.related_part(&slide_part, rel_types::SLIDE_LAYOUT)?;
        let layout_shape = self
            .part_shapes(&layout_part)?
            .into_iter()
            .find(|s| s.placeholder.as_ref().is_some_and(|ph| placeholder.matches(ph)));

        if let Some(geometry) = layout_shape.as_ref().and_then(|s| s.geometry) {
            return Ok(geometry);
        }

        // The layout placeholder, when there is one, decides the master type.
        let master_kind = layout_shape
            .as_ref()
            .and_then(|s| s.placeholder.as_ref())
            .unwrap_or(placeholder)
            .master_kind()
            .to_string();
        let master_part = self.related_part(&layout_part, rel_types::SLIDE_MASTER)?;
        log::debug!(
            "Placeholder '{}' takes its position from the {} placeholder of '{}'",
            shape.name,
            master_kind,
            master_part
        );

        self.part_shapes(&master_part)?
            .into_iter()
            .find(|s| {
                s.placeholder
                    .as_ref()
                    .is_some_and(|ph| ph.master_kind() == master_kind)
            })
            .and_then(|s| s.geometry)
            .ok_or_else(|| {
                Error::PptxParseError(format!(
                    "Position of placeholder '{}' not found in '{}' or '{}'",
                    shape.name, layout_part, master_part
                ))
            })
    }

    /// Target of the first relationship of `rel_type` from `part`.
    fn related_part(&self, part: &str, rel_type: &str) -> Result<String> {
        let rels = self.package.relationships(part)?;
        let rel = rels.first_of_type(rel_type).ok_or_else(|| {
            Error::PptxParseError(format!("'{}' has no relationship of type {}", part, rel_type))
        })?;
        Ok(resolve_target(part, &rel.target))
    }

    /// Shapes of a layout or master part.
    fn part_shapes(&self, part: &str) -> Result<Vec<ShapeInfo>> {
        Slide::parse(part, &self.package.part_str(part)?)?.shapes()
    }

    /// Remove the shape at `position` from a slide.
    pub fn remove_shape(&mut self, slide: usize, position: usize) -> Result<()> {
        let node = self.slide_mut(slide)?.remove_shape(position)?;
        log::debug!("Slide {}: removed <{}> at {}", slide, node.element, position);
        Ok(())
    }

    /// Move a shape to the top of the drawing order; returns its new position.
    pub fn bring_to_front(&mut self, slide: usize, position: usize) -> Result<usize> {
        self.slide_mut(slide)?.bring_to_front(position)
    }

    /// Move a shape below all others; returns its new position.
    pub fn send_to_back(&mut self, slide: usize, position: usize) -> Result<usize> {
        self.slide_mut(slide)?.send_to_back(position)
    }

    /// Insert an image file as a picture covering `geometry`.
    pub fn add_picture(
        &mut self,
        slide: usize,
        image: &Path,
        geometry: Geometry,
        z_order: ZOrder,
    ) -> Result<usize> {
        let data = std::fs::read(image)?;
        let format = ImageFormat::detect(image, &data)?;
        let descr = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image");
        self.add_picture_bytes(slide, data, format, descr, geometry, z_order)
    }

    /// Insert image data as a picture covering `geometry`.
    pub fn add_picture_bytes(
        &mut self,
        slide: usize,
        data: Vec<u8>,
        format: ImageFormat,
        descr: &str,
        geometry: Geometry,
        z_order: ZOrder,
    ) -> Result<usize> {
        let slide_part = self.slide(slide)?.part_name().to_string();

        let media_part = self.package.next_media_name(format.extension());
        self.package.set_part(&media_part, data);
        self.package
            .ensure_default_content_type(format.extension(), format.content_type())?;

        let mut rels = self.package.relationships(&slide_part)?;
        let rel_id = rels.add(rel_types::IMAGE, &relative_target(&slide_part, &media_part));
        self.package.set_relationships(&slide_part, &rels);

        let target = self.slide_mut(slide)?;
        let id = target.next_shape_id()?;
        let name = format!("Picture {}", id - 1);
        let xml = picture_xml(id, &name, descr, &rel_id, geometry);
        let position = target.insert_shape(TreeNode::new(xml, b"pic"), z_order);

        log::debug!(
            "Slide {}: inserted '{}' ({}) at {}",
            slide,
            name,
            media_part,
            position
        );
        Ok(position)
    }

    /// Insert a table covering `geometry`: the header row (if any), then one
    /// row per data row.
    pub fn add_table(
        &mut self,
        slide: usize,
        data: &TabularData,
        geometry: Geometry,
        z_order: ZOrder,
    ) -> Result<usize> {
        if data.is_empty() {
            return Err(Error::ConfigError("Cannot insert an empty table".to_string()));
        }

        let target = self.slide_mut(slide)?;
        let id = target.next_shape_id()?;
        let name = format!("Table {}", id - 1);
        let xml = table_xml(id, &name, geometry, &data.table_rows());
        let position = target.insert_shape(TreeNode::new(xml, b"graphicFrame"), z_order);

        log::debug!(
            "Slide {}: inserted '{}' ({}x{}) at {}",
            slide,
            name,
            data.table_row_count(),
            data.column_count(),
            position
        );
        Ok(position)
    }

    /// Replace the text of the shape at `position`.
    ///
    /// Only autoshapes carry a text frame; other kinds are a capability error.
    pub fn set_text(&mut self, slide: usize, position: usize, text: &str) -> Result<()> {
        let target = self.slide_mut(slide)?;
        let shape_xml = target.shape_xml(position).ok_or_else(|| {
            Error::PptxParseError(format!("No shape at position {} on slide {}", position, slide))
        })?;
        let info = ShapeInfo::parse(shape_xml)?;
        if !info.kind.has_text_frame() {
            return Err(Error::ShapeCapability {
                name: info.name,
                capability: "text",
            });
        }

        let updated = set_text(shape_xml, text)?;
        target.replace_shape_xml(position, updated)
    }

    /// Write the presentation, with all edits, to a writer.
    pub fn write_to<W: Write + Seek>(&mut self, writer: W) -> Result<()> {
        for slide in &self.slides {
            self.package
                .set_part(slide.part_name(), slide.to_xml().into_bytes());
        }
        self.package.write_to(writer)
    }

    /// Write the presentation to a file, replacing it if it exists.
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// The underlying package.
    pub fn package(&self) -> &Package {
        &self.package
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureShape, PresentationFixture, TINY_PNG};
    use crate::shapes::ShapeKind;
    use std::io::Cursor;

    fn sample() -> PptxDocument {
        let bytes = PresentationFixture::new()
            .slide(vec![
                FixtureShape::text("Title 1", "Datenanalyse", Geometry::new(0, 0, 9000, 1000)),
                FixtureShape::text("costumer", "Kundenname", Geometry::new(0, 1000, 9000, 800)),
                FixtureShape::text("logo", "", Geometry::new(100, 100, 2000, 1000)),
            ])
            .slide(vec![
                FixtureShape::text("Title 1", "Tabelle", Geometry::new(0, 0, 9000, 1000)),
                FixtureShape::text("table", "", Geometry::new(500, 1500, 8000, 3000)),
                FixtureShape::placeholder("Content 2", "13"),
            ])
            .build();
        PptxDocument::from_reader(Cursor::new(bytes)).unwrap()
    }

    fn reopen(doc: &mut PptxDocument) -> PptxDocument {
        let mut buf = Cursor::new(Vec::new());
        doc.write_to(&mut buf).unwrap();
        buf.set_position(0);
        PptxDocument::from_reader(buf).unwrap()
    }

    #[test]
    fn test_open_lists_slides_and_shapes() {
        let doc = sample();
        assert_eq!(doc.slide_count(), 2);
        assert_eq!(
            doc.all_shape_names().unwrap(),
            vec![
                vec!["Title 1", "costumer", "logo"],
                vec!["Title 1", "table", "Content 2"],
            ]
        );
        assert!(matches!(
            doc.slide(2),
            Err(Error::InvalidSlideIndex { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_resolve_geometry_from_layout() {
        let doc = sample();
        let shape = doc.slide(1).unwrap().shape(2).unwrap().unwrap();
        assert_eq!(shape.geometry, None);
        assert_eq!(
            doc.resolve_geometry(1, &shape).unwrap(),
            PresentationFixture::LAYOUT_BODY_GEOMETRY
        );
    }

    #[test]
    fn test_resolve_geometry_from_master() {
        let bytes = PresentationFixture::new()
            .slide(vec![
                FixtureShape::placeholder("Text 1", "1"),
                FixtureShape::typed_placeholder("costumer", "ctrTitle"),
                FixtureShape::placeholder("Orphan", "42"),
            ])
            .build();
        let doc = PptxDocument::from_reader(Cursor::new(bytes)).unwrap();
        let shapes = doc.slide(0).unwrap().shapes().unwrap();

        // Layout placeholder idx 1 has no transform; the master body has one.
        assert_eq!(
            doc.resolve_geometry(0, &shapes[0]).unwrap(),
            PresentationFixture::MASTER_BODY_GEOMETRY
        );
        // No layout placeholder of this type; the master title applies.
        assert_eq!(
            doc.resolve_geometry(0, &shapes[1]).unwrap(),
            PresentationFixture::MASTER_TITLE_GEOMETRY
        );
        // Unknown idx without type maps to the master body as well.
        assert_eq!(
            doc.resolve_geometry(0, &shapes[2]).unwrap(),
            PresentationFixture::MASTER_BODY_GEOMETRY
        );
    }

    #[test]
    fn test_add_picture_registers_media() {
        let mut doc = sample();
        let g = Geometry::new(100, 100, 2000, 1000);
        let pos = doc
            .add_picture_bytes(0, TINY_PNG.to_vec(), ImageFormat::Png, "logo.png", g, ZOrder::Front)
            .unwrap();
        assert_eq!(pos, 3);

        let doc = reopen(&mut doc);
        let pic = doc.slide(0).unwrap().shape(3).unwrap().unwrap();
        assert_eq!(pic.kind, ShapeKind::Picture);
        assert_eq!(pic.name, "Picture 4");
        assert_eq!(pic.geometry, Some(g));
        assert!(doc.package().contains("ppt/media/image1.png"));

        let content_types = doc.package().part_str("[Content_Types].xml").unwrap();
        assert!(content_types.contains(r#"Extension="png""#));
        let rels = doc.package().relationships("ppt/slides/slide1.xml").unwrap();
        assert!(rels.first_of_type(rel_types::IMAGE).is_some());
    }

    #[test]
    fn test_add_table_back_and_set_text() {
        let mut doc = sample();
        let data = TabularData::with_header(
            vec!["Artikel".into(), "Anteil".into()],
            vec![vec!["A-100".into(), "0.25".into()]],
        );
        let g = Geometry::new(500, 1500, 8000, 3000);
        let pos = doc.add_table(1, &data, g, ZOrder::Back).unwrap();
        assert_eq!(pos, 0);

        doc.set_text(0, 1, "Acme").unwrap();

        let doc = reopen(&mut doc);
        let table = doc.slide(1).unwrap().shape(0).unwrap().unwrap();
        assert_eq!(table.kind, ShapeKind::GraphicFrame);
        assert_eq!(table.geometry, Some(g));
        assert_eq!(table.text, "Artikel\nAnteil\nA-100\n0.25");
        assert_eq!(doc.slide(0).unwrap().shape(1).unwrap().unwrap().text, "Acme");
    }

    #[test]
    fn test_set_text_on_picture_fails() {
        let mut doc = sample();
        let pos = doc
            .add_picture_bytes(0, TINY_PNG.to_vec(), ImageFormat::Png, "x.png", Geometry::default(), ZOrder::Front)
            .unwrap();
        assert!(matches!(
            doc.set_text(0, pos, "nope"),
            Err(Error::ShapeCapability { capability: "text", .. })
        ));
    }

    #[test]
    fn test_add_empty_table_fails() {
        let mut doc = sample();
        assert!(doc
            .add_table(1, &TabularData::default(), Geometry::default(), ZOrder::Back)
            .is_err());
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pptx");
        let mut doc = sample();
        doc.remove_shape(0, 2).unwrap();
        doc.save_to(&path).unwrap();

        let reopened = PptxDocument::open(&path).unwrap();
        assert_eq!(
            reopened.slide(0).unwrap().shape_names().unwrap(),
            vec!["Title 1", "costumer"]
        );
    }
}
