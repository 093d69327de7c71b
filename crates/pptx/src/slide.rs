//! Slide parts and their shape trees.
//!
//! The children of `p:spTree` are kept as raw XML fragments. Edits add,
//! remove or rewrite whole children; everything around the tree is written
//! back untouched.

use akl_core::{Error, Result, ZOrder};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::shapes::{ShapeInfo, ShapeKind};
use crate::xml::{attr, local_name, tag_start};

/// Raw child index in `p:spTree` where back-inserted shapes land.
///
/// Children 0 and 1 are the group header (`p:nvGrpSpPr`, `p:grpSpPr`), so
/// index 2 is directly below every existing shape.
pub const BACK_INSERT_INDEX: usize = 2;

/// One direct child of the shape tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Complete XML of the element.
    pub xml: String,
    /// Shape kind, `None` for the group header and extension lists.
    pub kind: Option<ShapeKind>,
    /// Local element name.
    pub element: String,
}

impl TreeNode {
    /// Create a node from the XML of a single element.
    pub fn new(xml: String, element: &[u8]) -> Self {
        Self {
            xml,
            kind: ShapeKind::from_local_name(element),
            element: String::from_utf8_lossy(element).into_owned(),
        }
    }

    /// Whether this child is a shape (as opposed to tree properties).
    pub fn is_shape(&self) -> bool {
        self.kind.is_some()
    }
}

/// A slide (or layout) part with its parsed shape tree.
#[derive(Debug, Clone)]
pub struct Slide {
    part_name: String,
    head: String,
    nodes: Vec<TreeNode>,
    tail: String,
}

impl Slide {
    /// Split the part XML around the children of `p:spTree`.
    pub fn parse(part_name: &str, xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut depth = 0usize;
        let mut tree_depth: Option<usize> = None;
        let mut head_end: Option<usize> = None;
        let mut tail_start: Option<usize> = None;
        let mut child: Option<(usize, Vec<u8>)> = None;
        let mut nodes = Vec::new();

        loop {
            let before = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    match tree_depth {
                        None if local == b"spTree" => {
                            tree_depth = Some(depth + 1);
                            head_end = Some(reader.buffer_position());
                        }
                        Some(d) if d == depth && tail_start.is_none() => {
                            child = Some((tag_start(xml, before), local.to_vec()));
                        }
                        _ => {}
                    }
                    depth += 1;
                }
                Ok(Event::Empty(ref e)) => {
                    if tree_depth == Some(depth) && tail_start.is_none() {
                        let name = e.name();
                        let start = tag_start(xml, before);
                        nodes.push(TreeNode::new(
                            xml[start..reader.buffer_position()].to_string(),
                            local_name(name.as_ref()),
                        ));
                    }
                }
                Ok(Event::End(ref e)) => {
                    depth = depth.saturating_sub(1);
                    if let Some(d) = tree_depth {
                        if tail_start.is_none() && depth == d {
                            if let Some((start, element)) = child.take() {
                                nodes.push(TreeNode::new(
                                    xml[start..reader.buffer_position()].to_string(),
                                    &element,
                                ));
                            }
                        } else if tail_start.is_none()
                            && depth + 1 == d
                            && local_name(e.name().as_ref()) == b"spTree"
                        {
                            tail_start = Some(tag_start(xml, before));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing '{}': {}",
                        part_name, e
                    )));
                }
                _ => {}
            }
        }

        let (head_end, tail_start) = match (head_end, tail_start) {
            (Some(h), Some(t)) => (h, t),
            _ => {
                return Err(Error::PptxParseError(format!(
                    "'{}' has no shape tree",
                    part_name
                )));
            }
        };

        Ok(Self {
            part_name: part_name.to_string(),
            head: xml[..head_end].to_string(),
            nodes,
            tail: xml[tail_start..].to_string(),
        })
    }

    /// Name of the part inside the package.
    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    /// Serialize the slide with its current shape tree.
    pub fn to_xml(&self) -> String {
        let body_len: usize = self.nodes.iter().map(|n| n.xml.len()).sum();
        let mut xml = String::with_capacity(self.head.len() + body_len + self.tail.len());
        xml.push_str(&self.head);
        for node in &self.nodes {
            xml.push_str(&node.xml);
        }
        xml.push_str(&self.tail);
        xml
    }

    /// All direct children of the shape tree, header included.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of shapes (header and extension lists excluded).
    pub fn shape_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_shape()).count()
    }

    /// Raw child index of the shape at `position`.
    fn node_index(&self, position: usize) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_shape())
            .nth(position)
            .map(|(i, _)| i)
    }

    /// Shape position of the raw child at `node_index`.
    fn shape_position(&self, node_index: usize) -> usize {
        self.nodes[..node_index].iter().filter(|n| n.is_shape()).count()
    }

    /// XML of the shape at `position`.
    pub fn shape_xml(&self, position: usize) -> Option<&str> {
        self.node_index(position).map(|i| self.nodes[i].xml.as_str())
    }

    /// Parsed information of every shape, in document order.
    pub fn shapes(&self) -> Result<Vec<ShapeInfo>> {
        self.nodes
            .iter()
            .filter(|n| n.is_shape())
            .map(|n| ShapeInfo::parse(&n.xml))
            .collect()
    }

    /// Parsed information of the shape at `position`.
    pub fn shape(&self, position: usize) -> Result<Option<ShapeInfo>> {
        self.shape_xml(position).map(ShapeInfo::parse).transpose()
    }

    /// Shape names in document order.
    pub fn shape_names(&self) -> Result<Vec<String>> {
        Ok(self.shapes()?.into_iter().map(|s| s.name).collect())
    }

    /// Position of the last shape called `name`.
    pub fn find_by_name(&self, name: &str) -> Result<Option<usize>> {
        Ok(self.shape_names()?.iter().rposition(|n| n == name))
    }

    /// An id not yet used anywhere in the shape tree.
    ///
    /// Every `cNvPr` counts, including the tree header and shapes nested
    /// in groups.
    pub fn next_shape_id(&self) -> Result<u32> {
        let mut max = 1;
        for node in &self.nodes {
            let mut reader = Reader::from_str(&node.xml);
            loop {
                match reader.read_event() {
                    Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                        if local_name(e.name().as_ref()) == b"cNvPr" =>
                    {
                        if let Some(id) = attr(e, b"id").and_then(|v| v.parse::<u32>().ok()) {
                            max = max.max(id);
                        }
                    }
                    Ok(Event::Eof) => break,
                    Err(e) => {
                        return Err(Error::XmlError(format!(
                            "Error parsing '{}': {}",
                            self.part_name, e
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(max + 1)
    }

    /// Remove the shape at `position` and return its node.
    pub fn remove_shape(&mut self, position: usize) -> Result<TreeNode> {
        let index = self.node_index(position).ok_or_else(|| {
            Error::PptxParseError(format!(
                "No shape at position {} on '{}'",
                position, self.part_name
            ))
        })?;
        Ok(self.nodes.remove(index))
    }

    /// Replace the XML of the shape at `position`.
    pub fn replace_shape_xml(&mut self, position: usize, xml: String) -> Result<()> {
        let index = self.node_index(position).ok_or_else(|| {
            Error::PptxParseError(format!(
                "No shape at position {} on '{}'",
                position, self.part_name
            ))
        })?;
        self.nodes[index].xml = xml;
        Ok(())
    }

    /// Insert a shape node and return its shape position.
    pub fn insert_shape(&mut self, node: TreeNode, z_order: ZOrder) -> usize {
        let index = match z_order {
            ZOrder::Back => BACK_INSERT_INDEX.min(self.nodes.len()),
            // Shapes go before a trailing extension list.
            ZOrder::Front => self
                .nodes
                .iter()
                .rposition(|n| n.element == "extLst")
                .unwrap_or(self.nodes.len()),
        };
        self.nodes.insert(index, node);
        self.shape_position(index)
    }

    /// Move the shape at `position` to the top of the drawing order.
    pub fn bring_to_front(&mut self, position: usize) -> Result<usize> {
        let node = self.remove_shape(position)?;
        Ok(self.insert_shape(node, ZOrder::Front))
    }

    /// Move the shape at `position` below every other shape.
    pub fn send_to_back(&mut self, position: usize) -> Result<usize> {
        let node = self.remove_shape(position)?;
        Ok(self.insert_shape(node, ZOrder::Back))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>
  <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
  <p:grpSpPr/>
  <p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="1" y="2"/><a:ext cx="3" cy="4"/></a:xfrm></p:spPr></p:sp>
  <p:pic><p:nvPicPr><p:cNvPr id="5" name="logo"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill/><p:spPr/></p:pic>
  <p:extLst><p:ext uri="{X}"/></p:extLst>
</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#;

    fn node(name: &str, id: u32) -> TreeNode {
        TreeNode::new(
            format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp>"#,
                id, name
            ),
            b"sp",
        )
    }

    #[test]
    fn test_parse_shape_tree() {
        let slide = Slide::parse("ppt/slides/slide1.xml", SLIDE).unwrap();
        assert_eq!(slide.nodes().len(), 5);
        assert_eq!(slide.shape_count(), 2);
        assert_eq!(slide.shape_names().unwrap(), vec!["Title 1", "logo"]);
        assert_eq!(slide.next_shape_id().unwrap(), 6);
        assert_eq!(slide.find_by_name("logo").unwrap(), Some(1));
        assert_eq!(slide.find_by_name("missing").unwrap(), None);
    }

    #[test]
    fn test_next_shape_id_sees_group_members() {
        let group = r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="7" name="Group 6"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="12" name="Inner"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp></p:grpSp>"#;
        let mut slide = Slide::parse("s", SLIDE).unwrap();
        slide.insert_shape(TreeNode::new(group.to_string(), b"grpSp"), ZOrder::Front);

        assert_eq!(slide.shape_names().unwrap(), vec!["Title 1", "logo", "Group 6"]);
        assert_eq!(slide.next_shape_id().unwrap(), 13);
    }

    #[test]
    fn test_unchanged_slide_keeps_surroundings() {
        let slide = Slide::parse("ppt/slides/slide1.xml", SLIDE).unwrap();
        let xml = slide.to_xml();
        assert!(xml.starts_with(r#"<?xml version="1.0""#));
        assert!(xml.contains("<p:spTree><p:nvGrpSpPr>"));
        assert!(xml.ends_with("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"));
        let reparsed = Slide::parse("ppt/slides/slide1.xml", &xml).unwrap();
        assert_eq!(reparsed.nodes(), slide.nodes());
    }

    #[test]
    fn test_insert_back_lands_after_header() {
        let mut slide = Slide::parse("s", SLIDE).unwrap();
        let pos = slide.insert_shape(node("Table 5", 6), ZOrder::Back);
        assert_eq!(pos, 0);
        assert_eq!(slide.nodes()[BACK_INSERT_INDEX].xml, node("Table 5", 6).xml);
        assert_eq!(slide.shape_names().unwrap(), vec!["Table 5", "Title 1", "logo"]);
    }

    #[test]
    fn test_insert_front_stays_before_ext_list() {
        let mut slide = Slide::parse("s", SLIDE).unwrap();
        let pos = slide.insert_shape(node("Picture 5", 6), ZOrder::Front);
        assert_eq!(pos, 2);
        assert_eq!(slide.nodes().last().unwrap().element, "extLst");
        assert_eq!(slide.shape_names().unwrap(), vec!["Title 1", "logo", "Picture 5"]);
    }

    #[test]
    fn test_remove_and_reorder() {
        let mut slide = Slide::parse("s", SLIDE).unwrap();
        assert_eq!(slide.bring_to_front(0).unwrap(), 1);
        assert_eq!(slide.shape_names().unwrap(), vec!["logo", "Title 1"]);
        assert_eq!(slide.send_to_back(1).unwrap(), 0);
        assert_eq!(slide.shape_names().unwrap(), vec!["Title 1", "logo"]);

        let removed = slide.remove_shape(0).unwrap();
        assert_eq!(removed.kind, Some(ShapeKind::AutoShape));
        assert_eq!(slide.shape_names().unwrap(), vec!["logo"]);
        assert!(slide.remove_shape(3).is_err());
    }

    #[test]
    fn test_missing_shape_tree() {
        let err = Slide::parse("s", "<p:sld><p:cSld/></p:sld>").unwrap_err();
        assert!(matches!(err, Error::PptxParseError(_)));
    }
}
