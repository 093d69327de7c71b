//! Shape index cache: slide ordinal → shape name → position of the shape
//! within that slide's shape collection.
//!
//! The index is built once from the template, then reconciled for a slide
//! after every edit. It is mirrored to a JSON side file so that the layout
//! of the template can be inspected while a report is generated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Shape name → position, for a single slide.
pub type SlideShapes = BTreeMap<String, usize>;

/// Name-to-position mapping for every slide of a presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeIndex {
    slides: BTreeMap<usize, SlideShapes>,
}

impl ShapeIndex {
    /// Build the index from the shape names of every slide, in document order.
    ///
    /// When a name occurs more than once on a slide the last position wins.
    pub fn build<S: AsRef<str>>(slides: &[Vec<S>]) -> Self {
        let mut index = Self::default();
        for (slide_idx, names) in slides.iter().enumerate() {
            let entry = index.slides.entry(slide_idx).or_default();
            for (shape_idx, name) in names.iter().enumerate() {
                entry.insert(name.as_ref().to_string(), shape_idx);
            }
        }
        index
    }

    /// Bring one slide's entries in line with its live shape names.
    ///
    /// Names not yet recorded are added with the position of their first
    /// live occurrence; recorded names that are no longer live are dropped.
    /// Entries present on both sides keep their recorded position.
    pub fn reconcile<S: AsRef<str>>(&mut self, slide: usize, live_names: &[S]) {
        let entry = self.slides.entry(slide).or_default();

        for (shape_idx, name) in live_names.iter().enumerate() {
            if !entry.contains_key(name.as_ref()) {
                log::debug!(
                    "Slide {}: recording new shape '{}' at {}",
                    slide,
                    name.as_ref(),
                    shape_idx
                );
                entry.insert(name.as_ref().to_string(), shape_idx);
            }
        }

        entry.retain(|name, _| {
            let live = live_names.iter().any(|n| n.as_ref() == name);
            if !live {
                log::debug!("Slide {}: dropping removed shape '{}'", slide, name);
            }
            live
        });
    }

    /// Recorded position of `name` on `slide`.
    pub fn get(&self, slide: usize, name: &str) -> Option<usize> {
        self.slides.get(&slide).and_then(|s| s.get(name)).copied()
    }

    /// All recorded entries of a slide.
    pub fn slide(&self, slide: usize) -> Option<&SlideShapes> {
        self.slides.get(&slide)
    }

    /// Number of slides recorded.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Pretty JSON with four-space indentation.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_json(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the index to its side file, replacing any previous content.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        log::debug!("Shape index written to {}", path.display());
        Ok(())
    }

    /// Read an index previously written by [`ShapeIndex::persist`].
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut ser)?;
        Ok(())
    }
}
