//! The report session: one presentation, its shape index and the customer
//! it is generated for.

use akl_core::{
    CellRange, CustomerContext, Error, Geometry, Result, SaveMode, ShapeIndex, TabularData, ZOrder,
};
use akl_pptx::{ImageFormat, PptxDocument, ShapeInfo};
use akl_xlsx::{with_workbook, DesktopBridge, ReadOptions, SheetRef};
use std::path::{Path, PathBuf};

/// File name of the persisted shape index inside the work directory.
pub const ELEMENTS_FILE_NAME: &str = "elements.json";

/// Where a session reads its template and writes its side files.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Presentation template to fill.
    pub template: PathBuf,
    /// Directory for `elements.json` and exported charts.
    pub work_dir: PathBuf,
    /// Customer the report is generated for.
    pub customer: CustomerContext,
    /// When the output presentation is written.
    pub save_mode: SaveMode,
}

/// How an image takes the place of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    /// Delete the target shape after taking its geometry.
    pub remove_placeholder: bool,
    /// Where the picture lands in the drawing order.
    pub z_order: ZOrder,
}

impl ImageOptions {
    /// Keep the target and draw the picture on top of it (logos).
    pub fn overlay() -> Self {
        Self {
            remove_placeholder: false,
            z_order: ZOrder::Front,
        }
    }

    /// Delete the target and draw the picture behind everything (charts).
    pub fn replace() -> Self {
        Self {
            remove_placeholder: true,
            z_order: ZOrder::Back,
        }
    }
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self::replace()
    }
}

/// A shape found by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeRef {
    pub slide: usize,
    /// Position in the slide's shape collection.
    pub position: usize,
    pub info: ShapeInfo,
}

/// An open report.
///
/// Every mutating operation locates its target through the shape index,
/// edits the slide, reconciles the index for that slide and persists it.
/// With [`SaveMode::EachEdit`] the presentation is written after each edit.
pub struct ReportSession {
    document: PptxDocument,
    index: ShapeIndex,
    index_path: PathBuf,
    work_dir: PathBuf,
    customer: CustomerContext,
    save_mode: SaveMode,
}

impl ReportSession {
    /// Open the template, build the shape index and persist it.
    pub fn open(config: SessionConfig) -> Result<Self> {
        log::info!("Opening template {}", config.template.display());
        let document = PptxDocument::open(&config.template)?;
        Self::from_document(document, config)
    }

    /// Start a session on an already loaded presentation.
    pub fn from_document(document: PptxDocument, config: SessionConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let index = ShapeIndex::build(&document.all_shape_names()?);
        let index_path = config.work_dir.join(ELEMENTS_FILE_NAME);
        index.persist(&index_path)?;

        log::info!(
            "Indexed {} slides for customer '{}'",
            index.slide_count(),
            config.customer.name
        );

        Ok(Self {
            document,
            index,
            index_path,
            work_dir: config.work_dir,
            customer: config.customer,
            save_mode: config.save_mode,
        })
    }

    pub fn document(&self) -> &PptxDocument {
        &self.document
    }

    pub fn index(&self) -> &ShapeIndex {
        &self.index
    }

    pub fn customer(&self) -> &CustomerContext {
        &self.customer
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Path of the persisted shape index.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Locate a shape by slide and name.
    ///
    /// Returns `Ok(None)` when no such name is indexed on the slide and an
    /// error when the slide does not exist. If the indexed position holds a
    /// differently named shape, the slide is scanned by name instead.
    pub fn find(&self, slide: usize, name: &str) -> Result<Option<ShapeRef>> {
        let target = self.document.slide(slide)?;

        let Some(indexed) = self.index.get(slide, name) else {
            return Ok(None);
        };

        let position = match target.shape(indexed)? {
            Some(info) if info.name == name => Some((indexed, info)),
            _ => {
                log::warn!(
                    "Slide {}: index points '{}' at {}, which holds another shape; scanning by name",
                    slide,
                    name,
                    indexed
                );
                match target.find_by_name(name)? {
                    Some(position) => target.shape(position)?.map(|info| (position, info)),
                    None => None,
                }
            }
        };

        match position {
            Some((position, info)) => Ok(Some(ShapeRef {
                slide,
                position,
                info,
            })),
            None => Ok(None),
        }
    }

    /// Effective geometry of a found shape, inherited from the layout or the
    /// slide master where the shape has no transform of its own.
    pub fn geometry(&self, target: &ShapeRef) -> Result<Geometry> {
        self.document.resolve_geometry(target.slide, &target.info)
    }

    fn require(&self, slide: usize, name: &str) -> Result<ShapeRef> {
        self.find(slide, name)?.ok_or_else(|| Error::ShapeNotFound {
            slide,
            name: name.to_string(),
        })
    }

    fn after_edit(&mut self, slide: usize) -> Result<()> {
        let live = self.document.slide(slide)?.shape_names()?;
        self.index.reconcile(slide, &live);
        self.index.persist(&self.index_path)?;

        if self.save_mode == SaveMode::EachEdit {
            self.save()?;
        }
        Ok(())
    }

    /// Put an image where the shape `name` is, sized to its geometry.
    pub fn replace_with_image(
        &mut self,
        slide: usize,
        name: &str,
        image: &Path,
        options: ImageOptions,
    ) -> Result<usize> {
        let target = self.require(slide, name)?;

        // Read before touching the slide so a bad file leaves it intact.
        let data = std::fs::read(image)?;
        let format = ImageFormat::detect(image, &data)?;
        let descr = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);

        let geometry = self.geometry(&target)?;
        if options.remove_placeholder {
            self.document.remove_shape(slide, target.position)?;
        }
        let position = self.document.add_picture_bytes(
            slide,
            data,
            format,
            descr,
            geometry,
            options.z_order,
        )?;

        log::info!(
            "Slide {}: placed {} at '{}'",
            slide,
            image.display(),
            name
        );
        self.after_edit(slide)?;
        Ok(position)
    }

    /// Replace the text of the shape `name`, keeping its formatting.
    pub fn replace_with_text(&mut self, slide: usize, name: &str, text: &str) -> Result<()> {
        let target = self.require(slide, name)?;
        self.document.set_text(slide, target.position, text)?;

        log::info!("Slide {}: set text of '{}'", slide, name);
        self.after_edit(slide)
    }

    /// Delete the shape `name` and insert a table in its place.
    pub fn replace_with_table(
        &mut self,
        slide: usize,
        name: &str,
        table: &TabularData,
        z_order: ZOrder,
    ) -> Result<usize> {
        if table.is_empty() {
            return Err(Error::ConfigError(format!(
                "No table data for '{}' on slide {}",
                name, slide
            )));
        }

        let target = self.require(slide, name)?;
        let geometry = self.geometry(&target)?;
        self.document.remove_shape(slide, target.position)?;
        let position = self.document.add_table(slide, table, geometry, z_order)?;

        log::info!(
            "Slide {}: replaced '{}' with a {}x{} table",
            slide,
            name,
            table.table_row_count(),
            table.column_count()
        );
        self.after_edit(slide)?;
        Ok(position)
    }

    /// Replace the shape `name` with an in-memory table, behind all other
    /// shapes.
    pub fn add_table(&mut self, slide: usize, name: &str, table: &TabularData) -> Result<usize> {
        self.replace_with_table(slide, name, table, ZOrder::Back)
    }

    /// Move the shape `name` to the top of its slide's drawing order.
    pub fn bring_to_foreground(&mut self, slide: usize, name: &str) -> Result<usize> {
        let target = self.require(slide, name)?;
        let position = self.document.bring_to_front(slide, target.position)?;
        log::debug!("Slide {}: '{}' moved to front", slide, name);
        self.after_edit(slide)?;
        Ok(position)
    }

    /// Draw the customer logo over the shape `name`.
    pub fn add_logo(&mut self, slide: usize, name: &str, logo: &Path) -> Result<usize> {
        self.replace_with_image(slide, name, logo, ImageOptions::overlay())
    }

    /// Write the customer name into the shape `name`.
    pub fn add_customer_name(&mut self, slide: usize, name: &str) -> Result<()> {
        let customer = self.customer.name.clone();
        self.replace_with_text(slide, name, &customer)
    }

    /// Replace the shape `name` with a chart image previously exported into
    /// the work directory.
    pub fn add_chart_from_file(
        &mut self,
        slide: usize,
        name: &str,
        chart_file: &str,
        z_order: ZOrder,
    ) -> Result<usize> {
        let path = self.work_dir.join(chart_file);
        let options = ImageOptions {
            remove_placeholder: true,
            z_order,
        };
        self.replace_with_image(slide, name, &path, options)
    }

    /// Replace the shape `name` with cells of a worksheet: the given range,
    /// or the sheet's used range.
    #[allow(clippy::too_many_arguments)]
    pub fn add_table_from_excel(
        &mut self,
        slide: usize,
        name: &str,
        workbook: &Path,
        sheet: &SheetRef,
        range: Option<&CellRange>,
        options: &ReadOptions,
        z_order: ZOrder,
    ) -> Result<usize> {
        let table = with_workbook(workbook, |wb| match range {
            Some(cells) => wb.read_range(sheet, cells, options),
            None => wb.used_range(sheet, options),
        })?;
        self.replace_with_table(slide, name, &table, z_order)
    }

    /// Export every chart of a sheet into the work directory.
    pub fn export_plots_from_excel(
        &self,
        bridge: &mut dyn DesktopBridge,
        workbook: &Path,
        sheet: &SheetRef,
    ) -> Result<Vec<PathBuf>> {
        let files = bridge.export_charts(workbook, sheet, &self.work_dir)?;
        log::info!(
            "Exported {} charts of sheet {} from {}",
            files.len(),
            sheet,
            workbook.display()
        );
        Ok(files)
    }

    /// Copy a live chart from a workbook and paste it in place of the shape
    /// `name`, behind all other shapes.
    pub fn paste_chart(
        &mut self,
        bridge: &mut dyn DesktopBridge,
        slide: usize,
        name: &str,
        workbook: &Path,
        sheet: &SheetRef,
        chart: &str,
    ) -> Result<usize> {
        let target = self.require(slide, name)?;
        let geometry = self.geometry(&target)?;
        let data = bridge.copy_chart(workbook, sheet, chart)?;

        self.document.remove_shape(slide, target.position)?;
        let position = self.document.add_picture_bytes(
            slide,
            data,
            ImageFormat::Png,
            chart,
            geometry,
            ZOrder::Back,
        )?;

        log::info!("Slide {}: pasted chart '{}' at '{}'", slide, chart, name);
        self.after_edit(slide)?;
        Ok(position)
    }

    /// Write the presentation to the customer's output path.
    pub fn save(&mut self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.customer.target_dir)?;
        let path = self.customer.output_path();
        self.document.save_to(&path)?;
        log::debug!("Saved {}", path.display());
        Ok(path)
    }

    /// Write the presentation a final time and end the session.
    pub fn finish(mut self) -> Result<PathBuf> {
        let path = self.save()?;
        log::info!("Report written to {}", path.display());
        Ok(path)
    }
}
