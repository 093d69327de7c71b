//! Job files: the list of edits a report run applies, read from JSON.
//!
//! ```json
//! {
//!     "steps": [
//!         { "action": "logo", "slide": 0, "shape": "logo" },
//!         { "action": "customer_name", "slide": 0, "shape": "costumer" },
//!         { "action": "table", "slide": 2, "shape": "table", "workbook": "daten.xlsx",
//!           "sheet": "Übersicht", "range": "B2:D9", "header": true, "round_columns": [1, 2] },
//!         { "action": "chart_file", "slide": 3, "shape": "chart", "file": "Diagramm 1.png" }
//!     ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the job file.

use akl_core::{CellRange, Error, Result, RoundingSpec, ZOrder};
use akl_xlsx::{DesktopBridge, ReadOptions, SheetRef};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::session::{ImageOptions, ReportSession};

fn default_logo_shape() -> String {
    "logo".to_string()
}

fn default_customer_shape() -> String {
    "costumer".to_string()
}

/// One edit of a report run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Draw the logo over a shape. Without `image` the discovered logo is used.
    Logo {
        #[serde(default)]
        slide: usize,
        #[serde(default = "default_logo_shape")]
        shape: String,
        #[serde(default)]
        image: Option<PathBuf>,
    },
    /// Write the customer name into a shape.
    CustomerName {
        #[serde(default)]
        slide: usize,
        #[serde(default = "default_customer_shape")]
        shape: String,
    },
    /// Write fixed text into a shape.
    Text {
        slide: usize,
        shape: String,
        text: String,
    },
    /// Replace a shape with an image file.
    Image {
        slide: usize,
        shape: String,
        image: PathBuf,
        #[serde(default)]
        z_order: ZOrder,
    },
    /// Replace a shape with worksheet cells.
    Table {
        slide: usize,
        shape: String,
        workbook: PathBuf,
        #[serde(default)]
        sheet: SheetRef,
        /// A1 range such as `B2:D9`; the used range when absent.
        #[serde(default)]
        range: Option<String>,
        #[serde(default)]
        header: bool,
        #[serde(default)]
        round_columns: Vec<usize>,
        #[serde(default)]
        z_order: ZOrder,
    },
    /// Export all charts of a sheet into the work directory.
    ExportCharts {
        workbook: PathBuf,
        #[serde(default)]
        sheet: SheetRef,
    },
    /// Replace a shape with a chart image from the work directory.
    ChartFile {
        slide: usize,
        shape: String,
        file: String,
        #[serde(default)]
        z_order: ZOrder,
    },
    /// Copy a live chart and paste it in place of a shape.
    PasteChart {
        slide: usize,
        shape: String,
        workbook: PathBuf,
        #[serde(default)]
        sheet: SheetRef,
        chart: String,
    },
    /// Move a shape to the top of the drawing order.
    Foreground { slide: usize, shape: String },
}

/// An ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub steps: Vec<Step>,

    #[serde(skip)]
    base_dir: PathBuf,
}

impl Job {
    /// The run without a job file: logo and customer name on the title slide.
    pub fn title_slide() -> Self {
        Self {
            steps: vec![
                Step::Logo {
                    slide: 0,
                    shape: default_logo_shape(),
                    image: None,
                },
                Step::CustomerName {
                    slide: 0,
                    shape: default_customer_shape(),
                },
            ],
            base_dir: PathBuf::new(),
        }
    }

    /// Parse a job from JSON; relative paths resolve against `base_dir`.
    pub fn from_json(json: &str, base_dir: &Path) -> Result<Self> {
        let mut job: Job = serde_json::from_str(json)?;
        job.base_dir = base_dir.to_path_buf();
        Ok(job)
    }

    /// Read a job file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or(Path::new(""));
        let job = Self::from_json(&json, base_dir)?;
        log::debug!("Loaded {} steps from {}", job.steps.len(), path.display());
        Ok(job)
    }

    /// Whether some logo step relies on the discovered logo.
    pub fn needs_discovered_logo(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, Step::Logo { image: None, .. }))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Apply every step in order, stopping at the first failure.
    pub fn run(
        &self,
        session: &mut ReportSession,
        bridge: &mut dyn DesktopBridge,
        logo: Option<&Path>,
    ) -> Result<()> {
        for (n, step) in self.steps.iter().enumerate() {
            log::debug!("Step {}: {:?}", n + 1, step);
            self.run_step(step, session, bridge, logo)?;
        }
        Ok(())
    }

    fn run_step(
        &self,
        step: &Step,
        session: &mut ReportSession,
        bridge: &mut dyn DesktopBridge,
        logo: Option<&Path>,
    ) -> Result<()> {
        match step {
            Step::Logo { slide, shape, image } => {
                let image = match image {
                    Some(image) => self.resolve(image),
                    None => logo
                        .map(Path::to_path_buf)
                        .ok_or_else(|| Error::ConfigError("No logo image available".to_string()))?,
                };
                session.add_logo(*slide, shape, &image)?;
            }
            Step::CustomerName { slide, shape } => session.add_customer_name(*slide, shape)?,
            Step::Text { slide, shape, text } => session.replace_with_text(*slide, shape, text)?,
            Step::Image {
                slide,
                shape,
                image,
                z_order,
            } => {
                let options = ImageOptions {
                    remove_placeholder: true,
                    z_order: *z_order,
                };
                session.replace_with_image(*slide, shape, &self.resolve(image), options)?;
            }
            Step::Table {
                slide,
                shape,
                workbook,
                sheet,
                range,
                header,
                round_columns,
                z_order,
            } => {
                let cells = range.as_deref().map(CellRange::parse_a1).transpose()?;
                let options = ReadOptions {
                    first_row_as_header: *header,
                    rounding: RoundingSpec::columns(round_columns.iter().copied()),
                };
                session.add_table_from_excel(
                    *slide,
                    shape,
                    &self.resolve(workbook),
                    sheet,
                    cells.as_ref(),
                    &options,
                    *z_order,
                )?;
            }
            Step::ExportCharts { workbook, sheet } => {
                session.export_plots_from_excel(bridge, &self.resolve(workbook), sheet)?;
            }
            Step::ChartFile {
                slide,
                shape,
                file,
                z_order,
            } => {
                session.add_chart_from_file(*slide, shape, file, *z_order)?;
            }
            Step::PasteChart {
                slide,
                shape,
                workbook,
                sheet,
                chart,
            } => {
                session.paste_chart(bridge, *slide, shape, &self.resolve(workbook), sheet, chart)?;
            }
            Step::Foreground { slide, shape } => {
                session.bring_to_foreground(*slide, shape)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use akl_core::{CustomerContext, Geometry, SaveMode};
    use akl_pptx::fixture::{FixtureShape, PresentationFixture, TINY_PNG};
    use akl_xlsx::NoDesktopSession;

    #[test]
    fn test_parse_job() {
        let json = r#"{
            "steps": [
                { "action": "logo" },
                { "action": "customer_name", "slide": 1 },
                { "action": "table", "slide": 2, "shape": "t", "workbook": "d.xlsx",
                  "sheet": "Übersicht", "range": "B2:D9", "header": true, "round_columns": [1] },
                { "action": "chart_file", "slide": 3, "shape": "c", "file": "Diagramm 1.png", "z_order": "front" },
                { "action": "export_charts", "workbook": "/abs/d.xlsx", "sheet": 1 }
            ]
        }"#;
        let job = Job::from_json(json, Path::new("/jobs")).unwrap();

        assert_eq!(
            job.steps[0],
            Step::Logo {
                slide: 0,
                shape: "logo".into(),
                image: None
            }
        );
        assert_eq!(
            job.steps[1],
            Step::CustomerName {
                slide: 1,
                shape: "costumer".into()
            }
        );
        match &job.steps[2] {
            Step::Table {
                sheet,
                range,
                header,
                z_order,
                ..
            } => {
                assert_eq!(sheet, &SheetRef::Name("Übersicht".into()));
                assert_eq!(range.as_deref(), Some("B2:D9"));
                assert!(*header);
                assert_eq!(*z_order, ZOrder::Back);
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert!(matches!(
            job.steps[3],
            Step::ChartFile {
                z_order: ZOrder::Front,
                ..
            }
        ));
        assert!(matches!(
            &job.steps[4],
            Step::ExportCharts {
                sheet: SheetRef::Index(1),
                ..
            }
        ));

        assert_eq!(job.resolve(Path::new("d.xlsx")), PathBuf::from("/jobs/d.xlsx"));
        assert_eq!(job.resolve(Path::new("/abs/d.xlsx")), PathBuf::from("/abs/d.xlsx"));
    }

    #[test]
    fn test_needs_discovered_logo() {
        assert!(Job::title_slide().needs_discovered_logo());

        let job = Job::from_json(
            r#"{"steps":[{"action":"logo","image":"firma.png"},{"action":"customer_name"}]}"#,
            Path::new("."),
        )
        .unwrap();
        assert!(!job.needs_discovered_logo());
        assert!(!Job::default().needs_discovered_logo());
    }

    #[test]
    fn test_unknown_action() {
        let err = Job::from_json(r#"{"steps":[{"action":"explode"}]}"#, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::JsonError(_)));
    }

    fn session(dir: &Path) -> ReportSession {
        let template = dir.join("template.pptx");
        let bytes = PresentationFixture::new()
            .slide(vec![
                FixtureShape::text("logo", "", Geometry::new(10, 10, 100, 100)),
                FixtureShape::text("costumer", "Kundenname", Geometry::new(0, 200, 900, 100)),
            ])
            .build();
        std::fs::write(&template, bytes).unwrap();

        ReportSession::open(SessionConfig {
            template,
            work_dir: dir.join("work"),
            customer: CustomerContext::today("Muster AG", dir.join("out")),
            save_mode: SaveMode::OnFinish,
        })
        .unwrap()
    }

    #[test]
    fn test_title_slide_run() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("logo.png");
        std::fs::write(&logo, TINY_PNG).unwrap();

        let mut session = session(dir.path());
        Job::title_slide()
            .run(&mut session, &mut NoDesktopSession, Some(&logo))
            .unwrap();

        let shapes = session.document().slide(0).unwrap().shapes().unwrap();
        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes[1].text, "Muster AG");
        assert_eq!(shapes[2].geometry, Some(Geometry::new(10, 10, 100, 100)));
    }

    #[test]
    fn test_logo_step_without_logo() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());

        let err = Job::title_slide()
            .run(&mut session, &mut NoDesktopSession, None)
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
