//! CLI tool for generating the AKL data analysis presentation of a customer.

use akl_core::{CustomerContext, SaveMode, ShapeIndex};
use akl_pptx::PptxDocument;
use akl_report::{
    default_template_dir, find_logo, template_path, Job, ReportSession, SessionConfig,
};
use akl_xlsx::NoDesktopSession;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Fill the "Datenanalyse AKL" template with a customer's logo, name,
/// tables and charts.
#[derive(Parser, Debug)]
#[command(name = "akl-report")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Customer name, used on the title slide and in the output file name
    #[arg(short, long, required_unless_present = "inspect")]
    customer: Option<String>,

    /// Directory containing the template (default: ../template)
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Template file (overrides --template-dir)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Directory searched for the customer logo (default: current directory)
    #[arg(short, long)]
    images_dir: Option<PathBuf>,

    /// Directory for elements.json and exported charts (default: the template's directory)
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Output directory (default: current directory)
    #[arg(short = 'o', long)]
    target_dir: Option<PathBuf>,

    /// JSON job file listing the edits (default: logo and customer name)
    #[arg(short, long)]
    job: Option<PathBuf>,

    /// When to write the presentation: "each" edit or at the "end"
    #[arg(short, long, default_value = "each")]
    save_mode: SaveMode,

    /// Date in the output file name (default: today)
    #[arg(short, long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Print the shape index of the template as JSON and exit
    #[arg(long)]
    inspect: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let template = resolve_template(&args, &cwd);

    if args.inspect {
        return inspect(&template);
    }

    let Some(customer) = args.customer.clone() else {
        anyhow::bail!("--customer is required");
    };

    let target_dir = args.target_dir.clone().unwrap_or_else(|| cwd.clone());
    let customer = match args.date {
        Some(date) => CustomerContext::with_date(customer, target_dir, date),
        None => CustomerContext::today(customer, target_dir),
    };

    let job = match &args.job {
        Some(path) => {
            Job::load(path).with_context(|| format!("Failed to load job {}", path.display()))?
        }
        None => Job::title_slide(),
    };

    let logo = discover_logo(&args, &job, &cwd)?;

    let config = SessionConfig {
        template: template.clone(),
        work_dir: args.work_dir.clone().unwrap_or_else(|| {
            template.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.clone())
        }),
        customer,
        save_mode: args.save_mode,
    };
    let mut session = ReportSession::open(config)
        .with_context(|| format!("Failed to open template {}", template.display()))?;

    if args.verbose {
        eprintln!(
            "Processing {} ({} steps)",
            template.display(),
            job.steps.len()
        );
    }

    job.run(&mut session, &mut NoDesktopSession, logo.as_deref())
        .context("Failed to fill the template")?;

    let output = session.finish().context("Failed to save the presentation")?;
    if args.verbose {
        eprintln!("Written to: {}", output.display());
    }

    Ok(())
}

/// Template given on the command line, or the standard file name inside the
/// template directory.
fn resolve_template(args: &Args, cwd: &Path) -> PathBuf {
    if let Some(template) = &args.template {
        return template.clone();
    }
    let dir = args
        .template_dir
        .clone()
        .unwrap_or_else(|| default_template_dir(cwd));
    template_path(&dir)
}

/// Search the images directory for a logo, but only when a logo step has
/// no image of its own.
fn discover_logo(args: &Args, job: &Job, cwd: &Path) -> Result<Option<PathBuf>> {
    if !job.needs_discovered_logo() {
        return Ok(None);
    }
    let images_dir = args.images_dir.clone().unwrap_or_else(|| cwd.to_path_buf());
    find_logo(&images_dir)
        .with_context(|| format!("Failed to search {} for a logo", images_dir.display()))
}

/// Print the shape index of a presentation without modifying anything.
fn inspect(template: &Path) -> Result<()> {
    let document = PptxDocument::open(template)
        .with_context(|| format!("Failed to open {}", template.display()))?;
    let index = ShapeIndex::build(&document.all_shape_names()?);
    println!("{}", index.to_json_pretty()?);
    Ok(())
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "akl-report",
            "--customer",
            "Muster GmbH",
            "--save-mode",
            "end",
            "--date",
            "2024-03-01",
        ])
        .unwrap();
        assert_eq!(args.customer.as_deref(), Some("Muster GmbH"));
        assert_eq!(args.save_mode, SaveMode::OnFinish);
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_customer_required_unless_inspect() {
        assert!(Args::try_parse_from(["akl-report"]).is_err());
        assert!(Args::try_parse_from(["akl-report", "--inspect"]).is_ok());
        assert!(Args::try_parse_from(["akl-report", "-c", "X", "--date", "01.03.2024"]).is_err());
    }

    #[test]
    fn test_logo_search_only_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let args = Args::try_parse_from([
            "akl-report",
            "-c",
            "X",
            "--images-dir",
            images.to_str().unwrap(),
        ])
        .unwrap();

        // The images directory does not exist yet.
        let job = Job::from_json(
            r#"{"steps":[{"action":"logo","image":"firma.png"}]}"#,
            dir.path(),
        )
        .unwrap();
        assert_eq!(discover_logo(&args, &job, dir.path()).unwrap(), None);
        assert!(discover_logo(&args, &Job::title_slide(), dir.path()).is_err());

        std::fs::create_dir(&images).unwrap();
        std::fs::write(images.join("logo.png"), b"x").unwrap();
        assert_eq!(
            discover_logo(&args, &Job::title_slide(), dir.path()).unwrap(),
            Some(images.join("logo.png"))
        );
    }

    #[test]
    fn test_resolve_template() {
        let cwd = Path::new("/work/reports/run");
        let args = Args::try_parse_from(["akl-report", "--inspect"]).unwrap();
        assert_eq!(
            resolve_template(&args, cwd),
            PathBuf::from("/work/reports/template/202x-xx-xx_Datenanalyse_AKL_Kundenname.pptx")
        );

        let args =
            Args::try_parse_from(["akl-report", "--inspect", "--template", "/t/x.pptx"]).unwrap();
        assert_eq!(resolve_template(&args, cwd), PathBuf::from("/t/x.pptx"));
    }
}
