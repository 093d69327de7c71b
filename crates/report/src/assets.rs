//! Locating the template and the customer's logo on disk.

use akl_core::pattern::like_to_regex;
use akl_core::Result;
use std::path::{Path, PathBuf};

/// File name of the presentation template.
pub const TEMPLATE_FILE_NAME: &str = "202x-xx-xx_Datenanalyse_AKL_Kundenname.pptx";

/// `LIKE` pattern a logo file stem has to match.
pub const LOGO_PATTERN: &str = "%ogo%";

/// Template directory next to the working directory: `<cwd>/../template`.
pub fn default_template_dir(cwd: &Path) -> PathBuf {
    cwd.parent().unwrap_or(cwd).join("template")
}

/// Path of the template inside `template_dir`.
pub fn template_path(template_dir: &Path) -> PathBuf {
    template_dir.join(TEMPLATE_FILE_NAME)
}

/// First `.png` in `images_dir` (by file name) whose stem matches
/// [`LOGO_PATTERN`].
pub fn find_logo(images_dir: &Path) -> Result<Option<PathBuf>> {
    let pattern = like_to_regex(LOGO_PATTERN)?;

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(images_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("png"))
        .collect();
    candidates.sort();

    let logo = candidates.into_iter().find(|path| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| pattern.is_match(stem))
    });

    match &logo {
        Some(path) => log::info!("Using logo {}", path.display()),
        None => log::warn!("No logo found in {}", images_dir.display()),
    }
    Ok(logo)
}
