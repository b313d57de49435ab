//! Page operations backed by command-line tools
//!
//! Uses `pdftk` for page extraction and concatenation and `pdfcrop` (from
//! TeX Live) for cropping. Both must be installed; their locations can be
//! overridden for non-standard installs.

use super::PageOperations;
use crate::error::{Result, SliceError};
use crate::geometry::BoundingBox;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Shells out to `pdftk` and `pdfcrop`
#[derive(Debug, Clone)]
pub struct ExternalTools {
    pdftk: PathBuf,
    pdfcrop: PathBuf,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            pdftk: PathBuf::from("pdftk"),
            pdfcrop: PathBuf::from("pdfcrop"),
        }
    }
}

impl ExternalTools {
    /// Use `pdftk` and `pdfcrop` from `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `pdftk` executable
    pub fn with_pdftk<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.pdftk = program.into();
        self
    }

    /// Set the `pdfcrop` executable
    pub fn with_pdfcrop<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.pdfcrop = program.into();
        self
    }

    fn extract_page_command(
        &self,
        source: &Path,
        page_index: u32,
        output: &Path,
    ) -> Result<Command> {
        // pdftk numbers pages from 1; the last u32 index has no page number,
        // and no document can hold more pages than that
        let page_number = page_index
            .checked_add(1)
            .ok_or(SliceError::PageOutOfRange {
                page: page_index,
                page_count: u32::MAX,
            })?;

        let mut cmd = Command::new(&self.pdftk);
        cmd.arg(source)
            .arg("cat")
            .arg(page_number.to_string())
            .arg("output")
            .arg(output);
        Ok(cmd)
    }

    fn crop_command(&self, source: &Path, region: &BoundingBox, output: &Path) -> Command {
        let mut cmd = Command::new(&self.pdfcrop);
        cmd.arg("--bbox")
            .arg(format!(
                "{} {} {} {}",
                region.x0, region.y0, region.x1, region.y1
            ))
            .arg(source)
            .arg(output);
        cmd
    }

    fn concatenate_command(&self, inputs: &[PathBuf], output: &Path) -> Command {
        let mut cmd = Command::new(&self.pdftk);
        cmd.args(inputs).arg("cat").arg("output").arg(output);
        cmd
    }
}

/// Run a tool to completion and check that it produced `output`.
fn run(tool: &Path, mut cmd: Command, output: &Path) -> Result<()> {
    let label = tool.display().to_string();
    debug!("Running {:?}", cmd);

    let result = cmd
        .output()
        .map_err(|e| SliceError::tool(&label, format!("failed to execute: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(SliceError::tool(
            &label,
            format!("{} ({})", result.status, stderr.trim()),
        ));
    }

    if !output.is_file() {
        return Err(SliceError::tool(
            &label,
            format!("expected output {} was not written", output.display()),
        ));
    }

    Ok(())
}

impl PageOperations for ExternalTools {
    fn extract_page(&self, source: &Path, page_index: u32, output: &Path) -> Result<()> {
        run(
            &self.pdftk,
            self.extract_page_command(source, page_index, output)?,
            output,
        )
    }

    fn crop(&self, source: &Path, region: &BoundingBox, output: &Path) -> Result<()> {
        run(
            &self.pdfcrop,
            self.crop_command(source, region, output),
            output,
        )
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        if inputs.is_empty() {
            return Err(SliceError::tool(
                self.pdftk.display().to_string(),
                "no documents to concatenate",
            ));
        }
        run(
            &self.pdftk,
            self.concatenate_command(inputs, output),
            output,
        )
    }

    fn name(&self) -> &str {
        "external"
    }
}
