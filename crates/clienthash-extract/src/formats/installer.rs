use std::process::Command;

use clienthash_dl::download::Download;
use tracing::debug;

use super::{
    common::{digest_if_present, run_detached, scratch_dir},
    ExtractStage,
};
use crate::error::Result;

const ARCHIVE_FILE_NAME: &str = "installer.exe";
const OUTPUT_DIR_NAME: &str = "extracted";

/// Downloads a self-extracting installer and pulls `member` out of it with `tool`.
///
/// The tool is invoked as `<tool> -j <archive> <member> -d <dir>`; `-j` drops the
/// member's directories, so the result is looked up by its final path component.
pub fn digest_installer_member(
    url: &str,
    member: &str,
    tool: &str,
    on_stage: &dyn Fn(ExtractStage),
) -> Result<Option<String>> {
    let scratch = scratch_dir("installer")?;
    let archive = scratch.path().join(ARCHIVE_FILE_NAME);
    let output = scratch.path().join(OUTPUT_DIR_NAME);

    on_stage(ExtractStage::Downloading);
    Download::new(url).to_file(&archive)?;

    on_stage(ExtractStage::Extracting);
    let status = run_detached(
        Command::new(tool)
            .arg("-j")
            .arg(&archive)
            .arg(member)
            .arg("-d")
            .arg(&output),
        tool,
    )?;
    debug!(url, tool, code = ?status.code(), "installer extraction finished");

    digest_if_present(&output.join(flattened_name(member)))
}

/// The name a junk-paths extraction gives `member`.
fn flattened_name(member: &str) -> &str {
    member.rsplit('/').next().unwrap_or(member)
}
