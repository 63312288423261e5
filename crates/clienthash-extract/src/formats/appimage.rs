use std::process::Command;

use clienthash_dl::download::Download;
use clienthash_utils::fs::make_executable;
use tracing::debug;

use super::{
    common::{digest_if_present, run_detached, scratch_dir},
    ExtractStage,
};
use crate::error::Result;

const IMAGE_FILE_NAME: &str = "appimage_file";

/// Downloads an AppImage, has it unpack itself and digests `member` from the unpacked tree.
///
/// The image runs with its scratch directory as working directory, so it unpacks into
/// `<scratch>/<extract_dir>`. A failed unpack is not an error on its own: the member is
/// simply reported absent if it never appears.
pub fn digest_appimage_member(
    url: &str,
    member: &str,
    extract_dir: &str,
    on_stage: &dyn Fn(ExtractStage),
) -> Result<Option<String>> {
    let scratch = scratch_dir("appimage")?;
    let image = scratch.path().join(IMAGE_FILE_NAME);

    on_stage(ExtractStage::Downloading);
    Download::new(url).to_file(&image)?;
    make_executable(&image)?;

    on_stage(ExtractStage::Extracting);
    let program = image.display().to_string();
    let status = run_detached(
        Command::new(&image)
            .arg("--appimage-extract")
            .current_dir(scratch.path()),
        &program,
    )?;
    debug!(url, code = ?status.code(), "appimage extraction finished");

    digest_if_present(&scratch.path().join(extract_dir).join(member))
}
