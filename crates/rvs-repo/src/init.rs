use std::fs;
use std::path::Path;

use crate::{RepoError, RVS_DIR_NAME};

/// Default branch HEAD points at after init.
pub const DEFAULT_BRANCH: &str = "main";

/// Create the skeleton of a fresh repository under `<path>/.rvs/`: the
/// object store, the branch namespace, a symbolic HEAD on the unborn
/// default branch, and a config stub. No commit is created.
pub fn init(path: &Path) -> Result<(), RepoError> {
    let rvs_dir = path.join(RVS_DIR_NAME);
    if rvs_dir.join("HEAD").exists() {
        // Re-running init in an existing repository is harmless.
        return Ok(());
    }

    fs::create_dir_all(rvs_dir.join("objects"))?;
    fs::create_dir_all(rvs_dir.join("refs").join("heads"))?;
    fs::write(
        rvs_dir.join("HEAD"),
        format!("ref: refs/heads/{DEFAULT_BRANCH}\n"),
    )?;
    fs::write(
        rvs_dir.join("config"),
        "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n",
    )?;
    Ok(())
}
