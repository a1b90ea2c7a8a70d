use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use runtime_contract::{FUNCTION_DIR, Language};
use sandbox::Mount;
use tempfile::TempDir;

use crate::error::{EngineError, Result};

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// Host directory holding one invocation's code. Removed on drop.
pub(crate) struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Create a fresh directory under `parent` (or the system temp dir) and
    /// write `code` as the language's handler file.
    ///
    /// Modes are widened so a non-root user inside the sandbox can read the
    /// code regardless of the host umask.
    pub(crate) async fn create(parent: Option<&Path>, language: Language, code: &str) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("fnrun-stage-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| EngineError::Staging(format!("create staging directory: {e}")))?;

        set_mode(dir.path(), DIR_MODE).await?;
        let file = dir.path().join(language.handler_file());
        tokio::fs::write(&file, code)
            .await
            .map_err(|e| EngineError::Staging(format!("write {}: {e}", file.display())))?;
        set_mode(&file, FILE_MODE).await?;

        Ok(Self { dir })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Read-write bind of the staging directory at the function mount point.
    pub(crate) fn mount(&self) -> Mount {
        Mount {
            host_path: self.dir.path().to_path_buf(),
            guest_path: FUNCTION_DIR.to_string(),
            read_only: false,
        }
    }
}

async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| EngineError::Staging(format!("chmod {}: {e}", path.display())))
}
