use std::collections::HashMap;
use std::sync::Arc;

use runtime_contract::Language;
use sandbox::ImageStore;
use tempfile::TempDir;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};

/// A runtime image known to exist locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub language: Language,
    pub image_name: String,
    /// Whether this process built the image, as opposed to finding it.
    pub built: bool,
}

/// Guarantees one ready image per supported language.
///
/// Each language has its own cell, so first use from many invocations at
/// once runs a single check-then-build; the others wait for it. A failed
/// build leaves the cell empty and the next call tries again.
pub struct ImageRegistry {
    store: Arc<dyn ImageStore>,
    cells: HashMap<Language, OnceCell<ImageRef>>,
}

impl ImageRegistry {
    pub fn new(store: Arc<dyn ImageStore>) -> Self {
        let cells = Language::ALL
            .into_iter()
            .map(|language| (language, OnceCell::new()))
            .collect();
        Self { store, cells }
    }

    pub async fn ensure_image(&self, language: Language) -> Result<ImageRef> {
        let cell = self
            .cells
            .get(&language)
            .ok_or_else(|| EngineError::UnsupportedLanguage(language.to_string()))?;
        cell.get_or_try_init(|| self.materialize(language))
            .await
            .cloned()
    }

    /// [`Self::ensure_image`] for a wire name.
    pub async fn ensure_named(&self, language: &str) -> Result<ImageRef> {
        let language = language.parse::<Language>()?;
        self.ensure_image(language).await
    }

    /// Ensure every supported language. Failures are logged per language
    /// and returned together.
    pub async fn ensure_all(&self) -> Result<Vec<ImageRef>> {
        let mut images = Vec::with_capacity(Language::ALL.len());
        let mut errors = Vec::new();
        for language in Language::ALL {
            match self.ensure_image(language).await {
                Ok(image) => images.push(image),
                Err(e) => {
                    warn!(language = %language, error = %e, "image unavailable");
                    errors.push(format!("{language}: {e}"));
                }
            }
        }
        if errors.is_empty() {
            Ok(images)
        } else {
            Err(EngineError::Image(errors.join("; ")))
        }
    }

    /// The cached reference, without checking or building.
    pub fn cached(&self, language: Language) -> Option<ImageRef> {
        self.cells.get(&language)?.get().cloned()
    }

    async fn materialize(&self, language: Language) -> Result<ImageRef> {
        let image_name = language.image_name();
        let exists = self
            .store
            .image_exists(&image_name)
            .await
            .map_err(|e| EngineError::Image(e.to_string()))?;
        if exists {
            debug!(language = %language, image = %image_name, "image present");
            return Ok(ImageRef {
                language,
                image_name,
                built: false,
            });
        }

        info!(language = %language, image = %image_name, "image missing, building");
        let context = write_build_context(language).await?;
        self.store
            .build_image(&image_name, context.path())
            .await
            .map_err(|e| EngineError::Image(e.to_string()))?;
        Ok(ImageRef {
            language,
            image_name,
            built: true,
        })
    }
}

/// Write the language's embedded build context into a temporary directory.
async fn write_build_context(language: Language) -> Result<TempDir> {
    let dir = tempfile::Builder::new()
        .prefix("fnrun-build-")
        .tempdir()
        .map_err(|e| EngineError::Image(format!("create build context: {e}")))?;
    for file in language.build_context() {
        let path = dir.path().join(file.path);
        tokio::fs::write(&path, file.contents)
            .await
            .map_err(|e| EngineError::Image(format!("write {}: {e}", path.display())))?;
    }
    Ok(dir)
}
