use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Local cache of runnable sandbox images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn image_exists(&self, image: &str) -> Result<bool>;
    /// Build `context_dir` and tag the result as `image`.
    async fn build_image(&self, image: &str, context_dir: &Path) -> Result<()>;
}
