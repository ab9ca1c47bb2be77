use bollard::models::ContainerSummary;

use crate::docker::image::ImageReference;
use crate::registry::digest::Digest;
use crate::version::mode::VersioningMode;

/// A running container carrying a valid mode label, as seen by one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledContainer {
    pub id: String,
    pub name: String,
    pub image: ImageReference,
    /// Digest of the image the container currently runs
    pub image_digest: Digest,
    pub mode: VersioningMode,
}

impl LabeledContainer {
    /// Tag the container currently runs; inventory only yields tagged images
    pub fn current_tag(&self) -> &str {
        self.image.tag.as_deref().unwrap_or_default()
    }
}

/// Human readable name: the first engine name without its leading `/`,
/// or the start of the id for unnamed containers
pub fn container_name(summary: &ContainerSummary) -> String {
    summary
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|name| name.trim_start_matches('/').to_string())
        .unwrap_or_else(|| {
            let id = summary.id.as_deref().unwrap_or_default();
            id.chars().take(10).collect()
        })
}
