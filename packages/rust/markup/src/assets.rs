//! Graphic reference rewriting (source extension and location to the
//! published one).

use url::Url;

use manualkit_shared::RenderConfig;

/// Rewrites `graphic` hrefs to where the converted images are published.
#[derive(Debug, Clone)]
pub struct AssetRewriter {
    base: String,
    source_ext: String,
    target_ext: String,
}

impl AssetRewriter {
    pub fn new(
        base: impl Into<String>,
        source_ext: impl Into<String>,
        target_ext: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into(),
            source_ext: source_ext.into().trim_start_matches('.').to_string(),
            target_ext: target_ext.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            config.image_base.as_str(),
            config.image_source_ext.as_str(),
            config.image_target_ext.as_str(),
        )
    }

    /// Swap the extension, then place the file under the base.
    pub fn rewrite(&self, href: &str) -> String {
        let file = self.swap_extension(href.trim());

        if let Ok(base) = Url::parse(&self.base) {
            let base = if base.path().ends_with('/') {
                base
            } else {
                // `join` replaces the last segment unless the base is a directory.
                let mut dir = base.clone();
                dir.set_path(&format!("{}/", base.path()));
                dir
            };
            if let Ok(joined) = base.join(&file) {
                return joined.to_string();
            }
        }

        if self.base.is_empty() || self.base.ends_with('/') {
            format!("{}{file}", self.base)
        } else {
            format!("{}/{file}", self.base)
        }
    }

    fn swap_extension(&self, href: &str) -> String {
        if self.source_ext.is_empty() {
            return href.to_string();
        }
        let suffix = format!(".{}", self.source_ext);
        let split = href.len().saturating_sub(suffix.len());
        match (href.get(..split), href.get(split..)) {
            (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(&suffix) => {
                format!("{stem}.{}", self.target_ext)
            }
            _ => href.to_string(),
        }
    }
}

impl Default for AssetRewriter {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}
