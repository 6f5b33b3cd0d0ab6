//! Asset catalog: confirmed state → pre-sized display asset
//!
//! The engine never touches assets. The caller resolves the confirmed state
//! here every frame.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::types::ExpressionTag;
use crate::{Result, StabilityError};

/// One display asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    pub path: PathBuf,
    /// Output width the asset is sized for
    pub width: u32,
    /// Output height the asset is sized for
    pub height: u32,
}

/// Tag → asset mapping covering every known tag
#[derive(Debug, Clone, Serialize)]
pub struct AssetCatalog {
    width: u32,
    height: u32,
    assets: BTreeMap<ExpressionTag, AssetRef>,
}

impl AssetCatalog {
    /// Map every tag to `<dir>/<tag>.<ext>`
    pub fn from_dir(dir: impl AsRef<Path>, tags: &[ExpressionTag], ext: &str, size: (u32, u32)) -> Self {
        let dir = dir.as_ref();
        let assets = tags
            .iter()
            .map(|tag| {
                let asset = AssetRef {
                    path: dir.join(format!("{}.{}", tag, ext)),
                    width: size.0,
                    height: size.1,
                };
                (tag.clone(), asset)
            })
            .collect();
        Self {
            width: size.0,
            height: size.1,
            assets,
        }
    }

    /// Every asset must exist on disk; the first missing one is reported
    pub fn verify(&self) -> Result<()> {
        for (tag, asset) in &self.assets {
            if !asset.path.is_file() {
                return Err(StabilityError::MissingAsset {
                    tag: tag.clone(),
                    path: asset.path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Asset for the given state
    pub fn lookup(&self, tag: &ExpressionTag) -> Option<&AssetRef> {
        self.assets.get(tag)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> Vec<ExpressionTag> {
        vec!["neutral".into(), "smile".into()]
    }

    #[test]
    fn test_paths_follow_tag_names() {
        let catalog = AssetCatalog::from_dir("images", &tags(), "png", (640, 480));
        let smile = catalog.lookup(&"smile".into()).unwrap();
        assert_eq!(smile.path, Path::new("images").join("smile.png"));
        assert_eq!((smile.width, smile.height), (640, 480));
        assert!(catalog.lookup(&"wink".into()).is_none());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_verify_reports_missing_asset() {
        let dir = std::env::temp_dir().join(format!("facestate_assets_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("neutral.png"), b"x").unwrap();

        let catalog = AssetCatalog::from_dir(&dir, &tags(), "png", (1, 1));
        match catalog.verify() {
            Err(StabilityError::MissingAsset { tag, .. }) => assert_eq!(tag.as_str(), "smile"),
            other => panic!("expected MissingAsset, got {:?}", other),
        }

        std::fs::write(dir.join("smile.png"), b"x").unwrap();
        assert!(catalog.verify().is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }
}
