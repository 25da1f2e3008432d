//! Static catalog of decal styles.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A named pair of eye decals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecalStyle {
    pub id: String,
    pub display_name: String,
    /// Image drawn over the eye on the left of the photo.
    pub left_image: String,
    /// Image drawn over the eye on the right of the photo.
    pub right_image: String,
}

impl DecalStyle {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        left_image: impl Into<String>,
        right_image: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            left_image: left_image.into(),
            right_image: right_image.into(),
        }
    }

    /// Style following the `eyes/<id>-left.png` / `eyes/<id>-right.png` layout.
    fn bundled(id: &str, display_name: &str) -> Self {
        Self::new(
            id,
            display_name,
            format!("eyes/{}-left.png", id),
            format!("eyes/{}-right.png", id),
        )
    }
}

/// Resolve a decal reference against the asset root. Absolute references
/// are used as given.
pub fn resolve_reference(root: &Path, reference: &str) -> PathBuf {
    let path = Path::new(reference);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Ordered, read-only list of decal styles with unique ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DecalStyle>", into = "Vec<DecalStyle>")]
pub struct DecalCatalog {
    styles: Vec<DecalStyle>,
}

impl DecalCatalog {
    pub fn new(styles: Vec<DecalStyle>) -> Result<Self> {
        if styles.is_empty() {
            return Err(Error::Catalog("catalog has no styles".into()));
        }

        let mut seen = HashSet::new();
        for style in &styles {
            if style.id.trim().is_empty() {
                return Err(Error::Catalog("style with empty id".into()));
            }
            if !seen.insert(style.id.as_str()) {
                return Err(Error::Catalog(format!("duplicate style id {:?}", style.id)));
            }
            if style.left_image.trim().is_empty() || style.right_image.trim().is_empty() {
                return Err(Error::Catalog(format!(
                    "style {:?} is missing an image reference",
                    style.id
                )));
            }
        }

        Ok(Self { styles })
    }

    /// The styles shipped with the application.
    pub fn builtin() -> Self {
        Self {
            styles: vec![
                DecalStyle::bundled("googly", "Googly Eyes"),
                DecalStyle::bundled("anime", "Anime Eyes"),
                DecalStyle::bundled("cartoon", "Cartoon Eyes"),
                DecalStyle::bundled("rick", "Rick and Morty"),
                DecalStyle::bundled("simpsons", "Simpsons Eyes"),
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let styles: Vec<DecalStyle> = serde_json::from_str(json)?;
        Self::new(styles)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn get(&self, id: &str) -> Result<&DecalStyle> {
        self.styles
            .iter()
            .find(|style| style.id == id)
            .ok_or_else(|| Error::UnknownStyle(id.to_string()))
    }

    /// First style in catalog order; used when no style is chosen.
    pub fn default_style(&self) -> &DecalStyle {
        &self.styles[0]
    }

    pub fn styles(&self) -> &[DecalStyle] {
        &self.styles
    }
}

impl TryFrom<Vec<DecalStyle>> for DecalCatalog {
    type Error = Error;

    fn try_from(styles: Vec<DecalStyle>) -> Result<Self> {
        Self::new(styles)
    }
}

impl From<DecalCatalog> for Vec<DecalStyle> {
    fn from(catalog: DecalCatalog) -> Self {
        catalog.styles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_five_styles() {
        let catalog = DecalCatalog::builtin();
        let ids: Vec<_> = catalog.styles().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["googly", "anime", "cartoon", "rick", "simpsons"]);
        assert_eq!(catalog.default_style().id, "googly");

        let rick = catalog.get("rick").unwrap();
        assert_eq!(rick.display_name, "Rick and Morty");
        assert_eq!(rick.left_image, "eyes/rick-left.png");
        assert_eq!(rick.right_image, "eyes/rick-right.png");
    }

    #[test]
    fn builtin_catalog_passes_validation() {
        let styles: Vec<DecalStyle> = DecalCatalog::builtin().into();
        assert!(DecalCatalog::new(styles).is_ok());
    }

    #[test]
    fn unknown_style_is_an_error() {
        assert!(matches!(
            DecalCatalog::builtin().get("laser"),
            Err(Error::UnknownStyle(id)) if id == "laser"
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let styles = vec![
            DecalStyle::new("a", "A", "a-l.png", "a-r.png"),
            DecalStyle::new("a", "A again", "b-l.png", "b-r.png"),
        ];
        assert!(matches!(DecalCatalog::new(styles), Err(Error::Catalog(_))));
    }

    #[test]
    fn missing_reference_is_rejected() {
        let styles = vec![DecalStyle::new("a", "A", "a-l.png", " ")];
        assert!(matches!(DecalCatalog::new(styles), Err(Error::Catalog(_))));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(DecalCatalog::new(vec![]), Err(Error::Catalog(_))));
    }

    #[test]
    fn catalog_from_json() {
        let json = r#"[
            {"id": "laser", "display_name": "Laser Eyes",
             "left_image": "laser/l.png", "right_image": "/opt/decals/laser-r.png"}
        ]"#;
        let catalog = DecalCatalog::from_json(json).unwrap();
        let laser = catalog.get("laser").unwrap();
        assert_eq!(laser.display_name, "Laser Eyes");

        let root = Path::new("/srv/assets");
        assert_eq!(
            resolve_reference(root, &laser.left_image),
            PathBuf::from("/srv/assets/laser/l.png")
        );
        assert_eq!(
            resolve_reference(root, &laser.right_image),
            PathBuf::from("/opt/decals/laser-r.png")
        );
    }
}
