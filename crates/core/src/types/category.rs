//! Product categories offered to AI-generated listings.

use serde::{Deserialize, Serialize};

/// The fixed set of categories seeded into `sellor.product_category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Apparel,
    Accessories,
    #[serde(rename = "Home & Decor")]
    HomeDecor,
    Electronics,
    #[serde(rename = "Beauty & Health")]
    BeautyHealth,
    #[serde(rename = "Toys & Games")]
    ToysGames,
    Books,
    Other,
}

impl ProductCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 8] = [
        Self::Apparel,
        Self::Accessories,
        Self::HomeDecor,
        Self::Electronics,
        Self::BeautyHealth,
        Self::ToysGames,
        Self::Books,
        Self::Other,
    ];

    /// Display name, matching the seeded category row.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Apparel => "Apparel",
            Self::Accessories => "Accessories",
            Self::HomeDecor => "Home & Decor",
            Self::Electronics => "Electronics",
            Self::BeautyHealth => "Beauty & Health",
            Self::ToysGames => "Toys & Games",
            Self::Books => "Books",
            Self::Other => "Other",
        }
    }

    /// Short description stored with the seeded row.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Apparel => "Clothing and wearable items",
            Self::Accessories => "Jewelry, bags, and other accessories",
            Self::HomeDecor => "Items for home decoration and furnishing",
            Self::Electronics => "Electronic devices and gadgets",
            Self::BeautyHealth => "Beauty and health products",
            Self::ToysGames => "Toys, games, and entertainment items",
            Self::Books => "Books, magazines, and publications",
            Self::Other => "Miscellaneous items",
        }
    }

    /// Match free-form model output against the category list.
    ///
    /// Comparison ignores case and non-alphanumeric characters, so
    /// `home_decor` matches `Home & Decor`. Returns `None` when nothing matches.
    #[must_use]
    pub fn match_name(input: &str) -> Option<Self> {
        let wanted = fold(input);
        Self::ALL.into_iter().find(|c| fold(c.name()) == wanted)
    }

    /// Like [`Self::match_name`], falling back to [`Self::Other`].
    #[must_use]
    pub fn normalize(input: &str) -> Self {
        Self::match_name(input).unwrap_or(Self::Other)
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_exact_and_loose() {
        assert_eq!(
            ProductCategory::match_name("Home & Decor"),
            Some(ProductCategory::HomeDecor)
        );
        assert_eq!(
            ProductCategory::match_name("home_decor"),
            Some(ProductCategory::HomeDecor)
        );
        assert_eq!(
            ProductCategory::match_name("  ELECTRONICS "),
            Some(ProductCategory::Electronics)
        );
        assert_eq!(ProductCategory::match_name("Home and Decor"), None);
    }

    #[test]
    fn test_normalize_falls_back_to_other() {
        assert_eq!(ProductCategory::normalize("Gardening"), ProductCategory::Other);
        assert_eq!(ProductCategory::normalize(""), ProductCategory::Other);
        assert_eq!(ProductCategory::normalize("books"), ProductCategory::Books);
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&ProductCategory::ToysGames).unwrap_or_default();
        assert_eq!(json, "\"Toys & Games\"");
    }

    #[test]
    fn test_all_names_unique() {
        let mut names: Vec<_> = ProductCategory::ALL.iter().map(|c| c.name()).collect();
        names.dedup();
        assert_eq!(names.len(), 8);
    }
}
