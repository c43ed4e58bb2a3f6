//! # Display-Name Sources
//!
//! A property's failure messages carry a human-readable display name.
//! The source is declared per property: a literal string, a catalog
//! lookup key, or — when neither is declared or the key is missing —
//! the raw property name.

use serde::{Deserialize, Serialize};

use crate::catalog::MessageCatalog;

/// Where a property's display name comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DisplaySource {
    /// A fixed display string.
    Literal(String),
    /// A message-catalog key resolved at validation time.
    CatalogKey(String),
}

impl DisplaySource {
    /// Resolve the display name for a property.
    ///
    /// A catalog miss is non-fatal: it is logged and the raw property
    /// name is used instead.
    pub fn resolve(&self, property: &str, catalog: &dyn MessageCatalog) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::CatalogKey(key) => match catalog.resolve(key) {
                Some(text) => text,
                None => {
                    tracing::warn!(
                        key = %key,
                        property = %property,
                        "display-name key missing from catalog, using property name"
                    );
                    property.to_string()
                }
            },
        }
    }
}

/// Resolve an optional display source, falling back to the property name.
pub fn resolve_display(
    source: Option<&DisplaySource>,
    property: &str,
    catalog: &dyn MessageCatalog,
) -> String {
    match source {
        Some(src) => src.resolve(property, catalog),
        None => property.to_string(),
    }
}
