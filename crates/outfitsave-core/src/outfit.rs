//! Outfit records.
//!
//! This module defines the outfit record held by the record store, its
//! clothing items, and the input used to create a new outfit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OutfitSaveError, Result};

/// Opaque outfit identifier, assigned by the store on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutfitId(String);

impl OutfitId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OutfitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OutfitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for OutfitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single clothing item tagged on an outfit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutfitItem {
    /// Item name (e.g., "linen shirt")
    pub name: String,

    /// Category such as "top", "shoes", "accessory"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Brand, if tagged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

/// A stored outfit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    /// Store-assigned identifier
    pub id: OutfitId,

    /// Id of the owning user, as issued by the identity provider
    pub owner_id: String,

    /// Free-text display name; not unique
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Location of the uploaded photo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Whether the outfit shows up in the public feed
    pub is_public: bool,

    #[serde(default)]
    pub items: Vec<OutfitItem>,

    /// Public share slug, assigned once on the first share request
    #[serde(default)]
    pub share_slug: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Outfit {
    /// Build a stored outfit from creation input
    pub fn from_new(id: OutfitId, new: NewOutfit) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            name: new.name,
            description: new.description,
            image_url: new.image_url,
            is_public: new.is_public,
            items: new.items,
            share_slug: None,
            created_at: Utc::now(),
        }
    }

    /// The assigned share slug, ignoring empty values
    pub fn existing_share_slug(&self) -> Option<&str> {
        self.share_slug.as_deref().filter(|s| !s.is_empty())
    }

    /// Check whether `user_id` owns this outfit
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Whether `viewer` may read this outfit
    pub fn is_visible_to(&self, viewer: Option<&str>) -> bool {
        self.is_public || viewer.is_some_and(|v| self.is_owned_by(v))
    }
}

/// Input for creating an outfit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutfit {
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_public: bool,
    pub items: Vec<OutfitItem>,
}

impl NewOutfit {
    /// Create a private outfit with no items
    pub fn new<S: Into<String>>(owner_id: S, name: S) -> Self {
        Self {
            owner_id: owner_id.into(),
            name: name.into(),
            description: None,
            image_url: None,
            is_public: false,
            items: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the image location
    pub fn with_image_url<S: Into<String>>(mut self, image_url: S) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Mark the outfit public
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Attach an item
    pub fn with_item(mut self, item: OutfitItem) -> Self {
        self.items.push(item);
        self
    }

    /// Reject blank names and owners.
    pub fn validate(&self) -> Result<()> {
        if self.owner_id.trim().is_empty() {
            return Err(OutfitSaveError::InvalidInput(
                "owner id must not be empty".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(OutfitSaveError::InvalidInput(
                "outfit name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_share_slug_ignores_empty() {
        let mut outfit = Outfit::from_new(OutfitId::generate(), NewOutfit::new("u1", "Look"));
        assert_eq!(outfit.existing_share_slug(), None);

        outfit.share_slug = Some(String::new());
        assert_eq!(outfit.existing_share_slug(), None);

        outfit.share_slug = Some("look-a1b2c3".to_string());
        assert_eq!(outfit.existing_share_slug(), Some("look-a1b2c3"));
    }

    #[test]
    fn test_visibility() {
        let private = Outfit::from_new(OutfitId::generate(), NewOutfit::new("u1", "Look"));
        assert!(private.is_visible_to(Some("u1")));
        assert!(!private.is_visible_to(Some("u2")));
        assert!(!private.is_visible_to(None));

        let public = Outfit::from_new(OutfitId::generate(), NewOutfit::new("u1", "Look").public());
        assert!(public.is_visible_to(None));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert!(NewOutfit::new("u1", "   ").validate().is_err());
        assert!(NewOutfit::new("", "Look").validate().is_err());
        assert!(NewOutfit::new("u1", "Look").validate().is_ok());
    }

    #[test]
    fn test_outfit_serializes_camel_case() {
        let outfit = Outfit::from_new(
            OutfitId::from("o-1"),
            NewOutfit::new("u1", "Look")
                .with_image_url("/uploads/look.jpg")
                .with_item(OutfitItem {
                    name: "linen shirt".to_string(),
                    category: Some("top".to_string()),
                    brand: None,
                }),
        );
        let json = serde_json::to_value(&outfit).unwrap();
        assert_eq!(json["id"], "o-1");
        assert_eq!(json["ownerId"], "u1");
        assert_eq!(json["imageUrl"], "/uploads/look.jpg");
        assert_eq!(json["isPublic"], false);
        assert!(json["shareSlug"].is_null());
        assert_eq!(json["items"][0]["category"], "top");
    }
}
