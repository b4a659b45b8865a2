//! Record store abstraction and the in-memory implementation.
//!
//! The store owns outfit records and enforces the share slug uniqueness
//! constraint. The allocator only ever talks to it through [`OutfitStore`],
//! so a relational backend can be swapped in without touching slug logic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{OutfitSaveError, Result};
use crate::outfit::{NewOutfit, Outfit, OutfitId};

/// Persistence for outfit records.
#[async_trait]
pub trait OutfitStore: Send + Sync {
    /// Short backend name used in logs.
    fn backend_tag(&self) -> &'static str;

    /// Insert a new outfit, assigning its id and creation time.
    async fn create(&self, new: NewOutfit) -> Result<Outfit>;

    /// Look up an outfit by id.
    async fn get(&self, id: &OutfitId) -> Result<Option<Outfit>>;

    /// Look up the outfit holding exactly `slug`.
    async fn find_by_share_slug(&self, slug: &str) -> Result<Option<Outfit>>;

    /// Assign `slug` to the outfit `id` unless it already has one.
    ///
    /// Returns the slug the outfit holds afterwards: `slug` when the write
    /// happened, or the previously stored slug when another request got
    /// there first.
    ///
    /// Fails with [`OutfitSaveError::NotFound`] for an unknown id and with
    /// [`OutfitSaveError::SlugConflict`] when a different outfit already
    /// holds `slug`.
    async fn set_share_slug(&self, id: &OutfitId, slug: &str) -> Result<String>;
}

#[derive(Default)]
struct Tables {
    outfits: HashMap<OutfitId, Outfit>,
    slug_index: HashMap<String, OutfitId>,
}

/// Process-local store used by the daemon and tests.
///
/// Both tables live behind a single lock so the slug uniqueness check and
/// the write happen atomically, like a unique index would.
#[derive(Default)]
pub struct InMemoryOutfitStore {
    tables: RwLock<Tables>,
    slug_writes: AtomicU64,
}

impl InMemoryOutfitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful share slug writes since creation.
    pub fn slug_writes(&self) -> u64 {
        self.slug_writes.load(Ordering::Relaxed)
    }

    /// Number of stored outfits.
    pub async fn len(&self) -> usize {
        self.tables.read().await.outfits.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OutfitStore for InMemoryOutfitStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, new: NewOutfit) -> Result<Outfit> {
        new.validate()?;
        let outfit = Outfit::from_new(OutfitId::generate(), new);
        let mut tables = self.tables.write().await;
        tables.outfits.insert(outfit.id.clone(), outfit.clone());
        Ok(outfit)
    }

    async fn get(&self, id: &OutfitId) -> Result<Option<Outfit>> {
        Ok(self.tables.read().await.outfits.get(id).cloned())
    }

    async fn find_by_share_slug(&self, slug: &str) -> Result<Option<Outfit>> {
        let tables = self.tables.read().await;
        Ok(tables
            .slug_index
            .get(slug)
            .and_then(|id| tables.outfits.get(id))
            .cloned())
    }

    async fn set_share_slug(&self, id: &OutfitId, slug: &str) -> Result<String> {
        let mut tables = self.tables.write().await;

        if let Some(holder) = tables.slug_index.get(slug) {
            if holder != id {
                return Err(OutfitSaveError::SlugConflict(slug.to_string()));
            }
            return Ok(slug.to_string());
        }

        let Tables {
            outfits,
            slug_index,
        } = &mut *tables;
        let outfit = outfits
            .get_mut(id)
            .ok_or_else(|| OutfitSaveError::not_found(id.as_str()))?;

        // Slugs are immutable once assigned.
        if let Some(existing) = outfit.existing_share_slug() {
            return Ok(existing.to_string());
        }

        outfit.share_slug = Some(slug.to_string());
        slug_index.insert(slug.to_string(), id.clone());
        self.slug_writes.fetch_add(1, Ordering::Relaxed);
        Ok(slug.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get() {
        let store = InMemoryOutfitStore::new();
        let outfit = store.create(NewOutfit::new("u1", "Look")).await.unwrap();

        let fetched = store.get(&outfit.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Look");
        assert_eq!(fetched.share_slug, None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let store = InMemoryOutfitStore::new();
        let err = store.create(NewOutfit::new("u1", " ")).await.unwrap_err();
        assert!(matches!(err, OutfitSaveError::InvalidInput(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let store = InMemoryOutfitStore::new();
        assert!(store.get(&OutfitId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_and_find_by_slug() {
        let store = InMemoryOutfitStore::new();
        let outfit = store.create(NewOutfit::new("u1", "Look")).await.unwrap();

        store.set_share_slug(&outfit.id, "look-abc123").await.unwrap();

        let found = store.find_by_share_slug("look-abc123").await.unwrap().unwrap();
        assert_eq!(found.id, outfit.id);
        assert_eq!(found.share_slug.as_deref(), Some("look-abc123"));
        assert!(store.find_by_share_slug("look-zzz999").await.unwrap().is_none());
        assert_eq!(store.slug_writes(), 1);
    }

    #[tokio::test]
    async fn slug_uniqueness_is_enforced() {
        let store = InMemoryOutfitStore::new();
        let a = store.create(NewOutfit::new("u1", "A")).await.unwrap();
        let b = store.create(NewOutfit::new("u2", "B")).await.unwrap();

        store.set_share_slug(&a.id, "same-000000").await.unwrap();
        let err = store.set_share_slug(&b.id, "same-000000").await.unwrap_err();

        assert!(matches!(err, OutfitSaveError::SlugConflict(ref s) if s == "same-000000"));
        assert!(store.get(&b.id).await.unwrap().unwrap().share_slug.is_none());
        assert_eq!(store.slug_writes(), 1);
    }

    #[tokio::test]
    async fn rewriting_own_slug_is_noop() {
        let store = InMemoryOutfitStore::new();
        let a = store.create(NewOutfit::new("u1", "A")).await.unwrap();

        store.set_share_slug(&a.id, "a-111111").await.unwrap();
        let stored = store.set_share_slug(&a.id, "a-111111").await.unwrap();
        assert_eq!(stored, "a-111111");
        assert_eq!(store.slug_writes(), 1);
    }

    #[tokio::test]
    async fn assigned_slug_is_never_replaced() {
        let store = InMemoryOutfitStore::new();
        let a = store.create(NewOutfit::new("u1", "A")).await.unwrap();

        store.set_share_slug(&a.id, "a-111111").await.unwrap();
        let stored = store.set_share_slug(&a.id, "a-222222").await.unwrap();

        assert_eq!(stored, "a-111111");
        assert!(store.find_by_share_slug("a-222222").await.unwrap().is_none());
        assert_eq!(
            store.get(&a.id).await.unwrap().unwrap().share_slug.as_deref(),
            Some("a-111111")
        );
        assert_eq!(store.slug_writes(), 1);
    }

    #[tokio::test]
    async fn set_on_unknown_id_is_not_found() {
        let store = InMemoryOutfitStore::new();
        let err = store
            .set_share_slug(&OutfitId::from("ghost"), "x-000000")
            .await
            .unwrap_err();
        assert!(matches!(err, OutfitSaveError::NotFound(_)));
        assert!(store.find_by_share_slug("x-000000").await.unwrap().is_none());
    }
}
