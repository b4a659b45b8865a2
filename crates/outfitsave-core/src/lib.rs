//! Core types, errors, and share-slug allocation for outfitsave.
//!
//! This crate provides:
//!
//! - **Error types**: [`OutfitSaveError`] and [`Result`]
//! - **Outfit records**: [`Outfit`], [`OutfitItem`], [`NewOutfit`]
//! - **Record store**: the [`OutfitStore`] trait and [`InMemoryOutfitStore`]
//! - **Slug allocation**: [`SlugAllocator`], which gives each outfit a unique,
//!   URL-safe share slug on its first share request
//!
//! # Examples
//!
//! ## Sharing an outfit
//!
//! ```rust
//! use std::sync::Arc;
//! use outfitsave_core::{InMemoryOutfitStore, NewOutfit, OutfitStore, SlugAllocator};
//!
//! # tokio_test_runtime(async {
//! let store = Arc::new(InMemoryOutfitStore::new());
//! let outfit = store.create(NewOutfit::new("user-1", "Summer Beach Day!!")).await?;
//!
//! let allocator = SlugAllocator::new(store.clone());
//! let slug = allocator.ensure_share_slug(&outfit.id).await?;
//! assert!(slug.starts_with("summer-beach-day-"));
//!
//! // Second call returns the stored slug.
//! assert_eq!(allocator.ensure_share_slug(&outfit.id).await?, slug);
//! # Ok::<(), outfitsave_core::OutfitSaveError>(())
//! # }).unwrap();
//! # fn tokio_test_runtime<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Error handling
//!
//! ```rust
//! use outfitsave_core::{OutfitSaveError, Result};
//!
//! fn example_operation() -> Result<String> {
//!     Err(OutfitSaveError::not_found("outfit-42"))
//! }
//!
//! match example_operation() {
//!     Ok(val) => println!("Success: {}", val),
//!     Err(e) => assert!(e.is_client_error()),
//! }
//! ```

pub mod allocator;
pub mod error;
pub mod outfit;
pub mod slug;
pub mod store;

// Re-export commonly used types for convenience
pub use allocator::{share_url, AllocatorSettings, SlugAllocator, DEFAULT_MAX_ATTEMPTS};
pub use error::{OutfitSaveError, Result};
pub use outfit::{NewOutfit, Outfit, OutfitId, OutfitItem};
pub use slug::{RandomSuffix, SuffixSource};
pub use store::{InMemoryOutfitStore, OutfitStore};

/// Prelude module for convenient imports.
///
/// ```rust
/// use outfitsave_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::allocator::SlugAllocator;
    pub use crate::error::{OutfitSaveError, Result};
    pub use crate::outfit::{NewOutfit, Outfit, OutfitId};
    pub use crate::store::{InMemoryOutfitStore, OutfitStore};
}
