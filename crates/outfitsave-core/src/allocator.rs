//! Share slug allocation.
//!
//! [`SlugAllocator::ensure_share_slug`] returns an outfit's public share slug,
//! generating and persisting one the first time it is asked for.
//!
//! The slug field moves `UNSET -> SET` exactly once. Every later call takes
//! the fast path and returns the stored value without writing.
//!
//! Uniqueness is checked twice per attempt: a lookup before writing, and the
//! store's own constraint on the write. A constraint violation on write is a
//! collision like any other and consumes one attempt. Generic store failures
//! are not retried.

use std::sync::Arc;

use outfitsave_telemetry::{NoopShareMetrics, ShareMetrics};
use tracing::{debug, info, warn};

use crate::error::{OutfitSaveError, Result};
use crate::outfit::OutfitId;
use crate::slug::{self, RandomSuffix, SuffixSource, DEFAULT_SUFFIX_LEN};
use crate::store::OutfitStore;

/// Default bound on candidates tried per allocation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Tuning for [`SlugAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorSettings {
    /// Candidates to try before failing with
    /// [`OutfitSaveError::SlugAllocationExhausted`]. Must be at least 1.
    pub max_attempts: u32,

    /// Length of the random base-36 suffix.
    pub suffix_len: usize,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            suffix_len: DEFAULT_SUFFIX_LEN,
        }
    }
}

/// Assigns unique share slugs to outfits.
pub struct SlugAllocator<S: OutfitStore + ?Sized> {
    store: Arc<S>,
    suffixes: Box<dyn SuffixSource>,
    metrics: Arc<dyn ShareMetrics>,
    settings: AllocatorSettings,
}

impl<S: OutfitStore + ?Sized> SlugAllocator<S> {
    /// Create an allocator over `store` with random suffixes and default settings.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            suffixes: Box::new(RandomSuffix),
            metrics: Arc::new(NoopShareMetrics),
            settings: AllocatorSettings::default(),
        }
    }

    /// Replace the suffix source
    pub fn with_suffix_source(mut self, suffixes: Box<dyn SuffixSource>) -> Self {
        self.suffixes = suffixes;
        self
    }

    /// Report allocation metrics into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<dyn ShareMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Override the settings. A zero attempt bound is raised to 1.
    pub fn with_settings(mut self, settings: AllocatorSettings) -> Self {
        self.settings = AllocatorSettings {
            max_attempts: settings.max_attempts.max(1),
            ..settings
        };
        self
    }

    pub fn settings(&self) -> AllocatorSettings {
        self.settings
    }

    /// The store this allocator writes to.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Return the share slug of `outfit_id`, assigning one if needed.
    ///
    /// # Errors
    ///
    /// - [`OutfitSaveError::NotFound`] if the outfit does not exist.
    /// - [`OutfitSaveError::SlugAllocationExhausted`] if every candidate
    ///   within the attempt bound was taken. Nothing is written.
    /// - Store errors are propagated unchanged.
    pub async fn ensure_share_slug(&self, outfit_id: &OutfitId) -> Result<String> {
        let outfit = self
            .store
            .get(outfit_id)
            .await?
            .ok_or_else(|| OutfitSaveError::not_found(outfit_id.as_str()))?;

        if let Some(existing) = outfit.existing_share_slug() {
            debug!(outfit = %outfit_id, slug = existing, "reusing existing share slug");
            self.metrics.record_existing();
            return Ok(existing.to_string());
        }

        let base = slug::base_token(&outfit.name);
        let max_attempts = self.settings.max_attempts;

        for attempt in 1..=max_attempts {
            let suffix = self.suffixes.next_suffix(self.settings.suffix_len);
            let candidate = slug::candidate(&base, &suffix);

            if self.store.find_by_share_slug(&candidate).await?.is_some() {
                debug!(
                    outfit = %outfit_id,
                    attempt,
                    candidate = %candidate,
                    "share slug candidate taken"
                );
                self.metrics.record_collision();
                continue;
            }

            match self.store.set_share_slug(outfit_id, &candidate).await {
                Ok(stored) if stored == candidate => {
                    info!(outfit = %outfit_id, attempt, slug = %stored, "assigned share slug");
                    self.metrics.record_allocated(attempt);
                    return Ok(stored);
                }
                Ok(stored) => {
                    debug!(
                        outfit = %outfit_id,
                        slug = %stored,
                        "share slug was assigned by a concurrent request"
                    );
                    self.metrics.record_existing();
                    return Ok(stored);
                }
                Err(err) if err.is_retryable_collision() => {
                    debug!(
                        outfit = %outfit_id,
                        attempt,
                        candidate = %candidate,
                        "share slug claimed concurrently"
                    );
                    self.metrics.record_collision();
                }
                Err(err) => return Err(err),
            }
        }

        warn!(
            outfit = %outfit_id,
            attempts = max_attempts,
            backend = self.store.backend_tag(),
            "share slug allocation exhausted"
        );
        self.metrics.record_exhausted();
        Err(OutfitSaveError::SlugAllocationExhausted {
            attempts: max_attempts,
        })
    }
}

/// Build the public share URL for `slug`.
///
/// `base_url` is the configured public origin (a trailing `/` is ignored),
/// `path_prefix` the route prefix, e.g. `/outfits/share`.
pub fn share_url(base_url: &str, path_prefix: &str, slug: &str) -> String {
    let origin = base_url.trim_end_matches('/');
    let prefix = path_prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}", origin, slug)
    } else {
        format!("{}/{}/{}", origin, prefix, slug)
    }
}
