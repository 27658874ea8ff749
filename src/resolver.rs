use crate::error::{PlaybackError, Result};
use crate::types::Track;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;

/// Turns a search query or URL into track metadata
///
/// Implementations usually perform a network lookup; failures are reported
/// as `PlaybackError::ResolutionFailure`.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolve a query or URL into a single track
    async fn resolve(&self, query: &str) -> Result<Track>;

    /// Search for up to `limit` tracks
    ///
    /// Results may lack a stream locator; pass them through
    /// [`ensure_playable`] before playback.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![self.resolve(query).await?])
    }
}

/// Resolver decorator that bounds every lookup with a timeout
pub struct TimedResolver<R> {
    inner: R,
    limit: Duration,
}

impl<R: MetadataResolver> TimedResolver<R> {
    pub fn new(inner: R, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: MetadataResolver> MetadataResolver for TimedResolver<R> {
    async fn resolve(&self, query: &str) -> Result<Track> {
        match timeout(self.limit, self.inner.resolve(query)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Resolving '{}' timed out after {:?}", query, self.limit);
                Err(PlaybackError::resolution(
                    query,
                    format!("timed out after {:?}", self.limit),
                ))
            }
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        match timeout(self.limit, self.inner.search(query, limit)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Searching '{}' timed out after {:?}", query, self.limit);
                Err(PlaybackError::resolution(
                    query,
                    format!("timed out after {:?}", self.limit),
                ))
            }
        }
    }
}

/// Make sure `track` carries a stream locator, resolving it again if not
///
/// The track's page URL is looked up; the resolved track replaces the
/// partial one.
pub async fn ensure_playable(resolver: &dyn MetadataResolver, track: Track) -> Result<Track> {
    if track.is_playable() {
        return Ok(track);
    }

    tracing::debug!("Resolving stream for '{}'", track.title());
    let resolved = resolver.resolve(track.webpage_url()).await?;
    if !resolved.is_playable() {
        return Err(PlaybackError::resolution(
            track.webpage_url(),
            "resolver returned no stream locator",
        ));
    }
    Ok(resolved)
}
