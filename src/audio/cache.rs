use super::prescan::{analyze, AudioAnalysis};
use crate::error::Result;
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory analysis cache keyed by audio content.
///
/// Loading a new asset computes a fresh analysis; analysing the same samples
/// again returns the shared result. Renders never write to the cache, so a
/// cancelled render cannot leave it in a partial state.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: Mutex<HashMap<String, Arc<AudioAnalysis>>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// SHA-256 of the sample bytes and the sample rate, hex encoded.
    pub fn content_key(samples: &[f32], sample_rate: f32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(sample_rate.to_le_bytes());
        for sample in samples {
            hasher.update(sample.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn analyze(&self, samples: &[f32], sample_rate: f32) -> Result<Arc<AudioAnalysis>> {
        let key = Self::content_key(samples, sample_rate);

        if let Some(hit) = self.lock().get(&key) {
            debug!("Analysis cache hit for {}", &key[..12]);
            return Ok(Arc::clone(hit));
        }

        // Analyse without holding the lock; a concurrent miss on the same key
        // computes an identical result.
        let analysis = Arc::new(analyze(samples, sample_rate)?);
        info!("Cached analysis {}", &key[..12]);
        self.lock().insert(key, Arc::clone(&analysis));
        Ok(analysis)
    }

    pub fn get(&self, key: &str) -> Option<Arc<AudioAnalysis>> {
        self.lock().get(key).cloned()
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AudioAnalysis>>> {
        // Entries are immutable Arcs, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_audio_hits_cache() {
        let cache = AnalysisCache::new();
        let samples = vec![0.0f32; 4096];
        let first = cache.analyze(&samples, 22050.0).unwrap();
        let second = cache.analyze(&samples, 22050.0).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_depends_on_content_and_rate() {
        let a = AnalysisCache::content_key(&[0.0, 0.1], 44100.0);
        let b = AnalysisCache::content_key(&[0.0, 0.2], 44100.0);
        let c = AnalysisCache::content_key(&[0.0, 0.1], 48000.0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_failed_analysis_is_not_cached() {
        let cache = AnalysisCache::new();
        assert!(cache.analyze(&[], 44100.0).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let cache = AnalysisCache::new();
        let samples = vec![0.0f32; 1024];
        cache.analyze(&samples, 8000.0).unwrap();
        let key = AnalysisCache::content_key(&samples, 8000.0);
        assert!(cache.get(&key).is_some());
        assert!(cache.invalidate(&key));
        assert!(cache.get(&key).is_none());
    }
}
