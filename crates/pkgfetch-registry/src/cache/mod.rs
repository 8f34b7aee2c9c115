//! In-memory package document cache
//!
//! `view` queries for the same package inside one freshness window share a
//! single registry request. A zero TTL turns the cache off.

use std::time::{Duration, Instant};
use dashmap::DashMap;
use crate::api::Packument;

/// Freshness window used when configuration does not pick one
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct Fetched {
    packument: Packument,
    at: Instant,
}

/// Package documents keyed by package name
#[derive(Debug)]
pub struct MetadataCache {
    entries: DashMap<String, Fetched>,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Document for `package_name` if it was fetched within the TTL
    pub fn get(&self, package_name: &str) -> Option<Packument> {
        let entry = self.entries.get(package_name)?;
        if entry.at.elapsed() < self.ttl {
            return Some(entry.packument.clone());
        }

        // Release the read guard before removing
        drop(entry);
        self.entries.remove(package_name);
        None
    }

    pub fn insert(&self, package_name: String, packument: Packument) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(package_name, Fetched { packument, at: Instant::now() });
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}
