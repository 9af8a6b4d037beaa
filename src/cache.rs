use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use crate::error::SyntaxError;
use crate::expr::Expr;

pub const DEFAULT_THRESHOLD: usize = 1000;

/// Compiled expressions keyed by source text.
///
/// Growth is bounded bluntly: when a miss finds `threshold` entries already
/// resident, the whole map is dropped before the new entry goes in. There is
/// no LRU bookkeeping.
///
/// [`clear`](Self::clear) advances a generation counter. A compilation that
/// overlaps a clear is returned to its caller but never stored, so nothing
/// compiled against a superseded resolver set outlives the clear.
#[derive(Debug)]
pub struct ExprCache {
    entries: DashMap<String, Expr>,
    threshold: usize,
    generation: AtomicU64,
}

impl ExprCache {
    pub fn new(threshold: usize) -> Self {
        Self {
            entries: DashMap::new(),
            threshold: threshold.max(1),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the cached expression or compiles, stores and returns it.
    ///
    /// `compile` runs without holding any map lock; two threads missing on
    /// the same source may both compile it, and the first insert wins.
    /// A result whose compilation overlapped a [`clear`](Self::clear) is
    /// returned uncached.
    pub fn get_or_compile<F>(&self, source: &str, compile: F) -> Result<Expr, SyntaxError>
    where
        F: FnOnce(&str) -> Result<Expr, SyntaxError>,
    {
        if let Some(expr) = self.entries.get(source) {
            return Ok(expr.value().clone());
        }
        debug!("Expression cache miss: {:?}", source);
        let generation = self.generation.load(Ordering::SeqCst);
        let compiled = compile(source)?;
        if self.entries.len() >= self.threshold {
            debug!(
                "Expression cache reached {} entries, resetting",
                self.threshold
            );
            self.entries.clear();
        }
        // The shard lock held by `entry` orders this check against the
        // `entries.clear()` that follows a generation bump.
        let entry = self.entries.entry(source.to_string());
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Cache cleared while compiling {:?}, not storing", source);
            return Ok(compiled);
        }
        Ok(entry.or_insert(compiled).value().clone())
    }

    /// Drops every entry and invalidates compilations still in progress.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl Default for ExprCache {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
