//! Get-or-compute cache of burndown curves keyed by (story, sprint).

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use super::series::Burndown;
use crate::error::Result;

/// Identifies one burndown computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BurndownKey {
    pub story_id: u64,
    pub sprint_id: u64,
}

impl BurndownKey {
    pub fn new(story_id: u64, sprint_id: u64) -> Self {
        Self {
            story_id,
            sprint_id,
        }
    }
}

/// How a [`MemoryBurndownCache`] makes room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Nothing is stored; every lookup computes.
    Disabled,
    /// Keeps at most `capacity` entries, dropping the least recently used.
    LeastRecentlyUsed { capacity: usize },
}

impl EvictionPolicy {
    /// A capacity of zero disables caching.
    pub fn with_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            Self::Disabled
        } else {
            Self::LeastRecentlyUsed { capacity }
        }
    }
}

/// Cache of computed burndowns.
pub trait BurndownCache: Send + Sync {
    /// Returns the cached value for `key` or stores the result of `compute`.
    /// Failed computations are not stored.
    fn get_or_compute(
        &self,
        key: BurndownKey,
        compute: &mut dyn FnMut() -> Result<Burndown>,
    ) -> Result<Burndown>;

    /// Drops every entry of a story.
    fn invalidate_story(&self, story_id: u64);
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<BurndownKey, Burndown>,
    recency: VecDeque<BurndownKey>,
    /// Bumped on every invalidation of a story
    generations: HashMap<u64, u64>,
}

impl CacheState {
    fn generation(&self, story_id: u64) -> u64 {
        self.generations.get(&story_id).copied().unwrap_or(0)
    }

    fn touch(&mut self, key: BurndownKey) {
        self.recency.retain(|k| *k != key);
        self.recency.push_back(key);
    }
}

/// In-process cache guarded by a mutex. Computation runs outside the lock,
/// so distinct keys compute in parallel.
#[derive(Debug)]
pub struct MemoryBurndownCache {
    policy: EvictionPolicy,
    state: Mutex<CacheState>,
}

impl MemoryBurndownCache {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &BurndownKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BurndownCache for MemoryBurndownCache {
    fn get_or_compute(
        &self,
        key: BurndownKey,
        compute: &mut dyn FnMut() -> Result<Burndown>,
    ) -> Result<Burndown> {
        let EvictionPolicy::LeastRecentlyUsed { capacity } = self.policy else {
            return compute();
        };

        let generation = {
            let mut state = self.lock();
            if let Some(hit) = state.entries.get(&key).cloned() {
                state.touch(key);
                return Ok(hit);
            }
            state.generation(key.story_id)
        };

        let value = compute()?;

        let mut state = self.lock();
        if state.generation(key.story_id) != generation {
            log::debug!(
                "Story {} changed while its burndown was computed; not caching",
                key.story_id
            );
            return Ok(value);
        }
        state.entries.insert(key, value.clone());
        state.touch(key);
        while state.entries.len() > capacity {
            let Some(oldest) = state.recency.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            log::info!(
                "Evicted burndown of story {} in sprint {}",
                oldest.story_id,
                oldest.sprint_id
            );
        }
        Ok(value)
    }

    fn invalidate_story(&self, story_id: u64) {
        let mut state = self.lock();
        state.entries.retain(|key, _| key.story_id != story_id);
        state.recency.retain(|key| key.story_id != story_id);
        *state.generations.entry(story_id).or_insert(0) += 1;
    }
}
