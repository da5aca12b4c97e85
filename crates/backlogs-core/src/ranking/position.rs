//! Position engine: NULLS-LAST ordering, detach and insert-after.
//!
//! Positions are sparse integers; only their relative order matters. Stories
//! without a position sort after every positioned story, ordered by id. The
//! same rule is available as an in-memory comparator ([`RankKey`]) and as SQL
//! ([`ORDER_CLAUSE`], [`rank_fragment`]).

use std::{cmp::Ordering, collections::BTreeMap};

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use super::query::Fragment;
use crate::error::{BacklogError, Result};

/// Backing-store equivalent of [`RankKey`]'s ordering.
pub const ORDER_CLAUSE: &str = "CASE WHEN stories.position IS NULL THEN 1 ELSE 0 END ASC, \
     stories.position ASC, stories.id ASC";

/// Sort key of a story: position first, id as the tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankKey {
    pub id: u64,
    pub position: Option<i64>,
}

impl RankKey {
    pub fn new(id: u64, position: Option<i64>) -> Self {
        Self { id, position }
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.position, other.position) {
            (Some(a), Some(b)) => a.cmp(&b).then(self.id.cmp(&other.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.id.cmp(&other.id),
        }
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// 1-based rank of `key` among `scope`: the number of keys ordered at or
/// before it. `key` is counted even when absent from `scope`.
pub fn rank_of(key: RankKey, scope: impl IntoIterator<Item = RankKey>) -> u64 {
    let before = scope
        .into_iter()
        .filter(|other| other.id != key.id && *other < key)
        .count() as u64;
    before + 1
}

/// Filter matching every story ordered at or before `key`.
pub fn rank_fragment(key: RankKey) -> Fragment {
    match key.position {
        Some(position) => Fragment::new(
            "stories.position IS NOT NULL AND (stories.position < ? OR \
             (stories.position = ? AND stories.id <= ?))",
            vec![
                Value::Integer(position),
                Value::Integer(position),
                Value::Integer(key.id as i64),
            ],
        ),
        None => Fragment::new(
            "stories.position IS NOT NULL OR stories.id <= ?",
            vec![Value::Integer(key.id as i64)],
        ),
    }
}

/// Primitive position operations over one story set.
///
/// Implementations must apply all calls made during a single
/// [`PositionIndex::insert_after`] atomically.
pub trait PositionStore {
    /// `None` when the story does not exist; `Some(None)` when it exists
    /// without a position.
    fn position_of(&mut self, id: u64) -> Result<Option<Option<i64>>>;

    /// Smallest and largest assigned positions, if any.
    fn position_bounds(&mut self) -> Result<Option<(i64, i64)>>;

    /// Adds `delta` to every position `>= from`.
    fn shift_from(&mut self, from: i64, delta: i64) -> Result<()>;

    fn set_position(&mut self, id: u64, position: Option<i64>) -> Result<()>;
}

/// Where [`PositionIndex::insert_after`] put a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// No predecessor, or the predecessor does not exist
    Top { position: i64 },
    /// The predecessor has no position
    Bottom { position: i64 },
    /// Directly behind a positioned predecessor
    After { predecessor: u64, position: i64 },
}

impl Placement {
    pub fn position(&self) -> i64 {
        match *self {
            Placement::Top { position }
            | Placement::Bottom { position }
            | Placement::After { position, .. } => position,
        }
    }
}

/// Stateless operations keeping a [`PositionStore`] free of collisions.
pub struct PositionIndex;

impl PositionIndex {
    /// Removes a story from the ordered sequence, closing the gap it leaves.
    pub fn detach<S: PositionStore>(store: &mut S, id: u64) -> Result<()> {
        let current = store
            .position_of(id)?
            .ok_or(BacklogError::StoryNotFound { id })?;

        if let Some(position) = current {
            store.set_position(id, None)?;
            store.shift_from(position + 1, -1)?;
        }
        Ok(())
    }

    /// Detaches `id` and re-inserts it directly after `predecessor`.
    ///
    /// No predecessor, or one that does not resolve, moves the story to the
    /// top. A predecessor without a position moves it to the bottom. A story
    /// named as its own predecessor is detached first and so lands at the
    /// bottom.
    pub fn insert_after<S: PositionStore>(
        store: &mut S,
        id: u64,
        predecessor: Option<u64>,
    ) -> Result<Placement> {
        Self::detach(store, id)?;

        let placement = match predecessor {
            None => Placement::Top {
                position: Self::top_position(store)?,
            },
            Some(prev) => match store.position_of(prev)? {
                None => {
                    log::debug!("Predecessor {prev} of story {id} not found, moving to top");
                    Placement::Top {
                        position: Self::top_position(store)?,
                    }
                }
                Some(None) => {
                    log::warn!(
                        "Predecessor {prev} of story {id} has no position, moving to bottom"
                    );
                    let position = store
                        .position_bounds()?
                        .map_or(1, |(_, max)| max + 1);
                    Placement::Bottom { position }
                }
                Some(Some(position)) => Placement::After {
                    predecessor: prev,
                    position: position + 1,
                },
            },
        };

        let position = placement.position();
        if !matches!(placement, Placement::Bottom { .. }) {
            store.shift_from(position, 1)?;
        }
        store.set_position(id, Some(position))?;

        log::debug!("Placed story {id}: {placement:?}");
        Ok(placement)
    }

    fn top_position<S: PositionStore>(store: &mut S) -> Result<i64> {
        Ok(store
            .position_bounds()?
            .map_or(1, |(min, _)| min.min(1)))
    }
}

/// In-memory position store for one story set.
#[derive(Debug, Clone, Default)]
pub struct MemoryPositions {
    positions: BTreeMap<u64, Option<i64>>,
}

impl MemoryPositions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a story.
    pub fn insert(&mut self, id: u64, position: Option<i64>) {
        self.positions.insert(id, position);
    }

    pub fn get(&self, id: u64) -> Option<Option<i64>> {
        self.positions.get(&id).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = RankKey> + '_ {
        self.positions
            .iter()
            .map(|(id, position)| RankKey::new(*id, *position))
    }

    /// Story ids in rank order.
    pub fn ordered(&self) -> Vec<u64> {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort();
        keys.into_iter().map(|key| key.id).collect()
    }

    pub fn rank_of(&self, id: u64) -> Option<u64> {
        let position = self.get(id)?;
        Some(rank_of(RankKey::new(id, position), self.keys()))
    }
}

impl PositionStore for MemoryPositions {
    fn position_of(&mut self, id: u64) -> Result<Option<Option<i64>>> {
        Ok(self.get(id))
    }

    fn position_bounds(&mut self) -> Result<Option<(i64, i64)>> {
        let mut assigned = self.positions.values().flatten().copied();
        let Some(first) = assigned.next() else {
            return Ok(None);
        };
        Ok(Some(assigned.fold((first, first), |(min, max), p| {
            (min.min(p), max.max(p))
        })))
    }

    fn shift_from(&mut self, from: i64, delta: i64) -> Result<()> {
        for position in self.positions.values_mut().flatten() {
            if *position >= from {
                *position += delta;
            }
        }
        Ok(())
    }

    fn set_position(&mut self, id: u64, position: Option<i64>) -> Result<()> {
        match self.positions.get_mut(&id) {
            Some(slot) => {
                *slot = position;
                Ok(())
            }
            None => Err(BacklogError::StoryNotFound { id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entries: &[(u64, Option<i64>)]) -> MemoryPositions {
        let mut store = MemoryPositions::new();
        for (id, position) in entries {
            store.insert(*id, *position);
        }
        store
    }

    fn assert_no_duplicates(store: &MemoryPositions) {
        let mut seen: Vec<i64> = store.positions.values().flatten().copied().collect();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total, "duplicate positions in {store:?}");
    }

    #[test]
    fn test_nulls_last_ordering() {
        let store = store(&[(10, None), (11, Some(2)), (12, Some(1))]);
        assert_eq!(store.ordered(), vec![12, 11, 10]);
        assert_eq!(store.rank_of(12), Some(1));
        assert_eq!(store.rank_of(11), Some(2));
        assert_eq!(store.rank_of(10), Some(3));
    }

    #[test]
    fn test_unpositioned_rank_after_positioned_regardless_of_id() {
        let store = store(&[(1, None), (500, Some(40)), (900, Some(3))]);
        assert_eq!(store.rank_of(1), Some(3));
        assert_eq!(store.ordered(), vec![900, 500, 1]);
    }

    #[test]
    fn test_duplicate_positions_break_ties_by_id() {
        let store = store(&[(8, Some(3)), (4, Some(3)), (6, Some(1))]);
        assert_eq!(store.ordered(), vec![6, 4, 8]);
        assert_eq!(store.rank_of(4), Some(2));
        assert_eq!(store.rank_of(8), Some(3));
    }

    #[test]
    fn test_rank_of_unknown_story() {
        assert_eq!(store(&[(1, Some(1))]).rank_of(2), None);
    }

    #[test]
    fn test_detach_closes_gap() {
        let mut store = store(&[(1, Some(1)), (2, Some(2)), (3, Some(3))]);
        PositionIndex::detach(&mut store, 2).unwrap();
        assert_eq!(store.get(2), Some(None));
        assert_eq!(store.get(3), Some(Some(2)));
        assert_eq!(store.ordered(), vec![1, 3, 2]);
    }

    #[test]
    fn test_detach_missing_story() {
        let mut store = store(&[(1, Some(1))]);
        let err = PositionIndex::detach(&mut store, 9).unwrap_err();
        assert!(matches!(err, BacklogError::StoryNotFound { id: 9 }));
    }

    #[test]
    fn test_insert_after_none_moves_to_top() {
        let mut store = store(&[(1, Some(1)), (2, Some(2)), (3, Some(3))]);
        let placement = PositionIndex::insert_after(&mut store, 3, None).unwrap();
        assert_eq!(placement, Placement::Top { position: 1 });
        assert_eq!(store.ordered(), vec![3, 1, 2]);
        assert_eq!(store.rank_of(3), Some(1));
        assert_no_duplicates(&store);
    }

    #[test]
    fn test_insert_after_none_beats_low_positions() {
        let mut store = store(&[(1, Some(-4)), (2, Some(0)), (3, None)]);
        PositionIndex::insert_after(&mut store, 3, None).unwrap();
        assert_eq!(store.rank_of(3), Some(1));
        assert_eq!(store.ordered(), vec![3, 1, 2]);
        assert_no_duplicates(&store);
    }

    #[test]
    fn test_insert_after_predecessor() {
        let mut store = store(&[(1, Some(1)), (2, Some(2)), (3, Some(3)), (4, None)]);
        let placement = PositionIndex::insert_after(&mut store, 4, Some(1)).unwrap();
        assert_eq!(
            placement,
            Placement::After {
                predecessor: 1,
                position: 2
            }
        );
        assert_eq!(store.ordered(), vec![1, 4, 2, 3]);
        assert_no_duplicates(&store);
    }

    #[test]
    fn test_insert_after_moving_down() {
        let mut store = store(&[(1, Some(1)), (2, Some(2)), (3, Some(3))]);
        PositionIndex::insert_after(&mut store, 1, Some(3)).unwrap();
        assert_eq!(store.ordered(), vec![2, 3, 1]);
        assert_no_duplicates(&store);
    }

    #[test]
    fn test_insert_after_is_idempotent() {
        let mut store = store(&[(1, Some(1)), (2, Some(2)), (3, Some(3)), (4, Some(4))]);
        PositionIndex::insert_after(&mut store, 4, Some(2)).unwrap();
        let first = store.ordered();
        let snapshot = store.positions.clone();
        PositionIndex::insert_after(&mut store, 4, Some(2)).unwrap();
        assert_eq!(store.ordered(), first);
        assert_eq!(store.positions, snapshot);
        assert_no_duplicates(&store);
    }

    #[test]
    fn test_unpositioned_predecessor_moves_to_bottom() {
        let mut store = store(&[(1, Some(1)), (2, Some(5)), (3, None), (4, Some(2))]);
        let placement = PositionIndex::insert_after(&mut store, 4, Some(3)).unwrap();
        assert_eq!(placement, Placement::Bottom { position: 5 });
        // 2 slid from 5 to 4 when 4 was detached
        assert_eq!(store.ordered(), vec![1, 2, 4, 3]);
        assert_no_duplicates(&store);
    }

    #[test]
    fn test_missing_predecessor_moves_to_top() {
        let mut store = store(&[(1, Some(1)), (2, Some(2))]);
        let placement = PositionIndex::insert_after(&mut store, 2, Some(99)).unwrap();
        assert_eq!(placement, Placement::Top { position: 1 });
        assert_eq!(store.ordered(), vec![2, 1]);
    }

    #[test]
    fn test_self_predecessor_never_moves_before_itself() {
        let mut store = store(&[(1, Some(1)), (2, Some(2)), (3, Some(3))]);
        let placement = PositionIndex::insert_after(&mut store, 2, Some(2)).unwrap();
        assert!(matches!(placement, Placement::Bottom { .. }));
        assert_eq!(store.ordered(), vec![1, 3, 2]);
        assert_no_duplicates(&store);
    }

    #[test]
    fn test_insert_into_empty_set() {
        let mut store = store(&[(1, None)]);
        let placement = PositionIndex::insert_after(&mut store, 1, None).unwrap();
        assert_eq!(placement.position(), 1);
        assert_eq!(store.get(1), Some(Some(1)));
    }

    #[test]
    fn test_ranks_follow_positions() {
        let mut store = store(&[(1, None), (2, None), (3, None), (4, None)]);
        PositionIndex::insert_after(&mut store, 3, None).unwrap();
        PositionIndex::insert_after(&mut store, 1, Some(3)).unwrap();
        PositionIndex::insert_after(&mut store, 4, Some(3)).unwrap();
        assert_eq!(store.ordered(), vec![3, 4, 1, 2]);

        let keys: Vec<_> = store.keys().collect();
        for a in &keys {
            for b in &keys {
                if let (Some(pa), Some(pb)) = (a.position, b.position) {
                    if pa < pb {
                        assert!(rank_of(*a, keys.clone()) < rank_of(*b, keys.clone()));
                    }
                }
            }
        }
        assert_no_duplicates(&store);
    }

    #[test]
    fn test_rank_fragment_params() {
        let positioned = rank_fragment(RankKey::new(7, Some(3)));
        assert_eq!(positioned.params.len(), 3);
        let unpositioned = rank_fragment(RankKey::new(7, None));
        assert_eq!(unpositioned.params, vec![Value::Integer(7)]);
    }
}
