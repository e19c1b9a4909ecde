//! Race subsets and their enumeration.
//!
//! A [`RaceSubset`] is a non-empty selection of 1-based race indices stored as
//! a bitmask (bit `i` is race `i + 1`). The bitmask and the canonical text
//! encoding (`"1,3,4"`) are both bijective with the set, so either can serve
//! as a lookup key.

use std::{fmt, iter};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Largest supported race count. Keeps every mask below `1 << 63`.
pub const MAX_RACES: u32 = 63;

// ─── RaceSubset ──────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(into = "Vec<u32>", try_from = "Vec<u32>")]
pub struct RaceSubset(u64);

impl RaceSubset {
  /// Wrap a raw mask. Returns `None` for the empty mask or one that names a
  /// race above [`MAX_RACES`].
  pub fn from_mask(mask: u64) -> Option<Self> {
    (mask != 0 && mask < (1u64 << MAX_RACES)).then_some(Self(mask))
  }

  /// The subset holding only `race`.
  pub fn singleton(race: u32) -> Result<Self> {
    check_race(race, || race.to_string())?;
    Ok(Self(1u64 << (race - 1)))
  }

  /// Build a subset from caller-supplied indices in any order. Duplicates are
  /// collapsed; an empty list or an index outside `1..=MAX_RACES` is rejected.
  pub fn from_indices(indices: &[u32]) -> Result<Self> {
    let describe = || format!("{indices:?}");
    let mut mask = 0u64;
    for &race in indices {
      check_race(race, describe)?;
      mask |= 1u64 << (race - 1);
    }
    Self::from_mask(mask).ok_or_else(|| Error::InvalidSubset(describe()))
  }

  pub fn mask(self) -> u64 { self.0 }

  /// Number of races in the subset.
  pub fn len(self) -> u32 { self.0.count_ones() }

  /// Always false; a `RaceSubset` is never empty.
  pub fn is_empty(self) -> bool { self.0 == 0 }

  pub fn contains(self, race: u32) -> bool {
    (1..=MAX_RACES).contains(&race) && self.0 & (1u64 << (race - 1)) != 0
  }

  /// Highest race index in the subset.
  pub fn max_race(self) -> u32 { 64 - self.0.leading_zeros() }

  /// True when every race index is at most `races`.
  pub fn fits(self, races: u32) -> bool { self.max_race() <= races }

  /// The 1-based race indices, ascending.
  pub fn races(self) -> impl Iterator<Item = u32> {
    let mut rest = self.0;
    iter::from_fn(move || {
      if rest == 0 {
        return None;
      }
      let bit = rest.trailing_zeros();
      rest &= rest - 1;
      Some(bit + 1)
    })
  }

  /// This subset with `race` added.
  pub fn with(self, race: u32) -> Result<Self> {
    Ok(Self(self.0 | Self::singleton(race)?.0))
  }

  /// Canonical text form: ascending indices joined by commas.
  pub fn encode(self) -> String {
    self
      .races()
      .map(|r| r.to_string())
      .collect::<Vec<_>>()
      .join(",")
  }

  /// Inverse of [`RaceSubset::encode`]. Only the canonical form is accepted:
  /// strictly ascending, non-empty, every index in range.
  pub fn decode(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidSubset(s.to_owned());
    let mut mask = 0u64;
    let mut last = 0u32;
    for part in s.split(',') {
      let race: u32 = part.trim().parse().map_err(|_| invalid())?;
      if race <= last || race > MAX_RACES {
        return Err(invalid());
      }
      mask |= 1u64 << (race - 1);
      last = race;
    }
    Self::from_mask(mask).ok_or_else(invalid)
  }
}

fn check_race(race: u32, describe: impl FnOnce() -> String) -> Result<()> {
  if race == 0 || race > MAX_RACES {
    return Err(Error::InvalidSubset(describe()));
  }
  Ok(())
}

impl fmt::Display for RaceSubset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.encode())
  }
}

impl From<RaceSubset> for Vec<u32> {
  fn from(subset: RaceSubset) -> Self { subset.races().collect() }
}

impl TryFrom<Vec<u32>> for RaceSubset {
  type Error = Error;

  fn try_from(indices: Vec<u32>) -> Result<Self> { Self::from_indices(&indices) }
}

// ─── Enumeration ─────────────────────────────────────────────────────────────

/// Lazy iterator over every non-empty subset of `{1..n}`.
///
/// Subsets come out grouped by size, smallest first; within one size they are
/// in ascending mask order. Two iterators for the same `n` yield the same
/// sequence.
#[derive(Debug, Clone)]
pub struct Subsets {
  races:     u32,
  size:      u32,
  next:      Option<u64>,
  remaining: u64,
}

/// Every non-empty subset of `{1..races}`; `2^races - 1` items.
pub fn enumerate(races: u32) -> Result<Subsets> {
  if races > MAX_RACES {
    return Err(Error::TooManyRaces {
      max:   MAX_RACES as usize,
      found: races as usize,
    });
  }
  Ok(Subsets {
    races,
    size: 0,
    next: None,
    remaining: (1u64 << races) - 1,
  })
}

impl Iterator for Subsets {
  type Item = RaceSubset;

  fn next(&mut self) -> Option<RaceSubset> {
    let limit = 1u64 << self.races;
    loop {
      if let Some(mask) = self.next
        && mask < limit
      {
        self.next = Some(next_same_size(mask));
        self.remaining -= 1;
        return Some(RaceSubset(mask));
      }
      if self.size >= self.races {
        self.next = None;
        return None;
      }
      self.size += 1;
      self.next = Some((1u64 << self.size) - 1);
    }
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
    (n, Some(n))
  }
}

impl ExactSizeIterator for Subsets {}

/// Smallest mask greater than `mask` with the same popcount.
fn next_same_size(mask: u64) -> u64 {
  let low = mask | (mask - 1);
  let carry = low + 1;
  carry | (((!low & carry) - 1) >> (mask.trailing_zeros() + 1))
}

/// The subsets introduced by appending race `new_race` to a season whose
/// existing subsets are `existing`: each existing subset with `new_race`
/// added, then the singleton `{new_race}`.
pub fn extend<I>(
  existing: I,
  new_race: u32,
) -> Result<impl Iterator<Item = RaceSubset>>
where
  I: IntoIterator<Item = RaceSubset>,
{
  let single = RaceSubset::singleton(new_race)?;
  Ok(
    existing
      .into_iter()
      .map(move |s| RaceSubset(s.0 | single.0))
      .chain(iter::once(single)),
  )
}

/// The `2^races` subsets that appear when race `races + 1` is appended.
pub fn extension(races: u32) -> Result<impl Iterator<Item = RaceSubset>> {
  extend(enumerate(races)?, races + 1)
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn enumerate_zero_races_is_empty() {
    assert_eq!(enumerate(0).unwrap().count(), 0);
  }

  #[test]
  fn enumerate_one_race_yields_singleton() {
    let all: Vec<_> = enumerate(1).unwrap().collect();
    assert_eq!(all, vec![RaceSubset::singleton(1).unwrap()]);
  }

  #[test]
  fn enumerate_covers_every_subset_once() {
    for n in 0..=10 {
      let subsets: Vec<_> = enumerate(n).unwrap().collect();
      assert_eq!(subsets.len(), (1usize << n) - 1, "n = {n}");
      let distinct: HashSet<String> =
        subsets.iter().map(|s| s.encode()).collect();
      assert_eq!(distinct.len(), subsets.len());
      assert!(subsets.iter().all(|s| s.fits(n)));
    }
  }

  #[test]
  fn enumerate_groups_by_size() {
    let sizes: Vec<u32> = enumerate(6).unwrap().map(RaceSubset::len).collect();
    assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(sizes.first(), Some(&1));
    assert_eq!(sizes.last(), Some(&6));
  }

  #[test]
  fn enumerate_size_hint_is_exact() {
    let mut it = enumerate(4).unwrap();
    assert_eq!(it.len(), 15);
    it.next();
    it.next();
    assert_eq!(it.len(), 13);
  }

  #[test]
  fn enumerate_rejects_too_many_races() {
    assert!(matches!(
      enumerate(MAX_RACES + 1),
      Err(Error::TooManyRaces { .. })
    ));
  }

  #[test]
  fn extension_adds_new_race_to_everything() {
    let new: Vec<_> = extension(3).unwrap().collect();
    assert_eq!(new.len(), 8);
    assert!(new.iter().all(|s| s.contains(4)));
    assert_eq!(new.last(), Some(&RaceSubset::singleton(4).unwrap()));

    // Old subsets plus the extension is exactly the enumeration of n + 1.
    let mut combined: HashSet<RaceSubset> = enumerate(3).unwrap().collect();
    combined.extend(new);
    let expected: HashSet<RaceSubset> = enumerate(4).unwrap().collect();
    assert_eq!(combined, expected);
  }

  #[test]
  fn extension_of_empty_season_is_singleton() {
    let new: Vec<_> = extension(0).unwrap().collect();
    assert_eq!(new, vec![RaceSubset::singleton(1).unwrap()]);
  }

  #[test]
  fn encode_decode_roundtrip() {
    for s in enumerate(7).unwrap() {
      assert_eq!(RaceSubset::decode(&s.encode()).unwrap(), s);
    }
  }

  #[test]
  fn encode_is_ascending_and_one_based() {
    let s = RaceSubset::from_indices(&[4, 1, 3, 1]).unwrap();
    assert_eq!(s.encode(), "1,3,4");
    assert_eq!(s.len(), 3);
    assert_eq!(s.max_race(), 4);
  }

  #[test]
  fn decode_rejects_non_canonical_input() {
    for bad in ["", "0", "3,1", "1,1", "1,,2", "64", "a"] {
      assert!(RaceSubset::decode(bad).is_err(), "{bad:?}");
    }
  }

  #[test]
  fn from_indices_rejects_empty_and_out_of_range() {
    assert!(RaceSubset::from_indices(&[]).is_err());
    assert!(RaceSubset::from_indices(&[0]).is_err());
    assert!(RaceSubset::from_indices(&[MAX_RACES + 1]).is_err());
  }

  #[test]
  fn serde_uses_index_list() {
    let s = RaceSubset::from_indices(&[2, 5]).unwrap();
    let json = serde_json::to_string(&s).unwrap();
    assert_eq!(json, "[2,5]");
    let back: RaceSubset = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
  }
}
