//! The placement algorithm.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::seq::Seq;

/// A set of locations. Ordered so that every iteration the algorithm
/// performs is deterministic for a given input.
pub type Locs<L> = BTreeSet<L>;

/// A placement map: item → set of locations. The value at a key is "where
/// the item currently lives" on input and "where the item must additionally
/// be written" on output.
pub type S<I, L> = BTreeMap<I, Locs<L>>;

/// Placement is infeasible under the given destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not enough target locations for distinct={distinct} min={min} avail={avail}")]
pub struct ShortPlacement {
    /// Requested diversification bound.
    pub distinct: u32,
    /// Requested minimum location count.
    pub min: u32,
    /// Locations available or achieved when placement gave up.
    pub avail: usize,
}

/// Compute the additional destinations each item of `existing` must be
/// written to.
///
/// For every item, the result unioned with its existing locations holds at
/// least `min` members of `dests`, and the first `distinct` locations chosen
/// for an item do not collide with any other item's chosen locations unless
/// the candidate space leaves no alternative. The result contains only new
/// destinations: locations an item already holds are subtracted.
///
/// Candidates are drawn from `seq`; ids outside `dests` are skipped, and a
/// destination already serving many items is deferred one turn per competing
/// item so under-used destinations win ties. Cycling through every
/// destination without progress fails with [`ShortPlacement`].
pub fn stripe<I, L>(
    existing: &S<I, L>,
    dests: &Locs<L>,
    seq: &mut dyn Seq<L>,
    distinct: u32,
    min: u32,
) -> Result<S<I, L>, ShortPlacement>
where
    I: Ord + Clone,
    L: Ord + Clone,
{
    // No assignment can reach min locations out of fewer than min dests.
    // Failing here also keeps the degenerate configurations from spinning
    // on a sequence that can never satisfy them.
    if dests.len() < min as usize {
        return Err(ShortPlacement {
            distinct,
            min,
            avail: dests.len(),
        });
    }

    // got(i) = existing[i] ∩ dests; prio counts how many items each
    // destination already serves.
    let mut exist: S<I, L> = S::new();
    let mut prios: BTreeMap<L, u32> = BTreeMap::new();
    for (item, locs) in existing {
        let got: Locs<L> = locs.iter().filter(|l| dests.contains(*l)).cloned().collect();
        for loc in &got {
            *prios.entry(loc.clone()).or_insert(0) += 1;
        }
        exist.insert(item.clone(), got);
    }

    let mut res: S<I, L> = S::new();
    for (item, got) in &exist {
        let mut new_locs: Locs<L> = Locs::new();
        // Existing replicas are revisited first: they count toward min and
        // anchor the exclusivity bookkeeping for later items.
        let mut old: VecDeque<L> = got.iter().cloned().collect();
        let mut seen: Locs<L> = Locs::new();
        while new_locs.len() < (min as usize) {
            loop {
                let cand = match old.pop_front() {
                    Some(loc) => loc,
                    None => {
                        let loc = seq.next();
                        if !dests.contains(&loc) {
                            continue;
                        }
                        if !got.contains(&loc) {
                            if let Some(prio) = prios.get_mut(&loc) {
                                if *prio > 0 {
                                    // defer a hot destination one turn per
                                    // item it already serves
                                    *prio -= 1;
                                    continue;
                                }
                            }
                        }
                        if seen.contains(&loc) {
                            // full cycle without placing enough
                            return Err(ShortPlacement {
                                distinct,
                                min,
                                avail: new_locs.len(),
                            });
                        }
                        seen.insert(loc.clone());
                        loc
                    }
                };
                if new_locs.contains(&cand) {
                    continue;
                }
                new_locs.insert(cand.clone());
                if new_locs.len() <= distinct as usize && !exclusive(&res, &new_locs) {
                    new_locs.remove(&cand);
                    continue;
                }
                break;
            }
        }
        res.insert(item.clone(), new_locs);
    }

    // Return only destinations the item does not already hold.
    for (item, new_locs) in res.iter_mut() {
        if let Some(got) = exist.get(item) {
            for loc in got {
                new_locs.remove(loc);
            }
        }
    }
    Ok(res)
}

/// True when no already-placed item shares a location with `locs`.
fn exclusive<I, L>(res: &S<I, L>, locs: &Locs<L>) -> bool
where
    I: Ord,
    L: Ord,
{
    res.values()
        .all(|other| locs.iter().all(|loc| !other.contains(loc)))
}

/// Diversification and replication bounds for a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeConfig {
    /// How many of each item's first choices must not collide with another
    /// item's locations.
    pub distinct: u32,
    /// Minimum total locations per item after the operation.
    pub min: u32,
}

/// A placement policy: compute additional destinations for each item of a
/// placement map. Implemented by [`StripeConfig`] for production and by
/// stubs in tests.
pub trait Striper<I, L>: Send + Sync {
    /// Produce the additional-destinations map for `existing` over `dests`.
    fn stripe(
        &self,
        existing: &S<I, L>,
        dests: &Locs<L>,
        seq: &mut dyn Seq<L>,
    ) -> Result<S<I, L>, ShortPlacement>;
}

impl<I, L> Striper<I, L> for StripeConfig
where
    I: Ord + Clone,
    L: Ord + Clone,
{
    fn stripe(
        &self,
        existing: &S<I, L>,
        dests: &Locs<L>,
        seq: &mut dyn Seq<L>,
    ) -> Result<S<I, L>, ShortPlacement> {
        stripe(existing, dests, seq, self.distinct, self.min)
    }
}
