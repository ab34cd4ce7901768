#![warn(missing_docs)]

//! The stripe placement algorithm and its candidate sequences.
//!
//! Given where each item currently lives, the set of admissible destinations,
//! and a fair candidate source, [`stripe`] computes the *additional*
//! destinations each item must be copied to so that every item ends up in at
//! least `min` locations, with the first `distinct` choices diversified
//! across items. The algorithm is pure: callers own all state and
//! serialization.

pub mod seq;
pub mod stripe;

pub use seq::{RoundRobin, Seq};
pub use stripe::{stripe, Locs, ShortPlacement, StripeConfig, Striper, S};
