//! Foundational value types shared by every SysDOM crate.
//!
//! Four-valued logic and packed logic vectors (the usual payload of hardware
//! signals), the [`Resolve`] trait used by multi-driver signals, physical
//! simulation [`Time`], interned hierarchical names, and content fingerprints.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod logic;
pub mod logic_vec;
pub mod resolve;
pub mod time;

pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use logic::Logic;
pub use logic_vec::LogicVec;
pub use resolve::{resolve_all, Resolve};
pub use time::{ParseTimeError, Time, TimeUnit};
