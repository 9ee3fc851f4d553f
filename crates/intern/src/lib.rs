//! String interning for field names and influencer values.
//!
//! Every incoming record carries the same few field names and a bounded set
//! of category values. [`StringStore::get`] returns a shared [`IStr`] so
//! that models keyed on those values hold one allocation per distinct string
//! rather than one per record.
//!
//! Pools are independent namespaces. The engine uses two process-wide pools,
//! [`StringStore::names`] and [`StringStore::influencers`]; tests build
//! their own with [`StringStore::new`].

mod istr;
mod store;

pub use istr::IStr;
pub use store::{StringStore, memory_usage};
