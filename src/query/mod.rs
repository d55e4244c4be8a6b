//! Filtered retrieval of reporting obligations and their entities.
//!
//! - [`fragment`]: `SELECT` query values and their validated rendering
//! - [`constraint`]: filter parameters and the patterns they expand to
//! - [`sort`]: natural ordering applied to every returned list
//! - [`provider`]: the operations themselves, run against any [`TripleStore`](crate::store::TripleStore)

pub mod constraint;
pub mod fragment;
pub mod provider;
pub mod sort;

pub use constraint::{Constraint, Filter, MatchMode, Scope, TextMatch};
pub use provider::{
    EntityGroup, ObligationDetail, ObligationPage, Page, QueryProvider, QueryResult, ValueCount,
};
pub use sort::{natural_cmp, sort_natural};
