//! Transactional wrapper that buffers mutations until commit.
//!
//! An [`AuditedStore`] records every `insert`/`remove` in an ordered log
//! instead of forwarding it. [`commit`](AuditedStore::commit) collapses the
//! log into its net effect and applies it to the inner store in one call;
//! [`rollback`](AuditedStore::rollback) discards it. A failed build therefore
//! leaves the inner store exactly as it was.
//!
//! Pattern lookups, `contains` and `len` read through the log, so a builder
//! sees its own pending writes. SPARQL `select`/`ask` see committed state only.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::graph::{Node, Term, Triple};

use super::{Solution, StoreResult, TripleStore};

/// One buffered mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Add(Triple),
    Remove(Triple),
}

impl Mutation {
    fn triple(&self) -> &Triple {
        match self {
            Mutation::Add(t) | Mutation::Remove(t) => t,
        }
    }
}

/// A store wrapper that holds mutations in memory until committed.
#[derive(Debug)]
pub struct AuditedStore<S: TripleStore> {
    inner: S,
    log: Mutex<Vec<Mutation>>,
}

impl<S: TripleStore> AuditedStore<S> {
    /// Wrap a store with an empty mutation log.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of buffered mutations.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Apply the net effect of the log to the inner store and clear it.
    ///
    /// Returns `(removed, added)` counts of the net change. The log is cleared
    /// even when the inner store fails, since the partial state of a failed
    /// remote update cannot be known.
    pub fn commit(&self) -> StoreResult<(usize, usize)> {
        let log = std::mem::take(&mut *self.lock());
        let (removals, additions) = net_effect(&log);
        if removals.is_empty() && additions.is_empty() {
            return Ok((0, 0));
        }
        self.inner.apply(&removals, &additions)?;
        tracing::debug!(
            removed = removals.len(),
            added = additions.len(),
            "transaction committed"
        );
        Ok((removals.len(), additions.len()))
    }

    /// Discard every buffered mutation, returning how many there were.
    pub fn rollback(&self) -> usize {
        let discarded = std::mem::take(&mut *self.lock()).len();
        if discarded > 0 {
            tracing::debug!(discarded, "transaction rolled back");
        }
        discarded
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Mutation>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The last buffered state of a triple: `Some(true)` if added,
    /// `Some(false)` if removed, `None` if untouched.
    fn buffered_state(&self, triple: &Triple) -> Option<bool> {
        self.lock()
            .iter()
            .rev()
            .find(|m| m.triple() == triple)
            .map(|m| matches!(m, Mutation::Add(_)))
    }
}

impl<S: TripleStore> Drop for AuditedStore<S> {
    fn drop(&mut self) {
        let pending = self.log.get_mut().map(|l| l.len()).unwrap_or(0);
        if pending > 0 {
            tracing::warn!(pending, "transaction dropped without commit; changes discarded");
        }
    }
}

/// Collapse a mutation log into net removals and additions.
///
/// Each triple's final state wins; triples are reported in first-seen order.
fn net_effect(log: &[Mutation]) -> (Vec<Triple>, Vec<Triple>) {
    let mut order: Vec<&Triple> = Vec::new();
    let mut last: HashMap<&Triple, bool> = HashMap::new();
    for m in log {
        let t = m.triple();
        if last.insert(t, matches!(m, Mutation::Add(_))).is_none() {
            order.push(t);
        }
    }
    let mut removals = Vec::new();
    let mut additions = Vec::new();
    for t in order {
        if last[t] {
            additions.push(t.clone());
        } else {
            removals.push(t.clone());
        }
    }
    (removals, additions)
}

impl<S: TripleStore> TripleStore for AuditedStore<S> {
    fn insert(&self, triple: &Triple) -> StoreResult<()> {
        self.lock().push(Mutation::Add(triple.clone()));
        Ok(())
    }

    fn remove(&self, triple: &Triple) -> StoreResult<()> {
        self.lock().push(Mutation::Remove(triple.clone()));
        Ok(())
    }

    fn insert_all(&self, triples: &[Triple]) -> StoreResult<()> {
        self.lock()
            .extend(triples.iter().cloned().map(Mutation::Add));
        Ok(())
    }

    fn remove_all(&self, triples: &[Triple]) -> StoreResult<()> {
        self.lock()
            .extend(triples.iter().cloned().map(Mutation::Remove));
        Ok(())
    }

    fn apply(&self, removals: &[Triple], additions: &[Triple]) -> StoreResult<()> {
        let mut log = self.lock();
        log.extend(removals.iter().cloned().map(Mutation::Remove));
        log.extend(additions.iter().cloned().map(Mutation::Add));
        Ok(())
    }

    fn contains(&self, triple: &Triple) -> StoreResult<bool> {
        match self.buffered_state(triple) {
            Some(present) => Ok(present),
            None => self.inner.contains(triple),
        }
    }

    fn matching(
        &self,
        subject: Option<&Node>,
        predicate: Option<&str>,
        object: Option<&Term>,
    ) -> StoreResult<Vec<Triple>> {
        let mut found = self.inner.matching(subject, predicate, object)?;
        let log = self.lock();
        if log.is_empty() {
            return Ok(found);
        }
        let (removals, additions) = net_effect(&log);
        drop(log);
        found.retain(|t| !removals.contains(t));
        for t in additions {
            if t.matches(subject, predicate, object) && !found.contains(&t) {
                found.push(t);
            }
        }
        Ok(found)
    }

    fn len(&self) -> StoreResult<usize> {
        let base = self.inner.len()?;
        let (removals, additions) = net_effect(&self.lock());
        let mut len = base as i64;
        for t in &removals {
            if self.inner.contains(t)? {
                len -= 1;
            }
        }
        for t in &additions {
            if !self.inner.contains(t)? {
                len += 1;
            }
        }
        Ok(len.max(0) as usize)
    }

    fn select(&self, sparql: &str) -> StoreResult<Vec<Solution>> {
        self.inner.select(sparql)
    }

    fn ask(&self, sparql: &str) -> StoreResult<bool> {
        self.inner.ask(sparql)
    }
}
