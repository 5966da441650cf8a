//! Mutation signalling for blocking reads.
//!
//! A watch channel carries a mutation generation counter. Mutating cache
//! operations bump it after committing; blocked readers subscribe before
//! their first predicate check and re-check on every bump. A wake from an
//! unrelated mutation is harmless (the predicate is simply checked
//! again), and a relevant mutation is never missed: the channel reports
//! any bump that happens after subscription, even one that lands before
//! the reader starts waiting.

use tokio::sync::watch;
use tokio::time::{self, Instant};

/// Sender half, owned by the cache. Bumped on every mutation.
#[derive(Debug)]
pub(crate) struct MutationSignal {
    generation: watch::Sender<u64>,
}

impl MutationSignal {
    pub(crate) fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self { generation }
    }

    /// Wake every current subscriber.
    pub(crate) fn raise(&self) {
        self.generation
            .send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Subscribe to subsequent mutations. Mutations committed before the
    /// subscription are not reported, so callers must subscribe first and
    /// check their predicate second.
    pub(crate) fn subscribe(&self) -> MutationListener {
        MutationListener {
            generation: self.generation.subscribe(),
        }
    }
}

/// Receiver half held by one blocked reader.
#[derive(Debug)]
pub(crate) struct MutationListener {
    generation: watch::Receiver<u64>,
}

impl MutationListener {
    /// Wait until the next mutation or `deadline`, whichever comes
    /// first. Returns `true` when woken by a mutation, `false` once the
    /// deadline has passed.
    pub(crate) async fn changed_before(&mut self, deadline: Instant) -> bool {
        matches!(
            time::timeout_at(deadline, self.generation.changed()).await,
            Ok(Ok(()))
        )
    }
}
