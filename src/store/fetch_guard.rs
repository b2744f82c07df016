//! In-flight request slot
//!
//! Holds at most one pending fetch per store. Callers that arrive while a
//! fetch is pending get a clone of the same shared future instead of a new
//! request. The slot is only touched under the owning store's lock and never
//! across an await, so check-then-set is atomic.

use crate::errors::ClientError;
use futures::future::{BoxFuture, Shared};

pub type FetchResult = Result<(), ClientError>;

/// Cloneable handle to one in-flight fetch; every clone resolves to the same outcome
pub type FetchFuture = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Default)]
pub struct FetchGuard {
    pending: Option<(u64, FetchFuture)>,
    next_ticket: u64,
}

/// Whether `join_or_begin` started a new request or joined the pending one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Started(u64),
    Joined,
}

impl FetchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn in_flight(&self) -> Option<FetchFuture> {
        self.pending.as_ref().map(|(_, future)| future.clone())
    }

    /// Return the pending fetch, or start one with `start(ticket)`
    ///
    /// `start` must only spawn work; the ticket it receives is what the
    /// request passes to `settle` when it completes.
    pub fn join_or_begin<F>(&mut self, start: F) -> (FetchFuture, Admission)
    where
        F: FnOnce(u64) -> FetchFuture,
    {
        if let Some(in_flight) = self.in_flight() {
            return (in_flight, Admission::Joined);
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let future = start(ticket);
        self.pending = Some((ticket, future.clone()));
        (future, Admission::Started(ticket))
    }

    /// Clear the slot if it still belongs to `ticket`
    pub fn settle(&mut self, ticket: u64) -> bool {
        match &self.pending {
            Some((current, _)) if *current == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn ready_future() -> FetchFuture {
        async { Ok(()) }.boxed().shared()
    }

    #[test]
    fn test_second_caller_joins() {
        let mut guard = FetchGuard::new();
        let mut starts = 0;

        let (_, first) = guard.join_or_begin(|_| {
            starts += 1;
            ready_future()
        });
        let (_, second) = guard.join_or_begin(|_| {
            starts += 1;
            ready_future()
        });

        assert!(matches!(first, Admission::Started(1)));
        assert_eq!(second, Admission::Joined);
        assert_eq!(starts, 1);
    }

    #[test]
    fn test_settle_only_matching_ticket() {
        let mut guard = FetchGuard::new();
        let (_, admission) = guard.join_or_begin(|_| ready_future());
        let Admission::Started(ticket) = admission else {
            panic!("expected a new fetch");
        };

        assert!(!guard.settle(ticket + 1));
        assert!(guard.is_pending());
        assert!(guard.settle(ticket));
        assert!(!guard.is_pending());

        let (_, next) = guard.join_or_begin(|_| ready_future());
        assert_eq!(next, Admission::Started(ticket + 1));
    }
}
