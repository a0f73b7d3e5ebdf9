//! First-settled-wins racing of two futures.
//!
//! The losing future is dropped, never driven to completion. Dropping a
//! `JoinHandle` from `spawn_blocking` detaches the blocking call: it keeps
//! running on its thread and whatever it returns is discarded.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, PartialEq, Eq)]
pub enum Settled<A, B> {
    First(A),
    Second(B),
}

/// Polls both futures and resolves with whichever finishes first.
///
/// Ties go to `first`.
pub async fn first_settled<A, B>(first: A, second: B) -> Settled<A::Output, B::Output>
where
    A: Future,
    B: Future,
{
    tokio::select! {
        biased;
        out = first => Settled::First(out),
        out = second => Settled::Second(out),
    }
}

/// Races `fut` against a timer. `None` means the timer won.
pub async fn within<F: Future>(limit: Duration, fut: F) -> Option<F::Output> {
    match first_settled(fut, tokio::time::sleep(limit)).await {
        Settled::First(out) => Some(out),
        Settled::Second(()) => None,
    }
}
