// SPDX-License-Identifier: MIT OR Apache-2.0

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;

use crate::repository::ToggleOutcome;
use crate::{Edge, RelationError, RelationshipCounter};

/// Progress of toggles on a facade, for presentation layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelationEvent {
    /// Local state was flipped optimistically, the store was not written yet.
    Pending { edge: Edge, linked: bool },

    /// Store confirmed the relationship, local state now mirrors it.
    Settled {
        edge: Edge,
        linked: bool,
        counter: RelationshipCounter,
    },

    /// Toggle failed and the optimistic change was undone.
    Reverted { edge: Edge, error: RelationError },
}

pub type RelationEvents = BroadcastStream<RelationEvent>;

/// Completion of a toggle which was started with
/// [`RelationshipFacade::toggle`](crate::RelationshipFacade::toggle).
///
/// Dropping the handle does not cancel the toggle. The commit runs to completion and local state
/// is updated with its result either way.
#[derive(Debug)]
pub struct ToggleHandle {
    edge: Edge,
    task: JoinHandle<Result<ToggleOutcome, RelationError>>,
}

impl ToggleHandle {
    pub(crate) fn new(edge: Edge, task: JoinHandle<Result<ToggleOutcome, RelationError>>) -> Self {
        Self { edge, task }
    }

    pub fn edge(&self) -> &Edge {
        &self.edge
    }
}

impl Future for ToggleHandle {
    type Output = Result<ToggleOutcome, RelationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.task).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Poll::Ready(Err(RelationError::Aborted)),
        }
    }
}
