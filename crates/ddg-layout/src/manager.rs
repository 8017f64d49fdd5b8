//! Request orchestration: at most one layout in flight, newer requests cancel older ones.
//!
//! Every request gets two handles. `positions` resolves as soon as vertices are placed,
//! `layout` once edges are routed too. Both resolve exactly once: with the result, with
//! [`Outcome::Cancelled`] when a newer request (or [`LayoutManager::stop_and_release`]) supersedes
//! them, or with the error that stopped the computation.

use crate::backend::{Builtin, LayoutBackend};
use crate::coordinator::Coordinator;
use crate::error::Error;
use crate::options::LayoutOptions;
use crate::types::{LayoutDone, LayoutInput, PositionsDone};
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ready(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Resolution<T> = std::result::Result<Outcome<T>, Arc<Error>>;

/// Resolves once with the phase result. A dropped request resolves as cancelled.
#[derive(Debug)]
pub struct LayoutFuture<T> {
    rx: oneshot::Receiver<Resolution<T>>,
}

impl<T> Future for LayoutFuture<T> {
    type Output = Resolution<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Ok(Outcome::Cancelled)))
    }
}

#[derive(Debug)]
pub struct LayoutHandles {
    pub positions: LayoutFuture<PositionsDone>,
    pub layout: LayoutFuture<LayoutDone>,
}

#[derive(Debug)]
pub enum UpdateKind {
    Positions(PositionsDone),
    Done(LayoutDone),
    Failed(Arc<Error>),
}

/// A phase result posted back by whatever computes layouts.
#[derive(Debug)]
pub struct Update {
    pub layout_id: u64,
    pub kind: UpdateKind,
}

impl Update {
    pub fn failed(layout_id: u64, err: Error) -> Self {
        Self {
            layout_id,
            kind: UpdateKind::Failed(Arc::new(err)),
        }
    }
}

#[derive(Debug)]
struct Pending {
    id: u64,
    /// `None` once resolved.
    positions: Option<oneshot::Sender<Resolution<PositionsDone>>>,
    layout: Option<oneshot::Sender<Resolution<LayoutDone>>>,
}

impl Pending {
    fn cancel(self) {
        if let Some(tx) = self.positions {
            let _ = tx.send(Ok(Outcome::Cancelled));
        }
        if let Some(tx) = self.layout {
            let _ = tx.send(Ok(Outcome::Cancelled));
        }
    }
}

type Slot = Arc<Mutex<Option<Pending>>>;

/// Where updates for the pending request are delivered. Cheap to clone and safe to use from any
/// thread.
#[derive(Debug, Clone)]
pub struct UpdateSink {
    pending: Slot,
}

impl UpdateSink {
    pub fn deliver(&self, update: Update) {
        let layout_id = update.layout_id;
        let mut slot = self.pending.lock();
        let Some(pending) = slot.as_mut().filter(|p| p.id == layout_id) else {
            tracing::debug!(layout_id, "dropping update for a layout that is no longer pending");
            return;
        };
        match update.kind {
            UpdateKind::Positions(done) => match pending.positions.take() {
                Some(tx) => {
                    let _ = tx.send(Ok(Outcome::Ready(done)));
                }
                None => tracing::warn!(layout_id, "positions delivered more than once"),
            },
            UpdateKind::Done(done) => {
                if let Some(tx) = pending.positions.take() {
                    let positions = PositionsDone {
                        graph: done.graph,
                        vertices: done.vertices.clone(),
                        edges: done.edges.clone(),
                    };
                    let _ = tx.send(Ok(Outcome::Ready(positions)));
                }
                if let Some(tx) = pending.layout.take() {
                    let _ = tx.send(Ok(Outcome::Ready(done)));
                }
                *slot = None;
            }
            UpdateKind::Failed(err) => {
                tracing::warn!(layout_id, error = %err, "layout failed");
                if let Some(tx) = pending.positions.take() {
                    let _ = tx.send(Err(err.clone()));
                }
                if let Some(tx) = pending.layout.take() {
                    let _ = tx.send(Err(err));
                }
                *slot = None;
            }
        }
    }
}

/// Runs requests on behalf of a [`LayoutManager`] and reports through its [`UpdateSink`].
pub trait Dispatch {
    fn dispatch(&mut self, layout_id: u64, input: LayoutInput, options: &LayoutOptions);

    /// Drop in-flight work and release resources. Later dispatches must still work.
    fn stop_and_release(&mut self);
}

pub struct LayoutManager<D: Dispatch = Coordinator> {
    options: LayoutOptions,
    layout_id: u64,
    pending: Slot,
    dispatcher: D,
}

impl LayoutManager {
    /// A manager running the in-process engine on a worker thread.
    pub fn new(options: LayoutOptions) -> Self {
        Self::with_backend(options, Arc::new(Builtin))
    }

    pub fn with_backend(options: LayoutOptions, backend: Arc<dyn LayoutBackend>) -> Self {
        Self::with_dispatcher(options, |sink| Coordinator::new(sink, backend))
    }
}

impl<D: Dispatch> LayoutManager<D> {
    pub fn with_dispatcher(options: LayoutOptions, make: impl FnOnce(UpdateSink) -> D) -> Self {
        let pending: Slot = Arc::new(Mutex::new(None));
        let dispatcher = make(UpdateSink {
            pending: pending.clone(),
        });
        Self {
            options,
            layout_id: 0,
            pending,
            dispatcher,
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Id of the most recent request; `0` before the first one.
    pub fn layout_id(&self) -> u64 {
        self.layout_id
    }

    pub fn get_layout(&mut self, input: LayoutInput) -> LayoutHandles {
        self.cancel_pending();
        self.layout_id += 1;
        let id = self.layout_id;
        let (positions_tx, positions_rx) = oneshot::channel();
        let (layout_tx, layout_rx) = oneshot::channel();
        *self.pending.lock() = Some(Pending {
            id,
            positions: Some(positions_tx),
            layout: Some(layout_tx),
        });
        self.dispatcher.dispatch(id, input, &self.options);
        LayoutHandles {
            positions: LayoutFuture { rx: positions_rx },
            layout: LayoutFuture { rx: layout_rx },
        }
    }

    /// Cancels the pending request and releases the dispatcher. Safe to call repeatedly; the
    /// manager stays usable.
    pub fn stop_and_release(&mut self) {
        self.cancel_pending();
        self.dispatcher.stop_and_release();
    }

    fn cancel_pending(&mut self) {
        let pending = self.pending.lock().take();
        if let Some(pending) = pending {
            tracing::debug!(layout_id = pending.id, "cancelling pending layout");
            pending.cancel();
        }
    }
}

impl<D: Dispatch> Drop for LayoutManager<D> {
    fn drop(&mut self) {
        self.stop_and_release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LayoutGraph;
    use futures::executor::block_on;

    #[derive(Default)]
    struct Recorder {
        dispatched: Vec<u64>,
        stopped: usize,
    }

    impl Dispatch for Recorder {
        fn dispatch(&mut self, layout_id: u64, _input: LayoutInput, _options: &LayoutOptions) {
            self.dispatched.push(layout_id);
        }

        fn stop_and_release(&mut self) {
            self.stopped += 1;
        }
    }

    fn positions() -> PositionsDone {
        PositionsDone {
            graph: LayoutGraph {
                width: 10.0,
                height: 20.0,
                scale: 1.0,
            },
            vertices: Vec::new(),
            edges: Vec::new(),
        }
    }

    #[test]
    fn future_of_a_dropped_sender_is_cancelled() {
        let (tx, rx) = oneshot::channel::<Resolution<PositionsDone>>();
        drop(tx);
        let res = block_on(LayoutFuture { rx }).unwrap();
        assert!(res.is_cancelled());
    }

    #[test]
    fn ids_increase_and_reach_the_dispatcher() {
        let mut manager = LayoutManager::with_dispatcher(LayoutOptions::default(), |_| {
            Recorder::default()
        });
        let _a = manager.get_layout(LayoutInput::default());
        let _b = manager.get_layout(LayoutInput::default());
        assert_eq!(manager.dispatcher().dispatched, vec![1, 2]);
        assert_eq!(manager.layout_id(), 2);
    }

    #[test]
    fn stale_updates_are_dropped() {
        let mut sink = None;
        let mut manager = LayoutManager::with_dispatcher(LayoutOptions::default(), |s| {
            sink = Some(s);
            Recorder::default()
        });
        let sink = sink.unwrap();
        let first = manager.get_layout(LayoutInput::default());
        let second = manager.get_layout(LayoutInput::default());
        sink.deliver(Update {
            layout_id: 1,
            kind: UpdateKind::Positions(positions()),
        });
        sink.deliver(Update {
            layout_id: 2,
            kind: UpdateKind::Positions(positions()),
        });
        assert!(block_on(first.positions).unwrap().is_cancelled());
        assert!(block_on(first.layout).unwrap().is_cancelled());
        assert_eq!(
            block_on(second.positions).unwrap().ready().unwrap().graph.width,
            10.0
        );
    }
}
