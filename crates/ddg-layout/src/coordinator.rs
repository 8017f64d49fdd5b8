//! Runs layout phases on a dedicated worker thread.
//!
//! Jobs arrive over an unbounded channel. The worker always skips ahead to the newest queued job,
//! and a job that is superseded while it runs stops after its current phase.

use crate::backend::LayoutBackend;
use crate::engine::{self, EngineInput, EngineOutput, Phase};
use crate::error::Error;
use crate::manager::{Dispatch, Update, UpdateKind, UpdateSink};
use crate::options::LayoutOptions;
use crate::types::{LayoutDone, LayoutInput, PositionsDone};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

struct Job {
    id: u64,
    input: EngineInput,
}

pub struct Coordinator {
    backend: Arc<dyn LayoutBackend>,
    sink: UpdateSink,
    /// Id of the newest dispatched job; `0` after a stop.
    latest: Arc<AtomicU64>,
    tx: Option<Sender<Job>>,
}

impl Coordinator {
    pub fn new(sink: UpdateSink, backend: Arc<dyn LayoutBackend>) -> Self {
        Self {
            backend,
            sink,
            latest: Arc::new(AtomicU64::new(0)),
            tx: None,
        }
    }

    /// Whether a worker thread is currently attached.
    pub fn is_running(&self) -> bool {
        self.tx.is_some()
    }

    fn spawn_worker(&self) -> std::io::Result<Sender<Job>> {
        let (tx, rx) = unbounded();
        let worker = Worker {
            rx,
            backend: self.backend.clone(),
            sink: self.sink.clone(),
            latest: self.latest.clone(),
            timing: std::env::var("DDG_LAYOUT_TIMING").ok().as_deref() == Some("1"),
        };
        std::thread::Builder::new()
            .name("ddg-layout".to_string())
            .spawn(move || worker.run())?;
        Ok(tx)
    }
}

impl Dispatch for Coordinator {
    fn dispatch(&mut self, layout_id: u64, input: LayoutInput, options: &LayoutOptions) {
        self.latest.store(layout_id, Ordering::Release);
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => match self.spawn_worker() {
                Ok(tx) => tx,
                Err(err) => {
                    self.sink.deliver(Update::failed(layout_id, err.into()));
                    return;
                }
            },
        };
        let job = Job {
            id: layout_id,
            input: EngineInput {
                request: input,
                options: options.clone(),
            },
        };
        if tx.send(job).is_err() {
            self.sink.deliver(Update::failed(layout_id, Error::WorkerGone));
            return;
        }
        self.tx = Some(tx);
    }

    fn stop_and_release(&mut self) {
        self.latest.store(0, Ordering::Release);
        if self.tx.take().is_some() {
            tracing::debug!("released layout worker");
        }
    }
}

struct Worker {
    rx: Receiver<Job>,
    backend: Arc<dyn LayoutBackend>,
    sink: UpdateSink,
    latest: Arc<AtomicU64>,
    timing: bool,
}

impl Worker {
    fn run(self) {
        while let Ok(mut job) = self.rx.recv() {
            while let Ok(newer) = self.rx.try_recv() {
                job = newer;
            }
            if self.superseded(job.id) {
                tracing::debug!(layout_id = job.id, "skipping superseded layout");
                continue;
            }
            self.run_job(&job);
        }
    }

    fn superseded(&self, id: u64) -> bool {
        self.latest.load(Ordering::Acquire) != id
    }

    fn compute(&self, id: u64, phase: Phase, input: &EngineInput) -> Option<EngineOutput> {
        let start = self.timing.then(Instant::now);
        let res = engine::compute(phase, input, &*self.backend);
        if let Some(start) = start {
            tracing::info!(
                layout_id = id,
                ?phase,
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "layout phase timing"
            );
        }
        match res {
            Ok(out) => Some(out),
            Err(err) => {
                self.sink.deliver(Update::failed(id, err));
                None
            }
        }
    }

    fn post(&self, layout_id: u64, kind: UpdateKind) {
        self.sink.deliver(Update { layout_id, kind });
    }

    fn run_job(&self, job: &Job) {
        let id = job.id;
        if job.input.options.use_dot_edges {
            let Some(out) = self.compute(id, Phase::DotOnly, &job.input) else {
                return;
            };
            self.post(id, UpdateKind::Positions(positions_of(&out)));
            self.post(id, UpdateKind::Done(done_of(out, Vec::new())));
            return;
        }

        let Some(positions) = self.compute(id, Phase::Positions, &job.input) else {
            return;
        };
        self.post(id, UpdateKind::Positions(positions_of(&positions)));
        if positions.dropped_edges.is_empty() {
            self.post(id, UpdateKind::Done(done_of(positions, Vec::new())));
            return;
        }
        if self.superseded(id) {
            tracing::debug!(layout_id = id, "layout superseded after positions");
            return;
        }

        let input = EngineInput {
            request: LayoutInput {
                positioned_vertices: positions.vertices.clone(),
                new_vertices: Vec::new(),
                positioned_edges: positions.edges.clone(),
                new_edges: positions.dropped_edges.clone(),
                prev_graph: Some(positions.graph),
            },
            options: job.input.options.clone(),
        };
        let Some(routed) = self.compute(id, Phase::Edges, &input) else {
            return;
        };
        self.post(id, UpdateKind::Done(done_of(routed, positions.warnings)));
    }
}

fn positions_of(out: &EngineOutput) -> PositionsDone {
    PositionsDone {
        graph: out.graph,
        vertices: out.vertices.clone(),
        edges: out.edges.clone(),
    }
}

fn done_of(out: EngineOutput, mut warnings: Vec<String>) -> LayoutDone {
    warnings.extend(out.warnings);
    LayoutDone {
        graph: out.graph,
        vertices: out.vertices,
        edges: out.edges,
        unrouted_edges: out.dropped_edges,
        warnings,
    }
}
