//! Threaded render session.
//!
//! One OS thread per tile, each looping [`render_pass`] over its own strip
//! until the sample policy is met or the context is cancelled.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{RenderError, RenderResult};
use crate::renderer::{render_pass, PassStatus, RenderContext};
use crate::tile::{PixelBuffer, TileCanvas};

/// Seed for the worker that owns tile `index`.
pub fn worker_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// A running render. Dropping it cancels and joins every worker.
pub struct RenderSession {
    context: Arc<RenderContext>,
    buffer: Arc<PixelBuffer>,
    workers: Vec<JoinHandle<()>>,
    iterations: Arc<[AtomicU32]>,
}

impl RenderSession {
    /// Partition `buffer` into `threads` tiles and start one worker per tile.
    ///
    /// Fewer workers are started when the image is narrower than `threads`.
    pub fn start(
        context: Arc<RenderContext>,
        buffer: Arc<PixelBuffer>,
        threads: usize,
    ) -> RenderResult<Self> {
        if threads == 0 {
            return Err(RenderError::ZeroThreads);
        }
        let canvases = buffer.partition(threads)?;
        let iterations: Arc<[AtomicU32]> = canvases.iter().map(|_| AtomicU32::new(0)).collect();

        log::info!(
            "Starting render: {}x{} across {} tiles, {:?}, max depth {}",
            buffer.width(),
            buffer.height(),
            canvases.len(),
            context.samples(),
            context.max_depth()
        );

        let mut session = Self {
            context,
            buffer,
            workers: Vec::with_capacity(canvases.len()),
            iterations,
        };

        // On spawn failure the partially built session is dropped, which
        // stops the workers already running.
        for canvas in canvases {
            let context = Arc::clone(&session.context);
            let iterations = Arc::clone(&session.iterations);
            let handle = thread::Builder::new()
                .name(format!("lumen-tile-{}", canvas.tile().index))
                .spawn(move || run_worker(&context, canvas, &iterations))?;
            session.workers.push(handle);
        }

        Ok(session)
    }

    pub fn context(&self) -> &Arc<RenderContext> {
        &self.context
    }

    pub fn buffer(&self) -> &Arc<PixelBuffer> {
        &self.buffer
    }

    /// Number of worker threads (equal to the tile count).
    pub fn thread_count(&self) -> usize {
        self.iterations.len()
    }

    /// Passes finished by each tile, left to right.
    pub fn iterations(&self) -> Vec<u32> {
        self.iterations
            .iter()
            .map(|i| i.load(Ordering::Relaxed))
            .collect()
    }

    /// Lowest and highest tile iteration.
    pub fn iteration_range(&self) -> (u32, u32) {
        let iterations = self.iterations();
        let min = iterations.iter().copied().min().unwrap_or(0);
        let max = iterations.iter().copied().max().unwrap_or(0);
        (min, max)
    }

    /// True once every worker has exited.
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(|handle| handle.is_finished())
    }

    /// Signal every worker to stop after its current row.
    pub fn cancel(&self) {
        self.context.cancel();
    }

    /// Cancel and wait for every worker. Safe to call more than once.
    pub fn join(&mut self) -> RenderResult<()> {
        self.cancel();

        let mut panicked = None;
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("lumen-tile").to_string();
            if handle.join().is_err() {
                log::error!("Render worker {} panicked", name);
                panicked.get_or_insert(name);
            }
        }

        match panicked {
            Some(name) => Err(RenderError::WorkerPanicked(name)),
            None => Ok(()),
        }
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        if let Err(e) = self.join() {
            log::error!("Render session shut down with an error: {}", e);
        }
    }
}

fn run_worker(context: &RenderContext, mut canvas: TileCanvas, iterations: &[AtomicU32]) {
    let index = canvas.tile().index;
    let mut rng = StdRng::seed_from_u64(worker_seed(context.seed(), index));

    log::debug!(
        "Worker {} rendering columns {:?}",
        index,
        canvas.tile().x_range()
    );

    while !context.is_cancelled() && !context.samples().is_complete(canvas.tile().iteration) {
        let status = render_pass(context, &mut canvas, &mut rng);
        iterations[index].store(canvas.tile().iteration, Ordering::Relaxed);
        if status == PassStatus::Interrupted {
            break;
        }
    }

    log::debug!(
        "Worker {} stopped after {} iterations",
        index,
        canvas.tile().iteration
    );
}
