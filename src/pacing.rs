use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::{Duration, Instant};

/// Pause KEGG asks clients to keep between consecutive requests.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(5);

/// Enforces a minimum interval between the requests of one worker.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Blocks until the interval since the previous call has elapsed.
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub workers: usize,
    pub interval: Duration,
}

impl Pacing {
    pub fn new(workers: usize, interval: Duration) -> Self {
        Self {
            workers: workers.max(1),
            interval,
        }
    }

    pub fn unpaced(workers: usize) -> Self {
        Self::new(workers, Duration::ZERO)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(1, DEFAULT_REQUEST_INTERVAL)
    }
}

/// Worker pacers that outlive a single batch, so consecutive batches
/// (resolve, lookup, materialize) stay under the same rate limit. Clones
/// share the pacers.
#[derive(Debug, Clone)]
pub struct PacedPool {
    pacers: Arc<[Mutex<Pacer>]>,
}

impl PacedPool {
    pub fn new(pacing: Pacing) -> Self {
        let pacing = Pacing::new(pacing.workers, pacing.interval);
        let pacers = (0..pacing.workers)
            .map(|_| Mutex::new(Pacer::new(pacing.interval)))
            .collect();
        Self { pacers }
    }

    pub fn workers(&self) -> usize {
        self.pacers.len()
    }

    /// Runs one request on the first worker's pacer.
    pub fn paced<R>(&self, f: impl FnOnce() -> R) -> R {
        let mut pacer = self.pacers[0]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pacer.wait();
        f()
    }

    /// Applies `f` to every item on at most `workers()` threads. Worker `n`
    /// waits on pacer `n` before each item. Results come back in input
    /// order.
    pub fn run<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        if items.is_empty() {
            return Vec::new();
        }
        let workers = self.workers().min(items.len());
        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();

        thread::scope(|scope| {
            for pacer in &self.pacers[..workers] {
                let tx = tx.clone();
                let next = &next;
                let f = &f;
                scope.spawn(move || {
                    let mut pacer = pacer.lock().unwrap_or_else(PoisonError::into_inner);
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(item) = items.get(index) else {
                            break;
                        };
                        pacer.wait();
                        if tx.send((index, f(item))).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx);

        let mut slots = items.iter().map(|_| None).collect::<Vec<Option<R>>>();
        for (index, result) in rx {
            slots[index] = Some(result);
        }
        slots.into_iter().flatten().collect()
    }
}

impl From<Pacing> for PacedPool {
    fn from(pacing: Pacing) -> Self {
        Self::new(pacing)
    }
}

/// One-off batch on fresh pacers. See [`PacedPool::run`].
pub fn run_paced<T, R, F>(items: &[T], pacing: Pacing, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    PacedPool::new(pacing).run(items, f)
}
