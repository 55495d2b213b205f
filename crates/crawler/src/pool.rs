use crate::error::PoolError;
use buildscope_classifier::{AssetAnalyzer, ClassifierError, Signatures};
use buildscope_protocol::{Asset, ClassifyRequest};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;

/// One worker's classification routine.
pub type Handler = Box<dyn FnMut(ClassifyRequest) -> Result<Asset, ClassifierError> + Send>;

/// Builds a fresh [`Handler`]; called per worker, after a panic and for
/// every replacement worker.
pub type HandlerFactory = Arc<dyn Fn() -> Result<Handler, ClassifierError> + Send + Sync>;

/// Handlers backed by [`AssetAnalyzer`] with the given signature tables.
pub fn analyzer_factory(signatures: Signatures) -> HandlerFactory {
    Arc::new(move || {
        let mut analyzer = AssetAnalyzer::new(signatures.clone())?;
        Ok(Box::new(move |request: ClassifyRequest| analyzer.analyze(request)) as Handler)
    })
}

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const ABANDONED: u8 = 2;

struct ClassifyJob {
    request: ClassifyRequest,
    started: oneshot::Sender<()>,
    state: Arc<AtomicU8>,
    reply: oneshot::Sender<Result<Asset, PoolError>>,
}

/// Fixed set of long-lived classification threads.
///
/// Each worker owns its own handler (parsers are not shared). The deadline of
/// a call runs from the moment a worker picks the request up, so time spent
/// queued behind other assets does not count against it. A worker whose call
/// times out retires once its job returns and a fresh worker takes its slot
/// straight away. Call [`ClassifierPool::shutdown`] once no more work will be
/// submitted.
pub struct ClassifierPool {
    sender: Mutex<Option<mpsc::Sender<ClassifyJob>>>,
    receiver: Arc<Mutex<mpsc::Receiver<ClassifyJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    factory: HandlerFactory,
    idle: Arc<AtomicUsize>,
    next_index: AtomicUsize,
    size: usize,
}

impl ClassifierPool {
    pub fn new(size: usize, factory: HandlerFactory) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize(size));
        }

        let (sender, receiver) = mpsc::channel::<ClassifyJob>();
        let pool = Self {
            sender: Mutex::new(Some(sender)),
            receiver: Arc::new(Mutex::new(receiver)),
            workers: Mutex::new(Vec::with_capacity(size)),
            factory,
            idle: Arc::new(AtomicUsize::new(0)),
            next_index: AtomicUsize::new(0),
            size,
        };
        for _ in 0..size {
            let handler = (pool.factory)().map_err(|e| PoolError::WorkerStart(e.to_string()))?;
            pool.spawn_worker(handler)?;
        }
        log::debug!("Started {size} classification worker(s)");

        Ok(pool)
    }

    /// Pool of [`AssetAnalyzer`] workers.
    pub fn with_signatures(size: usize, signatures: Signatures) -> Result<Self, PoolError> {
        Self::new(size, analyzer_factory(signatures))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers waiting for a request.
    pub fn idle_workers(&self) -> usize {
        self.idle.load(Ordering::SeqCst)
    }

    /// Classify one asset; `deadline` is measured from worker pickup.
    pub async fn classify(
        &self,
        request: ClassifyRequest,
        deadline: Duration,
    ) -> Result<Asset, PoolError> {
        let name = request.name.clone();
        let state = Arc::new(AtomicU8::new(RUNNING));
        let (started, pickup) = oneshot::channel();
        let (reply, mut response) = oneshot::channel();
        {
            let sender = lock(&self.sender);
            let sender = sender.as_ref().ok_or(PoolError::ShutDown)?;
            sender
                .send(ClassifyJob {
                    request,
                    started,
                    state: Arc::clone(&state),
                    reply,
                })
                .map_err(|_| PoolError::ShutDown)?;
        }

        // Dropped unstarted only when every worker has exited.
        if pickup.await.is_err() {
            return Err(PoolError::ShutDown);
        }

        match tokio::time::timeout(deadline, &mut response).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(PoolError::WorkerPanicked { name }),
            Err(_) => self.abandon(name, deadline, &state, response).await,
        }
    }

    /// Give up on a running job and hand its slot to a fresh worker.
    async fn abandon(
        &self,
        name: String,
        deadline: Duration,
        state: &AtomicU8,
        response: oneshot::Receiver<Result<Asset, PoolError>>,
    ) -> Result<Asset, PoolError> {
        let handler = match (self.factory)() {
            Ok(handler) => handler,
            Err(err) => {
                log::warn!(
                    "{name}: classification exceeded {deadline:?}; no replacement worker ({err})"
                );
                return Err(PoolError::ClassificationTimeout { name, deadline });
            }
        };

        if state
            .compare_exchange(RUNNING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Finished while the replacement handler was being built.
            return response
                .await
                .unwrap_or(Err(PoolError::WorkerPanicked { name }));
        }

        log::warn!("{name}: classification exceeded {deadline:?}, replacing its worker");
        if let Err(err) = self.spawn_worker(handler) {
            log::error!("Pool shrinks by one: {err}");
        }
        Err(PoolError::ClassificationTimeout { name, deadline })
    }

    fn spawn_worker(&self, handler: Handler) -> Result<(), PoolError> {
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        let worker = Worker {
            index,
            handler,
            factory: Arc::clone(&self.factory),
            receiver: Arc::clone(&self.receiver),
            idle: Arc::clone(&self.idle),
        };

        self.idle.fetch_add(1, Ordering::SeqCst);
        let spawned = std::thread::Builder::new()
            .name(format!("buildscope-classify-{index}"))
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => {
                lock(&self.workers).push(handle);
                Ok(())
            }
            Err(err) => {
                self.idle.fetch_sub(1, Ordering::SeqCst);
                Err(PoolError::WorkerStart(err.to_string()))
            }
        }
    }

    /// Stop accepting work and wait for the workers to exit, including
    /// retired ones still finishing an abandoned job. Idempotent.
    pub fn shutdown(&self) {
        let Some(sender) = lock(&self.sender).take() else {
            return;
        };
        drop(sender);

        let workers = std::mem::take(&mut *lock(&self.workers));
        for handle in workers {
            if handle.join().is_err() {
                log::warn!("Classification worker exited abnormally");
            }
        }
        log::debug!("Classification pool shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        lock(&self.sender).is_none()
    }
}

impl Drop for ClassifierPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    index: usize,
    handler: Handler,
    factory: HandlerFactory,
    receiver: Arc<Mutex<mpsc::Receiver<ClassifyJob>>>,
    idle: Arc<AtomicUsize>,
}

impl Worker {
    fn run(mut self) {
        loop {
            let job = lock(&self.receiver).recv();
            let Ok(ClassifyJob {
                request,
                started,
                state,
                reply,
            }) = job
            else {
                break;
            };
            if started.send(()).is_err() {
                log::debug!("{}: caller gone before pickup, skipping", request.name);
                continue;
            }

            self.idle.fetch_sub(1, Ordering::SeqCst);
            let name = request.name.clone();
            let outcome = catch_unwind(AssertUnwindSafe(|| (self.handler)(request)));
            let result = match outcome {
                Ok(result) => result.map_err(PoolError::from),
                Err(_) => {
                    log::error!("{name}: worker {} panicked", self.index);
                    self.rebuild_handler();
                    Err(PoolError::WorkerPanicked { name: name.clone() })
                }
            };

            if state
                .compare_exchange(RUNNING, FINISHED, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                log::debug!("{name}: finished after its deadline, worker {} retires", self.index);
                break;
            }
            self.idle.fetch_add(1, Ordering::SeqCst);
            let _ = reply.send(result);
        }
    }

    fn rebuild_handler(&mut self) {
        match (self.factory)() {
            Ok(handler) => self.handler = handler,
            Err(err) => log::error!("Worker {} keeps its old handler: {err}", self.index),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
