use crate::error::SchedulerError;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, Notify};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Shared {
    concurrency: usize,
    queue: Mutex<VecDeque<Job>>,
    in_flight: AtomicUsize,
    idle: Notify,
    slot_freed: Notify,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Concurrency-limited FIFO of asynchronous tasks.
///
/// At most `concurrency` tasks run at once; the rest wait in arrival order.
/// Every submission yields its own [`TaskHandle`], and a failing or panicking
/// task affects nobody else. There is no retry here. Must be used from within
/// a tokio runtime.
#[derive(Clone)]
pub struct TaskQueue {
    shared: Arc<Shared>,
}

/// Outcome of one submitted task.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, SchedulerError>>,
}

impl<T> TaskHandle<T> {
    pub async fn join(self) -> Result<T, SchedulerError> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(SchedulerError::TaskPanicked("task dropped".to_string())))
    }
}

impl TaskQueue {
    pub fn new(concurrency: usize) -> Result<Self, SchedulerError> {
        if concurrency < 1 {
            return Err(SchedulerError::InvalidConcurrency(concurrency));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                concurrency,
                queue: Mutex::new(VecDeque::new()),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                slot_freed: Notify::new(),
            }),
        })
    }

    pub fn concurrency(&self) -> usize {
        self.shared.concurrency
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Tasks admitted but not yet started.
    pub fn queued(&self) -> usize {
        self.shared.queue().len()
    }

    /// Run `task` now if a slot is free, otherwise queue it behind earlier submissions.
    pub fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            // Spawned separately so a panic stays inside this task.
            let outcome = tokio::spawn(task)
                .await
                .map_err(|e| SchedulerError::TaskPanicked(e.to_string()));
            let _ = tx.send(outcome);
        });
        self.admit(job);
        TaskHandle { rx }
    }

    /// Submit several tasks, preserving their relative order in the queue.
    pub fn submit_all<I, F, T>(&self, tasks: I) -> Vec<TaskHandle<T>>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        tasks.into_iter().map(|task| self.submit(task)).collect()
    }

    /// Resolves once nothing is running and nothing is queued.
    ///
    /// Work submitted while waiting extends the wait. "Drained" only means
    /// idle at that instant; submit more and drain again as needed.
    pub async fn drain(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Resolves as soon as a slot is available.
    pub async fn next_slot(&self) {
        loop {
            let notified = self.shared.slot_freed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() < self.shared.concurrency {
                return;
            }
            notified.await;
        }
    }

    pub fn is_idle(&self) -> bool {
        let queue = self.shared.queue();
        queue.is_empty() && self.shared.in_flight.load(Ordering::SeqCst) == 0
    }

    fn admit(&self, job: Job) {
        let mut queue = self.shared.queue();
        if self.shared.in_flight.load(Ordering::SeqCst) < self.shared.concurrency {
            self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
            drop(queue);
            tokio::spawn(run_slot(Arc::clone(&self.shared), job));
        } else {
            queue.push_back(job);
        }
    }
}

/// Occupies one slot, running queued jobs back to back until the queue is empty.
async fn run_slot(shared: Arc<Shared>, first: Job) {
    let mut job = first;
    loop {
        job.await;

        let next = {
            let mut queue = shared.queue();
            let next = queue.pop_front();
            if next.is_none() {
                shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            next
        };
        shared.slot_freed.notify_waiters();

        match next {
            Some(queued) => job = queued,
            None => {
                let idle = {
                    let queue = shared.queue();
                    queue.is_empty() && shared.in_flight.load(Ordering::SeqCst) == 0
                };
                if idle {
                    shared.idle.notify_waiters();
                }
                return;
            }
        }
    }
}
