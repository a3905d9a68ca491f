//! Runs suspending predicates to completion on behalf of the synchronous
//! driver.
//!
//! Each call gets its own single-use result slot (a bounded crossbeam
//! channel). The slot is filled exactly once by a [`Deposit`] guard that
//! travels with the spawned task: with the predicate's value, with the panic
//! it raised, with `Cancelled` when the run's token fires, or, from `Drop`,
//! with `Cancelled` when the task is torn down before finishing. A waiter is
//! therefore always released.
//!
//! Where the waiter blocks depends on the caller's context:
//!
//! * outside any tokio runtime, on the calling thread;
//! * on a multi-thread runtime, inside [`tokio::task::block_in_place`] so the
//!   worker's other tasks move to a fresh thread;
//! * on a current-thread runtime, on a fresh scoped thread, while the
//!   predicate still runs on the chosen scheduler. Only when that scheduler
//!   is itself a current-thread runtime, which nothing would drive while the
//!   caller waits, does the fresh thread run the predicate on a private one.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::OnceLock;
use std::task::{Context, Poll};

use crossbeam::channel::{self, Receiver, Sender};
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::cancel::CancelToken;
use crate::error::panic_message;

/// Thread name prefix of the shared scheduler
pub const SCHEDULER_THREAD_NAME: &str = "falsify-scheduler";

/// How a bridged predicate ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The predicate ran to completion
    Completed(T),
    /// The predicate panicked with this message
    Panicked(String),
    /// The run was cancelled or the task was torn down before finishing
    Cancelled,
    /// No scheduler could be started
    Unavailable(String),
}

static SHARED_RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();

fn shared_handle() -> Result<Handle, String> {
    SHARED_RUNTIME
        .get_or_init(|| {
            let workers = num_cpus::get().max(2);
            tracing::debug!(workers, "starting shared scheduler");
            Builder::new_multi_thread()
                .worker_threads(workers)
                .thread_name(SCHEDULER_THREAD_NAME)
                .enable_all()
                .build()
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map(|runtime| runtime.handle().clone())
        .map_err(Clone::clone)
}

#[derive(Debug, Clone)]
enum Scheduler {
    Shared,
    Handle(Handle),
}

/// Entry point for running futures from synchronous code
#[derive(Debug, Clone)]
pub struct Bridge {
    scheduler: Scheduler,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::shared()
    }
}

impl Bridge {
    /// Bridge onto the process-wide scheduler, started on first use
    pub fn shared() -> Self {
        Self {
            scheduler: Scheduler::Shared,
        }
    }

    /// Bridge onto an existing runtime
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            scheduler: Scheduler::Handle(handle),
        }
    }

    fn target(&self) -> Result<Handle, String> {
        match &self.scheduler {
            Scheduler::Shared => shared_handle(),
            Scheduler::Handle(handle) => Ok(handle.clone()),
        }
    }

    /// Run `future` to completion, blocking the caller until it finishes,
    /// panics, or `cancel` fires.
    pub fn run<F>(&self, future: F, cancel: &CancelToken) -> Outcome<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let flavor = Handle::try_current().ok().map(|current| current.runtime_flavor());
        match flavor {
            None => match self.target() {
                Ok(target) => launch(&target, future, cancel).wait(),
                Err(reason) => Outcome::Unavailable(reason),
            },
            Some(RuntimeFlavor::MultiThread) => match self.target() {
                Ok(target) => {
                    let pending = launch(&target, future, cancel);
                    tokio::task::block_in_place(move || pending.wait())
                }
                Err(reason) => Outcome::Unavailable(reason),
            },
            Some(_) => match self.target() {
                Ok(target) if matches!(target.runtime_flavor(), RuntimeFlavor::MultiThread) => {
                    wait_on_fresh_worker(launch(&target, future, cancel))
                }
                Ok(_) => run_on_private_runtime(future, cancel),
                Err(reason) => Outcome::Unavailable(reason),
            },
        }
    }
}

fn launch<F>(target: &Handle, future: F, cancel: &CancelToken) -> Pending<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (slot, receiver) = channel::bounded(1);
    let deposit = Deposit::new(slot);
    // Detached: the deposit, not the join handle, reports the outcome.
    drop(target.spawn(settle(future, cancel.clone(), deposit)));
    Pending { receiver }
}

fn wait_on_fresh_worker<T: Send>(pending: Pending<T>) -> Outcome<T> {
    tracing::trace!("caller is on a current-thread scheduler, waiting on a fresh worker");
    let joined = crossbeam::scope(|scope| scope.spawn(move |_| pending.wait()).join());
    match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(payload)) | Err(payload) => Outcome::Panicked(panic_message(payload.as_ref())),
    }
}

fn run_on_private_runtime<F>(future: F, cancel: &CancelToken) -> Outcome<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tracing::trace!("target scheduler is current-thread, driving the predicate privately");
    let cancel = cancel.clone();
    let joined = crossbeam::scope(|scope| {
        scope
            .spawn(move |_| {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => return Outcome::Unavailable(e.to_string()),
                };
                let (slot, receiver) = channel::bounded(1);
                runtime.block_on(settle(future, cancel, Deposit::new(slot)));
                Pending { receiver }.wait()
            })
            .join()
    });
    match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(payload)) | Err(payload) => Outcome::Panicked(panic_message(payload.as_ref())),
    }
}

async fn settle<F: Future>(future: F, cancel: CancelToken, deposit: Deposit<F::Output>) {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Outcome::Cancelled,
        caught = CatchUnwind::new(future) => match caught {
            Ok(value) => Outcome::Completed(value),
            Err(message) => Outcome::Panicked(message),
        },
    };
    deposit.fill(outcome);
}

struct Pending<T> {
    receiver: Receiver<Outcome<T>>,
}

impl<T> Pending<T> {
    fn wait(self) -> Outcome<T> {
        match self.receiver.recv() {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!("bridged task ended without depositing an outcome");
                Outcome::Cancelled
            }
        }
    }
}

/// Writes the slot exactly once, falling back to `Cancelled` on drop
struct Deposit<T> {
    slot: Option<Sender<Outcome<T>>>,
}

impl<T> Deposit<T> {
    fn new(slot: Sender<Outcome<T>>) -> Self {
        Self { slot: Some(slot) }
    }

    fn fill(mut self, outcome: Outcome<T>) {
        if let Some(slot) = self.slot.take() {
            // The waiter may be gone already; nothing to release then.
            let _ = slot.send(outcome);
        }
    }
}

impl<T> Drop for Deposit<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            let _ = slot.send(Outcome::Cancelled);
        }
    }
}

/// Catches panics raised while polling the wrapped future
struct CatchUnwind<F> {
    inner: Pin<Box<F>>,
}

impl<F> CatchUnwind<F> {
    fn new(future: F) -> Self {
        Self {
            inner: Box::pin(future),
        }
    }
}

impl<F: Future> Future for CatchUnwind<F> {
    type Output = Result<F::Output, String>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.get_mut().inner.as_mut();
        match std::panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(value)) => Poll::Ready(Ok(value)),
            Err(payload) => Poll::Ready(Err(panic_message(payload.as_ref()))),
        }
    }
}
