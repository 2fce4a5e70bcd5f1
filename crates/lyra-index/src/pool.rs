//! Fixed worker pool for extraction and store writes.

use std::any::Any;

use rayon::ThreadPool;

pub(crate) enum WorkerPool {
    Rayon(ThreadPool),
    Inline,
}

impl WorkerPool {
    /// Build a pool of roughly `threads` workers.
    ///
    /// Thread creation can fail in constrained environments (low
    /// `RLIMIT_NPROC`, `EAGAIN`). Retry with smaller pools and finally fall
    /// back to inline execution instead of failing startup.
    pub(crate) fn build(threads: usize) -> WorkerPool {
        let mut threads = threads.max(1);
        loop {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|idx| format!("lyra-index-{idx}"))
                .build()
            {
                Ok(pool) => return WorkerPool::Rayon(pool),
                Err(_) if threads > 1 => {
                    threads = (threads / 2).max(1);
                }
                Err(_) => return WorkerPool::Inline,
            }
        }
    }

    /// Run `job` on a worker (or inline when no pool exists). Panics are
    /// caught and logged so one bad artifact cannot take a worker down.
    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let job = move || {
            if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
                tracing::error!(
                    target = "lyra.index",
                    panic = %panic_payload_to_str(&*panic),
                    "index job panicked"
                );
            }
        };
        match self {
            WorkerPool::Rayon(pool) => pool.spawn(job),
            WorkerPool::Inline => job(),
        }
    }
}

fn panic_payload_to_str(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
