use std::{
    future::Future,
    sync::Arc,
    task::{Context, Poll},
    thread::{self, Thread},
    time::Duration,
};

use futures::task::{waker, ArcWake};

use crate::model::error::StoreError;

/// Upper bound on how long a pending future sleeps before it is polled again.
const PARK_TIMEOUT: Duration = Duration::from_millis(10);

/// Wakes the thread blocked in [`block_on`].
struct ThreadWaker {
    thread: Thread,
}

impl ArcWake for ThreadWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.thread.unpark();
    }
}

/// Runs `future` to completion on the calling thread.
///
/// SDK futures rely on the surrounding tokio runtime for their I/O, so this must
/// not run on a runtime worker thread. Async callers go through `spawn_blocking`.
/// A wake-up unparks the thread at once. Without one the future is re-polled
/// after [`PARK_TIMEOUT`].
pub fn block_on<Fut>(future: Fut) -> Fut::Output
where
    Fut: Future,
{
    let waker = waker(Arc::new(ThreadWaker {
        thread: thread::current(),
    }));
    let mut context = Context::from_waker(&waker);
    let mut future = std::pin::pin!(future);

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut context) {
            return output;
        }
        thread::park_timeout(PARK_TIMEOUT);
    }
}

/// [`block_on`] for a fallible SDK call, mapping its error into a [`StoreError`].
pub fn block_on_result<Fut, T, E>(future: Fut) -> Result<T, StoreError>
where
    Fut: Future<Output = Result<T, E>>,
    StoreError: From<E>,
{
    Ok(block_on(future)?)
}
