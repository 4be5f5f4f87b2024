//! Periodic jobs with explicit registration.
//!
//! Jobs are registered once at startup as (interval, callback) pairs; each
//! runs on its own task, ticking on the runtime clock. There is no
//! annotation or container magic: whoever builds the system decides what
//! runs and how often.

use std::{future::Future, time::Duration};

use commonware_runtime::{Clock, Handle, Metrics, Spawner};

pub struct Scheduler<E>
where
    E: Spawner + Metrics + Clock + Clone,
{
    context: E,
    handles: Vec<Handle<()>>,
}

impl<E> Scheduler<E>
where
    E: Spawner + Metrics + Clock + Clone,
{
    pub fn new(context: E) -> Self {
        Self {
            context,
            handles: Vec::new(),
        }
    }

    /// Run `job` every `interval`, starting one interval from now.
    pub fn register<F, Fut>(&mut self, name: &str, interval: Duration, job: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = self
            .context
            .with_label(name)
            .spawn(move |context| async move {
                loop {
                    context.sleep(interval).await;
                    job().await;
                }
            });
        self.handles.push(handle);
    }

    pub fn jobs(&self) -> usize {
        self.handles.len()
    }

    /// Stop every registered job.
    pub fn abort(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl<E> Drop for Scheduler<E>
where
    E: Spawner + Metrics + Clock + Clone,
{
    fn drop(&mut self) {
        self.abort();
    }
}
