use tokio::task::JoinHandle;

/// Owns at most one background task (reader, heartbeat, or reconnect timer).
///
/// Putting a new task into the slot aborts the previous one, so a channel can
/// never hold two live copies of the same timer.
#[derive(Default)]
pub struct TaskSlot {
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Spawn a task into the slot, aborting whatever was there
    pub fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.replace(tokio::spawn(future));
    }

    /// Track an already spawned task, aborting whatever was there
    pub fn replace(&mut self, handle: JoinHandle<()>) {
        self.abort();
        self.handle = Some(handle);
    }

    /// Abort the tracked task without waiting
    pub fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Forget the tracked task and let it run to completion.
    ///
    /// Used by a task that is clearing its own slot; aborting itself would
    /// cancel it at its next await point.
    pub fn detach(&mut self) {
        self.handle = None;
    }

    /// Whether a task is tracked and has not finished yet
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}
