use std::sync::mpsc::SyncSender;

/// Work handed to the execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub enum Message {
    /// Run the job, then signal `done`.
    Run(Job, SyncSender<()>),
    Quit,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Run(..) => f.write_str("Run"),
            Self::Quit => f.write_str("Quit"),
        }
    }
}
