//! Training log pane fed by the backend's event stream.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::api::{Backend, LogSource};
use crate::runtime::Runtime;
use crate::session::{Armed, Component, Session, TaskSlot};

pub const LOG_CAPACITY: usize = 2000;

/// Bounded tail of log lines. While following, the host keeps the pane
/// scrolled to the newest line; scrolling up pauses that until the user
/// returns to the bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogView {
    lines: VecDeque<String>,
    capacity: usize,
    following: bool,
    dropped: u64,
}

impl Default for LogView {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl LogView {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            following: true,
            dropped: 0,
        }
    }

    /// Appends a line, dropping the oldest past capacity. Returns whether the
    /// host should scroll to the bottom.
    pub fn push(&mut self, line: impl Into<String>) -> bool {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line.into());
        self.following
    }

    pub fn scrolled(&mut self, at_bottom: bool) {
        self.following = at_bottom;
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines evicted since the view was created.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

pub struct LogStreamer<B, R> {
    session: Session,
    backend: Rc<B>,
    runtime: R,
}

impl<B, R: Clone> Clone for LogStreamer<B, R> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            backend: Rc::clone(&self.backend),
            runtime: self.runtime.clone(),
        }
    }
}

impl<B, R> LogStreamer<B, R>
where
    B: Backend + 'static,
    R: Runtime,
{
    pub fn new(session: Session, backend: Rc<B>, runtime: R) -> Self {
        Self {
            session,
            backend,
            runtime,
        }
    }

    /// Opens the stream in the background. The task runs until the stream
    /// ends or the component is detached.
    pub fn attach(&self) {
        let armed = self.session.update(|s| {
            s.attach(Component::LogStream);
            s.arm(TaskSlot::LogStream)
        });
        let this = self.clone();
        self.runtime.spawn(async move { this.stream(armed).await });
    }

    pub fn detach(&self) {
        self.session.update(|s| {
            s.detach(Component::LogStream);
            s.disarm(TaskSlot::LogStream);
        });
    }

    async fn stream(self, armed: Armed) {
        match self.backend.open_log_stream().await {
            Ok(mut source) => {
                tracing::debug!("log stream opened");
                // A pending read is abandoned on detach so the connection
                // closes even when the server is quiet.
                loop {
                    match armed.token.run_until_cancelled(source.next_line()).await {
                        Some(Some(Ok(line))) => {
                            self.session.update(|s| s.logs.push(line));
                        }
                        Some(Some(Err(e))) => {
                            tracing::warn!(error = %e, "log stream failed");
                            break;
                        }
                        Some(None) => {
                            tracing::info!("log stream closed by server");
                            break;
                        }
                        None => {
                            tracing::debug!("log stream detached");
                            break;
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not open log stream"),
        }
        self.session
            .borrow_mut()
            .release(TaskSlot::LogStream, armed.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints;
    use crate::runtime::TokioRuntime;
    use crate::testing::{advance, local, settle, Call, FakeBackend};
    use std::time::Duration;

    #[test]
    fn oldest_lines_drop_past_capacity() {
        let mut view = LogView::with_capacity(3);
        for n in 0..5 {
            view.push(format!("step {n}"));
        }
        assert_eq!(view.lines().collect::<Vec<_>>(), vec!["step 2", "step 3", "step 4"]);
        assert_eq!(view.dropped(), 2);
    }

    #[test]
    fn scrolling_up_pauses_follow() {
        let mut view = LogView::default();
        assert!(view.push("a"));
        view.scrolled(false);
        assert!(!view.push("b"));
        view.scrolled(true);
        assert!(view.push("c"));
    }

    #[tokio::test]
    async fn test_stream_appends_lines_and_releases_slot() {
        local(async {
            let session = Session::new();
            let backend = Rc::new(FakeBackend::new());
            backend.stream_lines(&["Episode 1 reward 3.5", "Episode 2 reward 4.0"]);
            let streamer = LogStreamer::new(session.clone(), Rc::clone(&backend), TokioRuntime);

            streamer.attach();
            settle().await;
            session.with(|s| {
                assert_eq!(s.logs.len(), 2);
                assert_eq!(s.logs.lines().last(), Some("Episode 2 reward 4.0"));
                assert!(!s.is_armed(TaskSlot::LogStream));
            });
            assert_eq!(backend.count(|c| *c == Call::OpenLogStream), 1);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_closes_a_quiet_stream() {
        local(async {
            let session = Session::new();
            let backend = Rc::new(FakeBackend::new());
            backend.hold_streams();
            let streamer = LogStreamer::new(session.clone(), Rc::clone(&backend), TokioRuntime);

            for _ in 0..5 {
                streamer.attach();
                settle().await;
                assert_eq!(backend.open_streams(), 1);
                streamer.detach();
                settle().await;
            }
            advance(Duration::from_secs(60)).await;

            assert_eq!(backend.count(|c| *c == Call::OpenLogStream), 5);
            assert_eq!(backend.open_streams(), 0);
            assert!(!session.with(|s| s.is_armed(TaskSlot::LogStream)));
        })
        .await;
    }

    #[tokio::test]
    async fn test_open_failure_is_logged_only() {
        local(async {
            let session = Session::new();
            let backend = Rc::new(FakeBackend::new());
            backend.fail_status(endpoints::STREAM_LOGS, 500, None);
            let streamer = LogStreamer::new(session.clone(), Rc::clone(&backend), TokioRuntime);

            streamer.attach();
            settle().await;
            assert!(session.with(|s| s.logs.is_empty() && s.notices().is_empty()));
        })
        .await;
    }

    #[tokio::test]
    async fn test_detach_before_first_line_appends_nothing() {
        local(async {
            let session = Session::new();
            let backend = Rc::new(FakeBackend::new());
            backend.stream_lines(&["late"]);
            let streamer = LogStreamer::new(session.clone(), Rc::clone(&backend), TokioRuntime);

            streamer.attach();
            streamer.detach();
            settle().await;
            assert!(session.with(|s| s.logs.is_empty()));
        })
        .await;
    }
}
