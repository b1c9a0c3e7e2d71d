//! Training and render status polling for the header controls.
//!
//! Two independent tasks share the session: the training poll (every
//! [`TRAINING_POLL_INTERVAL`], first request immediately on attach) and the
//! render poll, which runs only while training is active and stops as soon as
//! the backend reports frames are being rendered. Both check their
//! cancellation token before each request and after each sleep; a request in
//! flight is never aborted.

use std::rc::Rc;
use std::time::Duration;

use crate::api::{Backend, RenderStatus, TrainingStatus};
use crate::error::{ApiError, DashError};
use crate::runtime::Runtime;
use crate::session::{Armed, Component, NoticeLevel, Session, TaskSlot};

pub const TRAINING_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const RENDER_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const RENDER_RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub const RUNNING_COLOR: &str = "#28a745";
pub const STOPPED_COLOR: &str = "#007BFF";

/// Header mirror of the backend's training and render flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusView {
    pub training: bool,
    pub rendering: bool,
    /// A start request is in flight.
    pub start_pending: bool,
}

impl StatusView {
    pub fn set(&mut self, training: bool, rendering: bool) {
        self.training = training;
        self.rendering = rendering;
    }

    pub fn label(&self) -> &'static str {
        if self.training {
            "Running"
        } else {
            "Stopped"
        }
    }

    pub fn color(&self) -> &'static str {
        if self.training {
            RUNNING_COLOR
        } else {
            STOPPED_COLOR
        }
    }

    pub fn start_enabled(&self) -> bool {
        !self.training && !self.start_pending
    }

    pub fn stop_enabled(&self) -> bool {
        self.training
    }

    /// Live feed shown instead of the placeholder.
    pub fn feed_visible(&self) -> bool {
        self.rendering
    }

    pub fn document_title(&self) -> &'static str {
        if self.training {
            "Training in Progress"
        } else {
            "Training Stopped"
        }
    }
}

pub struct StatusPoller<B, R> {
    session: Session,
    backend: Rc<B>,
    runtime: R,
}

impl<B, R: Clone> Clone for StatusPoller<B, R> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            backend: Rc::clone(&self.backend),
            runtime: self.runtime.clone(),
        }
    }
}

impl<B, R> StatusPoller<B, R>
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

    /// Resets the header to "Stopped" and starts the training poll.
    pub fn attach(&self) {
        self.detach();
        self.session.update(|s| {
            s.attach(Component::StatusPoller);
            s.status.set(false, false);
        });
        self.arm_training_poll();
    }

    pub fn detach(&self) {
        self.session.update(|s| {
            s.detach(Component::StatusPoller);
            s.disarm(TaskSlot::TrainingPoll);
            s.disarm(TaskSlot::RenderPoll);
        });
    }

    fn arm_training_poll(&self) {
        let armed = self.session.borrow_mut().arm(TaskSlot::TrainingPoll);
        let this = self.clone();
        self.runtime.spawn(async move { this.training_loop(armed).await });
    }

    fn arm_render_poll(&self) {
        let armed = self.session.borrow_mut().arm(TaskSlot::RenderPoll);
        let this = self.clone();
        self.runtime.spawn(async move { this.render_loop(armed).await });
    }

    async fn training_loop(self, armed: Armed) {
        while !armed.token.is_cancelled() {
            self.poll_training().await;
            if armed.token.is_cancelled() {
                break;
            }
            self.runtime.sleep(TRAINING_POLL_INTERVAL).await;
        }
        self.session
            .borrow_mut()
            .release(TaskSlot::TrainingPoll, armed.id);
        tracing::debug!("training poll finished");
    }

    async fn render_loop(self, armed: Armed) {
        while !armed.token.is_cancelled() {
            if !self.session.with(|s| s.status.training) {
                break;
            }
            let delay = match self.backend.render_status().await {
                Ok(RenderStatus { rendering }) => {
                    if armed.token.is_cancelled() {
                        break;
                    }
                    self.session.update(|s| {
                        if s.status.training {
                            s.status.rendering = rendering;
                        }
                    });
                    if rendering {
                        tracing::debug!("rendering started");
                        break;
                    }
                    RENDER_POLL_INTERVAL
                }
                Err(e) => {
                    tracing::debug!(error = %e, "render status check failed; retrying");
                    RENDER_RETRY_INTERVAL
                }
            };
            self.runtime.sleep(delay).await;
        }
        self.session
            .borrow_mut()
            .release(TaskSlot::RenderPoll, armed.id);
    }

    /// One training-status round trip. Returns the reported flag, or `None`
    /// when the poll failed (the header then reads "Stopped").
    pub async fn poll_training(&self) -> Option<bool> {
        match self.backend.training_status().await {
            Ok(TrainingStatus { training }) => {
                tracing::debug!(training, "polled training status");
                let start_render = self.session.update(|s| {
                    let rendering = training && s.status.rendering;
                    s.status.set(training, rendering);
                    if !training {
                        s.disarm(TaskSlot::TrainingPoll);
                        s.disarm(TaskSlot::RenderPoll);
                    }
                    training && !rendering && !s.is_armed(TaskSlot::RenderPoll)
                });
                if start_render {
                    self.arm_render_poll();
                }
                Some(training)
            }
            Err(e) => {
                tracing::warn!(error = %e, "training status poll failed");
                self.session.update(|s| s.status.set(false, false));
                None
            }
        }
    }

    pub async fn start_training(&self) -> Result<(), DashError> {
        let config = self.session.update(|s| {
            s.status.start_pending = true;
            s.form.collect()
        });
        tracing::info!("starting training");
        let result = self.backend.start_training(&config).await;
        self.session.update(|s| s.status.start_pending = false);

        match result {
            Ok(reply) => {
                self.session.update(|s| {
                    s.status.set(true, false);
                    s.notify(
                        NoticeLevel::Success,
                        reply.message_or("Training started successfully!"),
                    );
                });
                self.arm_render_poll();
                self.arm_training_poll();
                Ok(())
            }
            Err(e) => {
                self.session
                    .notify_failure(&e, || failure_text(&e, "Failed to start training."));
                Err(e.into())
            }
        }
    }

    /// Flips the header to "Stopped", asks the backend to stop, then confirms
    /// with one training poll. Both polls are cancelled unless the backend
    /// still reports training.
    pub async fn stop_training(&self) -> Result<(), DashError> {
        self.session.update(|s| s.status.set(false, false));
        tracing::info!("stopping training");
        let result = match self.backend.stop_training().await {
            Ok(reply) => {
                self.session.notify(
                    NoticeLevel::Success,
                    reply.message_or("Training stopped successfully!"),
                );
                Ok(())
            }
            Err(e) => {
                self.session
                    .notify_failure(&e, || failure_text(&e, "Failed to stop training."));
                Err(e.into())
            }
        };

        if self.poll_training().await != Some(true) {
            self.session.update(|s| {
                s.disarm(TaskSlot::TrainingPoll);
                s.disarm(TaskSlot::RenderPoll);
            });
        }
        result
    }
}

/// `Error: <server message>` for rejected requests, `fallback` otherwise.
pub(crate) fn failure_text(error: &ApiError, fallback: &str) -> String {
    match error {
        ApiError::Status { message, status, .. } => match message {
            Some(message) => format!("Error: {message}"),
            None => format!("Error: HTTP {status}"),
        },
        ApiError::Transport { .. } | ApiError::Malformed { .. } => fallback.to_string(),
    }
}
