use std::future::Future;
use std::time::Duration;

use gymdash::runtime::Runtime;
use wasm_bindgen_futures::{spawn_local, JsFuture};

/// Browser event loop: tasks are promises, timers are `setTimeout`.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct WebRuntime;

impl Runtime for WebRuntime {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + 'static {
        let ms = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let Some(window) = web_sys::window() else {
                tracing::error!("no window; timer never fires");
                return;
            };
            if window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                .is_err()
            {
                tracing::error!(ms, "failed to arm timer");
            }
        });
        async move {
            let _ = JsFuture::from(promise).await;
        }
    }
}
