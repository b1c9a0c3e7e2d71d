use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gymdash::api::http::HttpBackend;
use gymdash::config_sync::SaveTarget;
use gymdash::runtime::Runtime;
use gymdash::session::{Input, NoticeLevel};
use gymdash::shell::Dashboard;
use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::events::{self, Click, TOKEN_FORM_ID};
use crate::snapshot::{LogCursor, Snapshot};

mod console;
mod dom;
mod modals;
mod runtime;
mod shell;

use dom::{DomHost, CONTENT_ID};
use modals::{CharacterModal, TooltipModal};
use runtime::WebRuntime;
use shell::{Nav, ToastStack, Topbar, VideoFeed};

/// How often state changed by background tasks is copied to the page.
const SYNC_INTERVAL_MS: i32 = 250;
const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Toast {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
}

struct WebApp {
    dashboard: Dashboard<HttpBackend, WebRuntime, DomHost>,
    logs: RefCell<LogCursor>,
}

/// Everything an event handler needs: the app and the signals it renders
/// into.
#[derive(Clone, Copy)]
pub(crate) struct Dispatcher {
    app: StoredValue<Rc<WebApp>, LocalStorage>,
    snapshot: RwSignal<Snapshot>,
    toasts: RwSignal<Vec<Toast>>,
    next_toast: StoredValue<u64>,
}

impl Dispatcher {
    /// Routes one input to the dashboard, then refreshes the page.
    pub(crate) fn send(self, input: Input) {
        let Some(app) = self.app.try_get_value() else {
            return;
        };
        let navigation = matches!(input, Input::Navigate(_));
        spawn_local(async move {
            if navigation {
                app.logs.borrow_mut().reset();
            }
            if let Err(e) = app.dashboard.dispatch(input).await {
                tracing::debug!(error = %e, "input rejected");
            }
            self.sync(&app, true);
        });
    }

    fn save(self) {
        let Some(app) = self.app.try_get_value() else {
            return;
        };
        let needs_name = app
            .dashboard
            .session()
            .with(|s| matches!(s.selector.save_target(), Ok(SaveTarget::New)));
        let prompted_name = if needs_name {
            let answer = web_sys::window()
                .and_then(|w| w.prompt_with_message("Enter a name for the new configuration:").ok())
                .flatten();
            if answer.is_none() {
                return;
            }
            answer
        } else {
            None
        };
        self.send(Input::SaveConfig { prompted_name });
    }

    /// Copies session state to signals and into the mounted fragment.
    fn sync(self, app: &WebApp, render_form: bool) {
        let session = app.dashboard.session();
        let snapshot = session.with(Snapshot::of);
        dom::render_page(&snapshot);
        if self.snapshot.with_untracked(|s| *s != snapshot) {
            self.snapshot.set(snapshot);
        }

        let delta = session.with(|s| app.logs.borrow_mut().catch_up(s));
        if let Some(delta) = delta {
            dom::append_logs(delta);
        }
        if render_form {
            session.with(|s| dom::render_form(&s.form));
        }

        for notice in session.take_notices() {
            self.toast(notice.level, notice.text);
        }
    }

    fn toast(self, level: NoticeLevel, message: String) {
        let id = self.next_toast.get_value();
        self.next_toast.set_value(id + 1);
        self.toasts.update(|ts| ts.push(Toast { id, level, message }));

        let toasts = self.toasts;
        spawn_local(async move {
            WebRuntime.sleep(TOAST_TTL).await;
            toasts.update(|ts| ts.retain(|t| t.id != id));
        });
    }

    fn tick(self) {
        if let Some(app) = self.app.try_get_value() {
            self.sync(&app, false);
        }
    }
}

pub fn start() {
    console::init();
    mount_to_body(|| view! { <App /> });
}

fn start_sync_loop(dispatch: Dispatcher) {
    let Some(window) = web_sys::window() else {
        tracing::error!("no window; page will not refresh");
        return;
    };
    let cb = Closure::wrap(Box::new(move || dispatch.tick()) as Box<dyn FnMut()>);
    match window.set_interval_with_callback_and_timeout_and_arguments_0(
        cb.as_ref().unchecked_ref(),
        SYNC_INTERVAL_MS,
    ) {
        Ok(_) => cb.forget(),
        Err(_) => tracing::error!("failed to start refresh interval"),
    }
}

#[component]
fn App() -> impl IntoView {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default();
    let backend = match HttpBackend::new(&origin) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(origin, error = %e, "cannot address the dashboard server");
            return view! { <p class="error">"Cannot reach the dashboard server."</p> }.into_any();
        }
    };

    let dashboard = Dashboard::new(Rc::new(backend), WebRuntime, DomHost);
    let initial = dashboard.session().with(Snapshot::of);
    let app = Rc::new(WebApp {
        dashboard,
        logs: RefCell::new(LogCursor::default()),
    });
    let dispatch = Dispatcher {
        app: StoredValue::new_local(Rc::clone(&app)),
        snapshot: RwSignal::new(initial),
        toasts: RwSignal::new(Vec::new()),
        next_toast: StoredValue::new(0),
    };

    let snapshot = dispatch.snapshot;
    let header = Memo::new(move |_| snapshot.with(|s| s.header.clone()));
    let content = Memo::new(move |_| snapshot.with(|s| s.content.clone()));
    let characters = Memo::new(move |_| snapshot.with(|s| s.characters.clone()));
    let tooltip = Memo::new(move |_| snapshot.with(|s| s.tooltip.clone()));

    let content_ref = NodeRef::<leptos::html::Div>::new();
    Effect::new(move |_| {
        let Some(container) = content_ref.get() else {
            return;
        };
        // Scroll does not bubble; listen in the capture phase.
        let on_scroll = Closure::wrap(Box::new(move |ev: web_sys::Event| {
            if let Some((height, top, client)) = dom::log_scroll(&ev) {
                dispatch.send(Input::LogScrolled {
                    at_bottom: events::at_bottom(height, top, client),
                });
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        if container
            .add_event_listener_with_callback_and_bool("scroll", on_scroll.as_ref().unchecked_ref(), true)
            .is_ok()
        {
            on_scroll.forget();
        }
    });

    spawn_local(async move {
        if let Err(e) = app.dashboard.boot().await {
            tracing::warn!(error = %e, "initial page failed to load");
        }
        dispatch.sync(&app, true);
        start_sync_loop(dispatch);
    });

    view! {
        <div class="app">
            <Topbar header=header dispatch=dispatch />
            <Nav content=content dispatch=dispatch />
            <main class="app-main">
                <VideoFeed header=header />
                <div
                    id=CONTENT_ID
                    node_ref=content_ref
                    on:change=move |ev| {
                        if let Some(input) = dom::target_of(&ev, None).and_then(|t| events::on_change(&t)) {
                            dispatch.send(input);
                        }
                    }
                    on:click=move |ev| {
                        let target = dom::target_of(&ev, Some("button, a, input, .tooltip-icon"));
                        match target.and_then(|t| events::on_click(&t)) {
                            Some(Click::Input(input)) => {
                                ev.prevent_default();
                                dispatch.send(input);
                            }
                            Some(Click::Save) => {
                                ev.prevent_default();
                                dispatch.save();
                            }
                            None => {}
                        }
                    }
                    on:submit=move |ev| {
                        let from_token_form = dom::target_of(&ev, None)
                            .is_some_and(|t| t.id.as_deref() == Some(TOKEN_FORM_ID));
                        if from_token_form {
                            ev.prevent_default();
                            dispatch.send(Input::SaveToken(dom::token_value()));
                        }
                    }
                ></div>
            </main>
            <CharacterModal state=characters dispatch=dispatch />
            <TooltipModal card=tooltip dispatch=dispatch />
            <ToastStack toasts=dispatch.toasts />
        </div>
    }
    .into_any()
}
