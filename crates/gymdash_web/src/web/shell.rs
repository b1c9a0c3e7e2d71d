use gymdash::session::{Content, Input, NoticeLevel};
use gymdash::ui_model::Page;
use leptos::prelude::*;

use super::{Dispatcher, Toast};
use crate::snapshot::HeaderState;

/// MJPEG stream served while the environment renders.
const VIDEO_FEED: &str = "/video_feed";

#[component]
pub(super) fn Topbar(header: Memo<HeaderState>, dispatch: Dispatcher) -> impl IntoView {
    view! {
        <header class="app-header">
            <div class="app-header-left">
                <h1 class="brand">"Gym Dashboard"</h1>
                <span
                    id="status"
                    class="status"
                    style=move || format!("color: {};", header.get().color)
                >
                    {move || header.get().label}
                </span>
            </div>
            <div class="app-header-right">
                <button
                    id="start-training"
                    class="btn"
                    disabled=move || !header.get().start_enabled
                    on:click=move |_| dispatch.send(Input::StartTraining)
                >
                    "Start Training"
                </button>
                <button
                    id="stop-training"
                    class="btn"
                    disabled=move || !header.get().stop_enabled
                    on:click=move |_| dispatch.send(Input::StopTraining)
                >
                    "Stop Training"
                </button>
            </div>
        </header>
    }
}

#[component]
pub(super) fn VideoFeed(header: Memo<HeaderState>) -> impl IntoView {
    let visible = Memo::new(move |_| header.get().feed_visible);
    view! {
        <div class="video-panel">
            <Show
                when=move || visible.get()
                fallback=|| view! { <div id="video-placeholder" class="video-placeholder">"No live feed"</div> }
            >
                <img id="video-feed" class="video-feed" src=VIDEO_FEED alt="Live environment feed" />
            </Show>
        </div>
    }
}

#[component]
pub(super) fn Nav(content: Memo<Content>, dispatch: Dispatcher) -> impl IntoView {
    view! {
        <nav class="app-nav">
            {Page::all()
                .iter()
                .copied()
                .map(|page| {
                    let class = move || {
                        if content.get() == Content::Page(page) { "nav-link active" } else { "nav-link" }
                    };
                    view! {
                        <a
                            id=page.link_id()
                            class=class
                            href="#"
                            on:click=move |ev| {
                                ev.prevent_default();
                                dispatch.send(Input::Navigate(page));
                            }
                        >
                            {page.label()}
                        </a>
                    }
                })
                .collect_view()}
        </nav>
    }
}

#[component]
pub(super) fn ToastStack(toasts: RwSignal<Vec<Toast>>) -> impl IntoView {
    view! {
        <div class="toast-stack" aria-live="polite" aria-relevant="additions removals">
            <For
                each=move || toasts.get()
                key=|t| t.id
                children=move |t| {
                    let id = t.id;
                    let class = match t.level {
                        NoticeLevel::Info => "toast info",
                        NoticeLevel::Success => "toast success",
                        NoticeLevel::Warning => "toast warning",
                        NoticeLevel::Error => "toast error",
                    };
                    view! {
                        <div class=class>
                            <div style="flex: 1; white-space: pre-wrap;">{t.message}</div>
                            <button
                                class="toast-close"
                                title="Dismiss"
                                on:click=move |_| toasts.update(|ts| ts.retain(|x| x.id != id))
                            >
                                "×"
                            </button>
                        </div>
                    }
                }
            />
        </div>
    }
}
