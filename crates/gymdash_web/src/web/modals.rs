use gymdash::session::Input;
use gymdash::tooltips::TooltipCard;
use leptos::prelude::*;

use super::Dispatcher;
use crate::snapshot::CharacterState;

#[component]
pub(super) fn CharacterModal(state: Memo<CharacterState>, dispatch: Dispatcher) -> impl IntoView {
    let open = Memo::new(move |_| state.get().open);

    view! {
        <Show when=move || open.get()>
            <div id="character-modal" class="modal-backdrop">
                <div class="modal" role="dialog" aria-modal="true">
                    <div class="modal-header">
                        <h3>"Select Characters"</h3>
                        <button
                            class="icon-btn"
                            title="Close"
                            on:click=move |_| dispatch.send(Input::CloseCharacterModal)
                        >
                            "×"
                        </button>
                    </div>
                    <p id="selection-instructions">{move || state.get().instructions}</p>
                    <div id="character-list" class="character-list">
                        <For
                            each=move || state.get().entries
                            key=|e| (e.name.clone(), e.picked, e.disabled)
                            children=move |entry| {
                                let name = entry.name.clone();
                                let input_type = if state.get_untracked().multi { "checkbox" } else { "radio" };
                                view! {
                                    <label class="character-option">
                                        <input
                                            type=input_type
                                            name="character"
                                            value=entry.name.clone()
                                            prop:checked=entry.picked
                                            disabled=entry.disabled
                                            on:change=move |_| dispatch.send(Input::ToggleCharacter(name.clone()))
                                        />
                                        " "
                                        {entry.name}
                                    </label>
                                }
                            }
                        />
                    </div>
                    <p id="selection-order">{move || state.get().order}</p>
                    <button
                        id="confirm-character-selection"
                        class="btn"
                        disabled=move || !state.get().confirm_enabled
                        on:click=move |_| dispatch.send(Input::ConfirmCharacters)
                    >
                        "Confirm"
                    </button>
                </div>
            </div>
        </Show>
    }
}

#[component]
pub(super) fn TooltipModal(card: Memo<Option<TooltipCard>>, dispatch: Dispatcher) -> impl IntoView {
    view! {
        <Show when=move || card.get().is_some()>
            {move || {
                card.get()
                    .map(|c| {
                        view! {
                            <div
                                id="tooltip-modal"
                                class="modal-backdrop"
                                on:click=move |_| dispatch.send(Input::CloseTooltip)
                            >
                                <div class="modal tooltip-card" on:click=|ev| ev.stop_propagation()>
                                    <div class="modal-header">
                                        <h3>{c.title}</h3>
                                        <button
                                            class="icon-btn"
                                            title="Close"
                                            on:click=move |_| dispatch.send(Input::CloseTooltip)
                                        >
                                            "×"
                                        </button>
                                    </div>
                                    <p class="tooltip-description">{c.description}</p>
                                    <div class="tooltip-example">
                                        <strong>"Example: "</strong>
                                        {c.example}
                                    </div>
                                    <div class="tooltip-pro-tip">
                                        <strong>"Pro tip: "</strong>
                                        {c.pro_tip}
                                    </div>
                                </div>
                            </div>
                        }
                    })
            }}
        </Show>
    }
}
