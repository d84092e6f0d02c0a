/// Popup UI for Site Block

use patternfly_yew::prelude::*;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::bridge;
use crate::config::Settings;
use crate::controller::{BlockingState, CurrentTab};
use crate::hostname::{MatchPolicy, normalize_manual_input};
use crate::messages::Request;
use crate::ui::components::{EnableToggle, SiteItem};

#[derive(Clone, PartialEq)]
enum PopupState {
    Loading,
    Idle,
    Error(String),
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| PopupState::Loading);
    let current_host = use_state(|| None::<String>);
    let blocking = use_state(|| None::<BlockingState>);
    let settings = use_state(Settings::default);
    let manual_input = use_state(String::new);
    let input_error = use_state(|| false);

    // Reload blocked sites, the enabled flag and the settings
    let refresh = {
        let state = state.clone();
        let blocking = blocking.clone();
        let settings = settings.clone();

        Callback::from(move |_: ()| {
            let state = state.clone();
            let blocking = blocking.clone();
            let settings = settings.clone();

            spawn_local(async move {
                match send::<Settings>(&Request::GetSettings).await {
                    Ok(loaded) => settings.set(loaded),
                    Err(e) => log::warn!("Using default settings: {}", e),
                }

                match send::<BlockingState>(&Request::GetBlockedSites).await {
                    Ok(loaded) => {
                        blocking.set(Some(loaded));
                        state.set(PopupState::Idle);
                    }
                    Err(e) => {
                        state.set(PopupState::Error(format!("Failed to load: {}", e)));
                    }
                }
            });
        })
    };

    // Send a command, then reload
    let run = {
        let state = state.clone();
        let refresh = refresh.clone();

        Callback::from(move |request: Request| {
            let state = state.clone();
            let refresh = refresh.clone();

            spawn_local(async move {
                match send::<serde_json::Value>(&request).await {
                    Ok(_) => refresh.emit(()),
                    Err(e) => state.set(PopupState::Error(format!("Request failed: {}", e))),
                }
            });
        })
    };

    // Load the active tab and state on mount
    {
        let current_host = current_host.clone();
        let refresh = refresh.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                if let Ok(tab) = send::<CurrentTab>(&Request::GetCurrentTab).await {
                    current_host.set(tab.hostname);
                }
            });
            refresh.emit(());
            || ()
        });
    }

    let policy = settings.match_policy;
    let is_enabled = (*blocking).as_ref().map_or(true, |b| b.is_enabled);
    let is_current_blocked = match ((*current_host).as_ref(), (*blocking).as_ref()) {
        (Some(host), Some(b)) => b.blocked_sites.is_blocked(host, policy),
        _ => false,
    };

    let on_toggle = {
        let run = run.clone();
        Callback::from(move |_: ()| run.emit(Request::ToggleEnabled))
    };

    // Block or unblock the active tab's site
    let on_toggle_site = {
        let run = run.clone();
        let current_host = current_host.clone();

        Callback::from(move |_: MouseEvent| {
            let Some(hostname) = (*current_host).clone() else {
                return;
            };
            if is_current_blocked {
                run.emit(Request::RemoveSite { hostname });
            } else {
                run.emit(Request::AddSite { hostname });
            }
        })
    };

    let on_manual_input = {
        let manual_input = manual_input.clone();
        let input_error = input_error.clone();

        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                manual_input.set(input.value());
                input_error.set(false);
            }
        })
    };

    let add_manual = {
        let run = run.clone();
        let manual_input = manual_input.clone();
        let input_error = input_error.clone();

        Callback::from(move |_: ()| {
            if manual_input.trim().is_empty() {
                return;
            }
            match normalize_manual_input(&manual_input) {
                Ok(hostname) => {
                    manual_input.set(String::new());
                    run.emit(Request::AddSite { hostname });
                }
                Err(_) => input_error.set(true),
            }
        })
    };

    let on_manual_click = add_manual.reform(|_: MouseEvent| ());
    let on_manual_key = {
        let add_manual = add_manual.clone();
        Callback::from(move |e: KeyboardEvent| {
            if e.key() == "Enter" {
                add_manual.emit(());
            }
        })
    };

    let on_policy_change = {
        let run = run.clone();
        let settings = settings.clone();

        Callback::from(move |e: Event| {
            let Some(select) = e.target_dyn_into::<HtmlSelectElement>() else {
                return;
            };
            match select.value().parse::<MatchPolicy>() {
                Ok(match_policy) => run.emit(Request::UpdateSettings {
                    settings: Settings {
                        match_policy,
                        ..(*settings).clone()
                    },
                }),
                Err(e) => log::warn!("{}", e),
            }
        })
    };

    let on_remove = {
        let run = run.clone();
        Callback::from(move |hostname: String| run.emit(Request::RemoveSite { hostname }))
    };

    let on_reset = {
        let run = run.clone();
        Callback::from(move |hostname: String| run.emit(Request::ResetAttempts { hostname }))
    };

    let sites = (*blocking)
        .as_ref()
        .map(|b| b.blocked_sites.sorted_by_attempts())
        .unwrap_or_default();

    html! {
        <div class={classes!("container", (!is_enabled).then_some("disabled"))}>
            <div class="header">
                <h1 class="main-title">{"Site Block"}</h1>
                <EnableToggle enabled={is_enabled} onchange={on_toggle} />
            </div>

            // Status display
            {match &*state {
                PopupState::Loading => html! {
                    <div class="loading-text-center">
                        <Spinner />
                    </div>
                },
                PopupState::Error(err) => html! {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {err.clone()}
                    </Alert>
                },
                PopupState::Idle => html! {}
            }}

            // Current site
            <div class="current-site">
                <span class="current-site-name">
                    {(*current_host).as_deref().unwrap_or("Not a blockable page")}
                </span>
                <Button
                    onclick={on_toggle_site}
                    disabled={current_host.is_none()}
                    variant={if is_current_blocked { ButtonVariant::Secondary } else { ButtonVariant::Primary }}
                >
                    {if is_current_blocked { "➖ Unblock" } else { "➕ Block Site" }}
                </Button>
            </div>

            // Manual add
            <div class="manual-add">
                <input
                    type="text"
                    class={classes!("manual-input", input_error.then_some("error"))}
                    placeholder="example.com"
                    value={(*manual_input).clone()}
                    oninput={on_manual_input}
                    onkeypress={on_manual_key}
                />
                <Button onclick={on_manual_click}>{"Add"}</Button>
            </div>

            // Match policy
            <div class="policy">
                <label class="policy-label">{"Match"}</label>
                <select class="policy-select" onchange={on_policy_change}>
                    {for MatchPolicy::ALL.into_iter().map(|p| html! {
                        <option value={p.as_str()} selected={p == policy}>{p.label()}</option>
                    })}
                </select>
            </div>

            // Blocked sites
            <div class="sites">
                <h2 class="sites-title">
                    {format!("Blocked sites ({})", sites.len())}
                </h2>
                if sites.is_empty() {
                    <p class="empty-state">{"No sites blocked yet"}</p>
                } else {
                    {for sites.into_iter().map(|(hostname, entry)| html! {
                        <SiteItem
                            key={hostname.clone()}
                            hostname={hostname.clone()}
                            entry={entry}
                            on_remove={on_remove.clone()}
                            on_reset={on_reset.clone()}
                        />
                    })}
                }
            </div>
        </div>
    }
}

// Helper functions

async fn send<T: DeserializeOwned>(request: &Request) -> Result<T, String> {
    let request_js = serde_wasm_bindgen::to_value(request)
        .map_err(|e| format!("Failed to serialize: {:?}", e))?;

    let response_js: JsValue = bridge::sendMessage(request_js)
        .await
        .map_err(|e| format!("Failed to send: {:?}", e))?;

    serde_wasm_bindgen::from_value(response_js)
        .map_err(|e| format!("Failed to parse response: {:?}", e))
}
