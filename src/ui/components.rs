/// Reusable UI components

use patternfly_yew::prelude::*;
use yew::prelude::*;

use crate::block_list::BlockEntry;

/// "1 attempt" / "N attempts"
pub fn attempts_label(attempts: u32) -> String {
    if attempts == 1 {
        "1 attempt".to_string()
    } else {
        format!("{} attempts", attempts)
    }
}

#[derive(Properties, PartialEq)]
pub struct EnableToggleProps {
    pub enabled: bool,
    pub onchange: Callback<()>,
    #[prop_or(false)]
    pub disabled: bool,
}

#[function_component(EnableToggle)]
pub fn enable_toggle(props: &EnableToggleProps) -> Html {
    let onchange = props.onchange.reform(|_: Event| ());

    html! {
        <label class="toggle">
            <input
                type="checkbox"
                checked={props.enabled}
                disabled={props.disabled}
                {onchange}
            />
            <span class={classes!("toggle-label", props.enabled.then_some("active"))}>
                {if props.enabled { "ON" } else { "OFF" }}
            </span>
        </label>
    }
}

#[derive(Properties, PartialEq)]
pub struct SiteItemProps {
    pub hostname: String,
    pub entry: BlockEntry,
    pub on_remove: Callback<String>,
    pub on_reset: Callback<String>,
}

#[function_component(SiteItem)]
pub fn site_item(props: &SiteItemProps) -> Html {
    let on_remove = {
        let hostname = props.hostname.clone();
        props.on_remove.reform(move |_: MouseEvent| hostname.clone())
    };
    let on_reset = {
        let hostname = props.hostname.clone();
        props.on_reset.reform(move |_: MouseEvent| hostname.clone())
    };

    html! {
        <div class="site-item">
            <div class="site-item-info">
                <span class="site-item-name">{&props.hostname}</span>
                <span class="site-item-stats">
                    {"🚫 "}
                    <span class="attempts">{attempts_label(props.entry.attempts)}</span>
                </span>
            </div>
            <div class="site-item-actions">
                <Button
                    onclick={on_reset}
                    variant={ButtonVariant::Secondary}
                    disabled={props.entry.attempts == 0}
                >
                    {"↺"}
                </Button>
                <Button onclick={on_remove} variant={ButtonVariant::Danger}>
                    {"🗑️"}
                </Button>
            </div>
        </div>
    }
}
