/// Page shown in place of a blocked site

use log::{info, warn};
use patternfly_yew::prelude::*;
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::block_list::BlockList;
use crate::bridge;
use crate::config::Settings;
use crate::hostname::MatchPolicy;
use crate::interstitial::{BlockedPage as BlockedParams, Interstitial};
use crate::store::{ChromeStore, StateStore};

/// Keys changed in `chrome.storage.local`, with their new values
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default)]
    pub is_enabled: Option<bool>,
    #[serde(default)]
    pub blocked_sites: Option<BlockList>,
}

/// Whether a storage change means this page should send the tab back:
/// blocking was switched off, or `site` no longer hits any blocked entry.
pub fn should_release(change: &StorageChange, site: &str, policy: MatchPolicy) -> bool {
    if change.is_enabled == Some(false) {
        return true;
    }

    change
        .blocked_sites
        .as_ref()
        .is_some_and(|sites| !sites.is_blocked(site, policy))
}

async fn load_settings() -> Settings {
    match ChromeStore.load_settings().await {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            warn!("Using default settings: {}", e);
            Settings::default()
        }
    }
}

fn current_params(settings: &Settings) -> Option<BlockedParams> {
    let href = web_sys::window()?.location().href().ok()?;
    let interstitial = Interstitial::new(&bridge::getExtensionUrl(&settings.interstitial_page)).ok()?;
    interstitial.parse(&href)
}

fn return_to(url: &str) {
    let Some(window) = web_sys::window() else {
        warn!("No window to navigate back to {}", url);
        return;
    };
    if let Err(e) = window.location().set_href(url) {
        warn!("Failed to navigate back to {}: {:?}", url, e);
    }
}

/// Send the tab back once `site` stops being blocked
fn listen_for_release(site: String, original: String, policy: MatchPolicy) {
    let listener = Closure::wrap(Box::new(move |changes: JsValue| {
        let change: StorageChange = match serde_wasm_bindgen::from_value(changes) {
            Ok(change) => change,
            Err(e) => {
                warn!("Ignoring storage change: {:?}", e);
                return;
            }
        };

        if should_release(&change, &site, policy) {
            info!("{} unblocked, returning to {}", site, original);
            return_to(&original);
        }
    }) as Box<dyn Fn(JsValue)>);

    bridge::onStorageChanged(listener.as_ref().unchecked_ref());
    // The listener lives as long as the page
    listener.forget();
}

#[function_component(BlockedPage)]
pub fn blocked_page() -> Html {
    let params = use_state(|| None::<BlockedParams>);

    // Read the stored settings, then wait for the site to be unblocked
    {
        let params = params.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                let settings = load_settings().await;
                let Some(page) = current_params(&settings) else {
                    return;
                };

                if let (Some(site), Some(original)) = (page.site.clone(), page.restorable_url()) {
                    listen_for_release(site, original.to_string(), settings.match_policy);
                }
                params.set(Some(page));
            });
            || ()
        });
    }

    let site = (*params)
        .as_ref()
        .and_then(|p| p.site.clone())
        .unwrap_or_else(|| "Unknown site".to_string());

    let on_back = Callback::from(|_: MouseEvent| bridge::goBackOrClose());

    html! {
        <div class="container blocked">
            <h1 class="main-title">{"This site is blocked"}</h1>
            <p class="blocked-site">{site}</p>
            <Button onclick={on_back} variant={ButtonVariant::Secondary}>
                {"← Go back"}
            </Button>
        </div>
    }
}
