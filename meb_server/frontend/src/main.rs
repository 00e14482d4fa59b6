use std::{cell::Cell, rc::Rc, time::Duration};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use meb_core::display::{
    cache_bust, format_date, format_time, parse_feed_json, prepare, until_midnight_reload,
    DisplayConfig, DisplayEvent, FitStep, RendererState, EMPTY_MESSAGE, LOADING_MESSAGE,
};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{window, HtmlElement, Url};
use yew::{
    platform::{spawn_local, time::sleep},
    prelude::*,
};

/// The renderer state together with the settings it is rendered with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Renderer {
    config: DisplayConfig,
    state: RendererState,
}

pub enum Action {
    Loading,
    Loaded(Vec<DisplayEvent>, DateTime<Utc>),
    Failed,
    Advance,
}

impl Reducible for Renderer {
    type Action = Action;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut renderer = (*self).clone();
        match action {
            Action::Loading => renderer.state.status = LOADING_MESSAGE.to_string(),
            Action::Loaded(events, now) => renderer.state.load(
                events,
                renderer.config.events_per_page,
                now,
                &renderer.config.timezone,
            ),
            Action::Failed => renderer.state.fail(),
            Action::Advance => renderer.state.advance(),
        }
        Rc::new(renderer)
    }
}

/// The events URL, absolute and with a cache-busting parameter.
fn events_url(config: &DisplayConfig, now: DateTime<Utc>) -> Result<String, String> {
    let base = window()
        .ok_or("no window")?
        .location()
        .href()
        .map_err(|err| format!("{err:?}"))?;
    let url = Url::new_with_base(&cache_bust(&config.events_url, now), &base)
        .map_err(|err| format!("{err:?}"))?;
    Ok(String::from(url.href()))
}

async fn fetch_events(config: &DisplayConfig) -> Result<Vec<DisplayEvent>, String> {
    let url = events_url(config, Utc::now())?;
    let text = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|err| err.to_string())?
        .text()
        .await
        .map_err(|err| err.to_string())?;
    let records = parse_feed_json(&text).map_err(|err| err.to_string())?;
    Ok(prepare(&records, config, Utc::now()))
}

fn warn_on_error(result: Result<(), JsValue>, action: &str) {
    if let Err(err) = result {
        log::warn!("failed to {action}: {err:?}");
    }
}

/// The page rotation timer.
///
/// Every start replaces the running timer, so a freshly loaded first page is shown for a full
/// period.
#[derive(Clone)]
pub struct Rotation {
    dispatcher: UseReducerDispatcher<Renderer>,
    page_duration: Duration,
    generation: Rc<Cell<u64>>,
}

impl Rotation {
    fn restart(&self) {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let rotation = self.clone();
        spawn_local(async move {
            loop {
                sleep(rotation.page_duration).await;
                if rotation.generation.get() != generation {
                    return;
                }
                rotation.dispatcher.dispatch(Action::Advance);
            }
        });
    }
}

async fn load(dispatcher: &UseReducerDispatcher<Renderer>, config: &DisplayConfig, rotation: &Rotation) {
    dispatcher.dispatch(Action::Loading);
    match fetch_events(config).await {
        Ok(events) => {
            dispatcher.dispatch(Action::Loaded(events, Utc::now()));
            rotation.restart();
        }
        Err(err) => {
            log::error!("failed to load events: {err}");
            dispatcher.dispatch(Action::Failed);
        }
    }
}

fn apply_fit_step(page: &HtmlElement, step: FitStep) {
    let classes = page.class_list();
    for name in ["tight", "tighter", "scaled"] {
        warn_on_error(classes.remove_1(name), "remove a fit class");
    }
    for name in step.classes() {
        warn_on_error(classes.add_1(name), "add a fit class");
    }
    let result = match step.transform() {
        Some(transform) => page.style().set_property("transform", &transform),
        None => page.style().remove_property("transform").map(|_| ()),
    };
    warn_on_error(result, "set the page transform");
}

/// Squeeze the active page until it fits the screen.
fn fit_page(page_ref: &NodeRef) {
    let Some(page) = page_ref.cast::<HtmlElement>() else {
        return;
    };
    let mut step = FitStep::Normal;
    loop {
        apply_fit_step(&page, step);
        if page.scroll_height() <= page.client_height() {
            return;
        }
        match step.next(page.scroll_height().into(), page.client_height().into()) {
            Some(next) => step = next,
            None => return,
        }
    }
}

fn event_html(event: &DisplayEvent, timezone: &Tz) -> Html {
    html! {
        <div class="event">
            <div class="event-title">{event.title.clone()}</div>
            <div class="event-detail">{format!("Date: {}", format_date(event, timezone))}</div>
            <div class="event-detail">{format!("Time: {}", format_time(event, timezone))}</div>
            <div class="event-detail">{format!("Location: {}", event.location)}</div>
        </div>
    }
}

#[function_component]
pub fn App() -> Html {
    let renderer = use_reducer(Renderer::default);
    let page_ref = use_node_ref();

    {
        let dispatcher = renderer.dispatcher();
        let config = renderer.config.clone();
        use_effect_with_deps(
            move |_| {
                {
                    let config = config.clone();
                    let rotation = Rotation {
                        dispatcher: dispatcher.clone(),
                        page_duration: config.page_duration,
                        generation: Rc::default(),
                    };
                    spawn_local(async move {
                        loop {
                            load(&dispatcher, &config, &rotation).await;
                            sleep(config.refresh_every).await;
                        }
                    });
                }
                if config.hard_reload_at_midnight {
                    spawn_local(async move {
                        sleep(until_midnight_reload(Utc::now(), &config.timezone)).await;
                        match window() {
                            Some(window) => warn_on_error(window.location().reload(), "reload the page"),
                            None => log::warn!("failed to reload the page: no window"),
                        }
                    });
                }
                || ()
            },
            (),
        );
    }

    {
        let page_ref = page_ref.clone();
        use_effect(move || {
            fit_page(&page_ref);
            || ()
        });
    }

    {
        let page_ref = page_ref.clone();
        use_effect_with_deps(
            move |_| {
                let listener = Closure::<dyn Fn()>::new(move || fit_page(&page_ref));
                let window = window();
                if let Some(window) = &window {
                    warn_on_error(
                        window.add_event_listener_with_callback(
                            "resize",
                            listener.as_ref().unchecked_ref(),
                        ),
                        "listen for resizes",
                    );
                }
                move || {
                    if let Some(window) = &window {
                        warn_on_error(
                            window.remove_event_listener_with_callback(
                                "resize",
                                listener.as_ref().unchecked_ref(),
                            ),
                            "stop listening for resizes",
                        );
                    }
                }
            },
            (),
        );
    }

    let timezone = renderer.config.timezone;
    let state = &renderer.state;
    let page = state.current_page();
    html! {
        <main class="board">
            <header>
                <h1>{"Upcoming Events"}</h1>
                <div class="status">{state.status.clone()}</div>
            </header>
            <div class="pages">
                <div class="page active" key={state.current} ref={page_ref}>
                    if !page.is_empty() {
                        { for page.iter().map(|event| event_html(event, &timezone)) }
                    } else if state.status != LOADING_MESSAGE {
                        <div class="event"><div class="event-title">{EMPTY_MESSAGE}</div></div>
                    }
                </div>
            </div>
        </main>
    }
}

fn main() {
    #[cfg(target_arch = "wasm32")]
    wasm_logger::init(wasm_logger::Config::new(log::Level::Trace));
    yew::Renderer::<App>::new().render();
}
