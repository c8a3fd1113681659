pub mod config;
pub mod data;
pub mod deck;
pub mod gesture;
pub mod motion;
pub mod spring;

use data::{load_manifest, Card, Manifest};
use deck::{DeckState, ResetTicket};
use gesture::GestureInterpreter;
use gloo_events::EventListener;
use gloo_render::{request_animation_frame, AnimationFrame};
use gloo_timers::callback::Timeout;
use log::{debug, error};
use motion::{card_offset_css, card_transform_css};
use spring::DeckAnimator;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::JsCast;
use web_sys::{window, PointerEvent};
use yew::prelude::*;

const FIRST_FRAME_MS: f64 = 16.0;

/// Owns everything the deck view mutates from DOM callbacks.
struct DeckController {
    cards: Vec<Card>,
    deck: RefCell<DeckState>,
    animator: RefCell<DeckAnimator>,
    gestures: RefCell<GestureInterpreter>,
    reset_timer: RefCell<Option<Timeout>>,
    frame: RefCell<Option<AnimationFrame>>,
    last_frame_ms: Cell<Option<f64>>,
    redraw: Callback<()>,
}

impl DeckController {
    fn new(manifest: &Manifest, redraw: Callback<()>) -> Rc<Self> {
        let deck = DeckState::new(
            manifest.cards.len(),
            manifest.settings.clone(),
            rand::random(),
        );
        Rc::new(Self {
            cards: manifest.cards.clone(),
            deck: RefCell::new(deck),
            animator: RefCell::new(DeckAnimator::new()),
            gestures: RefCell::new(GestureInterpreter::new()),
            reset_timer: RefCell::new(None),
            frame: RefCell::new(None),
            last_frame_ms: Cell::new(None),
            redraw,
        })
    }

    fn start(self: &Rc<Self>) {
        self.refresh_viewport();
        self.animator.borrow_mut().sync(&self.deck.borrow());
        self.request_frame();
    }

    fn stop(&self) {
        self.reset_timer.borrow_mut().take();
        self.frame.borrow_mut().take();
        self.last_frame_ms.set(None);
    }

    fn refresh_viewport(&self) {
        let Some(window) = window() else {
            return;
        };
        let width = window.inner_width().ok().and_then(|value| value.as_f64());
        let height = window.inner_height().ok().and_then(|value| value.as_f64());
        if let (Some(width), Some(height)) = (width, height) {
            self.deck.borrow_mut().set_viewport(width, height);
        }
    }

    fn on_press(self: &Rc<Self>, index: usize, event: &PointerEvent) {
        event.prevent_default();
        let sample = self.gestures.borrow_mut().press(
            event.pointer_id(),
            index,
            event.client_x() as f64,
            event.client_y() as f64,
            event.time_stamp(),
        );
        let Some(sample) = sample else {
            return;
        };
        if let Some(target) = event
            .current_target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        {
            let _ = target.set_pointer_capture(event.pointer_id());
        }
        self.deck.borrow_mut().apply_gesture(index, &sample);
        self.after_gesture();
    }

    fn on_move(self: &Rc<Self>, event: &PointerEvent) {
        let update = self.gestures.borrow_mut().motion(
            event.pointer_id(),
            event.client_x() as f64,
            event.client_y() as f64,
            event.time_stamp(),
        );
        if let Some((index, sample)) = update {
            event.prevent_default();
            self.deck.borrow_mut().apply_gesture(index, &sample);
            self.after_gesture();
        }
    }

    fn on_release(self: &Rc<Self>, event: &PointerEvent) {
        let release = self.gestures.borrow_mut().release(
            event.pointer_id(),
            event.client_x() as f64,
            event.client_y() as f64,
            event.time_stamp(),
        );
        let Some(release) = release else {
            return;
        };
        release_capture(event);
        {
            let mut deck = self.deck.borrow_mut();
            deck.apply_gesture(release.index, &release.sample);
            if release.tap {
                deck.toggle_flip(release.index);
            }
        }
        self.after_gesture();
    }

    fn on_cancel(self: &Rc<Self>, event: &PointerEvent) {
        let Some((index, sample)) = self.gestures.borrow_mut().cancel(event.pointer_id()) else {
            return;
        };
        release_capture(event);
        self.deck.borrow_mut().apply_gesture(index, &sample);
        self.after_gesture();
    }

    fn after_gesture(self: &Rc<Self>) {
        self.animator.borrow_mut().sync(&self.deck.borrow());
        self.arm_reset();
        self.request_frame();
        self.redraw.emit(());
    }

    /// Mirrors the deck's pending reset with a browser timer. Replacing the
    /// stored timeout drops, and so cancels, the previous one.
    fn arm_reset(self: &Rc<Self>) {
        let pending = self.deck.borrow().pending_reset();
        let timer = pending.map(|pending| {
            let controller = Rc::clone(self);
            Timeout::new(pending.delay_ms, move || {
                controller.fire_reset(pending.ticket);
            })
        });
        *self.reset_timer.borrow_mut() = timer;
    }

    fn fire_reset(self: &Rc<Self>, ticket: ResetTicket) {
        self.reset_timer.borrow_mut().take();
        if !self.deck.borrow_mut().fire_reset(ticket) {
            return;
        }
        self.animator.borrow_mut().sync(&self.deck.borrow());
        self.request_frame();
        self.redraw.emit(());
    }

    fn request_frame(self: &Rc<Self>) {
        if self.frame.borrow().is_some() {
            return;
        }
        let controller = Rc::clone(self);
        let handle = request_animation_frame(move |timestamp| {
            controller.on_frame(timestamp);
        });
        *self.frame.borrow_mut() = Some(handle);
    }

    fn on_frame(self: &Rc<Self>, timestamp: f64) {
        self.frame.borrow_mut().take();
        let dt_ms = match self.last_frame_ms.get() {
            Some(previous) => timestamp - previous,
            None => FIRST_FRAME_MS,
        };
        self.last_frame_ms.set(Some(timestamp));

        let moving = self.animator.borrow_mut().step(dt_ms);
        self.redraw.emit(());
        if moving {
            self.request_frame();
        } else {
            debug!("Deck animation settled");
            self.last_frame_ms.set(None);
        }
    }
}

fn release_capture(event: &PointerEvent) {
    if let Some(target) = event
        .current_target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
    {
        let _ = target.release_pointer_capture(event.pointer_id());
    }
}

#[derive(Properties, PartialEq)]
struct DeckProps {
    manifest: Rc<Manifest>,
}

#[function_component(Deck)]
fn deck_view(props: &DeckProps) -> Html {
    let redraw = use_force_update();
    let controller = {
        let manifest = props.manifest.clone();
        use_state(move || {
            DeckController::new(
                &manifest,
                Callback::from(move |_| redraw.force_update()),
            )
        })
    };

    {
        let controller = (*controller).clone();
        use_effect_with_deps(
            move |_| {
                controller.start();
                let listener = window().map(|window| {
                    let controller = controller.clone();
                    EventListener::new(&window, "resize", move |_| {
                        controller.refresh_viewport();
                    })
                });
                move || {
                    drop(listener);
                    controller.stop();
                }
            },
            (),
        );
    }

    let controller = &*controller;
    let deck = controller.deck.borrow();
    let animator = controller.animator.borrow();

    html! {
        <>
            { for controller.cards.iter().enumerate().map(|(index, card)| {
                let transform = animator
                    .current(index)
                    .unwrap_or(deck.target(index).transform);
                let face = CardFace {
                    flipped: deck.is_flipped(index),
                    dismissed: deck.is_dismissed(index),
                };
                render_card(controller, index, card, face, &transform)
            }) }
        </>
    }
}

#[derive(Clone, Copy)]
struct CardFace {
    flipped: bool,
    dismissed: bool,
}

fn render_card(
    controller: &Rc<DeckController>,
    index: usize,
    card: &Card,
    face: CardFace,
    transform: &motion::CardTransform,
) -> Html {
    let pointer_down = {
        let controller = controller.clone();
        Callback::from(move |event: PointerEvent| controller.on_press(index, &event))
    };
    let pointer_move = {
        let controller = controller.clone();
        Callback::from(move |event: PointerEvent| controller.on_move(&event))
    };
    let pointer_up = {
        let controller = controller.clone();
        Callback::from(move |event: PointerEvent| controller.on_release(&event))
    };
    let pointer_cancel = {
        let controller = controller.clone();
        Callback::from(move |event: PointerEvent| controller.on_cancel(&event))
    };

    let CardFace { flipped, dismissed } = face;
    let image = if flipped {
        card.back_image.as_deref()
    } else {
        Some(card.front_image.as_str())
    };
    let background = match image {
        Some(url) => format!("background-image: url(\"{}\");", url),
        None => "background-image: none;".to_string(),
    };
    let card_style = format!("{} {}", card_transform_css(transform), background);

    html! {
        <div class={classes!("deck", if dismissed { Some("dismissed") } else { None })}
            style={card_offset_css(transform)}>
            <div class={classes!("card", if flipped { Some("flipped") } else { None })}
                style={card_style}
                onpointerdown={pointer_down}
                onpointermove={pointer_move}
                onpointerup={pointer_up}
                onpointercancel={pointer_cancel}>
                {
                    if flipped && card.has_back_content() {
                        render_back_content(card)
                    } else {
                        html! {}
                    }
                }
            </div>
        </div>
    }
}

fn render_back_content(card: &Card) -> Html {
    html! {
        <div class="card-back-content">
            <div class="title-box">
                <h2>{ card.title.clone().unwrap_or_default() }</h2>
            </div>
            <div class="description-box">
                <p>{ card.description.clone().unwrap_or_default() }</p>
                {
                    match &card.link {
                        Some(link) => html! {
                            <a href={link.clone()} target="_blank" rel="noopener noreferrer">
                                { "Learn more" }
                            </a>
                        },
                        None => html! {},
                    }
                }
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct ErrorProps {
    message: String,
}

#[function_component(LoadError)]
fn load_error(props: &ErrorProps) -> Html {
    html! { <p class="error">{ &props.message }</p> }
}

#[function_component(App)]
fn app() -> Html {
    let manifest = use_state(|| load_manifest().map(Rc::new));

    let content = match &*manifest {
        Ok(manifest) => html! { <Deck manifest={manifest.clone()} /> },
        Err(err) => {
            error!("Failed to load deck: {}", err);
            html! { <LoadError message={err.to_string()} /> }
        }
    };

    html! {
        <div class="flex fill center container">
            { content }
        </div>
    }
}

#[wasm_bindgen(start)]
pub fn run_app() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<App>::new().render();
}
