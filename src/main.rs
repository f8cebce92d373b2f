//! Combo Runner entry point
//!
//! On the web: wires the session to the DOM, Web Audio, requestAnimationFrame
//! and the ranking service. Natively: plays one headless session on autopilot
//! and prints the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use web_sys::{
        Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement, KeyboardEvent,
        TouchEvent,
    };

    use combo_runner::audio::AudioManager;
    use combo_runner::platform::{RafScheduler, detect_capabilities};
    use combo_runner::presentation::{
        PresentationEvent, PresentationSink, format_combo, format_timer,
    };
    use combo_runner::ranking::{
        self, HttpRanking, LEADERBOARD_SIZE, Leaderboard, LocalRanking, PlayerIdentity,
        RankingBackend, ScoreSubmission,
    };
    use combo_runner::session::{ScoreReport, TickOutcome};
    use combo_runner::sim::{CoinTier, Entity, JumpPhase, ObstacleVariant, Rect};
    use combo_runner::{DeviceProfile, PerformanceMode, Session, SessionPhase, Settings};

    type GameSession = Session<RafScheduler>;

    /// Renders presentation events as absolutely positioned DOM nodes
    struct DomPresentation {
        document: Document,
    }

    impl DomPresentation {
        fn by_id(&self, id: &str) -> Option<Element> {
            self.document.get_element_by_id(id)
        }

        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.by_id(id) {
                el.set_text_content(Some(text));
            }
        }

        fn set_visible(&self, id: &str, visible: bool) {
            if let Some(el) = self.by_id(id).and_then(|e| e.dyn_into::<HtmlElement>().ok()) {
                let _ = el
                    .style()
                    .set_property("display", if visible { "flex" } else { "none" });
            }
        }

        /// Play-area coordinates are y-up, same as CSS `bottom`
        fn place(el: &Element, rect: &Rect) {
            if let Some(el) = el.dyn_ref::<HtmlElement>() {
                let style = el.style();
                let _ = style.set_property("left", &format!("{}px", rect.min.x));
                let _ = style.set_property("bottom", &format!("{}px", rect.min.y));
                let _ = style.set_property("width", &format!("{}px", rect.size.x));
                let _ = style.set_property("height", &format!("{}px", rect.size.y));
            }
        }

        fn entity_dom_id(id: u32) -> String {
            format!("entity-{}", id)
        }

        fn entity_class(entity: &Entity) -> &'static str {
            match entity {
                Entity::Obstacle(o) => match o.variant {
                    ObstacleVariant::Standard => "obstacle",
                    ObstacleVariant::Tall => "obstacle obstacle-tall",
                    ObstacleVariant::Wide => "obstacle obstacle-wide",
                    ObstacleVariant::Large => "obstacle obstacle-large",
                    ObstacleVariant::Flying => "obstacle obstacle-flying",
                },
                Entity::Coin(c) => match c.tier {
                    CoinTier::Low => "coin coin-low",
                    CoinTier::Mid => "coin coin-mid",
                    CoinTier::High => "coin coin-high",
                },
            }
        }

        fn create_entity(&self, entity: &Entity) {
            let (Some(container), Ok(el)) = (
                self.by_id("game-container"),
                self.document.create_element("div"),
            ) else {
                return;
            };
            el.set_id(&Self::entity_dom_id(entity.id()));
            let _ = el.set_attribute("class", Self::entity_class(entity));
            Self::place(&el, &entity.rect());
            let _ = container.append_child(&el);
        }

        fn floating_text(&self, text: &str, x: f32, y: f32, color: &str) {
            let (Some(container), Ok(el)) = (
                self.by_id("game-container"),
                self.document.create_element("div"),
            ) else {
                return;
            };
            el.set_text_content(Some(text));
            let _ = el.set_attribute("class", "floating-text");
            if let Some(html) = el.dyn_ref::<HtmlElement>() {
                let style = html.style();
                let _ = style.set_property("left", &format!("{}px", x));
                let _ = style.set_property("bottom", &format!("{}px", y));
                let _ = style.set_property("color", color);
            }
            let _ = container.append_child(&el);

            let remove = Closure::once(move || el.remove());
            if let Some(window) = web_sys::window() {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                    remove.as_ref().unchecked_ref(),
                    1500,
                );
            }
            remove.forget();
        }

        fn render_leaderboard(&self, board: &Leaderboard) {
            let Some(target) = self.by_id("ranking") else {
                return;
            };
            if board.is_empty() {
                target.set_inner_html(
                    "<div class=\"empty-ranking\"><p>Be the first to set a score!</p></div>",
                );
                return;
            }

            let player = PlayerIdentity::load();
            let position = player.as_ref().and_then(|p| board.position_of(p));

            let mut html = String::from(
                "<h2>Ranking</h2><table><thead><tr><th>#</th><th>Player</th><th>Points</th></tr></thead><tbody>",
            );
            for (i, entry) in board.top(LEADERBOARD_SIZE).iter().enumerate() {
                let mut class = if i < 3 { format!("rank-{}", i + 1) } else { String::new() };
                if position == Some(i + 1) {
                    class.push_str(" current-player");
                }
                html.push_str(&format!(
                    "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td></tr>",
                    class.trim(),
                    i + 1,
                    entry.display_name(),
                    entry.score
                ));
            }
            html.push_str("</tbody></table>");
            if let Some(pos) = position {
                html.push_str(&format!(
                    "<p class=\"player-position\">Your position: {} of {}</p>",
                    pos,
                    board.len()
                ));
            }
            target.set_inner_html(&html);
        }
    }

    impl PresentationSink for DomPresentation {
        fn emit(&mut self, event: PresentationEvent) {
            match event {
                PresentationEvent::PlayerMoved { y, phase } => {
                    if let Some(el) = self.by_id("player") {
                        if let Some(html) = el.dyn_ref::<HtmlElement>() {
                            let _ = html.style().set_property("bottom", &format!("{}px", y));
                        }
                        let class = match phase {
                            JumpPhase::Grounded => "player",
                            JumpPhase::SingleJumped => "player player-jump",
                            JumpPhase::DoubleJumped => "player player-double-jump",
                        };
                        let _ = el.set_attribute("class", class);
                    }
                }
                PresentationEvent::EntityCreated(entity) => self.create_entity(&entity),
                PresentationEvent::EntityUpdated(entity) => {
                    if let Some(el) = self.by_id(&Self::entity_dom_id(entity.id())) {
                        Self::place(&el, &entity.rect());
                    }
                }
                PresentationEvent::EntityDestroyed { id } => {
                    if let Some(el) = self.by_id(&Self::entity_dom_id(id)) {
                        el.remove();
                    }
                }
                PresentationEvent::ScoreChanged(score) => self.set_text("score", &score.to_string()),
                PresentationEvent::TimerChanged { remaining, warning } => {
                    if let Some(el) = self.by_id("timer") {
                        el.set_text_content(Some(&format_timer(remaining)));
                        let _ = el.set_attribute("class", warning.css_class().unwrap_or(""));
                        if let Some(html) = el.dyn_ref::<HtmlElement>() {
                            let _ = html.style().set_property("color", warning.color());
                        }
                    }
                }
                PresentationEvent::ComboChanged { combo, milestone } => {
                    if let Some(el) = self.by_id("combo") {
                        el.set_text_content(Some(&format_combo(combo)));
                        let class = if milestone { "combo-highlight" } else { "" };
                        let _ = el.set_attribute("class", class);
                    }
                }
                PresentationEvent::FloatingText { text, pos, color } => {
                    self.floating_text(&text, pos.x, pos.y, color)
                }
                PresentationEvent::PhaseChanged(phase) => {
                    self.set_visible("start-screen", phase == SessionPhase::Idle);
                    self.set_visible("pause-screen", phase == SessionPhase::Paused);
                    self.set_visible("game-over-screen", phase == SessionPhase::Ended);
                    if phase == SessionPhase::Ended {
                        if let Some(score) = self.by_id("score").and_then(|e| e.text_content()) {
                            self.set_text("final-score", &format!("Your final score: {}", score));
                        }
                    }
                }
                PresentationEvent::Leaderboard(board) => self.render_leaderboard(&board),
            }
        }
    }

    /// Everything the DOM callbacks share
    #[derive(Clone)]
    struct App {
        session: Rc<RefCell<GameSession>>,
        backend: Rc<dyn RankingBackend>,
        /// Local board, shared with `LocalRanking` when there is no service
        cache: Rc<RefCell<Leaderboard>>,
        settings: Rc<RefCell<Settings>>,
    }

    impl App {
        /// Record the score locally, then report it and show the fresh board
        fn submit_score(&self, report: ScoreReport) {
            let Some(player) = report.player else {
                log::info!("No registered player, score {} not ranked", report.score);
                return;
            };
            let submission = ScoreSubmission::new(player, report.score);
            let snapshot = {
                let mut cache = self.cache.borrow_mut();
                if cache.record(submission.to_entry()) {
                    cache.save();
                }
                cache.clone()
            };

            let app = self.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let outcome =
                    ranking::report_score(app.backend.as_ref(), submission, snapshot).await;
                app.session
                    .borrow_mut()
                    .apply_leaderboard(report.generation, outcome.board);
            });
        }

        fn show_rankings(&self) {
            let app = self.clone();
            let generation = self.session.borrow().generation();
            let snapshot = self.cache.borrow().clone();
            wasm_bindgen_futures::spawn_local(async move {
                let outcome = ranking::fetch_leaderboard(app.backend.as_ref(), snapshot).await;
                app.session
                    .borrow_mut()
                    .apply_leaderboard(generation, outcome.board);
            });
        }

        fn start(&self) {
            let mut session = self.session.borrow_mut();
            if session.player().is_none() {
                log::info!("Register before playing");
                return;
            }
            session.start();
        }

        fn toggle_pause(&self) {
            let mut session = self.session.borrow_mut();
            match session.phase() {
                SessionPhase::Running => session.pause(),
                SessionPhase::Paused => session.resume(),
                _ => {}
            }
        }
    }

    fn on<E: wasm_bindgen::convert::FromWasmAbi + 'static>(
        target: &web_sys::EventTarget,
        event: &str,
        handler: impl FnMut(E) + 'static,
    ) {
        let closure = Closure::<dyn FnMut(E)>::new(handler);
        let _ = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn on_click(document: &Document, id: &str, handler: impl FnMut(web_sys::MouseEvent) + 'static) {
        if let Some(el) = document.get_element_by_id(id) {
            on(&el, "click", handler);
        }
    }

    fn device_profile() -> DeviceProfile {
        DeviceProfile::from_capabilities(&detect_capabilities())
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Combo Runner starting...");

        let Some(window) = web_sys::window() else {
            log::error!("No window");
            return;
        };
        let Some(document) = window.document() else {
            log::error!("No document");
            return;
        };

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let settings = Settings::load();
        let scheduler = RafScheduler::new();
        let frames = scheduler.clone();

        let mut session = Session::new(
            scheduler,
            &settings,
            Box::new(AudioManager::new(&settings.audio)),
            Box::new(DomPresentation {
                document: document.clone(),
            }),
        );
        session.apply_device_profile(device_profile());
        session.set_player(PlayerIdentity::load());

        let cache = Rc::new(RefCell::new(Leaderboard::load()));
        let backend: Rc<dyn RankingBackend> = match document
            .body()
            .and_then(|b| b.get_attribute("data-ranking-url"))
        {
            Some(url) if !url.is_empty() => {
                log::info!("Ranking service: {}", url);
                Rc::new(HttpRanking::new(url))
            }
            _ => Rc::new(LocalRanking::shared(cache.clone())),
        };

        let mute_on_blur = settings.audio.mute_on_blur;
        let app = App {
            session: Rc::new(RefCell::new(session)),
            backend,
            cache,
            settings: Rc::new(RefCell::new(settings)),
        };

        // Frame callback, installed once
        {
            let app = app.clone();
            frames.install(Closure::<dyn FnMut(f64)>::new(move |timestamp: f64| {
                let outcome = app.session.borrow_mut().tick(timestamp);
                if let TickOutcome::Ended(report) = outcome {
                    app.submit_score(report);
                }
            }));
        }

        setup_input_handlers(&window, &document, &app);
        setup_menus(&document, &app);
        setup_settings(&document, &app);
        setup_auto_pause(&window, &document, &app, mute_on_blur);

        // Re-derive the device profile on resize
        {
            let app = app.clone();
            on(&window, "resize", move |_: web_sys::Event| {
                app.session
                    .borrow_mut()
                    .apply_device_profile(device_profile());
            });
        }

        let registered = app.session.borrow().player().is_some();
        let screens = DomPresentation { document };
        screens.set_visible("register-screen", !registered);
        screens.set_visible("start-screen", registered);
    }

    fn setup_input_handlers(window: &web_sys::Window, document: &Document, app: &App) {
        // Keyboard
        {
            let app = app.clone();
            on(window, "keydown", move |event: KeyboardEvent| {
                match event.key().as_str() {
                    " " | "ArrowUp" | "w" | "W" => {
                        event.prevent_default();
                        if !event.repeat() {
                            app.session.borrow_mut().jump();
                        }
                    }
                    "Escape" | "p" | "P" => app.toggle_pause(),
                    "Enter" => {
                        let phase = app.session.borrow().phase();
                        if matches!(phase, SessionPhase::Idle | SessionPhase::Ended) {
                            app.start();
                        }
                    }
                    _ => {}
                }
            });
        }

        // Touch / click to jump
        if let Some(container) = document.get_element_by_id("game-container") {
            {
                let app = app.clone();
                on(&container, "touchstart", move |event: TouchEvent| {
                    event.prevent_default();
                    app.session.borrow_mut().jump();
                });
            }
            let app = app.clone();
            on(&container, "mousedown", move |_: web_sys::MouseEvent| {
                app.session.borrow_mut().jump();
            });
        }
    }

    fn setup_menus(document: &Document, app: &App) {
        {
            let app = app.clone();
            on_click(document, "start-button", move |_| app.start());
        }
        {
            let app = app.clone();
            on_click(document, "restart-button", move |_| app.start());
        }
        {
            let app = app.clone();
            on_click(document, "resume-button", move |_| app.session.borrow_mut().resume());
        }
        {
            let app = app.clone();
            on_click(document, "menu-button", move |_| {
                app.session.borrow_mut().reset_to_idle()
            });
        }
        {
            let app = app.clone();
            on_click(document, "ranking-button", move |_| app.show_rankings());
        }

        // Registration
        if let Some(form) = document.get_element_by_id("register-form") {
            let app = app.clone();
            let document = document.clone();
            on(&form, "submit", move |event: web_sys::Event| {
                event.prevent_default();
                let input = |id: &str| {
                    document
                        .get_element_by_id(id)
                        .and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
                };
                let name = input("player-name").map(|i| i.value()).unwrap_or_default();
                let email = input("player-email").map(|i| i.value()).unwrap_or_default();
                let terms = input("terms").map(|i| i.checked()).unwrap_or(false);

                let screens = DomPresentation {
                    document: document.clone(),
                };
                match PlayerIdentity::register(&name, &email, terms) {
                    Ok(player) => {
                        player.save();
                        log::info!("Registered {}", player.name);
                        app.session.borrow_mut().set_player(Some(player));
                        screens.set_text("register-error", "");
                        screens.set_visible("register-screen", false);
                        screens.set_visible("start-screen", true);
                    }
                    Err(e) => {
                        log::warn!("Registration rejected: {}", e);
                        screens.set_text("register-error", &e.to_string());
                    }
                }
            });
        }
    }

    /// Performance mode picker in the settings menu
    fn setup_settings(document: &Document, app: &App) {
        let Some(select) = document
            .get_element_by_id("performance-select")
            .and_then(|e| e.dyn_into::<HtmlSelectElement>().ok())
        else {
            return;
        };
        select.set_value(app.settings.borrow().performance.as_str());

        let app = app.clone();
        let picker = select.clone();
        on(&select, "change", move |_: web_sys::Event| {
            let Some(mode) = PerformanceMode::from_str(&picker.value()) else {
                log::warn!("Unknown performance mode {:?}", picker.value());
                return;
            };
            let tuning = {
                let mut settings = app.settings.borrow_mut();
                settings.apply_performance_mode(mode);
                settings.save();
                settings.effective_tuning()
            };
            app.session.borrow_mut().set_tuning(tuning);
            log::info!("Performance mode: {}", mode.as_str());
        });
    }

    fn setup_auto_pause(window: &web_sys::Window, document: &Document, app: &App, mute_on_blur: bool) {
        // Visibility change (tab switch, minimize)
        {
            let app = app.clone();
            let doc = document.clone();
            on(document, "visibilitychange", move |_: web_sys::Event| {
                if doc.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut session = app.session.borrow_mut();
                    if session.phase() == SessionPhase::Running {
                        session.pause();
                        log::info!("Auto-paused (tab hidden)");
                    }
                }
            });
        }

        // Window blur (click outside)
        {
            let app = app.clone();
            on(window, "blur", move |_: web_sys::FocusEvent| {
                let mut session = app.session.borrow_mut();
                if session.phase() == SessionPhase::Running {
                    session.pause();
                    log::info!("Auto-paused (window blur)");
                }
                if mute_on_blur {
                    session.set_muted(true);
                }
            });
        }

        if mute_on_blur {
            let app = app.clone();
            on(window, "focus", move |_: web_sys::FocusEvent| {
                app.session.borrow_mut().set_muted(false);
            });
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::cell::RefCell;
    use std::rc::Rc;

    use combo_runner::audio::SilentAudio;
    use combo_runner::consts::*;
    use combo_runner::platform::ManualScheduler;
    use combo_runner::presentation::{EventLog, PresentationEvent};
    use combo_runner::ranking::{self, Leaderboard, LocalRanking, ScoreSubmission};
    use combo_runner::session::TickOutcome;
    use combo_runner::{PlayerIdentity, Session, Settings};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Combo Runner (native) starting headless autopilot run...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(2024);

    let settings = Settings::load();
    let events = EventLog::new();
    let mut session = Session::new(
        ManualScheduler::new(),
        &settings,
        Box::new(SilentAudio),
        Box::new(events.clone()),
    )
    .with_seed(seed)
    .with_clock(|| 0.0);

    let player = match PlayerIdentity::register("Autopilot", "autopilot@localhost", true) {
        Ok(player) => player,
        Err(e) => {
            log::error!("{}", e);
            return;
        }
    };
    session.set_player(Some(player));
    session.start();

    let frame_ms = FRAME_DT as f64 * 1000.0;
    // Ten minutes of game time at most
    let max_frames = 60 * 60 * 10;
    let mut timestamp = 0.0;
    let mut coins = 0u32;
    let mut report = None;

    for _ in 0..max_frames {
        if session.scheduler_mut().take_pending().is_none() {
            break;
        }
        timestamp += frame_ms;

        // Jump when the nearest grounded obstacle is about a quarter second out
        let state = session.state();
        let threat = state.obstacles.iter().any(|o| {
            let gap = o.x - (PLAYER_X + state.player.size);
            o.lift < state.player.size && gap > 0.0 && gap < o.speed * 0.25
        });
        if threat {
            session.jump();
        }

        let outcome = session.tick(timestamp);
        coins += events
            .drain()
            .iter()
            .filter(|e| matches!(e, PresentationEvent::FloatingText { text, .. } if !text.ends_with('s')))
            .count() as u32;
        if let TickOutcome::Ended(r) = outcome {
            report = Some(r);
            break;
        }
    }

    let Some(report) = report.or_else(|| session.end()) else {
        log::error!("Session never ran");
        return;
    };
    let Some(player) = report.player.clone() else {
        return;
    };

    println!("\nSeed {}: score {} ({} coins)", seed, report.score, coins);

    let cache = Rc::new(RefCell::new(Leaderboard::load()));
    let backend = LocalRanking::shared(cache.clone());
    let submission = ScoreSubmission::new(player, report.score);
    cache.borrow_mut().record(submission.to_entry());
    let snapshot = cache.borrow().clone();
    let outcome = pollster::block_on(ranking::report_score(&backend, submission, snapshot));
    session.apply_leaderboard(report.generation, outcome.board);

    for (i, entry) in session.leaderboard().top(ranking::LEADERBOARD_SIZE).iter().enumerate() {
        println!("{:>2}. {:<15} {}", i + 1, entry.name, entry.score);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
