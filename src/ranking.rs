//! Player registration, leaderboard cache and ranking backends
//!
//! Scores are always recorded in the local cache first (persisted to
//! LocalStorage), then offered to a remote backend. Any backend failure
//! degrades to the cache; nothing here can fail a session.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Registered names are cut to this many characters
pub const MAX_NAME_LEN: usize = 15;
/// Entries shown on the leaderboard
pub const LEADERBOARD_SIZE: usize = 20;

/// Why a registration form was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Player name is required")]
    EmptyName,
    #[error("Email is required")]
    EmptyEmail,
    #[error("Terms and conditions must be accepted")]
    TermsNotAccepted,
}

/// Ranking I/O failures. Always recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server returned status {0}")]
    Status(u16),
    #[error("Malformed ranking data: {0}")]
    Decode(String),
    #[error("Ranking backend unavailable")]
    Unavailable,
}

impl From<serde_json::Error> for RankingError {
    fn from(e: serde_json::Error) -> Self {
        RankingError::Decode(e.to_string())
    }
}

/// A registered player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub name: String,
    pub email: String,
}

impl PlayerIdentity {
    /// Validate a registration form. Inputs are trimmed and the name is cut to
    /// `MAX_NAME_LEN` characters.
    pub fn register(name: &str, email: &str, accepted_terms: bool) -> Result<Self, RegistrationError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if email.is_empty() {
            return Err(RegistrationError::EmptyEmail);
        }
        if !accepted_terms {
            return Err(RegistrationError::TermsNotAccepted);
        }
        Ok(Self {
            name: name.chars().take(MAX_NAME_LEN).collect(),
            email: email.to_string(),
        })
    }

    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "combo_runner_player";

    /// Previously registered player (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Option<Self> {
        let json = local_storage()?.get_item(Self::STORAGE_KEY).ok()??;
        serde_json::from_str(&json).ok()
    }

    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        if let (Some(storage), Ok(json)) = (local_storage(), serde_json::to_string(self)) {
            let _ = storage.set_item(Self::STORAGE_KEY, &json);
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Option<Self> {
        None
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {}
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub score: u64,
    /// Unix timestamp (ms) when achieved
    #[serde(default)]
    pub timestamp: f64,
}

impl RankingEntry {
    fn is_player(&self, player: &PlayerIdentity) -> bool {
        self.name == player.name && self.email == player.email
    }

    /// Name safe to drop into markup
    pub fn display_name(&self) -> String {
        let name: String = self.name.chars().take(MAX_NAME_LEN).collect();
        if name.is_empty() {
            "Anonymous".to_string()
        } else {
            escape_html(&name)
        }
    }
}

/// What gets sent to a ranking backend after a session ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub player: PlayerIdentity,
    pub score: u64,
    pub timestamp: f64,
}

impl ScoreSubmission {
    pub fn new(player: PlayerIdentity, score: u64) -> Self {
        Self {
            player,
            score,
            timestamp: timestamp_ms(),
        }
    }

    pub fn to_entry(&self) -> RankingEntry {
        RankingEntry {
            name: self.player.name.clone(),
            email: self.player.email.clone(),
            score: self.score,
            timestamp: self.timestamp,
        }
    }
}

/// Leaderboard, sorted by descending score. Ties keep arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    entries: Vec<RankingEntry>,
}

impl Leaderboard {
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "combo_runner_rankings";

    pub fn new() -> Self {
        Self::default()
    }

    /// Build from unordered rows (e.g. a backend response)
    pub fn from_entries(mut entries: Vec<RankingEntry>) -> Self {
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        Self { entries }
    }

    pub fn entries(&self) -> &[RankingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a score, keeping only each player's best.
    /// Returns true if the board changed.
    pub fn record(&mut self, entry: RankingEntry) -> bool {
        if let Some(i) = self
            .entries
            .iter()
            .position(|e| e.name == entry.name && e.email == entry.email)
        {
            if entry.score <= self.entries[i].score {
                return false;
            }
            self.entries.remove(i);
        }
        // After any equal scores, so ties keep arrival order
        let pos = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        true
    }

    /// Best `n` rows
    pub fn top(&self, n: usize) -> &[RankingEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// 1-indexed position of the player in the full board
    pub fn position_of(&self, player: &PlayerIdentity) -> Option<usize> {
        self.entries.iter().position(|e| e.is_player(player)).map(|i| i + 1)
    }

    /// Load the cached board from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let json = local_storage().and_then(|s| s.get_item(Self::STORAGE_KEY).ok().flatten());
        if let Some(json) = json {
            match serde_json::from_str::<Leaderboard>(&json) {
                Ok(board) => {
                    log::info!("Loaded {} cached rankings", board.len());
                    return Self::from_entries(board.entries);
                }
                Err(e) => log::warn!("Ignoring corrupt ranking cache: {}", e),
            }
        }
        Self::new()
    }

    /// Save the board to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        if let (Some(storage), Ok(json)) = (local_storage(), serde_json::to_string(self)) {
            let _ = storage.set_item(Self::STORAGE_KEY, &json);
            log::info!("Rankings saved ({} entries)", self.entries.len());
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {}
}

/// Escape the characters that matter inside HTML text and attributes
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wall-clock milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn timestamp_ms() -> f64 {
    js_sys::Date::now()
}

/// Wall-clock milliseconds since the Unix epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn timestamp_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok()).flatten()
}

pub type RankingFuture<T> = Pin<Box<dyn Future<Output = Result<T, RankingError>>>>;

/// Remote (or pretend-remote) score store
pub trait RankingBackend {
    fn submit(&self, submission: &ScoreSubmission) -> RankingFuture<()>;
    /// Every ranked entry, in any order
    fn fetch_all(&self) -> RankingFuture<Vec<RankingEntry>>;
}

/// Backend that only uses the shared local board
#[derive(Debug, Clone, Default)]
pub struct LocalRanking {
    board: Rc<RefCell<Leaderboard>>,
}

impl LocalRanking {
    pub fn new(board: Leaderboard) -> Self {
        Self::shared(Rc::new(RefCell::new(board)))
    }

    /// Use a board the caller also holds (the page's local cache)
    pub fn shared(board: Rc<RefCell<Leaderboard>>) -> Self {
        Self { board }
    }

    pub fn snapshot(&self) -> Leaderboard {
        self.board.borrow().clone()
    }
}

impl RankingBackend for LocalRanking {
    fn submit(&self, submission: &ScoreSubmission) -> RankingFuture<()> {
        let board = self.board.clone();
        let entry = submission.to_entry();
        Box::pin(async move {
            let mut board = board.borrow_mut();
            if board.record(entry) {
                board.save();
            }
            Ok(())
        })
    }

    fn fetch_all(&self) -> RankingFuture<Vec<RankingEntry>> {
        let board = self.board.clone();
        Box::pin(async move { Ok(board.borrow().entries().to_vec()) })
    }
}

/// Result of a ranking round trip
#[derive(Debug, Clone, PartialEq)]
pub struct RankingOutcome {
    pub board: Leaderboard,
    /// Backend failed and `board` is the local cache
    pub from_cache: bool,
}

/// Fetch the full leaderboard, falling back to `cache` on any backend error.
/// Display code trims it with `top(LEADERBOARD_SIZE)`; positions use all of it.
pub async fn fetch_leaderboard(backend: &dyn RankingBackend, cache: Leaderboard) -> RankingOutcome {
    match backend.fetch_all().await {
        Ok(entries) => RankingOutcome {
            board: Leaderboard::from_entries(entries),
            from_cache: false,
        },
        Err(e) => {
            log::warn!("Could not load rankings, showing local data: {}", e);
            RankingOutcome {
                board: cache,
                from_cache: true,
            }
        }
    }
}

/// Submit a finished session's score, then fetch the fresh board.
///
/// The caller records the score into `cache` first so a failed submit still
/// leaves it in the local board.
pub async fn report_score(
    backend: &dyn RankingBackend,
    submission: ScoreSubmission,
    cache: Leaderboard,
) -> RankingOutcome {
    log::info!(
        "Submitting score {} for {}",
        submission.score,
        submission.player.name
    );
    if let Err(e) = backend.submit(&submission).await {
        log::warn!("Score submission failed: {}", e);
    }
    fetch_leaderboard(backend, cache).await
}

#[cfg(target_arch = "wasm32")]
pub use http::HttpRanking;

#[cfg(target_arch = "wasm32")]
mod http {
    use wasm_bindgen::JsCast;
    use wasm_bindgen::JsValue;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

    use super::{RankingBackend, RankingEntry, RankingError, RankingFuture, ScoreSubmission};

    fn js_err(e: JsValue) -> RankingError {
        RankingError::Network(format!("{:?}", e))
    }

    /// JSON ranking service reached with the fetch API
    #[derive(Debug, Clone)]
    pub struct HttpRanking {
        url: String,
    }

    impl HttpRanking {
        pub fn new(url: impl Into<String>) -> Self {
            Self { url: url.into() }
        }
    }

    async fn fetch_text(request: Request) -> Result<String, RankingError> {
        let window = web_sys::window().ok_or(RankingError::Unavailable)?;
        let value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_err)?;
        let response: Response = value.dyn_into().map_err(js_err)?;
        if !response.ok() {
            return Err(RankingError::Status(response.status()));
        }
        let body = JsFuture::from(response.text().map_err(js_err)?)
            .await
            .map_err(js_err)?;
        body.as_string()
            .ok_or_else(|| RankingError::Decode("response body is not text".to_string()))
    }

    impl RankingBackend for HttpRanking {
        fn submit(&self, submission: &ScoreSubmission) -> RankingFuture<()> {
            let url = self.url.clone();
            let body = serde_json::to_string(&submission.to_entry());
            Box::pin(async move {
                let body = body?;
                let init = RequestInit::new();
                init.set_method("POST");
                init.set_mode(RequestMode::Cors);
                let headers = Headers::new().map_err(js_err)?;
                headers
                    .set("Content-Type", "application/json")
                    .map_err(js_err)?;
                init.set_headers(&headers);
                init.set_body(&JsValue::from_str(&body));

                let request = Request::new_with_str_and_init(&url, &init).map_err(js_err)?;
                fetch_text(request).await?;
                Ok(())
            })
        }

        fn fetch_all(&self) -> RankingFuture<Vec<RankingEntry>> {
            let url = self.url.clone();
            Box::pin(async move {
                let request = Request::new_with_str(&url).map_err(js_err)?;
                let text = fetch_text(request).await?;
                Ok(serde_json::from_str(&text)?)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, score: u64) -> RankingEntry {
        RankingEntry {
            name: name.to_string(),
            email: format!("{}@example.com", name),
            score,
            timestamp: 0.0,
        }
    }

    fn player(name: &str) -> PlayerIdentity {
        PlayerIdentity {
            name: name.to_string(),
            email: format!("{}@example.com", name),
        }
    }

    struct FailingBackend;

    impl RankingBackend for FailingBackend {
        fn submit(&self, _submission: &ScoreSubmission) -> RankingFuture<()> {
            Box::pin(async { Err(RankingError::Status(503)) })
        }

        fn fetch_all(&self) -> RankingFuture<Vec<RankingEntry>> {
            Box::pin(async { Err(RankingError::Network("offline".to_string())) })
        }
    }

    /// Serves a fixed, unordered payload like a remote service would
    struct FixedBackend(Vec<RankingEntry>);

    impl RankingBackend for FixedBackend {
        fn submit(&self, _submission: &ScoreSubmission) -> RankingFuture<()> {
            Box::pin(async { Ok(()) })
        }

        fn fetch_all(&self) -> RankingFuture<Vec<RankingEntry>> {
            let entries = self.0.clone();
            Box::pin(async move { Ok(entries) })
        }
    }

    #[test]
    fn test_registration_trims_and_truncates() {
        let p = PlayerIdentity::register("  Alexandria the Great  ", " a@b.c ", true).unwrap();
        assert_eq!(p.name, "Alexandria the ");
        assert_eq!(p.name.chars().count(), MAX_NAME_LEN);
        assert_eq!(p.email, "a@b.c");
    }

    #[test]
    fn test_registration_rejects_missing_fields() {
        assert_eq!(
            PlayerIdentity::register("   ", "a@b.c", true),
            Err(RegistrationError::EmptyName)
        );
        assert_eq!(
            PlayerIdentity::register("Ana", "", true),
            Err(RegistrationError::EmptyEmail)
        );
        assert_eq!(
            PlayerIdentity::register("Ana", "a@b.c", false),
            Err(RegistrationError::TermsNotAccepted)
        );
    }

    #[test]
    fn test_leaderboard_sorted_and_stable() {
        let board = Leaderboard::from_entries(vec![
            entry("a", 10),
            entry("b", 30),
            entry("c", 10),
            entry("d", 20),
        ]);
        let names: Vec<_> = board.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b", "d", "a", "c"]);
    }

    #[test]
    fn test_record_keeps_best_score_per_player() {
        let mut board = Leaderboard::new();
        assert!(board.record(entry("ana", 50)));
        assert!(board.record(entry("bo", 40)));
        assert!(!board.record(entry("ana", 30)));
        assert_eq!(board.len(), 2);

        assert!(board.record(entry("ana", 90)));
        assert_eq!(board.len(), 2);
        assert_eq!(board.entries()[0].score, 90);
    }

    #[test]
    fn test_record_ties_keep_arrival_order() {
        let mut board = Leaderboard::new();
        board.record(entry("first", 10));
        board.record(entry("second", 10));
        assert_eq!(board.entries()[0].name, "first");
        assert_eq!(board.entries()[1].name, "second");
    }

    #[test]
    fn test_top_and_position() {
        let mut board = Leaderboard::new();
        for i in 0..30 {
            board.record(entry(&format!("p{}", i), i));
        }
        assert_eq!(board.top(LEADERBOARD_SIZE).len(), LEADERBOARD_SIZE);
        assert_eq!(board.top(100).len(), 30);
        assert_eq!(board.position_of(&player("p29")), Some(1));
        assert_eq!(board.position_of(&player("p0")), Some(30));
        assert_eq!(board.position_of(&player("nobody")), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(entry("<script>", 1).display_name(), "&lt;script&gt;");
        assert_eq!(entry("", 1).display_name(), "Anonymous");
    }

    #[test]
    fn test_local_backend_round_trip() {
        let backend = LocalRanking::new(Leaderboard::new());
        let submission = ScoreSubmission::new(player("ana"), 120);
        let outcome = pollster::block_on(report_score(&backend, submission, Leaderboard::new()));
        assert!(!outcome.from_cache);
        assert_eq!(outcome.board.len(), 1);
        assert_eq!(outcome.board.entries()[0].score, 120);
        assert_eq!(backend.snapshot().len(), 1);
    }

    #[test]
    fn test_position_beyond_displayed_rows() {
        let mut rows: Vec<_> = (0..30).map(|i| entry(&format!("p{}", i), 100 + i)).collect();
        rows.push(entry("late", 1));
        let outcome =
            pollster::block_on(fetch_leaderboard(&FixedBackend(rows), Leaderboard::new()));
        assert!(!outcome.from_cache);

        let board = outcome.board;
        assert_eq!(board.len(), 31);
        assert_eq!(board.top(LEADERBOARD_SIZE).len(), LEADERBOARD_SIZE);
        assert_eq!(board.position_of(&player("late")), Some(31));
        assert_eq!(board.position_of(&player("p29")), Some(1));
    }

    #[test]
    fn test_shared_local_board_records_once() {
        let cache = Rc::new(RefCell::new(Leaderboard::new()));
        let backend = LocalRanking::shared(cache.clone());
        let submission = ScoreSubmission::new(player("ana"), 40);

        // The page records into its cache before reporting
        assert!(cache.borrow_mut().record(submission.to_entry()));
        let snapshot = cache.borrow().clone();
        let outcome = pollster::block_on(report_score(&backend, submission, snapshot));

        assert_eq!(outcome.board.len(), 1);
        assert_eq!(cache.borrow().len(), 1);
        assert_eq!(backend.snapshot(), *cache.borrow());
    }

    #[test]
    fn test_failing_backend_falls_back_to_cache() {
        let mut cache = Leaderboard::new();
        let submission = ScoreSubmission::new(player("ana"), 75);
        cache.record(submission.to_entry());

        let outcome = pollster::block_on(report_score(&FailingBackend, submission, cache.clone()));
        assert!(outcome.from_cache);
        assert_eq!(outcome.board, cache);
    }

    #[test]
    fn test_backend_payload_parses() {
        let json = r#"[{"name":"ana","score":5},{"name":"bo","email":"b@x","score":9,"timestamp":1.0}]"#;
        let entries: Vec<RankingEntry> = serde_json::from_str(json).unwrap();
        let board = Leaderboard::from_entries(entries);
        assert_eq!(board.entries()[0].name, "bo");
        assert_eq!(board.entries()[1].email, "");
    }

    #[test]
    fn test_decode_error_maps() {
        let err: RankingError = serde_json::from_str::<Vec<RankingEntry>>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, RankingError::Decode(_)));
    }
}
