//! Chat engine — transcript state, the send handler and the typing reveal.
//!
//! One turn: `submit` appends the user message, asks the [`ResponseService`]
//! for a reply (bounded by a timeout and a cancellation token), then walks the
//! [`Reveal`] machine with the injected [`Ticker`] pacing each character, and
//! finally appends the assistant message. Views follow along through
//! [`ChatEvent`]s and the [`EngineStatus`] watch channel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::message::Message;
use crate::chat::reveal::{Reveal, RevealStep};
use crate::chat::ticker::{Ticker, TokioTicker};
use crate::config::ChatConfig;
use crate::context::{Session, SessionContext};
use crate::error::ChatError;
use crate::llm::ResponseService;

const EVENT_CAPACITY: usize = 1024;

/// Longest session name derived from a first message.
const SESSION_TITLE_MAX_CHARS: usize = 40;

/// What happened to a `submit`/`retry` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input or a turn already running; nothing changed.
    Ignored,
    /// The assistant message was appended.
    Completed,
    /// The response step failed; see [`ChatEngine::last_error`].
    Failed,
}

/// Busy/typing flags, observable while a turn is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatus {
    pub busy: bool,
    pub typing: bool,
}

/// Notifications for views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A message was appended at `index`; views scroll to the bottom.
    MessageAppended { index: usize, message: Message },
    /// Waiting on the response service.
    ResponsePending,
    /// Reveal of a `total`-character response began.
    RevealStarted { total: usize },
    /// The first `position` characters are visible.
    RevealProgress {
        position: usize,
        total: usize,
        partial: String,
    },
    /// The response step failed; the transcript keeps the user message.
    ResponseFailed { reason: String, retryable: bool },
    /// The transcript was replaced (new chat or a loaded session).
    TranscriptReset { session_id: Option<String> },
}

/// The chat engine. Single writer: every mutation goes through `&mut self`.
pub struct ChatEngine {
    config: ChatConfig,
    context: SessionContext,
    responder: Arc<dyn ResponseService>,
    ticker: Arc<dyn Ticker>,
    /// Session whose transcript is loaded; `None` until the first submit.
    session_id: Option<String>,
    transcript: Vec<Message>,
    input: String,
    partial: String,
    status: Arc<watch::Sender<EngineStatus>>,
    last_error: Option<ChatError>,
    /// The last user message has no reply yet.
    awaiting_reply: bool,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatEngine {
    pub fn new(
        config: ChatConfig,
        context: SessionContext,
        responder: Arc<dyn ResponseService>,
    ) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        let (status, _rx) = watch::channel(EngineStatus::default());
        Self {
            transcript: vec![Message::assistant(config.welcome_message.clone())],
            config,
            context,
            responder,
            ticker: Arc::new(TokioTicker),
            session_id: None,
            input: String::new(),
            partial: String::new(),
            status: Arc::new(status),
            last_error: None,
            awaiting_reply: false,
            events,
        }
    }

    /// Replace the delay source (tests use `InstantTicker`).
    pub fn with_ticker(mut self, ticker: Arc<dyn Ticker>) -> Self {
        self.ticker = ticker;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<EngineStatus> {
        self.status.subscribe()
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Never empty: starts with the welcome message.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_busy(&self) -> bool {
        self.status.borrow().busy
    }

    pub fn is_typing(&self) -> bool {
        self.status.borrow().typing
    }

    /// Text revealed so far; empty unless typing.
    pub fn partial(&self) -> &str {
        if self.is_typing() {
            &self.partial
        } else {
            ""
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&ChatError> {
        self.last_error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn can_retry(&self) -> bool {
        self.awaiting_reply && !self.is_busy()
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    // ── Turns ───────────────────────────────────────────────────────

    /// Submit the current input buffer.
    pub async fn submit_input(&mut self) -> SubmitOutcome {
        let text = self.input.clone();
        self.submit(&text).await
    }

    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        self.submit_with_cancel(text, &CancellationToken::new())
            .await
    }

    /// Run one turn. Cancelling `cancel` aborts the response wait, or skips the
    /// rest of the reveal if the reply already arrived.
    pub async fn submit_with_cancel(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
    ) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        if self.is_busy() {
            debug!("Submit ignored, a response is in progress");
            return SubmitOutcome::Ignored;
        }

        self.last_error = None;
        let _turn = self.begin_turn();
        self.ensure_session(text).await;
        self.input.clear();
        self.append(Message::user(text)).await;
        self.awaiting_reply = true;

        self.run_response(cancel).await
    }

    pub async fn retry(&mut self) -> Result<SubmitOutcome, ChatError> {
        self.retry_with_cancel(&CancellationToken::new()).await
    }

    /// Ask again for a reply to the last, unanswered user message.
    pub async fn retry_with_cancel(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<SubmitOutcome, ChatError> {
        if self.is_busy() {
            return Err(ChatError::Busy);
        }
        if !self.awaiting_reply {
            return Err(ChatError::NothingToRetry);
        }
        self.last_error = None;
        let _turn = self.begin_turn();
        Ok(self.run_response(cancel).await)
    }

    async fn run_response(&mut self, cancel: &CancellationToken) -> SubmitOutcome {
        let _ = self.events.send(ChatEvent::ResponsePending);
        let preferences = self.context.preferences().await;
        let timeout = self.config.response_timeout;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ChatError::Cancelled),
            reply = tokio::time::timeout(
                timeout,
                self.responder.respond(&self.transcript, &preferences),
            ) => match reply {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(e)) => Err(ChatError::Response(e)),
                Err(_) => Err(ChatError::Timeout(timeout)),
            },
        };

        match result {
            Ok(text) => {
                self.reveal(text, cancel).await;
                SubmitOutcome::Completed
            }
            Err(e) => {
                self.fail(e);
                SubmitOutcome::Failed
            }
        }
    }

    async fn reveal(&mut self, text: String, cancel: &CancellationToken) {
        let mut reveal = Reveal::new(text);
        let total = reveal.len();
        self.set_status(true, true);
        let _ = self.events.send(ChatEvent::RevealStarted { total });

        loop {
            let step = if reveal.needs_delay() {
                let cancelled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = self.ticker.wait(self.config.typing_delay) => false,
                };
                if cancelled {
                    debug!(position = ?reveal.phase(), "Reveal skipped");
                    Some(reveal.finish())
                } else {
                    reveal.advance()
                }
            } else {
                reveal.advance()
            };

            match step {
                Some(RevealStep::Revealed { position, partial }) => {
                    self.partial.clone_from(&partial);
                    let _ = self.events.send(ChatEvent::RevealProgress {
                        position,
                        total,
                        partial,
                    });
                }
                Some(RevealStep::Finished(full)) => {
                    self.partial.clear();
                    self.awaiting_reply = false;
                    self.append(Message::assistant(full)).await;
                    break;
                }
                None => break,
            }
        }

        self.set_status(false, false);
        info!(chars = total, "Response revealed");
    }

    fn fail(&mut self, error: ChatError) {
        warn!(error = %error, "Response step failed");
        self.partial.clear();
        self.set_status(false, false);
        let _ = self.events.send(ChatEvent::ResponseFailed {
            reason: error.to_string(),
            retryable: error.is_retryable(),
        });
        self.last_error = Some(error);
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// Start over with only the welcome message and no active session.
    pub async fn new_chat(&mut self) -> Result<(), ChatError> {
        if self.is_busy() {
            return Err(ChatError::Busy);
        }
        self.reset(None, Vec::new());
        self.context.set_active_session(None).await;
        Ok(())
    }

    /// Load a stored session's transcript. No-op if it is already loaded.
    pub async fn open_session(&mut self, id: &str) -> Result<(), ChatError> {
        if self.session_id.as_deref() == Some(id) {
            return Ok(());
        }
        if self.is_busy() {
            return Err(ChatError::Busy);
        }
        if self.context.find_session(id).await.is_none() {
            return Err(ChatError::SessionNotFound(id.to_string()));
        }

        let history = match self.context.store() {
            Some(store) => store.list_messages(id).await?,
            None => Vec::new(),
        };
        info!(session_id = id, messages = history.len(), "Session opened");

        self.reset(Some(id.to_string()), history);
        if self.context.active_session().await.as_deref() != Some(id) {
            self.context.set_active_session(Some(id.to_string())).await;
        }
        Ok(())
    }

    fn reset(&mut self, session_id: Option<String>, history: Vec<Message>) {
        self.transcript = Vec::with_capacity(history.len() + 1);
        self.transcript
            .push(Message::assistant(self.config.welcome_message.clone()));
        self.transcript.extend(history);
        self.awaiting_reply = self.transcript.last().is_some_and(Message::is_user);
        self.session_id = session_id.clone();
        self.partial.clear();
        self.last_error = None;
        let _ = self.events.send(ChatEvent::TranscriptReset { session_id });
    }

    /// The first message of a fresh chat creates and activates a session.
    async fn ensure_session(&mut self, first_message: &str) {
        if self.session_id.is_some() {
            return;
        }
        let session = Session::new(Some(session_title(first_message)));
        let id = session.id.clone();
        info!(session_id = %id, "New session");
        self.context.add_session(session).await;
        self.session_id = Some(id.clone());
        self.context.set_active_session(Some(id)).await;
    }

    async fn append(&mut self, message: Message) {
        if let (Some(store), Some(id)) = (self.context.store(), self.session_id.as_deref()) {
            if let Err(e) = store.append_message(id, &message).await {
                warn!(error = %e, session_id = id, "Failed to persist message");
            }
        }
        self.transcript.push(message.clone());
        let index = self.transcript.len() - 1;
        let _ = self
            .events
            .send(ChatEvent::MessageAppended { index, message });
    }

    /// Mark the engine busy until the returned guard drops, even if the
    /// turn's future is dropped before it finishes.
    fn begin_turn(&mut self) -> TurnGuard {
        self.partial.clear();
        self.set_status(true, false);
        TurnGuard {
            status: Arc::clone(&self.status),
        }
    }

    fn set_status(&self, busy: bool, typing: bool) {
        self.status.send_replace(EngineStatus { busy, typing });
    }
}

struct TurnGuard {
    status: Arc<watch::Sender<EngineStatus>>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.status.send_replace(EngineStatus::default());
    }
}

/// Session name from the first line of the first message.
pub fn session_title(text: &str) -> String {
    let line = text.trim().lines().next().unwrap_or_default().trim();
    if line.chars().count() <= SESSION_TITLE_MAX_CHARS {
        return line.to_string();
    }
    let mut title: String = line.chars().take(SESSION_TITLE_MAX_CHARS).collect();
    title.push('…');
    title
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::chat::ticker::InstantTicker;
    use crate::config::{PLACEHOLDER_RESPONSE, WELCOME_MESSAGE};
    use crate::context::Preferences;
    use crate::error::LlmError;
    use crate::llm::PlaceholderResponder;
    use crate::store::{MemoryStore, Store};

    /// Replays scripted results and records every transcript it was given.
    #[derive(Default)]
    struct ScriptedResponder {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedResponder {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Vec<Message>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResponseService for ScriptedResponder {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn respond(
            &self,
            transcript: &[Message],
            _preferences: &Preferences,
        ) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(transcript.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(PLACEHOLDER_RESPONSE.to_string()))
        }
    }

    /// Signals when called, then never answers.
    #[derive(Default)]
    struct HangingResponder {
        called: Notify,
    }

    #[async_trait]
    impl ResponseService for HangingResponder {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn respond(&self, _: &[Message], _: &Preferences) -> Result<String, LlmError> {
            self.called.notify_one();
            std::future::pending().await
        }
    }

    /// Never answers the first request; answers later ones.
    #[derive(Default)]
    struct HangsOnceResponder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResponseService for HangsOnceResponder {
        fn name(&self) -> &str {
            "hangs-once"
        }

        async fn respond(&self, _: &[Message], _: &Preferences) -> Result<String, LlmError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Ok("Answered".to_string())
        }
    }

    /// Cancels the token on the n-th wait.
    struct CancellingTicker {
        token: CancellationToken,
        after: usize,
        waits: Mutex<usize>,
    }

    #[async_trait]
    impl Ticker for CancellingTicker {
        async fn wait(&self, _delay: Duration) {
            let mut waits = self.waits.lock().unwrap();
            *waits += 1;
            if *waits >= self.after {
                self.token.cancel();
            }
        }
    }

    fn engine_with(responder: Arc<dyn ResponseService>) -> (ChatEngine, Arc<InstantTicker>) {
        let ticker = Arc::new(InstantTicker::new());
        let engine = ChatEngine::new(ChatConfig::default(), SessionContext::new(), responder)
            .with_ticker(ticker.clone());
        (engine, ticker)
    }

    fn drain(rx: &mut broadcast::Receiver<ChatEvent>) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn starts_with_welcome_only() {
        let (engine, _) = engine_with(Arc::new(PlaceholderResponder::new()));
        assert_eq!(engine.transcript(), &[Message::assistant(WELCOME_MESSAGE)]);
        assert!(!engine.is_busy());
        assert!(!engine.is_typing());
        assert_eq!(engine.session_id(), None);
    }

    #[tokio::test]
    async fn whitespace_submit_changes_nothing() {
        let (mut engine, ticker) = engine_with(Arc::new(PlaceholderResponder::new()));
        let mut rx = engine.subscribe();
        engine.set_input("   ");

        assert_eq!(engine.submit_input().await, SubmitOutcome::Ignored);
        assert_eq!(engine.transcript().len(), 1);
        assert_eq!(engine.input(), "   ");
        assert!(!engine.is_busy());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(ticker.count(), 0);
    }

    #[tokio::test]
    async fn zakat_scenario_with_placeholder() {
        let responder = ScriptedResponder::new(vec![]);
        let (mut engine, ticker) = engine_with(responder.clone());
        let mut rx = engine.subscribe();
        engine.set_input("What is Zakat?");

        assert_eq!(engine.submit_input().await, SubmitOutcome::Completed);

        // The responder saw [welcome, user]: the user message came first.
        assert_eq!(
            responder.seen(),
            vec![vec![
                Message::assistant(WELCOME_MESSAGE),
                Message::user("What is Zakat?")
            ]]
        );
        assert_eq!(
            engine.transcript(),
            &[
                Message::assistant(WELCOME_MESSAGE),
                Message::user("What is Zakat?"),
                Message::assistant(PLACEHOLDER_RESPONSE),
            ]
        );
        assert!(!engine.is_busy());
        assert!(!engine.is_typing());
        assert_eq!(engine.partial(), "");
        assert_eq!(engine.input(), "");

        let n = PLACEHOLDER_RESPONSE.chars().count();
        let events = drain(&mut rx);
        let progress: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ChatEvent::RevealProgress { .. }))
            .collect();
        assert_eq!(progress.len(), n);
        let appends: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::MessageAppended { index, message } => Some((*index, message.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            appends,
            vec![
                (1, Message::user("What is Zakat?")),
                (2, Message::assistant(PLACEHOLDER_RESPONSE)),
            ]
        );
        assert_eq!(ticker.count(), n - 1);
        assert!(ticker
            .waits()
            .iter()
            .all(|d| *d == Duration::from_millis(25)));
    }

    #[tokio::test]
    async fn busy_while_waiting_for_response() {
        let responder = Arc::new(HangingResponder::default());
        let (mut engine, _) = engine_with(responder.clone());
        let status = engine.status();
        let cancel = CancellationToken::new();

        {
            let turn = engine.submit_with_cancel("What is Zakat?", &cancel);
            tokio::pin!(turn);
            tokio::select! {
                _ = &mut turn => panic!("turn finished without a reply"),
                _ = responder.called.notified() => {}
            }
            assert_eq!(*status.borrow(), EngineStatus { busy: true, typing: false });
            cancel.cancel();
            assert_eq!(turn.await, SubmitOutcome::Failed);
        }

        assert!(!engine.is_busy());
        assert_eq!(engine.transcript().len(), 2);
        assert!(matches!(engine.last_error(), Some(ChatError::Cancelled)));
    }

    #[tokio::test]
    async fn dropping_a_turn_leaves_engine_usable() {
        let (mut engine, _) = engine_with(Arc::new(HangsOnceResponder::default()));

        let dropped = tokio::time::timeout(Duration::from_millis(20), engine.submit("hi")).await;
        assert!(dropped.is_err());
        assert!(!engine.is_busy());
        assert!(!engine.is_typing());
        assert_eq!(engine.partial(), "");
        assert!(engine.can_retry());

        assert_eq!(engine.submit("again").await, SubmitOutcome::Completed);
        assert_eq!(
            &engine.transcript()[1..],
            &[
                Message::user("hi"),
                Message::user("again"),
                Message::assistant("Answered"),
            ]
        );
    }

    #[tokio::test]
    async fn empty_response_appends_empty_message() {
        let responder = ScriptedResponder::new(vec![Ok(String::new())]);
        let (mut engine, ticker) = engine_with(responder);
        let mut rx = engine.subscribe();

        assert_eq!(engine.submit("hello").await, SubmitOutcome::Completed);
        assert_eq!(engine.transcript().last(), Some(&Message::assistant("")));
        assert_eq!(ticker.count(), 0);
        let events = drain(&mut rx);
        assert!(!events
            .iter()
            .any(|e| matches!(e, ChatEvent::RevealProgress { .. })));
        assert!(events.contains(&ChatEvent::RevealStarted { total: 0 }));
    }

    #[tokio::test]
    async fn same_text_twice_gives_two_user_messages() {
        let (mut engine, _) = engine_with(Arc::new(PlaceholderResponder::new()));
        engine.submit("salam").await;
        engine.submit("salam").await;
        let users = engine
            .transcript()
            .iter()
            .filter(|m| m.is_user() && m.content == "salam")
            .count();
        assert_eq!(users, 2);
        assert_eq!(engine.transcript().len(), 5);
    }

    #[tokio::test]
    async fn failure_keeps_user_message_and_allows_retry() {
        let responder = ScriptedResponder::new(vec![
            Err(LlmError::RequestFailed {
                provider: "scripted".into(),
                reason: "boom".into(),
            }),
            Ok("Recovered".into()),
        ]);
        let (mut engine, _) = engine_with(responder.clone());
        let mut rx = engine.subscribe();

        assert_eq!(engine.submit("question").await, SubmitOutcome::Failed);
        assert_eq!(engine.transcript().len(), 2);
        assert_eq!(engine.transcript()[1], Message::user("question"));
        assert!(!engine.is_busy());
        assert!(engine.can_retry());
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            ChatEvent::ResponseFailed { retryable: true, .. }
        )));

        assert_eq!(engine.retry().await.unwrap(), SubmitOutcome::Completed);
        assert_eq!(
            &engine.transcript()[1..],
            &[Message::user("question"), Message::assistant("Recovered")]
        );
        assert!(engine.last_error().is_none());
        assert!(!engine.can_retry());
        // Retry did not append a second user message.
        assert_eq!(responder.seen()[1].len(), 2);
    }

    #[tokio::test]
    async fn retry_without_failure_is_rejected() {
        let (mut engine, _) = engine_with(Arc::new(PlaceholderResponder::new()));
        assert!(matches!(
            engine.retry().await,
            Err(ChatError::NothingToRetry)
        ));
        engine.submit("hi").await;
        assert!(matches!(
            engine.retry().await,
            Err(ChatError::NothingToRetry)
        ));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let config = ChatConfig {
            response_timeout: Duration::from_millis(20),
            ..ChatConfig::default()
        };
        let mut engine = ChatEngine::new(
            config,
            SessionContext::new(),
            Arc::new(HangingResponder::default()),
        )
        .with_ticker(Arc::new(InstantTicker::new()));

        assert_eq!(engine.submit("hello").await, SubmitOutcome::Failed);
        assert!(matches!(engine.last_error(), Some(ChatError::Timeout(_))));
        assert_eq!(engine.transcript().len(), 2);
        assert!(engine.can_retry());
    }

    #[tokio::test]
    async fn cancel_during_reveal_appends_full_text() {
        let token = CancellationToken::new();
        let ticker = Arc::new(CancellingTicker {
            token: token.clone(),
            after: 2,
            waits: Mutex::new(0),
        });
        let mut engine = ChatEngine::new(
            ChatConfig::default(),
            SessionContext::new(),
            ScriptedResponder::new(vec![Ok("abcdef".into())]),
        )
        .with_ticker(ticker);
        let mut rx = engine.subscribe();

        assert_eq!(
            engine.submit_with_cancel("go", &token).await,
            SubmitOutcome::Completed
        );
        assert_eq!(engine.transcript().last(), Some(&Message::assistant("abcdef")));
        assert!(!engine.is_typing());
        let progress = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, ChatEvent::RevealProgress { .. }))
            .count();
        assert!(progress < 6);
    }

    #[tokio::test]
    async fn first_submit_creates_and_persists_session() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let context = SessionContext::with_store(Arc::clone(&store));
        let mut engine = ChatEngine::new(
            ChatConfig::default(),
            context.clone(),
            Arc::new(PlaceholderResponder::new()),
        )
        .with_ticker(Arc::new(InstantTicker::new()));

        engine.submit("What is Zakat?").await;

        let id = context.active_session().await.expect("active session");
        assert_eq!(engine.session_id(), Some(id.as_str()));
        assert_eq!(
            context.find_session(&id).await.unwrap().display_name(),
            "What is Zakat?"
        );
        assert_eq!(
            store.list_messages(&id).await.unwrap(),
            vec![
                Message::user("What is Zakat?"),
                Message::assistant(PLACEHOLDER_RESPONSE)
            ]
        );
    }

    #[tokio::test]
    async fn open_session_loads_transcript_and_new_chat_resets() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let context = SessionContext::with_store(Arc::clone(&store));
        let session = Session::with_id("s1", Some("Fasting".into()));
        context.add_session(session).await;
        store.append_message("s1", &Message::user("When is Ramadan?")).await.unwrap();

        let mut engine = ChatEngine::new(
            ChatConfig::default(),
            context.clone(),
            Arc::new(PlaceholderResponder::new()),
        )
        .with_ticker(Arc::new(InstantTicker::new()));

        engine.open_session("s1").await.unwrap();
        assert_eq!(
            engine.transcript(),
            &[
                Message::assistant(WELCOME_MESSAGE),
                Message::user("When is Ramadan?")
            ]
        );
        assert_eq!(context.active_session().await.as_deref(), Some("s1"));
        // Unanswered last message can be retried.
        assert!(engine.can_retry());

        assert!(matches!(
            engine.open_session("nope").await,
            Err(ChatError::SessionNotFound(_))
        ));

        engine.new_chat().await.unwrap();
        assert_eq!(engine.transcript().len(), 1);
        assert_eq!(engine.session_id(), None);
        assert_eq!(context.active_session().await, None);
    }

    #[test]
    fn session_title_uses_first_line() {
        assert_eq!(session_title("  What is Zakat?\nmore"), "What is Zakat?");
        let long = "a".repeat(60);
        let title = session_title(&long);
        assert_eq!(title.chars().count(), 41);
        assert!(title.ends_with('…'));
    }
}
