//! Line-oriented REPL over the chat engine and the three screens.

use std::collections::VecDeque;
use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::chat::{ChatEngine, ChatEvent, Role};
use crate::cli::command::{Command, HELP};
use crate::context::{ContextEvent, SessionContext};
use crate::error::CliError;
use crate::screens::chat::{LOADING_INDICATOR, banner};
use crate::screens::{ChatView, HistoryScreen, SettingsScreen};

const PROMPT: &str = "> ";
const BUSY_NOTICE: &str = "Still responding… queued until the reply finishes (/cancel to stop).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Chat,
    History,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Continue,
    Quit,
}

enum Turn {
    Submit(String),
    Retry,
}

/// Read stdin lines on a background task.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let reader = BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

pub struct Repl<W> {
    engine: ChatEngine,
    context: SessionContext,
    context_events: broadcast::Receiver<ContextEvent>,
    history: HistoryScreen,
    settings: SettingsScreen,
    view: ChatView,
    tab: Tab,
    /// Lines typed during a turn, handled once it finishes.
    queued: VecDeque<String>,
    out: W,
}

impl<W: Write> Repl<W> {
    pub fn new(engine: ChatEngine, context: SessionContext, out: W) -> Self {
        Self {
            engine,
            context_events: context.subscribe(),
            history: HistoryScreen::new(context.clone()),
            settings: SettingsScreen::new(context.clone()),
            context,
            view: ChatView::default(),
            tab: Tab::Chat,
            queued: VecDeque::new(),
            out,
        }
    }

    pub fn engine(&self) -> &ChatEngine {
        &self.engine
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Open the restored session, then process lines until `/quit` or EOF.
    pub async fn run(&mut self, mut lines: mpsc::UnboundedReceiver<String>) -> Result<(), CliError> {
        if let Some(id) = self.context.active_session().await {
            if let Err(e) = self.engine.open_session(&id).await {
                debug!(error = %e, "Could not reopen last session");
            }
        }
        self.show().await?;
        self.prompt()?;

        loop {
            let line = match self.queued.pop_front() {
                Some(line) => line,
                None => match lines.recv().await {
                    Some(line) => line,
                    None => break,
                },
            };
            let control = match Command::parse(&line) {
                Ok(Some(command)) => self.handle(command, &mut lines).await?,
                Ok(None) => Control::Continue,
                Err(e) => {
                    writeln!(self.out, "{e}")?;
                    Control::Continue
                }
            };
            self.follow_active_session().await?;
            if control == Control::Quit {
                return Ok(());
            }
            self.prompt()?;
        }
        Ok(())
    }

    async fn handle(
        &mut self,
        command: Command,
        lines: &mut mpsc::UnboundedReceiver<String>,
    ) -> Result<Control, CliError> {
        match command {
            Command::Say(text) => {
                self.tab = Tab::Chat;
                return self.run_turn(Turn::Submit(text), lines).await;
            }
            Command::Retry => {
                self.tab = Tab::Chat;
                return self.run_turn(Turn::Retry, lines).await;
            }
            Command::Chat => self.switch(Tab::Chat).await?,
            Command::History => self.switch(Tab::History).await?,
            Command::Settings => self.switch(Tab::Settings).await?,
            Command::New => {
                if let Err(e) = self.engine.new_chat().await {
                    writeln!(self.out, "{e}")?;
                }
                self.switch(Tab::Chat).await?;
            }
            Command::Open(number) => {
                if self.history.select(number).await.is_some() {
                    self.follow_active_session().await?;
                    self.switch(Tab::Chat).await?;
                } else {
                    writeln!(self.out, "No session {number}. See /history.")?;
                }
            }
            Command::Personality(text) => {
                self.settings.update_personality(&text).await;
                self.switch(Tab::Settings).await?;
            }
            Command::Location(enabled) => {
                self.settings.set_location(enabled).await;
                self.switch(Tab::Settings).await?;
            }
            Command::Dismiss => {
                self.engine.dismiss_error();
                self.switch(Tab::Chat).await?;
            }
            Command::Cancel => writeln!(self.out, "Nothing to cancel.")?,
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => return Ok(Control::Quit),
        }
        Ok(Control::Continue)
    }

    async fn switch(&mut self, tab: Tab) -> Result<(), CliError> {
        self.tab = tab;
        self.show().await
    }

    async fn show(&mut self) -> Result<(), CliError> {
        let screen = match self.tab {
            Tab::Chat => self.view.render(&self.engine),
            Tab::History => self.history.render().await,
            Tab::Settings => self.settings.render().await,
        };
        writeln!(self.out, "\n{screen}")?;
        Ok(())
    }

    fn prompt(&mut self) -> Result<(), CliError> {
        write!(self.out, "{PROMPT}")?;
        self.out.flush()?;
        Ok(())
    }

    /// Load the transcript of a session activated elsewhere (e.g. `/open`).
    async fn follow_active_session(&mut self) -> Result<(), CliError> {
        let mut latest = None;
        loop {
            match self.context_events.try_recv() {
                Ok(ContextEvent::ActiveSessionChanged(id)) => latest = Some(id),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        if let Some(Some(id)) = latest {
            if self.engine.session_id() != Some(id.as_str()) {
                if let Err(e) = self.engine.open_session(&id).await {
                    writeln!(self.out, "{e}")?;
                }
            }
        }
        Ok(())
    }

    /// Drive one turn, echoing the reveal as it happens. Lines typed meanwhile
    /// never reach the engine mid-turn: `/cancel` stops the turn, anything else
    /// is queued and handled in order afterwards.
    async fn run_turn(
        &mut self,
        turn: Turn,
        lines: &mut mpsc::UnboundedReceiver<String>,
    ) -> Result<Control, CliError> {
        let Self {
            engine,
            view,
            queued,
            out,
            ..
        } = self;
        let cancel = CancellationToken::new();
        let mut events = engine.subscribe();
        let mut echo = RevealEcho::default();
        // Write failures are kept until the turn finishes so it is never abandoned.
        let mut io_error: Option<std::io::Error> = None;

        let result = {
            let turn_cancel = cancel.clone();
            let fut = async move {
                match turn {
                    Turn::Submit(text) => Ok(engine.submit_with_cancel(&text, &turn_cancel).await),
                    Turn::Retry => engine.retry_with_cancel(&turn_cancel).await,
                }
            };
            tokio::pin!(fut);

            loop {
                tokio::select! {
                    biased;
                    result = &mut fut => break result,
                    event = events.recv() => {
                        if let Ok(event) = event {
                            view.on_event(&event);
                            if let Err(e) = echo.apply(&event, out) {
                                io_error.get_or_insert(e);
                            }
                        }
                    }
                    Some(line) = lines.recv() => match Command::parse(&line) {
                        Ok(Some(Command::Cancel)) => cancel.cancel(),
                        Ok(None) => {}
                        _ => {
                            // Keep the reveal line intact; it finishes soon anyway.
                            if !echo.revealing {
                                if let Err(e) = writeln!(out, "{BUSY_NOTICE}") {
                                    io_error.get_or_insert(e);
                                }
                            }
                            queued.push_back(line);
                        }
                    },
                }
            }
        };

        if let Some(e) = io_error {
            return Err(e.into());
        }
        while let Ok(event) = events.try_recv() {
            view.on_event(&event);
            echo.apply(&event, out)?;
        }

        if let Err(e) = result {
            writeln!(out, "{e}")?;
        }
        if let Some(error) = self.engine.last_error() {
            writeln!(self.out, "{}", banner(error))?;
        }
        Ok(Control::Continue)
    }
}

/// Prints the reveal incrementally; the append prints whatever is left.
#[derive(Default)]
struct RevealEcho {
    printed: usize,
    revealing: bool,
}

impl RevealEcho {
    fn apply<W: Write>(&mut self, event: &ChatEvent, out: &mut W) -> std::io::Result<()> {
        match event {
            ChatEvent::ResponsePending => writeln!(out, "{LOADING_INDICATOR}")?,
            ChatEvent::RevealStarted { .. } => {
                self.printed = 0;
                self.revealing = true;
                write!(out, "Assistant: ")?;
            }
            ChatEvent::RevealProgress { partial, .. } => {
                let fresh: String = partial.chars().skip(self.printed).collect();
                self.printed += fresh.chars().count();
                write!(out, "{fresh}")?;
            }
            ChatEvent::MessageAppended { message, .. } if message.role == Role::Assistant => {
                let rest: String = message.content.chars().skip(self.printed).collect();
                writeln!(out, "{rest}")?;
                self.printed = 0;
                self.revealing = false;
            }
            _ => {}
        }
        out.flush()
    }
}
