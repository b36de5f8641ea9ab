use std::time::Duration;
use ratatui::widgets::ListState;
use thinkchat_core::think;
use thinkchat_core::{
    CancellationToken, Config, Conversation, OllamaClient, StreamError, StreamFragment, Typewriter,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use crate::tui::{AppEvent, RevealTimer};

pub struct App {
    // Core state
    pub should_quit: bool,

    // Chat state
    pub conversation: Conversation,
    pub query_input: String,
    pub query_cursor: usize, // cursor position in query_input
    pub chat_scroll: u16,
    pub follow_bottom: bool,
    pub show_thoughts: bool,
    pub turn_error: Option<String>,

    // Streaming state for the current turn
    pub turn: u64,
    pub cancel: Option<CancellationToken>,
    pub stream_task: Option<JoinHandle<()>>,

    // Answer reveal
    pub typewriter: Typewriter,
    pub reveal_timer: Option<RevealTimer>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    pub client: OllamaClient,
    pub config: Config,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: Config, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::new(),
            query_input: String::new(),
            query_cursor: 0,
            chat_scroll: 0,
            follow_bottom: true,
            show_thoughts: true,
            turn_error: None,
            turn: 0,
            cancel: None,
            stream_task: None,
            typewriter: Typewriter::new(),
            reveal_timer: None,
            animation_frame: 0,
            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),
            client: OllamaClient::from_config(&config),
            config,
            events,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    /// Send the current input as a new turn. Ignored while a turn streams.
    pub fn submit(&mut self) {
        let Some(history) = self.conversation.begin_turn(&self.query_input) else {
            return;
        };

        self.query_input.clear();
        self.query_cursor = 0;
        self.turn_error = None;
        self.follow_bottom = true;
        self.typewriter.reset();
        self.turn += 1;

        let turn = self.turn;
        let cancel = CancellationToken::new();
        let client = self.client.clone();
        let events = self.events.clone();
        let token = cancel.clone();

        tracing::info!(turn, model = client.model(), "submitting question");
        self.stream_task = Some(tokio::spawn(async move {
            let updates = events.clone();
            let result = client
                .stream_chat(
                    &history,
                    |fragment| {
                        let _ = updates.send(AppEvent::Stream { turn, fragment });
                    },
                    &token,
                )
                .await;
            let _ = events.send(AppEvent::StreamFinished { turn, result });
        }));
        self.cancel = Some(cancel);
        self.reveal_timer = Some(RevealTimer::start(
            self.events.clone(),
            Duration::from_millis(self.config.reveal_interval_ms),
        ));
    }

    pub fn on_fragment(&mut self, turn: u64, fragment: StreamFragment) {
        if turn != self.turn || !self.is_loading() {
            return;
        }
        self.conversation.apply(&fragment);
        if let Some(message) = self.conversation.in_flight() {
            let answer = think::final_answer(&think::parse(&message.content));
            self.typewriter.set_target(&answer);
        }
    }

    pub fn on_finished(&mut self, turn: u64, result: Result<StreamFragment, StreamError>) {
        if turn != self.turn {
            return;
        }
        self.conversation.finish_turn();
        self.cancel = None;
        self.stream_task = None;

        match result {
            Ok(fragment) => {
                tracing::info!(
                    turn,
                    chars = fragment.message.as_deref().map_or(0, str::len),
                    answer_chars = self.typewriter.target().chars().count(),
                    "answer complete"
                );
            }
            Err(err) if err.is_cancelled() => {
                tracing::debug!(turn, "stream cancelled");
            }
            Err(err) => {
                tracing::error!(turn, error = %err, "chat stream failed");
                self.turn_error = Some(err.to_string());
                self.typewriter.finish();
            }
        }

        if self.typewriter.is_caught_up() {
            self.reveal_timer = None;
        }
    }

    pub fn on_reveal(&mut self) {
        self.typewriter.tick();
        if !self.is_loading() && self.typewriter.is_caught_up() {
            self.reveal_timer = None;
        }
    }

    /// Cancel the streaming turn, keeping whatever arrived so far.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
            tracing::info!(turn = self.turn, "stopping stream");
        }
        self.conversation.finish_turn();
        self.typewriter.finish();
        self.reveal_timer = None;
    }

    /// Drop the conversation and start over.
    pub fn new_question(&mut self) {
        self.stop();
        self.turn += 1;
        self.conversation.reset();
        self.typewriter.reset();
        self.turn_error = None;
        self.query_input.clear();
        self.query_cursor = 0;
        self.chat_scroll = 0;
        self.follow_bottom = true;
    }

    pub fn skip_reveal(&mut self) {
        self.typewriter.finish();
        if !self.is_loading() {
            self.reveal_timer = None;
        }
    }

    pub fn toggle_thoughts(&mut self) {
        self.show_thoughts = !self.show_thoughts;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
    }

    // Model picker methods
    pub fn open_model_picker(&mut self, models: Vec<String>) {
        self.available_models = models;
        if !self.available_models.is_empty() {
            // Select current model if in list, otherwise first
            let current_idx = self
                .available_models
                .iter()
                .position(|m| m == self.client.model())
                .unwrap_or(0);
            self.model_picker_state.select(Some(current_idx));
            self.show_model_picker = true;
        }
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.available_models.get(i).cloned() {
                self.client.set_model(&model);
                self.config.model = model.clone();
                self.show_model_picker = false;
                // Save to config
                if let Err(err) = Config::save_default_model(&model) {
                    tracing::warn!(error = %err, "could not save default model");
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use thinkchat_core::error::StatusCode;
    use tokio::sync::mpsc;

    pub(crate) fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = Config {
            // Nothing listens on the discard port.
            base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        (App::new(config, tx), rx)
    }

    pub(crate) fn fragment(message: &str) -> StreamFragment {
        StreamFragment {
            message: Some(message.to_string()),
            thinking: None,
            done: false,
        }
    }

    #[tokio::test]
    async fn test_submit_starts_turn() {
        let (mut app, _rx) = test_app();
        app.query_input = "  why?  ".to_string();
        app.submit();

        assert!(app.is_loading());
        assert_eq!(app.turn, 1);
        assert!(app.query_input.is_empty());
        assert!(app.cancel.is_some());
        assert!(app.reveal_timer.is_some());
        assert_eq!(app.conversation.messages()[0].content, "why?");

        // A second submit is refused while loading.
        app.query_input = "again".to_string();
        app.submit();
        assert_eq!(app.turn, 1);
        assert_eq!(app.conversation.messages().len(), 2);
        app.stop();
    }

    #[tokio::test]
    async fn test_fragments_drive_typewriter_target() {
        let (mut app, _rx) = test_app();
        app.query_input = "q".to_string();
        app.submit();

        app.on_fragment(app.turn, fragment("<think>reasoning"));
        assert_eq!(app.typewriter.target(), "");
        app.on_fragment(app.turn, fragment("<think>reasoning</think>\n\nfinal"));
        assert_eq!(app.typewriter.target(), "final");
        app.on_reveal();
        assert_eq!(app.typewriter.visible(), "f");
        app.stop();
    }

    #[tokio::test]
    async fn test_stale_turn_is_ignored() {
        let (mut app, _rx) = test_app();
        app.query_input = "q".to_string();
        app.submit();
        let old_turn = app.turn;
        app.new_question();

        app.on_fragment(old_turn, fragment("late"));
        app.on_finished(old_turn, Err(StreamError::Cancelled));
        assert!(app.conversation.messages().is_empty());
        assert!(app.turn_error.is_none());
    }

    #[tokio::test]
    async fn test_stop_keeps_partial_answer() {
        let (mut app, _rx) = test_app();
        app.query_input = "q".to_string();
        app.submit();
        app.on_fragment(app.turn, fragment("partial ans"));
        app.stop();

        assert!(!app.is_loading());
        assert!(app.reveal_timer.is_none());
        assert_eq!(app.typewriter.visible(), "partial ans");
        assert_eq!(app.conversation.messages()[1].content, "partial ans");

        // The cancelled completion is silent.
        app.on_finished(app.turn, Err(StreamError::Cancelled));
        assert!(app.turn_error.is_none());
    }

    #[tokio::test]
    async fn test_failure_sets_indicator() {
        let (mut app, _rx) = test_app();
        app.query_input = "q".to_string();
        app.submit();
        app.on_finished(
            app.turn,
            Err(StreamError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".to_string(),
            }),
        );
        assert!(!app.is_loading());
        assert!(app.turn_error.as_deref().unwrap().contains("boom"));
        assert!(app.reveal_timer.is_none());
    }

    #[tokio::test]
    async fn test_stream_events_reach_channel() {
        let (mut app, mut rx) = test_app();
        app.query_input = "q".to_string();
        app.submit();
        app.reveal_timer = None;

        // The endpoint is unreachable, so the task reports a transport error.
        loop {
            match rx.recv().await.unwrap() {
                AppEvent::StreamFinished { turn, result } => {
                    assert_eq!(turn, app.turn);
                    assert_eq!(
                        result.unwrap_err().kind(),
                        thinkchat_core::ErrorKind::Transport
                    );
                    break;
                }
                AppEvent::Reveal => continue,
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn test_model_picker_navigation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Config::default(), tx);
        app.open_model_picker(vec!["a".into(), "deepseek-r1:8b".into(), "c".into()]);
        assert!(app.show_model_picker);
        assert_eq!(app.model_picker_state.selected(), Some(1));
        app.model_picker_nav_down();
        app.model_picker_nav_down();
        assert_eq!(app.model_picker_state.selected(), Some(2));
        app.model_picker_nav_up();
        assert_eq!(app.model_picker_state.selected(), Some(1));

        app.open_model_picker(Vec::new());
        assert!(app.available_models.is_empty());
    }
}
