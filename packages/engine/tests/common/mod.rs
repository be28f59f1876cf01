#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use chat::{
    ChannelId, ChannelMessage, ChatError, ChatGateway, MessageId, ReactionEvent, ReactionFilter,
    RecordCard, UserId,
};
use common::LanguageRegistry;
use engine::{
    CancelRequest, EngineConfig, EventLifecycleController, ParticipationRepository, StatsReporter,
    StatsRequest, SubmissionWorkflow, SubmitRequest, TopicStateStore,
};
use grader::{
    Autograder, ExecError, ExecOutcome, ExecRequest, ExecutionService, ExitInfo, GraderConfig,
};

// Re-exported model types: `mod common` shadows the crate in test roots.
pub use common::{CaseOutcome, FailureKind};

pub const CODE_CHANNEL: ChannelId = ChannelId(100);
pub const DM: ChannelId = ChannelId(200);
pub const BOT: UserId = UserId(1);
pub const ALICE: UserId = UserId(11);
pub const BOB: UserId = UserId(12);

/// What the scripted principal does when a reaction wait opens.
pub enum Reply {
    /// The filtered principal reacts with this glyph.
    React(&'static str),
    /// Somebody else reacts; the filter must reject it.
    ReactAs(UserId, &'static str),
    /// Nobody reacts before the window elapses.
    Ignore,
}

struct StoredMessage {
    id: MessageId,
    channel: ChannelId,
    author: UserId,
    text: String,
    card: Option<RecordCard>,
    created_at: DateTime<Utc>,
    deleted: bool,
}

/// In-memory chat platform: topics, messages, reactions, and a scripted
/// queue of replies for reaction waits.
pub struct InMemoryChat {
    bot: UserId,
    topics: Mutex<HashMap<ChannelId, String>>,
    messages: Mutex<Vec<StoredMessage>>,
    replies: Mutex<VecDeque<Reply>>,
    reactions: Mutex<HashMap<MessageId, Vec<String>>>,
    edits: Mutex<Vec<(MessageId, String)>>,
    next_id: AtomicU64,
}

impl InMemoryChat {
    pub fn new(bot: UserId) -> Self {
        InMemoryChat {
            bot,
            topics: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            reactions: Mutex::new(HashMap::new()),
            edits: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
        }
    }

    pub fn script(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn set_topic(&self, channel: ChannelId, text: &str) {
        self.topics.lock().unwrap().insert(channel, text.to_string());
    }

    pub fn topic_of(&self, channel: ChannelId) -> String {
        self.topics
            .lock()
            .unwrap()
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }

    /// Plain-text notices visible in `channel`, oldest first.
    pub fn notices(&self, channel: ChannelId) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.channel == channel && !m.deleted && m.card.is_none())
            .map(|m| m.text.clone())
            .collect()
    }

    /// Cards visible in `channel`, oldest first.
    pub fn cards(&self, channel: ChannelId) -> Vec<RecordCard> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.channel == channel && !m.deleted)
            .filter_map(|m| m.card.clone())
            .collect()
    }

    /// Every reaction set currently attached, in no particular order.
    pub fn reaction_sets(&self) -> Vec<Vec<String>> {
        self.reactions.lock().unwrap().values().cloned().collect()
    }

    /// Notice edits, oldest first.
    pub fn edits(&self) -> Vec<(MessageId, String)> {
        self.edits.lock().unwrap().clone()
    }

    /// Rewrites every stored message timestamp, for tests that need
    /// records to predate a round.
    pub fn backdate_all(&self, to: DateTime<Utc>) {
        for message in self.messages.lock().unwrap().iter_mut() {
            message.created_at = to;
        }
    }

    fn push_message(
        &self,
        channel: ChannelId,
        text: String,
        card: Option<RecordCard>,
    ) -> MessageId {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.messages.lock().unwrap().push(StoredMessage {
            id,
            channel,
            author: self.bot,
            text,
            card,
            created_at: Utc::now(),
            deleted: false,
        });
        id
    }
}

#[async_trait]
impl ChatGateway for InMemoryChat {
    fn bot_user(&self) -> UserId {
        self.bot
    }

    async fn read_topic(&self, channel: ChannelId) -> Result<String, ChatError> {
        Ok(self.topic_of(channel))
    }

    async fn write_topic(&self, channel: ChannelId, text: &str) -> Result<(), ChatError> {
        self.set_topic(channel, text);
        Ok(())
    }

    async fn history_since(
        &self,
        channel: ChannelId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ChannelMessage>, ChatError> {
        let messages = self.messages.lock().unwrap();
        let mut window: Vec<ChannelMessage> = messages
            .iter()
            .filter(|m| m.channel == channel && !m.deleted && m.created_at >= since)
            .map(|m| ChannelMessage {
                id: m.id,
                author: m.author,
                text: m.text.clone(),
                card: m.card.clone(),
                created_at: m.created_at,
            })
            .collect();
        window.reverse();
        Ok(window)
    }

    async fn post_card(
        &self,
        channel: ChannelId,
        card: RecordCard,
    ) -> Result<MessageId, ChatError> {
        Ok(self.push_message(channel, String::new(), Some(card)))
    }

    async fn edit_card(
        &self,
        channel: ChannelId,
        message: MessageId,
        card: RecordCard,
    ) -> Result<(), ChatError> {
        let mut messages = self.messages.lock().unwrap();
        let found = messages
            .iter_mut()
            .find(|m| m.id == message && m.channel == channel && !m.deleted)
            .ok_or(ChatError::UnknownMessage(message))?;
        found.card = Some(card);
        Ok(())
    }

    async fn post_notice(&self, channel: ChannelId, text: &str) -> Result<MessageId, ChatError> {
        Ok(self.push_message(channel, text.to_string(), None))
    }

    async fn edit_notice(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<(), ChatError> {
        let mut messages = self.messages.lock().unwrap();
        let found = messages
            .iter_mut()
            .find(|m| m.id == message && m.channel == channel && !m.deleted)
            .ok_or(ChatError::UnknownMessage(message))?;
        found.text = text.to_string();
        drop(messages);
        self.edits.lock().unwrap().push((message, text.to_string()));
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), ChatError> {
        let mut messages = self.messages.lock().unwrap();
        let found = messages
            .iter_mut()
            .find(|m| m.id == message && m.channel == channel && !m.deleted)
            .ok_or(ChatError::UnknownMessage(message))?;
        found.deleted = true;
        Ok(())
    }

    async fn add_reactions(
        &self,
        _channel: ChannelId,
        message: MessageId,
        glyphs: &[&str],
    ) -> Result<(), ChatError> {
        self.reactions
            .lock()
            .unwrap()
            .entry(message)
            .or_default()
            .extend(glyphs.iter().map(|g| g.to_string()));
        Ok(())
    }

    async fn clear_reactions(
        &self,
        _channel: ChannelId,
        message: MessageId,
    ) -> Result<(), ChatError> {
        self.reactions.lock().unwrap().remove(&message);
        Ok(())
    }

    async fn await_reaction(
        &self,
        filter: ReactionFilter,
        _timeout: Duration,
    ) -> Result<Option<ReactionEvent>, ChatError> {
        let reply = self.replies.lock().unwrap().pop_front();
        let event = match reply {
            Some(Reply::React(glyph)) => ReactionEvent {
                message: filter.message,
                user: filter.from,
                glyph: glyph.to_string(),
            },
            Some(Reply::ReactAs(user, glyph)) => ReactionEvent {
                message: filter.message,
                user,
                glyph: glyph.to_string(),
            },
            Some(Reply::Ignore) | None => return Ok(None),
        };
        Ok(filter.accepts(&event).then_some(event))
    }
}

/// Execution sandbox with one scripted reply per expected call.
pub struct ScriptedExecutor {
    steps: Mutex<VecDeque<Result<ExecOutcome, ExecError>>>,
    requests: Mutex<Vec<ExecRequest>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        ScriptedExecutor {
            steps: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn script_stdout(&self, stdout: &str) {
        self.steps.lock().unwrap().push_back(Ok(ExecOutcome {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit: ExitInfo {
                code: Some(0),
                signal: None,
            },
        }));
    }

    pub fn script_crash(&self, stderr: &str) {
        self.steps.lock().unwrap().push_back(Ok(ExecOutcome {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit: ExitInfo {
                code: Some(1),
                signal: None,
            },
        }));
    }

    pub fn script_fault(&self) {
        self.steps
            .lock()
            .unwrap()
            .push_back(Err(ExecError::Transport("connection reset".to_string())));
    }

    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutionService for ScriptedExecutor {
    async fn execute(&self, request: ExecRequest) -> Result<ExecOutcome, ExecError> {
        self.requests.lock().unwrap().push(request);
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("sandbox called more times than scripted")
    }
}

/// Fully wired engine over the in-memory fakes, with short timeouts.
pub struct Harness {
    pub chat: Arc<InMemoryChat>,
    pub executor: Arc<ScriptedExecutor>,
    pub workflow: SubmissionWorkflow,
    pub stats: StatsReporter,
    pub lifecycle: EventLifecycleController,
    pub repository: ParticipationRepository,
}

pub fn harness() -> Harness {
    init_tracing();

    let chat = Arc::new(InMemoryChat::new(BOT));
    let executor = Arc::new(ScriptedExecutor::new());
    let gateway: Arc<dyn ChatGateway> = chat.clone();

    let topic = TopicStateStore::new(Arc::clone(&gateway), CODE_CHANNEL);
    let repository = ParticipationRepository::new(Arc::clone(&gateway), CODE_CHANNEL);
    let grader = Autograder::new(
        Arc::clone(&executor) as Arc<dyn ExecutionService>,
        &GraderConfig {
            base_url: String::new(),
            call_deadline_ms: 1_000,
            inter_call_delay_ms: 1,
        },
    );
    let config = EngineConfig {
        code_channel: CODE_CHANNEL.0,
        confirm_timeout_secs: 1,
        max_code_chars: 1000,
    };

    let workflow = SubmissionWorkflow::new(
        Arc::clone(&gateway),
        topic.clone(),
        repository.clone(),
        LanguageRegistry::default_set(),
        grader,
        &config,
    );
    let stats = StatsReporter::new(Arc::clone(&gateway), topic.clone(), repository.clone());
    let lifecycle =
        EventLifecycleController::new(Arc::clone(&gateway), topic, repository.clone(), CODE_CHANNEL);

    Harness {
        chat,
        executor,
        workflow,
        stats,
        lifecycle,
        repository,
    }
}

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Seeds an open round dated well before any test message.
pub fn seed_open_round(chat: &InMemoryChat) {
    chat.set_topic(
        CODE_CHANNEL,
        "event-state : open\nevent-date : 01/01/2024\nevent-name : winter golf",
    );
}

/// Seeds an open round carrying the given autotests block.
pub fn seed_round_with_tests(chat: &InMemoryChat, block: &str) {
    chat.set_topic(
        CODE_CHANNEL,
        &format!(
            "event-state : open\nevent-date : 01/01/2024\nevent-name : winter golf\nevent-autotests : {block}"
        ),
    );
}

/// Seeds a round in the given lifecycle state.
pub fn seed_state(chat: &InMemoryChat, state: &str) {
    chat.set_topic(
        CODE_CHANNEL,
        &format!("event-state : {state}\nevent-date : 01/01/2024\nevent-name : winter golf"),
    );
}

/// The seeded round's scan lower bound.
pub fn round_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn submit_req(user: UserId, body: &str) -> SubmitRequest {
    SubmitRequest {
        submitter: user,
        mention: format!("<@{}>", user.0),
        origin: DM,
        body: body.to_string(),
    }
}

pub fn cancel_req(user: UserId) -> CancelRequest {
    CancelRequest {
        requester: user,
        origin: DM,
    }
}

pub fn stats_req(user: UserId) -> StatsRequest {
    StatsRequest {
        requester: user,
        origin: DM,
    }
}

pub fn fenced(tag: &str, code: &str) -> String {
    format!("```{tag}\n{code}\n```")
}
