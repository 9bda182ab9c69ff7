//! Session chat: connection lifecycle, transcript and inbound frame dispatch.

use npc_engine::{AnimationKind, SceneController, SceneError};
use npc_link::{
    parse_inbound, ActionCommand, BackendPort, BackendRequest, InboundFrame, ServerFrame,
    SessionId, SocketEvent, TERMINATE_SENTINEL,
};
use tracing::{debug, error, info, warn};

use super::speech::SpeechAdapter;

pub(crate) const CONNECTED_NOTICE: &str = "Connected to the AI.";
pub(crate) const CLOSED_NOTICE: &str = "Connection closed.";
pub(crate) const CONNECT_FAILED_NOTICE: &str = "Could not connect.";
pub(crate) const TERMINATED_NOTICE: &str =
    "Session terminated. Restart the demo to start a new one.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Terminated,
}

impl ConnectionState {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Terminated => "terminated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sender {
    User,
    Bot,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChatMessage {
    pub(crate) sender: Sender,
    pub(crate) text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatEvent {
    Opened,
    Message(String),
    Closed,
    Error(String),
    Submit(String),
    Terminate,
}

impl From<SocketEvent> for ChatEvent {
    fn from(event: SocketEvent) -> Self {
        match event {
            SocketEvent::Opened => ChatEvent::Opened,
            SocketEvent::Message(text) => ChatEvent::Message(text),
            SocketEvent::Error(message) => ChatEvent::Error(message),
            SocketEvent::Closed => ChatEvent::Closed,
        }
    }
}

/// Collaborators a dispatch may touch.
pub(crate) struct ChatContext<'a> {
    pub(crate) port: &'a mut dyn BackendPort,
    pub(crate) scene: &'a mut SceneController,
    pub(crate) speech: &'a mut SpeechAdapter,
}

#[derive(Debug)]
pub(crate) struct ChatController {
    session: Option<SessionId>,
    character_name: String,
    state: ConnectionState,
    transcript: Vec<ChatMessage>,
    typing: bool,
    input_enabled: bool,
    terminate_enabled: bool,
}

impl ChatController {
    pub(crate) fn new() -> Self {
        Self {
            session: None,
            character_name: String::new(),
            state: ConnectionState::Disconnected,
            transcript: Vec::new(),
            typing: false,
            input_enabled: false,
            terminate_enabled: false,
        }
    }

    /// Binds the chat to a freshly created session and opens its socket.
    pub(crate) fn connect(
        &mut self,
        session: SessionId,
        character_name: String,
        port: &mut dyn BackendPort,
    ) {
        if self.state != ConnectionState::Disconnected {
            warn!(session_id = %session, state = self.state.label(), "connect_ignored");
            return;
        }
        info!(session_id = %session, character = %character_name, "session_connecting");
        port.submit(BackendRequest::Connect(session.clone()));
        self.session = Some(session);
        self.character_name = character_name;
        self.state = ConnectionState::Connecting;
        self.input_enabled = true;
        self.terminate_enabled = true;
    }

    pub(crate) fn dispatch(&mut self, event: ChatEvent, ctx: &mut ChatContext<'_>) {
        match event {
            ChatEvent::Opened => {
                if self.state != ConnectionState::Connecting {
                    debug!(state = self.state.label(), "socket_open_ignored");
                    return;
                }
                self.state = ConnectionState::Connected;
                info!(session_id = self.session_label(), "session_connected");
                self.push(Sender::System, CONNECTED_NOTICE);
            }
            ChatEvent::Message(raw) => {
                self.typing = false;
                self.handle_inbound(&raw, ctx);
            }
            ChatEvent::Closed => {
                info!(session_id = self.session_label(), "session_closed");
                self.state = ConnectionState::Terminated;
                self.terminate_enabled = false;
                self.input_enabled = false;
                self.push(Sender::System, CLOSED_NOTICE);
            }
            ChatEvent::Error(message) => {
                error!(session_id = self.session_label(), error = %message, "session_socket_error");
                self.typing = false;
                self.push(Sender::System, CONNECT_FAILED_NOTICE);
            }
            ChatEvent::Submit(text) => self.send(&text, ctx.port),
            ChatEvent::Terminate => self.terminate(ctx),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn character_name(&self) -> &str {
        &self.character_name
    }

    pub(crate) fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    pub(crate) fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub(crate) fn is_typing(&self) -> bool {
        self.typing
    }

    pub(crate) fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub(crate) fn terminate_enabled(&self) -> bool {
        self.terminate_enabled
    }

    /// Appends a local notice that did not come from the backend.
    pub(crate) fn notice(&mut self, text: impl Into<String>) {
        self.push(Sender::System, text);
    }

    fn send(&mut self, text: &str, port: &mut dyn BackendPort) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.state != ConnectionState::Connected {
            debug!(state = self.state.label(), "chat_send_skipped");
            return;
        }
        self.push(Sender::User, text);
        port.submit(BackendRequest::Send(text.to_string()));
        self.typing = true;
    }

    fn terminate(&mut self, ctx: &mut ChatContext<'_>) {
        if !self.terminate_enabled {
            return;
        }
        if self.state == ConnectionState::Connected {
            ctx.port
                .submit(BackendRequest::Send(TERMINATE_SENTINEL.to_string()));
        }
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            ctx.port.submit(BackendRequest::Disconnect);
        }
        ctx.speech.cancel();
        ctx.speech.stop_listening();
        info!(session_id = self.session_label(), "session_terminated");
        self.state = ConnectionState::Terminated;
        self.input_enabled = false;
        self.terminate_enabled = false;
        self.typing = false;
        self.push(Sender::System, TERMINATED_NOTICE);
    }

    fn handle_inbound(&mut self, raw: &str, ctx: &mut ChatContext<'_>) {
        match parse_inbound(raw) {
            InboundFrame::Frame(ServerFrame::Dialogue { message, animation }) => {
                let Some(message) = message.filter(|message| !message.is_empty()) else {
                    debug!("dialogue_without_message");
                    return;
                };
                self.push(Sender::Bot, message.as_str());
                ctx.speech.speak(&message);
                if let Some(animation) = animation
                    .as_deref()
                    .filter(|name| *name != AnimationKind::DEFAULT_TALK.name())
                {
                    if let Err(err) = ctx.scene.play_animation(animation) {
                        self.report_animation_error(&err);
                    }
                }
            }
            InboundFrame::Frame(ServerFrame::Action {
                command,
                target,
                animation,
            }) => self.handle_action(&command, &target, animation.as_deref(), ctx.scene),
            InboundFrame::Frame(ServerFrame::Error { message }) => {
                if message.is_empty() {
                    warn!("error_frame_without_message");
                    return;
                }
                warn!(message = %message, "backend_error_frame");
                self.push(Sender::System, message);
            }
            InboundFrame::Unrecognized { kind } => {
                warn!(kind = kind.as_deref().unwrap_or("<none>"), "frame_type_unrecognized");
            }
            InboundFrame::Invalid { kind, error } => {
                warn!(kind = %kind, error = %error, "frame_invalid");
                self.push(Sender::Bot, raw);
            }
            InboundFrame::Malformed(raw) => {
                warn!("frame_not_json");
                self.push(Sender::Bot, raw);
            }
        }
    }

    fn handle_action(
        &mut self,
        command: &ActionCommand,
        target: &str,
        animation: Option<&str>,
        scene: &mut SceneController,
    ) {
        match command {
            ActionCommand::Move => match scene.move_to(target, animation) {
                Ok(outcome) => {
                    if let Err(err) = outcome.animation {
                        self.report_animation_error(&err);
                    }
                }
                Err(_) => self.push(
                    Sender::System,
                    format!("(System: Tried to move to unknown location '{target}')"),
                ),
            },
            ActionCommand::Interact => match scene.interact(target, animation) {
                Ok(outcome) => {
                    self.push(Sender::System, outcome.notice);
                    if let Err(err) = outcome.animation {
                        self.report_animation_error(&err);
                    }
                }
                Err(_) => self.push(
                    Sender::System,
                    format!("(System: Tried to interact with unknown object '{target}')"),
                ),
            },
            ActionCommand::Other(other) => {
                warn!(command = %other, action_target = %target, "action_command_unrecognized");
            }
        }
    }

    fn report_animation_error(&mut self, err: &SceneError) {
        if let SceneError::UnknownAnimation { name } = err {
            self.push(Sender::System, format!("(System: Unknown animation '{name}')"));
        }
    }

    fn push(&mut self, sender: Sender, text: impl Into<String>) {
        self.transcript.push(ChatMessage {
            sender,
            text: text.into(),
        });
    }

    fn session_label(&self) -> &str {
        self.session.as_ref().map(SessionId::as_str).unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use npc_engine::Vec3;
    use serde_json::json;

    use super::*;
    use crate::app::controllers::speech::tests::ScriptedSynthesizer;
    use crate::app::controllers::speech::Utterance;
    use crate::app::controllers::test_support::{test_scene, RecordingPort};

    struct Harness {
        chat: ChatController,
        port: RecordingPort,
        scene: SceneController,
        speech: SpeechAdapter,
        spoken: Rc<RefCell<Vec<Utterance>>>,
        cancels: Rc<RefCell<usize>>,
    }

    impl Harness {
        fn connected() -> Self {
            let mut harness = Self::connecting();
            harness.dispatch(ChatEvent::Opened);
            harness.port.requests.clear();
            harness
        }

        fn connecting() -> Self {
            let spoken = Rc::new(RefCell::new(Vec::new()));
            let cancels = Rc::new(RefCell::new(0));
            let speech = SpeechAdapter::new(
                Box::new(ScriptedSynthesizer {
                    spoken: Rc::clone(&spoken),
                    cancels: Rc::clone(&cancels),
                    ..ScriptedSynthesizer::default()
                }),
                None,
                true,
            );
            let mut harness = Self {
                chat: ChatController::new(),
                port: RecordingPort::default(),
                scene: test_scene(),
                speech,
                spoken,
                cancels,
            };
            harness
                .chat
                .connect(SessionId::new("s-1"), "Leo".to_string(), &mut harness.port);
            harness
        }

        fn dispatch(&mut self, event: ChatEvent) {
            let mut ctx = ChatContext {
                port: &mut self.port,
                scene: &mut self.scene,
                speech: &mut self.speech,
            };
            self.chat.dispatch(event, &mut ctx);
        }

        fn inbound(&mut self, frame: serde_json::Value) {
            self.dispatch(ChatEvent::Message(frame.to_string()));
        }

        fn last(&self) -> &ChatMessage {
            self.chat.transcript().last().expect("transcript entry")
        }
    }

    fn system(text: &str) -> ChatMessage {
        ChatMessage {
            sender: Sender::System,
            text: text.to_string(),
        }
    }

    #[test]
    fn connect_requests_socket_and_open_announces() {
        let mut port = RecordingPort::default();
        let mut chat = ChatController::new();
        chat.connect(SessionId::new("abc"), "Leo".to_string(), &mut port);
        assert_eq!(port.requests, vec![BackendRequest::Connect(SessionId::new("abc"))]);
        assert_eq!(chat.state(), ConnectionState::Connecting);

        let harness = Harness::connected();
        assert_eq!(harness.chat.state(), ConnectionState::Connected);
        assert_eq!(harness.chat.transcript(), &[system(CONNECTED_NOTICE)]);
    }

    #[test]
    fn send_then_dialogue_appends_user_then_bot() {
        let mut harness = Harness::connected();
        harness.dispatch(ChatEvent::Submit("  Where is the milk?  ".to_string()));
        assert!(harness.chat.is_typing());
        assert_eq!(
            harness.port.requests,
            vec![BackendRequest::Send("Where is the milk?".to_string())]
        );

        harness.inbound(json!({"type": "dialogue", "message": "Dairy is at the back."}));

        let entries = &harness.chat.transcript()[1..];
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sender, Sender::User);
        assert_eq!(entries[0].text, "Where is the milk?");
        assert_eq!(entries[1].sender, Sender::Bot);
        assert!(!harness.chat.is_typing());
        assert_eq!(harness.spoken.borrow()[0].text, "Dairy is at the back.");
    }

    #[test]
    fn empty_or_offline_send_is_a_no_op() {
        let mut harness = Harness::connected();
        harness.dispatch(ChatEvent::Submit("   ".to_string()));
        assert!(harness.port.requests.is_empty());

        let mut port = RecordingPort::default();
        let mut chat = ChatController::new();
        chat.connect(SessionId::new("abc"), "Leo".to_string(), &mut port);
        let mut scene = test_scene();
        let mut speech = SpeechAdapter::new(Box::new(ScriptedSynthesizer::default()), None, true);
        chat.dispatch(
            ChatEvent::Submit("hello".to_string()),
            &mut ChatContext {
                port: &mut port,
                scene: &mut scene,
                speech: &mut speech,
            },
        );
        assert_eq!(port.requests.len(), 1, "only the connect request");
        assert!(chat.transcript().is_empty());
    }

    #[test]
    fn dialogue_plays_explicit_animation_but_not_default_talk() {
        let mut harness = Harness::connected();
        harness.inbound(json!({"type": "dialogue", "message": "Hi!", "animation": "wave_one_hand"}));
        assert_eq!(harness.scene.active_kind(), Some(AnimationKind::WaveOneHand));

        let mut harness = Harness::connected();
        harness.inbound(json!({"type": "dialogue", "message": "Hi!", "animation": "talk_passionately"}));
        assert_eq!(harness.scene.active_kind(), None);
    }

    #[test]
    fn dialogue_with_unknown_animation_reports_notice() {
        let mut harness = Harness::connected();
        harness.inbound(json!({"type": "dialogue", "message": "Hi!", "animation": "moonwalk"}));
        assert_eq!(harness.last(), &system("(System: Unknown animation 'moonwalk')"));
        assert_eq!(harness.scene.active_kind(), None);
    }

    #[test]
    fn dialogue_without_message_is_ignored() {
        let mut harness = Harness::connected();
        harness.inbound(json!({"type": "dialogue", "animation": "sleep"}));
        assert_eq!(harness.chat.transcript().len(), 1);
        assert!(harness.spoken.borrow().is_empty());
    }

    #[test]
    fn move_to_unknown_location_reports_and_stays_put() {
        let mut harness = Harness::connected();
        let before = harness.scene.avatar().position;
        harness.inbound(json!({"type": "action", "command": "MOVE", "target": "unknown place"}));
        assert_eq!(
            harness.last(),
            &system("(System: Tried to move to unknown location 'unknown place')")
        );
        assert_eq!(harness.scene.avatar().position, before);
        assert_eq!(harness.scene.target(), None);
    }

    #[test]
    fn move_to_known_location_walks_by_default() {
        let mut harness = Harness::connected();
        harness.inbound(json!({"type": "action", "command": "MOVE", "target": "entrance"}));
        assert_eq!(harness.scene.target(), Some(Vec3::new(0.0, 0.0, 8.0)));
        assert_eq!(harness.scene.active_kind(), Some(AnimationKind::Walking));

        harness.inbound(json!({
            "type": "action", "command": "MOVE", "target": "aisle 2", "animation": "running"
        }));
        assert_eq!(harness.scene.active_kind(), Some(AnimationKind::Running));
    }

    #[test]
    fn interact_toggles_and_reports() {
        let mut harness = Harness::connected();
        harness.inbound(json!({"type": "action", "command": "INTERACT", "target": "store lights"}));
        assert_eq!(harness.last(), &system("Toggled the store lights on."));
        assert_eq!(harness.scene.active_kind(), Some(AnimationKind::WaveOneHand));

        harness.inbound(json!({"type": "action", "command": "INTERACT", "target": "vending machine"}));
        assert_eq!(
            harness.last(),
            &system("(System: Tried to interact with unknown object 'vending machine')")
        );
    }

    #[test]
    fn error_frames_become_system_entries() {
        let mut harness = Harness::connected();
        harness.dispatch(ChatEvent::Submit("hi".to_string()));
        harness.inbound(json!({"type": "error", "message": "Agent crashed"}));
        assert_eq!(harness.last(), &system("Agent crashed"));
        assert!(!harness.chat.is_typing());
    }

    #[test]
    fn error_frame_without_message_adds_nothing() {
        let mut harness = Harness::connected();
        harness.dispatch(ChatEvent::Submit("hi".to_string()));
        harness.inbound(json!({"type": "error"}));
        harness.inbound(json!({"type": "error", "message": ""}));
        assert_eq!(harness.chat.transcript().len(), 2);
        assert_eq!(harness.last().sender, Sender::User);
        assert!(!harness.chat.is_typing());
    }

    #[test]
    fn unrecognized_type_has_no_visible_effect() {
        let mut harness = Harness::connected();
        harness.inbound(json!({"type": "telemetry", "fps": 60}));
        harness.inbound(json!({"type": "action", "command": "DANCE", "target": "aisle 1"}));
        assert_eq!(harness.chat.transcript().len(), 1);
    }

    #[test]
    fn malformed_payload_is_shown_verbatim_as_bot() {
        let mut harness = Harness::connected();
        harness.dispatch(ChatEvent::Message("plain text reply".to_string()));
        assert_eq!(
            harness.last(),
            &ChatMessage {
                sender: Sender::Bot,
                text: "plain text reply".to_string(),
            }
        );
    }

    #[test]
    fn terminate_sends_sentinel_and_disables_input() {
        let mut harness = Harness::connected();
        harness.dispatch(ChatEvent::Terminate);

        assert_eq!(
            harness.port.requests,
            vec![
                BackendRequest::Send(TERMINATE_SENTINEL.to_string()),
                BackendRequest::Disconnect,
            ]
        );
        assert_eq!(*harness.cancels.borrow(), 1);
        assert_eq!(harness.chat.state(), ConnectionState::Terminated);
        assert!(!harness.chat.input_enabled());
        assert_eq!(harness.last(), &system(TERMINATED_NOTICE));

        harness.dispatch(ChatEvent::Terminate);
        harness.dispatch(ChatEvent::Submit("still there?".to_string()));
        assert_eq!(harness.port.requests.len(), 2);
    }

    #[test]
    fn terminate_while_connecting_disconnects_and_ignores_late_open() {
        let mut harness = Harness::connecting();
        harness.dispatch(ChatEvent::Terminate);
        assert_eq!(
            harness.port.requests,
            vec![
                BackendRequest::Connect(SessionId::new("s-1")),
                BackendRequest::Disconnect,
            ]
        );

        harness.dispatch(ChatEvent::Opened);
        assert_eq!(harness.chat.state(), ConnectionState::Terminated);
        assert_eq!(harness.chat.transcript(), &[system(TERMINATED_NOTICE)]);
        assert!(!harness.chat.input_enabled());
    }

    #[test]
    fn remote_close_is_terminal() {
        let mut harness = Harness::connected();
        harness.dispatch(ChatEvent::Closed);
        assert_eq!(harness.chat.state(), ConnectionState::Terminated);
        assert!(!harness.chat.terminate_enabled());
        assert_eq!(harness.last(), &system(CLOSED_NOTICE));
    }

    #[test]
    fn connect_failure_reports_then_closes() {
        let mut harness = Harness::connected();
        harness.dispatch(ChatEvent::from(SocketEvent::Error("refused".to_string())));
        harness.dispatch(ChatEvent::from(SocketEvent::Closed));
        let texts = harness
            .chat
            .transcript()
            .iter()
            .map(|message| message.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec![CONNECTED_NOTICE, CONNECT_FAILED_NOTICE, CLOSED_NOTICE]);
    }
}
