use npc_engine::{
    apply_text_edits, Frontend, Hud, HudLine, HudPanel, HudPanelAnchor, HudTone, InputAction,
    InputSnapshot, LoopCommand, SceneController,
};
use npc_link::{BackendEvent, BackendHandle, BackendPort, BackendRequest, UploadSlot};
use tracing::{debug, info};

use super::commands::{parse_chat_input, ChatCommand, ChatInput, HELP_LINES};
use super::controllers::avatars::{AvatarCatalog, CatalogState};
use super::controllers::chat::{ChatContext, ChatController, ChatEvent, ConnectionState, Sender};
use super::controllers::setup::{CharacterForm, FormField, SetupController, StatusLine};
use super::controllers::speech::SpeechAdapter;

const TRANSCRIPT_LINES: usize = 14;
const CHAT_WRAP_CHARS: usize = 60;
const SETUP_WRAP_CHARS: usize = 70;
const CURSOR: char = '_';
const NOT_CONNECTED_NOTICE: &str = "Not connected yet. Your message was kept.";

/// Request/response channel to the backend as seen by the frontend.
pub(crate) trait BackendLink {
    fn port(&mut self) -> &mut dyn BackendPort;
    fn drain_events(&mut self) -> Vec<BackendEvent>;
}

impl BackendLink for BackendHandle {
    fn port(&mut self) -> &mut dyn BackendPort {
        self
    }

    fn drain_events(&mut self) -> Vec<BackendEvent> {
        BackendHandle::drain_events(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    Setup(SetupTab),
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetupTab {
    Create,
    Load,
}

pub(crate) struct DemoFrontend {
    backend: Box<dyn BackendLink>,
    view: View,
    setup: SetupController,
    catalog: AvatarCatalog,
    chat: ChatController,
    speech: SpeechAdapter,
    chat_input: String,
}

impl DemoFrontend {
    pub(crate) fn new(
        backend: Box<dyn BackendLink>,
        speech: SpeechAdapter,
        form: CharacterForm,
    ) -> Self {
        Self {
            backend,
            view: View::Setup(SetupTab::Create),
            setup: SetupController::new(form),
            catalog: AvatarCatalog::new(),
            chat: ChatController::new(),
            speech,
            chat_input: String::new(),
        }
    }

    pub(crate) fn view(&self) -> View {
        self.view
    }

    fn route_backend_events(&mut self, scene: &mut SceneController) {
        for event in self.backend.drain_events() {
            match event {
                BackendEvent::Uploaded {
                    slot,
                    file_name,
                    result,
                } => self
                    .setup
                    .handle_uploaded(slot, &file_name, result, self.backend.port()),
                BackendEvent::Initialized(result) => {
                    if let Some(start) = self.setup.handle_initialized(result) {
                        self.chat.connect(
                            start.session,
                            start.character_name,
                            self.backend.port(),
                        );
                        self.chat_input.clear();
                        self.view = View::Chat;
                    }
                }
                BackendEvent::Avatars(result) => self.catalog.handle_avatars(result),
                BackendEvent::Socket(event) => self.dispatch_chat(ChatEvent::from(event), scene),
            }
        }
    }

    fn dispatch_chat(&mut self, event: ChatEvent, scene: &mut SceneController) {
        let mut ctx = ChatContext {
            port: self.backend.port(),
            scene,
            speech: &mut self.speech,
        };
        self.chat.dispatch(event, &mut ctx);
    }

    fn update_setup(&mut self, tab: SetupTab, input: &InputSnapshot) {
        if input.pressed(InputAction::SwitchTab) {
            let next = match tab {
                SetupTab::Create => SetupTab::Load,
                SetupTab::Load => SetupTab::Create,
            };
            debug!(?next, "setup_tab_switched");
            self.view = View::Setup(next);
            if next == SetupTab::Load {
                self.catalog.refresh(self.backend.port());
            }
            return;
        }

        match tab {
            SetupTab::Create => {
                if let Some(text) = self.setup.focused_text_mut() {
                    apply_text_edits(text, input.text_edits());
                }
                if input.pressed(InputAction::SelectPrevious) {
                    self.setup.focus_previous();
                }
                if input.pressed(InputAction::SelectNext) {
                    self.setup.focus_next();
                }
                if input.pressed(InputAction::Submit) {
                    self.setup.submit(self.backend.port());
                }
            }
            SetupTab::Load => {
                if !input.text_edits().is_empty() {
                    apply_text_edits(self.catalog.query_mut(), input.text_edits());
                    self.catalog.query_changed();
                }
                if input.pressed(InputAction::SelectPrevious) {
                    self.catalog.select_previous();
                }
                if input.pressed(InputAction::SelectNext) {
                    self.catalog.select_next();
                }
                if input.pressed(InputAction::Submit) {
                    if let Some(record) = self.catalog.selected().cloned() {
                        self.setup.load_saved(&record, self.backend.port());
                    }
                }
            }
        }
    }

    fn update_chat(&mut self, input: &InputSnapshot, scene: &mut SceneController) {
        if self.chat.input_enabled() {
            apply_text_edits(&mut self.chat_input, input.text_edits());
        }
        if input.pressed(InputAction::ToggleSpeech) {
            self.toggle_speech();
        }
        if input.pressed(InputAction::Listen) {
            self.listen();
        }
        if input.pressed(InputAction::Terminate) {
            self.dispatch_chat(ChatEvent::Terminate, scene);
        }
        if input.pressed(InputAction::Submit) && self.chat.input_enabled() {
            let raw = std::mem::take(&mut self.chat_input);
            match parse_chat_input(&raw) {
                ChatInput::Empty => {}
                ChatInput::Message(_) if self.chat.state() != ConnectionState::Connected => {
                    self.chat_input = raw;
                    self.chat.notice(NOT_CONNECTED_NOTICE);
                }
                ChatInput::Message(text) => self.dispatch_chat(ChatEvent::Submit(text), scene),
                ChatInput::Command(command) => self.run_command(command, scene),
                ChatInput::Rejected(notice) => self.chat.notice(notice),
            }
        }
    }

    fn run_command(&mut self, command: ChatCommand, scene: &mut SceneController) {
        debug!(?command, "chat_command");
        match command {
            ChatCommand::Animate(name) => {
                if scene.play_animation(&name).is_err() {
                    self.chat
                        .notice(format!("(System: Unknown animation '{name}')"));
                }
            }
            ChatCommand::Stop => scene.stop_animation(),
            ChatCommand::ToggleSpeech => self.toggle_speech(),
            ChatCommand::Listen => self.listen(),
            ChatCommand::End => self.dispatch_chat(ChatEvent::Terminate, scene),
            ChatCommand::Help => {
                for line in HELP_LINES {
                    self.chat.notice(line);
                }
            }
        }
    }

    fn toggle_speech(&mut self) {
        let enabled = self.speech.toggle();
        self.chat.notice(if enabled {
            "Speech output on."
        } else {
            "Speech output off."
        });
    }

    fn listen(&mut self) {
        if !self.speech.can_listen() {
            self.chat.notice("Speech input is not available on this host.");
            return;
        }
        if self.chat.input_enabled() && self.speech.start_listening() {
            debug!("speech_listen_started");
        }
    }

    fn setup_panel(&self, tab: SetupTab) -> HudPanel {
        let mut panel = HudPanel::new(HudPanelAnchor::TopLeft)
            .titled("NPC Demo")
            .wrapped(SETUP_WRAP_CHARS);
        panel.push(HudLine::new(
            match tab {
                SetupTab::Create => "[Create Character]   Load Character     (Tab to switch)",
                SetupTab::Load => " Create Character   [Load Character]    (Tab to switch)",
            },
            HudTone::Accent,
        ));
        panel.push(HudLine::blank());

        match tab {
            SetupTab::Create => {
                let form = self.setup.form();
                for field in FormField::ORDER {
                    let focused = field == self.setup.focus() && !self.setup.is_busy();
                    let marker = if focused { '>' } else { ' ' };
                    let cursor = if focused { CURSOR.to_string() } else { String::new() };
                    panel.push(HudLine::new(
                        format!("{marker} {}: {}{cursor}", field.label(), form.field(field)),
                        if focused { HudTone::User } else { HudTone::Normal },
                    ));
                }
                panel.push(HudLine::blank());
                for slot in UploadSlot::ORDER {
                    panel.push(HudLine::new(
                        format!("  {}: {}", slot.label(), form.file_display_name(slot)),
                        HudTone::Dim,
                    ));
                }
                panel.push(HudLine::blank());
                panel.push(HudLine::new(
                    format!("[ {} ]  (Enter)", self.setup.submit_label()),
                    HudTone::Accent,
                ));
                if let Some(status) = self.setup.status() {
                    panel.push(status_line(status));
                }
            }
            SetupTab::Load => {
                panel.push(HudLine::new(
                    format!("Search: {}{CURSOR}", self.catalog.query()),
                    HudTone::User,
                ));
                panel.push(HudLine::blank());
                match self.catalog.state() {
                    CatalogState::Idle => {}
                    CatalogState::Loading => {
                        panel.push(HudLine::new("Loading saved characters...", HudTone::Dim))
                    }
                    CatalogState::Failed(message) => {
                        panel.push(HudLine::new(message.clone(), HudTone::Error))
                    }
                    CatalogState::Loaded => {
                        for (index, record) in self.catalog.visible().into_iter().enumerate() {
                            let selected = index == self.catalog.selected_index();
                            panel.push(HudLine::new(
                                format!(
                                    "{} {} - {}",
                                    if selected { '>' } else { ' ' },
                                    record.name.as_deref().unwrap_or_default(),
                                    record.background.as_deref().unwrap_or_default()
                                ),
                                if selected { HudTone::Accent } else { HudTone::Normal },
                            ));
                        }
                        if let Some(notice) = self.catalog.empty_notice() {
                            panel.push(HudLine::new(notice, HudTone::Dim));
                        }
                    }
                }
                if let Some(message) = self.setup.load_error() {
                    panel.push(HudLine::new(message, HudTone::Error));
                }
                if let Some(status @ StatusLine::Progress(_)) = self.setup.status() {
                    panel.push(status_line(status));
                }
            }
        }
        panel
    }

    fn chat_panel(&self) -> HudPanel {
        let name = self.chat.character_name();
        let mut panel = HudPanel::new(HudPanelAnchor::TopLeft)
            .titled(format!("{name} ({})", self.chat.state().label()))
            .wrapped(CHAT_WRAP_CHARS);
        let transcript = self.chat.transcript();
        let start = transcript.len().saturating_sub(TRANSCRIPT_LINES);
        for message in &transcript[start..] {
            let line = match message.sender {
                Sender::User => HudLine::new(format!("You: {}", message.text), HudTone::User),
                Sender::Bot => HudLine::new(format!("{name}: {}", message.text), HudTone::Bot),
                Sender::System => HudLine::new(message.text.clone(), HudTone::System),
            };
            panel.push(line);
        }
        if self.chat.is_typing() {
            panel.push(HudLine::new(format!("{name} is typing..."), HudTone::Dim));
        }
        if self.speech.is_listening() {
            panel.push(HudLine::new("Listening...", HudTone::Dim));
        }
        panel.push(HudLine::blank());
        if self.chat.input_enabled() {
            panel.push(HudLine::new(
                format!("> {}{CURSOR}", self.chat_input),
                HudTone::User,
            ));
        } else {
            panel.push(HudLine::new("(input disabled)", HudTone::Dim));
        }
        panel
    }

    fn key_hints(&self) -> HudPanel {
        let mut panel = HudPanel::new(HudPanelAnchor::BottomLeft);
        let hints = match self.view {
            View::Setup(SetupTab::Create) => {
                "Type to edit | Up/Down field | Enter submit | Tab load | Esc quit".to_string()
            }
            View::Setup(SetupTab::Load) => {
                "Type to search | Up/Down select | Enter load | Tab create | Esc quit".to_string()
            }
            View::Chat => {
                let mut hints = vec![
                    "Enter send".to_string(),
                    format!(
                        "F1 speech: {}",
                        if self.speech.is_enabled() { "on" } else { "off" }
                    ),
                ];
                if self.speech.can_listen() {
                    hints.push("F2 listen".to_string());
                }
                if self.chat.terminate_enabled() {
                    hints.push("F4 end session".to_string());
                }
                hints.push("/help".to_string());
                hints.push("Esc quit".to_string());
                hints.join(" | ")
            }
        };
        panel.push(HudLine::new(hints, HudTone::Dim));
        panel
    }
}

fn status_line(status: &StatusLine) -> HudLine {
    let tone = match status {
        StatusLine::Progress(_) => HudTone::System,
        StatusLine::Error(_) => HudTone::Error,
    };
    HudLine::new(status.text(), tone)
}

fn animation_panel(scene: &SceneController) -> HudPanel {
    let mut panel = HudPanel::new(HudPanelAnchor::BottomRight).titled("Animations");
    let active = scene.active_kind();
    for kind in scene.available_animations() {
        let marker = if active == Some(kind) { '*' } else { ' ' };
        panel.push(HudLine::new(
            format!("{marker} {}", kind.label()),
            if active == Some(kind) {
                HudTone::Accent
            } else {
                HudTone::Normal
            },
        ));
    }
    panel.push(HudLine::new("  Stop / Idle (/stop)", HudTone::Dim));
    panel
}

impl Frontend for DemoFrontend {
    fn load(&mut self, scene: &mut SceneController) {
        info!(
            model = scene.model_asset(),
            animations = scene.available_animations().count(),
            speech_output = self.speech.is_enabled(),
            speech_input = self.speech.can_listen(),
            "demo_frontend_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        scene: &mut SceneController,
    ) -> LoopCommand {
        if input.quit_requested() || input.pressed(InputAction::Quit) {
            return LoopCommand::Quit;
        }

        self.route_backend_events(scene);
        for transcript in self.speech.poll(fixed_dt_seconds, scene) {
            self.dispatch_chat(ChatEvent::Submit(transcript), scene);
        }

        match self.view {
            View::Setup(tab) => self.update_setup(tab, input),
            View::Chat => self.update_chat(input, scene),
        }
        LoopCommand::None
    }

    fn hud(&self, scene: &SceneController) -> Hud {
        let mut hud = Hud::default();
        match self.view {
            View::Setup(tab) => hud.push(self.setup_panel(tab)),
            View::Chat => {
                hud.push(self.chat_panel());
                hud.push(animation_panel(scene));
            }
        }
        hud.push(self.key_hints());
        hud
    }

    fn unload(&mut self, _scene: &mut SceneController) {
        self.speech.cancel();
        self.speech.stop_listening();
        if matches!(
            self.chat.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            self.backend.port().submit(BackendRequest::Disconnect);
        }
        info!(transcript_len = self.chat.transcript().len(), "demo_frontend_unloaded");
    }

    fn debug_title(&self) -> Option<String> {
        Some(match self.view() {
            View::Setup(_) => "NPC Demo | setup".to_string(),
            View::Chat => format!(
                "NPC Demo | {} | {}",
                self.chat.character_name(),
                self.chat.state().label()
            ),
        })
    }

    fn overlay_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Conn: {}", self.chat.state().label()),
            format!(
                "Session: {}",
                self.chat.session().map(|id| id.as_str()).unwrap_or("-")
            ),
            format!(
                "TTS: {}",
                if self.speech.is_enabled() { "on" } else { "off" }
            ),
        ];
        if let Some(voice) = self.speech.preferred_voice() {
            lines.push(format!("Voice: {} ({})", voice.name, voice.lang));
        }
        if self.speech.is_listening() {
            lines.push("Listening".to_string());
        }
        lines
    }
}
