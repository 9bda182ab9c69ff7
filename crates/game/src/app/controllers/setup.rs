//! Character creation: form state, sequential uploads, then session initialization.

use std::collections::VecDeque;
use std::path::PathBuf;

use npc_link::{
    upload_file_name, AvatarRecord, BackendPort, BackendRequest, InitializeFiles,
    InitializeRequest, LinkError, SessionId, UploadSlot,
};
use tracing::{error, info, warn};

pub(crate) const SUBMIT_LABEL: &str = "Create Character & Start Session";
pub(crate) const SUBMIT_BUSY_LABEL: &str = "Initializing...";
pub(crate) const NO_FILE_SELECTED: &str = "No file selected";
const UPLOADING_STATUS: &str = "Uploading files...";
const INITIALIZING_STATUS: &str = "Initializing character...";
const UPLOAD_FAILED_DEFAULT: &str = "Upload failed";
const INITIALIZE_FAILED_DEFAULT: &str = "Failed to initialize.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormField {
    Name,
    Background,
    Behavior,
}

impl FormField {
    pub(crate) const ORDER: [FormField; 3] =
        [FormField::Name, FormField::Background, FormField::Behavior];

    pub(crate) fn label(self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::Background => "Background",
            FormField::Behavior => "Behavior",
        }
    }

    fn index(self) -> usize {
        match self {
            FormField::Name => 0,
            FormField::Background => 1,
            FormField::Behavior => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CharacterForm {
    pub(crate) name: String,
    pub(crate) background: String,
    pub(crate) behavior: String,
    pub(crate) story_file: Option<PathBuf>,
    pub(crate) behavior_script: Option<PathBuf>,
    pub(crate) image_file: Option<PathBuf>,
}

impl CharacterForm {
    pub(crate) fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Background => &self.background,
            FormField::Behavior => &self.behavior,
        }
    }

    pub(crate) fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Name => &mut self.name,
            FormField::Background => &mut self.background,
            FormField::Behavior => &mut self.behavior,
        }
    }

    pub(crate) fn file(&self, slot: UploadSlot) -> Option<&PathBuf> {
        match slot {
            UploadSlot::Story => self.story_file.as_ref(),
            UploadSlot::BehaviorScript => self.behavior_script.as_ref(),
            UploadSlot::Image => self.image_file.as_ref(),
        }
    }

    pub(crate) fn file_display_name(&self, slot: UploadSlot) -> String {
        self.file(slot)
            .map(|path| upload_file_name(path))
            .unwrap_or_else(|| NO_FILE_SELECTED.to_string())
    }

    fn present_files(&self) -> VecDeque<(UploadSlot, PathBuf)> {
        UploadSlot::ORDER
            .into_iter()
            .filter_map(|slot| self.file(slot).map(|path| (slot, path.clone())))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StatusLine {
    Progress(String),
    Error(String),
}

impl StatusLine {
    pub(crate) fn text(&self) -> &str {
        match self {
            StatusLine::Progress(text) | StatusLine::Error(text) => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitOrigin {
    Form,
    Saved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SetupPhase {
    Editing,
    Uploading {
        current: UploadSlot,
        queue: VecDeque<(UploadSlot, PathBuf)>,
        files: InitializeFiles,
    },
    Initializing {
        origin: InitOrigin,
        name: String,
    },
    Ready,
}

/// A started session, ready to be handed to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionStart {
    pub(crate) session: SessionId,
    pub(crate) character_name: String,
}

#[derive(Debug)]
pub(crate) struct SetupController {
    form: CharacterForm,
    focus: FormField,
    phase: SetupPhase,
    status: Option<StatusLine>,
    load_error: Option<String>,
}

impl SetupController {
    pub(crate) fn new(form: CharacterForm) -> Self {
        Self {
            form,
            focus: FormField::Name,
            phase: SetupPhase::Editing,
            status: None,
            load_error: None,
        }
    }

    pub(crate) fn form(&self) -> &CharacterForm {
        &self.form
    }

    pub(crate) fn focus(&self) -> FormField {
        self.focus
    }

    pub(crate) fn focused_text_mut(&mut self) -> Option<&mut String> {
        if self.is_busy() {
            return None;
        }
        Some(self.form.field_mut(self.focus))
    }

    pub(crate) fn focus_next(&mut self) {
        self.focus = FormField::ORDER[(self.focus.index() + 1) % FormField::ORDER.len()];
    }

    pub(crate) fn focus_previous(&mut self) {
        let len = FormField::ORDER.len();
        self.focus = FormField::ORDER[(self.focus.index() + len - 1) % len];
    }

    pub(crate) fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    /// Failure from the saved-character flow, shown on the load tab.
    pub(crate) fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub(crate) fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            SetupPhase::Uploading { .. } | SetupPhase::Initializing { .. } | SetupPhase::Ready
        )
    }

    pub(crate) fn submit_label(&self) -> &'static str {
        if self.is_busy() {
            SUBMIT_BUSY_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    /// Starts the create flow: uploads every present file in order, then initializes.
    pub(crate) fn submit(&mut self, port: &mut dyn BackendPort) {
        if self.is_busy() {
            return;
        }
        self.status = None;
        if self.form.name.trim().is_empty() {
            self.status = Some(StatusLine::Error(
                "Error: Character name is required.".to_string(),
            ));
            return;
        }

        let mut queue = self.form.present_files();
        match queue.pop_front() {
            Some((slot, path)) => {
                info!(file_count = queue.len() + 1, "setup_upload_started");
                self.status = Some(StatusLine::Progress(UPLOADING_STATUS.to_string()));
                port.submit(BackendRequest::Upload { slot, path });
                self.phase = SetupPhase::Uploading {
                    current: slot,
                    queue,
                    files: InitializeFiles::default(),
                };
            }
            None => self.initialize_form(InitializeFiles::default(), port),
        }
    }

    /// Re-initializes a saved character from its stored text fields only.
    pub(crate) fn load_saved(&mut self, record: &AvatarRecord, port: &mut dyn BackendPort) {
        if self.is_busy() {
            return;
        }
        let Some(name) = record.name.clone() else {
            return;
        };
        self.load_error = None;
        let request = InitializeRequest::saved(
            name.clone(),
            record.background.clone().unwrap_or_default(),
            record.behavior.clone().unwrap_or_default(),
        );
        info!(character = %name, "saved_character_load_started");
        self.status = Some(StatusLine::Progress(INITIALIZING_STATUS.to_string()));
        port.submit(BackendRequest::Initialize(request));
        self.phase = SetupPhase::Initializing {
            origin: InitOrigin::Saved,
            name,
        };
    }

    pub(crate) fn handle_uploaded(
        &mut self,
        slot: UploadSlot,
        file_name: &str,
        result: Result<String, LinkError>,
        port: &mut dyn BackendPort,
    ) {
        let SetupPhase::Uploading {
            current,
            queue,
            files,
        } = &mut self.phase
        else {
            warn!(slot = slot.label(), "upload_result_ignored");
            return;
        };
        if *current != slot {
            warn!(slot = slot.label(), "upload_result_ignored");
            return;
        }

        match result {
            Ok(file_path) => {
                info!(slot = slot.label(), file_path = %file_path, "setup_file_uploaded");
                files.set(slot, file_path);
                match queue.pop_front() {
                    Some((next, path)) => {
                        *current = next;
                        port.submit(BackendRequest::Upload { slot: next, path });
                    }
                    None => {
                        let files = std::mem::take(files);
                        self.initialize_form(files, port);
                    }
                }
            }
            Err(err) => {
                let reason = failure_reason(&err, UPLOAD_FAILED_DEFAULT);
                error!(slot = slot.label(), error = %err, "setup_upload_failed");
                self.fail(format!("Failed to upload {file_name}: {reason}"));
            }
        }
    }

    /// Returns the session once initialization succeeds.
    pub(crate) fn handle_initialized(
        &mut self,
        result: Result<SessionId, LinkError>,
    ) -> Option<SessionStart> {
        let SetupPhase::Initializing { origin, name } = &self.phase else {
            warn!("initialize_result_ignored");
            return None;
        };
        let origin = *origin;
        let name = name.clone();

        match result {
            Ok(session) => {
                info!(session_id = %session, character = %name, "session_ready");
                self.phase = SetupPhase::Ready;
                self.status = None;
                Some(SessionStart {
                    session,
                    character_name: name,
                })
            }
            Err(err) => {
                error!(error = %err, "session_initialize_failed");
                let reason = failure_reason(&err, INITIALIZE_FAILED_DEFAULT);
                match origin {
                    InitOrigin::Form => self.fail(reason),
                    InitOrigin::Saved => {
                        self.phase = SetupPhase::Editing;
                        self.status = None;
                        self.load_error = Some(format!("Could not load character: {reason}"));
                    }
                }
                None
            }
        }
    }

    fn initialize_form(&mut self, files: InitializeFiles, port: &mut dyn BackendPort) {
        let name = self.form.name.trim().to_string();
        let request = InitializeRequest::from_form(
            name.clone(),
            self.form.background.clone(),
            self.form.behavior.clone(),
            files,
        );
        self.status = Some(StatusLine::Progress(INITIALIZING_STATUS.to_string()));
        port.submit(BackendRequest::Initialize(request));
        self.phase = SetupPhase::Initializing {
            origin: InitOrigin::Form,
            name,
        };
    }

    fn fail(&mut self, message: String) {
        self.phase = SetupPhase::Editing;
        self.status = Some(StatusLine::Error(format!("Error: {message}")));
    }
}

/// Server detail for rejected requests, the transport error otherwise.
fn failure_reason(err: &LinkError, status_default: &str) -> String {
    if err.is_status() {
        err.server_detail().unwrap_or(status_default).to_string()
    } else {
        err.to_string()
    }
}
