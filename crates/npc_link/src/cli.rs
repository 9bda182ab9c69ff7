use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;

use tokio::sync::mpsc;

use crate::fixtures::{scenario, ScenarioId};
use crate::rest::{RestClient, DEFAULT_BASE_URL};
use crate::socket::{run_session, session_socket_url, SocketEvent};
use crate::{
    parse_inbound, ActionCommand, InboundFrame, InitializeFiles, InitializeRequest, ServerFrame,
    SessionId, UploadSlot, TERMINATE_SENTINEL,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonOptions {
    pub base_url: String,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Avatars,
    Init {
        name: String,
        background: String,
        behavior: String,
        story: Option<PathBuf>,
        behavior_script: Option<PathBuf>,
        image: Option<PathBuf>,
    },
    Chat {
        session: SessionId,
    },
    Fixtures {
        scenario: Option<ScenarioId>,
    },
}

pub fn run<W: Write>(kind: CommandKind, opts: CommonOptions, stdout: &mut W) -> Result<(), String> {
    if let CommandKind::Fixtures { scenario: selected } = &kind {
        return print_fixtures(*selected, stdout);
    }

    let rest = RestClient::new(&opts.base_url).map_err(|error| error.to_string())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to start async runtime: {error}"))?;

    runtime.block_on(execute(kind, &rest, stdout))
}

async fn execute<W: Write>(
    kind: CommandKind,
    rest: &RestClient,
    stdout: &mut W,
) -> Result<(), String> {
    match kind {
        CommandKind::Avatars => {
            let avatars = rest
                .list_avatars()
                .await
                .map_err(|error| format!("Could not load saved characters: {error}"))?;
            if avatars.is_empty() {
                emit(stdout, "No saved characters found.");
            }
            for avatar in avatars {
                let Some(name) = avatar.name.as_deref() else {
                    continue;
                };
                emit(
                    stdout,
                    &format!("{name}: {}", avatar.background.as_deref().unwrap_or("")),
                );
            }
            Ok(())
        }
        CommandKind::Init {
            name,
            background,
            behavior,
            story,
            behavior_script,
            image,
        } => {
            let mut files = InitializeFiles::default();
            let slots = [
                (UploadSlot::Story, story),
                (UploadSlot::BehaviorScript, behavior_script),
                (UploadSlot::Image, image),
            ];
            for (slot, path) in slots {
                let Some(path) = path else {
                    continue;
                };
                let file_path = rest.upload_file(&path).await.map_err(|error| {
                    format!("Failed to upload {}: {error}", path.display())
                })?;
                emit(stdout, &format!("uploaded {}: {file_path}", slot.label()));
                files.set(slot, file_path);
            }
            let request = InitializeRequest::from_form(name, background, behavior, files);
            let session = rest
                .initialize(&request)
                .await
                .map_err(|error| error.to_string())?;
            emit(stdout, &format!("session_id: {session}"));
            Ok(())
        }
        CommandKind::Chat { session } => chat(rest, session, stdout).await,
        CommandKind::Fixtures { scenario: selected } => print_fixtures(selected, stdout),
    }
}

/// One-line rendering of an inbound frame for terminal output.
pub fn describe_inbound(frame: &InboundFrame) -> String {
    match frame {
        InboundFrame::Frame(ServerFrame::Dialogue { message, animation }) => {
            let mut line = format!("npc: {}", message.as_deref().unwrap_or(""));
            if let Some(animation) = animation {
                line.push_str(&format!(" [{animation}]"));
            }
            line
        }
        InboundFrame::Frame(ServerFrame::Action {
            command,
            target,
            animation,
        }) => {
            let verb = match command {
                ActionCommand::Move => "MOVE",
                ActionCommand::Interact => "INTERACT",
                ActionCommand::Other(other) => other.as_str(),
            };
            let mut line = format!("action: {verb} '{target}'");
            if let Some(animation) = animation {
                line.push_str(&format!(" [{animation}]"));
            }
            line
        }
        InboundFrame::Frame(ServerFrame::Error { message }) => format!("error: {message}"),
        InboundFrame::Unrecognized { kind } => format!(
            "unrecognized frame type: {}",
            kind.as_deref().unwrap_or("<none>")
        ),
        InboundFrame::Invalid { kind, error } => format!("invalid {kind} frame: {error}"),
        InboundFrame::Malformed(raw) => format!("npc: {raw}"),
    }
}

async fn chat<W: Write>(rest: &RestClient, session: SessionId, stdout: &mut W) -> Result<(), String> {
    let url = session_socket_url(rest.base_url(), &session).map_err(|error| error.to_string())?;
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session_task = tokio::spawn(run_session(url, outbound_rx, move |event| {
        let _ = event_tx.send(event);
    }));

    thread::Builder::new()
        .name("npc-link-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if outbound_tx.send(line.to_string()).is_err() {
                    return;
                }
            }
            let _ = outbound_tx.send(TERMINATE_SENTINEL.to_string());
        })
        .map_err(|error| format!("failed to read stdin: {error}"))?;

    while let Some(event) = event_rx.recv().await {
        match event {
            SocketEvent::Opened => emit(stdout, &format!("connected to session {session}")),
            SocketEvent::Message(raw) => emit(stdout, &describe_inbound(&parse_inbound(&raw))),
            SocketEvent::Error(error) => emit(stdout, &format!("socket error: {error}")),
            SocketEvent::Closed => {
                emit(stdout, "connection closed");
                break;
            }
        }
    }
    let _ = session_task.await;
    Ok(())
}

fn print_fixtures<W: Write>(selected: Option<ScenarioId>, stdout: &mut W) -> Result<(), String> {
    match selected {
        Some(id) => emit(stdout, scenario(id).environment_description().trim_end()),
        None => {
            for id in ScenarioId::ALL {
                emit(stdout, &format!("{:<18} {}", id.key(), scenario(id).title));
            }
        }
    }
    Ok(())
}

fn emit<W: Write>(stdout: &mut W, line: &str) {
    let _ = writeln!(stdout, "{line}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_inbound_covers_every_frame_shape() {
        assert_eq!(
            describe_inbound(&parse_inbound(
                r#"{"type":"dialogue","message":"Hi","animation":"wave_one_hand"}"#
            )),
            "npc: Hi [wave_one_hand]"
        );
        assert_eq!(
            describe_inbound(&parse_inbound(
                r#"{"type":"action","command":"MOVE","target":"aisle 2"}"#
            )),
            "action: MOVE 'aisle 2'"
        );
        assert_eq!(
            describe_inbound(&parse_inbound(r#"{"type":"error","message":"boom"}"#)),
            "error: boom"
        );
        assert_eq!(
            describe_inbound(&parse_inbound(r#"{"kind":"x"}"#)),
            "unrecognized frame type: <none>"
        );
        assert_eq!(describe_inbound(&parse_inbound("plain")), "npc: plain");
    }

    #[test]
    fn fixtures_listing_names_every_scenario() {
        let mut out = Vec::new();
        run(
            CommandKind::Fixtures { scenario: None },
            CommonOptions::default(),
            &mut out,
        )
        .expect("fixtures");
        let text = String::from_utf8(out).expect("utf8");
        for id in ScenarioId::ALL {
            assert!(text.contains(id.key()), "{text}");
        }
    }

    #[test]
    fn fixtures_detail_prints_description() {
        let mut out = Vec::new();
        run(
            CommandKind::Fixtures {
                scenario: Some(ScenarioId::SupermarketWorld),
            },
            CommonOptions::default(),
            &mut out,
        )
        .expect("fixtures");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("entrance: (0, 0, 8)"), "{text}");
    }

    #[test]
    fn invalid_base_url_fails_before_network() {
        let error = run(
            CommandKind::Avatars,
            CommonOptions {
                base_url: "nope".to_string(),
            },
            &mut Vec::new(),
        )
        .expect_err("invalid url");
        assert!(error.contains("invalid backend url"), "{error}");
    }
}
