use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use npc_link::{
    parse_inbound, ActionCommand, BackendEvent, BackendHandle, BackendPort, BackendRequest,
    InboundFrame, InitializeFiles, InitializeRequest, LinkError, RestClient, ServerFrame,
    SessionId, SocketEvent, UploadSlot, TERMINATE_SENTINEL,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Recorded {
    uploads: Arc<Mutex<Vec<String>>>,
    initialize_bodies: Arc<Mutex<Vec<Value>>>,
    socket_texts: Arc<Mutex<Vec<String>>>,
}

async fn upload(State(recorded): State<Recorded>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    if let Ok(Some(field)) = multipart.next_field().await {
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap_or_default();
        if file_name.ends_with(".exe") {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Invalid file type. Allowed: .txt, .cs, .png"})),
            );
        }
        recorded
            .uploads
            .lock()
            .expect("uploads")
            .push(format!("{file_name}:{}", bytes.len()));
        return (
            StatusCode::OK,
            Json(json!({"file_path": format!("data/uploads/{file_name}")})),
        );
    }
    (StatusCode::BAD_REQUEST, Json(json!({"detail": "No file."})))
}

async fn initialize(
    State(recorded): State<Recorded>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    recorded
        .initialize_bodies
        .lock()
        .expect("bodies")
        .push(body);
    if name.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "Name is required."})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "message": format!("Character '{name}' initialized."),
            "session_id": format!("sess-{}", name.to_lowercase()),
        })),
    )
}

async fn avatars() -> Json<Value> {
    Json(json!([
        {"name": "Leo", "background": "Store Manager Android", "behavior": "Calm"},
        null,
        {"name": "Ana"}
    ]))
}

async fn session_socket(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(recorded): State<Recorded>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| chat_session(socket, session_id, recorded))
}

async fn chat_session(mut socket: WebSocket, session_id: String, recorded: Recorded) {
    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        let text = text.as_str().to_string();
        recorded
            .socket_texts
            .lock()
            .expect("texts")
            .push(text.clone());
        if text == TERMINATE_SENTINEL {
            break;
        }
        let frames = [
            json!({
                "type": "dialogue",
                "message": format!("{session_id}: you said {text}"),
                "animation": "wave_one_hand"
            })
            .to_string(),
            json!({"type": "action", "command": "MOVE", "target": "aisle 1"}).to_string(),
            "not json".to_string(),
        ];
        for frame in frames {
            if socket.send(Message::Text(frame.into())).await.is_err() {
                return;
            }
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn spawn_backend() -> (String, Recorded) {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/upload", post(upload))
        .route("/initialize", post(initialize))
        .route("/avatars", get(avatars))
        .route("/ws/{session_id}", get(session_socket))
        .with_state(recorded.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    (format!("http://{addr}"), recorded)
}

#[tokio::test]
async fn upload_returns_server_path_and_surfaces_detail_on_rejection() {
    let (base, recorded) = spawn_backend().await;
    let client = RestClient::new(&base).expect("client");
    let dir = TempDir::new().expect("tempdir");
    let script = dir.path().join("world.cs");
    fs::write(&script, "public static class GameState {}").expect("write");
    let rejected = dir.path().join("tool.exe");
    fs::write(&rejected, "MZ").expect("write");

    let file_path = client.upload_file(&script).await.expect("upload");
    assert_eq!(file_path, "data/uploads/world.cs");
    assert_eq!(
        recorded.uploads.lock().expect("uploads").as_slice(),
        ["world.cs:32".to_string()]
    );

    let error = client.upload_file(&rejected).await.expect_err("rejected");
    assert!(matches!(error, LinkError::Status { status: 400, .. }));
    assert_eq!(
        error.server_detail(),
        Some("Invalid file type. Allowed: .txt, .cs, .png")
    );
}

#[tokio::test]
async fn initialize_sends_null_paths_for_form_and_omits_them_for_saved() {
    let (base, recorded) = spawn_backend().await;
    let client = RestClient::new(&base).expect("client");

    let mut files = InitializeFiles::default();
    files.set(UploadSlot::BehaviorScript, "data/uploads/world.cs".to_string());
    let session = client
        .initialize(&InitializeRequest::from_form("Leo", "Android", "Calm", files))
        .await
        .expect("form init");
    assert_eq!(session, SessionId::new("sess-leo"));

    client
        .initialize(&InitializeRequest::saved("Ana", "", ""))
        .await
        .expect("saved init");

    let bodies = recorded.initialize_bodies.lock().expect("bodies").clone();
    assert_eq!(
        bodies[0],
        json!({
            "name": "Leo",
            "background": "Android",
            "behavior": "Calm",
            "story_file_path": null,
            "csharp_file_path": "data/uploads/world.cs",
            "image_file_path": null
        })
    );
    assert_eq!(
        bodies[1],
        json!({"name": "Ana", "background": "", "behavior": ""})
    );
}

#[tokio::test]
async fn initialize_failure_carries_detail() {
    let (base, _recorded) = spawn_backend().await;
    let client = RestClient::new(&base).expect("client");
    let error = client
        .initialize(&InitializeRequest::saved("", "", ""))
        .await
        .expect_err("empty name");
    assert_eq!(error.server_detail(), Some("Name is required."));
}

#[tokio::test]
async fn avatar_list_skips_null_entries() {
    let (base, _recorded) = spawn_backend().await;
    let client = RestClient::new(&base).expect("client");
    let avatars = client.list_avatars().await.expect("avatars");
    assert_eq!(avatars.len(), 2);
    assert_eq!(avatars[0].name.as_deref(), Some("Leo"));
    assert_eq!(avatars[1].background, None);
}

fn wait_for<F>(handle: &BackendHandle, collected: &mut Vec<BackendEvent>, mut done: F)
where
    F: FnMut(&[BackendEvent]) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done(collected) {
        assert!(Instant::now() < deadline, "timed out; got {collected:?}");
        collected.extend(handle.drain_events());
        thread::sleep(Duration::from_millis(10));
    }
}

fn socket_messages(events: &[BackendEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            BackendEvent::Socket(SocketEvent::Message(text)) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn worker_drives_a_full_chat_session() {
    let server_runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (base, recorded) = server_runtime.block_on(spawn_backend());
    let mut handle = BackendHandle::spawn(RestClient::new(&base).expect("client")).expect("worker");
    let mut events = Vec::new();

    handle.submit(BackendRequest::Connect(SessionId::new("abc")));
    wait_for(&handle, &mut events, |events| {
        events
            .iter()
            .any(|event| matches!(event, BackendEvent::Socket(SocketEvent::Opened)))
    });

    handle.submit(BackendRequest::Send("hello".to_string()));
    wait_for(&handle, &mut events, |events| socket_messages(events).len() >= 3);

    let messages = socket_messages(&events);
    assert_eq!(
        parse_inbound(&messages[0]),
        InboundFrame::Frame(ServerFrame::Dialogue {
            message: Some("abc: you said hello".to_string()),
            animation: Some("wave_one_hand".to_string()),
        })
    );
    assert!(matches!(
        parse_inbound(&messages[1]),
        InboundFrame::Frame(ServerFrame::Action {
            command: ActionCommand::Move,
            ..
        })
    ));
    assert_eq!(
        parse_inbound(&messages[2]),
        InboundFrame::Malformed("not json".to_string())
    );

    handle.submit(BackendRequest::Send(TERMINATE_SENTINEL.to_string()));
    handle.submit(BackendRequest::Disconnect);
    wait_for(&handle, &mut events, |events| {
        events
            .iter()
            .any(|event| matches!(event, BackendEvent::Socket(SocketEvent::Closed)))
    });
    assert_eq!(
        recorded.socket_texts.lock().expect("texts").as_slice(),
        ["hello".to_string(), TERMINATE_SENTINEL.to_string()]
    );
}

#[test]
fn worker_reports_avatars_and_upload_results() {
    let server_runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (base, _recorded) = server_runtime.block_on(spawn_backend());
    let mut handle = BackendHandle::spawn(RestClient::new(&base).expect("client")).expect("worker");
    let dir = TempDir::new().expect("tempdir");
    let story = dir.path().join("story.txt");
    fs::write(&story, "Once upon a time").expect("write");

    handle.submit(BackendRequest::ListAvatars);
    handle.submit(BackendRequest::Upload {
        slot: UploadSlot::Story,
        path: story,
    });
    let mut events = Vec::new();
    wait_for(&handle, &mut events, |events| events.len() >= 2);

    let avatars = events.iter().find_map(|event| match event {
        BackendEvent::Avatars(Ok(avatars)) => Some(avatars.len()),
        _ => None,
    });
    assert_eq!(avatars, Some(2));
    let upload = events.iter().find_map(|event| match event {
        BackendEvent::Uploaded {
            slot,
            file_name,
            result: Ok(path),
        } => Some((*slot, file_name.clone(), path.clone())),
        _ => None,
    });
    assert_eq!(
        upload,
        Some((
            UploadSlot::Story,
            "story.txt".to_string(),
            "data/uploads/story.txt".to_string()
        ))
    );
}
