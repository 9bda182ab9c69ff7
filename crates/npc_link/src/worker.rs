use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tokio::runtime::Runtime;
use tokio::sync::mpsc as async_mpsc;
use tracing::{debug, info, warn};

use crate::rest::{upload_file_name, RestClient};
use crate::socket::{run_session, session_socket_url, SocketEvent};
use crate::{AvatarRecord, InitializeRequest, LinkError, SessionId, UploadSlot};

const WORKER_THREAD_NAME: &str = "npc-backend-link";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    Upload { slot: UploadSlot, path: PathBuf },
    Initialize(InitializeRequest),
    ListAvatars,
    Connect(SessionId),
    /// Raw text for the open session socket.
    Send(String),
    Disconnect,
}

#[derive(Debug)]
pub enum BackendEvent {
    Uploaded {
        slot: UploadSlot,
        file_name: String,
        result: Result<String, LinkError>,
    },
    Initialized(Result<SessionId, LinkError>),
    Avatars(Result<Vec<AvatarRecord>, LinkError>),
    Socket(SocketEvent),
}

/// Anything that accepts fire-and-forget backend requests.
pub trait BackendPort {
    fn submit(&mut self, request: BackendRequest);
}

/// Owner side of the background network thread. Requests go in without blocking;
/// results come back through [`BackendHandle::drain_events`], polled once per tick.
#[derive(Debug)]
pub struct BackendHandle {
    requests: async_mpsc::UnboundedSender<BackendRequest>,
    events: Receiver<BackendEvent>,
}

impl BackendHandle {
    pub fn spawn(rest: RestClient) -> Result<Self, LinkError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LinkError::Runtime)?;
        let (request_tx, request_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let base_url = rest.base_url().to_string();
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(runtime, rest, request_rx, event_tx))
            .map_err(LinkError::Runtime)?;
        info!(base_url = %base_url, "backend_worker_started");
        Ok(Self {
            requests: request_tx,
            events: event_rx,
        })
    }

    pub fn drain_events(&self) -> Vec<BackendEvent> {
        self.events.try_iter().collect()
    }
}

impl BackendPort for BackendHandle {
    fn submit(&mut self, request: BackendRequest) {
        if self.requests.send(request).is_err() {
            warn!("backend_worker_stopped");
        }
    }
}

fn run_worker(
    runtime: Runtime,
    rest: RestClient,
    requests: async_mpsc::UnboundedReceiver<BackendRequest>,
    events: Sender<BackendEvent>,
) {
    runtime.block_on(dispatch(rest, requests, events));
    info!("backend_worker_stopped");
}

async fn dispatch(
    rest: RestClient,
    mut requests: async_mpsc::UnboundedReceiver<BackendRequest>,
    events: Sender<BackendEvent>,
) {
    let mut outbound: Option<async_mpsc::UnboundedSender<String>> = None;
    while let Some(request) = requests.recv().await {
        match request {
            BackendRequest::Upload { slot, path } => {
                let rest = rest.clone();
                let events = events.clone();
                tokio::spawn(async move {
                    let result = rest.upload_file(&path).await;
                    let _ = events.send(BackendEvent::Uploaded {
                        slot,
                        file_name: upload_file_name(&path),
                        result,
                    });
                });
            }
            BackendRequest::Initialize(request) => {
                let rest = rest.clone();
                let events = events.clone();
                tokio::spawn(async move {
                    let result = rest.initialize(&request).await;
                    let _ = events.send(BackendEvent::Initialized(result));
                });
            }
            BackendRequest::ListAvatars => {
                let rest = rest.clone();
                let events = events.clone();
                tokio::spawn(async move {
                    let result = rest.list_avatars().await;
                    let _ = events.send(BackendEvent::Avatars(result));
                });
            }
            BackendRequest::Connect(session) => {
                let url = match session_socket_url(rest.base_url(), &session) {
                    Ok(url) => url,
                    Err(error) => {
                        warn!(error = %error, "socket_url_invalid");
                        let _ = events.send(BackendEvent::Socket(SocketEvent::Error(
                            error.to_string(),
                        )));
                        let _ = events.send(BackendEvent::Socket(SocketEvent::Closed));
                        continue;
                    }
                };
                let (outbound_tx, outbound_rx) = async_mpsc::unbounded_channel();
                outbound = Some(outbound_tx);
                let events = events.clone();
                tokio::spawn(run_session(url, outbound_rx, move |event| {
                    let _ = events.send(BackendEvent::Socket(event));
                }));
            }
            BackendRequest::Send(text) => match &outbound {
                Some(sender) if sender.send(text).is_ok() => {}
                _ => debug!("send_without_open_session"),
            },
            BackendRequest::Disconnect => {
                outbound = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for_events(handle: &BackendHandle, count: usize) -> Vec<BackendEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut collected = Vec::new();
        while collected.len() < count && Instant::now() < deadline {
            collected.extend(handle.drain_events());
            thread::sleep(Duration::from_millis(10));
        }
        collected
    }

    #[test]
    fn drain_is_empty_before_any_request() {
        let handle = BackendHandle::spawn(RestClient::new("http://127.0.0.1:9").expect("client"))
            .expect("worker");
        assert!(handle.drain_events().is_empty());
    }

    #[test]
    fn upload_of_missing_file_reports_slot_and_name() {
        let mut handle =
            BackendHandle::spawn(RestClient::new("http://127.0.0.1:9").expect("client"))
                .expect("worker");
        handle.submit(BackendRequest::Upload {
            slot: UploadSlot::Image,
            path: PathBuf::from("/no/such/portrait.png"),
        });
        let events = wait_for_events(&handle, 1);
        let Some(BackendEvent::Uploaded {
            slot,
            file_name,
            result,
        }) = events.into_iter().next()
        else {
            panic!("expected upload event");
        };
        assert_eq!(slot, UploadSlot::Image);
        assert_eq!(file_name, "portrait.png");
        assert!(matches!(result, Err(LinkError::ReadUpload { .. })));
    }

    #[test]
    fn connect_to_unreachable_backend_ends_in_closed() {
        let mut handle =
            BackendHandle::spawn(RestClient::new("http://127.0.0.1:9").expect("client"))
                .expect("worker");
        handle.submit(BackendRequest::Connect(SessionId::new("abc")));
        let events = wait_for_events(&handle, 2);
        assert!(matches!(
            events.first(),
            Some(BackendEvent::Socket(SocketEvent::Error(_)))
        ));
        assert!(matches!(
            events.get(1),
            Some(BackendEvent::Socket(SocketEvent::Closed))
        ));
    }
}
