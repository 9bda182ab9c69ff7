use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::{LinkError, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Message(String),
    Error(String),
    Closed,
}

/// `ws://<host>/ws/<session_id>` for an `http://` base, `wss://` for `https://`.
pub fn session_socket_url(base: &Url, session: &SessionId) -> Result<Url, LinkError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(LinkError::InvalidUrl {
                url: base.to_string(),
                message: format!("cannot derive a websocket url from scheme '{other}'"),
            })
        }
    };
    let mut url = base.clone();
    url.set_scheme(scheme).map_err(|()| LinkError::InvalidUrl {
        url: base.to_string(),
        message: format!("cannot switch scheme to '{scheme}'"),
    })?;
    let path = format!("{}/ws/{}", base.path().trim_end_matches('/'), session);
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Drives one chat session until either side closes it.
///
/// Text queued on `outbound` is sent in order. Dropping the sender closes the socket
/// politely. Every session ends with exactly one [`SocketEvent::Closed`], including
/// one that never connected, which first reports [`SocketEvent::Error`].
pub async fn run_session<F>(url: Url, mut outbound: mpsc::UnboundedReceiver<String>, mut emit: F)
where
    F: FnMut(SocketEvent) + Send,
{
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(error) => {
            warn!(url = %url, error = %error, "socket_connect_failed");
            emit(SocketEvent::Error(error.to_string()));
            emit(SocketEvent::Closed);
            return;
        }
    };
    info!(url = %url, "socket_opened");
    emit(SocketEvent::Opened);

    let (mut write, mut read) = stream.split();
    let mut outbound_open = true;
    loop {
        tokio::select! {
            next = outbound.recv(), if outbound_open => match next {
                Some(text) => {
                    debug!(bytes = text.len(), "socket_send");
                    if let Err(error) = write.send(Message::Text(text)).await {
                        warn!(error = %error, "socket_send_failed");
                        emit(SocketEvent::Error(error.to_string()));
                        break;
                    }
                }
                None => {
                    outbound_open = false;
                    if let Err(error) = write.send(Message::Close(None)).await {
                        debug!(error = %error, "socket_close_send_failed");
                        break;
                    }
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => emit(SocketEvent::Message(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    emit(SocketEvent::Message(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(error = %error, "socket_read_failed");
                    emit(SocketEvent::Error(error.to_string()));
                    break;
                }
            },
        }
    }
    info!(url = %url, "socket_closed");
    emit(SocketEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::new("5b1c")
    }

    #[test]
    fn http_base_maps_to_ws_session_path() {
        let base = Url::parse("http://127.0.0.1:8000/").expect("url");
        assert_eq!(
            session_socket_url(&base, &session()).expect("ws").as_str(),
            "ws://127.0.0.1:8000/ws/5b1c"
        );
    }

    #[test]
    fn https_base_with_prefix_maps_to_wss() {
        let base = Url::parse("https://npc.example.com/api/?x=1").expect("url");
        assert_eq!(
            session_socket_url(&base, &session()).expect("wss").as_str(),
            "wss://npc.example.com/api/ws/5b1c"
        );
    }

    #[test]
    fn other_schemes_are_rejected() {
        let base = Url::parse("ftp://example.com/").expect("url");
        assert!(session_socket_url(&base, &session()).is_err());
    }

    #[tokio::test]
    async fn unreachable_server_reports_error_then_closed() {
        let url = Url::parse("ws://127.0.0.1:9/ws/none").expect("url");
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut events = Vec::new();
        run_session(url, rx, |event| events.push(event)).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SocketEvent::Error(_)));
        assert_eq!(events[1], SocketEvent::Closed);
    }
}
