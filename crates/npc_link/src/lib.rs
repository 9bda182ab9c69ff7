mod cli;
mod error;
pub mod fixtures;
mod protocol;
mod rest;
mod socket;
mod worker;

pub use cli::{describe_inbound, run, CommandKind, CommonOptions};
pub use error::LinkError;
pub use protocol::{
    parse_inbound, ActionCommand, AvatarRecord, ErrorBody, InboundFrame, InitializeFiles,
    InitializeRequest, InitializeResponse, ServerFrame, SessionId, UploadResponse, UploadSlot,
    TERMINATE_SENTINEL,
};
pub use rest::{upload_file_name, RestClient, DEFAULT_BASE_URL};
pub use socket::{run_session, session_socket_url, SocketEvent};
pub use worker::{BackendEvent, BackendHandle, BackendPort, BackendRequest};
