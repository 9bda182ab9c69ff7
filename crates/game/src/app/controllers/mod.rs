pub(crate) mod avatars;
pub(crate) mod chat;
pub(crate) mod setup;
pub(crate) mod speech;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use npc_engine::{load_stage_manifest, SceneController};
    use npc_link::{BackendPort, BackendRequest};

    #[derive(Debug, Default)]
    pub(crate) struct RecordingPort {
        pub(crate) requests: Vec<BackendRequest>,
    }

    impl BackendPort for RecordingPort {
        fn submit(&mut self, request: BackendRequest) {
            self.requests.push(request);
        }
    }

    pub(crate) fn repo_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
    }

    /// Scene built from the shipped stage so tests see the real locations and clips.
    pub(crate) fn test_scene() -> SceneController {
        let path = repo_root().join("assets").join("base").join("stage.xml");
        let manifest = load_stage_manifest(&path).expect("shipped stage manifest");
        SceneController::from_manifest(&manifest)
    }
}
