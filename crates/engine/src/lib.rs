use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    apply_text_edits, run_app, run_app_with_metrics, wrap_text, ActiveAnimation, AnimationKind,
    AnimationMixer, AppError, Avatar, ClipEntry, ClipHandle, ClipRegistry, Frontend, Hud, HudLine,
    HudPanel, HudPanelAnchor, HudTone, InputAction, InputSnapshot, InteractOutcome, LoopCommand,
    LoopConfig, LoopMetricsSnapshot, LoopPolicy, MetricsHandle, MoveOutcome, OrbitCamera,
    PlayOutcome, SceneController, SceneError, SceneObject, SceneObjectKind, TextEdit, Vec3,
    ARRIVAL_THRESHOLD, CROSS_FADE_SECONDS, MOVEMENT_SPEED, STOP_FADE_SECONDS,
};
pub use content::{
    compile_stage_manifest, load_stage_manifest, ClipDef, ContentCompileError, ContentErrorCode,
    InteractableDef, LocationDef, ModelDef, ObjectDef, ObjectDefKind, SourceLocation,
    StageManifest, STAGE_MANIFEST_FILE,
};

pub const ROOT_ENV_VAR: &str = "NPC_DEMO_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub content_dir: PathBuf,
    pub fixtures_dir: PathBuf,
}

impl AppPaths {
    pub fn stage_manifest_path(&self) -> PathBuf {
        self.content_dir.join(STAGE_MANIFEST_FILE)
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "NPC_DEMO_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/npc-demo\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_for_root(root))
}

pub fn app_paths_for_root(root: PathBuf) -> AppPaths {
    let assets = root.join("assets");
    AppPaths {
        content_dir: assets.join("base"),
        fixtures_dir: assets.join("fixtures"),
        root,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
