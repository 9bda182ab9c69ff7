mod animation;
mod hud;
mod input;
mod loop_runner;
mod math;
mod metrics;
mod rendering;
mod scene;

pub use animation::{
    ActiveAnimation, AnimationKind, AnimationMixer, ClipEntry, ClipHandle, ClipRegistry,
    LoopPolicy,
};
pub use hud::{wrap_text, Hud, HudLine, HudPanel, HudPanelAnchor, HudTone};
pub use input::{apply_text_edits, InputAction, InputSnapshot, TextEdit};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig};
pub use math::Vec3;
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{Projection, Renderer, Viewport};
pub use scene::{
    Avatar, Frontend, InteractOutcome, LoopCommand, MoveOutcome, OrbitCamera, PlayOutcome,
    SceneController, SceneError, SceneObject, SceneObjectKind, ARRIVAL_THRESHOLD,
    CROSS_FADE_SECONDS, MOVEMENT_SPEED, STOP_FADE_SECONDS,
};
