use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::content::{load_stage_manifest, ContentCompileError};
use crate::{resolve_app_paths, StartupError};

use super::input::{ActionStates, TextEdit};
use super::metrics::MetricsAccumulator;
use super::{
    Frontend, HudLine, HudPanel, HudPanelAnchor, HudTone, InputAction, InputSnapshot, LoopCommand,
    LoopMetricsSnapshot, MetricsHandle, Renderer, SceneController,
};

const ORBIT_RADIANS_PER_PX: f32 = 0.005;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
    /// Overrides the stage manifest found under the project root.
    pub stage_manifest_path: Option<PathBuf>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "NPC Demo".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: None,
            stage_manifest_path: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load stage manifest: {0}")]
    Content(#[from] ContentCompileError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, frontend: Box<dyn Frontend>) -> Result<(), AppError> {
    run_app_with_metrics(config, frontend, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut frontend: Box<dyn Frontend>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let manifest_path = match &config.stage_manifest_path {
        Some(path) => path.clone(),
        None => {
            let app_paths = resolve_app_paths()?;
            info!(
                root = %app_paths.root.display(),
                content_dir = %app_paths.content_dir.display(),
                "startup"
            );
            app_paths.stage_manifest_path()
        }
    };
    let manifest = load_stage_manifest(&manifest_path)?;
    let mut scene = SceneController::from_manifest(&manifest);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let render_frame_target = target_frame_duration(config.max_render_fps.filter(|fps| *fps > 0));
    let size = window.inner_size();
    let mut input_collector = InputCollector::new(size.width, size.height);

    frontend.load(&mut scene);
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        manifest = %manifest_path.display(),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let mut overlay_visible = false;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.handle_cursor_moved(position.x as f32, position.y as f32);
                }
                WindowEvent::CursorLeft { .. } => input_collector.clear_cursor(),
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    input_collector.handle_mouse_wheel(delta);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        input_collector.handle_key(
                            code,
                            event.state == ElementState::Pressed,
                            event.text.as_deref(),
                        );
                    }
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if input_collector.take_overlay_toggle_pressed() {
                        overlay_visible = !overlay_visible;
                        info!(overlay_visible, "overlay_toggled");
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    accumulator = accumulator.saturating_add(raw_frame_dt.min(max_frame_delta));

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input = input_collector.snapshot_for_tick();
                        apply_camera_input(&mut scene, &input);
                        let command = frontend.update(fixed_dt_seconds, &input, &mut scene);
                        scene.update(fixed_dt_seconds);
                        metrics_accumulator.record_tick();
                        if command == LoopCommand::Quit {
                            info!(reason = "frontend", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        metrics_accumulator.record_clamp();
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let cap_sleep = compute_cap_sleep(
                        Instant::now().saturating_duration_since(last_present_instant),
                        render_frame_target,
                    );
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let mut hud = frontend.hud(&scene);
                    if overlay_visible {
                        hud.push(build_overlay_panel(
                            metrics_handle.snapshot(),
                            &scene,
                            frontend.overlay_lines(),
                        ));
                    }
                    if let Err(error) = renderer.render(&scene, &hud) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = frontend.debug_title();
                    if next_title != last_applied_title {
                        window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                        last_applied_title = next_title;
                    }
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            clamped_frames = snapshot.clamped_frames,
                            active_animation = scene.active_kind().map(|kind| kind.name()).unwrap_or("idle"),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                frontend.unload(&mut scene);
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn apply_camera_input(scene: &mut SceneController, input: &InputSnapshot) {
    let (dx, dy) = input.orbit_delta_px();
    let camera = scene.camera_mut();
    if dx != 0.0 || dy != 0.0 {
        camera.orbit(-dx * ORBIT_RADIANS_PER_PX, dy * ORBIT_RADIANS_PER_PX);
    }
    camera.zoom_steps(input.zoom_delta_steps());
}

fn build_overlay_panel(
    metrics: LoopMetricsSnapshot,
    scene: &SceneController,
    extra_lines: Vec<String>,
) -> HudPanel {
    let mut panel = HudPanel::new(HudPanelAnchor::TopRight).titled("Perf");
    panel.push(HudLine::normal(format!("FPS: {:.1}", metrics.fps)));
    panel.push(HudLine::normal(format!("TPS: {:.1}", metrics.tps)));
    panel.push(HudLine::normal(format!(
        "Frame: {:.2} ms",
        metrics.frame_time_ms
    )));
    if metrics.clamped_frames > 0 {
        panel.push(HudLine::new(
            format!("Clamped: {}", metrics.clamped_frames),
            HudTone::Error,
        ));
    }
    panel.push(HudLine::blank());
    panel.push(HudLine::new("Stage", HudTone::Accent));
    panel.push(HudLine::normal(format!(
        "Anim: {}",
        scene.active_kind().map(|kind| kind.name()).unwrap_or("idle")
    )));
    let avatar = scene.avatar();
    panel.push(HudLine::normal(format!(
        "Pos: {:.1},{:.1}",
        avatar.position.x, avatar.position.z
    )));
    panel.push(HudLine::normal(match scene.target() {
        Some(target) => format!("Target: {:.1},{:.1}", target.x, target.z),
        None => "Target: idle".to_string(),
    }));
    for line in extra_lines {
        panel.push(HudLine::new(line, HudTone::Dim));
    }
    panel
}

fn action_for_key(code: KeyCode) -> Option<InputAction> {
    match code {
        KeyCode::Enter | KeyCode::NumpadEnter => Some(InputAction::Submit),
        KeyCode::Tab => Some(InputAction::SwitchTab),
        KeyCode::ArrowUp => Some(InputAction::SelectPrevious),
        KeyCode::ArrowDown => Some(InputAction::SelectNext),
        KeyCode::F1 => Some(InputAction::ToggleSpeech),
        KeyCode::F2 => Some(InputAction::Listen),
        KeyCode::F3 => Some(InputAction::ToggleOverlay),
        KeyCode::F4 => Some(InputAction::Terminate),
        KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    actions: ActionStates,
    text_edits: Vec<TextEdit>,
    cursor_px: Option<(f32, f32)>,
    right_mouse_is_down: bool,
    orbit_delta_px: (f32, f32),
    pending_zoom_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn handle_key(&mut self, code: KeyCode, is_pressed: bool, text: Option<&str>) {
        if let Some(action) = action_for_key(code) {
            self.actions.set(action, is_pressed);
            if action == InputAction::Quit && is_pressed {
                self.quit_requested = true;
            }
        }
        if !is_pressed {
            return;
        }
        // Backspace auto-repeats, so it is recorded per press rather than as an edge.
        if code == KeyCode::Backspace {
            self.text_edits.push(TextEdit::Backspace);
            return;
        }
        if let Some(text) = text {
            self.text_edits.extend(
                text.chars()
                    .filter(|ch| !ch.is_control())
                    .map(TextEdit::Insert),
            );
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.actions,
            std::mem::take(&mut self.text_edits),
            std::mem::take(&mut self.orbit_delta_px),
            std::mem::take(&mut self.pending_zoom_steps),
            (self.window_width, self.window_height),
        );
        self.actions.clear_edges();
        snapshot
    }

    fn take_overlay_toggle_pressed(&mut self) -> bool {
        self.actions.take_pressed(InputAction::ToggleOverlay)
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn handle_cursor_moved(&mut self, x: f32, y: f32) {
        if let (true, Some((last_x, last_y))) = (self.right_mouse_is_down, self.cursor_px) {
            self.orbit_delta_px.0 += x - last_x;
            self.orbit_delta_px.1 += y - last_y;
        }
        self.cursor_px = Some((x, y));
    }

    fn clear_cursor(&mut self) {
        self.cursor_px = None;
        self.right_mouse_is_down = false;
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Right {
            self.right_mouse_is_down = state == ElementState::Pressed;
        }
    }

    fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = zoom_steps_from_scroll_delta(delta);
        self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(steps);
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(mut accumulator: Duration, fixed_dt: Duration, max_ticks: u32) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run += 1;
    }

    // Whatever is still a full tick behind gets dropped instead of spiralling.
    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn zoom_steps_from_scroll_delta(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
        MouseScrollDelta::PixelDelta(position) => position.y.signum() as i32,
    }
}
