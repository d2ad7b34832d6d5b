use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::input::{ActionStates, WEAPON_SLOTS};
use super::metrics::{FrameSample, MetricsAccumulator};
use super::present::Presenter;
use super::{InputAction, InputSnapshot, MetricsHandle, Scene};

pub const SLOW_FRAME_ENV_VAR: &str = "RAYCAST_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Size of the frame the scene renders before it is scaled to the window.
    pub render_width: u32,
    pub render_height: u32,
    /// Game ticks per second; simulation speeds are tuned against 60.
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Raycaster".to_string(),
            window_width: 1280,
            window_height: 720,
            render_width: 480,
            render_height: 270,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize pixel surface: {0}")]
    CreatePresenter(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, scene, metrics_handle)
}

/// Runs one update and one render per frame. The update receives the
/// clamped frame time converted to game ticks.
pub fn run_app_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
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
    let window_for_loop = Arc::clone(&window);
    let mut presenter = Presenter::new(window, config.render_width, config.render_height)
        .map_err(AppError::CreatePresenter)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let mut input_collector = InputCollector::default();

    info!(
        target_tps,
        render_width = config.render_width,
        render_height = config.render_height,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        entity_count = scene.entity_count(),
        "loop_config"
    );

    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator =
        MetricsAccumulator::new(metrics_log_interval, target_tps, max_frame_delta);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        input_collector.mark_quit_requested();
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Err(error) = presenter.resize(new_size.width, new_size.height) {
                            warn!(error = %error, "presenter_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        if let Err(error) = presenter.resize(size.width, size.height) {
                            warn!(error = %error, "presenter_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        input_collector.handle_mouse_input(button, state);
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        input_collector.handle_keyboard_input(&event);
                        if input_collector.quit_requested {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        if slow_frame_delay > Duration::ZERO {
                            // Explicit debug perturbation only; this is not the FPS cap.
                            thread::sleep(slow_frame_delay);
                        }

                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        let dt = frame_ticks(raw_frame_dt, max_frame_delta, target_tps);
                        let input_snapshot = input_collector.snapshot_for_frame();
                        scene.update(dt, &input_snapshot);

                        let elapsed_since_last_present =
                            Instant::now().saturating_duration_since(last_present_instant);
                        let cap_sleep =
                            compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                        if cap_sleep > Duration::ZERO {
                            thread::sleep(cap_sleep);
                        }

                        scene.render(presenter.frame_mut());
                        if let Err(error) = presenter.present() {
                            warn!(error = %error, "presenter_draw_failed");
                            window_target.exit();
                        }
                        last_present_instant = Instant::now();

                        let next_title = scene.debug_title();
                        if next_title != last_applied_title {
                            match &next_title {
                                Some(title) => window_for_loop.set_title(title),
                                None => window_for_loop.set_title(&config.window_title),
                            }
                            last_applied_title = next_title;
                        }
                        metrics_accumulator.record(FrameSample {
                            wall: raw_frame_dt,
                            ticks: dt,
                        });

                        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                            metrics_handle.publish(snapshot);
                            info!(
                                fps = snapshot.fps,
                                tps = snapshot.tps,
                                game_speed = snapshot.game_speed,
                                frame_time_ms = snapshot.frame_time_ms,
                                max_frame_ticks = snapshot.max_frame_ticks,
                                clamped_frames = snapshot.clamped_frames,
                                entity_count = scene.entity_count(),
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                scene.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    interact_key_is_down: bool,
    interact_pressed_edge: bool,
    slot_keys_down: [bool; WEAPON_SLOTS],
    weapon_slot_pressed_edge: Option<usize>,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &winit::event::KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
        self.handle_interact_key_state(is_interact_key(key_event.physical_key), key_event.state);
        if let Some(slot) = weapon_slot_for_key(key_event.physical_key) {
            self.handle_weapon_slot_key_state(slot, key_event.state);
        }
    }

    fn snapshot_for_frame(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.interact_pressed_edge,
            self.weapon_slot_pressed_edge,
        );
        self.interact_pressed_edge = false;
        self.weapon_slot_pressed_edge = None;
        snapshot
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                self.action_states.set(InputAction::MoveForward, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.action_states.set(InputAction::MoveBack, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyA) => {
                self.action_states.set(InputAction::StrafeLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) => {
                self.action_states.set(InputAction::StrafeRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::TurnLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::TurnRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Space) => {
                self.action_states.set(InputAction::Jump, is_pressed);
            }
            PhysicalKey::Code(KeyCode::ControlLeft) | PhysicalKey::Code(KeyCode::ControlRight) => {
                self.action_states.set(InputAction::Attack, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Escape) => {
                self.action_states.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.mark_quit_requested();
                }
            }
            _ => {}
        }
    }

    fn handle_interact_key_state(&mut self, is_interact_key: bool, state: ElementState) {
        if !is_interact_key {
            return;
        }
        match state {
            ElementState::Pressed => {
                if !self.interact_key_is_down {
                    self.interact_pressed_edge = true;
                }
                self.interact_key_is_down = true;
            }
            ElementState::Released => self.interact_key_is_down = false,
        }
    }

    fn handle_weapon_slot_key_state(&mut self, slot: usize, state: ElementState) {
        let Some(is_down) = self.slot_keys_down.get_mut(slot) else {
            return;
        };
        match state {
            ElementState::Pressed => {
                if !*is_down {
                    self.weapon_slot_pressed_edge = Some(slot);
                }
                *is_down = true;
            }
            ElementState::Released => *is_down = false,
        }
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.action_states
                .set(InputAction::Attack, state == ElementState::Pressed);
        }
    }
}

fn is_interact_key(key: PhysicalKey) -> bool {
    matches!(key, PhysicalKey::Code(KeyCode::KeyE))
}

fn weapon_slot_for_key(key: PhysicalKey) -> Option<usize> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let slot = match code {
        KeyCode::Digit1 => 0,
        KeyCode::Digit2 => 1,
        KeyCode::Digit3 => 2,
        KeyCode::Digit4 => 3,
        KeyCode::Digit5 => 4,
        KeyCode::Digit6 => 5,
        KeyCode::Digit7 => 6,
        KeyCode::Digit8 => 7,
        KeyCode::Digit9 => 8,
        _ => return None,
    };
    Some(slot)
}

/// Clamped wall-clock frame time expressed in game ticks.
fn frame_ticks(frame_dt: Duration, max_frame_delta: Duration, target_tps: u32) -> f32 {
    frame_dt.min(max_frame_delta).as_secs_f32() * target_tps as f32
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
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

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "slow_frame_env_invalid_using_config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "slow_frame_env_unreadable_using_config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
