//! Renderer crate for shadelab, a live-coding shader sandbox.
//!
//! The module glues the preview window, `wgpu` rendering pipeline, and the
//! scrubbable playback clock together. The overall flow is:
//!
//! ```text
//!   CLI / shadelab
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ render_frame()
//!          ▲                │                   │
//!          │                └─ key batch ──▶ PlaybackClock::update()
//!          │                                    │ uTime / uTimeScale
//!          │                                    ▼
//!          └──────────────────────────────── GPU UBO
//! ```
//!
//! `WindowState` owns the GPU resources and the clock, while `Renderer` is
//! the thin entry point that builds the window and drives the event loop.
//! The shader pair on disk is compiled at startup and recompiled in place
//! whenever the user presses the reload key; a failed recompile keeps the
//! previous pipeline on screen.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

mod clock;
mod compile;
mod gpu;
mod uniforms;

pub use clock::{ClockCommand, PlaybackClock};

use gpu::GpuState;

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the CLI flags and tells the renderer which shader
/// pair to compile, how large the window should be, and which frame rate the
/// fixed clock delta is derived from.
#[derive(Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Base path of the shader pair (`<base>.vert` + `<base>.frag`).
    pub shader_base: PathBuf,
    /// Target frame rate; the playback clock advances by `1 / target_fps`
    /// seconds per rendered frame regardless of wall-clock jitter.
    pub target_fps: f32,
}

impl Default for RendererConfig {
    /// Provides a 720p window on the bundled shader pair at 60 fps.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            shader_base: PathBuf::from("shaders/first"),
            target_fps: 60.0,
        }
    }
}

/// High-level entry point that owns the chosen configuration.
///
/// The heavy lifting lives inside [`WindowState`]; `Renderer` builds the
/// window, seeds the state, and runs the event loop until the user quits.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    /// Builds a renderer for the supplied configuration.
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the sandbox window and drives the `winit` event loop.
    ///
    /// `winit` delivers events one by one; key-down events are collected into
    /// a per-frame batch for the clock, and a new frame is scheduled whenever
    /// the loop is about to go idle.
    pub fn run(&mut self) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to initialize event loop")?;
        let window_size = PhysicalSize::new(self.config.surface_size.0, self.config.surface_size.1);
        let window = WindowBuilder::new()
            .with_title("shadelab")
            .with_inner_size(window_size)
            .build(&event_loop)
            .context("failed to create sandbox window")?;
        let window = Arc::new(window);

        let mut state = WindowState::new(window.clone(), &self.config)?;
        state.window().request_redraw();

        event_loop
            .run(move |event, elwt| {
                // Drive redraws via vblank by waiting between events.
                elwt.set_control_flow(ControlFlow::Wait);

                match event {
                    Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                        match event {
                            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                                elwt.exit();
                            }
                            WindowEvent::KeyboardInput { event, .. } => {
                                if is_quit_key(&event) {
                                    elwt.exit();
                                } else {
                                    state.handle_key(&event);
                                }
                            }
                            WindowEvent::CursorMoved { position, .. } => {
                                state.mouse.handle_cursor_moved(position);
                            }
                            WindowEvent::MouseInput {
                                state: button_state,
                                button,
                                ..
                            } => {
                                if button == MouseButton::Left {
                                    state.mouse.handle_button(button_state);
                                }
                            }
                            WindowEvent::Resized(new_size) => {
                                tracing::info!(
                                    width = new_size.width,
                                    height = new_size.height,
                                    "window resized"
                                );
                                state.resize(new_size);
                            }
                            WindowEvent::ScaleFactorChanged {
                                mut inner_size_writer,
                                ..
                            } => {
                                // Keep the current logical size when the scale factor changes.
                                let _ = inner_size_writer.request_inner_size(state.size());
                            }
                            WindowEvent::RedrawRequested => {
                                match state.render_frame() {
                                    Ok(()) => {}
                                    Err(
                                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
                                    ) => {
                                        state.resize(state.size());
                                    }
                                    Err(wgpu::SurfaceError::OutOfMemory) => {
                                        tracing::error!("surface out of memory; exiting");
                                        elwt.exit();
                                    }
                                    Err(wgpu::SurfaceError::Timeout) => {
                                        tracing::warn!("surface timeout; retrying next frame");
                                    }
                                    Err(other) => {
                                        tracing::warn!(
                                            error = ?other,
                                            "surface error; retrying next frame"
                                        );
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                    Event::AboutToWait => {
                        // Schedule the next frame once winit is about to wait for events again.
                        state.window().request_redraw();
                    }
                    _ => {}
                }
            })
            .map_err(|err| anyhow!("event loop error: {err}"))
    }
}

/// The original sandbox quit on F4; Escape is accepted as well.
fn is_quit_key(event: &KeyEvent) -> bool {
    event.state == ElementState::Pressed
        && matches!(
            event.physical_key,
            PhysicalKey::Code(KeyCode::F4) | PhysicalKey::Code(KeyCode::Escape)
        )
}

/// Aggregates everything the event loop mutates each frame: the GPU
/// resources, the playback clock, mouse tracking, and the batch of clock
/// commands collected since the last redraw.
struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    clock: PlaybackClock,
    mouse: MouseState,
    /// Clock commands decoded from this frame's key-down events, in arrival order.
    pending_commands: Vec<ClockCommand>,
    shader_base: PathBuf,
}

impl WindowState {
    /// Creates a fully initialised rendering state for the sandbox window.
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.clone(), size, &config.shader_base)?;
        let frame_delta = 1.0 / f64::from(config.target_fps.max(1.0));

        Ok(Self {
            window,
            gpu,
            clock: PlaybackClock::new(frame_delta),
            mouse: MouseState::default(),
            pending_commands: Vec::new(),
            shader_base: config.shader_base.clone(),
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    /// Cached physical size of the swapchain surface.
    fn size(&self) -> PhysicalSize<u32> {
        self.gpu.size()
    }

    /// Reacts to platform resize events by updating the swapchain and uniforms.
    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    /// Routes a key-down event to the reload/info handlers or the clock batch.
    ///
    /// Key repeats are processed like fresh presses, so holding the speed-up
    /// key keeps accelerating playback.
    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };

        match code {
            KeyCode::KeyR => self.hot_reload(),
            KeyCode::F1 => self.gpu.log_adapter_info(),
            _ => {
                if let Some(command) = ClockCommand::from_key(code) {
                    self.pending_commands.push(command);
                }
            }
        }
    }

    /// Recompiles the shader pair from disk and restarts the clock.
    ///
    /// On failure the previous pipeline keeps rendering and the clock is left
    /// untouched, so a broken edit costs nothing but a log line.
    fn hot_reload(&mut self) {
        tracing::info!(shader = %self.shader_base.display(), "hot reloading shaders");
        match self.gpu.reload(&self.shader_base) {
            Ok(()) => {
                self.clock.set_time(0.0);
                self.clock.set_time_scale(1.0);
                tracing::info!("shader reloaded; clock restarted");
            }
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "shader reload failed; keeping previous pipeline");
            }
        }
    }

    /// Advances the clock with this frame's command batch, then records and
    /// submits the frame.
    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let hit_zero = self.clock.update(&self.pending_commands);
        self.pending_commands.clear();
        if hit_zero {
            tracing::info!("hit time 0");
        }

        let mouse = self.mouse.as_uniform(self.size().height.max(1) as f32);
        self.gpu
            .render_frame(self.clock.time(), self.clock.time_scale(), mouse)
    }
}

/// Tracks cursor motion and the last click so shaders receive a `uMouse`
/// value with a bottom-left origin, matching `uResolution` coordinates.
#[derive(Default)]
struct MouseState {
    position: Option<PhysicalPosition<f64>>,
    last_click: Option<PhysicalPosition<f64>>,
}

impl MouseState {
    /// Records the latest cursor position.
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.position = Some(position);
    }

    /// Notes the click position when the primary button goes down.
    fn handle_button(&mut self, state: ElementState) {
        if state == ElementState::Pressed {
            self.last_click = self.position;
        }
    }

    /// Produces the four floats backing `uMouse`: cursor in `xy`, last click
    /// in `zw`, both flipped to a bottom-left origin.
    fn as_uniform(&self, height: f32) -> [f32; 4] {
        let mut data = [0.0; 4];

        if let Some(pos) = self.position {
            data[0] = pos.x as f32;
            data[1] = height - pos.y as f32;
        }

        if let Some(click) = self.last_click {
            data[2] = click.x as f32;
            data[3] = height - click.y as f32;
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_uniform_flips_to_bottom_left_origin() {
        let mut mouse = MouseState::default();
        mouse.handle_cursor_moved(PhysicalPosition::new(100.0, 20.0));
        mouse.handle_button(ElementState::Pressed);
        mouse.handle_cursor_moved(PhysicalPosition::new(150.0, 700.0));

        let uniform = mouse.as_uniform(720.0);
        assert_eq!(uniform, [150.0, 20.0, 100.0, 700.0]);
    }

    #[test]
    fn mouse_uniform_is_zero_before_any_motion() {
        let mouse = MouseState::default();
        assert_eq!(mouse.as_uniform(720.0), [0.0; 4]);
    }
}
