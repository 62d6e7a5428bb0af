use std::sync::Arc;

use bounce_core::{Camera, ConfigError, Settings};
use bounce_input::{InputState, MovementBindings};
use bounce_renderer::{FrameInput, RenderContext, RsmRenderer, SceneDesc};
use bounce_window::{AppHandler, FrameControl, WindowConfig, WindowError, run_app};
use glam::Vec3;
use thiserror::Error;
use winit::{dpi::PhysicalSize, event::WindowEvent, window::Window};

const CAMERA_START: Vec3 = Vec3::new(-4.0, 3.0, 4.0);
/// Scales raw cursor deltas before the camera's own sensitivity.
const MOUSE_SCALE: f32 = 0.05;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Camera and input, independent of the GPU.
struct AppState {
    camera: Camera,
    input: InputState,
    bindings: MovementBindings,
    close_requested: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            camera: Camera::new(CAMERA_START),
            input: InputState::default(),
            bindings: MovementBindings::default(),
            close_requested: false,
        }
    }
}

/// Applies this frame's accumulated input to the camera.
fn process_input(state: &mut AppState, dt: f32) {
    if state.bindings.close_requested(&state.input) {
        state.close_requested = true;
    }

    let movement = state.bindings.movement(&state.input);
    if !movement.is_empty() {
        state.camera.process_keyboard(movement, dt);
    }

    let (dx, dy) = state.input.mouse_delta;
    if dx != 0.0 || dy != 0.0 {
        state
            .camera
            .process_mouse_movement(dx * MOUSE_SCALE, dy * MOUSE_SCALE, true);
    }

    if state.input.scroll_delta != 0.0 {
        state.camera.process_mouse_scroll(state.input.scroll_delta);
    }

    state.input.end_frame();
}

struct RsmApp {
    settings: Settings,
    state: AppState,
    context: Option<RenderContext>,
    renderer: Option<RsmRenderer>,
}

impl RsmApp {
    fn new(settings: Settings) -> Self {
        Self {
            settings,
            state: AppState::default(),
            context: None,
            renderer: None,
        }
    }
}

impl AppHandler for RsmApp {
    fn startup(&mut self, window: Arc<Window>) -> Result<(), Box<dyn std::error::Error>> {
        let context = RenderContext::new(window)?;
        let renderer = RsmRenderer::new(
            &context.program_context(),
            context.gpu.clamp_to_border,
            &self.settings,
            &SceneDesc::room(),
        )?;

        self.context = Some(context);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn window_event(&mut self, event: &WindowEvent) {
        self.state.input.handle_window_event(event);
    }

    fn mouse_motion(&mut self, (dx, dy): (f64, f64)) {
        self.state.input.mouse_motion(dx, dy);
    }

    fn resized(&mut self, size: PhysicalSize<u32>) {
        if let Some(context) = &mut self.context {
            context.resize(size.width, size.height);
        }
    }

    fn frame(&mut self, dt: f32) -> FrameControl {
        process_input(&mut self.state, dt);
        if self.state.close_requested {
            log::info!("Escape pressed, closing");
            return FrameControl::Exit;
        }

        let (Some(context), Some(renderer)) = (&mut self.context, &mut self.renderer) else {
            return FrameControl::Continue;
        };

        let camera = &self.state.camera;
        let frame = FrameInput {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(context.aspect()),
            view_pos: camera.position,
        };

        match renderer.render(context, &frame) {
            Ok(()) => FrameControl::Continue,
            Err(err) => {
                log::error!("Render failed: {err}");
                FrameControl::Exit
            }
        }
    }
}

fn run() -> Result<(), AppError> {
    let settings = Settings::load()?;
    log::info!(
        "Capture {0}x{0}, {1} samples, radius {2}",
        settings.capture_resolution,
        settings.sample_num,
        settings.sample_radius
    );

    let config = WindowConfig {
        title: "Reflective Shadow Maps".to_string(),
        width: settings.window_width,
        height: settings.window_height,
        ..WindowConfig::default()
    };

    run_app(RsmApp::new(settings), config)?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
