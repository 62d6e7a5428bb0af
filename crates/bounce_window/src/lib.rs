use std::sync::Arc;

use bounce_core::Time;
use thiserror::Error;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    error::{EventLoopError, OsError},
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{CursorGrabMode, Window, WindowId},
};

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("failed to create window: {0}")]
    CreateWindow(#[from] OsError),
    #[error("startup failed: {0}")]
    Startup(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Exit,
}

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Hide the cursor and keep it inside the window.
    pub capture_cursor: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Bounce".to_string(),
            width: 800,
            height: 600,
            capture_cursor: true,
        }
    }
}

/// What the runner drives once the OS hands us a window.
pub trait AppHandler {
    fn startup(&mut self, window: Arc<Window>) -> Result<(), Box<dyn std::error::Error>>;

    /// Every window event, before the runner's own handling.
    fn window_event(&mut self, event: &WindowEvent);

    fn resized(&mut self, size: PhysicalSize<u32>);

    /// Raw pointer motion, delivered even when the cursor is pinned.
    fn mouse_motion(&mut self, _delta: (f64, f64)) {}

    /// One iteration of the render loop. `dt` is the previous frame's duration.
    fn frame(&mut self, dt: f32) -> FrameControl;
}

// Holds the handler while waiting for the OS to resume us
struct BounceRunner<H: AppHandler> {
    handler: H,
    config: WindowConfig,
    window: Option<Arc<Window>>,
    time: Time,
    error: Option<WindowError>,
}

impl<H: AppHandler> BounceRunner<H> {
    fn new(handler: H, config: WindowConfig) -> Self {
        Self {
            handler,
            config,
            window: None,
            time: Time::default(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: WindowError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }
}

fn capture_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Confined)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
    if let Err(err) = grabbed {
        log::warn!("Could not capture the cursor: {err}");
    }
    window.set_cursor_visible(false);
}

impl<H: AppHandler> ApplicationHandler for BounceRunner<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err.into()),
        };

        if self.config.capture_cursor {
            capture_cursor(&window);
        }

        if let Err(err) = self.handler.startup(window.clone()) {
            return self.fail(event_loop, WindowError::Startup(err.to_string()));
        }

        log::info!(
            "Window ready ({}x{})",
            window.inner_size().width,
            window.inner_size().height
        );
        self.time.reset();
        window.request_redraw();
        self.window = Some(window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if self.window.is_some()
            && let DeviceEvent::MouseMotion { delta } = event
        {
            self.handler.mouse_motion(delta);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.window.is_none() {
            return;
        }

        self.handler.window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, stopping");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.handler.resized(size);
            }
            WindowEvent::RedrawRequested => {
                // 1. Tick the clock
                self.time.update();

                // 2. Run the frame
                if self.handler.frame(self.time.delta_seconds()) == FrameControl::Exit {
                    event_loop.exit();
                    return;
                }

                // 3. Request the next one
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => (),
        }
    }
}

/// Opens the window and runs `handler` until the window closes or the handler
/// asks to exit.
pub fn run_app<H: AppHandler>(handler: H, config: WindowConfig) -> Result<(), WindowError> {
    let event_loop = EventLoop::new()?;

    // Render continuously, even when the OS has no events for us.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = BounceRunner::new(handler, config);
    event_loop.run_app(&mut runner)?;

    match runner.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
