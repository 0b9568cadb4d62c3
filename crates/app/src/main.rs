//! meshview - textured model viewer entry point.
//!
//! Owns the winit event loop and the top-level wiring: window callbacks
//! queue surface events, and each redraw drains the queue before handing
//! control to the renderer. Swapchain rebuilds therefore always start from
//! the render loop, never from inside a windowing callback.

use std::path::Path;

use anyhow::Result;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use meshview_core::AppConfig;
use meshview_platform::{EventQueue, SurfaceEvent, Window};
use meshview_renderer::Renderer;

struct App {
    config: AppConfig,
    window: Option<Window>,
    renderer: Option<Renderer>,
    events: EventQueue,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
            events: EventQueue::new(),
        }
    }

    /// Applies every event queued since the last drain. Returns true if a
    /// close was requested.
    fn apply_queued_events(&mut self) -> bool {
        let mut close_requested = false;

        for event in self.events.drain() {
            match event {
                SurfaceEvent::Resized { width, height } => {
                    if let Some(renderer) = self.renderer.as_mut() {
                        renderer.resize(width, height);
                    }
                }
                SurfaceEvent::CloseRequested => close_requested = true,
            }
        }

        close_requested
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(
            event_loop,
            self.config.window.width,
            self.config.window.height,
            &self.config.window.title,
        ) {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Renderer::new(&window, &self.config) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                error!("Failed to create renderer: {:?}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.events.push(SurfaceEvent::CloseRequested);
            }
            WindowEvent::Resized(size) => {
                self.events.push(SurfaceEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    self.events.push(SurfaceEvent::CloseRequested);
                }
            }
            WindowEvent::RedrawRequested => {
                if self.apply_queued_events() {
                    info!("Close requested, shutting down");
                    event_loop.exit();
                    return;
                }

                if let Some(renderer) = self.renderer.as_mut()
                    && let Err(e) = renderer.draw_frame()
                {
                    error!("Render error: {:?}", e);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    meshview_core::init_logging();
    info!("Starting meshview");

    let config = AppConfig::load_or_default(Path::new("meshview.toml"))?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
