//! Orrery application: window and event-loop glue around the renderer.
//!
//! Everything interesting lives in `orrery-renderer`; this binary only opens
//! a window, forwards resize events and asks for one frame after another.

use orrery_renderer::{Renderer, RendererConfig};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

struct App {
    config: RendererConfig,
    window: Option<Window>,
    renderer: Option<Renderer>,
}

impl App {
    fn new(config: RendererConfig) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
        }
    }

    /// Create the renderer once the window has a usable size.
    ///
    /// Surface creation against a zero-sized window fails on several
    /// platforms, so initialization waits for the first real size.
    fn init_renderer(&mut self) {
        if self.renderer.is_some() {
            return;
        }
        let window = match self.window {
            Some(ref window) => window,
            None => return,
        };
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }

        match Renderer::new(window, &self.config) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                log::error!("renderer initialization failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title(self.config.app_name.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));
        match event_loop.create_window(attrs) {
            Ok(window) => {
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("failed to create window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                // Renderer teardown waits for the GPU before the window dies.
                self.renderer = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ref mut renderer) = self.renderer {
                    renderer.resize(size.width, size.height);
                } else {
                    self.init_renderer();
                }
                if let Some(ref window) = self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                self.init_renderer();
                if let Some(ref mut renderer) = self.renderer {
                    if let Err(e) = renderer.draw_frame() {
                        log::error!("draw failed: {}", e);
                        self.renderer = None;
                        event_loop.exit();
                        return;
                    }
                }
                // Continuous rendering: immediately queue the next frame.
                if let Some(ref window) = self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RendererConfig::from_env();
    log::info!("starting {}", config.app_name);

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {}", e);
        std::process::exit(1);
    }
}
