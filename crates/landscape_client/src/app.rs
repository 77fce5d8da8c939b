use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use landscape_core::events::{self, dispatch, EventReceiver};
use landscape_shared::landscape::Landscape;
use landscape_shared::settings::{load_or_default, SettingChange, DEFAULT_SETTINGS_PATH};
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::camera::OrbitCamera;
use crate::input::InputState;
use crate::renderer::Renderer;
use crate::ui::panel::SettingsPanel;

const WINDOW_TITLE: &str = "Landscape";
const WINDOW_WIDTH: f64 = 1280.0;
const WINDOW_HEIGHT: f64 = 720.0;
const PIXELS_PER_SCROLL_LINE: f32 = 40.0;
const MAX_FRAME_SECS: f32 = 0.1;
const USAGE: &str = "Usage: landscape_client [--settings <path>] [--seed <u64>]";

#[derive(Debug, Clone, PartialEq, Eq)]
struct ClientOptions {
    settings_path: PathBuf,
    seed: Option<u64>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            seed: None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ParsedArgs {
    Run(ClientOptions),
    Help,
}

fn parse_args<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = ClientOptions::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                let Some(value) = args.next() else {
                    return Err("--settings expects a path argument".to_string());
                };
                options.settings_path = PathBuf::from(value);
            }
            "--seed" => {
                let Some(value) = args.next() else {
                    return Err("--seed expects a numeric argument".to_string());
                };
                match value.parse::<u64>() {
                    Ok(parsed) => options.seed = Some(parsed),
                    Err(err) => return Err(format!("invalid seed '{value}': {err}")),
                }
            }
            "--help" | "-h" => return Ok(ParsedArgs::Help),
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(ParsedArgs::Run(options))
}

struct LandscapeApp {
    settings_path: PathBuf,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    landscape: Landscape,
    camera: OrbitCamera,
    input: InputState,
    panel: SettingsPanel,
    changes: EventReceiver<SettingChange>,
    last_frame: Option<Instant>,
}

impl LandscapeApp {
    fn new(options: ClientOptions) -> Self {
        let mut settings = load_or_default(&options.settings_path);
        if let Some(seed) = options.seed {
            settings.seed = seed;
        }

        let started = Instant::now();
        let landscape = Landscape::new(settings);
        info!(
            "Generated {} landscape in {:.1} ms",
            landscape.active_biome().name(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        let (sender, changes) = events::channel();
        let panel = SettingsPanel::new(sender, landscape.settings());
        Self {
            settings_path: options.settings_path,
            window: None,
            renderer: None,
            landscape,
            camera: OrbitCamera::default(),
            input: InputState::default(),
            panel,
            changes,
            last_frame: None,
        }
    }

    fn save_settings(&self) {
        match self.landscape.settings().save(&self.settings_path) {
            Ok(()) => info!("Saved settings to {}", self.settings_path.display()),
            Err(err) => warn!("{err}"),
        }
    }

    fn update_and_render(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = self
            .last_frame
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32())
            .min(MAX_FRAME_SECS);
        self.last_frame = Some(now);

        let applied = dispatch(&self.changes, &mut self.landscape);
        if applied > 0 {
            debug!("Applied {applied} setting changes");
            self.panel.sync(self.landscape.settings());
        }

        self.camera.update(&self.input);
        self.input.clear_frame();
        self.landscape.step(dt);

        let dirty = self.landscape.take_dirty();
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        renderer.sync(&self.landscape, dirty);
        renderer.update_camera(&self.camera);
        let lines = if self.panel.is_visible() {
            self.panel.lines()
        } else {
            Vec::new()
        };
        renderer.update_panel(&lines);

        match renderer.render_frame() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                let (width, height) = renderer.size();
                renderer.resize(width, height);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("Out of GPU memory; shutting down");
                self.save_settings();
                event_loop.exit();
            }
            Err(err @ (wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other)) => {
                warn!("Skipped frame: {err}");
            }
        }
    }
}

impl ApplicationHandler for LandscapeApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                match Renderer::new(window.clone(), &self.landscape) {
                    Ok(renderer) => {
                        let size = window.inner_size();
                        if size.width > 0 && size.height > 0 {
                            self.camera.aspect = size.width as f32 / size.height as f32;
                        }
                        renderer.update_camera(&self.camera);

                        info!("Window and renderer initialized");
                        self.window = Some(window);
                        self.renderer = Some(renderer);
                        self.last_frame = Some(Instant::now());
                    }
                    Err(err) => {
                        error!("failed to initialize renderer: {err}");
                        event_loop.exit();
                    }
                }
            }
            Err(err) => {
                error!("failed to create window: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window.as_ref().map(|window| window.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested; shutting down");
                self.save_settings();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    self.camera.aspect = size.width as f32 / size.height as f32;
                }
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(false) => {
                self.input.clear_all();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => {
                        let first_press = self.input.press_key(code);
                        self.panel
                            .handle_key_press(code, event.repeat || !first_press);
                    }
                    ElementState::Released => {
                        self.input.release_key(code);
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.input.press_button(button),
                ElementState::Released => self.input.release_button(button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.input.cursor_left();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_SCROLL_LINE,
                };
                self.input.add_scroll(lines);
            }
            WindowEvent::RedrawRequested => {
                self.update_and_render(event_loop);
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

pub fn run() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let options = match parse_args(env::args().skip(1)) {
        Ok(ParsedArgs::Run(options)) => options,
        Ok(ParsedArgs::Help) => {
            println!("{USAGE}");
            return;
        }
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };
    info!("Landscape starting with settings {}", options.settings_path.display());

    let event_loop = match EventLoop::new() {
        Ok(loop_handle) => loop_handle,
        Err(err) => {
            eprintln!("Failed to create event loop: {err}");
            return;
        }
    };

    let mut app = LandscapeApp::new(options);
    if let Err(err) = event_loop.run_app(&mut app) {
        eprintln!("Event loop exited with error: {err}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{parse_args, ClientOptions, ParsedArgs};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn no_arguments_use_default_settings_path() {
        assert_eq!(
            parse_args(args(&[])),
            Ok(ParsedArgs::Run(ClientOptions::default()))
        );
    }

    #[test]
    fn settings_and_seed_are_parsed() {
        let parsed = parse_args(args(&["--settings", "custom.toml", "--seed", "42"]));
        assert_eq!(
            parsed,
            Ok(ParsedArgs::Run(ClientOptions {
                settings_path: PathBuf::from("custom.toml"),
                seed: Some(42),
            }))
        );
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse_args(args(&["--seed"])).is_err());
        assert!(parse_args(args(&["--seed", "soon"])).is_err());
        assert!(parse_args(args(&["--fullscreen"])).is_err());
        assert_eq!(parse_args(args(&["-h"])), Ok(ParsedArgs::Help));
    }
}
