use std::cell::RefCell;
use std::error::Error;
use std::ffi::{c_int, c_void};
use std::fmt::Display;
use std::path::PathBuf;
use std::ptr;
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::sys::{SDL_Event, SDL_EventType, SDL_KeyCode};
use sdl2::video::{GLContext, GLProfile, SwapInterval, Window};
use sdl2::EventPump;

use gltf_scene_viewer::app::App;
use gltf_scene_viewer::config::{Config, DEFAULT_CONFIG_PATH};
use gltf_scene_viewer::fetch::FsSource;
use gltf_scene_viewer::renderer::gles::GlesRenderer;

#[cfg(target_family = "wasm")]
mod emscripten_h;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)?;

    let sdl_context = sdl2::init().map_err(SdlErr)?;
    let video_subsystem = sdl_context.video().map_err(SdlErr)?;
    let gl_attr = video_subsystem.gl_attr();
    gl_attr.set_context_profile(GLProfile::GLES);
    gl_attr.set_context_version(3, 0);
    gl_attr.set_depth_size(24);
    // Linear->SRGB conversion is done in shader, thanks to lacking WebGL support.
    gl_attr.set_framebuffer_srgb_compatible(false);
    let window = video_subsystem
        .window(&config.window_title, config.window_width, config.window_height)
        .resizable()
        .opengl()
        .build()?;
    let gl_context = window.gl_create_context().map_err(SdlErr)?;
    let swap_interval = if config.vsync {
        SwapInterval::VSync
    } else {
        SwapInterval::Immediate
    };
    if let Err(err) = video_subsystem.gl_set_swap_interval(swap_interval) {
        warn!("Could not set the swap interval: {err}");
    }
    let event_pump = sdl_context.event_pump().map_err(SdlErr)?;

    // Set up an event filter to avoid too eager preventDefault()s on
    // emscripten.
    extern "C" fn event_filter(_: *mut c_void, event: *mut SDL_Event) -> c_int {
        const DROPPED: c_int = 0;
        const ACCEPTED: c_int = 1;
        if let Some(event) = unsafe { event.as_ref() } {
            const KEYDOWN: u32 = SDL_EventType::SDL_KEYDOWN as u32;
            const KEYUP: u32 = SDL_EventType::SDL_KEYUP as u32;
            match unsafe { event.type_ } {
                KEYDOWN | KEYUP => {
                    let key_event = unsafe { event.key };
                    // Space pauses the rotation, everything else is left to
                    // the browser.
                    if key_event.keysym.sym == SDL_KeyCode::SDLK_SPACE as i32 {
                        ACCEPTED
                    } else {
                        DROPPED
                    }
                }
                _ => ACCEPTED,
            }
        } else {
            ACCEPTED
        }
    }
    unsafe { sdl2::sys::SDL_SetEventFilter(Some(event_filter), ptr::null_mut()) };

    let (width, height) = window.drawable_size();
    let mut renderer = GlesRenderer::new(
        |name| video_subsystem.gl_get_proc_address(name) as *const c_void,
        width as i32,
        height as i32,
    )?;
    info!("Reading assets from {}", config.asset_root.display());
    let source = Arc::new(FsSource::new(&config.asset_root));
    let app = App::new(&config, source, &mut renderer)?;

    STATE.with(|state| {
        *state.borrow_mut() = Some(State {
            app,
            renderer,
            window,
            event_pump,
            title: config.window_title.clone(),
            shown_frame_rate: 0.0,
            last_frame: Instant::now(),
            _gl_context: gl_context,
        })
    });

    #[cfg(target_family = "wasm")]
    emscripten_h::set_main_loop(run_frame);
    #[cfg(not(target_family = "wasm"))]
    loop {
        run_frame()
    }
}

thread_local! {
    static STATE: RefCell<Option<State>> = RefCell::new(None);
}

struct State {
    app: App,
    renderer: GlesRenderer,
    window: Window,
    event_pump: EventPump,
    title: String,
    shown_frame_rate: f32,
    last_frame: Instant,
    // Dropped last, the renderer's GL objects need the context.
    _gl_context: GLContext,
}

impl State {
    /// Handles input and draws one frame. Returns true when the window was
    /// closed.
    fn frame(&mut self) -> bool {
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => return true,
                Event::Window {
                    win_event: WindowEvent::SizeChanged(w, h),
                    ..
                } => self.renderer.resize(w, h),
                Event::MouseMotion {
                    mousestate,
                    xrel,
                    yrel,
                    ..
                } if mousestate.left() => self.app.orbit(xrel as f32, yrel as f32),
                Event::MouseWheel { y, .. } => self.app.zoom(y as f32),
                Event::KeyDown {
                    keycode: Some(Keycode::Space),
                    repeat: false,
                    ..
                } => self.app.toggle_pause(),
                _ => {}
            }
        }

        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        let (width, height) = self.window.drawable_size();
        self.app.frame(&mut self.renderer, dt, width, height);
        self.window.gl_swap_window();

        let frame_rate = self.app.frame_rate();
        if frame_rate != self.shown_frame_rate {
            self.shown_frame_rate = frame_rate;
            let title = format!("{} ({frame_rate:.0} fps)", self.title);
            if let Err(err) = self.window.set_title(&title) {
                warn!("Could not set the window title: {err}");
            }
        }
        false
    }

    fn shutdown(mut self) {
        self.app.shutdown(&mut self.renderer);
    }
}

extern "C" fn run_frame() {
    let quit = STATE.with(|state| state.borrow_mut().as_mut().map_or(false, State::frame));
    if quit {
        if let Some(state) = STATE.with(|state| state.borrow_mut().take()) {
            state.shutdown();
        }
        std::process::exit(0);
    }
}

#[derive(Debug)]
pub struct SdlErr(String);
impl Display for SdlErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sdl error: {}", self.0)
    }
}
impl Error for SdlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
