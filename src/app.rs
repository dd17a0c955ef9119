//! The viewer itself: owns the fetcher, scene, camera and animation state,
//! and turns fetch events and input into a drawn frame.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Mat4, Vec3};
use log::{debug, info};

use crate::camera::{Camera, CameraDesc, ORBIT_DEGREES_PER_PIXEL, ZOOM_PER_NOTCH};
use crate::config::Config;
use crate::fetch::{FetchError, FetchEvent, FetchRequest, Fetcher, Source};
use crate::renderer::{Gfx, LightParams};
use crate::scene::document::{Document, DocumentError};
use crate::scene::{
    draw_scene, translate, FrameParams, LoadError, Placeholders, Scene, SceneStatus, SourceLoad,
};

pub const LIGHT: LightParams = LightParams {
    light_pos: Vec3::new(10.0, 10.0, 10.0),
    light_range: 200.0,
    light_color: Vec3::new(1.0, 1.5, 2.0),
    light_intensity: 700.0,
};

/// What a fetch request is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Asset {
    Document,
    Buffer(usize),
    Image(usize),
}

#[derive(Default)]
struct FrameRate {
    frames: u32,
    elapsed: f32,
    rate: f32,
}

impl FrameRate {
    /// Counts a frame, and returns the new rate once a second has passed.
    fn tick(&mut self, dt: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < 1.0 {
            return None;
        }
        self.rate = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        Some(self.rate)
    }
}

pub struct App {
    fetcher: Fetcher<Asset>,
    scene: Scene,
    placeholders: Placeholders,
    camera: Camera,
    /// Directory of the glTF document, which its uris are relative to.
    base_dir: PathBuf,
    num_channels: usize,
    rotation_speed: f32,
    rotation: f32,
    paused: bool,
    document_translated: bool,
    /// Buffer and image requests that have not finished yet.
    outstanding: usize,
    frame_rate: FrameRate,
}

impl App {
    /// Creates the GPU placeholders and starts loading the configured scene.
    pub fn new(config: &Config, source: Arc<dyn Source>, gfx: &mut dyn Gfx) -> io::Result<App> {
        let fetcher = Fetcher::new(config.fetch, source)?;
        let mut app = App {
            fetcher,
            scene: Scene::new(config.limits),
            placeholders: Placeholders::new(gfx),
            camera: Camera::new(CameraDesc::default()),
            base_dir: config
                .scene_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            num_channels: config.fetch.num_channels,
            rotation_speed: config.rotation_speed,
            rotation: 0.0,
            paused: false,
            document_translated: false,
            outstanding: 0,
            frame_rate: FrameRate::default(),
        };
        info!("Loading {}", config.scene_path.display());
        app.request(config.scene_path.clone(), Asset::Document);
        Ok(app)
    }

    pub fn status(&self) -> SceneStatus {
        self.scene.status()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Frames per second, averaged over the last full second.
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate.rate
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Orbits the camera by a mouse drag of the given pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.camera
            .orbit(dx * ORBIT_DEGREES_PER_PIXEL, dy * ORBIT_DEGREES_PER_PIXEL);
    }

    /// Zooms the camera by mouse wheel notches.
    pub fn zoom(&mut self, notches: f32) {
        self.camera.zoom(notches * ZOOM_PER_NOTCH);
    }

    /// Processes finished loads, advances the animation and draws the scene.
    /// Returns the number of draw calls.
    pub fn frame(&mut self, gfx: &mut dyn Gfx, dt: f32, width: u32, height: u32) -> usize {
        self.pump(gfx);

        if self.scene.status() == SceneStatus::Loading
            && self.document_translated
            && self.outstanding == 0
        {
            self.scene.mark_ready();
            info!("Scene loaded");
        }

        if !self.paused {
            self.rotation += self.rotation_speed * dt;
        }
        self.camera.update(width, height);
        let frame = FrameParams {
            root_transform: Mat4::from_rotation_y(self.rotation),
            view_proj: self.camera.view_proj,
            eye_pos: self.camera.eye_pos,
            light: LIGHT,
            placeholders: &self.placeholders,
        };
        let draws = draw_scene(&self.scene, gfx, &frame);
        gfx.commit();

        if let Some(rate) = self.frame_rate.tick(dt) {
            debug!("{rate:.1} fps, {draws} draws");
        }
        draws
    }

    /// Releases every GPU object the viewer created.
    pub fn shutdown(mut self, gfx: &mut dyn Gfx) {
        self.scene.destroy(gfx);
        self.placeholders.destroy(gfx);
    }

    fn request(&mut self, path: PathBuf, asset: Asset) {
        // Images get their own channel when there is more than one, so a big
        // texture doesn't hold up the geometry.
        let channel = match asset {
            Asset::Image(_) => self.num_channels.saturating_sub(1),
            Asset::Document | Asset::Buffer(_) => 0,
        };
        let request = FetchRequest {
            path: path.clone(),
            channel,
            user_data: asset,
        };
        match self.fetcher.send(request) {
            Ok(_) => {
                if asset != Asset::Document {
                    self.outstanding += 1;
                }
            }
            Err(err) => self.scene.fail(&fetch_error(&path, err)),
        }
    }

    fn pump(&mut self, gfx: &mut dyn Gfx) {
        let scene = &mut self.scene;
        let outstanding = &mut self.outstanding;
        let document_translated = &mut self.document_translated;
        let mut loads = Vec::new();
        self.fetcher.pump(|response| {
            if let FetchEvent::Finished(_) = response.event {
                if *response.user_data != Asset::Document {
                    *outstanding -= 1;
                }
            }
            // Anything arriving after the scene is done loading is dropped.
            if scene.status() != SceneStatus::Loading {
                return;
            }
            match response.event {
                FetchEvent::Dispatched => {}
                FetchEvent::Fetched(bytes) => {
                    let result = match *response.user_data {
                        Asset::Document => load_document(bytes, scene, gfx).map(|sources| {
                            *document_translated = true;
                            loads.extend(sources);
                        }),
                        Asset::Buffer(index) => scene.init_buffers_from_source(gfx, index, bytes),
                        Asset::Image(index) => scene.init_images_from_source(gfx, index, bytes),
                    };
                    if let Err(err) = result {
                        scene.fail(&err);
                    }
                }
                FetchEvent::Finished(Ok(())) => {}
                FetchEvent::Finished(Err(err)) => scene.fail(&fetch_error(response.path, err)),
            }
        });

        for load in loads {
            let path = self.base_dir.join(load.uri());
            let asset = match load {
                SourceLoad::Buffer { index, .. } => Asset::Buffer(index),
                SourceLoad::Image { index, .. } => Asset::Image(index),
            };
            self.request(path, asset);
        }
    }
}

fn fetch_error(path: &Path, source: FetchError) -> LoadError {
    LoadError::Fetch {
        path: path.display().to_string(),
        source,
    }
}

fn load_document(
    bytes: &[u8],
    scene: &mut Scene,
    gfx: &mut dyn Gfx,
) -> Result<Vec<SourceLoad>, LoadError> {
    let json = std::str::from_utf8(bytes).map_err(|err| DocumentError::Json(err.to_string()))?;
    let doc = Document::parse(json)?;
    info!(
        "Parsed glTF document: {} meshes, {} nodes, {} materials, {} textures",
        doc.meshes.len(),
        doc.nodes.len(),
        doc.materials.len(),
        doc.textures.len(),
    );
    translate(&doc, scene, gfx)
}
