//! A glTF 2.0 scene viewer: the scene is loaded asynchronously, translated
//! into a small fixed-capacity scene store and drawn with a single
//! metallic-roughness shader.

pub mod app;
pub mod camera;
pub mod config;
pub mod fetch;
pub mod renderer;
pub mod scene;
