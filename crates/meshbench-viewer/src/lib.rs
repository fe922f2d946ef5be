//! Windowed front end for the meshbench rendering benchmark.
//!
//! Opens a winit window, drives the [`meshbench::Scheduler`] once per redraw
//! and renders through a wgpu implementation of [`meshbench::Graphics`].

pub mod app;
pub mod camera;
pub mod input;
pub mod renderer;
pub mod settings;
