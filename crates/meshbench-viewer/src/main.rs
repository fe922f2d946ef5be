//! Entry point for the meshbench viewer.

use anyhow::Result;
use meshbench::Flow;
use meshbench_viewer::{app::App, settings::Settings};
use std::sync::Arc;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

const BANNER: &str = "\
X--------------------------------------------------X
|                  meshbench v0.1                  |
|                                                  |
|  - 'Space' to enable/disable rotation of model   |
|  - left drag to rotate, wheel to move            |
|  - '+' / '-' to double / halve the triangles     |
|  - 'w' 'm' 'c' 't' 'p' 's' to toggle wireframe,  |
|    smooth, color, texture, back faces, strips    |
|  - F1..F4 to pick the submission strategy        |
|  - 'b' to start or abort a sweep                 |
|  - 'q' or Escape to quit                         |
X--------------------------------------------------X";

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    println!("{BANNER}");
    let settings = Settings::from_env()?;
    log::debug!("settings: {settings:?}");

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("meshbench")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                settings.window_width,
                settings.window_height,
            ))
            .build(&event_loop)?,
    );

    let mut app = pollster::block_on(App::new(window.clone(), &settings))?;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                if let WindowEvent::RedrawRequested = event {
                    app.render();
                } else if app.handle_event(&event) == Flow::Quit {
                    elwt.exit();
                }
            }
            Event::AboutToWait => {
                // Request a redraw each frame.
                window.request_redraw();
            }
            Event::LoopExiting => app.shutdown(),
            _ => {}
        }
    })?;

    Ok(())
}
