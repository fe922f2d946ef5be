use crate::{
    input::InputMapper,
    renderer::{GraphicsOptions, WgpuGraphics},
    settings::Settings,
};
use anyhow::Result;
use meshbench::{BenchEvent, FileReport, Flow, Renderer, Scheduler, ViewState};
use std::sync::Arc;
use winit::{event::WindowEvent, window::Window};

pub struct App {
    pub scheduler: Scheduler<WgpuGraphics>,
    input: InputMapper,
}

impl App {
    pub async fn new(window: Arc<Window>, settings: &Settings) -> Result<Self> {
        let gfx = WgpuGraphics::new(
            window.clone(),
            GraphicsOptions {
                disable_buffer_objects: settings.disable_buffer_objects,
            },
        )
        .await?;
        let renderer = Renderer::new(gfx, settings.rendering_config())?;

        let size = window.inner_size();
        let view = ViewState::new(size.width, size.height);
        let report = FileReport::new(settings.report_path.clone());

        let mut scheduler = Scheduler::new(renderer, view, Box::new(report))
            .with_sample_capacity(settings.samples);
        scheduler.announce();

        Ok(Self {
            scheduler,
            input: InputMapper::new(),
        })
    }

    /// Feeds a window event to the benchmark; returns whether to keep running.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Flow {
        let Some(bench_event) = self.input.handle_event(event) else {
            return Flow::Continue;
        };
        if let BenchEvent::Resize { width, height } = bench_event {
            self.resize(winit::dpi::PhysicalSize::new(width, height));
        }
        self.scheduler.handle_event(bench_event)
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.scheduler.renderer_mut().gfx_mut().resize(new_size);
    }

    /// Renders one timed frame.
    pub fn render(&mut self) {
        self.scheduler.frame();
    }

    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
    }
}
