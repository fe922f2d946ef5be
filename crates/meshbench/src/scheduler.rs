//! Benchmark state machine.
//!
//! The scheduler owns the renderer, the camera and the sample window. The
//! host loop feeds it input events and calls [`Scheduler::frame`] once per
//! redraw:
//!
//! ```text
//! Interactive --Sweep--> SweepEntering --> SweepRunning --(queue empty | Sweep)--> SweepExiting --> Interactive
//! ```
//!
//! Transitions requested by an event are applied at the start of the next
//! frame, so rendering always sees a fully provisioned configuration.

use crate::config::{
    OptionFlag, RenderingConfig, RenderingOptions, SubmissionStrategy, MIN_TRIANGLES,
};
use crate::gfx::{Capabilities, Graphics};
use crate::renderer::Renderer;
use crate::report::ReportTarget;
use crate::sampling::{elapsed_ms, SampleWindow};
use crate::view::ViewState;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Instant;

/// Samples per configuration before a sweep entry is reported.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 30;

/// Strategies covered by a sweep, in order.
const SWEPT_STRATEGIES: [SubmissionStrategy; 3] = [
    SubmissionStrategy::Immediate,
    SubmissionStrategy::CommandList,
    SubmissionStrategy::StaticBuffer,
];

const SWEEP_BANNER: &str = "X--------------------------------------------------X";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchState {
    Interactive,
    SweepEntering,
    SweepRunning,
    SweepExiting,
}

impl BenchState {
    pub fn is_sweeping(self) -> bool {
        !matches!(self, BenchState::Interactive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Double,
    Halve,
}

impl Scale {
    /// New triangle target. Halving stops at [`MIN_TRIANGLES`]; doubling saturates.
    pub fn apply(self, triangles: u32) -> u32 {
        match self {
            Scale::Double => triangles.saturating_mul(2),
            Scale::Halve if triangles > MIN_TRIANGLES => (triangles / 2).max(MIN_TRIANGLES),
            Scale::Halve => triangles,
        }
    }
}

/// Input decoded by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BenchEvent {
    ToggleOption(OptionFlag),
    SelectStrategy(SubmissionStrategy),
    ScaleTriangles(Scale),
    ToggleRotation,
    /// Mouse drag in pixels.
    Rotate { dx: f64, dy: f64 },
    MoveForward(f64),
    Resize { width: u32, height: u32 },
    Sweep,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Every configuration a sweep measures: swept strategies × every option
/// set except the one with all six flags, strategy-major. Strategies the
/// device cannot run are left out.
pub fn sweep_queue(triangles: u32, capabilities: &Capabilities) -> VecDeque<RenderingConfig> {
    let all_flags = RenderingOptions::COMBINATIONS - 1;
    SWEPT_STRATEGIES
        .into_iter()
        .filter(|strategy| capabilities.buffer_objects || !strategy.uses_buffer_objects())
        .flat_map(|strategy| {
            (0..all_flags).map(move |mask| RenderingConfig {
                strategy,
                triangles,
                options: RenderingOptions::from_mask(mask),
            })
        })
        .collect()
}

pub struct Scheduler<G: Graphics> {
    renderer: Renderer<G>,
    state: BenchState,
    /// Interactive configuration, restored after a sweep.
    base: RenderingConfig,
    queue: VecDeque<RenderingConfig>,
    queue_total: usize,
    window: SampleWindow,
    view: ViewState,
    warm_up: bool,
    report_target: Box<dyn ReportTarget>,
    report: Option<Box<dyn Write>>,
    console: Box<dyn Write>,
}

impl<G: Graphics> Scheduler<G> {
    pub fn new(renderer: Renderer<G>, view: ViewState, report_target: Box<dyn ReportTarget>) -> Self {
        let base = *renderer.config();
        Self {
            renderer,
            state: BenchState::Interactive,
            base,
            queue: VecDeque::new(),
            queue_total: 0,
            window: SampleWindow::new(DEFAULT_SAMPLE_CAPACITY),
            view,
            warm_up: true,
            report_target,
            report: None,
            console: Box::new(io::stdout()),
        }
    }

    pub fn with_sample_capacity(mut self, capacity: usize) -> Self {
        self.window = SampleWindow::new(capacity);
        self
    }

    /// Redirects live throughput lines and configuration descriptions.
    pub fn with_console(mut self, console: Box<dyn Write>) -> Self {
        self.console = console;
        self
    }

    /// Prints the description of the interactive configuration.
    pub fn announce(&mut self) {
        let description = format!("\n{}", self.base);
        self.say(&description);
    }

    pub fn handle_event(&mut self, event: BenchEvent) -> Flow {
        match event {
            BenchEvent::Quit => return Flow::Quit,
            BenchEvent::Sweep => self.request_sweep(),
            BenchEvent::ToggleRotation => self.view.rotating = !self.view.rotating,
            BenchEvent::Rotate { dx, dy } => self.view.drag(dx, dy),
            BenchEvent::MoveForward(delta) => self.view.move_forward(delta),
            BenchEvent::Resize { width, height } => {
                self.view.width = width;
                self.view.height = height;
            }
            BenchEvent::ToggleOption(flag) => {
                let mut next = self.base;
                next.options.toggle(flag);
                self.edit_config(next);
            }
            BenchEvent::SelectStrategy(strategy) => {
                self.edit_config(RenderingConfig {
                    strategy,
                    ..self.base
                });
            }
            BenchEvent::ScaleTriangles(scale) => {
                self.edit_config(RenderingConfig {
                    triangles: scale.apply(self.base.triangles),
                    ..self.base
                });
            }
        }
        Flow::Continue
    }

    fn request_sweep(&mut self) {
        match self.state {
            BenchState::Interactive => {
                log::info!("sweep requested");
                self.state = BenchState::SweepEntering;
            }
            BenchState::SweepEntering | BenchState::SweepRunning => {
                log::info!("sweep aborted");
                self.state = BenchState::SweepExiting;
            }
            BenchState::SweepExiting => {}
        }
    }

    fn edit_config(&mut self, next: RenderingConfig) {
        if self.state.is_sweeping() {
            log::debug!("ignoring configuration change during a sweep");
            return;
        }
        if next == self.base {
            return;
        }
        self.base = next;
        self.provision(next);
        self.announce();
    }

    /// Rebuilds for `config`, clears the samples and discards the next frame.
    fn provision(&mut self, config: RenderingConfig) {
        if let Err(err) = self.renderer.rebuild(config) {
            log::warn!("cannot provision configuration: {err}");
        }
        self.window.clear();
        self.warm_up = true;
    }

    /// Applies pending state transitions.
    pub fn evaluate_transitions(&mut self) {
        if self.state == BenchState::SweepEntering {
            self.enter_sweep();
        }
        if self.state == BenchState::SweepRunning && self.window.is_full() {
            self.complete_entry();
        }
        if self.state == BenchState::SweepExiting {
            self.exit_sweep();
        }
    }

    fn enter_sweep(&mut self) {
        let report = match self.report_target.open() {
            Ok(report) => report,
            Err(err) => {
                log::error!(
                    "cannot open sweep report {}: {err}",
                    self.report_target.describe()
                );
                self.state = BenchState::Interactive;
                return;
            }
        };
        self.report = Some(report);

        self.queue = sweep_queue(self.base.triangles, &self.renderer.capabilities());
        self.queue_total = self.queue.len();
        self.view.rotating = false;
        self.view.reset_rotation();

        self.say(&format!("\n{SWEEP_BANNER}\n| Bench started\n"));
        log::info!(
            "sweep started: {} configurations, writing to {}",
            self.queue_total,
            self.report_target.describe()
        );

        match self.queue.front().copied() {
            Some(first) => {
                self.provision(first);
                self.state = BenchState::SweepRunning;
            }
            None => self.state = BenchState::SweepExiting,
        }
    }

    fn complete_entry(&mut self) {
        let Some(entry) = self.queue.pop_front() else {
            self.state = BenchState::SweepExiting;
            return;
        };

        if let (Some(report), Some(throughput)) =
            (self.report.as_mut(), self.window.throughput(entry.triangles))
        {
            if let Err(err) = writeln!(report, "{entry}{throughput}") {
                log::warn!("cannot write sweep report: {err}");
            }
        }
        self.window.clear();

        let done = self.queue_total - self.queue.len();
        let percent = 100 * done / self.queue_total.max(1);
        self.say(&format!("\r| Bench completion : {percent} %"));
        log::debug!("sweep progress {percent}% ({done}/{})", self.queue_total);

        match self.queue.front().copied() {
            Some(next) => self.provision(next),
            None => self.state = BenchState::SweepExiting,
        }
    }

    fn exit_sweep(&mut self) {
        if let Some(mut report) = self.report.take() {
            if let Err(err) = report.flush() {
                log::warn!("cannot flush sweep report: {err}");
            }
        }
        let remaining = self.queue.len();
        self.queue.clear();
        self.view.rotating = true;

        self.say("\n| Bench exit\n");
        if remaining == 0 {
            log::info!("sweep finished");
        } else {
            log::info!("sweep stopped with {remaining} configurations left");
        }

        self.provision(self.base);
        self.announce();
        self.state = BenchState::Interactive;
    }

    /// Runs one frame: transitions, one timed draw, error poll, rotation.
    ///
    /// Returns the frame time in milliseconds, or `None` for a discarded
    /// warm-up frame.
    pub fn frame(&mut self) -> Option<u64> {
        self.evaluate_transitions();

        let start = Instant::now();
        self.renderer.render_frame(&self.view);
        let sample = elapsed_ms(start.elapsed());

        while let Some(warning) = self.renderer.poll_error() {
            log::warn!("graphics error: {warning}");
        }

        if self.warm_up {
            self.warm_up = false;
            return None;
        }

        self.window.push(sample);
        if self.state == BenchState::Interactive {
            if let Some(throughput) = self.window.throughput(self.renderer.config().triangles) {
                self.say(&format!("\r{throughput}      "));
            }
        }
        if self.view.rotating {
            self.view.advance_rotation(sample);
        }
        Some(sample)
    }

    /// Closes any open report and releases all GPU objects.
    pub fn shutdown(&mut self) {
        if let Some(mut report) = self.report.take() {
            if let Err(err) = report.flush() {
                log::warn!("cannot flush sweep report: {err}");
            }
        }
        self.say("\n");
        self.renderer.shutdown();
    }

    fn say(&mut self, text: &str) {
        let written = self
            .console
            .write_all(text.as_bytes())
            .and_then(|()| self.console.flush());
        if let Err(err) = written {
            log::debug!("console write failed: {err}");
        }
    }

    pub fn state(&self) -> BenchState {
        self.state
    }

    /// Interactive configuration.
    pub fn base_config(&self) -> &RenderingConfig {
        &self.base
    }

    pub fn queue(&self) -> &VecDeque<RenderingConfig> {
        &self.queue
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn is_warming_up(&self) -> bool {
        self.warm_up
    }

    pub fn renderer(&self) -> &Renderer<G> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<G> {
        &mut self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TRIANGLES;
    use crate::gfx::RecordingGraphics;
    use crate::report::{FileReport, MemoryReport};
    use crate::view::{DEFAULT_ROTATION_X, DEFAULT_ROTATION_Y};

    fn scheduler(triangles: u32) -> (Scheduler<RecordingGraphics>, MemoryReport, MemoryReport) {
        let config = RenderingConfig {
            triangles,
            ..RenderingConfig::default()
        };
        let renderer = Renderer::new(RecordingGraphics::new(), config).unwrap();
        let report = MemoryReport::new();
        let console = MemoryReport::new();
        let scheduler = Scheduler::new(renderer, ViewState::default(), Box::new(report.clone()))
            .with_console(console.writer());
        (scheduler, report, console)
    }

    #[test]
    fn test_sweep_queue_order_and_size() {
        let queue = sweep_queue(10_000, &Capabilities::default());
        assert_eq!(queue.len(), 189);
        assert_eq!(queue[0].strategy, SubmissionStrategy::Immediate);
        assert_eq!(queue[0].options.mask(), 0);
        assert_eq!(queue[62].options.mask(), 62);
        assert_eq!(queue[63].strategy, SubmissionStrategy::CommandList);
        assert_eq!(queue[188].strategy, SubmissionStrategy::StaticBuffer);
        assert!(queue.iter().all(|c| c.options.mask() != 63 && c.triangles == 10_000));

        let without = Capabilities {
            buffer_objects: false,
            wireframe: true,
        };
        let queue = sweep_queue(10_000, &without);
        assert_eq!(queue.len(), 126);
        assert!(queue.iter().all(|c| !c.strategy.uses_buffer_objects()));
    }

    #[test]
    fn test_scale_limits() {
        assert_eq!(Scale::Double.apply(DEFAULT_TRIANGLES), 640_000);
        assert_eq!(Scale::Double.apply(u32::MAX), u32::MAX);
        assert_eq!(Scale::Halve.apply(10_000), 5_000);
        assert_eq!(Scale::Halve.apply(4_000), 2_500);
        assert_eq!(Scale::Halve.apply(2_500), 2_500);
    }

    #[test]
    fn test_entering_sweep() {
        let (mut scheduler, _, _) = scheduler(10_000);
        scheduler.handle_event(BenchEvent::Rotate { dx: 5.0, dy: 5.0 });
        for _ in 0..5 {
            scheduler.frame();
        }
        assert!(!scheduler.window().is_empty());

        assert_eq!(scheduler.handle_event(BenchEvent::Sweep), Flow::Continue);
        assert_eq!(scheduler.state(), BenchState::SweepEntering);
        scheduler.evaluate_transitions();

        assert_eq!(scheduler.state(), BenchState::SweepRunning);
        assert_eq!(scheduler.queue().len(), 189);
        assert!(!scheduler.view().rotating);
        assert_eq!(scheduler.view().rotation_x, DEFAULT_ROTATION_X);
        assert_eq!(scheduler.view().rotation_y, DEFAULT_ROTATION_Y);
        assert!(scheduler.window().is_empty());
        assert_eq!(
            scheduler.renderer().active_config(),
            &scheduler.queue()[0]
        );
    }

    #[test]
    fn test_edits_ignored_during_sweep() {
        let (mut scheduler, _, _) = scheduler(10_000);
        scheduler.handle_event(BenchEvent::Sweep);
        scheduler.evaluate_transitions();
        let provisioned = *scheduler.renderer().config();

        scheduler.handle_event(BenchEvent::ToggleOption(OptionFlag::Wireframe));
        scheduler.handle_event(BenchEvent::ScaleTriangles(Scale::Double));
        assert_eq!(scheduler.base_config().triangles, 10_000);
        assert!(!scheduler.base_config().options.wireframe);
        assert_eq!(*scheduler.renderer().config(), provisioned);
    }

    #[test]
    fn test_interactive_edit_rebuilds() {
        let (mut scheduler, _, console) = scheduler(10_000);
        scheduler.frame();
        scheduler.frame();
        assert_eq!(scheduler.window().len(), 1);

        scheduler.handle_event(BenchEvent::ScaleTriangles(Scale::Halve));
        assert_eq!(scheduler.renderer().config().triangles, 5_000);
        assert_eq!(scheduler.renderer().geometry().subdivisions(), 50);
        assert!(scheduler.window().is_empty());
        assert!(scheduler.is_warming_up());
        assert!(console.contents().contains(" - strategy ............... command list"));

        assert_eq!(scheduler.frame(), None);
        assert!(scheduler.frame().is_some());
        assert!(console.contents().contains("5000 triangles rendered in "));
    }

    #[test]
    fn test_strategy_selection() {
        let (mut scheduler, _, _) = scheduler(5_000);
        scheduler.handle_event(BenchEvent::SelectStrategy(SubmissionStrategy::DynamicBuffer));
        assert_eq!(
            scheduler.renderer().active_config().strategy,
            SubmissionStrategy::DynamicBuffer
        );
        assert_eq!(scheduler.renderer().gfx().live_buffers(), 2);
    }

    #[test]
    fn test_abort_restores_interactive() {
        let (mut scheduler, report, _) = scheduler(5_000);
        scheduler.handle_event(BenchEvent::ToggleOption(OptionFlag::Texture));
        let base = *scheduler.base_config();

        scheduler.handle_event(BenchEvent::Sweep);
        scheduler.frame();
        scheduler.frame();
        scheduler.handle_event(BenchEvent::Sweep);
        assert_eq!(scheduler.state(), BenchState::SweepExiting);
        scheduler.frame();

        assert_eq!(scheduler.state(), BenchState::Interactive);
        assert!(scheduler.queue().is_empty());
        assert!(scheduler.view().rotating);
        assert_eq!(*scheduler.renderer().config(), base);
        assert_eq!(report.contents(), "");
    }

    #[test]
    fn test_unopenable_report_abandons_sweep() {
        let renderer = Renderer::new(
            RecordingGraphics::new(),
            RenderingConfig {
                triangles: 5_000,
                ..RenderingConfig::default()
            },
        )
        .unwrap();
        let mut scheduler = Scheduler::new(
            renderer,
            ViewState::default(),
            Box::new(FileReport::new("/nonexistent-meshbench-dir/bench.txt")),
        )
        .with_console(MemoryReport::new().writer());

        scheduler.handle_event(BenchEvent::Sweep);
        scheduler.evaluate_transitions();
        assert_eq!(scheduler.state(), BenchState::Interactive);
        assert!(scheduler.queue().is_empty());
        assert!(scheduler.view().rotating);
    }

    #[test]
    fn test_first_frame_is_discarded() {
        let (mut scheduler, _, _) = scheduler(5_000);
        assert_eq!(scheduler.frame(), None);
        assert!(scheduler.window().is_empty());
        assert!(scheduler.frame().is_some());
        assert_eq!(scheduler.window().len(), 1);
    }

    #[test]
    fn test_view_events() {
        let (mut scheduler, _, _) = scheduler(5_000);
        scheduler.handle_event(BenchEvent::ToggleRotation);
        scheduler.handle_event(BenchEvent::MoveForward(-0.1));
        scheduler.handle_event(BenchEvent::Rotate { dx: 2.0, dy: 3.0 });
        scheduler.handle_event(BenchEvent::Resize {
            width: 800,
            height: 400,
        });

        let view = scheduler.view();
        assert!(!view.rotating);
        assert!((view.forward + 1.6).abs() < 1e-12);
        assert_eq!(view.rotation_x, DEFAULT_ROTATION_X + 3.0);
        assert_eq!(view.rotation_y, DEFAULT_ROTATION_Y + 2.0);
        assert_eq!(view.aspect_ratio(), 2.0);

        assert_eq!(scheduler.handle_event(BenchEvent::Quit), Flow::Quit);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let (mut scheduler, _, _) = scheduler(5_000);
        scheduler.handle_event(BenchEvent::ToggleOption(OptionFlag::Texture));
        scheduler.frame();
        scheduler.shutdown();
        let gfx = scheduler.renderer().gfx();
        assert_eq!(gfx.live_objects(), 0);
        assert!(gfx.misuse().is_empty());
    }
}
