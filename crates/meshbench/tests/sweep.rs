use meshbench::gfx::RecordingGraphics;
use meshbench::{
    BenchEvent, BenchState, MemoryReport, RenderingConfig, Renderer, Scheduler, SubmissionStrategy,
    ViewState,
};

const SAMPLES: usize = 2;
const MAX_FRAMES: usize = 5_000;

struct Harness {
    scheduler: Scheduler<RecordingGraphics>,
    report: MemoryReport,
    console: MemoryReport,
}

fn harness(gfx: RecordingGraphics) -> Harness {
    let config = RenderingConfig {
        triangles: 2_500,
        ..RenderingConfig::default()
    };
    let renderer = Renderer::new(gfx, config).unwrap();
    let report = MemoryReport::new();
    let console = MemoryReport::new();
    let scheduler = Scheduler::new(renderer, ViewState::default(), Box::new(report.clone()))
        .with_sample_capacity(SAMPLES)
        .with_console(console.writer());
    Harness {
        scheduler,
        report,
        console,
    }
}

/// Requests a sweep and renders until the scheduler is interactive again.
fn run_sweep(scheduler: &mut Scheduler<RecordingGraphics>) -> usize {
    scheduler.handle_event(BenchEvent::Sweep);
    let mut frames = 0;
    loop {
        scheduler.frame();
        frames += 1;
        if scheduler.state() == BenchState::Interactive {
            return frames;
        }
        assert!(frames < MAX_FRAMES, "sweep did not finish");
    }
}

fn throughput_lines(report: &str) -> Vec<&str> {
    report
        .lines()
        .filter(|line| line.contains("triangles rendered in"))
        .collect()
}

#[test]
fn full_sweep_reports_every_configuration() {
    let Harness {
        mut scheduler,
        report,
        console,
    } = harness(RecordingGraphics::new());
    let base = *scheduler.base_config();

    let frames = run_sweep(&mut scheduler);
    // One warm-up frame plus a full window per entry.
    assert!(frames >= 189 * (SAMPLES + 1));

    let text = report.contents();
    let lines = throughput_lines(&text);
    assert_eq!(lines.len(), 189);
    assert!(lines
        .iter()
        .all(|line| line.starts_with("2500 triangles rendered in ") && !line.ends_with('*')));

    let mut blocks = text.split("+--------------------------------------------------+\n");
    assert_eq!(blocks.next(), Some(""));
    let first = blocks.next().unwrap();
    assert!(first.starts_with(" - strategy ............... immediate\n"));
    assert!(first.contains(" - triangle strip ......... off\n"));
    let last = text.rsplit("+--------------------------------------------------+\n").next().unwrap();
    assert!(last.starts_with(" - strategy ............... static buffer\n"));
    assert!(last.contains(" - wireframe .............. on\n"));
    assert!(last.contains(" - triangle strip ......... off\n"));

    let console = console.contents();
    assert!(console.contains("| Bench started"));
    assert!(console.contains("| Bench completion : 100 %"));
    assert!(console.contains("| Bench exit"));

    assert_eq!(scheduler.state(), BenchState::Interactive);
    assert!(scheduler.view().rotating);
    assert_eq!(*scheduler.renderer().config(), base);

    let gfx = scheduler.renderer().gfx();
    assert!(gfx.misuse().is_empty(), "{:?}", gfx.misuse());
    assert_eq!(gfx.live_command_lists(), 1);
    assert_eq!(gfx.created(), gfx.destroyed() + gfx.live_objects());

    scheduler.shutdown();
    let gfx = scheduler.renderer().gfx();
    assert_eq!(gfx.live_objects(), 0);
    assert_eq!(gfx.created(), gfx.destroyed());
}

#[test]
fn sweep_without_buffer_objects_skips_buffer_strategy() {
    let Harness {
        mut scheduler,
        report,
        ..
    } = harness(RecordingGraphics::without_buffer_objects());

    run_sweep(&mut scheduler);

    let text = report.contents();
    assert_eq!(throughput_lines(&text).len(), 126);
    assert!(!text.contains("static buffer"));
    assert!(scheduler.renderer().gfx().misuse().is_empty());
}

#[test]
fn second_sweep_rewrites_report() {
    let Harness {
        mut scheduler,
        report,
        ..
    } = harness(RecordingGraphics::new());

    run_sweep(&mut scheduler);
    run_sweep(&mut scheduler);

    assert_eq!(throughput_lines(&report.contents()).len(), 189);
}

#[test]
fn interactive_strategy_survives_sweep() {
    let Harness { mut scheduler, .. } = harness(RecordingGraphics::new());
    scheduler.handle_event(BenchEvent::SelectStrategy(SubmissionStrategy::DynamicBuffer));

    run_sweep(&mut scheduler);

    assert_eq!(
        scheduler.renderer().active_config().strategy,
        SubmissionStrategy::DynamicBuffer
    );
    assert_eq!(scheduler.renderer().gfx().live_buffers(), 2);
}
