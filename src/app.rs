use std::sync::Arc;

use instant::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::debug::timer::SpanTimer;
use crate::render::instance::BoidInstance;
use crate::render::GpuState;
use crate::sim::Simulation;

/// Longest frame delta fed to the simulation (prevents huge jumps after stalls).
const MAX_FRAME_DT: f64 = 0.25;
/// How often to log frame stats (seconds).
const STATS_LOG_INTERVAL: f64 = 5.0;
/// How often to refresh the FPS shown in the window title (seconds).
const TITLE_INTERVAL: f64 = 1.0;

const TITLE: &str = "Boids";

// ---------------------------------------------------------------------------
// Frame timing
// ---------------------------------------------------------------------------

struct FrameStats {
    frame_count: u64,
    last_log_time: Instant,
    frame_time_sum: f64,
    frame_time_min: f64,
    frame_time_max: f64,
    frames_since_log: u32,
    title_elapsed: f64,
    title_frames: u32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frame_count: 0,
            last_log_time: Instant::now(),
            frame_time_sum: 0.0,
            frame_time_min: f64::MAX,
            frame_time_max: 0.0,
            frames_since_log: 0,
            title_elapsed: 0.0,
            title_frames: 0,
        }
    }

    /// Record a frame. Returns the FPS over the last second once per second.
    fn record_frame(
        &mut self,
        dt: f64,
        tick_timer: &mut SpanTimer,
        draw_timer: &mut SpanTimer,
    ) -> Option<u32> {
        self.frame_count += 1;
        self.frames_since_log += 1;
        self.frame_time_sum += dt;
        self.frame_time_min = self.frame_time_min.min(dt);
        self.frame_time_max = self.frame_time_max.max(dt);

        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        if elapsed >= STATS_LOG_INTERVAL {
            let avg_ms = (self.frame_time_sum / self.frames_since_log as f64) * 1000.0;
            let fps = self.frames_since_log as f64 / elapsed;
            log::info!(
                "FPS: {:.0} | avg: {:.2}ms | min: {:.2}ms | max: {:.2}ms | total frames: {}",
                fps,
                avg_ms,
                self.frame_time_min * 1000.0,
                self.frame_time_max * 1000.0,
                self.frame_count,
            );
            if let Some(w) = tick_timer.window() {
                log::info!(
                    "Tick: avg {:.0}us | min {:.0}us | max {:.0}us | {} ticks",
                    w.avg_us,
                    w.min_us,
                    w.max_us,
                    w.samples,
                );
            }
            if let Some(w) = draw_timer.window() {
                log::debug!(
                    "Draw: avg {:.0}us | min {:.0}us | max {:.0}us",
                    w.avg_us,
                    w.min_us,
                    w.max_us,
                );
            }
            tick_timer.reset_window();
            draw_timer.reset_window();
            self.last_log_time = Instant::now();
            self.frame_time_sum = 0.0;
            self.frame_time_min = f64::MAX;
            self.frame_time_max = 0.0;
            self.frames_since_log = 0;
        }

        self.title_elapsed += dt;
        self.title_frames += 1;
        if self.title_elapsed >= TITLE_INTERVAL {
            let fps = (self.title_frames as f64 / self.title_elapsed) as u32;
            self.title_elapsed = 0.0;
            self.title_frames = 0;
            return Some(fps);
        }
        None
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Top-level application state.
struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,

    sim: Simulation,
    world_w: f32,
    world_h: f32,

    last_frame_time: Option<Instant>,
    frame_stats: FrameStats,
    /// Cost of `Simulation::step` per tick.
    tick_timer: SpanTimer,
    /// Cost of building, uploading and drawing the instances.
    draw_timer: SpanTimer,

    // Reusable instance buffer (avoid per-frame allocation)
    instance_buf: Vec<BoidInstance>,

    // Set when window or GPU setup fails; returned from `run`.
    fatal: Option<Box<dyn std::error::Error>>,
}

impl App {
    fn new(sim: Simulation, world_w: f32, world_h: f32) -> Self {
        let count = sim.flock().len();
        Self {
            window: None,
            gpu: None,
            sim,
            world_w,
            world_h,
            last_frame_time: None,
            frame_stats: FrameStats::new(),
            tick_timer: SpanTimer::new(),
            draw_timer: SpanTimer::new(),
            instance_buf: Vec::with_capacity(count),
            fatal: None,
        }
    }

    /// Build instance buffer from the settled flock for rendering.
    fn build_instances(&mut self) {
        self.instance_buf.clear();
        self.instance_buf.extend(
            self.sim
                .flock()
                .draw_list()
                .map(|(pos, group)| BoidInstance::new(pos, group)),
        );
    }

    fn advance(&mut self, dt: f64) {
        let dt = dt.min(MAX_FRAME_DT) as f32;
        self.tick_timer.begin();
        if let Err(e) = self.sim.step(dt) {
            log::warn!("Skipping tick {}: {e}", self.sim.tick_count());
            return;
        }
        self.tick_timer.end();
    }

    fn set_fps_title(&self, fps: u32) {
        if let Some(w) = &self.window {
            w.set_title(&format!(
                "{TITLE} | FPS: {fps} | tick {:.0}us | {}",
                self.tick_timer.ema_us(),
                self.sim.mode().label()
            ));
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(TITLE)
            .with_inner_size(PhysicalSize::new(self.world_w as u32, self.world_h as u32));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fatal = Some(e.into());
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        log::info!("Window created: {}x{}", size.width, size.height);

        match GpuState::new(
            window.clone(),
            (self.world_w, self.world_h),
            self.sim.flock().len(),
        ) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => {
                self.fatal = Some(e.into());
                event_loop.exit();
                return;
            }
        }
        log::info!("wgpu + boid pipeline initialized");

        // Continuous game loop
        event_loop.set_control_flow(ControlFlow::Poll);
        self.window = Some(window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!(
                    "Close requested after {} ticks, exiting",
                    self.sim.tick_count()
                );
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                // --- Timing + simulation ---
                let now = Instant::now();
                if let Some(last) = self.last_frame_time {
                    let dt = now.duration_since(last).as_secs_f64();
                    self.advance(dt);
                    if let Some(fps) = self.frame_stats.record_frame(
                        dt,
                        &mut self.tick_timer,
                        &mut self.draw_timer,
                    ) {
                        self.set_fps_title(fps);
                    }
                }
                self.last_frame_time = Some(now);

                // --- Build instances and render ---
                self.draw_timer.begin();
                self.build_instances();
                if let Some(gpu) = &mut self.gpu {
                    gpu.update_instances(&self.instance_buf);
                    gpu.render_frame();
                }
                self.draw_timer.end();
            }
            _ => {}
        }
    }
}

/// Entry point: create event loop and run until the window closes.
pub fn run(sim: Simulation, world_w: f32, world_h: f32) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(sim, world_w, world_h);
    event_loop.run_app(&mut app)?;
    if let Some(e) = app.fatal.take() {
        return Err(e);
    }
    Ok(())
}
