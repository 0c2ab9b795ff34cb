use crate::draw::{Canvas, Rgba, text_width};
use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use snake_agents::agent::AgentKind;
use snake_agents::game::Collision;
use snake_agents::grid::Direction;
use snake_agents::session::{Control, Intent, Session};
use std::time::{Duration, Instant};
use tracing::error;
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

const CELL: u32 = 32;
const PANEL_W: u32 = 300;
const MIN_HEIGHT: u32 = 520;
const TRAIN_BATCH: u32 = 200;

const TEXT: Rgba = (230, 230, 230, 255);
const DIM: Rgba = (170, 180, 200, 255);
const ACCENT: Rgba = (180, 220, 255, 255);

/// Opens the window and hands the event loop to winit. Never returns on success.
pub fn run(mut session: Session) -> Result<()> {
    let grid = session.game().grid;
    let board_w = grid.width as u32 * CELL;
    let board_h = grid.height as u32 * CELL;
    let width = board_w + PANEL_W;
    let height = board_h.max(MIN_HEIGHT);

    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();
    let window = WindowBuilder::new()
        .with_title("Snake Agents")
        .with_inner_size(LogicalSize::new(width, height))
        .with_resizable(false)
        .build(&event_loop)
        .context("failed to open window")?;

    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(width, height, surface_texture).context("failed to create pixel surface")?
    };

    let mut last_update = Instant::now();
    let mut clock = RoundClock::default();
    let mut speed_delta_ms: i64 = 0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            let mut canvas = Canvas::new(pixels.frame_mut(), width, height);
            let interval = tick_interval(&session, speed_delta_ms);
            render(&mut canvas, &session, board_w, clock.elapsed(), interval);
            if let Err(err) = pixels.render() {
                error!(%err, "render failed");
                session.shutdown();
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.close_requested() || input.destroyed() {
                session.shutdown();
                *control_flow = ControlFlow::Exit;
                return;
            }

            for intent in intents(&input) {
                if session.handle(intent) == Control::Quit {
                    *control_flow = ControlFlow::Exit;
                    return;
                }
            }

            if input.key_pressed(VirtualKeyCode::NumpadAdd) || input.key_pressed(VirtualKeyCode::Equals) {
                speed_delta_ms = (speed_delta_ms - 20).max(-250);
            }
            if input.key_pressed(VirtualKeyCode::NumpadSubtract) || input.key_pressed(VirtualKeyCode::Minus) {
                speed_delta_ms = (speed_delta_ms + 20).min(500);
            }

            if last_update.elapsed() >= tick_interval(&session, speed_delta_ms) {
                session.tick();
                last_update = Instant::now();
            }
            clock.sync(&session);

            window.request_redraw();
        }
    });
}

fn tick_interval(session: &Session, delta_ms: i64) -> Duration {
    let base = session.tick_interval().as_millis() as i64;
    Duration::from_millis((base + delta_ms).clamp(20, 1000) as u64)
}

fn intents(input: &WinitInputHelper) -> Vec<Intent> {
    let pressed = |keys: &[VirtualKeyCode]| keys.iter().any(|&k| input.key_pressed(k));
    let mut out = Vec::new();

    if pressed(&[VirtualKeyCode::Escape]) {
        out.push(Intent::Quit);
        return out;
    }
    let turns = [
        (Direction::Up, [VirtualKeyCode::Up, VirtualKeyCode::W]),
        (Direction::Down, [VirtualKeyCode::Down, VirtualKeyCode::S]),
        (Direction::Left, [VirtualKeyCode::Left, VirtualKeyCode::A]),
        (Direction::Right, [VirtualKeyCode::Right, VirtualKeyCode::D]),
    ];
    for (dir, keys) in turns {
        if pressed(&keys) {
            out.push(Intent::Turn(dir));
        }
    }

    if pressed(&[VirtualKeyCode::Key0, VirtualKeyCode::M]) {
        out.push(Intent::SwitchAgent(None));
    }
    let agent_keys =
        [VirtualKeyCode::Key1, VirtualKeyCode::Key2, VirtualKeyCode::Key3, VirtualKeyCode::Key4, VirtualKeyCode::Key5];
    for (key, kind) in agent_keys.into_iter().zip(AgentKind::ALL) {
        if pressed(&[key]) {
            out.push(Intent::SwitchAgent(Some(kind)));
        }
    }

    if pressed(&[VirtualKeyCode::T]) {
        out.push(Intent::Train(TRAIN_BATCH));
    }
    if pressed(&[VirtualKeyCode::R, VirtualKeyCode::Return]) {
        out.push(Intent::Restart);
    }
    if pressed(&[VirtualKeyCode::P]) {
        out.push(Intent::TogglePause);
    }
    out
}

/// Wall-clock time of the current round; stops when the round ends.
#[derive(Default)]
struct RoundClock {
    started: Option<Instant>,
    frozen: Option<Duration>,
    last_ticks: u64,
}

impl RoundClock {
    fn sync(&mut self, session: &Session) {
        let game = session.game();
        if game.ticks() < self.last_ticks || self.started.is_none() {
            self.started = Some(Instant::now());
            self.frozen = None;
        }
        self.last_ticks = game.ticks();
        if game.is_over() && self.frozen.is_none() {
            self.frozen = Some(self.elapsed());
        }
    }

    fn elapsed(&self) -> Duration {
        self.frozen.or_else(|| self.started.map(|s| s.elapsed())).unwrap_or_default()
    }
}

fn render(canvas: &mut Canvas<'_>, session: &Session, board_w: u32, time: Duration, interval: Duration) {
    let game = session.game();
    let grid = game.grid;
    canvas.clear((20, 20, 30, 255));

    for y in 0..grid.height as u32 {
        for x in 0..grid.width as u32 {
            if (x + y) % 2 == 0 {
                canvas.fill_cell(x, y, CELL, 0, (25, 25, 35, 255));
            }
        }
    }

    if game.has_goal() {
        let goal = game.goal();
        canvas.fill_cell(goal.x as u32, goal.y as u32, CELL, 3, (220, 50, 50, 255));
    }

    let body = game.snake().body();
    for (i, seg) in body.iter().enumerate().rev() {
        let col = if i == 0 {
            (100, 255, 100, 255)
        } else {
            (50, 200 - (i * 6).min(100) as u8, 50, 255)
        };
        canvas.fill_cell(seg.x as u32, seg.y as u32, CELL, 1, col);
    }
    draw_eyes(canvas, body[0].x as u32, body[0].y as u32, game.snake().direction());

    draw_panel(canvas, session, board_w, time, interval);

    if let Some(summary) = game.summary() {
        let cause = match summary.cause {
            Collision::Wall => "HIT THE WALL",
            Collision::SelfBody => "HIT ITSELF",
        };
        let lines = [
            ("GAME OVER".to_string(), 4, (255, 120, 120, 255)),
            (cause.to_string(), 2, TEXT),
            (format!("SCORE: {}  TIME: {:.1}S", summary.score, time.as_secs_f32()), 2, TEXT),
            ("R TO RESTART".to_string(), 2, DIM),
        ];
        let box_w = board_w.min(420);
        let box_x = (board_w - box_w) / 2;
        let box_y = (grid.height as u32 * CELL).saturating_sub(150) / 2;
        canvas.fill_rect(box_x, box_y, box_w, 150, (0, 0, 0, 190));
        canvas.stroke_rect(box_x, box_y, box_w, 150, (255, 255, 255, 80));
        let mut y = box_y + 14;
        for (text, scale, col) in lines {
            let x = box_x + box_w.saturating_sub(text_width(&text, scale)) / 2;
            canvas.draw_text(&text, x, y, scale, col);
            y += 10 * scale;
        }
    }
}

fn draw_eyes(canvas: &mut Canvas<'_>, gx: u32, gy: u32, dir: Direction) {
    let (bx, by) = (gx * CELL, gy * CELL);
    let (near, far) = (CELL / 4, CELL * 3 / 4 - 3);
    let ((x1, y1), (x2, y2)) = match dir {
        Direction::Right => ((far, near), (far, far)),
        Direction::Left => ((near, near), (near, far)),
        Direction::Up => ((near, near), (far, near)),
        Direction::Down => ((near, far), (far, far)),
    };
    canvas.fill_rect(bx + x1, by + y1, 3, 3, (0, 0, 0, 255));
    canvas.fill_rect(bx + x2, by + y2, 3, 3, (0, 0, 0, 255));
}

fn draw_panel(canvas: &mut Canvas<'_>, session: &Session, board_w: u32, time: Duration, interval: Duration) {
    let game = session.game();
    let x = board_w + 10;
    let mut y = 12;

    canvas.fill_rect(board_w, 0, PANEL_W, canvas.height(), (0, 0, 0, 140));
    line(canvas, x, &mut y, "SNAKE AGENTS", ACCENT);
    line(canvas, x, &mut y, &format!("SCORE: {}", game.score()), TEXT);
    line(canvas, x, &mut y, &format!("LENGTH: {}", game.snake().len()), TEXT);
    line(canvas, x, &mut y, &format!("BEST: {}", session.best_score()), TEXT);
    line(canvas, x, &mut y, &format!("AGENT: {}", session.controller_label()), ACCENT);
    line(canvas, x, &mut y, &format!("TIME: {:.1}S", time.as_secs_f32()), TEXT);
    line(canvas, x, &mut y, &format!("SPEED: {} MS", interval.as_millis()), DIM);
    if let Some(eps) = session.epsilon() {
        line(canvas, x, &mut y, &format!("EPS: {:.3}", eps), DIM);
    }
    if let Some(report) = session.last_training() {
        line(canvas, x, &mut y, &format!("TRAINED: {} (+{:.1})", report.episodes, report.mean_score), DIM);
    }
    if session.is_paused() {
        line(canvas, x, &mut y, "PAUSED", (255, 220, 120, 255));
    }

    let chart_y = y + 4;
    canvas.draw_chart(x, chart_y, PANEL_W - 20, 70, session.scores());

    let mut hy = chart_y + 84;
    for help in ["ARROWS/WASD: TURN", "0/M: MANUAL", "1-5: AGENTS", "T: TRAIN  P: PAUSE", "R: RESTART  +/-: SPEED"] {
        canvas.draw_text(help, x, hy, 1, DIM);
        hy += 14;
    }
}

fn line(canvas: &mut Canvas<'_>, x: u32, y: &mut u32, text: &str, col: Rgba) {
    canvas.draw_text(text, x, *y, 2, col);
    *y += 24;
}
