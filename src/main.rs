/// Entry point and game loop.
///
/// Usage: `water41 [class]` where class is Wizard, Worrier, Warrior or
/// Wanderer (default Wizard).

mod ui;

use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use water41::config::GameConfig;
use water41::sim::event::GameEvent;
use water41::sim::step::{self, InputFrame};
use water41::sim::world::WorldState;
use ui::input::InputState;
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const DEFAULT_CLASS: &str = "Wizard";

fn main() {
    let (mut config, source) = GameConfig::read();
    init_logging(&config.general.log_dir, &config.general.log_filter);
    source.report();

    if config.general.seed == 0 {
        config.general.seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(41);
    }
    let class = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CLASS.to_string());
    info!(class = %class, seed = config.general.seed, "starting run");

    let (mut world, events) = WorldState::start(config, &class);
    log_events(&events);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &mut renderer);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing 41 Water!");
    if let Some(ending) = world.ending() {
        println!("{}", ending.title());
    }
    println!("Final Score: {}", world.final_score());
}

/// File logging only; the terminal belongs to the renderer.
fn init_logging(dir: &str, default_filter: &str) {
    let dir = Path::new(dir);
    if std::fs::create_dir_all(dir).is_err() {
        return;
    }
    let appender = tracing_appender::rolling::never(dir, "water41.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .init();

    // Keep the writer alive for the whole process.
    std::mem::forget(guard);
}

fn game_loop(world: &mut WorldState, renderer: &mut Renderer) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let tick_rate = Duration::from_millis(world.config.general.tick_rate_ms.max(1));
    let mut last_tick = Instant::now();
    let mut pending = InputFrame::default();

    loop {
        kb.drain_events();
        if kb.quit_requested() {
            break;
        }
        latch(&mut pending, &kb.frame());

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            last_tick = Instant::now();
            let held = kb.frame();
            let frame = InputFrame { left: held.left, right: held.right, ..pending };
            pending = InputFrame::default();

            let events = step::step(world, &frame, elapsed.as_secs_f32());
            log_events(&events);
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Keep one-shot presses seen between ticks until the next tick reads them.
fn latch(pending: &mut InputFrame, f: &InputFrame) {
    pending.jump |= f.jump;
    pending.dash |= f.dash;
    pending.attack |= f.attack;
    pending.enter_tactical |= f.enter_tactical;
    pending.toggle_inventory |= f.toggle_inventory;
    pending.use_item |= f.use_item;
    pending.discard_item |= f.discard_item;
    pending.befriend |= f.befriend;
    pending.fight |= f.fight;
    pending.flee |= f.flee;
    pending.menu_left |= f.menu_left;
    pending.menu_right |= f.menu_right;
}

fn log_events(events: &[GameEvent]) {
    for event in events {
        debug!(?event, "sim event");
    }
}
