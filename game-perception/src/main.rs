mod args;

use args::{Args, Mode};
use game_perception::capture::create_strict_capture_config;
use game_perception::{MatchEngine, PerceptionConfig, PerceptionEngine, PerceptionResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const SCREENSHOT_PATH: &str = "screenshot.png";
const GAUGE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const CLASSIFY_INTERVAL: Duration = Duration::from_millis(500);

fn main() {
    let Some(args) = Args::parse() else {
        return;
    };
    init_logging(args.debug_mode);

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let engine = Arc::new(PerceptionEngine::from_config(config));
    if !engine.frames().is_target_running() {
        println!(
            "⚠️ Window '{}' not found, using fallback capture",
            engine.config().window_title
        );
    }

    match args.mode {
        Mode::Screenshot => screenshot(&engine),
        Mode::State => {
            engine.preload();
            println!("🎮 State: {}", engine.classify());
        }
        Mode::Status => print_status(&engine),
        Mode::Find(name) => find(&engine, &name, args.annotate_path.as_deref()),
        Mode::Watch => {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    eprintln!("❌ Failed to start runtime: {e}");
                    std::process::exit(1);
                }
            };
            runtime.block_on(watch(engine, args.timeout_secs));
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn build_config(args: &Args) -> PerceptionResult<PerceptionConfig> {
    let mut config = match &args.config_path {
        Some(path) => PerceptionConfig::load(path)?,
        None => PerceptionConfig::default(),
    };
    if let Some(root) = &args.template_root {
        config.template_root = root.clone();
    }
    if args.strict {
        config.capture = create_strict_capture_config();
    }
    Ok(config)
}

fn screenshot(engine: &PerceptionEngine) {
    println!("📸 Capturing '{}'...", engine.config().window_title);
    let frame = engine.frames().grab(false);
    if !frame.is_valid() {
        println!("❌ Nothing captured");
        return;
    }

    match frame.encode_png() {
        Ok(bytes) => match std::fs::write(SCREENSHOT_PATH, &bytes) {
            Ok(()) => println!(
                "✅ Screenshot {}x{} saved to {}",
                frame.width(),
                frame.height(),
                SCREENSHOT_PATH
            ),
            Err(e) => println!("❌ Write failed: {e}"),
        },
        Err(e) => println!("❌ {e}"),
    }
}

fn print_status(engine: &PerceptionEngine) {
    let reading = engine.read_status();
    println!(
        "❤️ Health: {:.0}%{}",
        reading.health_percent() * 100.0,
        if reading.is_low_health() { " (LOW)" } else { "" }
    );
    println!(
        "💧 Mana:   {:.0}%{}",
        reading.mana_percent() * 100.0,
        if reading.is_low_mana() { " (LOW)" } else { "" }
    );
    if reading.poisoned() {
        println!("☠️ Poisoned");
    }
}

fn find(engine: &PerceptionEngine, name: &str, annotate_path: Option<&Path>) {
    if !engine.matcher().is_loaded(name) {
        println!(
            "❌ Template '{}' not found at {:?}",
            name,
            engine.library().template_path(name)
        );
        return;
    }

    let frame = engine.grab();
    let matches = engine.matcher().find_all(&frame, name, None, None, None);
    if matches.is_empty() {
        println!("🔍 No match for '{}'", name);
    }
    for (i, m) in matches.iter().enumerate() {
        println!("✅ {}. {}", i + 1, m.describe(name));
    }

    if let Some(path) = annotate_path {
        match MatchEngine::annotate(&frame, &matches).save(path) {
            Ok(()) => println!("🖼️ Annotated frame saved to {:?}", path),
            Err(e) => println!("❌ Failed to save {:?}: {e}", path),
        }
    }
}

/// Background gauge polling next to a slower classify loop, until the
/// timeout (if any) expires.
async fn watch(engine: Arc<PerceptionEngine>, timeout_secs: Option<u64>) {
    let loaded = engine.preload();
    println!("👀 Watching '{}' ({} templates loaded)", engine.config().window_title, loaded);

    let poller = tokio::spawn(poll_gauges(Arc::clone(&engine)));

    let classify_loop = async {
        let mut interval = tokio::time::interval(CLASSIFY_INTERVAL);
        let mut last = None;
        loop {
            interval.tick().await;
            let classify_engine = Arc::clone(&engine);
            match tokio::task::spawn_blocking(move || classify_engine.classify()).await {
                Ok(state) if last != Some(state) => {
                    println!("🎮 {}", state);
                    last = Some(state);
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("Classify task failed: {e}");
                    break;
                }
            }
        }
    };

    match timeout_secs {
        Some(secs) => {
            if tokio::time::timeout(Duration::from_secs(secs), classify_loop)
                .await
                .is_err()
            {
                println!("⏰ Timeout reached after {}s, exiting", secs);
            }
        }
        None => classify_loop.await,
    }

    poller.abort();
}

async fn poll_gauges(engine: Arc<PerceptionEngine>) {
    let mut interval = tokio::time::interval(GAUGE_POLL_INTERVAL);
    let mut last_flags = (false, false, false);

    loop {
        interval.tick().await;
        let gauge_engine = Arc::clone(&engine);
        let reading = match tokio::task::spawn_blocking(move || gauge_engine.read_status()).await {
            Ok(reading) => reading,
            Err(e) => {
                log::error!("Gauge poll failed: {e}");
                break;
            }
        };

        let flags = (reading.is_low_health(), reading.is_low_mana(), reading.poisoned());
        if flags != last_flags {
            if flags.0 {
                println!("🚨 Low health: {:.0}%", reading.health_percent() * 100.0);
            }
            if flags.1 {
                println!("💧 Low mana: {:.0}%", reading.mana_percent() * 100.0);
            }
            if flags.2 {
                println!("☠️ Poisoned");
            }
            last_flags = flags;
        }
    }
}
