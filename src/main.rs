/*
pinchscroll - volumen por pellizco y scroll por cruce de línea

El detector de landmarks corre fuera de este proceso y escribe una línea JSON
por frame en stdin:
    {"t": 0.033, "landmarks": [{"x":0.41,"y":0.52,"z":-0.01}, ...21 puntos]}
    {"t": 0.066, "landmarks": null}

Cada frame produce un evento `gesture_update` en stdout:
    {"volume":57,"scroll":null}
    {"volume":57,"scroll":"SCROLL_DOWN"}

Sin detector a mano:
    ./target/release/pinchscroll --source sim

Para grabar la sesión y reproducirla después:
    ./target/release/pinchscroll --record sesion.csv
    ./target/release/replay_csv sesion.csv

Con teclado virtual (cargo build --features hid):
    sg input -c './target/release/pinchscroll --hid'
*/

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam_channel::{bounded, select, tick, unbounded};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pinchscroll::engine::SessionSummary;
use pinchscroll::landmark_csv::SessionRecorder;
use pinchscroll::source::{spawn_detector_reader, spawn_simulator, SimParams};
use pinchscroll::transport::{spawn_sink, FanOut, JsonLinesSink};
use pinchscroll::{EngineConfig, GestureEngine, TimedSnapshot};

const SOURCE_QUEUE: usize = 100;
const STATS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// JSON por línea desde el detector
    Stdin,
    /// Mano sintética con guion fijo
    Sim,
}

#[derive(Parser, Debug)]
#[command(name = "pinchscroll", version, about)]
struct Cli {
    /// Configuración JSON del motor
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Origen de los frames
    #[arg(long, value_enum, default_value_t = SourceKind::Stdin)]
    source: SourceKind,

    /// Duración de la simulación en segundos
    #[arg(long, default_value_t = 12.0)]
    sim_duration: f32,

    /// Frames por segundo de la simulación
    #[arg(long, default_value_t = 30.0)]
    sim_fps: f32,

    /// Semilla del ruido de la simulación
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Simular sin esperar entre frames
    #[arg(long)]
    no_realtime: bool,

    /// Grabar los frames recibidos en un CSV reproducible con replay_csv
    #[arg(long)]
    record: Option<PathBuf>,

    /// No escribir eventos en stdout
    #[arg(long)]
    no_json: bool,

    /// Enviar Next/Previous como flechas por /dev/uinput
    #[cfg(feature = "hid")]
    #[arg(long)]
    hid: bool,

    /// Imprimir la configuración efectiva y salir
    #[arg(long)]
    print_config: bool,

    /// Logs de depuración
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Los logs van a stderr, stdout queda para los eventos
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => EngineConfig::default(),
    };

    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let engine = GestureEngine::new(config)?;
    info!("🎯 pinchscroll v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuración: {:?}", engine.config());

    let mut recorder = match &cli.record {
        Some(path) => {
            info!("💾 Grabando sesión en {:?}", path);
            Some(SessionRecorder::create(path)?)
        }
        None => None,
    };

    let sink = build_sink(&cli)?;
    if sink.is_empty() {
        warn!("Sin destinos de salida: los eventos se descartan");
    }

    // Hilo de la fuente
    let clock = Instant::now();
    let (tx, rx) = bounded::<TimedSnapshot>(SOURCE_QUEUE);
    let source_handle = match cli.source {
        SourceKind::Stdin => {
            info!("📡 Leyendo landmarks desde stdin");
            spawn_detector_reader(BufReader::new(io::stdin()), tx, clock)
        }
        SourceKind::Sim => {
            let params = SimParams {
                fps: cli.sim_fps,
                duration: Duration::from_secs_f32(cli.sim_duration.max(0.0)),
                seed: cli.seed,
                realtime: !cli.no_realtime,
                ..SimParams::default()
            };
            info!("🤖 Simulando {:.1}s a {} fps", cli.sim_duration, cli.sim_fps);
            spawn_simulator(params, tx)
        }
    };

    // Hilo de salida
    let (tx_event, rx_event) = unbounded();
    let sink_handle = spawn_sink(rx_event, sink);

    let mut state = engine.new_state();
    let mut summary = SessionSummary::default();
    let stats = tick(STATS_INTERVAL);

    info!("🎬 Motor listo");

    loop {
        select! {
            recv(rx) -> msg => {
                let Ok(frame) = msg else { break };

                if let Some(rec) = recorder.as_mut() {
                    if let Err(e) = rec.record(&frame) {
                        warn!("❌ Error grabando frame: {:#}; se detiene la grabación", e);
                        recorder = None;
                    }
                }

                let event = engine.step(&frame.snapshot, frame.time, &mut state);
                summary.observe(&frame.snapshot, &event);

                if !event.scroll.is_none() {
                    info!(
                        "➡️  {:?} en {:.2}s (volumen {})",
                        event.scroll,
                        frame.time.as_secs_f64(),
                        event.volume
                    );
                }

                if tx_event.send(event).is_err() {
                    warn!("La salida se cerró, terminando");
                    break;
                }
            }
            recv(stats) -> _ => {
                debug!(
                    "{} frames ({} sin mano), volumen {}",
                    summary.frames,
                    summary.no_hand_frames,
                    state.locked_volume
                );
            }
        }
    }

    drop(rx);
    drop(tx_event);

    let source_result = join_thread(source_handle, "fuente")?;
    if let Err(e) = source_result {
        warn!("❌ La fuente terminó con error: {}", e);
    }

    if let Some(rec) = recorder.as_mut() {
        rec.flush()?;
        info!("💾 {} frames grabados", rec.frames_written());
    }

    let delivered = join_thread(sink_handle, "salida")?;

    info!(
        "✅ Sesión terminada: {} frames, {} Next, {} Previous, volumen final {}, {} eventos entregados",
        summary.frames,
        summary.next,
        summary.previous,
        state.locked_volume,
        delivered
    );

    Ok(())
}

fn build_sink(cli: &Cli) -> Result<FanOut> {
    let mut sink = FanOut::new();
    if !cli.no_json {
        sink = sink.with(JsonLinesSink::new(io::stdout()));
    }

    #[cfg(feature = "hid")]
    let sink = if cli.hid {
        let hid = pinchscroll::transport::HidSink::new()
            .map_err(|e| anyhow!("No se pudo inicializar HID: {}", e))?;
        info!("✅ HID inicializado (/dev/uinput)");
        sink.with(hid)
    } else {
        sink
    };

    Ok(sink)
}

fn join_thread<T>(handle: JoinHandle<T>, name: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("El hilo de {} terminó con pánico", name))
}
