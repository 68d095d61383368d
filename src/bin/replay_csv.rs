use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use pinchscroll::engine::SessionSummary;
use pinchscroll::landmark_csv::load_session_from_csv;
use pinchscroll::{EngineConfig, GestureEngine};

const USAGE: &str = "Uso: replay_csv [--json] [--actions-only] [--config <archivo.json>] <sesion.csv>";

struct ReplayOptions {
    json: bool,
    actions_only: bool,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut json = false;
    let mut actions_only = false;
    let mut config: Option<PathBuf> = None;
    let mut csv_path: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--actions-only" => actions_only = true,
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config necesita una ruta\n{}", USAGE))?;
                config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => bail!("{}", USAGE),
            _ => {
                if csv_path.is_some() {
                    bail!("{}", USAGE);
                }
                csv_path = Some(PathBuf::from(arg));
            }
        }
    }

    let csv_path = csv_path.ok_or_else(|| anyhow!("Debes especificar un archivo CSV\n{}", USAGE))?;
    Ok((
        csv_path,
        ReplayOptions {
            json,
            actions_only,
            config,
        },
    ))
}

fn main() -> Result<()> {
    let (csv_path, opts) = parse_args()?;

    let config = match &opts.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => EngineConfig::default(),
    };
    let engine = GestureEngine::new(config)?;

    // Con --json stdout lleva sólo eventos, igual que el daemon
    if !opts.json {
        println!("🎞️  Reproduciendo sesión desde {:?}", csv_path);
    }

    let session = load_session_from_csv(&csv_path)?;
    let events = engine.run_session(&session);

    let mut summary = SessionSummary::default();
    for (frame, event) in session.iter().zip(&events) {
        summary.observe(&frame.snapshot, event);

        if opts.actions_only && event.scroll.is_none() {
            continue;
        }

        if opts.json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            let hand = if frame.snapshot.is_some() { "✋" } else { "  " };
            println!(
                "  {:>8.3}s {} volumen {:>3}  {}",
                frame.time.as_secs_f64(),
                hand,
                event.volume,
                event.scroll.wire_label().unwrap_or("-")
            );
        }
    }

    if !opts.json {
        println!(
            "\n📊 {} frames ({} sin mano)",
            summary.frames, summary.no_hand_frames
        );
        println!("   Next:     {}", summary.next);
        println!("   Previous: {}", summary.previous);
        if let Some(volume) = summary.final_volume {
            println!("   Volumen final: {}", volume);
        }
    }

    Ok(())
}
