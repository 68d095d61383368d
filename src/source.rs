//! Fuentes de frames aguas arriba del motor.
//!
//! Cada fuente corre en su propio hilo y entrega `TimedSnapshot`s por un canal
//! `crossbeam_channel`. El detector de landmarks queda fuera: aquí sólo se
//! adapta su salida serializada (JSON por línea) o se simula una mano.

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::f32::consts::TAU;
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::{
    Hand, Landmark, TimedSnapshot, INDEX_TIP, LANDMARK_COUNT, PINKY_TIP, THUMB_TIP, WRIST,
};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Número de landmarks inválido: esperado {expected}, recibido {actual}")]
    LandmarkCount {
        expected: usize,
        actual: usize,
        time: Duration,
    },

    #[error("Tiempo inválido: {0}")]
    InvalidTime(f64),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Una línea del detector: `{"t": 0.033, "landmarks": [{"x":..,"y":..,"z":..}, ...]}`.
/// `landmarks` null o ausente = sin mano; `t` ausente = hora de llegada.
#[derive(Debug, Deserialize)]
struct DetectorLine {
    #[serde(default)]
    t: Option<f64>,
    #[serde(default)]
    landmarks: Option<Vec<Landmark>>,
}

/// Convierte una línea JSON en un frame. Con un número de landmarks distinto
/// de 21 devuelve error; el lector lo trata como frame sin mano.
pub fn parse_detector_line(line: &str, arrival: Duration) -> Result<TimedSnapshot, SourceError> {
    let parsed: DetectorLine = serde_json::from_str(line)?;

    let time = match parsed.t {
        Some(t) => Duration::try_from_secs_f64(t).map_err(|_| SourceError::InvalidTime(t))?,
        None => arrival,
    };

    let snapshot = match parsed.landmarks {
        None => None,
        Some(points) => {
            let actual = points.len();
            let hand: Hand = points.try_into().map_err(|_| SourceError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual,
                time,
            })?;
            Some(hand)
        }
    };

    Ok(TimedSnapshot { time, snapshot })
}

/// Lee JSON por línea hasta EOF o hasta que el receptor cierre el canal.
/// Devuelve el número de frames enviados.
pub fn read_detector_lines<R: BufRead>(
    input: R,
    tx: &Sender<TimedSnapshot>,
    clock: Instant,
) -> Result<usize, SourceError> {
    let mut sent = 0usize;
    let mut last_time = Duration::ZERO;

    for (line_idx, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let arrival = clock.elapsed();
        let mut frame = match parse_detector_line(&line, arrival) {
            Ok(frame) => frame,
            Err(SourceError::LandmarkCount {
                expected,
                actual,
                time,
            }) => {
                warn!(
                    "Línea {}: {} landmarks (esperados {}), se trata como frame sin mano",
                    line_idx + 1,
                    actual,
                    expected
                );
                TimedSnapshot {
                    time,
                    snapshot: None,
                }
            }
            Err(e) => {
                warn!("Línea {} descartada: {}", line_idx + 1, e);
                continue;
            }
        };

        // El cooldown asume reloj monotónico
        if frame.time < last_time {
            warn!(
                "Línea {}: tiempo {:.3}s retrocede, se usa {:.3}s",
                line_idx + 1,
                frame.time.as_secs_f64(),
                last_time.as_secs_f64()
            );
            frame.time = last_time;
        }
        last_time = frame.time;

        if tx.send(frame).is_err() {
            break;
        }
        sent += 1;
    }

    Ok(sent)
}

/// Lanza el lector en un hilo propio
pub fn spawn_detector_reader<R>(
    input: R,
    tx: Sender<TimedSnapshot>,
    clock: Instant,
) -> JoinHandle<Result<usize, SourceError>>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        let sent = read_detector_lines(input, &tx, clock)?;
        info!("📡 Fuente de landmarks cerrada tras {} frames", sent);
        Ok(sent)
    })
}

/// Parámetros del simulador de mano
#[derive(Debug, Clone)]
pub struct SimParams {
    pub fps: f32,
    /// Duración total; cada ciclo dura `CYCLE_SECS`
    pub duration: Duration,
    /// Ruido uniforme añadido a cada coordenada
    pub jitter: f32,
    pub seed: u64,
    /// Dormir entre frames para imitar una cámara real
    pub realtime: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            fps: 30.0,
            duration: Duration::from_secs(12),
            jitter: 0.005,
            seed: 7,
            realtime: true,
        }
    }
}

const CYCLE_SECS: f32 = 6.0;

/// Guion del simulador: (x, y, pinch) de la yema del índice, o sin mano.
/// 0-2 s ajusta volumen, luego sube (Next), espera, baja (Previous) y desaparece.
fn scripted_pose(t: f32) -> Option<(f32, f32, f32)> {
    let c = t % CYCLE_SECS;
    let lerp = |a: f32, b: f32, s: f32| a + (b - a) * s.clamp(0.0, 1.0);

    if c < 2.0 {
        let pinch = 0.12 + 0.10 * (c / 2.0 * TAU).sin();
        Some((0.1, 0.5, pinch))
    } else if c < 2.5 {
        Some((lerp(0.1, 0.6, (c - 2.0) / 0.5), lerp(0.5, 0.75, (c - 2.0) / 0.5), 0.05))
    } else if c < 3.0 {
        Some((0.6, lerp(0.75, 0.25, (c - 2.5) / 0.5), 0.05))
    } else if c < 4.0 {
        Some((0.6, 0.25, 0.05))
    } else if c < 4.5 {
        Some((0.6, lerp(0.25, 0.75, (c - 4.0) / 0.5), 0.05))
    } else if c < 5.0 {
        None
    } else {
        Some((lerp(0.6, 0.1, (c - 5.0) / 1.0), 0.5, 0.05))
    }
}

/// Mano sintética: muñeca debajo del índice, meñique separado
pub fn synthetic_hand(x: f32, y: f32, pinch: f32) -> Hand {
    let mut hand: Hand = [Landmark::new(x, y + 0.1, 0.0); LANDMARK_COUNT];
    hand[WRIST] = Landmark::new(x, y + 0.25, 0.0);
    hand[PINKY_TIP] = Landmark::new(x + 0.08, y + 0.05, 0.0);
    hand[INDEX_TIP] = Landmark::new(x, y, 0.0);
    hand[THUMB_TIP] = Landmark::new(x, y + pinch, 0.0);
    hand
}

/// Genera la sesión simulada completa, determinista para una semilla dada
pub fn simulate_session(params: &SimParams) -> Vec<TimedSnapshot> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let frame_dt = 1.0 / params.fps.max(1.0);
    let total = (params.duration.as_secs_f32() * params.fps.max(1.0)).round() as usize;

    (0..total)
        .map(|i| {
            let t = i as f32 * frame_dt;
            let snapshot = scripted_pose(t).map(|(x, y, pinch)| {
                let mut hand = synthetic_hand(x, y, pinch);
                if params.jitter > 0.0 {
                    for lm in hand.iter_mut() {
                        lm.x += rng.gen_range(-params.jitter..=params.jitter);
                        lm.y += rng.gen_range(-params.jitter..=params.jitter);
                    }
                }
                hand
            });
            TimedSnapshot {
                time: Duration::from_secs_f32(t),
                snapshot,
            }
        })
        .collect()
}

/// Lanza el simulador en un hilo propio
pub fn spawn_simulator(
    params: SimParams,
    tx: Sender<TimedSnapshot>,
) -> JoinHandle<Result<usize, SourceError>> {
    thread::spawn(move || {
        let frame_dt = Duration::from_secs_f32(1.0 / params.fps.max(1.0));
        let mut sent = 0usize;
        for frame in simulate_session(&params) {
            if tx.send(frame).is_err() {
                break;
            }
            sent += 1;
            if params.realtime {
                thread::sleep(frame_dt);
            }
        }
        info!("🤖 Simulador terminado tras {} frames", sent);
        Ok(sent)
    })
}
