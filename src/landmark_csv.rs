use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, ensure, Context, Result};
use csv::{ReaderBuilder, Writer};

use crate::types::{Hand, Landmark, TimedSnapshot, LANDMARK_COUNT};

pub const CSV_HEADER: [&str; 6] = ["frame", "time_s", "landmark", "x", "y", "z"];

#[derive(Default)]
struct FrameRows {
    time_s: f64,
    landmarks: [Option<Landmark>; LANDMARK_COUNT],
    seen_hand: bool,
    seen_empty: bool,
}

/// Carga una sesión grabada desde un CSV con formato
/// frame,time_s,landmark,x,y,z ordenado por frame.
/// Un frame sin mano se escribe como una fila con landmark/x/y/z vacíos.
pub fn load_session_from_csv(path: impl AsRef<Path>) -> Result<Vec<TimedSnapshot>> {
    let path = path.as_ref();
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;
    read_session(reader).with_context(|| format!("Sesión inválida en {:?}", path))
}

pub fn load_session_from_reader<R: std::io::Read>(input: R) -> Result<Vec<TimedSnapshot>> {
    let reader = ReaderBuilder::new().has_headers(true).from_reader(input);
    read_session(reader)
}

fn read_session<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<TimedSnapshot>> {
    let mut frames: BTreeMap<usize, FrameRows> = BTreeMap::new();

    for (row_idx, result) in reader.records().enumerate() {
        let row = row_idx + 1;
        let record = result.with_context(|| format!("Fila {} inválida", row))?;
        if record.len() < CSV_HEADER.len() {
            bail!("La fila {} no tiene {} columnas", row, CSV_HEADER.len());
        }

        let frame_idx: usize = record[0]
            .trim()
            .parse()
            .with_context(|| format!("frame inválido en fila {}", row))?;
        let time_s: f64 = record[1]
            .trim()
            .parse()
            .with_context(|| format!("time_s inválido en fila {}", row))?;
        Duration::try_from_secs_f64(time_s)
            .with_context(|| format!("time_s fuera de rango en fila {}: {}", row, time_s))?;

        let frame = frames.entry(frame_idx).or_default();
        if frame.seen_hand || frame.seen_empty {
            ensure!(
                frame.time_s == time_s,
                "El frame {} tiene tiempos distintos (fila {})",
                frame_idx,
                row
            );
        }
        frame.time_s = time_s;

        let landmark_field = record[2].trim();
        if landmark_field.is_empty() {
            frame.seen_empty = true;
            continue;
        }

        let landmark: usize = landmark_field
            .parse()
            .with_context(|| format!("landmark inválido en fila {}", row))?;
        if landmark >= LANDMARK_COUNT {
            bail!("Landmark {} fuera de rango (fila {})", landmark, row);
        }

        // NaN se conserva: el motor lo sanea
        let x: f32 = record[3].trim().parse()?;
        let y: f32 = record[4].trim().parse()?;
        let z: f32 = record[5].trim().parse()?;

        frame.landmarks[landmark] = Some(Landmark::new(x, y, z));
        frame.seen_hand = true;
    }

    if frames.is_empty() {
        return Err(anyhow!("El CSV no contiene frames"));
    }

    let mut session = Vec::with_capacity(frames.len());
    let mut last_time = 0.0f64;
    for (frame_idx, rows) in frames {
        ensure!(
            !(rows.seen_hand && rows.seen_empty),
            "El frame {} mezcla filas con y sin mano",
            frame_idx
        );
        ensure!(
            rows.time_s >= last_time,
            "El frame {} retrocede en el tiempo ({} < {})",
            frame_idx,
            rows.time_s,
            last_time
        );
        last_time = rows.time_s;

        let snapshot = if rows.seen_hand {
            Some(complete_hand(frame_idx, &rows.landmarks)?)
        } else {
            None
        };

        let time = Duration::try_from_secs_f64(rows.time_s)
            .with_context(|| format!("time_s fuera de rango en el frame {}", frame_idx))?;
        session.push(TimedSnapshot { time, snapshot });
    }

    Ok(session)
}

fn complete_hand(frame_idx: usize, landmarks: &[Option<Landmark>; LANDMARK_COUNT]) -> Result<Hand> {
    let mut hand: Hand = [Landmark::default(); LANDMARK_COUNT];
    for (i, lm) in landmarks.iter().enumerate() {
        hand[i] = lm.ok_or_else(|| anyhow!("Al frame {} le falta el landmark {}", frame_idx, i))?;
    }
    Ok(hand)
}

/// Graba los frames entrantes en el mismo formato que lee `load_session_from_csv`
pub struct SessionRecorder<W: Write> {
    writer: Writer<W>,
    frame_idx: usize,
}

impl SessionRecorder<std::fs::File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let writer = Writer::from_path(path)
            .with_context(|| format!("No se pudo crear el CSV {:?}", path))?;
        Self::with_writer(writer)
    }
}

impl<W: Write> SessionRecorder<W> {
    pub fn from_writer(output: W) -> Result<Self> {
        Self::with_writer(Writer::from_writer(output))
    }

    fn with_writer(mut writer: Writer<W>) -> Result<Self> {
        writer.write_record(CSV_HEADER)?;
        Ok(Self {
            writer,
            frame_idx: 0,
        })
    }

    pub fn record(&mut self, frame: &TimedSnapshot) -> Result<()> {
        let frame_field = self.frame_idx.to_string();
        let time_field = frame.time.as_secs_f64().to_string();

        match &frame.snapshot {
            None => {
                self.writer
                    .write_record([frame_field.as_str(), time_field.as_str(), "", "", "", ""])?;
            }
            Some(hand) => {
                for (i, lm) in hand.iter().enumerate() {
                    self.writer.write_record([
                        frame_field.clone(),
                        time_field.clone(),
                        i.to_string(),
                        lm.x.to_string(),
                        lm.y.to_string(),
                        lm.z.to_string(),
                    ])?;
                }
            }
        }

        self.frame_idx += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.frame_idx
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow!("No se pudo vaciar el CSV: {}", e.error()))
    }
}
