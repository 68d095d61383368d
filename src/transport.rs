//! Salida de eventos aguas abajo del motor.
//!
//! La entrega es fire-and-forget: un fallo se registra y el hilo sigue con el
//! siguiente evento, sin reintentos ni buffer.

use crossbeam_channel::Receiver;
use std::io::Write;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{error, info};

use crate::types::GestureEvent;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[cfg(feature = "hid")]
    #[error("HID error: {0}")]
    HidError(#[from] uinput::Error),
}

/// Destino de los `GestureEvent` emitidos por el motor
pub trait EventSink: Send + 'static {
    fn deliver(&mut self, event: &GestureEvent) -> Result<(), TransportError>;
}

/// Escribe cada evento como una línea JSON con el payload `gesture_update`
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> EventSink for JsonLinesSink<W> {
    fn deliver(&mut self, event: &GestureEvent) -> Result<(), TransportError> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Reenvía las acciones de scroll como flechas de un teclado virtual.
/// El volumen no se envía por HID.
#[cfg(feature = "hid")]
pub struct HidSink {
    dev: uinput::Device,
}

#[cfg(feature = "hid")]
impl HidSink {
    pub fn new() -> Result<Self, uinput::Error> {
        let dev = uinput::default()?
            .name("pinchscroll-hid")?
            .event(uinput::event::Keyboard::All)?
            .create()?;

        Ok(HidSink { dev })
    }

    fn key_tap(&mut self, key: uinput::event::keyboard::Key) -> Result<(), uinput::Error> {
        use uinput::event::keyboard::Keyboard;

        self.dev.press(&Keyboard::Key(key))?;
        self.dev.synchronize()?;
        std::thread::sleep(std::time::Duration::from_millis(10));
        self.dev.release(&Keyboard::Key(key))?;
        self.dev.synchronize()
    }
}

#[cfg(feature = "hid")]
impl EventSink for HidSink {
    fn deliver(&mut self, event: &GestureEvent) -> Result<(), TransportError> {
        use crate::types::ScrollAction;
        use uinput::event::keyboard::Key;

        match event.scroll {
            ScrollAction::None => {}
            ScrollAction::Next => self.key_tap(Key::Down)?,
            ScrollAction::Previous => self.key_tap(Key::Up)?,
        }
        Ok(())
    }
}

/// Varios destinos a la vez; un fallo en uno no impide entregar a los demás
pub struct FanOut {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: impl EventSink) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for FanOut {
    fn deliver(&mut self, event: &GestureEvent) -> Result<(), TransportError> {
        let mut first_err = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.deliver(event) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Hilo de salida: consume eventos hasta que se cierre el canal.
/// Devuelve cuántos se entregaron sin error.
pub fn spawn_sink<S: EventSink>(rx: Receiver<GestureEvent>, mut sink: S) -> JoinHandle<usize> {
    thread::spawn(move || {
        let mut delivered = 0usize;
        for event in rx.iter() {
            match sink.deliver(&event) {
                Ok(()) => delivered += 1,
                Err(e) => error!("❌ Error entregando evento {:?}: {}", event, e),
            }
        }
        info!("Salida cerrada tras {} eventos", delivered);
        delivered
    })
}
