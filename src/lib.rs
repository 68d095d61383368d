//! # pinchscroll
//!
//! Convierte un flujo de landmarks de mano (21 puntos normalizados por frame)
//! en dos señales de control independientes:
//!
//! * **Volumen** 0..100, a partir de la distancia pulgar–índice, sólo mientras
//!   la yema del índice está en el margen izquierdo del frame. Fuera de esa
//!   zona el valor queda bloqueado.
//! * **Scroll** discreto (`Next` / `Previous`), al cruzar la yema del índice
//!   una línea horizontal con banda muerta y cooldown.
//!
//! ```text
//! HandSnapshot ─▶ zone ─▶ { volume, scroll } ─▶ engine ─▶ GestureEvent ─▶ transport
//! ```
//!
//! El motor no hace IO: el llamador aporta el reloj monotónico y es dueño del
//! `EngineState` de cada sesión. La captura de cámara y el modelo de landmarks
//! quedan fuera; `source` sólo adapta su salida ya serializada.

pub mod config;
pub mod engine;
pub mod landmark_csv;
pub mod scroll;
pub mod source;
pub mod transport;
pub mod types;
pub mod volume;
pub mod zone;

pub use config::{ConfigError, EngineConfig, PinchRange, ScrollMode};
pub use engine::{EngineState, GestureEngine, SessionSummary};
pub use types::{GestureEvent, Hand, HandSnapshot, Landmark, ScrollAction, TimedSnapshot};
