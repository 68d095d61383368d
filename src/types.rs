use serde::{Deserialize, Serialize};

/// Constantes del sistema (topología estándar de 21 puntos por mano)
pub const LANDMARK_COUNT: usize = 21;
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const PINKY_TIP: usize = 20;

/// Centro del frame, valor neutro para coordenadas no finitas
const NEUTRAL_COORD: f32 = 0.5;

/// Un punto de la mano normalizado al tamaño del frame.
/// Origen arriba a la izquierda, y crece hacia abajo, x ya espejada.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Profundidad relativa, no se usa en el motor
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Copia con x/y recortadas a [0,1]. NaN pasa a ser el centro del frame,
    /// que cae en la zona de gestos y dentro de la banda muerta por defecto.
    pub fn sanitized(self) -> Self {
        Self {
            x: clamp_unit(self.x),
            y: clamp_unit(self.y),
            z: self.z,
        }
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        NEUTRAL_COORD
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Distancia euclídea en el plano normalizado. Resultados no finitos valen 0.
pub fn planar_distance(a: &Landmark, b: &Landmark) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d = (dx * dx + dy * dy).sqrt();
    if d.is_finite() {
        d
    } else {
        0.0
    }
}

/// Los 21 landmarks de una mano detectada
pub type Hand = [Landmark; LANDMARK_COUNT];

/// Frame completo: la mano detectada o ninguna
pub type HandSnapshot = Option<Hand>;

/// Frame con su instante monotónico relativo al inicio de la sesión
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSnapshot {
    pub time: std::time::Duration,
    pub snapshot: HandSnapshot,
}

/// Acción discreta de scroll, activada por flanco
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScrollAction {
    #[default]
    None,
    /// Avanzar contenido (mano de abajo hacia arriba)
    Next,
    /// Volver atrás (mano de arriba hacia abajo)
    Previous,
}

impl ScrollAction {
    /// Etiqueta del payload `gesture_update`, `None` se emite como null
    pub fn wire_label(&self) -> Option<&'static str> {
        match self {
            ScrollAction::None => None,
            ScrollAction::Next => Some("SCROLL_DOWN"),
            ScrollAction::Previous => Some("SCROLL_UP"),
        }
    }

    pub fn from_wire_label(label: Option<&str>) -> Option<Self> {
        match label {
            None => Some(ScrollAction::None),
            Some("SCROLL_DOWN") => Some(ScrollAction::Next),
            Some("SCROLL_UP") => Some(ScrollAction::Previous),
            Some(_) => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ScrollAction::None)
    }
}

impl Serialize for ScrollAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.wire_label().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScrollAction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label: Option<String> = Option::deserialize(deserializer)?;
        ScrollAction::from_wire_label(label.as_deref()).ok_or_else(|| {
            serde::de::Error::custom(format!("acción de scroll desconocida: {:?}", label))
        })
    }
}

/// Resultado de un frame: exactamente uno por frame de entrada
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub volume: u8,
    pub scroll: ScrollAction,
}

/// Lado de la línea de referencia donde está la yema del índice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Above,
    Below,
}

/// Región del frame a la que se enruta el gesto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// Margen izquierdo, reservado al volumen
    Volume,
    /// Resto del frame, reservado al scroll
    Gesture,
}
