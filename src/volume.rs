use crate::config::PinchRange;
use crate::engine::EngineState;
use crate::types::{planar_distance, Landmark};

/// Convierte una distancia de pellizco en un nivel 0..100.
/// Distancias no finitas cuentan como ratio 0.
pub fn volume_for_distance(distance: f32, range: &PinchRange) -> u8 {
    let span = range.max_dist - range.min_dist;
    let ratio = (distance - range.min_dist) / span;
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (ratio * 100.0).round() as u8
}

/// Actualiza el volumen bloqueado sólo dentro de la zona de volumen.
/// Fuera de ella devuelve el último valor sin tocarlo.
pub fn update_volume(
    thumb: &Landmark,
    index: &Landmark,
    in_volume_zone: bool,
    range: &PinchRange,
    state: &mut EngineState,
) -> u8 {
    if in_volume_zone {
        let distance = planar_distance(thumb, index);
        state.locked_volume = volume_for_distance(distance, range);
    }
    state.locked_volume
}
