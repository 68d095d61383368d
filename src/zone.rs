use crate::types::Zone;

/// Clasifica la posición horizontal de la yema del índice.
/// La zona de volumen ocupa el margen izquierdo `[0, width_fraction)`.
/// Entradas fuera de [0,1] se recortan; NaN cuenta como centro del frame.
pub fn classify_zone(fingertip_x: f32, width_fraction: f32) -> Zone {
    let x = if fingertip_x.is_nan() {
        0.5
    } else {
        fingertip_x.clamp(0.0, 1.0)
    };

    if x < width_fraction {
        Zone::Volume
    } else {
        Zone::Gesture
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_margin_is_volume_zone() {
        assert_eq!(classify_zone(0.05, 0.2), Zone::Volume);
        assert_eq!(classify_zone(0.19, 0.2), Zone::Volume);
    }

    #[test]
    fn boundary_belongs_to_gesture_zone() {
        assert_eq!(classify_zone(0.2, 0.2), Zone::Gesture);
        assert_eq!(classify_zone(0.9, 0.2), Zone::Gesture);
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(classify_zone(-0.4, 0.2), Zone::Volume);
        assert_eq!(classify_zone(3.0, 0.2), Zone::Gesture);
        assert_eq!(classify_zone(f32::NAN, 0.2), Zone::Gesture);
    }
}
