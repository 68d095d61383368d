//! Detector de transiciones de scroll.
//!
//! Modo `Crossing`: máquina de estados Above/Below sobre la posición vertical
//! de la yema del índice, con banda muerta alrededor de la línea de referencia
//! (histéresis) y cooldown entre acciones. Modo `Delta`: umbral sobre el
//! desplazamiento vertical entre frames consecutivos.
//!
//! Con el filtro de dirección activo, la mano abierta sólo puede volver atrás
//! y la mano relajada sólo puede avanzar.

use std::time::Duration;
use tracing::debug;

use crate::config::{EngineConfig, ScrollMode};
use crate::engine::EngineState;
use crate::types::{
    planar_distance, Hand, PositionState, ScrollAction, INDEX_TIP, PINKY_TIP, THUMB_TIP, WRIST,
};

/// Apertura de la mano, evaluada frame a frame sin memoria
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandPose {
    /// Pellizco abierto y meñique separado de la muñeca
    Open,
    Relaxed,
}

impl HandPose {
    pub fn from_hand(hand: &Hand, pinch_open_threshold: f32, pinky_spread_threshold: f32) -> Self {
        let pinch = planar_distance(&hand[THUMB_TIP], &hand[INDEX_TIP]);
        let spread = planar_distance(&hand[PINKY_TIP], &hand[WRIST]);
        if pinch > pinch_open_threshold && spread > pinky_spread_threshold {
            HandPose::Open
        } else {
            HandPose::Relaxed
        }
    }

    pub fn permits(&self, action: ScrollAction) -> bool {
        match (self, action) {
            (_, ScrollAction::None) => true,
            (HandPose::Open, ScrollAction::Previous) => true,
            (HandPose::Relaxed, ScrollAction::Next) => true,
            _ => false,
        }
    }
}

/// Lado decisivo de la línea, o `None` dentro de la banda muerta
pub fn classify_band(y: f32, line: f32, half_width: f32) -> Option<PositionState> {
    if y < line - half_width {
        Some(PositionState::Above)
    } else if y > line + half_width {
        Some(PositionState::Below)
    } else {
        None
    }
}

fn cooldown_elapsed(state: &EngineState, now: Duration, cooldown: Duration) -> bool {
    match state.last_action_time {
        None => true,
        Some(last) => now.saturating_sub(last) > cooldown,
    }
}

fn gate_allows(gate: Option<HandPose>, action: ScrollAction) -> bool {
    gate.map_or(true, |pose| pose.permits(action))
}

/// Evalúa un frame en la zona de gestos. `y` debe venir ya recortada a [0,1].
pub fn update_scroll(
    y: f32,
    now: Duration,
    gate: Option<HandPose>,
    config: &EngineConfig,
    state: &mut EngineState,
) -> ScrollAction {
    let action = match config.scroll_mode {
        ScrollMode::Crossing => update_crossing(y, now, gate, config, state),
        ScrollMode::Delta => update_delta(y, now, gate, config, state),
    };
    state.previous_finger_y = Some(y);

    if !action.is_none() {
        state.last_action_time = Some(now);
        debug!(
            "Scroll {:?} (y={:.3}, t={:.3}s, pose={:?})",
            action,
            y,
            now.as_secs_f64(),
            gate
        );
    }
    action
}

fn update_crossing(
    y: f32,
    now: Duration,
    gate: Option<HandPose>,
    config: &EngineConfig,
    state: &mut EngineState,
) -> ScrollAction {
    // Dentro de la banda no se reclasifica
    let Some(side) = classify_band(y, config.scroll_line, config.scroll_dead_band) else {
        return ScrollAction::None;
    };

    let candidate = match (state.position_state, side) {
        (Some(PositionState::Below), PositionState::Above) => ScrollAction::Next,
        (Some(PositionState::Above), PositionState::Below) => ScrollAction::Previous,
        _ => ScrollAction::None,
    };
    state.position_state = Some(side);

    if candidate.is_none()
        || !gate_allows(gate, candidate)
        || !cooldown_elapsed(state, now, config.cooldown())
    {
        return ScrollAction::None;
    }
    candidate
}

fn update_delta(
    y: f32,
    now: Duration,
    gate: Option<HandPose>,
    config: &EngineConfig,
    state: &mut EngineState,
) -> ScrollAction {
    let Some(prev) = state.previous_finger_y else {
        return ScrollAction::None;
    };

    // Mano hacia arriba = avanzar
    let delta = y - prev;
    let candidate = if delta < -config.delta_threshold {
        ScrollAction::Next
    } else if delta > config.delta_threshold {
        ScrollAction::Previous
    } else {
        ScrollAction::None
    };

    if candidate.is_none()
        || !gate_allows(gate, candidate)
        || !cooldown_elapsed(state, now, config.cooldown())
    {
        return ScrollAction::None;
    }
    candidate
}
