//! Motor de interpretación de gestos.
//!
//! Compone clasificador de zona, mapeador de volumen y detector de scroll en
//! un `GestureEvent` por frame. El motor es inmutable y puede atender varias
//! sesiones; cada sesión es dueña de su propio `EngineState`.

use std::time::Duration;
use tracing::{debug, trace};

use crate::config::{ConfigError, EngineConfig};
use crate::scroll::{update_scroll, HandPose};
use crate::types::{
    GestureEvent, HandSnapshot, PositionState, ScrollAction, TimedSnapshot, Zone, INDEX_TIP,
    THUMB_TIP,
};
use crate::volume::update_volume;
use crate::zone::classify_zone;

/// Estado persistente de una sesión (una cámara, un usuario)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    /// Volumen retenido fuera de la zona de volumen
    pub locked_volume: u8,
    /// Último lado decisivo de la línea; `None` hasta salir de la banda
    pub position_state: Option<PositionState>,
    /// Instante de la última acción emitida; `None` = infinitamente en el pasado
    pub last_action_time: Option<Duration>,
    /// Posición vertical de la yema en el último frame evaluado
    pub previous_finger_y: Option<f32>,
    /// Zona del último frame con mano
    pub last_zone: Option<Zone>,
}

impl EngineState {
    pub fn new(initial_volume: u8) -> Self {
        Self {
            locked_volume: initial_volume.min(100),
            position_state: None,
            last_action_time: None,
            previous_finger_y: None,
            last_zone: None,
        }
    }
}

pub struct GestureEngine {
    config: EngineConfig,
}

impl GestureEngine {
    /// Valida la configuración: un motor con config inválida no puede existir
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Estado inicial para una sesión nueva
    pub fn new_state(&self) -> EngineState {
        EngineState::new(self.config.initial_volume)
    }

    /// Procesa un frame. `now` es tiempo monotónico desde el inicio de la sesión.
    pub fn step(
        &self,
        snapshot: &HandSnapshot,
        now: Duration,
        state: &mut EngineState,
    ) -> GestureEvent {
        let Some(hand) = snapshot else {
            trace!("Frame sin mano, volumen {}", state.locked_volume);
            return GestureEvent {
                volume: state.locked_volume,
                scroll: ScrollAction::None,
            };
        };

        let fingertip = hand[INDEX_TIP].sanitized();
        let thumb = hand[THUMB_TIP].sanitized();

        let zone = classify_zone(fingertip.x, self.config.volume_zone_width_fraction);
        if state.last_zone != Some(zone) {
            debug!("Zona {:?} -> {:?}", state.last_zone, zone);
            state.last_zone = Some(zone);
        }

        let in_volume_zone = zone == Zone::Volume;
        let volume = update_volume(
            &thumb,
            &fingertip,
            in_volume_zone,
            &self.config.pinch_distance_range,
            state,
        );

        let scroll = if in_volume_zone {
            // Seguimiento suspendido mientras se ajusta el volumen
            if self.config.volume_zone_resets_tracking {
                state.position_state = None;
                state.previous_finger_y = None;
            }
            ScrollAction::None
        } else {
            let gate = if self.config.direction_gating_enabled {
                let hand = hand.map(|lm| lm.sanitized());
                Some(HandPose::from_hand(
                    &hand,
                    self.config.pinch_open_threshold,
                    self.config.pinky_spread_threshold,
                ))
            } else {
                None
            };
            update_scroll(fingertip.y, now, gate, &self.config, state)
        };

        trace!(
            "x={:.3} y={:.3} zona={:?} volumen={} scroll={:?}",
            fingertip.x,
            fingertip.y,
            zone,
            volume,
            scroll
        );

        GestureEvent { volume, scroll }
    }

    /// Procesa una sesión grabada completa con estado nuevo
    pub fn run_session(&self, frames: &[TimedSnapshot]) -> Vec<GestureEvent> {
        let mut state = self.new_state();
        frames
            .iter()
            .map(|frame| self.step(&frame.snapshot, frame.time, &mut state))
            .collect()
    }
}

/// Contadores de una sesión para el resumen final
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: usize,
    pub no_hand_frames: usize,
    pub next: usize,
    pub previous: usize,
    pub final_volume: Option<u8>,
}

impl SessionSummary {
    pub fn observe(&mut self, snapshot: &HandSnapshot, event: &GestureEvent) {
        self.frames += 1;
        if snapshot.is_none() {
            self.no_hand_frames += 1;
        }
        match event.scroll {
            ScrollAction::Next => self.next += 1,
            ScrollAction::Previous => self.previous += 1,
            ScrollAction::None => {}
        }
        self.final_volume = Some(event.volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrollMode;
    use crate::types::{Hand, Landmark, LANDMARK_COUNT};

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    /// Mano con la yema del índice en (x, y) y el pulgar a `pinch` a su izquierda
    fn hand_at(x: f32, y: f32, pinch: f32) -> HandSnapshot {
        let mut hand: Hand = [Landmark::new(x, y + 0.2, 0.0); LANDMARK_COUNT];
        hand[INDEX_TIP] = Landmark::new(x, y, 0.0);
        hand[THUMB_TIP] = Landmark::new(x, y + pinch, 0.0);
        Some(hand)
    }

    fn engine(config: EngineConfig) -> GestureEngine {
        GestureEngine::new(config).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = EngineConfig {
            scroll_cooldown_seconds: -1.0,
            ..EngineConfig::default()
        };
        assert!(GestureEngine::new(config).is_err());
    }

    #[test]
    fn overflowing_cooldown_is_rejected_before_any_step() {
        let config = EngineConfig {
            scroll_cooldown_seconds: 1e20,
            ..EngineConfig::default()
        };
        assert!(matches!(GestureEngine::new(config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn initial_state_is_mid_volume() {
        let engine = engine(EngineConfig::default());
        let state = engine.new_state();
        assert_eq!(state.locked_volume, 50);
        assert_eq!(state.position_state, None);
        assert_eq!(state.last_action_time, None);
        assert_eq!(state.previous_finger_y, None);
    }

    #[test]
    fn no_hand_is_idle_passthrough() {
        let engine = engine(EngineConfig::default());
        let mut state = engine.new_state();
        engine.step(&hand_at(0.1, 0.5, 0.22), secs(0.0), &mut state);
        engine.step(&hand_at(0.6, 0.7, 0.05), secs(0.1), &mut state);
        let before = state.clone();

        let ev = engine.step(&None, secs(0.2), &mut state);
        assert_eq!(
            ev,
            GestureEvent {
                volume: 100,
                scroll: ScrollAction::None
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn pinch_in_volume_zone_sets_volume() {
        let engine = engine(EngineConfig::default());
        let mut state = engine.new_state();
        let ev = engine.step(&hand_at(0.1, 0.4, 0.12), secs(0.0), &mut state);
        assert_eq!(ev.volume, 50);
        assert_eq!(ev.scroll, ScrollAction::None);
    }

    #[test]
    fn volume_locks_outside_zone() {
        let engine = engine(EngineConfig::default());
        let mut state = engine.new_state();
        let ev = engine.step(&hand_at(0.1, 0.4, 0.17), secs(0.0), &mut state);
        assert_eq!(ev.volume, 75);

        for i in 1..20 {
            let pinch = 0.01 * i as f32;
            let ev = engine.step(&hand_at(0.7, 0.3, pinch), secs(0.05 * i as f64), &mut state);
            assert_eq!(ev.volume, 75);
        }

        let ev = engine.step(&hand_at(0.05, 0.3, 0.02), secs(2.0), &mut state);
        assert_eq!(ev.volume, 0);
    }

    #[test]
    fn volume_zone_suspends_scroll() {
        let engine = engine(EngineConfig {
            scroll_cooldown_seconds: 0.0,
            ..EngineConfig::default()
        });
        let mut state = engine.new_state();

        engine.step(&hand_at(0.6, 0.7, 0.05), secs(0.0), &mut state);
        assert_eq!(state.position_state, Some(PositionState::Below));

        // Cruza la línea dentro de la zona de volumen: no hay scroll
        let ev = engine.step(&hand_at(0.1, 0.2, 0.05), secs(0.5), &mut state);
        assert_eq!(ev.scroll, ScrollAction::None);
        assert_eq!(state.position_state, Some(PositionState::Below));
    }

    #[test]
    fn suspended_tracking_resumes_on_exit() {
        let engine = engine(EngineConfig {
            scroll_cooldown_seconds: 0.0,
            ..EngineConfig::default()
        });
        let mut state = engine.new_state();
        engine.step(&hand_at(0.6, 0.7, 0.05), secs(0.0), &mut state);
        engine.step(&hand_at(0.1, 0.2, 0.05), secs(0.5), &mut state);

        let ev = engine.step(&hand_at(0.6, 0.2, 0.05), secs(1.0), &mut state);
        assert_eq!(ev.scroll, ScrollAction::Next);
    }

    #[test]
    fn reset_policy_forgets_side_on_volume_zone() {
        let engine = engine(EngineConfig {
            scroll_cooldown_seconds: 0.0,
            volume_zone_resets_tracking: true,
            ..EngineConfig::default()
        });
        let mut state = engine.new_state();
        engine.step(&hand_at(0.6, 0.7, 0.05), secs(0.0), &mut state);
        engine.step(&hand_at(0.1, 0.2, 0.05), secs(0.5), &mut state);
        assert_eq!(state.position_state, None);
        assert_eq!(state.previous_finger_y, None);

        let ev = engine.step(&hand_at(0.6, 0.2, 0.05), secs(1.0), &mut state);
        assert_eq!(ev.scroll, ScrollAction::None);
        assert_eq!(state.position_state, Some(PositionState::Above));
    }

    #[test]
    fn swipe_scenario_with_cooldown() {
        let engine = engine(EngineConfig {
            scroll_cooldown_seconds: 0.5,
            ..EngineConfig::default()
        });
        let mut state = engine.new_state();

        let ev = engine.step(&hand_at(0.6, 0.6, 0.05), secs(0.0), &mut state);
        assert_eq!(ev.scroll, ScrollAction::None);
        let ev = engine.step(&hand_at(0.6, 0.4, 0.05), secs(0.6), &mut state);
        assert_eq!(ev.scroll, ScrollAction::Next);
        assert_eq!(state.last_action_time, Some(secs(0.6)));

        // Vuelta inmediata: bloqueada por cooldown, pero el lado se actualiza
        let ev = engine.step(&hand_at(0.6, 0.6, 0.05), secs(0.8), &mut state);
        assert_eq!(ev.scroll, ScrollAction::None);
        assert_eq!(state.position_state, Some(PositionState::Below));
    }

    #[test]
    fn direction_gating_uses_current_pose() {
        let engine = engine(EngineConfig {
            scroll_cooldown_seconds: 0.0,
            direction_gating_enabled: true,
            ..EngineConfig::default()
        });
        let mut state = engine.new_state();

        // hand_at deja todos los puntos juntos salvo pulgar e índice: mano relajada
        engine.step(&hand_at(0.6, 0.3, 0.05), secs(0.0), &mut state);
        let ev = engine.step(&hand_at(0.6, 0.7, 0.05), secs(0.1), &mut state);
        assert_eq!(ev.scroll, ScrollAction::None);
        let ev = engine.step(&hand_at(0.6, 0.3, 0.05), secs(0.2), &mut state);
        assert_eq!(ev.scroll, ScrollAction::Next);
    }

    #[test]
    fn nan_landmarks_do_not_fire() {
        let engine = engine(EngineConfig {
            scroll_cooldown_seconds: 0.0,
            ..EngineConfig::default()
        });
        let mut state = engine.new_state();
        engine.step(&hand_at(0.6, 0.7, 0.05), secs(0.0), &mut state);

        let ev = engine.step(&hand_at(f32::NAN, f32::NAN, 0.05), secs(0.1), &mut state);
        assert_eq!(
            ev,
            GestureEvent {
                volume: 50,
                scroll: ScrollAction::None
            }
        );
        assert_eq!(state.position_state, Some(PositionState::Below));
    }

    #[test]
    fn delta_mode_through_engine() {
        let engine = engine(EngineConfig {
            scroll_mode: ScrollMode::Delta,
            ..EngineConfig::default()
        });
        let mut state = engine.new_state();
        engine.step(&hand_at(0.6, 0.8, 0.05), secs(0.0), &mut state);
        let ev = engine.step(&hand_at(0.6, 0.5, 0.05), secs(0.05), &mut state);
        assert_eq!(ev.scroll, ScrollAction::Next);
    }

    #[test]
    fn sessions_do_not_share_state() {
        let engine = engine(EngineConfig::default());
        let mut a = engine.new_state();
        let mut b = engine.new_state();
        engine.step(&hand_at(0.1, 0.5, 0.22), secs(0.0), &mut a);
        let ev = engine.step(&None, secs(0.0), &mut b);
        assert_eq!(a.locked_volume, 100);
        assert_eq!(ev.volume, 50);
    }

    #[test]
    fn summary_counts_actions_and_gaps() {
        let engine = engine(EngineConfig::default());
        let frames = vec![
            TimedSnapshot {
                time: secs(0.0),
                snapshot: hand_at(0.6, 0.8, 0.05),
            },
            TimedSnapshot {
                time: secs(0.1),
                snapshot: hand_at(0.6, 0.2, 0.05),
            },
            TimedSnapshot {
                time: secs(0.2),
                snapshot: None,
            },
            TimedSnapshot {
                time: secs(1.5),
                snapshot: hand_at(0.6, 0.8, 0.05),
            },
        ];
        let events = engine.run_session(&frames);

        let mut summary = SessionSummary::default();
        for (frame, ev) in frames.iter().zip(&events) {
            summary.observe(&frame.snapshot, ev);
        }
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.no_hand_frames, 1);
        assert_eq!(summary.next, 1);
        assert_eq!(summary.previous, 1);
        assert_eq!(summary.final_volume, Some(50));
    }
}
