use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuración inválida: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Rango de distancias de pellizco (normalizadas) que se mapea a 0..100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinchRange {
    /// Dedos juntos
    pub min_dist: f32,
    /// Dedos abiertos
    pub max_dist: f32,
}

impl Default for PinchRange {
    fn default() -> Self {
        Self {
            min_dist: 0.02,
            max_dist: 0.22,
        }
    }
}

/// Variante de detección de scroll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollMode {
    /// Cruce de la línea de referencia con banda muerta
    #[default]
    Crossing,
    /// Desplazamiento vertical entre frames consecutivos
    Delta,
}

/// Parámetros del motor. Se valida al construir el `GestureEngine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fracción del ancho reservada a la zona de volumen (default: 0.20)
    pub volume_zone_width_fraction: f32,
    pub pinch_distance_range: PinchRange,
    /// Volumen antes de la primera medición (default: 50)
    pub initial_volume: u8,
    pub scroll_mode: ScrollMode,
    /// Línea de referencia vertical (default: 0.5)
    pub scroll_line: f32,
    /// Semi-ancho de la banda muerta alrededor de la línea (default: 0.05)
    pub scroll_dead_band: f32,
    /// Tiempo mínimo entre dos acciones de scroll (default: 1.0 s)
    pub scroll_cooldown_seconds: f64,
    /// Desplazamiento mínimo por frame en modo delta (default: 0.15)
    pub delta_threshold: f32,
    /// Si entrar en la zona de volumen olvida la posición previa (default: false)
    pub volume_zone_resets_tracking: bool,
    /// Filtra la dirección permitida según la apertura de la mano
    pub direction_gating_enabled: bool,
    pub pinch_open_threshold: f32,
    pub pinky_spread_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume_zone_width_fraction: 0.20,
            pinch_distance_range: PinchRange::default(),
            initial_volume: 50,
            scroll_mode: ScrollMode::Crossing,
            scroll_line: 0.5,
            scroll_dead_band: 0.05,
            scroll_cooldown_seconds: 1.0,
            delta_threshold: 0.15,
            volume_zone_resets_tracking: false,
            direction_gating_enabled: false,
            pinch_open_threshold: 0.1,
            pinky_spread_threshold: 0.15,
        }
    }
}

impl EngineConfig {
    /// Devuelve el primer campo fuera de rango, si lo hay
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.volume_zone_width_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "volume_zone_width_fraction debe estar en (0, 1), recibido {}",
                fraction
            )));
        }

        let PinchRange { min_dist, max_dist } = self.pinch_distance_range;
        if !min_dist.is_finite() || !max_dist.is_finite() || min_dist < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "pinch_distance_range debe ser finito y no negativo, recibido [{}, {}]",
                min_dist, max_dist
            )));
        }
        if min_dist >= max_dist {
            return Err(ConfigError::Invalid(format!(
                "min_dist ({}) debe ser menor que max_dist ({})",
                min_dist, max_dist
            )));
        }

        if self.initial_volume > 100 {
            return Err(ConfigError::Invalid(format!(
                "initial_volume debe estar en [0, 100], recibido {}",
                self.initial_volume
            )));
        }

        let line = self.scroll_line;
        if !(line > 0.0 && line < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "scroll_line debe estar en (0, 1), recibido {}",
                line
            )));
        }
        let band = self.scroll_dead_band;
        if !(band >= 0.0 && band < line.min(1.0 - line)) {
            return Err(ConfigError::Invalid(format!(
                "scroll_dead_band debe estar en [0, {}), recibido {}",
                line.min(1.0 - line),
                band
            )));
        }

        let cooldown = self.scroll_cooldown_seconds;
        if Duration::try_from_secs_f64(cooldown).is_err() {
            return Err(ConfigError::Invalid(format!(
                "scroll_cooldown_seconds debe ser >= 0 y representable, recibido {}",
                cooldown
            )));
        }

        if !(self.delta_threshold > 0.0) || !self.delta_threshold.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "delta_threshold debe ser > 0, recibido {}",
                self.delta_threshold
            )));
        }

        for (name, value) in [
            ("pinch_open_threshold", self.pinch_open_threshold),
            ("pinky_spread_threshold", self.pinky_spread_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} debe ser finito y >= 0, recibido {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Cooldown como `Duration`. Fuera de rango satura a `Duration::MAX`.
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.scroll_cooldown_seconds).unwrap_or(Duration::MAX)
    }

    /// Carga y valida una configuración JSON. Campos ausentes toman el default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_volume, 50);
        assert_eq!(config.cooldown(), Duration::from_secs(1));
    }

    #[test]
    fn rejects_inverted_pinch_range() {
        let config = EngineConfig {
            pinch_distance_range: PinchRange {
                min_dist: 0.3,
                max_dist: 0.3,
            },
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_negative_cooldown() {
        let config = EngineConfig {
            scroll_cooldown_seconds: -0.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            scroll_cooldown_seconds: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zone_fraction_out_of_range() {
        for fraction in [0.0, 1.0, -0.1, f32::NAN] {
            let config = EngineConfig {
                volume_zone_width_fraction: fraction,
                ..EngineConfig::default()
            };
            assert!(config.validate().is_err(), "fraction {} aceptada", fraction);
        }
    }

    #[test]
    fn rejects_dead_band_wider_than_frame() {
        let config = EngineConfig {
            scroll_line: 0.8,
            scroll_dead_band: 0.25,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_cooldown_beyond_duration_range() {
        for cooldown in [1e20, f64::INFINITY, f64::NAN, -0.5] {
            let config = EngineConfig {
                scroll_cooldown_seconds: cooldown,
                ..EngineConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "cooldown {} aceptado",
                cooldown
            );
        }
    }

    #[test]
    fn cooldown_never_panics_on_unvalidated_config() {
        let config = EngineConfig {
            scroll_cooldown_seconds: 1e20,
            ..EngineConfig::default()
        };
        assert_eq!(config.cooldown(), Duration::MAX);
    }

    #[test]
    fn zero_dead_band_is_allowed() {
        let config = EngineConfig {
            scroll_dead_band: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"scroll_mode": "delta", "pinch_distance_range": {"min_dist": 0.05, "max_dist": 0.3}}"#,
        )
        .unwrap();
        assert_eq!(config.scroll_mode, ScrollMode::Delta);
        assert_eq!(config.pinch_distance_range.max_dist, 0.3);
        assert_eq!(config.volume_zone_width_fraction, 0.20);
        assert!(!config.direction_gating_enabled);
    }

    #[test]
    fn json_output_roundtrips() {
        let config = EngineConfig {
            direction_gating_enabled: true,
            ..EngineConfig::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"scroll_mode\": \"crossing\""));
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
