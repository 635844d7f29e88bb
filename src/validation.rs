//! Reading validation: physical-plausibility checks per field.
//!
//! Pure functions only.  The bounds reject sensor glitches (condensation,
//! bus noise) without statistical filtering; supply voltage is never range
//! checked because an odd voltage is itself worth reporting.

use serde::{Deserialize, Serialize};

use crate::sensors::{Field, Reading};

/// How a [`Reading`] is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationPolicy {
    /// Each field must be present and strictly inside its [`Range`].
    Range,
    /// Each field only has to be present.
    PresenceOnly,
    /// All four fields must be present, otherwise nothing is accepted.
    AllOrNothing,
}

/// Open interval `(min, max)`.  Both ends are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains_strict(&self, v: f32) -> bool {
        v > self.min && v < self.max
    }

    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

/// Per-field bounds used by [`ValidationPolicy::Range`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub temperature_c: Range,
    pub humidity_pct: Range,
    pub pressure_hpa: Range,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            temperature_c: Range::new(-20.0, 45.0),
            humidity_pct: Range::new(10.0, 100.0),
            pressure_hpa: Range::new(940.0, 1060.0),
        }
    }
}

impl Bounds {
    /// `None` means the field is unbounded.
    pub fn for_field(&self, field: Field) -> Option<Range> {
        match field {
            Field::Temperature => Some(self.temperature_c),
            Field::Humidity => Some(self.humidity_pct),
            Field::Pressure => Some(self.pressure_hpa),
            Field::SupplyVoltage => None,
        }
    }
}

/// Why a field was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// The sensor did not deliver the field.
    Unavailable,
    /// Value at or beyond the configured bounds.
    OutOfRange,
    /// Field was fine but another one was missing (all-or-nothing).
    IncompleteReading,
}

/// Accepted value or the reason it was dropped.
pub type Verdict = Result<f32, Rejection>;

/// One verdict per [`Field`], indexed by `Field as usize`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdicts([Verdict; Field::COUNT]);

impl Verdicts {
    pub fn get(&self, field: Field) -> Verdict {
        self.0[field as usize]
    }

    pub fn is_accepted(&self, field: Field) -> bool {
        self.get(field).is_ok()
    }

    /// Accepted fields with their values, in publish order.
    pub fn accepted(&self) -> impl Iterator<Item = (Field, f32)> + '_ {
        Field::ALL
            .iter()
            .filter_map(|f| self.get(*f).ok().map(|v| (*f, v)))
    }

    /// Rejected fields with their reasons, in publish order.
    pub fn rejected(&self) -> impl Iterator<Item = (Field, Rejection)> + '_ {
        Field::ALL
            .iter()
            .filter_map(|f| self.get(*f).err().map(|r| (*f, r)))
    }

    pub fn accepted_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_ok()).count()
    }
}

/// Classify every field of `reading` under `policy`.
pub fn validate(reading: &Reading, policy: ValidationPolicy, bounds: &Bounds) -> Verdicts {
    let complete = reading.is_complete();
    let mut out = [Err(Rejection::Unavailable); Field::COUNT];

    for field in Field::ALL {
        let Some(value) = reading.get(field) else {
            continue;
        };
        out[field as usize] = match policy {
            ValidationPolicy::Range => match bounds.for_field(field) {
                Some(range) if !range.contains_strict(value) => Err(Rejection::OutOfRange),
                _ => Ok(value),
            },
            ValidationPolicy::PresenceOnly => Ok(value),
            ValidationPolicy::AllOrNothing if complete => Ok(value),
            ValidationPolicy::AllOrNothing => Err(Rejection::IncompleteReading),
        };
    }

    Verdicts(out)
}
