//! Ordered landmark capture.
//!
//! A [`PickSession`] collects one [`HalfUv`] per landmark, strictly in the
//! order given by its [`PickOrder`]. Each landmark name carries the half it
//! must be picked on: `L_*` on the left half, `R_*` on the right.

use std::fmt;

use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::coords::{FullUv, HalfUv, Side, full_to_half};

/// A named alignment landmark such as `L_inf` or `R_fg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Landmark {
    name: String,
    side: Side,
}

impl Landmark {
    /// Parse a landmark name; the `L_`/`R_` prefix decides its half.
    pub fn parse(name: &str) -> Result<Self> {
        let side = if name.starts_with("L_") {
            Side::Left
        } else if name.starts_with("R_") {
            Side::Right
        } else {
            bail!("landmark '{name}' must start with L_ or R_");
        };
        ensure!(name.len() > 2, "landmark '{name}' needs a name after its prefix");
        Ok(Self {
            name: name.to_owned(),
            side,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for Landmark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

impl<'de> Deserialize<'de> for Landmark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Landmark::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// The fixed capture order for one configured landmark set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickOrder {
    landmarks: Vec<Landmark>,
}

impl PickOrder {
    pub fn new(landmarks: Vec<Landmark>) -> Result<Self> {
        ensure!(!landmarks.is_empty(), "pick order must not be empty");
        for (i, lm) in landmarks.iter().enumerate() {
            ensure!(
                !landmarks[..i].contains(lm),
                "landmark {lm} appears more than once in the pick order"
            );
        }
        Ok(Self { landmarks })
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let landmarks = names
            .iter()
            .map(|n| Landmark::parse(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(landmarks)
    }

    /// Infinity and foreground reference points on both halves.
    pub fn directional() -> Self {
        Self::from_names(&["L_inf", "R_inf", "L_fg", "R_fg"])
            .unwrap_or_else(|_| unreachable!("built-in landmark set is valid"))
    }

    /// One stationary reference point per half.
    pub fn stationary() -> Self {
        Self::from_names(&["L_stat", "R_stat"])
            .unwrap_or_else(|_| unreachable!("built-in landmark set is valid"))
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.landmarks.iter().position(|l| l.name() == name)
    }

    /// First landmark of a half; its pick becomes that half's sampling anchor.
    pub fn anchor_landmark(&self, side: Side) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.side() == side)
    }
}

impl Default for PickOrder {
    fn default() -> Self {
        Self::directional()
    }
}

impl Serialize for PickOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.landmarks.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PickOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let landmarks = Vec::<Landmark>::deserialize(deserializer)?;
        PickOrder::new(landmarks).map_err(serde::de::Error::custom)
    }
}

/// What happened to a submitted point.
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// Stored under `landmark`; `next` is the landmark now pending, if any.
    Stored {
        landmark: Landmark,
        value: HalfUv,
        next: Option<Landmark>,
    },
    /// The point fell on the wrong half; nothing changed.
    WrongHalf { landmark: Landmark, expected: Side },
    /// Every landmark was already captured; nothing changed.
    Complete,
}

impl PickOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, PickOutcome::Stored { .. })
    }

    /// Status line for the host UI.
    pub fn hint(&self) -> String {
        match self {
            PickOutcome::Stored {
                landmark,
                next: Some(next),
                ..
            } => format!("Picked {landmark}. Next: {next}"),
            PickOutcome::Stored { next: None, .. } | PickOutcome::Complete => {
                "All points set.".to_owned()
            }
            PickOutcome::WrongHalf { landmark, expected } => {
                format!("Pick {landmark} on {expected} half.")
            }
        }
    }
}

/// Landmark values collected so far, in capture order.
#[derive(Debug, Clone)]
pub struct PickSession {
    order: PickOrder,
    values: Vec<Option<HalfUv>>,
}

impl PickSession {
    pub fn new(order: PickOrder) -> Self {
        let values = vec![None; order.len()];
        Self { order, values }
    }

    pub fn order(&self) -> &PickOrder {
        &self.order
    }

    /// The first landmark without a value, or `None` once complete.
    pub fn next_pending(&self) -> Option<&Landmark> {
        self.values
            .iter()
            .position(Option::is_none)
            .map(|i| &self.order.landmarks()[i])
    }

    /// Label for the pending landmark, `"complete"` when none is left.
    pub fn next_pending_label(&self) -> &str {
        self.next_pending().map_or("complete", Landmark::name)
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    pub fn submit(&mut self, candidate: FullUv) -> PickOutcome {
        let Some(idx) = self.values.iter().position(Option::is_none) else {
            return PickOutcome::Complete;
        };
        let landmark = self.order.landmarks()[idx].clone();
        let half = full_to_half(candidate.u, candidate.v);
        if half.side != landmark.side() {
            debug!(landmark = %landmark, got = %half.side, "pick rejected: wrong half");
            return PickOutcome::WrongHalf {
                expected: landmark.side(),
                landmark,
            };
        }
        self.values[idx] = Some(half);
        debug!(landmark = %landmark, u = half.u, v = half.v, "pick stored");
        PickOutcome::Stored {
            landmark,
            value: half,
            next: self.next_pending().cloned(),
        }
    }

    pub fn reset(&mut self) {
        self.values = vec![None; self.order.len()];
    }

    pub fn get(&self, name: &str) -> Option<HalfUv> {
        self.order.position(name).and_then(|i| self.values[i])
    }

    /// Captured landmarks in order, skipping unset ones.
    pub fn picked(&self) -> impl Iterator<Item = (&Landmark, HalfUv)> + '_ {
        self.order
            .landmarks()
            .iter()
            .zip(&self.values)
            .filter_map(|(lm, v)| v.map(|v| (lm, v)))
    }

    /// Sampling anchor for a half: its first landmark's pick, else the center.
    pub fn anchor(&self, side: Side) -> HalfUv {
        self.order
            .anchor_landmark(side)
            .and_then(|lm| self.get(lm.name()))
            .unwrap_or(HalfUv::center(side))
    }
}
