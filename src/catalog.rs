//! Target catalog: the ordered list of surveyed 2-D targets.
//!
//! Loaded once at startup from the parameter namespace
//! (`<prefix>1`, `<prefix>2`, ...). Every entry must be present and hold
//! exactly two numbers; anything else is a fatal configuration error.

use crate::error::{NavError, Result};
use crate::params::ParameterSource;

/// A single 2-D navigation target in the map frame.
///
/// Orientation is implicitly identity; the sequencer never controls heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub x: f64,
    pub y: f64,
}

impl Target {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to a point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// Ordered, immutable sequence of targets.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetCatalog {
    targets: Vec<Target>,
}

impl TargetCatalog {
    /// Build a catalog from already-validated targets.
    ///
    /// An empty list is rejected: there would be nothing to sequence.
    pub fn new(targets: Vec<Target>) -> Result<Self> {
        if targets.is_empty() {
            return Err(NavError::Config("target catalog is empty".into()));
        }
        Ok(Self { targets })
    }

    /// Load `count` targets named `<prefix>1 ..= <prefix>count`.
    pub fn load(source: &dyn ParameterSource, prefix: &str, count: usize) -> Result<Self> {
        let mut targets = Vec::with_capacity(count);

        for i in 1..=count {
            let name = format!("{}{}", prefix, i);
            let value = source
                .get(&name)
                .ok_or_else(|| NavError::Config(format!("missing target parameter '{}'", name)))?;
            let target = parse_target(&name, value)?;
            tracing::debug!("Loaded {} = ({:.3}, {:.3})", name, target.x, target.y);
            targets.push(target);
        }

        Self::new(targets)
    }

    /// Target at `cursor`.
    pub fn current(&self, cursor: usize) -> Result<&Target> {
        self.targets.get(cursor).ok_or(NavError::IndexOutOfRange {
            index: cursor,
            len: self.targets.len(),
        })
    }

    /// Next cursor position. Callers check [`Self::is_exhausted`] before
    /// indexing with the result.
    pub fn advance(cursor: usize) -> usize {
        cursor + 1
    }

    /// Cursor has moved past the last target.
    pub fn is_exhausted(&self, cursor: usize) -> bool {
        cursor >= self.targets.len()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }
}

fn parse_target(name: &str, value: &toml::Value) -> Result<Target> {
    let items = value.as_array().ok_or_else(|| {
        NavError::Config(format!(
            "target parameter '{}' must be a list [x, y], got {}",
            name,
            value.type_str()
        ))
    })?;

    if items.len() != 2 {
        return Err(NavError::Config(format!(
            "target parameter '{}' must hold exactly 2 numbers, got {}",
            name,
            items.len()
        )));
    }

    let coord = |v: &toml::Value| -> Result<f64> {
        let n = match v {
            toml::Value::Float(f) => *f,
            toml::Value::Integer(i) => *i as f64,
            other => {
                return Err(NavError::Config(format!(
                    "target parameter '{}' has non-numeric entry {}",
                    name, other
                )));
            }
        };
        if !n.is_finite() {
            return Err(NavError::Config(format!(
                "target parameter '{}' has non-finite entry {}",
                name, n
            )));
        }
        Ok(n)
    };

    Ok(Target::new(coord(&items[0])?, coord(&items[1])?))
}
