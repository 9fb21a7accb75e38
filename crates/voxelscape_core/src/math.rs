//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation state uses fixed-point arithmetic so that two runs fed
//! the same commands and seed produce bit-identical results. Floats only
//! appear at the edges (config files, JSON protocol) and are converted once.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point point on the ground plane.
///
/// The rendering layer owns height; the simulation only tracks `x` and `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Z coordinate.
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-edited fixed-point values.
///
/// Config files carry decimals (`1.8`), not raw bits. The conversion
/// happens once at load time, so the simulation still only sees `Fixed`.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a decimal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} is out of fixed-point range")))
    }
}

/// Decimal serde for points in config files.
pub mod vec2_decimal {
    use super::{Fixed, Vec2Fixed};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Point {
        x: f64,
        z: f64,
    }

    /// Serialize a point as `(x: .., z: ..)` decimals.
    pub fn serialize<S>(value: &Vec2Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Point {
            x: value.x.to_num(),
            z: value.z.to_num(),
        }
        .serialize(serializer)
    }

    /// Deserialize a point from decimals.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec2Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let point = Point::deserialize(deserializer)?;
        match (Fixed::checked_from_num(point.x), Fixed::checked_from_num(point.z)) {
            (Some(x), Some(z)) => Ok(Vec2Fixed::new(x, z)),
            _ => Err(serde::de::Error::custom("point is out of fixed-point range")),
        }
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, z: Fixed) -> Self {
        Self { x, z }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, z: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(z))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let d = self - other;
        d.dot(d)
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        (other - self).length()
    }

    /// Euclidean length.
    ///
    /// Components are divided by the larger magnitude before squaring, so
    /// the result stays exact for vectors whose squared length would
    /// saturate.
    #[must_use]
    pub fn length(self) -> Fixed {
        let Some((unit, magnitude)) = self.unit_box() else {
            return Fixed::ZERO;
        };
        magnitude.saturating_mul(fixed_sqrt(unit.dot(unit)))
    }

    /// `self` scaled so its larger component has magnitude 1, paired with
    /// that magnitude. `None` for the zero vector.
    fn unit_box(self) -> Option<(Self, Fixed)> {
        let magnitude = self.x.saturating_abs().max(self.z.saturating_abs());
        if magnitude == Fixed::ZERO {
            return None;
        }
        Some((Self::new(self.x / magnitude, self.z / magnitude), magnitude))
    }

    /// Whether `other` lies strictly closer than `radius`.
    #[must_use]
    pub fn is_within(self, other: Self, radius: Fixed) -> bool {
        self.distance_squared(other) < radius.saturating_mul(radius)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.z.saturating_mul(other.z))
    }

    /// Scale both components.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x.saturating_mul(factor), self.z.saturating_mul(factor))
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let Some((unit, _)) = self.unit_box() else {
            return Self::ZERO;
        };

        // `unit` has length in [1, sqrt(2)], so the division is safe.
        let len = fixed_sqrt(unit.dot(unit));
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(unit.x / len, unit.z / len)
    }

    /// Step from `self` toward `target` by at most `max_step`.
    ///
    /// Never overshoots: when the remaining distance is within `max_step`
    /// the target itself is returned.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        let remaining = self.distance(target);
        if remaining <= max_step {
            return target;
        }
        self + (target - self).normalize().scale(max_step)
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) { value } else { Fixed::from_num(1) };

    for _ in 0..48 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Integer square root: the largest `r` with `r * r <= n`.
#[must_use]
pub const fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }

    // Newton's method from an over-estimate converges monotonically down.
    let mut x = n;
    let mut y = (x >> 1) + (x & 1);
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x.saturating_add(rhs.x),
            z: self.z.saturating_add(rhs.z),
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x.saturating_sub(rhs.x),
            z: self.z.saturating_sub(rhs.z),
        }
    }
}
