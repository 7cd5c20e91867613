//! Mathematical types shared between client and server.
//!
//! These are the canonical representations used in the movement protocol.
//! [`Spatial`] abstracts over the 3D and 2D backends so the sync engine,
//! the codec and the drift validator are written once.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Lengths below this are treated as zero when normalizing.
const NORMALIZE_EPSILON: f32 = 1e-6;

/// 3D Vector - position, velocity, direction
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component (up)
    pub y: f32,
    /// Z component (forward)
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit X vector (right)
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit Y vector (up)
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit Z vector (forward)
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Returns the same vector with a different Y component.
    #[must_use]
    pub const fn with_y(self, y: f32) -> Self {
        Self::new(self.x, y, self.z)
    }

    /// Unit-length copy, or zero for degenerate vectors.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len <= NORMALIZE_EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// 2D Vector - top-down positions and facing directions
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Unit-length copy, or zero for degenerate vectors.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len <= NORMALIZE_EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned bounds in a backend's dimensionality.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds<S> {
    /// Minimum corner.
    pub min: S,
    /// Maximum corner.
    pub max: S,
}

impl<S: Spatial> Bounds<S> {
    /// Creates bounds from a center and half extents.
    #[must_use]
    pub fn from_center(center: S, half_extents: S) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Center of the bounds.
    #[must_use]
    pub fn center(&self) -> S {
        self.min.lerp(self.max, 0.5)
    }
}

/// Wraps an angle in degrees into `[0, 360)`.
#[must_use]
pub fn normalize_angle(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Shortest signed difference `to - from` in degrees, in `[-180, 180]`.
#[must_use]
pub fn delta_angle(from: f32, to: f32) -> f32 {
    let mut delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Position type a movement backend works in.
///
/// `Vec3` backends measure drift on the XZ plane and face with a Y angle;
/// `Vec2` backends measure on XY and face with a direction vector.
pub trait Spatial:
    Copy
    + Default
    + PartialEq
    + fmt::Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f32, Output = Self>
{
    /// Orientation representation.
    type Facing: Copy + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// The origin.
    const ZERO: Self;

    /// Euclidean length.
    fn length(self) -> f32;

    /// Drops the vertical component (identity in 2D).
    #[must_use]
    fn planar(self) -> Self;

    /// Unit-length copy, or zero for degenerate vectors.
    #[must_use]
    fn normalize_or_zero(self) -> Self;

    /// Maps a 3D force direction into this space.
    fn from_vec3(v: Vec3) -> Self;

    /// Lifts this vector into 3D (force directions are always 3D on the wire).
    fn to_vec3(self) -> Vec3;

    /// Facing of a freshly spawned entity.
    fn default_facing() -> Self::Facing;

    /// Facing angle in degrees, `[0, 360)`.
    fn facing_angle(facing: Self::Facing) -> f32;

    /// Facing for an angle in degrees.
    fn facing_from_angle(degrees: f32) -> Self::Facing;

    /// Unit direction the facing points at, on the movement plane.
    fn facing_direction(facing: Self::Facing) -> Self;

    /// Distance measured on the movement plane.
    fn planar_distance(self, other: Self) -> f32 {
        (self - other).planar().length()
    }

    /// Linear interpolation.
    #[must_use]
    fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Facing that looks along `direction`, if it has a planar component.
    fn facing_from_direction(direction: Self) -> Option<Self::Facing> {
        let planar = direction.planar();
        if planar.length() <= NORMALIZE_EPSILON {
            return None;
        }
        Some(Self::facing_from_angle(Self::direction_angle(planar)))
    }

    /// Angle in degrees of a planar direction, in the facing convention.
    fn direction_angle(direction: Self) -> f32;

    /// Rotates `current` toward `target` by at most `max_degrees`.
    fn rotate_facing_towards(
        current: Self::Facing,
        target: Self::Facing,
        max_degrees: f32,
    ) -> Self::Facing {
        let from = Self::facing_angle(current);
        let delta = delta_angle(from, Self::facing_angle(target));
        if delta.abs() <= max_degrees {
            target
        } else {
            Self::facing_from_angle(from + delta.signum() * max_degrees)
        }
    }
}

impl Spatial for Vec3 {
    /// Y angle in degrees; 0 looks along +Z, 90 along +X.
    type Facing = f32;

    const ZERO: Self = Vec3::ZERO;

    fn length(self) -> f32 {
        Vec3::length(self)
    }

    fn planar(self) -> Self {
        self.with_y(0.0)
    }

    fn normalize_or_zero(self) -> Self {
        Vec3::normalize_or_zero(self)
    }

    fn from_vec3(v: Vec3) -> Self {
        v
    }

    fn to_vec3(self) -> Vec3 {
        self
    }

    fn default_facing() -> f32 {
        0.0
    }

    fn facing_angle(facing: f32) -> f32 {
        normalize_angle(facing)
    }

    fn facing_from_angle(degrees: f32) -> f32 {
        normalize_angle(degrees)
    }

    fn facing_direction(facing: f32) -> Self {
        let radians = facing.to_radians();
        Vec3::new(radians.sin(), 0.0, radians.cos())
    }

    fn direction_angle(direction: Self) -> f32 {
        normalize_angle(direction.x.atan2(direction.z).to_degrees())
    }
}

impl Spatial for Vec2 {
    /// Unit direction; angle measured counter-clockwise from +X.
    type Facing = Vec2;

    const ZERO: Self = Vec2::ZERO;

    fn length(self) -> f32 {
        Vec2::length(self)
    }

    fn planar(self) -> Self {
        self
    }

    fn normalize_or_zero(self) -> Self {
        Vec2::normalize_or_zero(self)
    }

    fn from_vec3(v: Vec3) -> Self {
        Vec2::new(v.x, v.y)
    }

    fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, 0.0)
    }

    fn default_facing() -> Vec2 {
        Vec2::new(0.0, -1.0)
    }

    fn facing_angle(facing: Vec2) -> f32 {
        Self::direction_angle(facing)
    }

    fn facing_from_angle(degrees: f32) -> Vec2 {
        let radians = degrees.to_radians();
        Vec2::new(radians.cos(), radians.sin())
    }

    fn facing_direction(facing: Vec2) -> Self {
        facing.normalize_or_zero()
    }

    fn direction_angle(direction: Self) -> f32 {
        normalize_angle(direction.y.atan2(direction.x).to_degrees())
    }
}
