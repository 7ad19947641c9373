//! Minimal 3D math for rig evaluation: vectors, quaternions, TRS transforms.
//!
//! Rigweave keeps its own small math layer rather than pulling in a geometry
//! crate: pose math only needs component access, composition, slerp and an
//! euler decomposition for per-axis rotation copies.

use crate::foundation::error::{RigError, RigResult};

/// 3D vector with `f64` components.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// All-zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// All-one vector (identity scale).
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Build from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise addition.
    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    /// Component-wise subtraction.
    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    /// Uniform scale.
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Dot product.
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Linear interpolation, `t` unclamped.
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        self.add(rhs.sub(self).scale(t))
    }
}

/// Unit quaternion (x, y, z, w) representing a rotation.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Quat {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
    /// Scalar component.
    pub w: f64,
}

impl Quat {
    /// Identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation of `angle_rad` around `axis`. Fails on a zero-length axis.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f64) -> RigResult<Self> {
        let len = axis.length();
        if len <= f64::EPSILON {
            return Err(RigError::binding("rotation axis must be non-zero"));
        }
        let half = angle_rad * 0.5;
        let s = half.sin() / len;
        Ok(Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: half.cos(),
        })
    }

    /// Normalize to unit length; identity when degenerate.
    pub fn normalized(self) -> Self {
        let n = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if n <= f64::EPSILON {
            return Self::IDENTITY;
        }
        Self {
            x: self.x / n,
            y: self.y / n,
            z: self.z / n,
            w: self.w / n,
        }
    }

    /// Hamilton product `self * rhs` (apply `rhs` first).
    pub fn mul(self, rhs: Self) -> Self {
        Self {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }

    /// Spherical linear interpolation, `t` in `[0, 1]`, shortest arc.
    pub fn slerp(self, rhs: Self, t: f64) -> Self {
        let mut b = rhs;
        let mut cos = self.x * b.x + self.y * b.y + self.z * b.z + self.w * b.w;
        if cos < 0.0 {
            cos = -cos;
            b = Self {
                x: -b.x,
                y: -b.y,
                z: -b.z,
                w: -b.w,
            };
        }
        // Near-parallel quaternions fall back to nlerp.
        if cos > 1.0 - 1e-9 {
            return Self {
                x: self.x + (b.x - self.x) * t,
                y: self.y + (b.y - self.y) * t,
                z: self.z + (b.z - self.z) * t,
                w: self.w + (b.w - self.w) * t,
            }
            .normalized();
        }
        let theta = cos.clamp(-1.0, 1.0).acos();
        let sin = theta.sin();
        let wa = ((1.0 - t) * theta).sin() / sin;
        let wb = (t * theta).sin() / sin;
        Self {
            x: self.x * wa + b.x * wb,
            y: self.y * wa + b.y * wb,
            z: self.z * wa + b.z * wb,
            w: self.w * wa + b.w * wb,
        }
        .normalized()
    }

    /// Intrinsic XYZ euler angles (radians) of this rotation.
    pub fn to_euler_xyz(self) -> Vec3 {
        let q = self.normalized();
        let sinp = 2.0 * (q.w * q.y - q.z * q.x);
        let pitch = if sinp.abs() >= 1.0 {
            std::f64::consts::FRAC_PI_2.copysign(sinp)
        } else {
            sinp.asin()
        };
        Vec3::new(
            (2.0 * (q.w * q.x + q.y * q.z)).atan2(1.0 - 2.0 * (q.x * q.x + q.y * q.y)),
            pitch,
            (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z)),
        )
    }

    /// Rotation from intrinsic XYZ euler angles (radians).
    pub fn from_euler_xyz(e: Vec3) -> Self {
        let (sx, cx) = (e.x * 0.5).sin_cos();
        let (sy, cy) = (e.y * 0.5).sin_cos();
        let (sz, cz) = (e.z * 0.5).sin_cos();
        Self {
            x: sx * cy * cz - cx * sy * sz,
            y: cx * sy * cz + sx * cy * sz,
            z: cx * cy * sz - sx * sy * cz,
            w: cx * cy * cz + sx * sy * sz,
        }
        .normalized()
    }
}

/// Translation/rotation/scale transform of one bone.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform {
    /// Translation.
    pub translation: Vec3,
    /// Rotation.
    pub rotation: Quat,
    /// Non-uniform scale.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Component-wise blend: translation/scale lerp, rotation slerp.
    pub fn blend(self, rhs: Self, t: f64) -> Self {
        Self {
            translation: self.translation.lerp(rhs.translation, t),
            rotation: self.rotation.slerp(rhs.rotation, t),
            scale: self.scale.lerp(rhs.scale, t),
        }
    }
}
