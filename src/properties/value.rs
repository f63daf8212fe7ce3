//! Property value sum type and its per-type behaviors.

use std::path::PathBuf;

use glam::{IVec2, IVec3, IVec4, Mat4, Quat, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};

/// Enumeration of property kinds, mirrored one-to-one by the
/// [`PropertyValue`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum PropertyType {
    #[default]
    Empty,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Vec2,
    Vec3,
    Vec4,
    IVec2,
    IVec3,
    IVec4,
    UVec2,
    UVec3,
    UVec4,
    Quat,
    Mat4,
    String,
    String16,
    Path,
}

impl PropertyType {
    /// Converts the wire-form underlying integer back to the enum.
    #[must_use]
    pub fn from_u32(v: u32) -> Option<Self> {
        use PropertyType::*;
        Some(match v {
            0 => Empty,
            1 => Bool,
            2 => I8,
            3 => I16,
            4 => I32,
            5 => I64,
            6 => U8,
            7 => U16,
            8 => U32,
            9 => U64,
            10 => F32,
            11 => F64,
            12 => Vec2,
            13 => Vec3,
            14 => Vec4,
            15 => IVec2,
            16 => IVec3,
            17 => IVec4,
            18 => UVec2,
            19 => UVec3,
            20 => UVec4,
            21 => Quat,
            22 => Mat4,
            23 => String,
            24 => String16,
            25 => Path,
            _ => return None,
        })
    }
}

/// A dynamically typed property value.
///
/// `Empty` is the "no change" sentinel: track evaluation returns it to mean
/// "do not write the property", and the apply loop must skip it rather than
/// substitute a default.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropertyValue {
    #[default]
    Empty,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    IVec2(IVec2),
    IVec3(IVec3),
    IVec4(IVec4),
    UVec2(UVec2),
    UVec3(UVec3),
    UVec4(UVec4),
    Quat(Quat),
    Mat4(Mat4),
    String(String),
    String16(Vec<u16>),
    Path(PathBuf),
}

impl PropertyValue {
    #[must_use]
    pub fn kind(&self) -> PropertyType {
        match self {
            PropertyValue::Empty => PropertyType::Empty,
            PropertyValue::Bool(_) => PropertyType::Bool,
            PropertyValue::I8(_) => PropertyType::I8,
            PropertyValue::I16(_) => PropertyType::I16,
            PropertyValue::I32(_) => PropertyType::I32,
            PropertyValue::I64(_) => PropertyType::I64,
            PropertyValue::U8(_) => PropertyType::U8,
            PropertyValue::U16(_) => PropertyType::U16,
            PropertyValue::U32(_) => PropertyType::U32,
            PropertyValue::U64(_) => PropertyType::U64,
            PropertyValue::F32(_) => PropertyType::F32,
            PropertyValue::F64(_) => PropertyType::F64,
            PropertyValue::Vec2(_) => PropertyType::Vec2,
            PropertyValue::Vec3(_) => PropertyType::Vec3,
            PropertyValue::Vec4(_) => PropertyType::Vec4,
            PropertyValue::IVec2(_) => PropertyType::IVec2,
            PropertyValue::IVec3(_) => PropertyType::IVec3,
            PropertyValue::IVec4(_) => PropertyType::IVec4,
            PropertyValue::UVec2(_) => PropertyType::UVec2,
            PropertyValue::UVec3(_) => PropertyType::UVec3,
            PropertyValue::UVec4(_) => PropertyType::UVec4,
            PropertyValue::Quat(_) => PropertyType::Quat,
            PropertyValue::Mat4(_) => PropertyType::Mat4,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::String16(_) => PropertyType::String16,
            PropertyValue::Path(_) => PropertyType::Path,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, PropertyValue::Empty)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Serialization (compact human-readable form)
    // ────────────────────────────────────────────────────────────────────────

    /// Serializes the value: scalars as decimal, `true`/`false`, vectors as
    /// `[a,b,...]`, strings quoted (one-line assumption, no escaping).
    #[must_use]
    pub fn serialize(&self) -> String {
        fn fvec(components: &[f32]) -> String {
            let joined: Vec<String> = components.iter().map(ToString::to_string).collect();
            format!("[{}]", joined.join(","))
        }
        match self {
            PropertyValue::Empty => String::new(),
            PropertyValue::Bool(v) => v.to_string(),
            PropertyValue::I8(v) => v.to_string(),
            PropertyValue::I16(v) => v.to_string(),
            PropertyValue::I32(v) => v.to_string(),
            PropertyValue::I64(v) => v.to_string(),
            PropertyValue::U8(v) => v.to_string(),
            PropertyValue::U16(v) => v.to_string(),
            PropertyValue::U32(v) => v.to_string(),
            PropertyValue::U64(v) => v.to_string(),
            PropertyValue::F32(v) => v.to_string(),
            PropertyValue::F64(v) => v.to_string(),
            PropertyValue::Vec2(v) => fvec(&v.to_array()),
            PropertyValue::Vec3(v) => fvec(&v.to_array()),
            PropertyValue::Vec4(v) => fvec(&v.to_array()),
            PropertyValue::Quat(v) => fvec(&v.to_array()),
            PropertyValue::Mat4(v) => fvec(&v.to_cols_array()),
            PropertyValue::IVec2(v) => {
                format!("[{},{}]", v.x, v.y)
            }
            PropertyValue::IVec3(v) => format!("[{},{},{}]", v.x, v.y, v.z),
            PropertyValue::IVec4(v) => format!("[{},{},{},{}]", v.x, v.y, v.z, v.w),
            PropertyValue::UVec2(v) => format!("[{},{}]", v.x, v.y),
            PropertyValue::UVec3(v) => format!("[{},{},{}]", v.x, v.y, v.z),
            PropertyValue::UVec4(v) => format!("[{},{},{},{}]", v.x, v.y, v.z, v.w),
            PropertyValue::String(v) => format!("\"{v}\""),
            PropertyValue::String16(v) => {
                format!("\"{}\"", String::from_utf16_lossy(v))
            }
            PropertyValue::Path(v) => format!("\"{}\"", v.display()),
        }
    }

    /// Parses a serialized value as the given type. Returns `None` when the
    /// text does not parse as that type.
    #[must_use]
    pub fn parse(kind: PropertyType, text: &str) -> Option<PropertyValue> {
        let text = text.trim();
        fn components(text: &str) -> Option<Vec<&str>> {
            let inner = text.strip_prefix('[')?.strip_suffix(']')?;
            Some(inner.split(',').map(str::trim).collect())
        }
        fn floats<const N: usize>(text: &str) -> Option<[f32; N]> {
            let parts = components(text)?;
            if parts.len() != N {
                return None;
            }
            let mut out = [0.0f32; N];
            for (slot, part) in out.iter_mut().zip(parts) {
                *slot = part.parse().ok()?;
            }
            Some(out)
        }
        fn ints<T: std::str::FromStr + Copy + Default, const N: usize>(
            text: &str,
        ) -> Option<[T; N]> {
            let parts = components(text)?;
            if parts.len() != N {
                return None;
            }
            let mut out = [T::default(); N];
            for (slot, part) in out.iter_mut().zip(parts) {
                *slot = part.parse().ok()?;
            }
            Some(out)
        }
        fn unquote(text: &str) -> &str {
            text.strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .unwrap_or(text)
        }

        Some(match kind {
            PropertyType::Empty => PropertyValue::Empty,
            PropertyType::Bool => PropertyValue::Bool(match text {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return None,
            }),
            PropertyType::I8 => PropertyValue::I8(text.parse().ok()?),
            PropertyType::I16 => PropertyValue::I16(text.parse().ok()?),
            PropertyType::I32 => PropertyValue::I32(text.parse().ok()?),
            PropertyType::I64 => PropertyValue::I64(text.parse().ok()?),
            PropertyType::U8 => PropertyValue::U8(text.parse().ok()?),
            PropertyType::U16 => PropertyValue::U16(text.parse().ok()?),
            PropertyType::U32 => PropertyValue::U32(text.parse().ok()?),
            PropertyType::U64 => PropertyValue::U64(text.parse().ok()?),
            PropertyType::F32 => PropertyValue::F32(text.parse().ok()?),
            PropertyType::F64 => PropertyValue::F64(text.parse().ok()?),
            PropertyType::Vec2 => PropertyValue::Vec2(Vec2::from_array(floats::<2>(text)?)),
            PropertyType::Vec3 => PropertyValue::Vec3(Vec3::from_array(floats::<3>(text)?)),
            PropertyType::Vec4 => PropertyValue::Vec4(Vec4::from_array(floats::<4>(text)?)),
            PropertyType::Quat => PropertyValue::Quat(Quat::from_array(floats::<4>(text)?)),
            PropertyType::Mat4 => PropertyValue::Mat4(Mat4::from_cols_array(&floats::<16>(text)?)),
            PropertyType::IVec2 => {
                let [x, y] = ints::<i32, 2>(text)?;
                PropertyValue::IVec2(IVec2::new(x, y))
            }
            PropertyType::IVec3 => {
                let [x, y, z] = ints::<i32, 3>(text)?;
                PropertyValue::IVec3(IVec3::new(x, y, z))
            }
            PropertyType::IVec4 => {
                let [x, y, z, w] = ints::<i32, 4>(text)?;
                PropertyValue::IVec4(IVec4::new(x, y, z, w))
            }
            PropertyType::UVec2 => {
                let [x, y] = ints::<u32, 2>(text)?;
                PropertyValue::UVec2(UVec2::new(x, y))
            }
            PropertyType::UVec3 => {
                let [x, y, z] = ints::<u32, 3>(text)?;
                PropertyValue::UVec3(UVec3::new(x, y, z))
            }
            PropertyType::UVec4 => {
                let [x, y, z, w] = ints::<u32, 4>(text)?;
                PropertyValue::UVec4(UVec4::new(x, y, z, w))
            }
            PropertyType::String => PropertyValue::String(unquote(text).to_string()),
            PropertyType::String16 => {
                PropertyValue::String16(unquote(text).encode_utf16().collect())
            }
            PropertyType::Path => PropertyValue::Path(PathBuf::from(unquote(text))),
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Interpolation
    // ────────────────────────────────────────────────────────────────────────

    /// Interpolates between two values of the same kind at eased parameter
    /// `t` in `[0, 1]`.
    ///
    /// Arithmetic scalars and float vectors lerp, quaternions slerp,
    /// matrices decompose into scale/rotation/translation and recompose.
    /// Non-interpolatable kinds step to the nearer keyframe.
    #[must_use]
    pub fn interpolate(a: &PropertyValue, b: &PropertyValue, t: f32) -> PropertyValue {
        fn ilerp<T: Copy + Into<f64>>(a: T, b: T, t: f32) -> f64 {
            let (a, b) = (a.into(), b.into());
            a + (b - a) * f64::from(t)
        }
        match (a, b) {
            (PropertyValue::I8(x), PropertyValue::I8(y)) => {
                PropertyValue::I8(ilerp(*x, *y, t).round() as i8)
            }
            (PropertyValue::I16(x), PropertyValue::I16(y)) => {
                PropertyValue::I16(ilerp(*x, *y, t).round() as i16)
            }
            (PropertyValue::I32(x), PropertyValue::I32(y)) => {
                PropertyValue::I32(ilerp(*x, *y, t).round() as i32)
            }
            (PropertyValue::I64(x), PropertyValue::I64(y)) => {
                let v = *x as f64 + (*y - *x) as f64 * f64::from(t);
                PropertyValue::I64(v.round() as i64)
            }
            (PropertyValue::U8(x), PropertyValue::U8(y)) => {
                PropertyValue::U8(ilerp(*x, *y, t).round() as u8)
            }
            (PropertyValue::U16(x), PropertyValue::U16(y)) => {
                PropertyValue::U16(ilerp(*x, *y, t).round() as u16)
            }
            (PropertyValue::U32(x), PropertyValue::U32(y)) => {
                PropertyValue::U32(ilerp(*x, *y, t).round() as u32)
            }
            (PropertyValue::U64(x), PropertyValue::U64(y)) => {
                let v = *x as f64 + (*y as f64 - *x as f64) * f64::from(t);
                PropertyValue::U64(v.round() as u64)
            }
            (PropertyValue::F32(x), PropertyValue::F32(y)) => {
                PropertyValue::F32(x + (y - x) * t)
            }
            (PropertyValue::F64(x), PropertyValue::F64(y)) => {
                PropertyValue::F64(x + (y - x) * f64::from(t))
            }
            (PropertyValue::Vec2(x), PropertyValue::Vec2(y)) => PropertyValue::Vec2(x.lerp(*y, t)),
            (PropertyValue::Vec3(x), PropertyValue::Vec3(y)) => PropertyValue::Vec3(x.lerp(*y, t)),
            (PropertyValue::Vec4(x), PropertyValue::Vec4(y)) => PropertyValue::Vec4(x.lerp(*y, t)),
            (PropertyValue::Quat(x), PropertyValue::Quat(y)) => {
                PropertyValue::Quat(x.slerp(*y, t))
            }
            (PropertyValue::Mat4(x), PropertyValue::Mat4(y)) => {
                let (sa, ra, ta) = x.to_scale_rotation_translation();
                let (sb, rb, tb) = y.to_scale_rotation_translation();
                PropertyValue::Mat4(Mat4::from_scale_rotation_translation(
                    sa.lerp(sb, t),
                    ra.slerp(rb, t),
                    ta.lerp(tb, t),
                ))
            }
            // Everything else steps to the nearer keyframe.
            _ => {
                if t < 0.5 {
                    a.clone()
                } else {
                    b.clone()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_serialize_parse_round_trip() {
        for v in [
            PropertyValue::Bool(true),
            PropertyValue::I32(-17),
            PropertyValue::U64(9001),
            PropertyValue::F32(2.5),
            PropertyValue::String("hello".into()),
            PropertyValue::Path(PathBuf::from("images/cat.png")),
        ] {
            let text = v.serialize();
            let parsed = PropertyValue::parse(v.kind(), &text).unwrap();
            assert_eq!(parsed, v, "round trip failed for {text}");
        }
    }

    #[test]
    fn vector_serialize_parse_round_trip() {
        let v = PropertyValue::Vec3(Vec3::new(1.0, -2.5, 0.25));
        assert_eq!(v.serialize(), "[1,-2.5,0.25]");
        assert_eq!(PropertyValue::parse(PropertyType::Vec3, "[1, -2.5, 0.25]").unwrap(), v);
    }

    #[test]
    fn mismatched_vector_arity_rejected() {
        assert!(PropertyValue::parse(PropertyType::Vec2, "[1,2,3]").is_none());
    }

    #[test]
    fn quat_interpolation_is_slerp() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_z(std::f32::consts::PI);
        let mid = PropertyValue::interpolate(
            &PropertyValue::Quat(a),
            &PropertyValue::Quat(b),
            0.5,
        );
        let PropertyValue::Quat(q) = mid else {
            panic!("kind changed under interpolation");
        };
        assert!(q.angle_between(a.slerp(b, 0.5)) < 1e-4);
    }

    #[test]
    fn string_steps_to_nearer() {
        let a = PropertyValue::String("a".into());
        let b = PropertyValue::String("b".into());
        assert_eq!(PropertyValue::interpolate(&a, &b, 0.25), a);
        assert_eq!(PropertyValue::interpolate(&a, &b, 0.75), b);
    }
}
