//! Easing functions applied to the normalized keyframe parameter.

use std::f32::consts::PI;

/// Easing kinds, stored per keyframe. The wire form is the underlying
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum EaseType {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
}

impl EaseType {
    #[must_use]
    pub fn from_u32(v: u32) -> Option<Self> {
        use EaseType::*;
        Some(match v {
            0 => Linear,
            1 => EaseIn,
            2 => EaseOut,
            3 => EaseInOut,
            4 => EaseInBack,
            5 => EaseOutBack,
            6 => EaseInOutBack,
            7 => EaseInElastic,
            8 => EaseOutElastic,
            9 => EaseInOutElastic,
            10 => EaseInBounce,
            11 => EaseOutBounce,
            12 => EaseInOutBounce,
            _ => return None,
        })
    }
}

fn out_bounce(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984_375
    }
}

/// Applies the easing curve to `t` in `[0, 1]`.
#[must_use]
pub fn ease(kind: EaseType, t: f32) -> f32 {
    const C1: f32 = 1.701_58;
    const C3: f32 = C1 + 1.0;
    match kind {
        EaseType::Linear => t,
        EaseType::EaseIn => t * t,
        EaseType::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
        EaseType::EaseInOut => {
            if t < 0.5 {
                2.0 * t * t
            } else {
                1.0 - 2.0 * (1.0 - t) * (1.0 - t)
            }
        }
        EaseType::EaseInBack => C3 * t * t * t - C1 * t * t,
        EaseType::EaseOutBack => {
            let mt = t - 1.0;
            let mt2 = mt * mt;
            1.0 + C3 * mt * mt2 + C1 * mt2
        }
        EaseType::EaseInOutBack => {
            let c2 = C1 * 1.525;
            let mt = t * 2.0;
            let mt2 = mt * mt;
            let mtm2 = mt - 2.0;
            if t < 0.5 {
                (mt2 * ((c2 + 1.0) * mt - c2)) / 2.0
            } else {
                (mtm2 * mtm2 * ((c2 + 1.0) * mtm2 + c2) + 2.0) / 2.0
            }
        }
        EaseType::EaseInElastic => {
            let c4 = (2.0 * PI) / 3.0;
            if t == 0.0 {
                0.0
            } else if t == 1.0 {
                1.0
            } else {
                -(2.0f32.powf(10.0 * (t - 1.0))) * ((t - 1.1) * c4).sin()
            }
        }
        EaseType::EaseOutElastic => {
            let c4 = (2.0 * PI) / 3.0;
            if t == 0.0 {
                0.0
            } else if t == 1.0 {
                1.0
            } else {
                2.0f32.powf(-10.0 * t) * ((t - 0.1) * c4).sin() + 1.0
            }
        }
        EaseType::EaseInOutElastic => {
            let c5 = (2.0 * PI) / 4.5;
            if t == 0.0 {
                0.0
            } else if t == 1.0 {
                1.0
            } else if t < 0.5 {
                -(2.0f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0
            } else {
                (2.0f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0 + 1.0
            }
        }
        EaseType::EaseInBounce => 1.0 - out_bounce(1.0 - t),
        EaseType::EaseOutBounce => out_bounce(t),
        EaseType::EaseInOutBounce => {
            if t < 0.5 {
                (1.0 - out_bounce(1.0 - 2.0 * t)) / 2.0
            } else {
                out_bounce(2.0 * t - 1.0) / 2.0 + 0.5
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        for kind in (0..13).map(|i| EaseType::from_u32(i).unwrap()) {
            assert!(ease(kind, 0.0).abs() < 1e-4, "{kind:?} at 0");
            assert!((ease(kind, 1.0) - 1.0).abs() < 1e-4, "{kind:?} at 1");
        }
    }

    #[test]
    fn linear_is_identity() {
        assert_eq!(ease(EaseType::Linear, 0.25), 0.25);
    }
}
