//! 三点夹角计算

use super::joints::{BodySide, JointSet, Point2D};
use serde::{Deserialize, Serialize};

/// 顶点 `b` 处射线 `b→a` 与 `b→c` 的夹角（度），结果折叠到 `[0, 180]`。
///
/// 零长度射线方向未定义，atan2(0, 0) 取 0，结果为 0° 或 180°；
/// 非有限坐标返回 0°，不会产生 NaN。
pub fn angle(a: Point2D, b: Point2D, c: Point2D) -> f32 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut degrees = radians.to_degrees().abs();

    if !degrees.is_finite() {
        return 0.0;
    }
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees.clamp(0.0, 180.0)
}

/// 手臂（肘）和腿部（膝）角度
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LimbAngles {
    pub arm: f32,
    pub leg: f32,
}

impl LimbAngles {
    pub fn new(arm: f32, leg: f32) -> Self {
        Self { arm, leg }
    }

    /// 缺少任一必需关节时返回 None
    pub fn from_joints(joints: &JointSet, side: BodySide) -> Option<Self> {
        let [shoulder, elbow, wrist] = joints.chain(side.arm_chain())?;
        let [hip, knee, ankle] = joints.chain(side.leg_chain())?;

        Some(Self {
            arm: angle(shoulder, elbow, wrist),
            leg: angle(hip, knee, ankle),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pose::joints::Joint;

    fn p(x: f32, y: f32) -> Point2D {
        Point2D::new(x, y)
    }

    #[test]
    fn test_right_angle() {
        let result = angle(p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0));
        assert!((result - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_straight_line() {
        let result = angle(p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0));
        assert!((result - 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_points_are_finite() {
        let folded = angle(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 0.0));
        assert!(folded.is_finite());
        assert!(folded.abs() < 1e-4);

        let coincident = angle(p(1.0, 1.0), p(1.0, 1.0), p(1.0, 1.0));
        assert!(coincident.is_finite());

        let nan = angle(p(f32::NAN, 0.0), p(1.0, 0.0), p(2.0, 0.0));
        assert_eq!(nan, 0.0);
    }

    #[test]
    fn test_range_and_symmetry() {
        let points = [
            p(0.0, 0.0),
            p(1.0, 0.2),
            p(-0.7, 0.4),
            p(0.3, -0.9),
            p(0.5, 0.5),
            p(-1.0, -1.0),
        ];
        for a in points {
            for b in points {
                for c in points {
                    let forward = angle(a, b, c);
                    let backward = angle(c, b, a);
                    assert!((0.0..=180.0).contains(&forward));
                    assert!((forward - backward).abs() < 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_limb_angles_from_joints() {
        let joints = JointSet::new()
            .with(Joint::LeftShoulder, p(0.0, 0.0))
            .with(Joint::LeftElbow, p(1.0, 0.0))
            .with(Joint::LeftWrist, p(1.0, 1.0))
            .with(Joint::LeftHip, p(0.0, 0.0))
            .with(Joint::LeftKnee, p(1.0, 0.0))
            .with(Joint::LeftAnkle, p(2.0, 0.0));

        let angles = LimbAngles::from_joints(&joints, BodySide::Left).unwrap();
        assert!((angles.arm - 90.0).abs() < 1e-4);
        assert!((angles.leg - 180.0).abs() < 1e-4);

        assert!(LimbAngles::from_joints(&joints, BodySide::Right).is_none());
    }
}
