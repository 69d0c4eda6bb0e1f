//! 关节点模型
//!
//! 坐标默认为归一化图像坐标 `[0,1]`，同一条流水线内必须保持一致。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// MediaPipe Pose 33 点索引
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

pub const LANDMARK_COUNT: usize = 33;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Joint {
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub const ALL: [Joint; 12] = [
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    pub fn landmark_index(self) -> usize {
        match self {
            Joint::LeftShoulder => LEFT_SHOULDER,
            Joint::RightShoulder => RIGHT_SHOULDER,
            Joint::LeftElbow => LEFT_ELBOW,
            Joint::RightElbow => RIGHT_ELBOW,
            Joint::LeftWrist => LEFT_WRIST,
            Joint::RightWrist => RIGHT_WRIST,
            Joint::LeftHip => LEFT_HIP,
            Joint::RightHip => RIGHT_HIP,
            Joint::LeftKnee => LEFT_KNEE,
            Joint::RightKnee => RIGHT_KNEE,
            Joint::LeftAnkle => LEFT_ANKLE,
            Joint::RightAnkle => RIGHT_ANKLE,
        }
    }
}

/// 参与计数的身体侧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodySide {
    #[default]
    Left,
    Right,
}

impl BodySide {
    /// 肩 - 肘 - 腕
    pub fn arm_chain(self) -> [Joint; 3] {
        match self {
            BodySide::Left => [Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist],
            BodySide::Right => [Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist],
        }
    }

    /// 髋 - 膝 - 踝
    pub fn leg_chain(self) -> [Joint; 3] {
        match self {
            BodySide::Left => [Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle],
            BodySide::Right => [Joint::RightHip, Joint::RightKnee, Joint::RightAnkle],
        }
    }
}

/// 宿主侧传入的单个关键点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseLandmark {
    pub x: f32,
    pub y: f32,
    pub visibility: f32,
}

/// 单帧检测到的关节点集合，用完即弃
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointSet {
    points: HashMap<Joint, Point2D>,
}

impl JointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, joint: Joint, point: Point2D) -> Self {
        self.insert(joint, point);
        self
    }

    pub fn insert(&mut self, joint: Joint, point: Point2D) {
        self.points.insert(joint, point);
    }

    pub fn get(&self, joint: Joint) -> Option<Point2D> {
        self.points.get(&joint).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 三个关节全部存在时返回坐标
    pub fn chain(&self, joints: [Joint; 3]) -> Option<[Point2D; 3]> {
        Some([
            self.get(joints[0])?,
            self.get(joints[1])?,
            self.get(joints[2])?,
        ])
    }

    /// 从 33 点 landmark 列表构建，丢弃可见度低于阈值或坐标非法的点
    pub fn from_landmarks(landmarks: &[PoseLandmark], min_visibility: f32) -> Self {
        let mut set = Self::new();
        for joint in Joint::ALL {
            let Some(lm) = landmarks.get(joint.landmark_index()) else {
                continue;
            };
            if lm.visibility < min_visibility || !lm.x.is_finite() || !lm.y.is_finite() {
                continue;
            }
            set.insert(joint, Point2D::new(lm.x, lm.y));
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmarks_with(indices: &[usize], visibility: f32) -> Vec<PoseLandmark> {
        let mut list = vec![PoseLandmark::default(); LANDMARK_COUNT];
        for &i in indices {
            list[i] = PoseLandmark {
                x: i as f32 / 100.0,
                y: 0.5,
                visibility,
            };
        }
        list
    }

    #[test]
    fn test_chain_requires_all_joints() {
        let set = JointSet::new()
            .with(Joint::LeftShoulder, Point2D::new(0.0, 0.0))
            .with(Joint::LeftElbow, Point2D::new(1.0, 0.0));

        assert!(set.chain(BodySide::Left.arm_chain()).is_none());

        let set = set.with(Joint::LeftWrist, Point2D::new(2.0, 0.0));
        let chain = set.chain(BodySide::Left.arm_chain()).unwrap();
        assert_eq!(chain[2], Point2D::new(2.0, 0.0));
    }

    #[test]
    fn test_from_landmarks_filters_visibility() {
        let indices = [LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST];
        let set = JointSet::from_landmarks(&landmarks_with(&indices, 0.9), 0.5);

        assert_eq!(set.get(Joint::LeftElbow), Some(Point2D::new(0.13, 0.5)));
        // 未赋值的点 visibility 为 0，全部被过滤
        assert_eq!(set.len(), 3);

        let hidden = JointSet::from_landmarks(&landmarks_with(&indices, 0.2), 0.5);
        assert!(hidden.is_empty());
    }

    #[test]
    fn test_from_short_landmark_list() {
        let list = vec![
            PoseLandmark {
                x: 0.1,
                y: 0.1,
                visibility: 1.0
            };
            12
        ];
        let set = JointSet::from_landmarks(&list, 0.0);
        assert_eq!(set.get(Joint::LeftShoulder), Some(Point2D::new(0.1, 0.1)));
        assert!(set.get(Joint::RightShoulder).is_none());
    }
}
