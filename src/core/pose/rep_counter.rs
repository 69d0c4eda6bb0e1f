use crate::core::error::PushupError;
use crate::core::pose::angle::LimbAngles;
use crate::core::pose::joints::{BodySide, JointSet};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// 俯卧撑阶段。`None` 为开始前/未知状态，也是唯一合法的初始值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    None,
    Down,
    Up,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::None => "",
            Stage::Down => "down",
            Stage::Up => "up",
        }
    }

    /// 按固定顺序判定：先进入 Down，再判断 Down → Up（计数）。
    /// 两个阈值之间为滞回区，状态不变。
    pub fn transition(self, angles: LimbAngles, thresholds: &RepThresholds) -> (Stage, bool) {
        let mut stage = self;

        if angles.arm > thresholds.max_arm_angle && angles.leg > thresholds.leg_straight_angle {
            stage = Stage::Down;
        }

        if angles.arm < thresholds.min_arm_angle
            && angles.leg < thresholds.leg_loose_upper_bound
            && stage == Stage::Down
        {
            return (Stage::Up, true);
        }

        (stage, false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepThresholds {
    /// 手臂伸直（进入 Down）的下限
    pub max_arm_angle: f32,
    /// 手臂弯曲（Down → Up 计数）的上限
    pub min_arm_angle: f32,
    /// 进入 Down 时腿部需大于该角度
    pub leg_straight_angle: f32,
    /// Down → Up 时腿部需小于该角度。默认 180° 时该条件恒成立
    pub leg_loose_upper_bound: f32,
}

impl Default for RepThresholds {
    fn default() -> Self {
        Self {
            max_arm_angle: 160.0,
            min_arm_angle: 80.0,
            leg_straight_angle: 160.0,
            leg_loose_upper_bound: 180.0,
        }
    }
}

impl RepThresholds {
    /// Up 判定中的腿部条件是否形同虚设（角度不会超过 180°）
    pub fn up_leg_check_is_vacuous(&self) -> bool {
        self.leg_loose_upper_bound > 180.0
            || (self.leg_loose_upper_bound - 180.0).abs() < f32::EPSILON
    }

    pub fn validate(&self) -> Result<(), PushupError> {
        let all = [
            self.max_arm_angle,
            self.min_arm_angle,
            self.leg_straight_angle,
            self.leg_loose_upper_bound,
        ];
        if all.iter().any(|a| !a.is_finite()) {
            return Err(PushupError::Config("thresholds must be finite".to_string()));
        }
        if self.min_arm_angle >= self.max_arm_angle {
            return Err(PushupError::Config(format!(
                "min_arm_angle ({}) must be below max_arm_angle ({})",
                self.min_arm_angle, self.max_arm_angle
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepCounterState {
    pub stage: Stage,
    pub count: u64,
}

/// 一次观测后的结果
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RepSnapshot {
    pub stage: Stage,
    pub count: u64,
    /// 本次没有观测时为 None
    pub angles: Option<LimbAngles>,
}

/// 滞回状态机：把手臂/腿部角度序列转换为阶段和计数。
///
/// 每个会话独占一个实例，只在消费者线程内修改。
pub struct RepCounter {
    state: RepCounterState,
    thresholds: RepThresholds,
    side: BodySide,
}

impl RepCounter {
    pub fn new() -> Self {
        Self::with_thresholds(RepThresholds::default(), BodySide::default())
    }

    pub fn with_thresholds(thresholds: RepThresholds, side: BodySide) -> Self {
        if thresholds.up_leg_check_is_vacuous() {
            debug!(
                "RepCounter: leg bound {:.0}° on the up transition never rejects a rep",
                thresholds.leg_loose_upper_bound
            );
        }
        Self {
            state: RepCounterState::default(),
            thresholds,
            side,
        }
    }

    /// 关节点缺失（或整帧无人体）时不改变状态
    pub fn observe(&mut self, joints: Option<&JointSet>) -> RepSnapshot {
        match joints.and_then(|j| LimbAngles::from_joints(j, self.side)) {
            Some(angles) => self.observe_angles(angles),
            None => self.snapshot(None),
        }
    }

    pub fn observe_angles(&mut self, angles: LimbAngles) -> RepSnapshot {
        let previous = self.state.stage;
        let (stage, counted) = previous.transition(angles, &self.thresholds);
        self.state.stage = stage;

        if counted {
            self.state.count += 1;
            info!("💪 RepCounter: rep #{} (arm {:.1}°, leg {:.1}°)", self.state.count, angles.arm, angles.leg);
        } else if stage != previous {
            debug!(
                "RepCounter: {:?} -> {:?} (arm {:.1}°, leg {:.1}°)",
                previous, stage, angles.arm, angles.leg
            );
        }

        self.snapshot(Some(angles))
    }

    pub fn reset(&mut self) {
        self.state = RepCounterState::default();
        info!("🔄 RepCounter: reset");
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn count(&self) -> u64 {
        self.state.count
    }

    pub fn state(&self) -> RepCounterState {
        self.state
    }

    pub fn thresholds(&self) -> &RepThresholds {
        &self.thresholds
    }

    pub fn side(&self) -> BodySide {
        self.side
    }

    fn snapshot(&self, angles: Option<LimbAngles>) -> RepSnapshot {
        RepSnapshot {
            stage: self.state.stage,
            count: self.state.count,
            angles,
        }
    }
}

impl Default for RepCounter {
    fn default() -> Self {
        Self::new()
    }
}
