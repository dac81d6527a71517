use enumset::{ enum_set, EnumSet, EnumSetType };

use crate::status::InitStatus;

/// 启动流程中的一个初始化阶段。
#[derive(EnumSetType, Debug)]
pub enum Stage {
    Logging,
    Radio,
    Scheduler,
    Timers,
    Leds,
    Buttons,
    Sensors,
}

impl Stage {
    /// 固定的启动顺序。射频/时钟和调度器必须在定时器之前，状态上报在所有阶段之后。
    pub const BOOT_ORDER: [Stage; 7] = [
        Stage::Logging,
        Stage::Radio,
        Stage::Scheduler,
        Stage::Timers,
        Stage::Leds,
        Stage::Buttons,
        Stage::Sensors,
    ];

    /// 必须先成功的阶段。定时器依赖射频协议栈启动的低频时钟，
    /// 到期事件要投递进调度队列。
    pub fn preconditions(self) -> EnumSet<Stage> {
        match self {
            Stage::Timers => enum_set!(Stage::Radio | Stage::Scheduler),
            _ => EnumSet::empty(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Logging => "log",
            Stage::Radio => "radio",
            Stage::Scheduler => "sched",
            Stage::Timers => "timer",
            Stage::Leds => "leds",
            Stage::Buttons => "buttons",
            Stage::Sensors => "sensors",
        }
    }
}

/// 某个阶段执行后的记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: InitStatus,
    /// 前置阶段未成功，适配器没有被调用
    pub skipped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_precondition_comes_earlier_in_boot_order() {
        let position = |stage: Stage| Stage::BOOT_ORDER.iter().position(|s| *s == stage).unwrap();
        for stage in Stage::BOOT_ORDER {
            for before in stage.preconditions() {
                assert!(position(before) < position(stage), "{:?} must run after {:?}", stage, before);
            }
        }
    }

    #[test]
    fn timers_wait_for_radio_and_scheduler() {
        assert_eq!(Stage::Timers.preconditions(), Stage::Radio | Stage::Scheduler);
        assert!(Stage::Radio.preconditions().is_empty());
        assert!(Stage::Scheduler.preconditions().is_empty());
        assert!(Stage::Sensors.preconditions().is_empty());
    }
}
