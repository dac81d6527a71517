//! 外部协作者的能力接口。
//!
//! 射频协议栈、GPIO、传感器驱动这些具体实现都在核心之外，核心只通过
//! 这里的 trait 调用它们，并且只关心成功或失败。

use std::time::Duration;

use crate::scheduler::SchedulerHandle;
use crate::status::InitError;

/// 一组引脚的最大数量
pub const MAX_PINS: usize = 8;

/// 定时器槽位编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u8);

/// 主定时器请求：按 `period_ms` 周期调用 `callback`。
#[derive(Debug, Clone, Copy)]
pub struct TimerRequest {
    pub id: TimerId,
    pub period_ms: u32,
    pub callback: fn(),
}

/// 一组GPIO编号
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSet(heapless::Vec<u8, MAX_PINS>);

impl PinSet {
    pub fn new() -> Self {
        Self(heapless::Vec::new())
    }

    /// 超出容量视为配置错误
    pub fn from_slice(pins: &[u8]) -> Result<Self, InitError> {
        heapless::Vec::from_slice(pins)
            .map(Self)
            .map_err(|_| InitError::InvalidConfiguration)
    }

    /// 检查引脚编号都在 `0..=max_pin` 范围内并且没有重复。
    pub fn validate(&self, max_pin: u8) -> Result<(), InitError> {
        for (i, pin) in self.0.iter().enumerate() {
            if *pin > max_pin || self.0[..i].contains(pin) {
                return Err(InitError::InvalidConfiguration);
            }
        }
        Ok(())
    }

    pub fn pins(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonConfig {
    pub pins: PinSet,
    pub pull_up: bool,
    /// 请求中断方式读取。不支持时板子退回轮询并返回 `NotImplemented`。
    pub interrupt: bool,
}

/// 一次启动需要的全部参数
#[derive(Debug, Clone)]
pub struct BootConfig {
    pub timer: TimerRequest,
    pub leds: PinSet,
    pub buttons: ButtonConfig,
    /// 板子上最大的GPIO编号
    pub max_pin: u8,
}

/**
 * 还没有被别的驱动占用的引脚。
 *
 * 板子只能使用交给它的引脚，已经分配给指示灯、I2C 等驱动的引脚不在池里，
 * 按编号取不到就是配置错误。每个引脚只能取一次。
 */
#[derive(Debug)]
pub struct PinPool<P> {
    free: Vec<(u8, P)>,
}

impl<P> Default for PinPool<P> {
    fn default() -> Self {
        Self { free: Vec::new() }
    }
}

impl<P> PinPool<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, num: u8, pin: P) {
        self.free.push((num, pin));
    }

    pub fn contains(&self, num: u8) -> bool {
        self.free.iter().any(|(n, _)| *n == num)
    }

    pub fn take(&mut self, num: u8) -> Result<P, InitError> {
        let index = self.free
            .iter()
            .position(|(n, _)| *n == num)
            .ok_or(InitError::InvalidConfiguration)?;
        Ok(self.free.swap_remove(index).1)
    }
}

impl<P> FromIterator<(u8, P)> for PinPool<P> {
    fn from_iter<T: IntoIterator<Item = (u8, P)>>(iter: T) -> Self {
        Self { free: iter.into_iter().collect() }
    }
}

/**
 * 板级适配器。
 *
 * 每个方法对应启动流程中的一个阶段，内部超时由实现自己处理，
 * 这里只返回成功或具体的失败原因。
 */
pub trait Board {
    /// 打开诊断日志。日志是尽力而为的，只有后端不存在时才失败。
    fn enable_logging(&mut self) -> Result<(), InitError>;

    /// 启动射频协议栈和低频时钟，失败一般返回 `UnknownError`。
    fn bring_up_radio(&mut self) -> Result<(), InitError>;

    /// 注册周期定时器。到期时只往 `scheduler` 投递事件，不直接调用回调。
    fn register_timer(
        &mut self,
        request: &TimerRequest,
        scheduler: SchedulerHandle
    ) -> Result<(), InitError>;

    /// 把指示灯引脚配置为输出并熄灭。
    fn configure_outputs(&mut self, pins: &PinSet) -> Result<(), InitError>;

    fn configure_inputs(&mut self, buttons: &ButtonConfig) -> Result<(), InitError>;
}

pub trait Sensor {
    fn name(&self) -> &'static str;

    /// 初始化传感器并让它进入低功耗睡眠。
    fn init_and_sleep(&mut self) -> Result<(), InitError>;
}

/// 状态指示灯，没有失败模式
pub trait Indicator {
    fn set(&mut self, on: bool);
}

pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// 基于 `std::thread::sleep` 的延时
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}
