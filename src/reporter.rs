use crate::board::{ Delay, Indicator };
use crate::status::InitStatus;

/// 出错时指示灯的翻转间隔
pub const ERROR_BLINK_INTERVAL_MS: u32 = 250;
/// 启动成功后指示灯常亮的时间
pub const INIT_OK_DELAY_MS: u32 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    Idle,
    ReportingSuccess,
    /// 终止状态，没有出口
    ReportingFailure,
}

/**
 * 启动状态上报。
 *
 * 成功时指示灯常亮一段时间让用户确认，然后把控制权交还给调用者；
 * 失败时指示灯永远闪烁，设备不会进入正常运行。初始化不完整的标签
 * 不能带着残缺功能部署出去。
 */
pub struct StatusReporter<I: Indicator, D: Delay> {
    indicator: I,
    delay: D,
    blink_interval_ms: u32,
    settle_delay_ms: u32,
    state: ReporterState,
    lit: bool,
}

impl<I: Indicator, D: Delay> StatusReporter<I, D> {
    pub fn new(indicator: I, delay: D) -> Self {
        Self {
            indicator,
            delay,
            blink_interval_ms: ERROR_BLINK_INTERVAL_MS,
            settle_delay_ms: INIT_OK_DELAY_MS,
            state: ReporterState::Idle,
            lit: false,
        }
    }

    pub fn with_timing(mut self, blink_interval_ms: u32, settle_delay_ms: u32) -> Self {
        self.blink_interval_ms = blink_interval_ms;
        self.settle_delay_ms = settle_delay_ms;
        self
    }

    pub fn state(&self) -> ReporterState {
        self.state
    }

    /// 交还指示灯，应用之后自己使用它
    pub fn into_parts(self) -> (I, D) {
        (self.indicator, self.delay)
    }

    /**
     * 上报汇总状态码。
     *
     * 只有成功时才会返回。任何非零状态码都会进入 [`fail_stop`](Self::fail_stop)，
     * 永远不返回。每次启动只上报一次：成功之后再调用直接返回，
     * 已经处于失败状态则继续闪烁。
     */
    pub fn report(&mut self, status: InitStatus) {
        match self.state {
            ReporterState::Idle => {}
            ReporterState::ReportingSuccess => {
                log::warn!("init status already reported, ignoring {}", status);
                return;
            }
            ReporterState::ReportingFailure => self.fail_stop(),
        }
        if status.is_success() {
            self.confirm_success();
            return;
        }
        self.enter_failure(status);
        self.fail_stop()
    }

    /// 永久闪烁指示灯
    pub fn fail_stop(&mut self) -> ! {
        self.state = ReporterState::ReportingFailure;
        loop {
            self.blink_once();
        }
    }

    /// 和 `report` 语义相同，但失败时最多翻转 `max_toggles` 次就返回，供测试使用。
    pub fn report_bounded(&mut self, status: InitStatus, max_toggles: usize) -> ReporterState {
        match self.state {
            ReporterState::ReportingSuccess => {
                log::warn!("init status already reported, ignoring {}", status);
            }
            ReporterState::Idle if status.is_success() => self.confirm_success(),
            ReporterState::Idle | ReporterState::ReportingFailure => {
                if self.state == ReporterState::Idle {
                    self.enter_failure(status);
                }
                for _ in 0..max_toggles {
                    self.blink_once();
                }
            }
        }
        self.state
    }

    fn confirm_success(&mut self) {
        log::info!("init ok, holding indicator for {} ms", self.settle_delay_ms);
        self.indicator.set(true);
        self.lit = true;
        self.delay.delay_ms(self.settle_delay_ms);
        self.state = ReporterState::ReportingSuccess;
    }

    fn enter_failure(&mut self, status: InitStatus) {
        log::error!("init failed: {}", status);
        for cause in status.causes() {
            log::error!("  - {}", cause);
        }
        self.state = ReporterState::ReportingFailure;
    }

    fn blink_once(&mut self) {
        self.lit = !self.lit;
        self.indicator.set(self.lit);
        self.delay.delay_ms(self.blink_interval_ms);
    }
}
