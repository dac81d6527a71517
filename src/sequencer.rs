use enumset::EnumSet;

use crate::board::{ Board, BootConfig, ButtonConfig, PinSet, Sensor, TimerRequest };
use crate::scheduler::{ Scheduler, SchedulerHandle };
use crate::stage::{ Stage, StageOutcome };
use crate::status::{ InitError, InitStatus };

/// 最多保留的阶段记录数
pub const MAX_OUTCOMES: usize = 16;

/**
 * 启动初始化器。
 *
 * 按调用顺序执行各个阶段，把每个阶段的结果并入汇总状态码。
 * 某个阶段失败不会中止流程，不依赖它的阶段照常执行，这样一次启动就能
 * 暴露所有故障。前置阶段没有成功时，该阶段被跳过，只记一个
 * `SequenceViolation`，不去调用适配器。失败不会重试。
 */
pub struct Sequencer<'a, B: Board> {
    board: &'a mut B,
    status: InitStatus,
    succeeded: EnumSet<Stage>,
    outcomes: heapless::Vec<StageOutcome, MAX_OUTCOMES>,
    scheduler: Option<SchedulerHandle>,
}

impl<'a, B: Board> Sequencer<'a, B> {
    pub fn new(board: &'a mut B) -> Self {
        Self {
            board,
            status: InitStatus::SUCCESS,
            succeeded: EnumSet::empty(),
            outcomes: heapless::Vec::new(),
            scheduler: None,
        }
    }

    pub fn init_logging(&mut self) -> InitStatus {
        let result = self.board.enable_logging();
        self.record(Stage::Logging, result.into(), false)
    }

    pub fn init_radio(&mut self) -> InitStatus {
        let result = self.board.bring_up_radio();
        self.record(Stage::Radio, result.into(), false)
    }

    /// 接上调度队列，之后注册的定时器把到期事件投递进去。
    pub fn init_scheduler(&mut self, scheduler: &Scheduler) -> InitStatus {
        self.scheduler = Some(scheduler.handle());
        self.record(Stage::Scheduler, InitStatus::SUCCESS, false)
    }

    /// 注册主定时器。必须在射频/时钟和调度器成功之后，否则只返回 `SequenceViolation`。
    pub fn init_timer(&mut self, request: &TimerRequest) -> InitStatus {
        if let Some(violation) = self.check_precondition(Stage::Timers) {
            return violation;
        }
        let handle = match self.scheduler.clone() {
            Some(handle) => handle,
            None => {
                return self.record(Stage::Timers, InitError::SequenceViolation.into(), true);
            }
        };
        if request.period_ms == 0 {
            log::warn!("[timer] period must be > 0 ms");
            return self.record(Stage::Timers, InitError::InvalidConfiguration.into(), false);
        }
        let result = self.board.register_timer(request, handle);
        self.record(Stage::Timers, result.into(), false)
    }

    pub fn init_leds(&mut self, pins: &PinSet, max_pin: u8) -> InitStatus {
        let result = pins.validate(max_pin).and_then(|_| self.board.configure_outputs(pins));
        self.record(Stage::Leds, result.into(), false)
    }

    pub fn init_buttons(&mut self, buttons: &ButtonConfig, max_pin: u8) -> InitStatus {
        let result = buttons.pins
            .validate(max_pin)
            .and_then(|_| self.board.configure_inputs(buttons));
        if result == Err(InitError::NotImplemented) {
            log::warn!("[buttons] interrupts unavailable, polling instead");
        }
        self.record(Stage::Buttons, result.into(), false)
    }

    /// 初始化所有传感器。即使应用不用传感器也要调用，因为初始化会让它们进入低功耗模式。
    pub fn init_sensors(&mut self, sensors: &mut [&mut dyn Sensor]) -> InitStatus {
        let mut status = InitStatus::SUCCESS;
        for sensor in sensors.iter_mut() {
            if let Err(cause) = sensor.init_and_sleep() {
                log::error!("[sensors] {}: {}", sensor.name(), cause);
                status |= cause;
            }
        }
        self.record(Stage::Sensors, status, false)
    }

    /// 当前的汇总状态码
    pub fn status(&self) -> InitStatus {
        self.status
    }

    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// 结束初始化，打印每个阶段的结果并交出汇总状态码。
    pub fn finish(self) -> InitStatus {
        for outcome in self.outcomes.iter() {
            if outcome.skipped {
                log::warn!("  {:<8} skipped", outcome.stage.name());
            } else {
                log::info!("  {:<8} {}", outcome.stage.name(), outcome.status);
            }
        }
        log::info!("init finished: {}", self.status);
        self.status
    }

    fn check_precondition(&mut self, stage: Stage) -> Option<InitStatus> {
        let missing = stage.preconditions() - self.succeeded;
        if missing.is_empty() {
            return None;
        }
        for required in missing {
            log::error!("[{}] skipped, {} has not been initialised", stage.name(), required.name());
        }
        Some(self.record(stage, InitError::SequenceViolation.into(), true))
    }

    fn record(&mut self, stage: Stage, status: InitStatus, skipped: bool) -> InitStatus {
        if status.is_success() {
            self.succeeded.insert(stage);
            log::info!("[{}] ok", stage.name());
        } else if !skipped {
            log::error!("[{}] failed: {}", stage.name(), status);
        }
        self.status |= status;
        if self.outcomes.push(StageOutcome { stage, status, skipped }).is_err() {
            log::warn!("[{}] outcome not recorded, history full", stage.name());
        }
        status
    }
}

/// 按固定顺序执行完整的启动流程，返回汇总状态码。
pub fn run_boot_sequence<B: Board>(
    board: &mut B,
    config: &BootConfig,
    scheduler: &Scheduler,
    sensors: &mut [&mut dyn Sensor]
) -> InitStatus {
    let mut sequencer = Sequencer::new(board);
    for stage in Stage::BOOT_ORDER {
        match stage {
            Stage::Logging => sequencer.init_logging(),
            Stage::Radio => sequencer.init_radio(),
            Stage::Scheduler => sequencer.init_scheduler(scheduler),
            Stage::Timers => sequencer.init_timer(&config.timer),
            Stage::Leds => sequencer.init_leds(&config.leds, config.max_pin),
            Stage::Buttons => sequencer.init_buttons(&config.buttons, config.max_pin),
            Stage::Sensors => sequencer.init_sensors(sensors),
        };
    }
    sequencer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::TimerId;
    use crate::scheduler::Event;

    #[derive(Default)]
    struct CountingBoard {
        radio_ok: bool,
        timer_calls: usize,
        timer: Option<(TimerRequest, SchedulerHandle)>,
    }

    impl CountingBoard {
        // 模拟定时器到期
        fn fire(&self) {
            let (request, handle) = self.timer.as_ref().unwrap();
            handle.post(Event::Timer { id: request.id, handler: request.callback }).unwrap();
        }
    }

    impl Board for CountingBoard {
        fn enable_logging(&mut self) -> Result<(), InitError> {
            Ok(())
        }

        fn bring_up_radio(&mut self) -> Result<(), InitError> {
            if self.radio_ok { Ok(()) } else { Err(InitError::UnknownError) }
        }

        fn register_timer(
            &mut self,
            request: &TimerRequest,
            scheduler: SchedulerHandle
        ) -> Result<(), InitError> {
            self.timer_calls += 1;
            self.timer = Some((*request, scheduler));
            Ok(())
        }

        fn configure_outputs(&mut self, _pins: &PinSet) -> Result<(), InitError> {
            Ok(())
        }

        fn configure_inputs(&mut self, _buttons: &ButtonConfig) -> Result<(), InitError> {
            Ok(())
        }
    }

    fn tick() {}

    fn request(period_ms: u32) -> TimerRequest {
        TimerRequest { id: TimerId(0), period_ms, callback: tick }
    }

    #[test]
    fn timer_before_radio_is_skipped() {
        let scheduler = Scheduler::new();
        let mut board = CountingBoard { radio_ok: true, ..Default::default() };
        let mut sequencer = Sequencer::new(&mut board);
        sequencer.init_scheduler(&scheduler);
        let status = sequencer.init_timer(&request(1000));
        assert_eq!(status, InitError::SequenceViolation.into());
        assert!(sequencer.outcomes()[1].skipped);
        drop(sequencer);
        assert_eq!(board.timer_calls, 0);
    }

    #[test]
    fn timer_before_scheduler_is_skipped() {
        let mut board = CountingBoard { radio_ok: true, ..Default::default() };
        let mut sequencer = Sequencer::new(&mut board);
        sequencer.init_radio();
        let status = sequencer.init_timer(&request(1000));
        assert_eq!(status, InitError::SequenceViolation.into());
        drop(sequencer);
        assert_eq!(board.timer_calls, 0);
    }

    #[test]
    fn timer_ticks_are_queued_until_executed() {
        let scheduler = Scheduler::new();
        let mut board = CountingBoard { radio_ok: true, ..Default::default() };
        let mut sequencer = Sequencer::new(&mut board);
        sequencer.init_radio();
        sequencer.init_scheduler(&scheduler);
        assert!(sequencer.init_timer(&request(1000)).is_success());
        assert!(sequencer.finish().is_success());
        assert_eq!(board.timer_calls, 1);

        board.fire();
        board.fire();
        assert_eq!(scheduler.pending(), 2);
        assert_eq!(scheduler.execute(), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn zero_period_is_invalid() {
        let scheduler = Scheduler::new();
        let mut board = CountingBoard { radio_ok: true, ..Default::default() };
        let mut sequencer = Sequencer::new(&mut board);
        sequencer.init_radio();
        sequencer.init_scheduler(&scheduler);
        let status = sequencer.init_timer(&request(0));
        assert_eq!(status, InitError::InvalidConfiguration.into());
        drop(sequencer);
        assert_eq!(board.timer_calls, 0);
    }

    #[test]
    fn failed_radio_then_timer_gives_129() {
        let scheduler = Scheduler::new();
        let mut board = CountingBoard::default();
        let mut sequencer = Sequencer::new(&mut board);
        sequencer.init_radio();
        sequencer.init_scheduler(&scheduler);
        sequencer.init_timer(&request(1000));
        assert_eq!(sequencer.finish().bits(), 129);
        assert_eq!(board.timer_calls, 0);
    }
}
