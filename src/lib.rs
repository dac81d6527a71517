//! 传感器标签的启动初始化。
//!
//! 按固定顺序初始化日志、射频/时钟、调度器、定时器、LED、按键和传感器，
//! 把所有阶段的结果汇总成一个状态码，再用指示灯告诉用户。

pub mod status;
pub mod stage;
pub mod board;
pub mod scheduler;
pub mod sequencer;
pub mod reporter;

#[cfg(feature = "esp")]
pub mod esp;
#[cfg(feature = "esp")]
pub mod led;
#[cfg(feature = "esp")]
pub mod sensor;

pub use board::{
    Board,
    BootConfig,
    ButtonConfig,
    Delay,
    Indicator,
    PinPool,
    PinSet,
    Sensor,
    StdDelay,
    TimerId,
    TimerRequest,
};
pub use reporter::{ ReporterState, StatusReporter, ERROR_BLINK_INTERVAL_MS, INIT_OK_DELAY_MS };
pub use scheduler::{ Event, Scheduler, SchedulerHandle, SCHED_QUEUE_SIZE };
pub use sequencer::{ run_boot_sequence, Sequencer };
pub use stage::{ Stage, StageOutcome };
pub use status::{ InitError, InitStatus };
