//! 协作式调度器。
//!
//! 定时器回调运行在定时器任务里，不能直接执行应用逻辑。回调只把事件
//! 投递进有界队列，由主循环调用 [`Scheduler::execute`] 在主循环上下文中执行。

use std::sync::{ Arc, Mutex };

use crate::board::TimerId;

/// 调度队列长度
pub const SCHED_QUEUE_SIZE: usize = 10;

/// 延迟到主循环执行的事件
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// 定时器到期，主循环中调用 `handler`
    Timer {
        id: TimerId,
        handler: fn(),
    },
}

type Queue = heapless::Deque<Event, SCHED_QUEUE_SIZE>;

#[derive(Default)]
pub struct Scheduler {
    queue: Arc<Mutex<Queue>>,
}

/// 投递端，可以跨线程克隆
#[derive(Clone)]
pub struct SchedulerHandle {
    queue: Arc<Mutex<Queue>>,
}

impl SchedulerHandle {
    /// 队列满时事件被丢弃并原样返回
    pub fn post(&self, event: Event) -> Result<(), Event> {
        let mut queue = match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.push_back(event).map_err(|event| {
            log::warn!("scheduler queue full, dropping {:?}", event);
            event
        })
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle { queue: self.queue.clone() }
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// 取出并执行所有排队的事件，返回执行的数量。
    pub fn execute(&self) -> usize {
        let mut executed = 0;
        loop {
            // 取完事件立即释放锁，处理函数里可以再投递
            let next = self.lock().pop_front();
            let Some(event) = next else {
                break;
            };
            match event {
                Event::Timer { handler, .. } => handler(),
            }
            executed += 1;
        }
        executed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue> {
        match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{ AtomicUsize, Ordering };

    use super::*;

    static TICKS: AtomicUsize = AtomicUsize::new(0);

    fn tick() {
        TICKS.fetch_add(1, Ordering::SeqCst);
    }

    fn timer_event() -> Event {
        Event::Timer { id: TimerId(0), handler: tick }
    }

    #[test]
    fn posted_tick_runs_on_execute() {
        let scheduler = Scheduler::new();
        let handle = scheduler.handle();
        std::thread::spawn(move || handle.post(timer_event()).unwrap()).join().unwrap();

        assert_eq!(scheduler.pending(), 1);
        let before = TICKS.load(Ordering::SeqCst);
        assert_eq!(scheduler.execute(), 1);
        assert_eq!(TICKS.load(Ordering::SeqCst), before + 1);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.execute(), 0);
    }

    #[test]
    fn full_queue_rejects_event() {
        let scheduler = Scheduler::new();
        let handle = scheduler.handle();
        for _ in 0..SCHED_QUEUE_SIZE {
            assert!(handle.post(timer_event()).is_ok());
        }
        assert!(handle.post(timer_event()).is_err());
        assert_eq!(scheduler.pending(), SCHED_QUEUE_SIZE);
    }
}
