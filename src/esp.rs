//! ESP32 板级适配器。
//!
//! 射频用 NimBLE，定时器用 esp_timer 任务定时器服务，LED 和按键走 GPIO。
//! GPIO 只从 `Peripherals` 交过来的引脚池里取。

use std::time::Duration;

use esp_idf_svc::hal::gpio::{ AnyIOPin, Input, Output, Pin, PinDriver, Pull };
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::sys::{ EspError, ESP_ERR_INVALID_ARG, ESP_ERR_NOT_SUPPORTED, ESP_ERR_TIMEOUT };
use esp_idf_svc::timer::{ EspTaskTimerService, EspTimer };

use crate::board::{ Board, ButtonConfig, PinPool, PinSet, TimerRequest };
use crate::scheduler::{ Event, SchedulerHandle };
use crate::status::InitError;

/// ESP32-C3 上最大的GPIO编号
pub const MAX_GPIO: u8 = 21;

/// 把 ESP-IDF 的错误码归类成初始化错误
pub fn classify(e: EspError) -> InitError {
    let code = e.code();
    if code == ESP_ERR_INVALID_ARG as i32 {
        InitError::InvalidConfiguration
    } else if code == ESP_ERR_NOT_SUPPORTED as i32 {
        InitError::NotImplemented
    } else if code == ESP_ERR_TIMEOUT as i32 {
        InitError::NoResponse
    } else {
        InitError::UnknownError
    }
}

pub struct EspBoard {
    device_name: &'static str,
    timer_service: Option<EspTaskTimerService>,
    main_timer: Option<EspTimer<'static>>,
    free_pins: PinPool<AnyIOPin>,
    leds: Vec<PinDriver<'static, AnyIOPin, Output>>,
    buttons: Vec<PinDriver<'static, AnyIOPin, Input>>,
}

impl EspBoard {
    /// `pins` 是还没有分配给其它驱动的引脚，LED 和按键只能从这里取。
    pub fn new(device_name: &'static str, pins: impl IntoIterator<Item = AnyIOPin>) -> Self {
        Self {
            device_name,
            timer_service: None,
            main_timer: None,
            free_pins: pins
                .into_iter()
                .map(|pin| (pin.pin() as u8, pin))
                .collect(),
            leds: Vec::new(),
            buttons: Vec::new(),
        }
    }

    /// 轮询方式读取按键，低电平表示按下
    pub fn buttons_pressed(&self) -> impl Iterator<Item = bool> + '_ {
        self.buttons.iter().map(|b| b.is_low())
    }

    pub fn timer_running(&self) -> bool {
        self.main_timer.as_ref().map_or(false, |t| t.is_scheduled().unwrap_or(false))
    }

    pub fn leds_mut(&mut self) -> &mut [PinDriver<'static, AnyIOPin, Output>] {
        &mut self.leds
    }
}

impl Board for EspBoard {
    fn enable_logging(&mut self) -> Result<(), InitError> {
        EspLogger::initialize_default();
        Ok(())
    }

    fn bring_up_radio(&mut self) -> Result<(), InitError> {
        // NimBLE 初始化失败时 take() 会在库里 panic。panic 策略为 abort 时
        // 这里拦不住，芯片直接复位
        let device = std::panic::catch_unwind(esp32_nimble::BLEDevice::take).map_err(|_| {
            log::error!("ble: nimble init panicked");
            InitError::UnknownError
        })?;
        esp32_nimble::BLEDevice::set_device_name(self.device_name).map_err(|e| {
            log::error!("ble: {:?}", e);
            InitError::UnknownError
        })?;
        log::info!("ble address {:?}", device.get_addr());

        // 所有定时器都挂在这个服务上
        let service = EspTaskTimerService::new().map_err(classify)?;
        self.timer_service = Some(service);
        Ok(())
    }

    fn register_timer(
        &mut self,
        request: &TimerRequest,
        scheduler: SchedulerHandle
    ) -> Result<(), InitError> {
        let service = self.timer_service.as_ref().ok_or(InitError::SequenceViolation)?;
        let event = Event::Timer { id: request.id, handler: request.callback };
        // 回调跑在定时器任务里，只投递事件，队列满了就丢掉这一拍
        let timer = service
            .timer(move || {
                let _ = scheduler.post(event);
            })
            .map_err(classify)?;
        timer.every(Duration::from_millis(request.period_ms as u64)).map_err(classify)?;
        log::info!("timer {:?} every {} ms", request.id, request.period_ms);
        self.main_timer = Some(timer);
        Ok(())
    }

    fn configure_outputs(&mut self, pins: &PinSet) -> Result<(), InitError> {
        for &num in pins.pins() {
            let pin = self.free_pins.take(num).map_err(|e| {
                log::error!("gpio{} is not available for leds", num);
                e
            })?;
            let mut led = PinDriver::output(pin).map_err(classify)?;
            led.set_low().map_err(classify)?;
            self.leds.push(led);
        }
        Ok(())
    }

    fn configure_inputs(&mut self, config: &ButtonConfig) -> Result<(), InitError> {
        for &num in config.pins.pins() {
            let pin = self.free_pins.take(num).map_err(|e| {
                log::error!("gpio{} is not available for buttons", num);
                e
            })?;
            let mut button = PinDriver::input(pin).map_err(classify)?;
            let pull = if config.pull_up { Pull::Up } else { Pull::Floating };
            button.set_pull(pull).map_err(classify)?;
            self.buttons.push(button);
        }
        // TODO: 通过 PinDriver::subscribe 把按键中断投递给应用
        if config.interrupt {
            return Err(InitError::NotImplemented);
        }
        Ok(())
    }
}

impl crate::board::Delay for esp_idf_svc::hal::delay::FreeRtos {
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }
}
