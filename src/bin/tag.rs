use std::sync::atomic::{ AtomicU32, Ordering };

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::IOPin;
use esp_idf_svc::hal::i2c::{ I2cConfig, I2cDriver };
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use ruuvi_boot::esp::{ EspBoard, MAX_GPIO };
use ruuvi_boot::led::{ ERROR_COLOR, WS2812RMT };
use ruuvi_boot::scheduler::Scheduler;
use ruuvi_boot::sensor::Shtc3Sensor;
use ruuvi_boot::{ run_boot_sequence, BootConfig, ButtonConfig, PinSet, Sensor, StatusReporter, TimerId, TimerRequest };

// 编译期配置，来自 cfg.toml
#[toml_cfg::toml_config]
#[derive(Debug)]
pub struct Config {
    #[default("Ruuvi")]
    device_name: &'static str,
    #[default(1000)]
    main_interval_ms: u32,
    #[default(7)]
    led_pin: u8,
    #[default(9)]
    button_pin: u8,
    #[default(false)]
    button_interrupt: bool,
    #[default(250)]
    blink_interval_ms: u32,
    #[default(3000)]
    settle_delay_ms: u32,
}

// 主循环检查调度队列的间隔
const SCHED_POLL_MS: u32 = 20;

static TICKS: AtomicU32 = AtomicU32::new(0);

// 由调度器在主循环中调用
fn on_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();

    let peripherals = Peripherals::take()?;
    // 板载WS2812作为状态指示灯
    let mut indicator = WS2812RMT::new(peripherals.pins.gpio8, peripherals.rmt.channel0)?;
    indicator.shutdown()?;

    // 外接的SHTC3
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio4,
        peripherals.pins.gpio5,
        &I2cConfig::new().baudrate(400.kHz().into())
    )?;
    let mut shtc3 = Shtc3Sensor::new(i2c);

    let config = BootConfig {
        timer: TimerRequest {
            id: TimerId(0),
            period_ms: CONFIG.main_interval_ms,
            callback: on_tick,
        },
        leds: PinSet::from_slice(&[CONFIG.led_pin])?,
        buttons: ButtonConfig {
            pins: PinSet::from_slice(&[CONFIG.button_pin])?,
            pull_up: true,
            interrupt: CONFIG.button_interrupt,
        },
        max_pin: MAX_GPIO,
    };

    // gpio8 给了指示灯，gpio4/5 给了 I2C，剩下的交给板子分配
    let free_pins = [
        peripherals.pins.gpio0.downgrade(),
        peripherals.pins.gpio1.downgrade(),
        peripherals.pins.gpio2.downgrade(),
        peripherals.pins.gpio3.downgrade(),
        peripherals.pins.gpio6.downgrade(),
        peripherals.pins.gpio7.downgrade(),
        peripherals.pins.gpio9.downgrade(),
        peripherals.pins.gpio10.downgrade(),
    ];
    let mut board = EspBoard::new(CONFIG.device_name, free_pins);
    let scheduler = Scheduler::new();
    let mut sensors: [&mut dyn Sensor; 1] = [&mut shtc3];
    let status = run_boot_sequence(&mut board, &config, &scheduler, &mut sensors);

    if !status.is_success() {
        indicator.set_color(ERROR_COLOR);
    }
    let mut reporter = StatusReporter::new(indicator, FreeRtos).with_timing(
        CONFIG.blink_interval_ms,
        CONFIG.settle_delay_ms
    );
    // 失败时不会返回
    reporter.report(status);

    let (mut indicator, _) = reporter.into_parts();
    indicator.shutdown()?;
    log::info!("boot complete, timer running: {}", board.timer_running());

    loop {
        FreeRtos::delay_ms(SCHED_POLL_MS);
        if scheduler.execute() > 0 {
            let pressed = board.buttons_pressed().any(|p| p);
            log::info!("tick {} button {}", TICKS.load(Ordering::Relaxed), pressed);
        }
    }
}
