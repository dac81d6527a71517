use std::time::Duration;

use anyhow::Result;
use esp_idf_svc::hal::{
    gpio::OutputPin,
    peripheral::Peripheral,
    rmt::{ config::TransmitConfig, FixedLengthSignal, PinState, Pulse, RmtChannel, TxRmtDriver },
};

pub use rgb::RGB8;

use crate::board::Indicator;

/// 指示灯“正常”时的颜色
pub const OK_COLOR: RGB8 = RGB8::new(0, 255, 0);
/// 出错闪烁时的颜色
pub const ERROR_COLOR: RGB8 = RGB8::new(255, 0, 0);

pub struct WS2812RMT<'a> {
    tx_rmt_driver: TxRmtDriver<'a>,
    color: RGB8,
}

impl<'a> WS2812RMT<'a> {
    pub fn new(
        led: impl Peripheral<P = impl OutputPin> + 'a,
        channel: impl Peripheral<P = impl RmtChannel> + 'a
    ) -> Result<Self> {
        let config = TransmitConfig::new().clock_divider(2);
        let tx = TxRmtDriver::new(channel, led, &config)?;
        Ok(Self { tx_rmt_driver: tx, color: OK_COLOR })
    }

    /// 设置 `set(true)` 时使用的颜色
    pub fn set_color(&mut self, color: RGB8) {
        self.color = color;
    }

    pub fn set_pixel(&mut self, rgb: RGB8) -> Result<()> {
        // WS2812 按 GRB 顺序接收
        let color: u32 = ((rgb.g as u32) << 16) | ((rgb.r as u32) << 8) | (rgb.b as u32);
        let ticks_hz = self.tx_rmt_driver.counter_clock()?;

        // '0'：短高电平 + 长低电平
        let t0h = Pulse::new_with_duration(ticks_hz, PinState::High, &Duration::from_nanos(400))?;
        let t0l = Pulse::new_with_duration(ticks_hz, PinState::Low, &Duration::from_nanos(850))?;
        // '1'：长高电平 + 短低电平
        let t1h = Pulse::new_with_duration(ticks_hz, PinState::High, &Duration::from_nanos(800))?;
        let t1l = Pulse::new_with_duration(ticks_hz, PinState::Low, &Duration::from_nanos(450))?;

        let mut signal = FixedLengthSignal::<24>::new();
        // 从最高位开始发送
        for i in (0..24).rev() {
            let bit = (color >> i) & 1 != 0;
            let pulse = if bit { (t1h, t1l) } else { (t0h, t0l) };
            signal.set(23 - (i as usize), &pulse)?;
        }
        Ok(self.tx_rmt_driver.start_blocking(&signal)?)
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.set_pixel(RGB8::new(0, 0, 0))
    }
}

impl Indicator for WS2812RMT<'_> {
    fn set(&mut self, on: bool) {
        let rgb = if on { self.color } else { RGB8::new(0, 0, 0) };
        // 指示灯在这一层没有失败模式，出错只记日志
        if let Err(e) = self.set_pixel(rgb) {
            log::warn!("indicator write failed: {}", e);
        }
    }
}
