use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::i2c::I2cDriver;

use crate::board::Sensor;
use crate::status::InitError;

// ID寄存器中标识SHTC3的位
const SHTC3_ID_MASK: u16 = 0x083f;
const SHTC3_ID: u16 = 0x0807;

/// 板载SHTC3温湿度传感器
pub struct Shtc3Sensor<'d> {
    i2c: I2cDriver<'d>,
}

impl<'d> Shtc3Sensor<'d> {
    pub fn new(i2c: I2cDriver<'d>) -> Self {
        Self { i2c }
    }
}

fn classify<E>(e: shtcx::Error<E>) -> InitError {
    match e {
        // 总线上没有应答
        shtcx::Error::I2c(_) => InitError::NoResponse,
        shtcx::Error::Crc => InitError::SelfTestFailure,
    }
}

impl Sensor for Shtc3Sensor<'_> {
    fn name(&self) -> &'static str {
        "shtc3"
    }

    fn init_and_sleep(&mut self) -> Result<(), InitError> {
        let mut sht = shtcx::shtc3(&mut self.i2c);
        sht.wakeup(&mut FreeRtos).map_err(classify)?;

        let id = sht.raw_id_register().map_err(classify)?;
        if id & SHTC3_ID_MASK != SHTC3_ID {
            log::error!("shtc3: unexpected id register 0x{:04x}", id);
            return Err(InitError::SelfTestFailure);
        }

        sht.sleep().map_err(classify)?;
        log::info!("shtc3 idle, id 0x{:04x}", id);
        Ok(())
    }
}
