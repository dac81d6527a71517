use std::fmt;
use std::ops::{ BitOr, BitOrAssign };

use enumset::{ EnumSet, EnumSetType };

/// 单个初始化失败原因。
///
/// 判别值是它在状态码中的位序号，所以 `SequenceViolation` 是 `0x01`，
/// `UnknownError` 占据保留的最高位 `0x80`。
#[derive(EnumSetType, Debug)]
#[enumset(repr = "u8")]
pub enum InitError {
    /// 需要先初始化别的东西
    SequenceViolation = 0,
    /// 功能未实现（被编译裁剪掉了）
    NotImplemented = 1,
    /// 传感器没有应答，可能没贴片或者硬件故障
    NoResponse = 2,
    /// 自检失败
    SelfTestFailure = 3,
    /// 配置非法
    InvalidConfiguration = 4,
    /// 无法归类的错误
    UnknownError = 7,
}

impl InitError {
    pub fn bit(self) -> u8 {
        EnumSet::only(self).as_u8()
    }

    pub fn name(self) -> &'static str {
        match self {
            InitError::SequenceViolation => "SequenceViolation",
            InitError::NotImplemented => "NotImplemented",
            InitError::NoResponse => "NoResponse",
            InitError::SelfTestFailure => "SelfTestFailure",
            InitError::InvalidConfiguration => "InvalidConfiguration",
            InitError::UnknownError => "UnknownError",
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.bit())
    }
}

impl std::error::Error for InitError {}

/**
 * 一次启动流程的汇总状态码。
 *
 * 它是各个阶段失败原因的并集，空集就是成功。值类型，按值在
 * 初始化器和状态上报之间传递，不存在全局可变状态。
 */
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InitStatus(EnumSet<InitError>);

impl InitStatus {
    pub const SUCCESS: InitStatus = InitStatus(EnumSet::empty());

    /// 把一个8位状态码还原成原因集合，未定义的位一律归为 `UnknownError`。
    pub fn from_bits(bits: u8) -> Self {
        let known = EnumSet::<InitError>::from_u8_truncated(bits);
        let unmapped = bits & !EnumSet::<InitError>::all().as_u8();
        let mut status = InitStatus(known);
        if unmapped != 0 {
            status |= InitError::UnknownError;
        }
        status
    }

    pub fn bits(self) -> u8 {
        self.0.as_u8()
    }

    pub fn is_success(self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(self, cause: InitError) -> bool {
        self.0.contains(cause)
    }

    pub fn causes(self) -> impl Iterator<Item = InitError> {
        self.0.iter()
    }
}

impl From<InitError> for InitStatus {
    fn from(cause: InitError) -> Self {
        InitStatus(EnumSet::only(cause))
    }
}

impl From<Result<(), InitError>> for InitStatus {
    fn from(result: Result<(), InitError>) -> Self {
        match result {
            Ok(()) => InitStatus::SUCCESS,
            Err(cause) => cause.into(),
        }
    }
}

impl BitOr for InitStatus {
    type Output = InitStatus;

    fn bitor(self, rhs: InitStatus) -> InitStatus {
        InitStatus(self.0 | rhs.0)
    }
}

impl BitOr<InitError> for InitStatus {
    type Output = InitStatus;

    fn bitor(self, rhs: InitError) -> InitStatus {
        self | InitStatus::from(rhs)
    }
}

impl BitOrAssign for InitStatus {
    fn bitor_assign(&mut self, rhs: InitStatus) {
        *self = *self | rhs;
    }
}

impl BitOrAssign<InitError> for InitStatus {
    fn bitor_assign(&mut self, rhs: InitError) {
        *self = *self | rhs;
    }
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return write!(f, "Success (0x00)");
        }
        for (i, cause) in self.causes().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(cause.name())?;
        }
        write!(f, " (0x{:02x})", self.bits())
    }
}

impl fmt::Debug for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InitStatus({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cause_bits_match_wire_values() {
        assert_eq!(InitError::SequenceViolation.bit(), 1);
        assert_eq!(InitError::NotImplemented.bit(), 2);
        assert_eq!(InitError::NoResponse.bit(), 4);
        assert_eq!(InitError::SelfTestFailure.bit(), 8);
        assert_eq!(InitError::InvalidConfiguration.bit(), 16);
        assert_eq!(InitError::UnknownError.bit(), 128);
    }

    #[test]
    fn success_is_identity() {
        let status = InitStatus::from(InitError::NoResponse);
        assert_eq!(status | InitStatus::SUCCESS, status);
        assert_eq!(InitStatus::SUCCESS.bits(), 0);
        assert!(InitStatus::SUCCESS.is_success());
        assert!(!status.is_success());
    }

    #[test]
    fn union_of_radio_failure_and_sequence_violation() {
        let status = InitStatus::from(InitError::UnknownError) | InitError::SequenceViolation;
        assert_eq!(status.bits(), 129);
        assert!(status.contains(InitError::UnknownError));
        assert!(status.contains(InitError::SequenceViolation));
    }

    #[test]
    fn from_bits_maps_reserved_bits_to_unknown() {
        assert_eq!(InitStatus::from_bits(0x04), InitError::NoResponse.into());
        assert_eq!(InitStatus::from_bits(0x20).bits(), 0x80);
        assert_eq!(InitStatus::from_bits(0x41).bits(), 0x81);
        assert_eq!(InitStatus::from_bits(0x9f).bits(), 0x9f);
    }

    #[test]
    fn from_result() {
        assert_eq!(InitStatus::from(Ok(())), InitStatus::SUCCESS);
        assert_eq!(InitStatus::from(Err(InitError::SelfTestFailure)).bits(), 8);
    }

    #[test]
    fn display_lists_causes() {
        assert_eq!(InitStatus::SUCCESS.to_string(), "Success (0x00)");
        let status = InitStatus::from_bits(0x81);
        assert_eq!(status.to_string(), "SequenceViolation|UnknownError (0x81)");
        assert_eq!(InitError::NoResponse.to_string(), "NoResponse (0x04)");
    }
}
