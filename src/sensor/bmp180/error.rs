use std::fmt::{Debug, Display};

/// BMP180驱动错误
///
/// 泛型参数`E`是底层I2C总线的错误类型，驱动内部不做任何重试，
/// 所有错误原样返回给调用方决定如何处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// 尚未成功调用`begin()`读取校准数据就发起了测量
    ///
    /// 此时驱动不会访问总线。
    NotCalibrated,
    /// I2C总线通信失败（包括超时）
    Bus(E),
    /// 校准数据无效
    ///
    /// 传感器出厂校准数据中任意一个16位字为0x0000或0xFFFF时，
    /// 通常表示通信故障；补偿计算中出现除数为0也归为此类。
    CalibrationInvalid,
}

impl<E> From<E> for Error<E>
where
    E: embedded_hal::i2c::Error,
{
    fn from(err: E) -> Self {
        Self::Bus(err)
    }
}

impl<E: Debug> Display for Error<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotCalibrated => write!(f, "传感器未校准，请先调用begin()"),
            Self::Bus(err) => write!(f, "I2C总线通信失败: {:?}", err),
            Self::CalibrationInvalid => write!(f, "传感器校准数据无效"),
        }
    }
}

impl<E: Debug> std::error::Error for Error<E> {}
