mod calibration;
mod error;

pub use calibration::{CALIBRATION_LEN, Calibration, InvalidCalibration};
pub use error::Error;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// BMP180默认I2C地址
pub const DEFAULT_ADDRESS: u8 = 0x77;

/// 校准数据起始寄存器 (22字节，只读)
const REG_CALIBRATION: u8 = 0xAA;
/// 芯片ID寄存器
const REG_CHIP_ID: u8 = 0xD0;
/// 测量控制寄存器
const REG_CONTROL: u8 = 0xF4;
/// 测量结果寄存器 (温度2字节，压力3字节)
const REG_RESULT: u8 = 0xF6;

/// 启动温度转换命令
const CMD_TEMPERATURE: u8 = 0x2E;
/// 启动压力转换命令（需加上 oss << 6）
const CMD_PRESSURE: u8 = 0x34;

/// BMP180芯片ID
const CHIP_ID: u8 = 0x55;

/// 温度转换时间 4.5ms，向上取整
const TEMPERATURE_CONVERSION_MS: u32 = 5;
/// 读取校准数据后的等待时间
const CALIBRATION_SETTLE_MS: u32 = 10;

/// 压力测量过采样设置
///
/// 采样次数越多噪声越低，但转换时间越长、功耗越高。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    /// 超低功耗，1次采样，4.5ms
    #[default]
    UltraLowPower = 0,
    /// 标准，2次采样，7.5ms
    Standard = 1,
    /// 高精度，4次采样，13.5ms
    HighResolution = 2,
    /// 超高精度，8次采样，25.5ms
    UltraHighResolution = 3,
}

impl Oversampling {
    /// 过采样指数 (0-3)
    pub fn exponent(self) -> u8 {
        self as u8
    }

    /// 压力转换等待时间(ms)，数据手册给出的最大转换时间向上取整
    pub fn conversion_time_ms(self) -> u32 {
        match self {
            Self::UltraLowPower => 5,
            Self::Standard => 8,
            Self::HighResolution => 14,
            Self::UltraHighResolution => 26,
        }
    }

    /// 启动压力转换时写入控制寄存器的命令字
    pub fn pressure_command(self) -> u8 {
        CMD_PRESSURE + (self.exponent() << 6)
    }
}

/// 驱动状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// 尚未读取校准数据
    Uninitialized,
    /// 校准数据已就绪，可以测量
    Calibrated,
    /// 正在进行温度转换
    MeasuringTemperature,
    /// 正在进行压力转换
    MeasuringPressure,
}

/// 一次完整测量的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// 温度，单位0.1℃，例如 253 表示 25.3℃
    pub deci_celsius: i32,
    /// 压力，单位Pa，例如 88007 表示 88.007kPa
    pub pressure: i32,
}

impl Measurement {
    /// 温度(℃)，保留一位小数
    pub fn temperature(&self) -> f32 {
        self.deci_celsius as f32 / 10.0
    }
}

/// BMP180 数字气压、温度传感器封装对象
///
/// 每个实例独占一条I2C总线句柄，保存自己的校准数据和最近一次测量结果，
/// 不同地址上的多个传感器可以各自创建实例。
pub struct BMP180<I2C, D> {
    /// I2C通信句柄
    i2c: I2C,
    /// 延时
    delay: D,
    /// I2C从设备地址
    /// - BMP180的地址通常为: 0x77
    i2c_addr: u8,
    /// 压力测量过采样设置
    oversampling: Oversampling,
    /// 驱动状态
    state: State,
    /// 校准参数
    calib: Option<Calibration>,
    /// 最近一次成功的测量结果
    last: Option<Measurement>,
}

/// 实现BMP180传感器操作
impl<I2C, D> BMP180<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// 使用默认地址和超低功耗模式创建BMP180传感器实例
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_config(i2c, delay, DEFAULT_ADDRESS, Oversampling::default())
    }

    /// 创建BMP180传感器实例
    ///
    /// 创建时不访问总线，需要调用`begin()`读取校准数据后才能测量。
    pub fn with_config(i2c: I2C, delay: D, i2c_addr: u8, oversampling: Oversampling) -> Self {
        Self {
            i2c,
            delay,
            i2c_addr,
            oversampling,
            state: State::Uninitialized,
            calib: None,
            last: None,
        }
    }

    /// 当前驱动状态
    pub fn state(&self) -> State {
        self.state
    }

    /// 已加载的校准参数
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calib.as_ref()
    }

    /// 当前过采样设置
    pub fn oversampling(&self) -> Oversampling {
        self.oversampling
    }

    /// 修改过采样设置，下一次测量生效
    pub fn set_oversampling(&mut self, oversampling: Oversampling) {
        self.oversampling = oversampling;
    }

    /// 检查传感器是否在线（芯片ID是否为0x55）
    pub fn check_connected(&mut self) -> Result<bool, Error<I2C::Error>> {
        let mut chip_id = [0u8];
        self.i2c.write_read(self.i2c_addr, &[REG_CHIP_ID], &mut chip_id)?;

        Ok(chip_id[0] == CHIP_ID)
    }

    /// 读取校准数据
    ///
    /// 可以重复调用以重新加载校准数据；失败时保留原有状态和校准数据。
    pub fn begin(&mut self) -> Result<(), Error<I2C::Error>> {
        // 读取全部11个校准系数 (0xAA-0xBF)
        let mut calib_data = [0u8; CALIBRATION_LEN];
        self.i2c.write_read(self.i2c_addr, &[REG_CALIBRATION], &mut calib_data)?;

        // 解析并校验
        let calib = Calibration::load(&calib_data)?;
        log::debug!("BMP180(0x{:02X})校准参数: {:?}", self.i2c_addr, calib);

        self.delay.delay_ms(CALIBRATION_SETTLE_MS);

        // 保存校准数据
        self.calib = Some(calib);
        self.state = State::Calibrated;

        // OK
        Ok(())
    }

    /// 执行一次完整的温度、压力测量
    ///
    /// 先测温度再测压力，压力补偿依赖本次温度补偿得到的B5。
    /// 任何一步失败都不会覆盖上一次成功的测量结果。
    pub fn measure(&mut self) -> Result<Measurement, Error<I2C::Error>> {
        let calib = self.calib.ok_or(Error::NotCalibrated)?;

        let result = self.run_cycle(&calib);
        // 无论成功与否都回到已校准状态，可以直接重试
        self.transition(State::Calibrated);
        let measurement = result?;

        self.last = Some(measurement);

        // OK
        Ok(measurement)
    }

    /// 最近一次测量的温度(℃)，尚未成功测量时返回None
    pub fn temperature(&self) -> Option<f32> {
        self.last.map(|m| m.temperature())
    }

    /// 最近一次测量的压力(Pa)，尚未成功测量时返回None
    pub fn pressure(&self) -> Option<i32> {
        self.last.map(|m| m.pressure)
    }

    /// 最近一次成功的测量结果
    pub fn last_measurement(&self) -> Option<Measurement> {
        self.last
    }

    /// 释放I2C总线和延时对象
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn transition(&mut self, state: State) {
        log::trace!("BMP180(0x{:02X}): {:?} -> {:?}", self.i2c_addr, self.state, state);
        self.state = state;
    }

    fn run_cycle(&mut self, calib: &Calibration) -> Result<Measurement, Error<I2C::Error>> {
        self.transition(State::MeasuringTemperature);
        let ut = self.read_raw_temperature()?;
        let (deci_celsius, b5) = calib.compensate_temperature(ut)?;

        // 过采样设置在整个压力转换期间保持不变
        let oversampling = self.oversampling;
        self.transition(State::MeasuringPressure);
        let up = self.read_raw_pressure(oversampling)?;
        let pressure = calib.compensate_pressure(up, b5, oversampling)?;

        Ok(Measurement {
            deci_celsius: i32::try_from(deci_celsius).map_err(|_| Error::CalibrationInvalid)?,
            pressure: i32::try_from(pressure).map_err(|_| Error::CalibrationInvalid)?,
        })
    }

    /// 读取原始温度值
    fn read_raw_temperature(&mut self) -> Result<u16, Error<I2C::Error>> {
        // 启动温度转换
        self.i2c.write(self.i2c_addr, &[REG_CONTROL, CMD_TEMPERATURE])?;

        // 等待转换完成，提前读取会得到无效数据
        self.delay.delay_ms(TEMPERATURE_CONVERSION_MS);

        // 读取16位温度数据 (0xF6-0xF7)
        let mut data = [0u8; 2];
        self.i2c.write_read(self.i2c_addr, &[REG_RESULT], &mut data)?;

        Ok(u16::from_be_bytes(data))
    }

    /// 读取原始压力值，已按过采样设置归一化
    fn read_raw_pressure(&mut self, oversampling: Oversampling) -> Result<u32, Error<I2C::Error>> {
        // 启动压力转换
        self.i2c.write(self.i2c_addr, &[REG_CONTROL, oversampling.pressure_command()])?;

        // 等待转换完成，等待时间取决于过采样设置
        self.delay.delay_ms(oversampling.conversion_time_ms());

        // 读取24位压力数据 (0xF6-0xF8)
        let mut data = [0u8; 4];
        self.i2c.write_read(self.i2c_addr, &[REG_RESULT], &mut data[1..])?;
        let raw = u32::from_be_bytes(data);

        Ok(raw >> (8 - oversampling.exponent()))
    }
}
