use super::Oversampling;

/// 校准数据块长度：11个16位系数，共22字节
pub const CALIBRATION_LEN: usize = 22;

/// 校准数据无效
///
/// 读取到的系数为0x0000/0xFFFF，或补偿计算中出现除数为0、溢出，
/// 都说明校准数据已损坏，继续计算没有意义。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCalibration;

impl<E> From<InvalidCalibration> for super::Error<E> {
    fn from(_: InvalidCalibration) -> Self {
        super::Error::CalibrationInvalid
    }
}

/// BMP180传感器校准参数结构体
///
/// 该结构体存储了从传感器EEPROM中读取的11个出厂校准系数，
/// 用于温度和压力的补偿计算。每颗传感器的系数都不相同，
/// 读取一次后在整个会话期间保持不变。
///
/// # 存储分布
/// - 地址 0xAA-0xBF (22字节)，每个系数2字节，大端序
/// - 顺序: AC1, AC2, AC3, AC4, AC5, AC6, B1, B2, MB, MC, MD
///
/// # 符号
/// AC4、AC5、AC6为无符号16位整数，其余均为有符号16位整数。
/// 符号解析错误会导致后续所有计算结果错误。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    /// 压力校准系数 AC1 (0xAA-0xAB)
    pub ac1: i16,
    /// 压力校准系数 AC2 (0xAC-0xAD)
    pub ac2: i16,
    /// 压力校准系数 AC3 (0xAE-0xAF)
    pub ac3: i16,
    /// 压力校准系数 AC4 (0xB0-0xB1)，无符号
    pub ac4: u16,
    /// 温度校准系数 AC5 (0xB2-0xB3)，无符号
    pub ac5: u16,
    /// 温度校准系数 AC6 (0xB4-0xB5)，无符号
    ///
    /// ## 计算公式
    /// ```text
    /// X1 = ((UT - AC6) * AC5) >> 15
    /// ```
    pub ac6: u16,
    /// 压力校准系数 B1 (0xB6-0xB7)
    pub b1: i16,
    /// 压力校准系数 B2 (0xB8-0xB9)
    pub b2: i16,
    /// 系数 MB (0xBA-0xBB)
    ///
    /// 补偿公式中并未使用，仅用于校验数据完整性。
    pub mb: i16,
    /// 温度校准系数 MC (0xBC-0xBD)
    pub mc: i16,
    /// 温度校准系数 MD (0xBE-0xBF)
    ///
    /// ## 计算公式
    /// ```text
    /// X2 = (MC << 11) / (X1 + MD)
    /// ```
    pub md: i16,
}

impl Calibration {
    /// 按大端序解析22字节校准数据块（不做有效性校验）
    pub fn from_bytes(data: &[u8; CALIBRATION_LEN]) -> Self {
        let word = |offset: usize| [data[offset], data[offset + 1]];

        Self {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(2)),
            ac3: i16::from_be_bytes(word(4)),
            ac4: u16::from_be_bytes(word(6)),
            ac5: u16::from_be_bytes(word(8)),
            ac6: u16::from_be_bytes(word(10)),
            b1: i16::from_be_bytes(word(12)),
            b2: i16::from_be_bytes(word(14)),
            mb: i16::from_be_bytes(word(16)),
            mc: i16::from_be_bytes(word(18)),
            md: i16::from_be_bytes(word(20)),
        }
    }

    /// 解析并校验22字节校准数据块
    ///
    /// 数据手册约定：任何一个系数都不应为0x0000或0xFFFF，
    /// 出现这两个值说明通信出现了故障。
    pub fn load(data: &[u8; CALIBRATION_LEN]) -> Result<Self, InvalidCalibration> {
        let corrupted = data
            .chunks_exact(2)
            .map(|word| u16::from_be_bytes([word[0], word[1]]))
            .any(|word| word == 0x0000 || word == 0xFFFF);
        if corrupted {
            return Err(InvalidCalibration);
        }

        // OK
        Ok(Self::from_bytes(data))
    }

    /// BMP180温度补偿函数
    ///
    /// ## 参数
    /// - `ut`: 从寄存器 0xF6-0xF7 读取的原始16位温度ADC值
    ///
    /// ## 返回
    /// - `(i64, i64)`: 元组包含补偿后的温度值(单位0.1℃)和中间值 B5
    ///
    /// B5 是压力补偿的必要输入，每次测量都必须先算温度再算压力。
    /// 全部使用64位有符号整数运算，右移为算术右移。
    pub fn compensate_temperature(&self, ut: u16) -> Result<(i64, i64), InvalidCalibration> {
        let ut = ut as i64;
        let ac5 = self.ac5 as i64;
        let ac6 = self.ac6 as i64;
        let mc = self.mc as i64;
        let md = self.md as i64;

        let x1 = ((ut - ac6) * ac5) >> 15;
        // X1 + MD 为0只可能是校准数据损坏
        let x2 = (mc << 11).checked_div(x1 + md).ok_or(InvalidCalibration)?;
        let b5 = x1 + x2;
        let temperature = (b5 + 8) >> 4;
        log::trace!("温度补偿: UT={} X1={} X2={} B5={} T={}", ut, x1, x2, b5, temperature);

        // OK
        Ok((temperature, b5))
    }

    /// BMP180压力补偿函数
    ///
    /// ## 参数
    /// - `up`: 已按 `8 - oss` 右移归一化的原始压力ADC值
    /// - `b5`: 本次测量中温度补偿得到的中间值
    /// - `oversampling`: 本次压力转换使用的过采样设置
    ///
    /// ## 返回
    /// - `i64`: 补偿后的压力值(Pa)
    ///
    /// `B7 < 0x80000000` 分支按64位有符号数比较，B7为负数时走左移分支，
    /// 这与传感器原厂32位无符号实现在越界读数下的行为不同。
    /// B7 < 2^31 时先左移再除，保留了余数的最高位，
    /// 结果可能比先除再左移的写法大1Pa。
    pub fn compensate_pressure(
        &self,
        up: u32,
        b5: i64,
        oversampling: Oversampling,
    ) -> Result<i64, InvalidCalibration> {
        let oss = oversampling.exponent() as u32;
        let up = up as i64;
        let ac1 = self.ac1 as i64;
        let ac2 = self.ac2 as i64;
        let ac3 = self.ac3 as i64;
        let ac4 = self.ac4 as i64;
        let b1 = self.b1 as i64;
        let b2 = self.b2 as i64;

        // 步骤1: 计算B3
        let b6 = b5 - 4000;
        let x1 = (b2 * ((b6 * b6) >> 12)) >> 11;
        let x2 = (ac2 * b6) >> 11;
        let x3 = x1 + x2;
        let b3 = (((ac1 * 4 + x3) << oss) + 2) >> 2;

        // 步骤2: 计算B4
        let x1 = (ac3 * b6) >> 13;
        let x2 = (b1 * ((b6 * b6) >> 12)) >> 16;
        let x3 = ((x1 + x2) + 2) >> 2;
        let b4 = (ac4 * (x3 + 32768)) >> 15;

        // 步骤3: 计算初步压力值
        let b7 = (up - b3) * (50000 >> oss);
        let p = if b7 < 0x8000_0000 {
            (b7 << 1).checked_div(b4).ok_or(InvalidCalibration)?
        } else {
            b7.checked_div(b4).ok_or(InvalidCalibration)? << 1
        };
        log::trace!(
            "压力补偿: UP={} B3={} B4={} B5={} B6={} B7={}",
            up,
            b3,
            b4,
            b5,
            b6,
            b7
        );

        // 步骤4: 应用最终补偿
        // 正常读数不会溢出，溢出只可能来自损坏的B4
        let x1 = (p >> 8).checked_mul(p >> 8).ok_or(InvalidCalibration)?;
        let x1 = x1.checked_mul(3038).ok_or(InvalidCalibration)? >> 16;
        let x2 = p.checked_mul(-7357).ok_or(InvalidCalibration)? >> 16;
        let p = p + ((x1 + x2 + 3791) >> 4);

        // 返回压力值
        Ok(p)
    }
}
