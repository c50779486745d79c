//! 股票代码转换
//!
//! 把 `sh601038`、`HK00038` 这类代码解析为 地区+数字，
//! 并按数据源生成请求时使用的代码。

use std::sync::OnceLock;

use regex::Regex;

use crate::error::CodeError;
use crate::models::{Region, StockCode, Vendor};

fn code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-z]+)(\d+)$").unwrap())
}

/// 解析 地区+数字 格式的股票代码（大小写不敏感）
pub fn parse(code: &str) -> Result<StockCode, CodeError> {
    let lowered = code.to_lowercase();
    let caps = code_regex()
        .captures(&lowered)
        .ok_or_else(|| CodeError::Parse(code.to_string()))?;

    let region = Region::from_prefix(&caps[1]).ok_or_else(|| CodeError::Parse(code.to_string()))?;

    Ok(StockCode {
        region,
        number: caps[2].to_string(),
    })
}

pub fn is_valid(code: &str) -> bool {
    parse(code).is_ok()
}

/// 各数据源的地区前缀映射表
///
/// 两个数据源目前的前缀一致，数字部分直接拼接在前缀后。
fn region_prefix(vendor: Vendor, region: Region) -> Option<&'static str> {
    match (vendor, region) {
        (Vendor::Sina, Region::Sh) => Some("sh"),
        (Vendor::Sina, Region::Sz) => Some("sz"),
        (Vendor::Sina, Region::Hk) => Some("hk"),
        (Vendor::Tencent, Region::Sh) => Some("sh"),
        (Vendor::Tencent, Region::Sz) => Some("sz"),
        (Vendor::Tencent, Region::Hk) => Some("hk"),
    }
}

/// 按数据源名称查找数据源
pub fn vendor_by_name(name: &str) -> Result<Vendor, CodeError> {
    match name.to_lowercase().as_str() {
        "sina" => Ok(Vendor::Sina),
        "tencent" => Ok(Vendor::Tencent),
        _ => Err(CodeError::UnsupportedVendor(name.to_string())),
    }
}

/// 为指定数据源转换股票代码
pub fn convert_for_vendor(code: &str, vendor: Vendor) -> Result<String, CodeError> {
    let stock_code = parse(code)?;
    render(&stock_code, vendor)
}

pub fn render(stock_code: &StockCode, vendor: Vendor) -> Result<String, CodeError> {
    let prefix = region_prefix(vendor, stock_code.region).ok_or(CodeError::UnsupportedRegion {
        region: stock_code.region,
        vendor,
    })?;
    Ok(format!("{}{}", prefix, stock_code.number))
}

/// 数据源支持的地区
pub fn supported_regions(vendor: Vendor) -> Vec<Region> {
    Region::ALL
        .into_iter()
        .filter(|region| region_prefix(vendor, *region).is_some())
        .collect()
}

/// 把交易所后缀格式转换为前缀格式
///
/// `601038.SH` -> `sh601038`，`00038.HK` -> `hk00038`。
/// 无法识别的后缀或格式不符时原样返回。
pub fn convert_dotted_code(code: &str) -> String {
    let parts: Vec<&str> = code.split('.').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return code.to_string();
    }

    let market = parts[1].to_lowercase();
    match Region::from_prefix(&market) {
        Some(region) => format!("{}{}", region.as_str(), parts[0]),
        None => code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_codes() {
        let cases = vec![
            ("sh601038", Region::Sh, "601038"),
            ("SZ000001", Region::Sz, "000001"),
            ("Hk00038", Region::Hk, "00038"),
        ];

        for (input, region, number) in cases {
            let code = parse(input).unwrap();
            assert_eq!(code.region, region, "{}", input);
            assert_eq!(code.number, number, "{}", input);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_codes() {
        for input in ["", "601038", "sh", "sh60a038", "601038sh", "sh 601038", "601038.SH", "us00700"] {
            assert!(
                matches!(parse(input), Err(CodeError::Parse(_))),
                "{} 应该解析失败",
                input
            );
        }
    }

    #[test]
    fn test_convert_for_vendor() {
        assert_eq!(convert_for_vendor("SH601038", Vendor::Sina).unwrap(), "sh601038");
        assert_eq!(convert_for_vendor("hk00038", Vendor::Tencent).unwrap(), "hk00038");
        let vendor = vendor_by_name("Tencent").unwrap();
        assert_eq!(convert_for_vendor("sz000001", vendor).unwrap(), "sz000001");
    }

    #[test]
    fn test_convert_for_unknown_vendor() {
        assert_eq!(
            vendor_by_name("eastmoney"),
            Err(CodeError::UnsupportedVendor("eastmoney".to_string()))
        );
    }

    #[test]
    fn test_every_region_converts_for_both_vendors() {
        for vendor in [Vendor::Sina, Vendor::Tencent] {
            assert_eq!(supported_regions(vendor), Region::ALL.to_vec());
            for region in Region::ALL {
                let code = format!("{}12345", region);
                assert_eq!(convert_for_vendor(&code, vendor).unwrap(), code);
            }
        }
    }

    #[test]
    fn test_convert_dotted_code() {
        assert_eq!(convert_dotted_code("601038.SH"), "sh601038");
        assert_eq!(convert_dotted_code("000001.SZ"), "sz000001");
        assert_eq!(convert_dotted_code("00038.HK"), "hk00038");
        assert_eq!(convert_dotted_code("nodot"), "nodot");
        assert_eq!(convert_dotted_code("601038.SS"), "601038.SS");
        assert_eq!(convert_dotted_code("1.2.SH"), "1.2.SH");
        assert_eq!(convert_dotted_code(".SH"), ".SH");
    }
}
