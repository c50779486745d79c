//! 腾讯股票实时行情
//!
//! 对接 http://qt.gtimg.cn/q=<codes>，每行形如 `v_hk00038="100~第一拖拉机股份~00038~...";`，
//! 引号内容以 `~` 分隔。

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use super::{
    beijing_now, field_f64, first_positive, pair_lines, parse_datetime, parse_time_today,
    FetchMode, QuoteSource, USER_AGENT,
};
use crate::error::FetchError;
use crate::models::{Quote, TimestampSource, Vendor};

/// 腾讯行情 API（只支持 http）
pub const TENCENT_QUOTE_API: &str = "http://qt.gtimg.cn/q=";

const MIN_FIELDS: usize = 10;

const IDX_NAME: usize = 1;
const IDX_PRICE: usize = 3;
const IDX_PREV_CLOSE: usize = 4;
const IDX_TIME: usize = 30;
const IDX_CHANGE_VALUE: usize = 31;
const IDX_CHANGE_PERCENT: usize = 32;

/// 成交量字段位置历史上变动过，按顺序尝试
const VOLUME_FIELDS: [usize; 3] = [6, 36, 28];
const AMOUNT_FIELDS: [usize; 2] = [37, 38];

const PRIMARY_TIME_LAYOUT: &str = "%Y/%m/%d %H:%M:%S";
const ALT_TIME_LAYOUTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y%m%d%H%M%S"];
const TIME_OF_DAY_LAYOUT: &str = "%H:%M:%S";

/// 腾讯股票数据源
pub struct TencentSource {
    client: Client,
    base_url: String,
}

impl TencentSource {
    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    fn request(&self, codes: &str, mode: FetchMode) -> RequestBuilder {
        let url = match mode {
            FetchMode::Standard => format!("{}{}", self.base_url, codes),
            FetchMode::RealTime => {
                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();
                format!("{}{}&_t={}", self.base_url, codes, nanos)
            }
        };
        log::debug!("请求腾讯行情 URL: {}", url);

        let builder = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Referer", "http://gu.qq.com/")
            .header("Accept", "*/*")
            .header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8")
            .header("Accept-Charset", "utf-8,gbk,gb2312;q=0.7,*;q=0.7");

        match mode {
            FetchMode::Standard => builder,
            FetchMode::RealTime => builder
                .header("Cache-Control", "no-cache, no-store, must-revalidate")
                .header("Pragma", "no-cache")
                .header("Expires", "0"),
        }
    }

    async fn fetch(&self, codes: &str, mode: FetchMode) -> Result<String, FetchError> {
        let response = self.request(codes, mode).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        // 接口实际返回 GBK，部分代理会转成 UTF-8
        let text = match std::str::from_utf8(&bytes) {
            Ok(s) => s.to_string(),
            Err(_) => encoding_rs::GB18030.decode(&bytes).0.into_owned(),
        };

        if text.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }
        if !text.contains('"') {
            return Err(FetchError::Malformed("响应中没有引号包裹的数据".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl QuoteSource for TencentSource {
    fn vendor(&self) -> Vendor {
        Vendor::Tencent
    }

    fn source_name(&self) -> &str {
        "腾讯股票"
    }

    async fn fetch_one(&self, code: &str, mode: FetchMode) -> Result<Quote, FetchError> {
        let text = self.fetch(code, mode).await?;
        parse_line(&text, code)
    }

    async fn fetch_many(&self, codes: &[String], mode: FetchMode) -> Result<Vec<Quote>, FetchError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let text = self.fetch(&codes.join(","), mode).await?;
        let quotes = pair_lines(&text, codes, "v_")
            .into_iter()
            .filter_map(|(code, line)| match parse_line(line, code) {
                Ok(quote) => Some(quote),
                Err(e) => {
                    log::debug!("跳过腾讯行情 {}: {}", code, e);
                    None
                }
            })
            .collect();
        Ok(quotes)
    }
}

fn parse_update_time(raw: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "0" {
        return None;
    }

    parse_datetime(raw, &[PRIMARY_TIME_LAYOUT])
        .or_else(|| parse_datetime(raw, &ALT_TIME_LAYOUTS))
        .or_else(|| parse_time_today(raw, TIME_OF_DAY_LAYOUT, beijing_now().date_naive()))
}

/// 解析腾讯行情数据，`data` 可以是完整响应或单行
pub fn parse_line(data: &str, code: &str) -> Result<Quote, FetchError> {
    let (start, end) = match (data.find('"'), data.rfind('"')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(FetchError::Malformed(format!("数据格式错误 for {}", code))),
    };

    let content = &data[start + 1..end];
    let fields: Vec<&str> = content.split('~').collect();
    if fields.len() < MIN_FIELDS {
        return Err(FetchError::Malformed(format!(
            "数据字段不足({}) for {}",
            fields.len(),
            code
        )));
    }

    let price = field_f64(&fields, IDX_PRICE);
    let prev_close = field_f64(&fields, IDX_PREV_CLOSE);

    // 优先使用接口直接给出的涨跌额/涨跌幅，两者都为 0 时再根据昨收计算
    let mut change_value = field_f64(&fields, IDX_CHANGE_VALUE);
    let mut change_percent = field_f64(&fields, IDX_CHANGE_PERCENT);
    if change_value == 0.0 && change_percent == 0.0 && prev_close != 0.0 {
        change_value = price - prev_close;
        change_percent = change_value / prev_close * 100.0;
    }

    let volume = first_positive(&fields, &VOLUME_FIELDS)
        .map(|v| v as i64)
        .unwrap_or(0);
    let amount = first_positive(&fields, &AMOUNT_FIELDS).unwrap_or(0.0);

    let (update_time, timestamp_source) = match fields.get(IDX_TIME).and_then(|raw| parse_update_time(raw)) {
        Some(t) => (t, TimestampSource::Vendor),
        None => (beijing_now(), TimestampSource::CaptureTime),
    };

    log::trace!(
        "腾讯行情解析结果 - 股票: {}, 价格: {:.2}, 成交量: {}, 成交额: {:.2}",
        fields[IDX_NAME],
        price,
        volume,
        amount
    );

    Ok(Quote {
        name: fields[IDX_NAME].trim().to_string(),
        code: code.to_string(),
        price,
        change_percent,
        change_value,
        volume,
        amount,
        update_time,
        timestamp_source,
    })
}
