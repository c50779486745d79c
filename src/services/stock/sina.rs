//! 新浪财经实时行情
//!
//! 对接 https://hq.sinajs.cn/list=<codes>，响应为 GB18030 编码，每行形如
//! `var hq_str_sh601038="一拖股份,10.00,10.01,10.05,...";`

use async_trait::async_trait;
use reqwest::Client;

use super::{
    beijing_now, change_percent, field_f64, field_i64, pair_lines, parse_datetime, FetchMode,
    QuoteSource, USER_AGENT,
};
use crate::error::FetchError;
use crate::models::{Quote, TimestampSource, Vendor};

/// 新浪实时行情 API
pub const SINA_QUOTE_API: &str = "https://hq.sinajs.cn/list=";

/// 至少需要的字段数
const MIN_FIELDS: usize = 5;

const IDX_NAME: usize = 0;
const IDX_PREV_CLOSE: usize = 2;
const IDX_PRICE: usize = 3;
const IDX_VOLUME: usize = 8;
const IDX_AMOUNT: usize = 9;
const IDX_DATE: usize = 30;
const IDX_TIME: usize = 31;

const DATETIME_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// 新浪财经数据源
pub struct SinaSource {
    client: Client,
    base_url: String,
}

impl SinaSource {
    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    /// 发起请求并返回转码后的响应体
    async fn fetch(&self, codes: &str) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, codes);
        log::debug!("请求新浪行情 URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Referer", "https://finance.sina.com.cn/")
            .header("User-Agent", USER_AGENT)
            .header("Accept", "*/*")
            .header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        let text = encoding_rs::GB18030.decode(&bytes).0.into_owned();

        if text.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(text)
    }
}

#[async_trait]
impl QuoteSource for SinaSource {
    fn vendor(&self) -> Vendor {
        Vendor::Sina
    }

    fn source_name(&self) -> &str {
        "新浪财经"
    }

    async fn fetch_one(&self, code: &str, _mode: FetchMode) -> Result<Quote, FetchError> {
        let text = self.fetch(code).await?;
        let line = text
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or(FetchError::EmptyBody)?;
        parse_line(line, code)
    }

    async fn fetch_many(&self, codes: &[String], _mode: FetchMode) -> Result<Vec<Quote>, FetchError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let text = self.fetch(&codes.join(",")).await?;
        let quotes = pair_lines(&text, codes, "hq_str_")
            .into_iter()
            .filter_map(|(code, line)| match parse_line(line, code) {
                Ok(quote) => Some(quote),
                Err(e) => {
                    log::debug!("跳过新浪行情 {}: {}", code, e);
                    None
                }
            })
            .collect();
        Ok(quotes)
    }
}

/// 取出 `var hq_str_xxx="...";` 引号内的内容，格式不符时返回 None
fn strip_assignment(line: &str) -> Option<&str> {
    let (_, rhs) = line.split_once('=')?;
    rhs.trim()
        .trim_end_matches(';')
        .trim_end()
        .strip_prefix('"')?
        .strip_suffix('"')
}

/// 解析单行新浪行情
pub fn parse_line(line: &str, code: &str) -> Result<Quote, FetchError> {
    let payload = strip_assignment(line)
        .ok_or_else(|| FetchError::Malformed(format!("非行情赋值语句 for {}", code)))?;
    let fields: Vec<&str> = payload.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return Err(FetchError::Malformed(format!(
            "字段数不足({}) for {}",
            fields.len(),
            code
        )));
    }

    let price = field_f64(&fields, IDX_PRICE);
    let prev_close = field_f64(&fields, IDX_PREV_CLOSE);

    let vendor_time = match (fields.get(IDX_DATE), fields.get(IDX_TIME)) {
        (Some(date), Some(time)) if !date.trim().is_empty() && !time.trim().is_empty() => {
            parse_datetime(&format!("{} {}", date.trim(), time.trim()), &DATETIME_LAYOUTS)
        }
        _ => None,
    };
    let (update_time, timestamp_source) = match vendor_time {
        Some(t) => (t, TimestampSource::Vendor),
        None => (beijing_now(), TimestampSource::CaptureTime),
    };

    Ok(Quote {
        name: fields[IDX_NAME].trim().to_string(),
        code: code.to_string(),
        price,
        change_percent: change_percent(price, prev_close),
        change_value: price - prev_close,
        volume: field_i64(&fields, IDX_VOLUME),
        amount: field_f64(&fields, IDX_AMOUNT),
        update_time,
        timestamp_source,
    })
}
