//! 通用 API 响应模型
//!
//! 所有接口返回统一格式

use serde::{Deserialize, Serialize};

use super::stock::{Region, Vendor};
use crate::services::stock::beijing_now;

/// 统一 API 响应结构
///
/// - success: 请求是否成功
/// - data: 响应数据（成功时有值）
/// - message: 响应消息
/// - timestamp: 响应时间（北京时间，RFC 3339）
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self::with_message(data, "Success")
    }

    /// 创建带说明的成功响应
    pub fn with_message(data: T, message: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.to_string(),
            timestamp: beijing_now().to_rfc3339(),
        }
    }

    /// 创建错误响应
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
            timestamp: beijing_now().to_rfc3339(),
        }
    }
}

/// 数据源及其支持的地区
#[derive(Debug, Serialize)]
pub struct VendorInfo {
    pub vendor: Vendor,
    pub regions: Vec<Region>,
}

/// 股票代码校验结果
#[derive(Debug, Serialize)]
pub struct CodeCheck {
    pub code: String,
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope() {
        let ok = ApiResponse::success(1);
        assert!(ok.success);
        assert_eq!(ok.data, Some(1));
        assert!(ok.timestamp.ends_with("+08:00"));

        let err = ApiResponse::<i32>::error("boom".to_string());
        assert!(!err.success);
        assert!(err.data.is_none());
        assert_eq!(err.message, "boom");
    }
}
