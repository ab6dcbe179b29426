use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 统一错误类型
/// 封装规划过程中可能出现的各种错误，提供统一的错误处理机制
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum AppError {
    /// 通用错误，包含错误消息
    #[error("通用错误: {message}")]
    Generic { message: String },

    /// 输入/输出错误
    #[error("IO错误: {message} (Kind: {kind})")]
    IoError { message: String, kind: String },

    /// 文档无法解析
    #[error("文档无法解析: {message}")]
    DocumentUnreadable { message: String },

    /// 文档中没有任何表格区域
    #[error("文档中未找到任何表格区域")]
    NoTables,

    /// 数据行缺少基本标识信息（位号与描述均为空）
    #[error("数据行无法识别: 第{row_number}行位号与描述均为空")]
    AmbiguousRow { row_number: usize },

    /// 调用方输入数据无效
    #[error("输入数据无效: {message}")]
    InputError { message: String },

    /// 系统配置规则冲突
    #[error("配置错误: {message}")]
    ConfigurationError { message: String },

    /// 模块放置违反槽位规则
    #[error("模块放置错误: 机架{rack_id}槽位{slot_id} - {message}")]
    PlacementError {
        rack_id: u32,
        slot_id: u32,
        message: String,
    },

    /// 模块型号无法解析
    #[error("未知模块型号: {model}")]
    UnknownModule { model: String },

    /// 点表数据验证错误
    #[error("验证错误: {message}")]
    ValidationError { message: String },

    /// JSON序列化/反序列化错误
    #[error("JSON序列化/反序列化错误: {message}")]
    JsonError { message: String },
}

impl AppError {
    /// 创建通用错误
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// 创建IO错误
    pub fn io_error(message: impl Into<String>, kind_str: impl Into<String>) -> Self {
        Self::IoError {
            message: message.into(),
            kind: kind_str.into(),
        }
    }

    /// 创建文档解析错误
    pub fn document_unreadable(message: impl Into<String>) -> Self {
        Self::DocumentUnreadable {
            message: message.into(),
        }
    }

    /// 创建输入错误
    pub fn input_error(message: impl Into<String>) -> Self {
        Self::InputError {
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// 创建模块放置错误
    pub fn placement_error(rack_id: u32, slot_id: u32, message: impl Into<String>) -> Self {
        Self::PlacementError {
            rack_id,
            slot_id,
            message: message.into(),
        }
    }

    /// 创建未知模块错误
    pub fn unknown_module(model: impl Into<String>) -> Self {
        Self::UnknownModule {
            model: model.into(),
        }
    }

    /// 创建验证错误
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// 获取错误代码，便于日志检索与断言
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Generic { .. } => "GENERIC",
            AppError::IoError { .. } => "IO_ERROR",
            AppError::DocumentUnreadable { .. } => "DOCUMENT_UNREADABLE",
            AppError::NoTables => "NO_TABLES",
            AppError::AmbiguousRow { .. } => "AMBIGUOUS_ROW",
            AppError::InputError { .. } => "INPUT_ERROR",
            AppError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            AppError::PlacementError { .. } => "PLACEMENT_ERROR",
            AppError::UnknownModule { .. } => "UNKNOWN_MODULE",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::JsonError { .. } => "JSON_ERROR",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            message: err.to_string(),
            kind: format!("{:?}", err.kind()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError {
            message: err.to_string(),
        }
    }
}

impl From<String> for AppError {
    fn from(message: String) -> Self {
        Self::Generic { message }
    }
}

impl From<&str> for AppError {
    fn from(message: &str) -> Self {
        Self::Generic {
            message: message.to_string(),
        }
    }
}

/// 统一结果类型别名
pub type AppResult<T> = Result<T, AppError>;
