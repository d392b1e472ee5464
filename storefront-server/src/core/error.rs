use thiserror::Error;

use crate::utils::AppError;

/// 服务器启动/运行错误
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(#[from] AppError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 服务器操作的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
