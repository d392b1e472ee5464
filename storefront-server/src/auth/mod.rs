//! 认证授权模块
//!
//! 提供 JWT 认证和角色检查：
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前用户上下文 (axum 提取器)
//! - [`AdminUser`] - 要求管理员角色的提取器

pub mod extractor;
pub mod jwt;

pub use extractor::{AdminUser, require_admin};
pub use jwt::{ADMIN_ROLE, Claims, CurrentUser, JwtConfig, JwtError, JwtService};
