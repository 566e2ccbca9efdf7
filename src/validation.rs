//! 入力検証
//!
//! フォームとアップロードファイルの検証。ここで弾いたものは
//! リクエストを一切送らない。

use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

/// パスワードの最小文字数
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// アップロード上限（5 MiB）
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
/// 登録時に選べるロール
pub const ROLES: &[&str] = &["teacher", "principal", "admin"];

pub const CSV_MIME: &str = "text/csv";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// 検証エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("Unknown role '{0}', expected one of: teacher, principal, admin")]
    UnknownRole(String),

    #[error("Please upload a CSV or Excel file ({file_name})")]
    UnsupportedFileType { file_name: String },

    #[error("File size should be less than 5MB ({size} bytes)")]
    FileTooLarge { size: u64 },
}

/// ログインフォーム
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        Ok(())
    }

    /// `POST /login` のボディ
    pub fn to_payload(&self) -> Value {
        json!({
            "email": self.email.trim(),
            "password": self.password,
        })
    }
}

/// 新規登録フォーム
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub school_name: String,
    pub role: String,
}

impl RegistrationForm {
    /// 必須項目、パスワード一致、長さ、ロールの順に検証
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            self.name.trim(),
            self.email.trim(),
            self.password.as_str(),
            self.confirm_password.as_str(),
            self.school_name.trim(),
            self.role.trim(),
        ];
        if required.iter().any(|field| field.is_empty()) {
            return Err(ValidationError::MissingFields);
        }

        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }

        let role = self.role.trim().to_lowercase();
        if !ROLES.contains(&role.as_str()) {
            return Err(ValidationError::UnknownRole(self.role.clone()));
        }

        Ok(())
    }

    /// `POST /register` のボディ（確認用パスワードは送らない）
    pub fn to_payload(&self) -> Value {
        json!({
            "name": self.name.trim(),
            "email": self.email.trim(),
            "password": self.password,
            "school_name": self.school_name.trim(),
            "role": self.role.trim().to_lowercase(),
        })
    }
}

/// アップロードファイルを検証してMIMEタイプを返す
pub fn validate_upload(file_name: &str, size: u64) -> Result<&'static str, ValidationError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let mime = match extension.as_deref() {
        Some("csv") => CSV_MIME,
        Some("xls") => XLS_MIME,
        Some("xlsx") => XLSX_MIME,
        _ => {
            return Err(ValidationError::UnsupportedFileType {
                file_name: file_name.to_string(),
            })
        }
    };

    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge { size });
    }

    Ok(mime)
}
