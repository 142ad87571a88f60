//! 配置校验模块
//!
//! 校验规则：
//! - 字段级约束 (`validator` derive)：函数名非空、workers >= 1、队列容量 >= 1、退避 >= 1ms
//! - HTTP 方法是合法的 token
//! - 副本名称唯一，地址非空

use std::collections::HashSet;

use contracts::{ContractError, DispatchConfig};
use validator::{Validate, ValidationErrors};

/// 校验 DispatchConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &DispatchConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_method(config)?;
    validate_replica_names(config)?;
    Ok(())
}

/// 字段级约束
fn validate_fields(config: &DispatchConfig) -> Result<(), ContractError> {
    config.validate().map_err(first_violation)
}

/// 取出第一个字段错误，路径形如 `router.workers` / `replicas[0].name`
fn first_violation(errors: ValidationErrors) -> ContractError {
    let mut flat = Vec::new();
    flatten(String::new(), &errors, &mut flat);
    flat.sort();

    match flat.into_iter().next() {
        Some((field, message)) => ContractError::config_validation(field, message),
        None => ContractError::config_validation("<root>", errors.to_string()),
    }
}

fn flatten(prefix: String, errors: &ValidationErrors, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            validator::ValidationErrorsKind::Field(list) => {
                for e in list {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    out.push((path.clone(), message));
                }
            }
            validator::ValidationErrorsKind::Struct(inner) => {
                flatten(path, inner, out);
            }
            validator::ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

/// HTTP 方法必须是 RFC 9110 token
fn validate_method(config: &DispatchConfig) -> Result<(), ContractError> {
    let method = &config.invoker.method;
    let is_tchar = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);

    if method.is_empty() || !method.chars().all(is_tchar) {
        return Err(ContractError::config_validation(
            "invoker.method",
            format!("'{method}' is not a valid HTTP method"),
        ));
    }
    Ok(())
}

/// 校验副本名称唯一性
fn validate_replica_names(config: &DispatchConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for replica in &config.replicas {
        if !seen.insert(&replica.name) {
            return Err(ContractError::config_validation(
                format!("replicas[name={}]", replica.name),
                "duplicate replica name",
            ));
        }
    }
    Ok(())
}
