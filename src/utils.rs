//! Path processing utility functions / 路径处理工具函数

use crate::error::RelayError;

/// Split a share-relative path into safe segments / 拆分共享内相对路径
/// 1. Both `/` and `\` separate segments / 正反斜杠均为分隔符
/// 2. Empty and `.` segments are dropped / 忽略空段和 `.`
/// 3. `..` and NUL are rejected, never resolved / 拒绝 `..` 与空字符
pub fn safe_segments(path: &str) -> Result<Vec<&str>, RelayError> {
    if path.contains('\0') {
        return Err(RelayError::InvalidPath(format!("{:?} contains a null byte", path)));
    }

    let mut parts = Vec::new();
    for part in path.split(['/', '\\']) {
        match part.trim() {
            "" | "." => continue,
            ".." => {
                return Err(RelayError::InvalidPath(format!(
                    "{:?} escapes the share root",
                    path
                )))
            }
            _ => parts.push(part),
        }
    }
    Ok(parts)
}

/// Normalize a base path to `/a/b` form / 规范化基础路径
pub fn normalize_base_path(path: &str) -> Result<String, RelayError> {
    let parts = safe_segments(path)?;
    if parts.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{}", parts.join("/")))
    }
}

/// Reduce a client-supplied file name to its last component / 取客户端文件名的最后一段
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match last {
        "" | "." | ".." => None,
        _ if last.contains('\0') => None,
        _ => Some(last.to_string()),
    }
}

/// Get file extension (lowercase, with dot) / 获取文件扩展名
pub fn get_ext(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Empty allow-list accepts everything / 空列表表示不限制
pub fn is_allowed_extension(name: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let ext = get_ext(name);
    allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext))
}

/// Stored name: `<millis>_<name>` / 带时间戳前缀的文件名
pub fn timestamped_name(millis: i64, name: &str) -> String {
    format!("{}_{}", millis, name)
}

/// Windows-style share path `\\server\share\a\b` / 生成 UNC 路径
pub fn unc_path(server: &str, share: &str, segments: &[&str]) -> String {
    let mut out = format!(r"\\{}\{}", server, share);
    for seg in segments {
        for part in seg.split(['/', '\\']).filter(|p| !p.is_empty()) {
            out.push('\\');
            out.push_str(part);
        }
    }
    out
}
