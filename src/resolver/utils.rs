// Helper functions shared by the process runner and the parser

use lazy_static::lazy_static;
use regex::Regex;
use tokio::process::Command;

lazy_static! {
    static ref ILLEGAL_FILENAME_CHARS: Regex = Regex::new(r#"[\x00-\x1f/\\:*?"<>|]+"#).unwrap();
    static ref REPEATED_UNDERSCORES: Regex = Regex::new(r"_{2,}").unwrap();
}

/// Directory appended to PATH on macOS, where GUI apps do not inherit it
pub const LOCAL_BIN_DIR: &str = "/usr/local/bin";

/// Force UTF-8 output from the (Python based) resolver tools
pub fn apply_utf8_env(cmd: &mut Command) {
    cmd.env("PYTHONIOENCODING", "utf8");

    #[cfg(target_os = "macos")]
    {
        cmd.env("LC_CTYPE", "en_US.UTF-8");
        let path = std::env::var("PATH").unwrap_or_default();
        cmd.env("PATH", path_with_local_bin(&path));
    }
}

/// Append `LOCAL_BIN_DIR` to a PATH value unless it is already there
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub fn path_with_local_bin(path: &str) -> String {
    if path.split(':').any(|entry| entry == LOCAL_BIN_DIR) {
        path.to_string()
    } else if path.is_empty() {
        LOCAL_BIN_DIR.to_string()
    } else {
        format!("{}:{}", path, LOCAL_BIN_DIR)
    }
}

/// Make a resolver-supplied title safe to use as a file or directory name
pub fn sanitize_file_name(name: &str) -> String {
    const NAME_MAX: usize = 200;

    let replaced = ILLEGAL_FILENAME_CHARS.replace_all(name, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches(|c: char| c.is_whitespace() || c == '.' || c == '_');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitized title for naming files, `untitled` when nothing is left
pub fn file_stem(title: &str) -> String {
    match sanitize_file_name(title) {
        s if s.is_empty() => "untitled".to_string(),
        s => s,
    }
}

/// Host part of a stream URL, `None` when the URL does not parse
pub fn host_of(stream_url: &str) -> Option<String> {
    url::Url::parse(stream_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_bin_appended_once() {
        assert_eq!(path_with_local_bin("/usr/bin:/bin"), "/usr/bin:/bin:/usr/local/bin");
        assert_eq!(
            path_with_local_bin("/usr/local/bin:/usr/bin"),
            "/usr/local/bin:/usr/bin"
        );
        assert_eq!(path_with_local_bin(""), "/usr/local/bin");
    }

    #[test]
    fn local_bin_prefix_is_not_a_match() {
        assert_eq!(
            path_with_local_bin("/usr/local/bin2"),
            "/usr/local/bin2:/usr/local/bin"
        );
    }

    #[test]
    fn sanitize_replaces_separators() {
        assert_eq!(sanitize_file_name("a/b\\c: d?"), "a_b_c_ d");
        assert_eq!(sanitize_file_name("  ..Show..  "), "Show");
        assert_eq!(sanitize_file_name("ep//01"), "ep_01");
    }

    #[test]
    fn sanitize_keeps_unicode() {
        assert_eq!(sanitize_file_name("第1话 开始"), "第1话 开始");
    }

    #[test]
    fn empty_title_stem() {
        assert_eq!(file_stem(" / "), "untitled");
        assert_eq!(file_stem("Show"), "Show");
    }

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("https://cdn.example.com/a.mp4?x=1"), Some("cdn.example.com".to_string()));
        assert_eq!(host_of("not a url"), None);
    }
}
