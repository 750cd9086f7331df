// CLI extractor - drives the native `yt-dlp` binary

use async_trait::async_trait;

use super::traits::{ExtractionTool, ExtractorConfig, ToolOutput};
use crate::downloader::credentials::CredentialToken;
use crate::downloader::errors::DownloadError;
use crate::downloader::utils::{find_ytdlp, run_output_with_timeout};

pub struct YtDlpCli {
    ytdlp_path: String,
    config: ExtractorConfig,
}

impl YtDlpCli {
    pub fn new(ytdlp_path: Option<String>, config: ExtractorConfig) -> Self {
        Self {
            ytdlp_path: ytdlp_path.unwrap_or_else(find_ytdlp),
            config,
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        args
    }

    fn info_args(&self, link: &str, cookies: &CredentialToken) -> Vec<String> {
        let mut args = self.base_args();
        args.extend([
            "--no-warnings".to_string(),
            "--cookies".to_string(),
            cookies.as_arg(),
            "-J".to_string(),
            "--".to_string(),
            link.to_string(),
        ]);
        args
    }

    /// Warnings stay on: "unavailable videos are hidden" arrives on stderr
    fn playlist_args(&self, link: &str, limit: usize, cookies: &CredentialToken) -> Vec<String> {
        let mut args = self.base_args();
        args.extend([
            "-i".to_string(),
            "--get-id".to_string(),
            "--flat-playlist".to_string(),
            "--cookies".to_string(),
            cookies.as_arg(),
            "--playlist-end".to_string(),
            limit.to_string(),
            "--skip-download".to_string(),
            "--".to_string(),
            link.to_string(),
        ]);
        args
    }

    fn search_args(&self, query: &str, limit: usize) -> Vec<String> {
        let mut args = self.base_args();
        args.extend([
            "--no-warnings".to_string(),
            "--dump-json".to_string(),
            "--flat-playlist".to_string(),
            "--skip-download".to_string(),
            "--".to_string(),
            format!("ytsearch{}:{}", limit, query),
        ]);
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<ToolOutput, DownloadError> {
        tracing::debug!(tool = %self.ytdlp_path, args = %args.join(" "), "running extractor");
        let output = run_output_with_timeout(&self.ytdlp_path, args, self.config.timeout).await?;
        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// One JSON object per search hit
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<serde_json::Value>, DownloadError> {
        let out = self.run(self.search_args(query, limit)).await?;
        if !out.success {
            return Err(DownloadError::ExtractionToolFailure(first_lines(&out.stderr)));
        }
        Ok(out
            .stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }
}

#[async_trait]
impl ExtractionTool for YtDlpCli {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn dump_info(&self, link: &str, cookies: &CredentialToken) -> Result<serde_json::Value, DownloadError> {
        let out = self.run(self.info_args(link, cookies)).await?;
        if !out.success {
            tracing::warn!(link, stderr = %first_lines(&out.stderr), "extractor info failed");
            return Err(DownloadError::ExtractionToolFailure(first_lines(&out.stderr)));
        }
        serde_json::from_str(&out.stdout)
            .map_err(|e| DownloadError::ExtractionToolFailure(format!("invalid JSON: {}", e)))
    }

    async fn playlist(&self, link: &str, limit: usize, cookies: &CredentialToken) -> Result<ToolOutput, DownloadError> {
        self.run(self.playlist_args(link, limit, cookies)).await
    }
}

fn first_lines(stderr: &str) -> String {
    stderr.lines().take(3).collect::<Vec<_>>().join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cli() -> YtDlpCli {
        YtDlpCli::new(Some("yt-dlp".to_string()), ExtractorConfig::default())
    }

    #[test]
    fn test_playlist_args_bound_and_skip_download() {
        let token = CredentialToken::from(PathBuf::from("cookies/a.txt"));
        let args = cli().playlist_args("https://youtube.com/playlist?list=PL1", 25, &token);
        let joined = args.join(" ");
        assert!(joined.contains("--flat-playlist"));
        assert!(joined.contains("--get-id"));
        assert!(joined.contains("--playlist-end 25"));
        assert!(joined.contains("--skip-download"));
        assert!(joined.contains("--cookies cookies/a.txt"));
        assert_eq!(args.last().unwrap(), "https://youtube.com/playlist?list=PL1");
    }

    #[test]
    fn test_info_args_use_proxy() {
        let token = CredentialToken::from(PathBuf::from("c.txt"));
        let tool = YtDlpCli::new(
            Some("yt-dlp".to_string()),
            ExtractorConfig::default().with_proxy(Some("socks5://127.0.0.1:1080".to_string())),
        );
        let args = tool.info_args("https://youtu.be/x", &token);
        assert!(args.join(" ").contains("--proxy socks5://127.0.0.1:1080"));
        assert!(args.contains(&"-J".to_string()));
    }

    #[test]
    fn test_user_input_follows_end_of_options() {
        let token = CredentialToken::from(PathBuf::from("c.txt"));
        let hostile = "--exec=touch /tmp/owned";
        let tool = cli();

        for args in [
            tool.info_args(hostile, &token),
            tool.playlist_args(hostile, 5, &token),
            tool.search_args(hostile, 1),
        ] {
            let n = args.len();
            assert_eq!(args[n - 2], "--");
            assert!(args[n - 1].ends_with(hostile));
            assert!(!args[..n - 2].iter().any(|a| a.starts_with("--exec")));
        }
    }

    #[test]
    fn test_playlist_keeps_warnings() {
        let token = CredentialToken::from(PathBuf::from("c.txt"));
        let tool = cli();
        assert!(!tool.playlist_args("PL1", 5, &token).contains(&"--no-warnings".to_string()));
        assert!(tool.info_args("x", &token).contains(&"--no-warnings".to_string()));
    }

    #[test]
    fn test_search_query_prefix() {
        let args = cli().search_args("never gonna give", 10);
        assert_eq!(args.last().unwrap(), "ytsearch10:never gonna give");
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_failure() {
        let tool = YtDlpCli::new(Some("/nonexistent/yt-dlp".to_string()), ExtractorConfig::default());
        let result = tool.search("anything", 1).await;
        assert!(matches!(result, Err(DownloadError::ExtractionToolFailure(_))));
    }
}
