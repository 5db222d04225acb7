//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中 `${VAR_NAME}` 格式的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    /// 解析TOML内容并补齐默认值
    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let mut config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?;

        // 先验证全局默认间隔，再把它写入各站点
        self.validate(&config)?;
        config.apply_defaults();

        Ok(config)
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        let config = self.parse_toml(&content)?;

        info!("成功加载配置文件: {}", path.display());
        debug!("配置内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;

        debug!("成功解析配置字符串");

        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 获取默认配置文件路径
///
/// 优先使用当前目录下的 `config.toml`，否则使用用户配置目录。
pub fn get_default_config_path() -> std::path::PathBuf {
    if Path::new("config.toml").exists() {
        return std::path::PathBuf::from("config.toml");
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join("site-vitals").join("config.toml"))
        .unwrap_or_else(|| std::path::PathBuf::from("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::NotifierConfig;
    use serial_test::serial;
    use std::env;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const TEST_CONFIG_TOML: &str = r#"
[global]
default_polling_interval_ms = 2000
log_level = "info"

[[sites]]
name = "example.com"

[[sites]]
name = "db.internal"
port = 5432
threshold = 3
polling_interval_ms = 500

[[notifiers]]
kind = "webhook"
url = "https://discord.example.com/api/webhooks/1"
"#;

    const TEST_CONFIG_WITH_ENV_VARS: &str = r#"
[[sites]]
name = "example.com"

[[notifiers]]
kind = "feishu"
url = "${SITE_VITALS_TEST_WEBHOOK}"
"#;

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.sites[0].port, 443);
        assert_eq!(config.sites[0].threshold, 10);
        assert_eq!(
            config.sites[0].polling_interval(),
            Duration::from_millis(2000)
        );
        assert_eq!(config.sites[1].port, 5432);
        assert_eq!(config.sites[1].threshold, 3);
        assert_eq!(config.sites[1].polling_interval(), Duration::from_millis(500));
        assert_eq!(config.notifiers.len(), 1);
        assert!(!config.global.notify_recovery);
    }

    #[tokio::test]
    async fn test_missing_global_section_uses_defaults() {
        let loader = TomlConfigLoader::new(false);
        let config = loader
            .load_from_string("[[sites]]\nname = \"example.com\"\n")
            .await
            .unwrap();

        assert_eq!(config.global.default_polling_interval_ms, 5000);
        assert!(config.notifiers.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("SITE_VITALS_TEST_WEBHOOK", "https://open.feishu.cn/hook/abc");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(TEST_CONFIG_WITH_ENV_VARS)
            .await
            .unwrap();

        assert_eq!(
            config.notifiers[0],
            NotifierConfig::Feishu {
                url: "https://open.feishu.cn/hook/abc".to_string()
            }
        );

        env::remove_var("SITE_VITALS_TEST_WEBHOOK");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution_missing_var() {
        env::remove_var("SITE_VITALS_TEST_WEBHOOK");

        let loader = TomlConfigLoader::new(true);
        let result = loader.load_from_string(TEST_CONFIG_WITH_ENV_VARS).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("SITE_VITALS_TEST_WEBHOOK"));
    }

    #[tokio::test]
    async fn test_malformed_config_rejected() {
        let loader = TomlConfigLoader::new(false);

        assert!(loader.load_from_string("[[sites]]\nport = 80\n").await.is_err());
        assert!(loader
            .load_from_string("[[sites]]\nname = \"a\"\nthreshold = 0\n")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG_TOML.as_bytes()).unwrap();

        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_file(file.path()).await.unwrap();
        assert_eq!(config.sites[1].name, "db.internal");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let loader = TomlConfigLoader::new(false);
        let result = loader.load_from_file("/nonexistent/site-vitals.toml").await;

        assert!(result.unwrap_err().to_string().contains("配置文件不存在"));
    }

    #[test]
    fn test_substitute_env_vars_disabled() {
        let loader = TomlConfigLoader::new(false);
        let content = "test ${VAR} content";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, content);
    }
}
