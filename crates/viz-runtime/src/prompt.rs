//! Prompt assembly for the classification request.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Marker followed by the category standard in the template.
pub const CATEGORIES_MARKER: &str = "【分类标准】\n";

/// Marker followed by the free-form expense notes in the template.
pub const CONTENT_MARKER: &str = "【需要转换的消费记录】\n";

/// Template used when no prompt file is available.
pub const DEFAULT_TEMPLATE: &str = "\
你是一个记账助手。请根据分类标准，把消费记录整理成固定格式的账目。

【分类标准】

【需要转换的消费记录】

【输出格式】
只输出下面这个区块，每行一笔消费，字段之间用一个空格分隔，字段值内不要有空格：
# start
DATE:YYYY-MM-DD TYPE:<分类> NAME:<项目> COST:<金额> <可选描述>
# end
";

/// Builds the classification prompt from files on disk.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    categories_file: PathBuf,
    content_file: PathBuf,
    template_file: PathBuf,
}

impl PromptBuilder {
    pub fn new(
        categories_file: impl Into<PathBuf>,
        content_file: impl Into<PathBuf>,
        template_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            categories_file: categories_file.into(),
            content_file: content_file.into(),
            template_file: template_file.into(),
        }
    }

    /// Read the three files asynchronously and assemble the prompt.
    ///
    /// Unreadable files count as empty; an empty template falls back to
    /// [`DEFAULT_TEMPLATE`].
    pub async fn build(&self) -> String {
        let categories = read_or_empty(&self.categories_file).await;
        let content = read_or_empty(&self.content_file).await;
        let template = read_or_empty(&self.template_file).await;

        let template = if template.is_empty() {
            debug!("using built-in prompt template");
            DEFAULT_TEMPLATE
        } else {
            template.as_str()
        };

        render_prompt(template, &categories, &content)
    }
}

/// Insert `categories` and `content` after their markers in `template`.
pub fn render_prompt(template: &str, categories: &str, content: &str) -> String {
    template
        .replace(
            CATEGORIES_MARKER,
            &format!("{}{}\n", CATEGORIES_MARKER, categories),
        )
        .replace(CONTENT_MARKER, &format!("{}{}\n", CONTENT_MARKER, content))
}

/// Read a text file, trimmed; missing or unreadable files give `""`.
async fn read_or_empty(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            String::new()
        }
    }
}
