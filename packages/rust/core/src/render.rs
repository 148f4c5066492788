//! Per-expert Quarto detail pages.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info, instrument};

use expertbase_shared::{ExpertBaseError, RenderSettings, Result};

use crate::expert::Expert;

const TEMPLATE_NAME: &str = "expert";

/// Everything the renderer needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Handlebars template for one page.
    pub template: PathBuf,
    /// JSON object mapping topic tag → tooltip text.
    pub tooltips: Option<PathBuf>,
    /// Employments shown per page.
    pub employment_limit: usize,
}

impl From<&RenderSettings> for RenderConfig {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            template: PathBuf::from(&settings.template),
            tooltips: settings.tooltips.as_ref().map(PathBuf::from),
            employment_limit: settings.employment_limit,
        }
    }
}

/// Template context of one page.
#[derive(Debug, Serialize)]
struct PageContext {
    expert_name: String,
    orcid_url: String,
    current_employment: String,
    keywords: String,
    topics: String,
    email: String,
}

/// Compiled page template plus tooltip table.
pub struct Renderer {
    handlebars: Handlebars<'static>,
    tooltips: BTreeMap<String, String>,
    employment_limit: usize,
}

impl Renderer {
    /// Load and compile the template, and read the tooltip file if one is configured.
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let template = std::fs::read_to_string(&config.template)
            .map_err(|e| ExpertBaseError::io(&config.template, e))?;

        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(escape_markup);
        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| {
                ExpertBaseError::Render(format!("{}: {e}", config.template.display()))
            })?;

        let tooltips = match &config.tooltips {
            Some(path) => load_tooltips(path)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            handlebars,
            tooltips,
            employment_limit: config.employment_limit,
        })
    }

    pub fn render(&self, expert: &Expert) -> Result<String> {
        let context = PageContext {
            expert_name: expert.name(),
            orcid_url: expert.profile_url(),
            current_employment: expert.formatted_employment(self.employment_limit),
            keywords: keyword_div(&expert.keyword_list()),
            topics: self.topic_div(&expert.topic_tag_list()),
            email: expert.email().to_string(),
        };
        self.handlebars
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| ExpertBaseError::Render(format!("{}: {e}", expert.identifier())))
    }

    /// Render one expert to `{out_dir}/{slug}.qmd`.
    #[instrument(skip_all, fields(identifier = expert.identifier()))]
    pub fn write(&self, expert: &Expert, out_dir: &Path) -> Result<PathBuf> {
        let page = self.render(expert)?;
        std::fs::create_dir_all(out_dir).map_err(|e| ExpertBaseError::io(out_dir, e))?;
        let path = out_dir.join(format!("{}.qmd", expert.slug()));
        std::fs::write(&path, page).map_err(|e| ExpertBaseError::io(&path, e))?;
        debug!(path = %path.display(), "wrote page");
        Ok(path)
    }

    pub fn write_all(&self, experts: &[Expert], out_dir: &Path) -> Result<Vec<PathBuf>> {
        let paths = experts
            .iter()
            .map(|e| self.write(e, out_dir))
            .collect::<Result<Vec<_>>>()?;
        info!(pages = paths.len(), dir = %out_dir.display(), "rendered detail pages");
        Ok(paths)
    }

    fn topic_div(&self, topics: &[String]) -> String {
        let spans = topics.iter().map(|topic| {
            let tip = self.tooltips.get(topic).map(String::as_str).unwrap_or("");
            format!(
                r#"<span class="quarto-category tag-tuerkis"><abbr data-tooltip="{tip}">{topic}</abbr></span>"#
            )
        });
        category_div(spans)
    }
}

/// Escape for `{{value}}` substitutions: only `&`, `<`, `>` and `"`.
/// Apostrophes, `=` and backticks pass through.
fn escape_markup(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn load_tooltips(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|e| ExpertBaseError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| ExpertBaseError::parse(format!("{}: {e}", path.display())))
}

fn keyword_div(keywords: &[String]) -> String {
    category_div(
        keywords
            .iter()
            .map(|k| format!(r#"<span class="quarto-category tag-beige">{k}</span>"#)),
    )
}

fn category_div(spans: impl Iterator<Item = String>) -> String {
    let mut out = String::from(r#"<div class="quarto-categories">"#);
    out.extend(spans);
    out.push_str("</div>");
    out
}
