use anyhow::Result;
use std::path::Path;
use tera::Tera;
use tracing::info;

pub const MAP_PAGE: &str = "index.html";

const BUILTIN_MAP_PAGE: &str = include_str!("../data/templates/index.html");

pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Loads `*.html` templates under `base_path`; the map page falls back to
    /// the copy compiled into the binary when the directory lacks one.
    pub fn new(base_path: &Path) -> Result<Self> {
        let mut tera = if base_path.exists() {
            let pattern = format!("{}/**/*.html", base_path.to_string_lossy());
            match Tera::new(&pattern) {
                Ok(t) => t,
                Err(e) if e.to_string().contains("no templates found") || e.to_string().contains("match any files") => {
                    Tera::default()
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            Tera::default()
        };

        if !tera.get_template_names().any(|name| name == MAP_PAGE) {
            info!("using built-in {} template", MAP_PAGE);
            tera.add_raw_template(MAP_PAGE, BUILTIN_MAP_PAGE)?;
        }

        Ok(Self { tera })
    }

    pub fn render(&self, template_name: &str, context: &tera::Context) -> Result<String> {
        self.tera.render(template_name, context).map_err(|e| {
            let loaded = self.tera.get_template_names().collect::<Vec<_>>();
            anyhow::anyhow!("template render error: {:?}. requested: '{}'. loaded: {:?}", e, template_name, loaded)
        })
    }
}
