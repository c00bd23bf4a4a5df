//! Theme engine
//!
//! This module provides template rendering using Tera.
//! Features:
//! - Templates embedded in the binary from `templates/`
//! - Per-template overrides from a directory on disk
//! - Standard template variables

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

use crate::models::User;

mod error;

pub use error::ThemeError;

/// Templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Theme engine for rendering templates
pub struct ThemeEngine {
    /// Tera template engine instance
    tera: Tera,
    /// Directory whose templates replace the embedded ones by name
    override_path: Option<PathBuf>,
}

impl ThemeEngine {
    /// Create a theme engine from the embedded templates, overridden by any
    /// `.html` file found under `override_path`.
    ///
    /// A missing override directory is not an error.
    pub fn new(override_path: Option<&Path>) -> Result<Self> {
        let override_path = override_path.map(Path::to_path_buf);
        let tera = load_templates(override_path.as_deref())?;
        Ok(Self { tera, override_path })
    }

    /// Theme engine with the embedded templates only
    pub fn embedded() -> Result<Self> {
        Self::new(None)
    }

    /// Re-read the templates, picking up edits in the override directory
    pub fn reload(&mut self) -> Result<()> {
        self.tera = load_templates(self.override_path.as_deref())?;
        Ok(())
    }

    /// Whether a template with this name is loaded
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Render a template with context.
    ///
    /// The error message carries Tera's whole cause chain, which is where
    /// the actual template mistake is reported.
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(s) = source {
                message.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            ThemeError::Render {
                template: template.to_string(),
                message,
            }
            .into()
        })
    }

    /// Render a template with standard variables automatically added
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();

        full_context.insert("site_name", &standard_vars.site_name);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("year", &standard_vars.year);
        full_context.insert("current_user", &standard_vars.current_user);

        self.render(template, &full_context)
    }

    /// Render, falling back to a bare page when the template itself is broken.
    ///
    /// Used for error pages, which must always produce a body.
    pub fn render_or_fallback(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
        title: &str,
    ) -> String {
        match self.render_with_standard_vars(template, context, standard_vars) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Error page '{}' failed to render: {:#}", template, e);
                fallback_page(title)
            }
        }
    }
}

fn fallback_page(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>{title}</title></head>\n<body><h1>{title}</h1></body>\n</html>",
        title = tera::escape_html(title)
    )
}

fn load_templates(override_path: Option<&Path>) -> Result<Tera> {
    let mut templates: BTreeMap<String, String> = BTreeMap::new();

    for name in EmbeddedTemplates::iter() {
        if let Some(file) = EmbeddedTemplates::get(&name) {
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|_| ThemeError::NotUtf8(name.to_string()))?;
            templates.insert(name.to_string(), content);
        }
    }

    if let Some(dir) = override_path.filter(|p| p.is_dir()) {
        let before = templates.len();
        collect_templates_from_dir(dir, dir, &mut templates)?;
        tracing::debug!(
            "Loaded template overrides from {:?} ({} new names)",
            dir,
            templates.len() - before
        );
    }

    let mut tera = Tera::default();
    // add_raw_templates resolves `extends` across the whole batch
    tera.add_raw_templates(templates.iter().map(|(name, content)| (name.as_str(), content.as_str())))
        .map_err(|e| ThemeError::Load(e.to_string()))?;

    Ok(tera)
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut BTreeMap<String, String>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)
        .with_context(|| format!("Failed to read template directory: {:?}", current_path))?
    {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::OutsideOverrideDir(path.clone()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.insert(template_name, content);
        }
    }
    Ok(())
}

/// Variables every page gets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    /// Blog name
    pub site_name: String,
    /// Current logged-in user (optional)
    pub current_user: Option<CurrentUser>,
    /// Current request path
    pub request_path: String,
    /// Current year (for copyright)
    pub year: i32,
}

/// Current user information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}

impl StandardTemplateVars {
    pub fn new(site_name: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            current_user: None,
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }

    /// Set the current user
    pub fn with_user(mut self, user: Option<CurrentUser>) -> Self {
        self.current_user = user;
        self
    }
}

#[cfg(test)]
mod tests;
