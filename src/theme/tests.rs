//! Tests for the theme engine

use super::*;
use tempfile::TempDir;
use tera::Context as TeraContext;

const PAGES: &[&str] = &[
    "base.html",
    "includes/post_card.html",
    "includes/paginator.html",
    "blog/index.html",
    "blog/detail.html",
    "blog/category.html",
    "blog/profile.html",
    "blog/create.html",
    "blog/comment.html",
    "blog/user.html",
    "registration/login.html",
    "registration/registration_form.html",
    "registration/password_change_form.html",
    "registration/password_change_done.html",
    "pages/about.html",
    "pages/rules.html",
    "pages/403.html",
    "pages/404.html",
    "pages/500.html",
];

fn vars() -> StandardTemplateVars {
    StandardTemplateVars::new("Test Blog", "/")
}

#[test]
fn test_embedded_templates_are_all_present() {
    let engine = ThemeEngine::embedded().expect("Failed to create engine");
    for page in PAGES {
        assert!(engine.has_template(page), "Missing template {}", page);
    }
}

#[test]
fn test_static_pages_render_with_standard_vars() {
    let engine = ThemeEngine::embedded().unwrap();

    for page in ["pages/about.html", "pages/rules.html", "pages/404.html", "pages/403.html"] {
        let html = engine
            .render_with_standard_vars(page, &TeraContext::new(), &vars())
            .unwrap_or_else(|e| panic!("{} failed: {:#}", page, e));
        assert!(html.contains("Test Blog"), "{} lacks the site name", page);
    }
}

#[test]
fn test_current_user_shown_in_header() {
    let engine = ThemeEngine::embedded().unwrap();
    let user = CurrentUser {
        id: 1,
        username: "anna".into(),
        is_staff: false,
    };

    let html = engine
        .render_with_standard_vars(
            "pages/about.html",
            &TeraContext::new(),
            &vars().with_user(Some(user)),
        )
        .unwrap();
    assert!(html.contains("/profile/anna/"));
    assert!(html.contains("/auth/logout/"));
}

#[test]
fn test_override_directory_replaces_template() {
    let temp_dir = TempDir::new().unwrap();
    let pages = temp_dir.path().join("pages");
    fs::create_dir_all(&pages).unwrap();
    fs::write(
        pages.join("about.html"),
        r#"{% extends "base.html" %}{% block content %}Custom about{% endblock %}"#,
    )
    .unwrap();

    let mut engine = ThemeEngine::new(Some(temp_dir.path())).unwrap();
    let html = engine
        .render_with_standard_vars("pages/about.html", &TeraContext::new(), &vars())
        .unwrap();
    assert!(html.contains("Custom about"));
    // untouched templates still come from the binary
    assert!(engine.has_template("blog/index.html"));

    fs::write(pages.join("about.html"), "Plain").unwrap();
    engine.reload().unwrap();
    let html = engine
        .render("pages/about.html", &TeraContext::new())
        .unwrap();
    assert_eq!(html, "Plain");
}

#[test]
fn test_missing_override_directory_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(Some(&temp_dir.path().join("nope"))).unwrap();
    assert!(engine.has_template("base.html"));
}

#[test]
fn test_render_error_reports_template_name() {
    let engine = ThemeEngine::embedded().unwrap();
    let err = engine
        .render("does/not/exist.html", &TeraContext::new())
        .unwrap_err();
    assert!(err.to_string().contains("does/not/exist.html"));
}

#[test]
fn test_render_or_fallback_survives_broken_template() {
    let temp_dir = TempDir::new().unwrap();
    let pages = temp_dir.path().join("pages");
    fs::create_dir_all(&pages).unwrap();
    fs::write(pages.join("500.html"), "{{ missing_variable }}").unwrap();

    let engine = ThemeEngine::new(Some(temp_dir.path())).unwrap();
    let html = engine.render_or_fallback("pages/500.html", &TeraContext::new(), &vars(), "Server error");
    assert!(html.contains("<h1>Server error</h1>"));
}
