//! Inline HTML views
//!
//! Deliberately bare markup; no templating engine.

use axum::response::Html;

/// Shown on /secrets for users who never submitted a secret
pub const DEFAULT_SECRET: &str = "Jack Bauer is my hero.";

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title} - Secrets</title></head>
<body>
{body}
</body>
</html>
"#
    ))
}

pub fn home(signed_in: bool) -> Html<String> {
    let links = if signed_in {
        r#"<a href="/secrets">My secret</a> <a href="/logout">Log out</a>"#
    } else {
        r#"<a href="/register">Register</a> <a href="/login">Login</a>"#
    };
    page(
        "Home",
        &format!("<h1>Secrets</h1>\n<p>Don't keep your secrets, share them anonymously!</p>\n{links}"),
    )
}

fn credentials_form(title: &str, action: &str, button: &str) -> Html<String> {
    page(
        title,
        &format!(
            r#"<h1>{title}</h1>
<form action="{action}" method="POST">
  <label for="username">Email</label>
  <input type="email" id="username" name="username" required>
  <label for="password">Password</label>
  <input type="password" id="password" name="password" required>
  <button type="submit">{button}</button>
</form>
<a href="/auth/google">Sign in with Google</a>"#
        ),
    )
}

pub fn login() -> Html<String> {
    credentials_form("Login", "/login", "Login")
}

pub fn register() -> Html<String> {
    credentials_form("Register", "/register", "Register")
}

/// Secret page; `secret` is escaped before insertion
pub fn secrets(secret: Option<&str>) -> Html<String> {
    let secret = secret.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SECRET);
    page(
        "Secrets",
        &format!(
            r#"<h1>You've Discovered My Secret!</h1>
<p class="secret-text">{}</p>
<a href="/logout">Log Out</a> <a href="/submit">Submit a Secret</a>"#,
            html_escape::encode_text(secret)
        ),
    )
}

pub fn submit() -> Html<String> {
    page(
        "Submit",
        r#"<h1>Secrets</h1>
<p>Don't keep your secrets, share them anonymously!</p>
<form action="/submit" method="POST">
  <input type="text" name="secret" placeholder="What's your secret?">
  <button type="submit">Submit</button>
</form>"#,
    )
}
