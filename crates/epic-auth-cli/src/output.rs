use colored::Colorize;
use epic_auth::TokenResponse;

use crate::cli::OutputFormat;

const TOKEN_PREVIEW_CHARS: usize = 50;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_steps(title: &str, steps: &[String]) {
    println!("{}", format_steps(title, steps));
}

/// Like [`print_steps`], but on stderr.
pub fn eprint_steps(title: &str, steps: &[String]) {
    eprintln!("{}", format_steps(title, steps));
}

fn format_steps(title: &str, steps: &[String]) -> String {
    let mut out = format!("\n{}", title.cyan());
    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!("\n  {}. {step}", i + 1));
    }
    out
}

pub fn print_token(token: &TokenResponse, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render_token(token, format)?);
    Ok(())
}

/// Renders a token for stdout. JSON output is the bare response object.
fn render_token(token: &TokenResponse, format: OutputFormat) -> anyhow::Result<String> {
    if matches!(format, OutputFormat::Json) {
        return Ok(serde_json::to_string_pretty(token)?);
    }

    let mut lines = vec![
        format!("{} Access token obtained", "✓".green()),
        format!("{}: {}", "Token".cyan(), preview(&token.access_token)),
    ];
    if let Some(expires_in) = token.expires_in {
        lines.push(format!("{}: {expires_in} seconds", "Expires in".cyan()));
    }
    lines.push(format!(
        "{}: {}",
        "Type".cyan(),
        token.token_type.as_deref().unwrap_or("-")
    ));
    if let Some(scope) = &token.scope {
        lines.push(format!("{}: {scope}", "Scope".cyan()));
    }
    Ok(lines.join("\n"))
}

fn preview(token: &str) -> String {
    let mut chars = token.chars();
    let head: String = chars.by_ref().take(TOKEN_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
