use std::path::Path;

use anyhow::Error;
use colored::*;
use serde_json::{Map, Value as JsonValue};

use crate::agents::AgentError;
use crate::openai::OpenAiError;
use crate::orchestrator::LoopError;
use crate::types::{ExtractionReport, Rejection};

pub fn display_welcome(document: &Path, model: &str, max_attempts: u32) {
    println!("{}", "🏭 Chiller Plant Audit Extractor".bright_blue().bold());
    println!(
        "{}",
        "Extracts site and technical data from an audit report and validates it against the required schema."
            .blue()
    );
    println!("{} {}", "📄 Document:".blue(), document.display().to_string().white());
    println!(
        "{} {} {}",
        "🤖 Model:".blue(),
        model.white(),
        format!("(up to {max_attempts} attempts)").blue()
    );
    println!();
}

pub fn display_attempt(attempt: u32, max_attempts: u32, retry: bool) {
    let label = format!("🔄 Attempt {attempt}/{max_attempts}:");
    if retry {
        println!(
            "{} {}",
            label.bright_yellow().bold(),
            "re-extracting with validator feedback...".yellow().italic()
        );
    } else {
        println!(
            "{} {}",
            label.bright_blue().bold(),
            "extracting data from the document...".blue().italic()
        );
    }
}

pub fn display_rejection(rejection: &Rejection) {
    println!("\n{}", "🧪 Validator: data rejected".bright_magenta().bold());
    println!(
        "{}",
        "┌─────────────────────────────────────────────────────────────".magenta()
    );
    print_key_list("│ ❓ Missing site_meta_data:", &rejection.missing_site_meta_data_keys);
    print_key_list("│ ❓ Missing technical_data:", &rejection.missing_technical_data_keys);
    if !rejection.incomplete_chiller_data_keys.is_empty() {
        let heading = match rejection.expected_chillers {
            Some(n) => format!("│ 📏 Incomplete chiller data (expected {n} values):"),
            None => "│ 📏 Incomplete chiller data (chiller count unknown):".to_string(),
        };
        print_key_list(&heading, &rejection.incomplete_chiller_data_keys);
    }
    println!(
        "{}",
        "└─────────────────────────────────────────────────────────────\n".magenta()
    );
}

fn print_key_list(heading: &str, keys: &[String]) {
    if keys.is_empty() {
        return;
    }
    println!("{}", heading.magenta());
    for key in keys {
        println!("│   {} {}", "✖".bright_red(), key.white());
    }
}

pub fn display_report(report: &ExtractionReport) {
    println!("\n{}", "✅ Validator: data accepted".bright_green().bold());
    println!(
        "{}",
        "┌─────────────────────────────────────────────────────────────".green()
    );
    println!("{} {}", "│ 🆔 Run ID:".green(), report.run_id.to_string().bright_white());
    println!("{} {}", "│ 🔢 Attempts:".green(), report.attempts.to_string().white());
    println!("{} {}", "│ 🗓️  Completed:".green(), report.completed_at.white());
    print_section("│ ── site_meta_data:", &report.record.site_meta_data);
    print_section("│ ── technical_data:", &report.record.technical_data);
    println!(
        "{}",
        "└─────────────────────────────────────────────────────────────\n".green()
    );
}

fn print_section(heading: &str, section: &Map<String, JsonValue>) {
    println!("{}", heading.green());
    for (key, value) in section {
        println!("│   {} {}", format!("{key}:").white(), value.to_string().bright_white());
    }
}

pub fn display_error(error: &Error) {
    if let Some(loop_error) = error.downcast_ref::<LoopError>() {
        display_loop_error(loop_error);
        return;
    }
    println!("{} {}", "❌ Error:".bright_red().bold(), error.to_string().red());
    println!("{}", "Please check your configuration and try again.\n".red());
}

fn display_loop_error(error: &LoopError) {
    match error {
        LoopError::Extraction { source: AgentError::Llm(llm), .. } => {
            display_openai_error(llm);
        }
        LoopError::AttemptsExhausted { attempts, last_error, .. } => {
            println!(
                "{}",
                format!("🚫 No valid record after {attempts} attempts.").bright_red().bold()
            );
            for line in last_error.lines() {
                println!("   {}", line.red());
            }
            println!(
                "{}",
                "💡 Tip: Raise EXTRACTION_MAX_ATTEMPTS or check that the report actually contains every data point.".yellow()
            );
            println!();
        }
        LoopError::Timeout { .. } => {
            println!("{}", error.to_string().bright_yellow().bold());
            println!(
                "{}",
                "💡 Tip: Large reports take longer; raise EXTRACTION_CALL_TIMEOUT_SECS.".yellow()
            );
            println!();
        }
        other => {
            println!("{} {}", "❌ Error:".bright_red().bold(), other.to_string().red());
            println!();
        }
    }
}

pub fn display_openai_error(error: &OpenAiError) {
    let user_message = error.user_message();
    match error {
        OpenAiError::ServerBusy | OpenAiError::Timeout { .. } => {
            println!("{}", user_message.bright_yellow().bold());
            println!(
                "{}",
                "💡 Tip: The server might be overloaded. Try again later.".yellow()
            );
        }
        OpenAiError::NetworkError { .. } => {
            println!("{}", user_message.bright_red().bold());
            println!(
                "{}",
                "💡 Tip: Check your internet connection and OPENAI_BASE_URL.".red()
            );
        }
        OpenAiError::ApiError { status, .. } => {
            println!("{}", user_message.bright_red().bold());
            match *status {
                401 => println!("{}", "💡 Tip: Check your OPENAI_API_KEY environment variable.".red()),
                404 => println!("{}", "💡 Tip: Check OPENAI_MODEL and OPENAI_BASE_URL.".red()),
                429 => println!("{}", "💡 Tip: You've hit the rate limit. Wait before trying again.".red()),
                _ => println!("{}", "💡 Tip: Check the API provider's documentation for details.".red()),
            }
        }
        OpenAiError::ParseError { .. } => {
            println!("{}", user_message.bright_magenta().bold());
        }
        OpenAiError::ConfigError { .. } => {
            println!("{}", user_message.bright_red().bold());
            println!(
                "{}",
                "💡 Tip: Check your environment variables and configuration.".red()
            );
        }
    }
    println!();
}

pub fn display_cancelled() {
    println!("\n{}", "⚠️ Extraction cancelled by user".bright_yellow().bold());
    println!("{}", "👋 Goodbye!".bright_yellow().bold());
}
