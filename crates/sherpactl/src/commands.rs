//! Command implementations for sherpactl.
//!
//! Output follows one rule: sections are `[NAME]` headers in cyan with
//! aligned rows underneath, and anything served by a fallback or a failed
//! path is colored so degradation is visible at a glance.

use anyhow::Result;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use sherpa_common::{ChatResponse, ChatTurn, EnhancedData, Itinerary, ServiceClientStatus};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use crate::client::DaemonClient;

const REPLY_WIDTH: usize = 76;

// ============================================================================
// Status Command
// ============================================================================

pub async fn status(client: &DaemonClient) -> Result<()> {
    let health = client.health().await?;

    println!("{}", "[DAEMON]".cyan());
    println!("  Endpoint:   {}", client.base_url());
    let state = if health.status == "ok" {
        health.status.green().to_string()
    } else {
        health.status.yellow().to_string()
    };
    println!("  Status:     {}", state);
    println!("  Version:    {}", health.version);
    println!("  Uptime:     {}", format_duration(health.uptime_seconds));
    println!();

    let services = client.services().await?;
    print_services_section(&services);

    Ok(())
}

// ============================================================================
// Metrics Command
// ============================================================================

pub async fn metrics(client: &DaemonClient, json: bool) -> Result<()> {
    let snapshot = client.metrics().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}", "[FALLBACK COUNTERS]".cyan());
    println!(
        "  {:<10} {:>9} {:>10} {:>10} {:>10}",
        "CATEGORY", "PRIMARY", "FALLBACK", "ERRORS", "SHARE"
    );

    for (category, counters) in &snapshot.categories {
        let errors = {
            let cell = format!("{:>10}", counters.errors);
            if counters.errors > 0 {
                cell.red().to_string()
            } else {
                cell.green().to_string()
            }
        };

        let served = counters.primary + counters.fallback;
        let share = if served == 0 {
            format!("{:>10}", "-").dimmed().to_string()
        } else {
            let pct = counters.fallback as f64 / served as f64 * 100.0;
            let cell = format!("{:>9.0}%", pct);
            if pct > 90.0 {
                cell.yellow().to_string()
            } else {
                cell
            }
        };

        println!(
            "  {:<10} {:>9} {:>10} {} {}",
            category, counters.primary, counters.fallback, errors, share
        );
    }

    println!();
    println!(
        "  {}",
        "SHARE is the fallback portion of served calls; counters reset on restart.".dimmed()
    );

    Ok(())
}

// ============================================================================
// Services Command
// ============================================================================

pub async fn services(client: &DaemonClient, json: bool) -> Result<()> {
    let services = client.services().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&services)?);
        return Ok(());
    }

    print_services_section(&services);
    Ok(())
}

fn print_services_section(services: &BTreeMap<String, ServiceClientStatus>) {
    println!("{}", "[SERVICE CLIENTS]".cyan());

    if services.is_empty() {
        println!("  {}", "No clients initialized yet.".dimmed());
        return;
    }

    for (name, record) in services {
        let state = if record.initialized {
            format!("{:<7}", "ready").green().to_string()
        } else {
            format!("{:<7}", "failed").red().to_string()
        };

        let detail = if let Some(group) = &record.assigned_group {
            format!("group {}", group)
        } else if let Some(error) = &record.last_error {
            error.clone()
        } else {
            String::new()
        };
        let detail = {
            let cell = format!("{:<40}", truncate_str(&detail, 40));
            if record.initialized {
                cell.dimmed().to_string()
            } else {
                cell.red().to_string()
            }
        };

        println!(
            "  {:<24} {} {} {}",
            truncate_str(name, 24),
            state,
            detail,
            format_age(record.updated_at).dimmed()
        );
    }
}

// ============================================================================
// Chat Commands
// ============================================================================

pub async fn ask(client: &DaemonClient, message: &str, user: Option<String>) -> Result<()> {
    let response = client.chat(message, Vec::new(), user).await?;
    print_reply(&response);
    Ok(())
}

/// Interactive loop. History lives on this side of the wire; the daemon
/// gets the full conversation replayed with every turn.
pub async fn chat(client: &DaemonClient, user: Option<String>) -> Result<()> {
    println!("{}", "Sherpa travel planner".bold());
    println!(
        "{}",
        format!(
            "Connected to {}. Type a message, or 'exit' to leave.",
            client.base_url()
        )
        .dimmed()
    );
    println!();

    let mut history: Vec<ChatTurn> = Vec::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{} ", "you>".cyan());
        io::stdout().flush()?;

        let input = match lines.next() {
            Some(Ok(line)) => line.trim().to_string(),
            Some(Err(e)) => {
                eprintln!("{}", format!("Error reading input: {}", e).red());
                continue;
            }
            None => break, // EOF
        };

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        // A failed request drops this turn instead of ending the session.
        let response = match client.chat(&input, history.clone(), user.clone()).await {
            Ok(response) => response,
            Err(e) => {
                eprintln!("{}", format!("{:#}", e).red());
                continue;
            }
        };

        print_reply(&response);

        history.push(ChatTurn::user(input));
        history.push(ChatTurn::assistant(response.message.clone()));
    }

    println!("{}", "Safe travels.".dimmed());
    Ok(())
}

fn print_reply(response: &ChatResponse) {
    println!();
    println!("{}", wrap_text(&response.message, REPLY_WIDTH, "  "));

    if let Some(data) = &response.enhanced_data {
        print_enrichment(data);
    }

    if let Some(destinations) = &response.destinations {
        if !destinations.is_empty() {
            println!();
            println!("  {}", "[IDEAS]".cyan());
            for idea in destinations {
                let mut name = idea.name.clone();
                if let Some(country) = &idea.country {
                    name.push_str(", ");
                    name.push_str(country);
                }
                match &idea.reason {
                    Some(reason) => {
                        println!("  • {} {}", name.bold(), format!("({})", reason).dimmed())
                    }
                    None => println!("  • {}", name.bold()),
                }
            }
        }
    }

    if let Some(itinerary) = &response.itinerary {
        print_itinerary(itinerary);
    }

    if !response.suggestions.is_empty() {
        println!();
        for suggestion in &response.suggestions {
            println!("  {} {}", "•".dimmed(), suggestion.dimmed());
        }
    }

    if !response.profile.is_empty() {
        println!();
        println!(
            "  {}",
            format!("[{}] {}", response.stage, response.profile.summary()).dimmed()
        );
    }
    println!();
}

fn print_enrichment(data: &EnhancedData) {
    if data.is_empty() {
        return;
    }
    println!();

    if let Some(weather) = &data.weather {
        println!(
            "  {} {:.1}°C, {}, wind {:.0} kph {}",
            "weather:".cyan(),
            weather.temperature_c,
            weather.condition,
            weather.wind_kph,
            format!("[{}]", weather.source).dimmed()
        );
    }
    if let Some(location) = &data.location {
        println!(
            "  {} {} ({:.4}, {:.4}) {}",
            "location:".cyan(),
            location.formatted_address,
            location.lat,
            location.lng,
            format!("[{}]", location.source).dimmed()
        );
    }
    if let Some(route) = &data.route {
        println!(
            "  {} {} in {} {}",
            "route:".cyan(),
            format_distance(route.distance_meters),
            format_duration(route.duration_seconds),
            format!("[{}]", route.source).dimmed()
        );
    }
}

fn print_itinerary(itinerary: &Itinerary) {
    println!();
    println!(
        "  {}",
        format!("[ITINERARY: {}]", itinerary.destination).cyan()
    );
    for day in &itinerary.days {
        println!("  {} {}", format!("Day {}", day.day).bold(), day.title);
        for activity in &day.activities {
            println!("    • {}", activity);
        }
    }
    if let Some(notes) = &itinerary.notes {
        println!("  {}", notes.dimmed());
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// Wrap at `width` columns, indenting every produced line. Paragraph
/// breaks in the input survive; long words are never split.
fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut out = Vec::new();

    for paragraph in text.split('\n') {
        if paragraph.trim().is_empty() {
            out.push(String::new());
            continue;
        }

        let mut line = String::new();
        let mut line_width = 0;
        for word in paragraph.split_whitespace() {
            let word_width = console::measure_text_width(word);
            if line_width + word_width + 1 > width && !line.is_empty() {
                out.push(format!("{}{}", indent, line));
                line.clear();
                line_width = 0;
            }
            if !line.is_empty() {
                line.push(' ');
                line_width += 1;
            }
            line.push_str(word);
            line_width += word_width;
        }
        if !line.is_empty() {
            out.push(format!("{}{}", indent, line));
        }
    }

    out.join("\n")
}

fn format_duration(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

fn format_distance(meters: u64) -> String {
    if meters >= 1_000 {
        format!("{} km", meters / 1_000)
    } else {
        format!("{} m", meters)
    }
}

fn format_age(ts: DateTime<Utc>) -> String {
    let secs = Utc::now().signed_duration_since(ts).num_seconds().max(0) as u64;
    format!("{} ago", format_duration(secs))
}

fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_picks_the_two_largest_units() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(150), "2m 30s");
        assert_eq!(format_duration(24_300), "6h 45m");
        assert_eq!(format_duration(200_000), "2d 7h");
    }

    #[test]
    fn distances_switch_to_kilometers() {
        assert_eq!(format_distance(950), "950 m");
        assert_eq!(format_distance(463_000), "463 km");
    }

    #[test]
    fn wrap_respects_width_and_keeps_paragraphs() {
        let wrapped = wrap_text("one two three four five", 10, "  ");
        for line in wrapped.lines() {
            assert!(console::measure_text_width(line.trim_start()) <= 10);
        }

        let wrapped = wrap_text("first\n\nsecond", 40, "");
        assert_eq!(wrapped, "first\n\nsecond");
    }

    #[test]
    fn truncation_appends_an_ellipsis() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a-much-longer-name", 10), "a-much-...");
    }
}
