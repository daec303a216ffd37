use super::AppContext;
use crate::cli::WeatherCommand;
use crate::error::{ElysiaError, Result};
use crate::weather::{WeatherIcon, WeatherSnapshot, WeatherView};
use chrono::{Local, TimeZone};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle weather commands
pub async fn handle_weather(ctx: &AppContext, command: WeatherCommand) -> Result<()> {
    let force = match command {
        WeatherCommand::Show => {
            match ctx.preferences.weather_snapshot() {
                Some(snapshot) => print_snapshot(&snapshot),
                None => println!("{}", "No cached weather.".yellow()),
            }
            return Ok(());
        }
        WeatherCommand::Refresh { force } => force,
    };

    let policy = ctx.weather_policy()?;
    let view = if force {
        policy.force_refresh().await
    } else {
        policy.ensure_fresh().await
    };
    render_view(view)
}

/// Print a view; a refresh failure with nothing cached becomes an error
pub fn render_view(view: WeatherView) -> Result<()> {
    match view {
        WeatherView::Fresh(snapshot) => {
            print_snapshot(&snapshot);
            Ok(())
        }
        WeatherView::Stale { snapshot, error } => {
            print_snapshot(&snapshot);
            println!(
                "{}",
                format!("Showing cached weather, refresh failed: {}", error).yellow()
            );
            Ok(())
        }
        WeatherView::Unavailable(error) => {
            eprintln!("{}", format!("Weather unavailable: {}", error).red());
            Err(ElysiaError::Weather(error).into())
        }
    }
}

fn print_snapshot(snapshot: &WeatherSnapshot) {
    let icon = WeatherIcon::from_code(snapshot.icon_code.as_deref())
        .map(|i| i.glyph())
        .unwrap_or("?");
    let updated = Local
        .timestamp_millis_opt(snapshot.last_updated)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "City".bold(),
        snapshot.city_name.as_deref().unwrap_or("Lokasi ?")
    ]);
    table.add_row(prettytable::row![
        "Temperature".bold(),
        snapshot.temperature.as_deref().unwrap_or("--°").cyan()
    ]);
    table.add_row(prettytable::row![
        "Condition".bold(),
        format!(
            "{} {}",
            icon,
            snapshot.condition.as_deref().unwrap_or("...")
        )
    ]);
    table.add_row(prettytable::row!["Updated".bold(), updated]);
    table.printstd();
}
