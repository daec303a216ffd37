use super::AppContext;
use crate::error::Result;
use crate::widget::{RefreshOutcome, WidgetRefresher, WidgetState};
use colored::Colorize;

/// Handle the widget command
///
/// With `once`, runs a single refresh and returns its outcome so the caller
/// can signal a retry through the exit status. Otherwise refreshes on the
/// configured interval until Ctrl-C.
pub async fn handle_widget(ctx: &AppContext, once: bool) -> Result<RefreshOutcome> {
    let refresher = WidgetRefresher::new(ctx.weather_policy()?);

    if once {
        let (state, outcome) = refresher.run_once().await;
        print_state(&state);
        return Ok(outcome);
    }

    let interval = ctx.config.widget.refresh_interval();
    tracing::info!("Starting widget refresher, interval {:?}", interval);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    refresher
        .run_periodic(interval, shutdown, |state, _| print_state(state))
        .await;
    Ok(RefreshOutcome::Success)
}

fn print_state(state: &WidgetState) {
    let [title, reading, footer] = state.lines();
    let glyph = state.icon().map(|i| i.glyph()).unwrap_or("!");
    match state {
        WidgetState::Ready(_) => {
            println!("{} {}", glyph, title.bold());
            println!("  {}", reading);
            println!("  {}", footer.dimmed());
        }
        WidgetState::Error { .. } => {
            println!("{} {}", glyph.red(), title.red());
            println!("  {}", reading);
            println!("  {}", footer.dimmed());
        }
    }
}
