//! Terminal lifecycle and the main event loop of the chat view.

use std::io::{self, Stdout};
use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info};

use crate::events::TuiEvent;
use crate::ui::conversation::{ConversationAction, ConversationManager};

/// Redraw interval, also drives the typing animation
const TICK_RATE: Duration = Duration::from_millis(250);

type Tui = Terminal<CrosstermBackend<Stdout>>;

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// What woke the loop up
enum Step {
    Terminal(Option<io::Result<Event>>),
    Replied,
    Tick,
}

/// Take over the terminal and run the chat view until the user quits.
pub async fn run(mut manager: ConversationManager) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let previous_hook = install_panic_hook();
    info!("chat view started");

    let result = event_loop(&mut terminal, &mut manager).await;

    manager.shutdown();
    restore_panic_hook(previous_hook);
    restore_terminal().context("Failed to restore terminal")?;
    terminal.show_cursor()?;
    info!("chat view closed");
    result
}

async fn event_loop(terminal: &mut Tui, manager: &mut ConversationManager) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK_RATE);

    loop {
        terminal.draw(|frame| manager.render(frame.size(), frame.buffer_mut()))?;

        let step = tokio::select! {
            biased;

            event = events.next() => Step::Terminal(event),
            _ = manager.wait_for_reply() => Step::Replied,
            _ = ticker.tick() => Step::Tick,
        };

        match step {
            Step::Terminal(Some(Ok(event))) => {
                let Some(event) = TuiEvent::from_crossterm(event) else {
                    continue;
                };
                if manager.handle_event(event) == ConversationAction::Exit {
                    return Ok(());
                }
            }
            Step::Terminal(Some(Err(e))) => {
                error!("terminal event error: {}", e);
                return Err(e).context("Failed to read terminal events");
            }
            Step::Terminal(None) => return Ok(()),
            Step::Replied => {}
            Step::Tick => manager.on_tick(),
        }
    }
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste)
}

/// Put the terminal back before the previous hook reports a main-thread
/// panic. While the chat view is up, panics on runtime workers belong to reply
/// tasks, which the conversation recovers from, so they are only logged.
///
/// Returns the previous hook for [`restore_panic_hook`].
fn install_panic_hook() -> Arc<PanicHook> {
    let previous: Arc<PanicHook> = Arc::new(std::panic::take_hook());
    let chained = Arc::clone(&previous);
    std::panic::set_hook(Box::new(move |info| {
        if std::thread::current().name() == Some("main") {
            let _ = restore_terminal();
            chained(info);
        } else {
            error!("background task panicked: {}", info);
        }
    }));
    previous
}

/// Reinstate the hook that was active before [`install_panic_hook`]
fn restore_panic_hook(previous: Arc<PanicHook>) {
    // Dropping the installed hook releases its clone of `previous`.
    drop(std::panic::take_hook());
    match Arc::try_unwrap(previous) {
        Ok(hook) => std::panic::set_hook(hook),
        Err(shared) => std::panic::set_hook(Box::new(move |info| shared(info))),
    }
}
