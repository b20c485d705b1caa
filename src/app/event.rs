// Keyboard event handling
//
// This module contains the keyboard event handler that processes
// user input and updates the application state accordingly.

use super::AppState;
use crossterm::event::KeyCode;

/// Handle keyboard events and update application state
///
/// Returns `true` if the application should continue running,
/// `false` if it should exit.
///
/// # Key Bindings
/// - `q`, `Q`, `Esc` - Quit the application
/// - `Up` / `Down` - Select previous / next node
/// - `p`, `P` - Pause or resume packet dispatch
/// - `r`, `R` - Reset statistics counters
/// - `h`, `H` - Toggle channel hopping
/// - `Tab` - Switch right panel (ESSIDs / spectrum)
/// - `+`, `=` - Slower refresh
/// - `-`, `_` - Faster refresh
pub fn handle_key_event(app: &mut AppState, key: KeyCode) -> bool {
    match key {
        // Quit on 'q', 'Q', or Esc
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            app.running = false;
            false
        }
        KeyCode::Up => {
            app.select_previous_node();
            true
        }
        KeyCode::Down => {
            app.select_next_node();
            true
        }
        KeyCode::Char('p') | KeyCode::Char('P') => {
            app.toggle_pause();
            true
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.reset_stats();
            true
        }
        KeyCode::Char('h') | KeyCode::Char('H') => {
            app.toggle_hop();
            true
        }
        KeyCode::Tab => {
            app.switch_panel();
            true
        }
        // + = slower refresh (increase interval)
        // - = faster refresh (decrease interval)
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.decrease_refresh_rate();
            true
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            app.increase_refresh_rate();
            true
        }
        _ => true,
    }
}
