//! Rendering environment - client (live document) or server (pre-render).

use std::cell::Cell;

use crate::types::Environment;

thread_local! {
    static ENVIRONMENT: Cell<Environment> = const { Cell::new(Environment::Client) };
}

/// Current rendering environment.
pub fn environment() -> Environment {
    ENVIRONMENT.with(Cell::get)
}

/// Select the rendering environment.
pub fn set_environment(environment: Environment) {
    ENVIRONMENT.with(|cell| cell.set(environment));
}

/// True when no live document is available.
pub fn is_server() -> bool {
    environment() == Environment::Server
}

/// Back to `Client` (for testing).
pub fn reset_environment() {
    set_environment(Environment::Client);
}
