//! Built-in tools
//!
//! | Name               | Behaviour                                             |
//! |--------------------|-------------------------------------------------------|
//! | `theAnswer`        | Settles the tabs-vs-spaces question for a language    |
//! | `justTestSampling` | Asks the client's model about a topic                 |
//! | `longRunning`      | Ten paced sub-steps reported as progress notifications |

mod answer;
mod long_running;
mod sampling;

use std::sync::Arc;

pub use answer::{SPACES_ANSWER, TABS_ANSWER, TheAnswer};
pub use long_running::{LONG_RUNNING_RESULT, LongRunning, long_running_message};
pub use sampling::{SAMPLING_MAX_TOKENS, SamplingProbe};

use crate::config::LongRunningConfig;
use crate::registry::ToolHandler;
use crate::runner::TaskRunner;

/// The three built-in tools, ready to register.
#[must_use]
pub fn builtin(runner: TaskRunner, long_running: LongRunningConfig) -> Vec<Arc<dyn ToolHandler>> {
    vec![
        Arc::new(TheAnswer),
        Arc::new(SamplingProbe),
        Arc::new(LongRunning::new(runner, long_running)),
    ]
}
