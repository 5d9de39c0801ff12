//! Review collection from the three feedback buttons.

use std::time::Duration;

use dispenser_traits::{ButtonLevels, Clock, ReviewButtons};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DispenserError, Result};
use crate::hw_error::map_hw_error;

/// Visitor verdict on the amount dispensed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Review {
    Satisfactory,
    Less,
    More,
}

impl Review {
    /// Resolve simultaneous presses: satisfactory beats less beats more.
    pub fn from_levels(levels: ButtonLevels) -> Option<Self> {
        if levels.satisfactory {
            Some(Self::Satisfactory)
        } else if levels.less {
            Some(Self::Less)
        } else if levels.more {
            Some(Self::More)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Satisfactory => "satisfactory",
            Self::Less => "less",
            Self::More => "more",
        }
    }
}

impl std::fmt::Display for Review {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block until a button is pressed, sampling every `poll`.
///
/// There is no timeout. `stop_check` returning true ends the wait with
/// `DispenserError::Interrupted`.
pub fn wait_for_review(
    buttons: &mut dyn ReviewButtons,
    clock: &dyn Clock,
    poll: Duration,
    stop_check: Option<&dyn Fn() -> bool>,
) -> Result<Review> {
    info!("waiting for user review");
    let started = clock.now();
    loop {
        let levels = buttons
            .read()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading review buttons")?;
        if let Some(review) = Review::from_levels(levels) {
            info!(
                review = review.as_str(),
                waited_ms = clock.ms_since(started),
                "user review received"
            );
            return Ok(review);
        }
        if stop_check.is_some_and(|f| f()) {
            debug!("review wait interrupted");
            return Err(eyre::Report::new(DispenserError::Interrupted));
        }
        clock.sleep(poll);
    }
}
