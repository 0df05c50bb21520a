// Allow unwrap in testing utilities - test code should panic on errors
#![allow(clippy::unwrap_used)]

//! # evalflow Testing Utilities
//!
//! Judge-model doubles for testing metric pipelines without a provider:
//!
//! - [`ScriptedJudge`]: returns canned responses in order, records every
//!   prompt it receives
//! - [`FailingJudge`]: always fails, for exercising upstream-failure paths
//!
//! ## Quick Start
//!
//! ```rust
//! use evalflow_testing::ScriptedJudge;
//!
//! let judge = ScriptedJudge::new(vec![
//!     r#"{"statements": ["Duck and hide"]}"#.to_string(),
//!     r#"{"verdicts": [{"verdict": "yes"}]}"#.to_string(),
//!     "The score is 1.00 because everything was on topic.".to_string(),
//! ]);
//! ```

mod scripted;

pub use scripted::{FailingJudge, ScriptedJudge};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{FailingJudge, ScriptedJudge};
}
