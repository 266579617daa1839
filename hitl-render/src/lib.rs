//! Human-facing rendering of decision records.
//!
//! Rendering sits outside the decision kernel: anything implementing
//! [`Renderer`] can present a [`DecisionRecord`](hitl_kernel::DecisionRecord).
//! The shipped [`CardRenderer`] fills a `{{variable}}` [`Template`] and adds
//! [`coaching_tips`] to rubric decisions.

#![warn(missing_docs, clippy::pedantic)]

pub mod card;
mod error;
pub mod renderer;
pub mod template;
pub mod tips;

pub use card::{CARD_VARIABLES, Card, CardRenderer, DEFAULT_CARD_TEMPLATE, RiskBand};
pub use error::{RenderError, RenderResult};
pub use renderer::Renderer;
pub use template::Template;
pub use tips::{coaching_tips, top_gaps};
