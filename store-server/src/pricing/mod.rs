//! Discount Evaluation Engine
//!
//! - `calculator`: pure money math on resolved cart lines
//! - `engine`: gate sequencing, stacking resolution, auto-apply selection

pub mod calculator;
pub mod engine;

pub use calculator::{PricedLine, cart_subtotal, compute_amount};
pub use engine::{DiscountEngine, check_discount_gates};
