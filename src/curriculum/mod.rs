//! Stock callbacks for an adaptive [`CurriculumPolicy`](crate::menv::CurriculumPolicy).
//!
//! [`LearningProgress`] estimates how fast the agent improves in every environment and
//! [`DistCreator`] turns that estimate into the next sampling distribution:
//!
//! ```ignore
//! let policy = CurriculumPolicy::adaptive(
//!     LearningProgress::new(LpEstimator::Linreg, 20, envs.len())
//!         .with_attention(Attention::LpPot { pot_coef: 0.001 }),
//!     DistCreator::greedy_prop(0.2),
//! );
//! ```
mod dist;
mod history;
mod lp;

pub use dist::DistCreator;
pub use history::ReturnHistory;
pub use lp::{Attention, LearningProgress, LpEstimator};
