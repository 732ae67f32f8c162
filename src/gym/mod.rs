pub mod corridor;
pub mod k_armed_bandit;

pub use corridor::{Corridor, Move};
pub use k_armed_bandit::KArmedBandit;
