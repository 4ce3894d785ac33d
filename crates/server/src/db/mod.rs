pub mod cards;
pub mod games;
pub mod pool;
pub mod stats;
