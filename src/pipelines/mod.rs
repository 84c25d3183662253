pub mod simulation;
pub mod teflon;
