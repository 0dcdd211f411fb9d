//! Play simulation: roster, motion, defense, contact, passing and downs

pub mod contact;
pub mod defense;
pub mod downs;
pub mod flight;
pub mod gesture;
pub mod motion;
pub mod play;
pub mod roster;
pub mod sampler;
pub mod snapshot;

pub use play::{
    GameState, PlayPhase, PlaySession, SessionHandle, SessionInput, SessionOwner, SessionRegistry,
};
