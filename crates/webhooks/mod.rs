pub mod delivery;
pub mod queue;
pub mod signer;
